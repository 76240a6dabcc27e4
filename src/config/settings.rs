use std::collections::HashMap;

use serde::Deserialize;

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the topic registry, logging and the
/// built-in `system.info` publisher.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub registry: RegistrySettings,
    pub logging: LoggingSettings,
    pub publisher: PublisherSettings,
}

/// Configuration settings for the server.
///
/// Defines the address the server binds to and how many WebSocket clients
/// may be attached at once.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub max_connections: usize,
}

/// Topic registry configuration.
///
/// With `strict` set, only the topics listed here may be subscribed to.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RegistrySettings {
    pub strict: bool,
    pub topics: Vec<TopicSettings>,
}

/// One registered topic, its parameter schema and its filter chain.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TopicSettings {
    pub name: String,
    #[serde(default)]
    pub params: HashMap<String, ParamKind>,
    #[serde(default)]
    pub filters: Vec<FilterSettings>,
}

/// Expected JSON kind of a subscription parameter.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Number,
    String,
    Bool,
    Array,
}

/// A built-in filter attached to a topic.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    pub kind: FilterKind,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Threshold,
    Match,
    Fields,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

/// Settings for the periodic `system.info` publisher.
///
/// An interval of `0` disables it.
#[derive(Debug, Deserialize, Clone)]
pub struct PublisherSettings {
    pub system_info_interval_secs: u64,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub registry: Option<PartialRegistrySettings>,
    pub logging: Option<PartialLoggingSettings>,
    pub publisher: Option<PartialPublisherSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_connections: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRegistrySettings {
    pub strict: Option<bool>,
    pub topics: Option<Vec<TopicSettings>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialPublisherSettings {
    pub system_info_interval_secs: Option<u64>,
}

/// Provides default values for `Settings`.
///
/// The default registry is permissive and pre-declares the dashboard topics
/// with their usual filters.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
                max_connections: 4,
            },
            registry: RegistrySettings {
                strict: false,
                topics: default_topics(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
            publisher: PublisherSettings {
                system_info_interval_secs: 5,
            },
        }
    }
}

fn default_topics() -> Vec<TopicSettings> {
    vec![
        TopicSettings {
            name: "device.status".to_string(),
            params: HashMap::from([
                ("threshold".to_string(), ParamKind::Number),
                ("device".to_string(), ParamKind::String),
                ("fields".to_string(), ParamKind::Array),
            ]),
            filters: vec![
                FilterSettings {
                    kind: FilterKind::Match,
                    field: Some("device".to_string()),
                },
                FilterSettings {
                    kind: FilterKind::Threshold,
                    field: Some("temp".to_string()),
                },
                FilterSettings {
                    kind: FilterKind::Fields,
                    field: None,
                },
            ],
        },
        TopicSettings {
            name: "ota.progress".to_string(),
            params: HashMap::from([("threshold".to_string(), ParamKind::Number)]),
            filters: vec![FilterSettings {
                kind: FilterKind::Threshold,
                field: Some("progress".to_string()),
            }],
        },
        TopicSettings {
            name: "system.info".to_string(),
            params: HashMap::from([("fields".to_string(), ParamKind::Array)]),
            filters: vec![FilterSettings {
                kind: FilterKind::Fields,
                field: None,
            }],
        },
    ]
}
