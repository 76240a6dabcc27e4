//! Topic registry
//!
//! Catalog of known topic names. Each entry may declare a parameter schema,
//! checked when a client subscribes, and a filter consulted on every
//! broadcast. Topics that are not registered are accepted unless the registry
//! is strict.

pub mod filter;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::broker::topic::Params;
use crate::config::{ParamKind, RegistrySettings};
use crate::utils::{PubSubError, Result};

pub use filter::{FieldsFilter, FilterChain, MatchFilter, ThresholdFilter, TopicFilter};

impl ParamKind {
    /// Whether `value` has this JSON kind.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            ParamKind::Number => value.is_number(),
            ParamKind::String => value.is_string(),
            ParamKind::Bool => value.is_boolean(),
            ParamKind::Array => value.is_array(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopicEntry {
    pub schema: HashMap<String, ParamKind>,
    pub filter: Option<Arc<dyn TopicFilter>>,
}

#[derive(Debug, Default)]
pub struct TopicRegistry {
    strict: bool,
    topics: HashMap<String, TopicEntry>,
}

impl TopicRegistry {
    /// Registry that accepts any non-empty topic name.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Registry that only accepts registered topics.
    pub fn strict() -> Self {
        Self {
            strict: true,
            topics: HashMap::new(),
        }
    }

    /// Build the registry from configuration. Any error here should abort
    /// startup.
    pub fn from_settings(settings: &RegistrySettings) -> Result<Self> {
        let mut registry = Self {
            strict: settings.strict,
            topics: HashMap::new(),
        };

        for topic in &settings.topics {
            let mut filters = topic
                .filters
                .iter()
                .map(filter::build)
                .collect::<Result<Vec<_>>>()?;

            let filter = match filters.len() {
                0 => None,
                1 => filters.pop(),
                _ => Some(Arc::new(FilterChain::new(filters)) as Arc<dyn TopicFilter>),
            };

            registry.insert(
                &topic.name,
                TopicEntry {
                    schema: topic.params.clone(),
                    filter,
                },
            )?;
        }

        Ok(registry)
    }

    /// Register `name` with a parameter schema and no filter.
    pub fn register(&mut self, name: &str, schema: HashMap<String, ParamKind>) -> Result<()> {
        self.insert(
            name,
            TopicEntry {
                schema,
                filter: None,
            },
        )
    }

    /// Attach `filter` to `name`, registering the topic if needed. Replaces
    /// any filter already attached.
    pub fn with_filter(mut self, name: &str, filter: Arc<dyn TopicFilter>) -> Self {
        self.topics.entry(name.to_string()).or_default().filter = Some(filter);
        self
    }

    fn insert(&mut self, name: &str, entry: TopicEntry) -> Result<()> {
        if name.trim().is_empty() {
            return Err(PubSubError::Config("topic name must not be empty".into()));
        }
        if self.topics.contains_key(name) {
            return Err(PubSubError::Config(format!(
                "topic '{name}' is registered twice"
            )));
        }
        self.topics.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_registered(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    pub fn is_valid(&self, topic: &str) -> bool {
        if topic.is_empty() {
            return false;
        }
        !self.strict || self.is_registered(topic)
    }

    pub fn filter_for(&self, topic: &str) -> Option<Arc<dyn TopicFilter>> {
        self.topics.get(topic).and_then(|entry| entry.filter.clone())
    }

    /// Check subscriber parameters against the topic's declared schema.
    /// Keys the schema does not mention are left alone.
    pub fn validate_params(&self, topic: &str, params: &Params) -> Result<()> {
        let Some(entry) = self.topics.get(topic) else {
            return Ok(());
        };

        for (key, value) in params {
            match entry.schema.get(key) {
                Some(kind) if !kind.matches(value) => {
                    return Err(PubSubError::MalformedRequest(format!(
                        "parameter '{key}' of topic '{topic}' must be of kind {kind:?}"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn topic_names(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }
}
