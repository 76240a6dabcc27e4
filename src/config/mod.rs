mod settings;

use std::path::Path;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    FilterKind, FilterSettings, LoggingSettings, ParamKind, PublisherSettings, RegistrySettings,
    ServerSettings, Settings, TopicSettings,
};

/// Prefix of environment overrides, e.g. `PUSHSUB_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "PUSHSUB";

/// Loads the configuration from `config/default` (if present) and environment
/// variables, merged over default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(None)
}

/// Like [`load_config`], but reads the given file instead of `config/default`.
/// An explicitly named file must exist.
pub fn load_config_from(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name("config/default").required(false),
    };

    let builder = Config::builder().add_source(file).add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(merge_with_defaults(partial))
}

fn merge_with_defaults(partial: PartialSettings) -> Settings {
    let default = Settings::default();

    Settings {
        server: ServerSettings {
            host: partial
                .server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: partial
                .server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            max_connections: partial
                .server
                .as_ref()
                .and_then(|s| s.max_connections)
                .unwrap_or(default.server.max_connections),
        },
        registry: RegistrySettings {
            strict: partial
                .registry
                .as_ref()
                .and_then(|r| r.strict)
                .unwrap_or(default.registry.strict),
            topics: partial
                .registry
                .and_then(|r| r.topics)
                .unwrap_or(default.registry.topics),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .and_then(|l| l.level)
                .unwrap_or(default.logging.level),
        },
        publisher: PublisherSettings {
            system_info_interval_secs: partial
                .publisher
                .and_then(|p| p.system_info_interval_secs)
                .unwrap_or(default.publisher.system_info_interval_secs),
        },
    }
}
