//! CLI for pushsub
//!
//! Subcommands:
//! - `server`: run the WebSocket server
//! - `client`: subscribe to topics and print what arrives (useful for smoke tests)

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pushsub::broker::Broker;
use pushsub::config::{Settings, load_config_from};
use pushsub::registry::TopicRegistry;
use pushsub::status::run_system_info;
use pushsub::transport::{WsTransport, start_websocket_server};
use pushsub::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "pushsub")]
enum Command {
    /// Start the WebSocket server
    Server {
        /// Configuration file (default: config/default.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Subscribe to topics and print acknowledgements and broadcasts
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Topic to subscribe to; repeat for several
        #[arg(long = "topic", default_value = "system.info")]
        topics: Vec<String>,
        /// Subscription parameters as a JSON object, applied to every topic
        #[arg(long)]
        params: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cmd = Command::parse();

    let result = match cmd {
        Command::Server { config } => {
            let _ = dotenvy::dotenv();
            let settings = match load_config_from(config.as_deref()) {
                Ok(settings) => settings,
                Err(e) => {
                    logging::init("info");
                    error!("Failed to load configuration: {e}");
                    return ExitCode::FAILURE;
                }
            };
            logging::init(&settings.logging.level);
            run_server(settings).await
        }
        Command::Client {
            url,
            topics,
            params,
        } => {
            logging::init("info");
            run_client(&url, &topics, params.as_deref()).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let registry = TopicRegistry::from_settings(&settings.registry)?;
    info!(
        strict = registry.is_strict(),
        topics = registry.topic_names().count(),
        "topic registry loaded"
    );

    let transport = Arc::new(WsTransport::new());
    let broker = Arc::new(Broker::new(registry, transport.clone()));
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let interval = settings.publisher.system_info_interval_secs;
    if interval > 0 {
        tokio::spawn(run_system_info(
            broker.clone(),
            transport.clone(),
            Duration::from_secs(interval),
        ));
    }

    tokio::select! {
        res = start_websocket_server(&addr, broker.clone(), transport, settings.server.max_connections) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    broker.shutdown();
    Ok(())
}

async fn run_client(
    url: &str,
    topics: &[String],
    params: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let params: Value = match params {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };

    let (mut ws_stream, _response) = connect_async(url).await?;
    info!("Connected to {url}");

    for topic in topics {
        let subscribe = json!({ "action": "subscribe", "topic": topic, "params": params });
        ws_stream
            .send(WsMessage::text(subscribe.to_string()))
            .await?;
    }

    while let Some(msg) = ws_stream.next().await {
        match msg? {
            WsMessage::Text(text) => println!("{}", text.as_str()),
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("Connection closed");
    Ok(())
}
