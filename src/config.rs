//! Configuration management for OrderWatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to load configuration from an `orderwatch.toml` file and merge it
//! with environment variables and command-line arguments.

use crate::cli::Cli;
use crate::delivery::{DeliveryMode, OverflowPolicy};
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "orderwatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Which observer implementation the scenario runs.
    pub variant: Variant,
    /// The identifier of the order whose status is published.
    pub order_id: String,
    /// The statuses published in turn by the scenario.
    pub statuses: Vec<String>,
    /// Delay between two status updates, in milliseconds.
    pub pause_ms: u64,
    /// How notifications reach channel-based subscribers.
    pub delivery: DeliveryConfig,
    /// Configuration for subscriber output.
    pub output: OutputConfig,
}

/// The observer implementation to run.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Subscribers run as tasks fed through channels.
    Channels,
    /// Observers are called in place.
    Callbacks,
}

/// How the publisher hands notifications to subscribers.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryKind {
    Rendezvous,
    Bounded,
}

/// What a full bounded mailbox does with a new notification.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverflowKind {
    DropNewest,
    DropOldest,
    Block,
}

/// Configuration for notification delivery.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DeliveryConfig {
    pub mode: DeliveryKind,
    /// Mailbox capacity for `bounded` delivery.
    pub capacity: usize,
    /// Overflow policy for `bounded` delivery.
    pub overflow: OverflowKind,
    /// How long `block` waits for mailbox room, in milliseconds.
    pub timeout_ms: u64,
}

impl DeliveryConfig {
    /// Resolves the settings into a delivery mode.
    pub fn delivery_mode(&self) -> Result<DeliveryMode> {
        match self.mode {
            DeliveryKind::Rendezvous => Ok(DeliveryMode::Rendezvous),
            DeliveryKind::Bounded => {
                if self.capacity == 0 {
                    bail!("delivery.capacity must be at least 1 for bounded delivery");
                }
                let overflow = match self.overflow {
                    OverflowKind::DropNewest => OverflowPolicy::DropNewest,
                    OverflowKind::DropOldest => OverflowPolicy::DropOldest,
                    OverflowKind::Block => {
                        OverflowPolicy::BlockWithTimeout(Duration::from_millis(self.timeout_ms))
                    }
                };
                Ok(DeliveryMode::Bounded {
                    capacity: self.capacity,
                    overflow,
                })
            }
        }
    }
}

/// The format for subscriber output.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    PlainText,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "Json"),
            OutputFormat::PlainText => write!(f, "PlainText"),
        }
    }
}

/// Configuration for subscriber output.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// The format subscribers write their lines in.
    pub format: OutputFormat,
}

impl Config {
    /// Loads the application configuration by layering defaults, the TOML
    /// file, `ORDERWATCH_` environment variables and command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // Nested keys use a double underscore, e.g. ORDERWATCH_DELIVERY__MODE=bounded
            .merge(Env::prefixed("ORDERWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.delivery.delivery_mode()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            variant: Variant::Channels,
            order_id: "ORD987".to_string(),
            statuses: vec![
                "Placed".to_string(),
                "Shipped".to_string(),
                "Delivered".to_string(),
            ],
            pause_ms: 500,
            delivery: DeliveryConfig {
                mode: DeliveryKind::Rendezvous,
                capacity: 16,
                overflow: OverflowKind::DropOldest,
                timeout_ms: 1000,
            },
            output: OutputConfig {
                format: OutputFormat::PlainText,
            },
        }
    }
}
