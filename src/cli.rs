//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `orderwatch.toml` file and environment variables.

use crate::config::Variant;
use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Publishes order status changes to a set of notifiers.
#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Identifier of the order to publish.
    #[arg(long, value_name = "ID")]
    pub order_id: Option<String>,

    /// Observer implementation to run.
    #[arg(long, value_enum)]
    pub variant: Option<Variant>,

    /// Use a bounded mailbox of this size per subscriber instead of a
    /// synchronous hand-off.
    #[arg(long, value_name = "N")]
    pub mailbox_capacity: Option<usize>,

    /// Write subscriber output as JSON lines.
    #[arg(long)]
    pub json: bool,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(order_id) = &self.order_id {
            dict.insert("order_id".into(), Value::from(order_id.clone()));
        }

        if let Some(variant) = self.variant {
            let name = match variant {
                Variant::Channels => "channels",
                Variant::Callbacks => "callbacks",
            };
            dict.insert("variant".into(), Value::from(name));
        }

        if let Some(capacity) = self.mailbox_capacity {
            let mut delivery = Dict::new();
            delivery.insert("mode".into(), Value::from("bounded"));
            delivery.insert("capacity".into(), Value::from(capacity));
            dict.insert("delivery".into(), Value::from(delivery));
        }

        // `--json` can only switch JSON on; leaving it out defers to the file.
        if self.json {
            let mut output = Dict::new();
            output.insert("format".into(), Value::from("Json"));
            dict.insert("output".into(), Value::from(output));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
