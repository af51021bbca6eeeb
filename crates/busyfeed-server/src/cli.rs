//! Command-line interface definition.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use busyfeed_core::{DEFAULT_COLOR, TracingOutputFormat};
use busyfeed_sources::FetchConfig;
use clap::Parser;

use crate::config::{FeedConfig, FeedStyle};

/// busyfeed - publish the busy time of a calendar collection as one feed
#[derive(Debug, Parser)]
#[command(name = "busyfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Operator display name, used in PRODID and the download filename
    #[arg(long, env = "BUSYFEED_NAME")]
    pub name: Option<String>,

    /// Operator email address, used as the free/busy attendee
    #[arg(long, env = "BUSYFEED_EMAIL")]
    pub email: Option<String>,

    /// Root directory of the calendar collections
    #[arg(long, env = "BUSYFEED_ROOT_DIR")]
    pub root_dir: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "BUSYFEED_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,

    /// Per-source fetch timeout in seconds
    #[arg(long, env = "BUSYFEED_FETCH_TIMEOUT", default_value_t = FetchConfig::DEFAULT_TIMEOUT_SECS)]
    pub fetch_timeout: u64,

    /// Maximum number of sources fetched at once
    #[arg(long, env = "BUSYFEED_MAX_CONCURRENT_FETCHES", default_value_t = FeedConfig::DEFAULT_MAX_CONCURRENT_FETCHES)]
    pub max_concurrent_fetches: usize,

    /// Feed layout: freebusy or events
    #[arg(long, env = "BUSYFEED_STYLE", default_value = "freebusy")]
    pub style: FeedStyle,

    /// Calendar color advertised by the events style
    #[arg(long, env = "BUSYFEED_COLOR", default_value = DEFAULT_COLOR)]
    pub color: String,

    /// Log output format: pretty, compact or json
    #[arg(long, env = "BUSYFEED_LOG_FORMAT", default_value = "pretty")]
    pub log_format: TracingOutputFormat,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,
}

impl Cli {
    /// Builds the feed configuration from the parsed arguments.
    pub fn feed_config(&self) -> FeedConfig {
        let mut config = FeedConfig::default()
            .with_style(self.style)
            .with_color(&self.color)
            .with_fetch_timeout(Duration::from_secs(self.fetch_timeout))
            .with_max_concurrent_fetches(self.max_concurrent_fetches);

        if let Some(ref name) = self.name {
            config = config.with_name(name);
        }
        if let Some(ref email) = self.email {
            config = config.with_email(email);
        }
        if let Some(ref root_dir) = self.root_dir {
            config = config.with_root_dir(root_dir);
        }
        config
    }
}
