use clap::Parser;
use std::{
    collections::HashMap,
    path::PathBuf,
};

/// Conference session simulator
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Join code of the room, as it would arrive from the route.
    #[clap(long)]
    pub join_code: Option<String>,

    /// Display name. Defaults to "You".
    #[clap(long)]
    pub name: Option<String>,

    /// Base64 encoded meeting details, as passed in the `details` query parameter.
    #[clap(long)]
    pub details: Option<String>,

    /// YAML file with the scripted provider events to replay.
    #[clap(long, value_name = "PATH")]
    pub scenario: Option<PathBuf>,

    /// Override the delay before a freshly admitted remote stream is played.
    #[clap(long)]
    pub playback_delay_ms: Option<u64>,

    /// Seed for the local uid, makes runs reproducible.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Persist the overrides given on the command line to `config.yaml`.
    #[clap(long)]
    pub save: bool,
}

impl config::Source for Args {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = HashMap::<String, config::Value>::new();
        if let Some(delay) = self.playback_delay_ms {
            cache.insert("playback_delay_ms".to_string(), delay.into());
        }
        Ok(cache)
    }
}
