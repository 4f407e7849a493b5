#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod client_config;
pub mod identity;
mod meeting_details;
mod session_config;

use app_config::AppConfig;
pub use app_config::get_config_dir;
pub use args::Args;
pub use client_config::{
    CodecHint,
    MediaTracks,
    SessionMode,
};
use eyre::{
    Context as _,
    Result,
};
pub use identity::{
    IdentityStrategy,
    LocalUid,
};
pub use meeting_details::MeetingDetails;
use serde::{
    Deserialize,
    Serialize,
};
pub use session_config::{
    JoinRequest,
    SessionConfig,
    DEFAULT_DISPLAY_NAME,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    /// Grace period between admitting a remote stream and playing it.
    #[serde(default = "default_playback_delay_ms")]
    pub playback_delay_ms: u64,
    #[serde(default)]
    pub mode: SessionMode,
    #[serde(default)]
    pub codec: CodecHint,
    #[serde(default = "enabled")]
    pub audio: bool,
    #[serde(default = "enabled")]
    pub video: bool,
    #[serde(default)]
    pub screen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_token: Option<String>,
    /// Token handed to the provider when a signaling key expires.
    #[serde(default)]
    pub renewal_token: String,
    #[serde(default = "default_local_element_id")]
    pub local_element_id: String,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const CONFIG_FILE: &str = "config.yaml";

fn default_playback_delay_ms() -> u64 {
    1100
}

fn enabled() -> bool {
    true
}

fn default_local_element_id() -> String {
    "local_user".to_string()
}

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl config::Source for Config {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = config::Map::<String, config::Value>::new();
        cache.insert("playback_delay_ms".to_string(), self.playback_delay_ms.into());
        cache.insert("mode".to_string(), self.mode.to_string().into());
        cache.insert("codec".to_string(), self.codec.to_string().into());
        cache.insert("audio".to_string(), self.audio.into());
        cache.insert("video".to_string(), self.video.into());
        cache.insert("screen".to_string(), self.screen.into());
        if let Some(token) = &self.join_token {
            cache.insert("join_token".to_string(), token.clone().into());
        }
        cache.insert("renewal_token".to_string(), self.renewal_token.clone().into());
        cache.insert("local_element_id".to_string(), self.local_element_id.clone().into());
        Ok(cache)
    }
}

impl Config {
    pub fn new(args: &Args) -> Result<Self, config::ConfigError> {
        Self::load(&get_config_dir(), args)
    }

    /// Layers the built-in defaults, `config.yaml` in `config_dir` and `args`.
    pub fn load(config_dir: &Path, args: &Args) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("config_dir", config_dir.to_string_lossy().to_string())?
            .add_source(Config::default())
            .add_source(
                config::File::from(config_dir.join(CONFIG_FILE))
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(args.clone());

        let cfg: Self = builder.build()?.try_deserialize()?;
        debug!(?cfg, "Loaded configuration");

        Ok(cfg)
    }

    pub fn playback_delay(&self) -> Duration {
        Duration::from_millis(self.playback_delay_ms)
    }

    pub fn local_tracks(&self) -> MediaTracks {
        MediaTracks {
            audio: self.audio,
            video: self.video,
            screen: self.screen,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.app_config.config_dir.join(CONFIG_FILE)
    }

    /// Writes the values that differ from the built-in defaults to `config.yaml`.
    #[instrument(level = "debug", skip(self), fields(path = ?self.config_file()))]
    pub fn save(&self) -> Result<()> {
        let mut changed = serde_yml::Mapping::new();
        let current = serde_yml::to_value(self).context("Failed to serialize config")?;
        let defaults = serde_yml::to_value(Self::default()).context("Failed to serialize default config")?;
        if let (serde_yml::Value::Mapping(current), serde_yml::Value::Mapping(defaults)) = (current, defaults) {
            for (key, value) in current {
                if defaults.get(&key) != Some(&value) {
                    changed.insert(key, value);
                }
            }
        }

        std::fs::create_dir_all(&self.app_config.config_dir).context("Failed to create config directory")?;
        let path = self.config_file();
        let content = serde_yml::to_string(&changed).context("Failed to serialize config")?;
        std::fs::write(&path, content).wrap_err_with(|| format!("Failed to write config to {:?}", path))?;
        info!(keys = changed.len(), "Saved configuration");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config_matches_documented_values() {
        let config = Config::default();
        assert_eq!(config.playback_delay(), Duration::from_millis(1100));
        assert_eq!(config.mode, SessionMode::Rtc);
        assert_eq!(config.codec, CodecHint::H264);
        assert_eq!(config.local_tracks(), MediaTracks::default());
        assert_eq!(config.join_token, None);
        assert_eq!(config.renewal_token, "");
        assert_eq!(config.local_element_id, "local_user");
    }

    #[test]
    fn saved_overrides_are_loaded_back() {
        let dir = temp_dir::TempDir::new().unwrap();
        let args = Args {
            playback_delay_ms: Some(250),
            ..Default::default()
        };
        let config = Config::load(dir.path(), &args).unwrap();
        assert_eq!(config.playback_delay_ms, 250);
        config.save().unwrap();

        let saved = std::fs::read_to_string(dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(saved.trim(), "playback_delay_ms: 250");

        let reloaded = Config::load(dir.path(), &Args::default()).unwrap();
        assert_eq!(reloaded.playback_delay_ms, 250);
        assert_eq!(reloaded.codec, CodecHint::H264);
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = temp_dir::TempDir::new().unwrap();
        let config = Config::load(dir.path(), &Args::default()).unwrap();
        assert_eq!(config.playback_delay(), Duration::from_millis(1100));
        assert_eq!(config.app_config.config_dir, dir.path());
    }

    #[test]
    fn layered_sources_apply_args_last() {
        let args = Args {
            playback_delay_ms: Some(5),
            ..Default::default()
        };
        let cfg: Config = config::Config::builder()
            .add_source(Config::default())
            .add_source(args)
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(cfg.playback_delay_ms, 5);
        assert_eq!(cfg.codec, CodecHint::H264);
    }
}
