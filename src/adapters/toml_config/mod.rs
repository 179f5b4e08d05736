// TOML config adapter - pipeline settings from the `[clipscribe]` table

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, PipelineResult};
use crate::planner::DEFAULT_FRAME_COUNT;
use crate::selection::DEFAULT_WINDOW_SECS;
use crate::utils::logging::{LogFormat, LogLevel, LoggingConfig};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "clipscribe.toml";

/// Prefix of environment overrides, e.g. `CLIPSCRIBE_FRAME_COUNT`
pub const ENV_PREFIX: &str = "CLIPSCRIBE_";

/// Every key accepted by [`PipelineConfig::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "storage_root",
    "frame_count",
    "window_secs",
    "section_count",
    "language",
    "audio_sample_rate",
    "audio_channels",
    "ffmpeg_bin",
    "ffprobe_bin",
    "whisper_bin",
    "whisper_model",
    "process_timeout_secs",
    "scoring_threads",
    "log_level",
    "log_format",
];

/// Resolved pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage_root: PathBuf,
    pub frame_count: u32,
    pub window_secs: f64,
    pub section_count: usize,
    pub language: String,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    pub ffmpeg_bin: String,
    pub ffprobe_bin: String,
    pub whisper_bin: String,
    pub whisper_model: String,
    pub process_timeout_secs: Option<u64>,
    pub scoring_threads: usize,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./data"),
            frame_count: DEFAULT_FRAME_COUNT,
            window_secs: DEFAULT_WINDOW_SECS,
            section_count: 4,
            language: "en".to_string(),
            audio_sample_rate: 16_000,
            audio_channels: 1,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            whisper_bin: "whisper".to_string(),
            whisper_model: "base".to_string(),
            process_timeout_secs: None,
            scoring_threads: num_cpus::get(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Pretty,
        }
    }
}

impl PipelineConfig {
    /// Override one setting from its string form
    pub fn set(&mut self, key: &str, value: &str) -> PipelineResult<()> {
        let value = value.trim();
        match key {
            "storage_root" => self.storage_root = PathBuf::from(value),
            "frame_count" => self.frame_count = parse_value(key, value)?,
            "window_secs" => self.window_secs = parse_value(key, value)?,
            "section_count" => self.section_count = parse_value(key, value)?,
            "language" => self.language = value.to_string(),
            "audio_sample_rate" => self.audio_sample_rate = parse_value(key, value)?,
            "audio_channels" => self.audio_channels = parse_value(key, value)?,
            "ffmpeg_bin" => self.ffmpeg_bin = value.to_string(),
            "ffprobe_bin" => self.ffprobe_bin = value.to_string(),
            "whisper_bin" => self.whisper_bin = value.to_string(),
            "whisper_model" => self.whisper_model = value.to_string(),
            "process_timeout_secs" => {
                self.process_timeout_secs = match value {
                    "" | "none" | "0" => None,
                    v => Some(parse_value(key, v)?),
                }
            }
            "scoring_threads" => self.scoring_threads = parse_value(key, value)?,
            "log_level" => self.log_level = value.parse()?,
            "log_format" => self.log_format = value.parse()?,
            other => {
                return Err(PipelineError::config(format!("Unknown config key: {}", other)));
            }
        }
        Ok(())
    }

    /// Apply `CLIPSCRIBE_*` overrides found through `lookup`; returns how many applied
    pub fn apply_env<F>(&mut self, lookup: F) -> PipelineResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = 0;
        for key in CONFIG_KEYS {
            let var = format!("{}{}", ENV_PREFIX, key.to_ascii_uppercase());
            if let Some(value) = lookup(&var) {
                info!("Found environment override: {} = {}", var, value);
                self.set(key, &value)?;
                applied += 1;
            }
        }
        Ok(applied)
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.frame_count == 0 {
            return Err(PipelineError::config("frame_count must be positive"));
        }
        if !self.window_secs.is_finite() || self.window_secs < 0.0 {
            return Err(PipelineError::config("window_secs must be non-negative"));
        }
        if self.section_count == 0 {
            return Err(PipelineError::config("section_count must be positive"));
        }
        if self.audio_sample_rate == 0 || self.audio_channels == 0 {
            return Err(PipelineError::config(
                "audio_sample_rate and audio_channels must be positive",
            ));
        }
        if self.scoring_threads == 0 {
            return Err(PipelineError::config("scoring_threads must be positive"));
        }
        if self.language.is_empty() {
            return Err(PipelineError::config("language must not be empty"));
        }
        Ok(())
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs.map(Duration::from_secs)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level,
            format: self.log_format,
        }
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> PipelineResult<T> {
    value
        .parse()
        .map_err(|_| PipelineError::config(format!("Invalid value for {}: {}", key, value)))
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    clipscribe: Option<PipelineConfig>,
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse the `[clipscribe]` table; missing keys keep their defaults
    pub fn parse(content: &str) -> PipelineResult<PipelineConfig> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| PipelineError::config(format!("Failed to parse TOML config: {}", e)))?;
        Ok(file.clipscribe.unwrap_or_default())
    }

    /// Load an explicit config file; a missing file is an error
    pub fn load(path: &Path) -> PipelineResult<PipelineConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        info!("Loading configuration from: {}", path.display());
        Self::parse(&content)
    }

    /// Load `explicit` when given, else the default file if present, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> PipelineResult<PipelineConfig> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::load(default_path)
                } else {
                    Ok(PipelineConfig::default())
                }
            }
        }
    }
}
