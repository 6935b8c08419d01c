//! Loop configuration (layered: defaults < TOML file < environment).

use std::path::{Path, PathBuf};
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::error::LoopError;

pub const DEFAULT_MAX_STEPS: usize = 5;
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_CONCURRENT_TOOLS: usize = 8;
pub const DEFAULT_STREAM_IDLE_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_RUN_BUDGET_MS: u64 = 60_000;

const MAX_STEPS_ENV: &str = "STEPLOOP_MAX_STEPS";
const TOOL_TIMEOUT_ENV: &str = "STEPLOOP_TOOL_TIMEOUT_MS";
const MAX_CONCURRENT_TOOLS_ENV: &str = "STEPLOOP_MAX_CONCURRENT_TOOLS";
const STREAM_IDLE_TIMEOUT_ENV: &str = "STEPLOOP_STREAM_IDLE_TIMEOUT_MS";
const RUN_BUDGET_ENV: &str = "STEPLOOP_RUN_BUDGET_MS";
const CONFIG_PATH_ENV: &str = "STEPLOOP_CONFIG";
const CONFIG_FILE_NAME: &str = "steploop.toml";

/// Limits and timeouts applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Maximum model invocations per run.
    #[builder(default = DEFAULT_MAX_STEPS)]
    pub max_steps: usize,
    /// Per-tool handler timeout.
    #[builder(default = DEFAULT_TOOL_TIMEOUT_MS)]
    pub tool_timeout_ms: u64,
    /// Cap on tool handlers running at once within a batch.
    #[builder(default = DEFAULT_MAX_CONCURRENT_TOOLS)]
    pub max_concurrent_tools: usize,
    /// Abort the model call when its stream stays silent this long. `0` disables.
    #[builder(default = DEFAULT_STREAM_IDLE_TIMEOUT_MS)]
    pub stream_idle_timeout_ms: u64,
    /// Wall-clock budget callers apply around a whole run.
    #[builder(default = DEFAULT_RUN_BUDGET_MS)]
    pub run_budget_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// File shape: every key optional, unknown keys rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    runner: RunnerSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RunnerSection {
    max_steps: Option<usize>,
    tool_timeout_ms: Option<u64>,
    max_concurrent_tools: Option<usize>,
    stream_idle_timeout_ms: Option<u64>,
    run_budget_ms: Option<u64>,
}

impl LoopConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_timeout_ms)
    }

    pub fn run_budget(&self) -> Duration {
        Duration::from_millis(self.run_budget_ms)
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        (self.stream_idle_timeout_ms > 0).then(|| Duration::from_millis(self.stream_idle_timeout_ms))
    }

    /// Defaults, overlaid with the default config file (if present) and the environment.
    pub fn load() -> Result<Self, LoopError> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(default_config_path);
        let mut config = match path {
            Some(path) if path.exists() => Self::from_toml_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Defaults overlaid with `path`.
    pub fn from_toml_file(path: &Path) -> Result<Self, LoopError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|err| match err {
            LoopError::Configuration(message) => {
                LoopError::Configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })
    }

    /// Defaults overlaid with a TOML document containing a `[runner]` table.
    pub fn from_toml_str(raw: &str) -> Result<Self, LoopError> {
        let file: ConfigFile =
            toml::from_str(raw).map_err(|e| LoopError::Configuration(e.to_string()))?;
        let mut config = Self::default();
        let section = file.runner;
        overlay(&mut config.max_steps, section.max_steps);
        overlay(&mut config.tool_timeout_ms, section.tool_timeout_ms);
        overlay(&mut config.max_concurrent_tools, section.max_concurrent_tools);
        if let Some(value) = section.stream_idle_timeout_ms {
            config.stream_idle_timeout_ms = value;
        }
        overlay(&mut config.run_budget_ms, section.run_budget_ms);
        Ok(config)
    }

    /// Overlay `STEPLOOP_*` variables. Zero or unparsable values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, get: impl Fn(&str) -> Option<String>) {
        overlay(&mut self.max_steps, get(MAX_STEPS_ENV).and_then(|v| parse_positive(&v)));
        overlay(
            &mut self.tool_timeout_ms,
            get(TOOL_TIMEOUT_ENV).and_then(|v| parse_positive(&v)),
        );
        overlay(
            &mut self.max_concurrent_tools,
            get(MAX_CONCURRENT_TOOLS_ENV).and_then(|v| parse_positive(&v)),
        );
        overlay(
            &mut self.stream_idle_timeout_ms,
            get(STREAM_IDLE_TIMEOUT_ENV).and_then(|v| parse_positive(&v)),
        );
        overlay(
            &mut self.run_budget_ms,
            get(RUN_BUDGET_ENV).and_then(|v| parse_positive(&v)),
        );
    }
}

/// `$XDG_CONFIG_HOME/steploop/steploop.toml` or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "steploop")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn overlay<T: PartialEq + Default>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        if value != T::default() {
            *slot = value;
        }
    }
}

fn parse_positive<T>(value: &str) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    let parsed = value.trim().parse::<T>().ok()?;
    (parsed != T::default()).then_some(parsed)
}
