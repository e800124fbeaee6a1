use std::time::Duration;

use serde::Deserialize;

/// Environment variable prefix, e.g. `FITFEM__GEMINI__API_KEY`.
pub const ENV_PREFIX: &str = "FITFEM";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub firebase: FirebaseSettings,
    pub gemini: GeminiSettings,
    pub sync: SyncSettings,
    pub cycle: CycleSettings,
    pub nutrition: NutritionSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FirebaseSettings {
    /// Public web API key of the Firebase project.
    pub api_key: String,
    pub project_id: String,
}

impl Default for FirebaseSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            project_id: "fitfemai".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
        }
    }
}

/// Polling cadence for remote bindings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub poll_interval_ms: u64,
    /// Upper bound of the resubscription backoff after a failed poll.
    pub max_backoff_ms: u64,
}

impl SyncSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms.max(self.poll_interval_ms).max(1))
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            max_backoff_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CycleSettings {
    pub length_days: u32,
    /// How many days before today the cycle is assumed to have started
    /// when no period day has been logged.
    pub default_start_offset_days: u32,
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self {
            length_days: 28,
            default_start_offset_days: 13,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct NutritionSettings {
    /// Daily water goal in glasses.
    pub water_goal: u32,
}

impl Default for NutritionSettings {
    fn default() -> Self {
        Self { water_goal: 8 }
    }
}

/// Read settings from `config/base.*` (optional) overlaid with `FITFEM__*`
/// environment variables.
pub fn read_config() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {e}")))?;

    config::Config::builder()
        .add_source(config::File::from(base_path.join("config").join("base")).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()
}
