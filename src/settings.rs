use config::{Config, Environment, Source};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "INFRA0";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
}

/// CLI defaults, overridable through `INFRA0_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Chars per simulated stream chunk in `replay`.
    pub chunk_size: usize,
    /// Pause between replayed chunks.
    pub delay_ms: u64,
    /// Emit JSON instead of tables.
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            chunk_size: 16,
            delay_ms: 0,
            json: false,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::load(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    pub fn load<S>(source: S) -> Result<Self, SettingsError>
    where
        S: Source + Send + Sync + 'static,
    {
        let settings: Settings = Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Apply command-line values on top of the loaded settings, then validate.
    pub fn with_overrides(
        mut self,
        chunk_size: Option<usize>,
        delay_ms: Option<u64>,
    ) -> Result<Self, SettingsError> {
        if let Some(n) = chunk_size {
            self.chunk_size = n;
        }
        if let Some(ms) = delay_ms {
            self.delay_ms = ms;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.chunk_size == 0 {
            return Err(SettingsError::ZeroChunkSize);
        }
        Ok(())
    }
}

// ── Tests ──
