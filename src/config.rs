//! Controller options, optionally loaded from environment variables.

use serde::Deserialize;

/// Environment prefix used by [`ControllerOptions::load`].
pub const ENV_PREFIX: &str = "CONTROLLER_";

/// Options shared by every stage a controller builds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControllerOptions {
    /// Maximum request body size read by the terminal stage.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Include the error text in the fallback 500 envelope.
    /// When off, the envelope carries a fixed placeholder.
    #[serde(default = "default_true")]
    pub expose_error_details: bool,
}

fn default_body_limit() -> usize {
    100 * 1024 // 100 KiB
}

fn default_true() -> bool {
    true
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            body_limit_bytes: default_body_limit(),
            expose_error_details: default_true(),
        }
    }
}

impl ControllerOptions {
    /// Load from `CONTROLLER_*` variables, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Load from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    /// Check if the options are valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.body_limit_bytes == 0 {
            return Err("CONTROLLER_BODY_LIMIT_BYTES must be greater than 0".to_string());
        }

        Ok(())
    }
}
