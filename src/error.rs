use thiserror::Error;

use crate::config::ConfigError;
use crate::hh::HhError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("HeadHunter API error: {0}")]
    Hh(#[from] HhError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("A search-and-apply run is already in progress")]
    RunInProgress,
}

impl AgentError {
    /// True when the failure means the HH credentials are no longer usable.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, AgentError::Hh(HhError::AuthenticationFailed))
    }
}
