//! Error types for chainup

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to launch validator: {0}")]
    Spawn(String),

    #[error("validator not ready after {attempts} checks over {waited_secs}s")]
    ReadinessTimeout { attempts: u32, waited_secs: u64 },

    #[error("keypair generation failed: {0}")]
    Keygen(String),

    #[error("failed to launch app: {0}")]
    App(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
