//! Error types for the verification harness

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    #[error("Preset already registered: {0}")]
    DuplicatePreset(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Page driver error: {0}")]
    Driver(String),

    #[error("Page driver exited")]
    DriverClosed,

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Visual regression: {0}")]
    VisualRegression(String),

    #[error("Baseline not found: {0}")]
    BaselineNotFound(String),

    #[error("Timed out after {after:?}: {what}")]
    Timeout { what: String, after: Duration },

    #[error("Backend error: {0}")]
    Backend(#[from] resq_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl E2eError {
    /// Configuration errors are raised before anything runs
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            E2eError::UnknownCommand(_)
                | E2eError::UnknownPreset(_)
                | E2eError::DuplicatePreset(_)
                | E2eError::Config(_)
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
