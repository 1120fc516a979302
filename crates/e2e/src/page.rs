//! Browser page abstraction shared by every command

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::E2eResult;

/// Selector state to wait for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport { width: 1280, height: 720 }
    }
}

/// A single live browser page.
///
/// Implementations serialise their own requests; the orchestrator hands the
/// page to one command at a time.
#[async_trait]
pub trait Page: Send + Sync {
    async fn goto(&self, url: &str) -> E2eResult<()>;

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()>;

    async fn click(&self, selector: &str) -> E2eResult<()>;

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()>;

    /// Evaluate a JavaScript expression; promises are awaited
    async fn evaluate(&self, expression: &str) -> E2eResult<serde_json::Value>;

    /// Capture a PNG named `name` and return where it was written
    async fn screenshot(&self, name: &str, full_page: bool) -> E2eResult<PathBuf>;

    /// Uncaught errors raised by the page since the last call
    async fn take_page_errors(&self) -> E2eResult<Vec<String>>;

    async fn close(&self) -> E2eResult<()>;
}
