//! The command contract
//!
//! A command is one verification step against the running dashboard. It is
//! built from static configuration, executed once and discarded. `run` may
//! fail with any [`E2eError`]; [`execute`] is the only way the harness calls
//! it and turns every failure (including a timeout) into a failed
//! [`CommandResult`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use resq_common::BackendClient;

use crate::error::{E2eError, E2eResult};
use crate::page::Page;
use crate::visual::VisualTester;

/// Everything a command may touch while it runs
pub struct CommandContext<'a> {
    pub page: &'a dyn Page,
    pub api: &'a BackendClient,
    pub frontend_url: &'a str,
    pub visual: &'a VisualTester,
}

/// Outcome of a completed check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
}

impl Verdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Passed,
    Failed,
    Skipped,
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandStatus::Passed => write!(f, "passed"),
            CommandStatus::Failed => write!(f, "failed"),
            CommandStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Result of one command within a suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub name: String,
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Value,
    pub duration_ms: u64,
}

impl CommandResult {
    pub fn skipped(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CommandStatus::Skipped,
            message: reason.to_string(),
            details: serde_json::Value::Null,
            duration_ms: 0,
        }
    }

    pub fn success(&self) -> bool {
        self.status == CommandStatus::Passed
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &str;

    fn timeout(&self) -> Duration;

    /// Halt the enclosing suite when this command fails, whatever its policy
    fn fail_fast(&self) -> bool {
        false
    }

    async fn run(&self, ctx: &CommandContext<'_>) -> E2eResult<Verdict>;
}

/// Run `command` within `budget`, never returning an error
pub async fn execute(
    command: &dyn Command,
    ctx: &CommandContext<'_>,
    budget: Duration,
) -> CommandResult {
    let start = Instant::now();
    debug!("Executing command: {}", command.name());

    let outcome = match tokio::time::timeout(budget, command.run(ctx)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(E2eError::Timeout {
            what: command.name().to_string(),
            after: budget,
        }),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    let (status, message, details) = match outcome {
        Ok(verdict) if verdict.success => (CommandStatus::Passed, verdict.message, verdict.details),
        Ok(verdict) => (CommandStatus::Failed, verdict.message, verdict.details),
        Err(e) => (CommandStatus::Failed, e.to_string(), serde_json::Value::Null),
    };

    match status {
        CommandStatus::Passed => info!("✓ {} ({} ms)", command.name(), duration_ms),
        _ => error!("✗ {} - {}", command.name(), message),
    }

    CommandResult {
        name: command.name().to_string(),
        status,
        message,
        details,
        duration_ms,
    }
}

/// Read a JSON value as a bool, failing the check if it is something else
pub(crate) fn expect_bool(value: &serde_json::Value, what: &str) -> E2eResult<bool> {
    value
        .as_bool()
        .ok_or_else(|| E2eError::AssertionFailed(format!("{} returned {} instead of a bool", what, value)))
}
