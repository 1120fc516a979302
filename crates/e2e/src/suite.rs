//! MacroCommand: an ordered suite of commands run as a unit

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::command::{execute, Command, CommandContext, CommandResult, CommandStatus};

/// Result of running a suite
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub suite: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<CommandResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn result(&self, command: &str) -> Option<&CommandResult> {
        self.results.iter().find(|r| r.name == command)
    }
}

/// Ordered group of commands.
///
/// Commands run strictly in declaration order, one at a time. With
/// `fail_fast` the first failure skips everything after it; without it every
/// command runs exactly once. The suite timeout is a shared budget: each
/// command gets the smaller of its own timeout and what is left.
pub struct MacroCommand {
    name: String,
    description: String,
    timeout: Duration,
    fail_fast: bool,
    commands: Vec<Box<dyn Command>>,
}

impl MacroCommand {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            timeout: Duration::from_secs(600),
            fail_fast: false,
            commands: Vec::new(),
        }
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_command(mut self, command: Box<dyn Command>) -> Self {
        self.commands.push(command);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_fail_fast(&self) -> bool {
        self.fail_fast
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub async fn run(&self, ctx: &CommandContext<'_>) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(self.commands.len());
        let mut halted: Option<String> = None;

        info!("Running suite '{}' ({} command(s))", self.name, self.commands.len());

        for command in &self.commands {
            if let Some(reason) = &halted {
                results.push(CommandResult::skipped(command.name(), reason));
                continue;
            }

            let remaining = self.timeout.saturating_sub(start.elapsed());
            if remaining.is_zero() {
                let reason = format!("suite timeout after {:?}", self.timeout);
                results.push(CommandResult::skipped(command.name(), &reason));
                halted = Some(reason);
                continue;
            }

            let result = execute(command.as_ref(), ctx, command.timeout().min(remaining)).await;
            if result.status == CommandStatus::Failed && (self.fail_fast || command.fail_fast()) {
                halted = Some(format!("skipped after '{}' failed", command.name()));
            }
            results.push(result);
        }

        let count = |status: CommandStatus| results.iter().filter(|r| r.status == status).count();
        let passed = count(CommandStatus::Passed);
        let failed = count(CommandStatus::Failed);
        let skipped = count(CommandStatus::Skipped);
        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Suite '{}': {} passed, {} failed, {} skipped ({} ms)",
            self.name, passed, failed, skipped, duration_ms
        );

        SuiteResult {
            suite: self.name.clone(),
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at,
            total: results.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Verdict;
    use crate::error::{E2eError, E2eResult};
    use crate::page::{Page, Viewport, WaitState};
    use crate::visual::{VisualConfig, VisualTester};
    use async_trait::async_trait;
    use resq_common::BackendClient;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct NullPage;

    #[async_trait]
    impl Page for NullPage {
        async fn goto(&self, _url: &str) -> E2eResult<()> {
            Ok(())
        }
        async fn wait_for_selector(&self, _: &str, _: WaitState, _: Duration) -> E2eResult<()> {
            Ok(())
        }
        async fn click(&self, _selector: &str) -> E2eResult<()> {
            Ok(())
        }
        async fn set_viewport(&self, _viewport: Viewport) -> E2eResult<()> {
            Ok(())
        }
        async fn evaluate(&self, _expression: &str) -> E2eResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
        async fn screenshot(&self, name: &str, _full_page: bool) -> E2eResult<PathBuf> {
            Ok(PathBuf::from(name))
        }
        async fn take_page_errors(&self) -> E2eResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn close(&self) -> E2eResult<()> {
            Ok(())
        }
    }

    enum Behaviour {
        Pass,
        Fail,
        Error,
        Hang,
    }

    struct Stub {
        name: String,
        behaviour: Behaviour,
        critical: bool,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Command for Stub {
        fn name(&self) -> &str {
            &self.name
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }

        fn fail_fast(&self) -> bool {
            self.critical
        }

        async fn run(&self, _ctx: &CommandContext<'_>) -> E2eResult<Verdict> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Pass => Ok(Verdict::pass("ok")),
                Behaviour::Fail => Ok(Verdict::fail("expected condition not met")),
                Behaviour::Error => Err(E2eError::Driver("browser crashed".into())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Verdict::pass("unreachable"))
                }
            }
        }
    }

    fn stub(name: &str, behaviour: Behaviour, runs: &Arc<AtomicUsize>) -> Box<dyn Command> {
        Box::new(Stub {
            name: name.to_string(),
            behaviour,
            critical: false,
            runs: runs.clone(),
        })
    }

    async fn run_suite(suite: &MacroCommand) -> SuiteResult {
        let dir = tempfile::tempdir().unwrap();
        let visual = VisualTester::new(VisualConfig {
            baseline_dir: dir.path().join("baselines"),
            diff_dir: dir.path().join("diffs"),
            ..Default::default()
        })
        .unwrap();
        let api = BackendClient::new("http://127.0.0.1:9").unwrap();
        let ctx = CommandContext {
            page: &NullPage,
            api: &api,
            frontend_url: "http://127.0.0.1:5173",
            visual: &visual,
        };
        suite.run(&ctx).await
    }

    #[tokio::test]
    async fn test_fail_fast_skips_the_rest() {
        let runs = Arc::new(AtomicUsize::new(0));
        let suite = MacroCommand::new("ff", "")
            .with_fail_fast(true)
            .with_command(stub("a", Behaviour::Pass, &runs))
            .with_command(stub("b", Behaviour::Fail, &runs))
            .with_command(stub("c", Behaviour::Pass, &runs))
            .with_command(stub("d", Behaviour::Pass, &runs));

        let result = run_suite(&suite).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!((result.passed, result.failed, result.skipped), (1, 1, 2));
        let statuses: Vec<_> = result.results.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            vec![
                CommandStatus::Passed,
                CommandStatus::Failed,
                CommandStatus::Skipped,
                CommandStatus::Skipped
            ]
        );
    }

    #[tokio::test]
    async fn test_without_fail_fast_every_command_runs_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let suite = MacroCommand::new("all", "")
            .with_command(stub("a", Behaviour::Fail, &runs))
            .with_command(stub("b", Behaviour::Error, &runs))
            .with_command(stub("c", Behaviour::Pass, &runs));

        let result = run_suite(&suite).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
        assert_eq!((result.passed, result.failed, result.skipped), (1, 2, 0));
        assert!(!result.success());
        assert_eq!(result.result("b").unwrap().message, "Page driver error: browser crashed");
    }

    #[tokio::test]
    async fn test_timeout_becomes_failed_result() {
        let runs = Arc::new(AtomicUsize::new(0));
        let suite = MacroCommand::new("slow", "").with_command(stub("hang", Behaviour::Hang, &runs));

        let result = run_suite(&suite).await;
        let hang = result.result("hang").unwrap();
        assert_eq!(hang.status, CommandStatus::Failed);
        assert!(hang.message.starts_with("Timed out"));
    }

    #[tokio::test]
    async fn test_critical_command_halts_lenient_suite() {
        let runs = Arc::new(AtomicUsize::new(0));
        let suite = MacroCommand::new("lenient", "")
            .with_command(Box::new(Stub {
                name: "gate".to_string(),
                behaviour: Behaviour::Fail,
                critical: true,
                runs: runs.clone(),
            }))
            .with_command(stub("after", Behaviour::Pass, &runs));

        let result = run_suite(&suite).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(result.result("after").unwrap().status, CommandStatus::Skipped);
    }

    #[tokio::test]
    async fn test_exhausted_suite_budget_skips_remaining() {
        let runs = Arc::new(AtomicUsize::new(0));
        let suite = MacroCommand::new("budget", "")
            .with_timeout(Duration::from_millis(20))
            .with_command(stub("hang", Behaviour::Hang, &runs))
            .with_command(stub("next", Behaviour::Pass, &runs));

        let result = run_suite(&suite).await;
        assert_eq!(result.result("hang").unwrap().status, CommandStatus::Failed);
        let next = result.result("next").unwrap();
        assert_eq!(next.status, CommandStatus::Skipped);
        assert!(next.message.contains("suite timeout"));
    }
}
