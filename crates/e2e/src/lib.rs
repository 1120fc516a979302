//! ResQ verification harness
//!
//! This crate checks a running ResQ dashboard and its backend:
//! - Drives one Playwright browser page over a JSON-lines protocol
//! - Models every check as a [`Command`] and groups them into suites
//! - Resolves named presets through a [`CommandFactory`]
//! - Performs visual regression testing with baseline screenshots
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    TestOrchestrator                         │
//! │    ├── run_preset(name) -> SuiteResult                      │
//! │    ├── run_presets(names) -> Vec<SuiteResult>               │
//! │    └── write_results(results) -> test-results.json          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PresetRegistry ── name ──> MacroCommand (fail_fast, budget)│
//! │    └── CommandFactory ── name ──> Box<dyn Command>          │
//! │          ├── smoke, invariants, perf, robust                │
//! │          ├── safe_routes, terrain                           │
//! │          └── visual_overview, visual_layers, visual_panel   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CommandContext                                             │
//! │    ├── page: &dyn Page        (PlaywrightPage)              │
//! │    ├── api: &BackendClient    (resq-common)                 │
//! │    └── visual: &VisualTester  (baselines, diffs)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod commands;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod page;
pub mod playwright;
pub mod preset;
pub mod retry;
pub mod suite;
pub mod visual;

pub use command::{execute, Command, CommandContext, CommandResult, CommandStatus, Verdict};
pub use config::{HarnessConfig, PresetDefinition};
pub use error::{E2eError, E2eResult};
pub use orchestrator::TestOrchestrator;
pub use page::{Page, Viewport, WaitState};
pub use playwright::{Browser, PlaywrightConfig, PlaywrightPage};
pub use preset::{CommandFactory, PresetRegistry, COMMAND_NAMES};
pub use suite::{MacroCommand, SuiteResult};
pub use visual::{VisualConfig, VisualDiff, VisualTester};
