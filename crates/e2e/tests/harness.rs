//! Presets run end to end against a mock backend and an in-memory page

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use resq_e2e::{
    CommandStatus, E2eError, E2eResult, HarnessConfig, Page, PresetDefinition, TestOrchestrator,
    Viewport, VisualConfig, WaitState,
};

/// What the fake page saw, shared with the test body
#[derive(Default)]
struct PageLog {
    visits: Mutex<Vec<String>>,
    evaluated: Mutex<Vec<String>>,
    pending_errors: Mutex<Vec<String>>,
    terrain: AtomicBool,
    /// Raise an uncaught page error on every click
    error_on_click: AtomicBool,
    closed: AtomicBool,
}

impl PageLog {
    fn evaluated_matching(&self, needle: &str) -> usize {
        self.evaluated
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.contains(needle))
            .count()
    }
}

/// A dashboard that answers the test API the way a healthy one does
struct FakePage {
    log: Arc<PageLog>,
    screenshot_dir: PathBuf,
}

#[async_trait]
impl Page for FakePage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.log.visits.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn wait_for_selector(&self, _: &str, _: WaitState, _: Duration) -> E2eResult<()> {
        Ok(())
    }

    async fn click(&self, _selector: &str) -> E2eResult<()> {
        if self.log.error_on_click.load(Ordering::SeqCst) {
            self.log
                .pending_errors
                .lock()
                .unwrap()
                .push("TypeError: cannot read properties of undefined".to_string());
        }
        Ok(())
    }

    async fn set_viewport(&self, _viewport: Viewport) -> E2eResult<()> {
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> E2eResult<Value> {
        self.log.evaluated.lock().unwrap().push(expression.to_string());

        let value = if expression.starts_with("typeof") {
            json!(true)
        } else if expression.contains("setTerrainEnabled(true)") {
            self.log.terrain.store(true, Ordering::SeqCst);
            Value::Null
        } else if expression.contains("setTerrainEnabled(false)") {
            self.log.terrain.store(false, Ordering::SeqCst);
            Value::Null
        } else if expression.contains("hasTerrain()") {
            json!(self.log.terrain.load(Ordering::SeqCst))
        } else if expression.contains("queryTerrainElevation") {
            json!(52.5)
        } else if expression.contains("getLayerStates") {
            json!([
                { "id": "hazard-zones", "visible": true, "opacity": 0.7 },
                { "id": "safe-routes", "visible": true, "opacity": 1.0 },
                { "id": "evacuation-routes", "visible": false }
            ])
        } else if expression.contains("validateLayers") {
            json!({ "valid": true, "errors": [] })
        } else if expression.contains("getEntriesByType") {
            json!({
                "dom_content_loaded_ms": 640.0,
                "load_ms": 1210.0,
                "first_contentful_paint_ms": 410.0
            })
        } else {
            json!(true)
        };
        Ok(value)
    }

    async fn screenshot(&self, name: &str, _full_page: bool) -> E2eResult<PathBuf> {
        let path = self.screenshot_dir.join(format!("{}.png", name));
        image::RgbaImage::from_pixel(8, 8, image::Rgba([30, 60, 90, 255])).save(&path)?;
        Ok(path)
    }

    async fn take_page_errors(&self) -> E2eResult<Vec<String>> {
        Ok(std::mem::take(&mut *self.log.pending_errors.lock().unwrap()))
    }

    async fn close(&self) -> E2eResult<()> {
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn route(id: &str) -> Value {
    json!({
        "id": id,
        "coordinates": [[-122.4194, 37.7749], [-122.35, 37.79], [-122.2712, 37.8044]],
        "distance_m": 18250.0
    })
}

async fn spawn_backend(zones_status: StatusCode) -> String {
    let app = Router::new()
        .route(
            "/api/hazard-zones",
            get(move || async move {
                if zones_status.is_success() {
                    Ok(Json(json!([
                        { "id": "z1", "hazard_type": "flood", "severity": "high" }
                    ])))
                } else {
                    Err(zones_status)
                }
            }),
        )
        .route("/api/safe-routes", get(|| async { Json(json!([route("safe-1")])) }))
        .route("/api/evacuation-routes", get(|| async { Json(json!([route("evac-1")])) }))
        .route(
            "/api/risk-assessment",
            get(|| async { Json(json!({ "risk_level": "moderate", "risk_score": 0.4 })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(backend_url: String, root: &Path) -> HarnessConfig {
    HarnessConfig {
        backend_url,
        frontend_url: "http://dashboard.test".to_string(),
        output_dir: root.join("results"),
        screenshot_dir: root.join("shots"),
        visual: VisualConfig {
            baseline_dir: root.join("baselines"),
            diff_dir: root.join("diffs"),
            ..Default::default()
        },
        ..Default::default()
    }
}

fn orchestrator(config: &HarnessConfig) -> (TestOrchestrator, Arc<PageLog>) {
    std::fs::create_dir_all(&config.screenshot_dir).unwrap();
    let log = Arc::new(PageLog::default());
    let page = FakePage {
        log: log.clone(),
        screenshot_dir: config.screenshot_dir.clone(),
    };
    let orchestrator = TestOrchestrator::with_page(config, Box::new(page)).unwrap();
    (orchestrator, log)
}

#[tokio::test]
async fn test_map_core_stops_when_hazard_zones_fail() {
    let dir = tempfile::tempdir().unwrap();
    let url = spawn_backend(StatusCode::INTERNAL_SERVER_ERROR).await;
    let (orchestrator, log) = orchestrator(&config(url, dir.path()));

    let result = orchestrator.run_preset("map-core").await.unwrap();

    assert_eq!(result.total, 3);
    assert_eq!(result.failed, 1);
    assert_eq!(result.skipped, 2);
    assert!(!result.success());

    let smoke = result.result("smoke").unwrap();
    assert_eq!(smoke.status, CommandStatus::Failed);
    assert!(smoke.message.contains("500"), "{}", smoke.message);
    assert_eq!(result.result("invariants").unwrap().status, CommandStatus::Skipped);
    assert_eq!(result.result("perf").unwrap().status, CommandStatus::Skipped);

    // Skipped commands never touched the page
    assert!(log.visits.lock().unwrap().is_empty());
    assert_eq!(log.evaluated_matching("getLayerStates"), 0);
}

#[tokio::test]
async fn test_map_core_passes_against_healthy_dashboard() {
    let dir = tempfile::tempdir().unwrap();
    let url = spawn_backend(StatusCode::OK).await;
    let (orchestrator, _log) = orchestrator(&config(url, dir.path()));

    let result = orchestrator.run_preset("map-core").await.unwrap();

    assert!(result.success());
    assert_eq!(result.passed, 3);
    let names: Vec<_> = result.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["smoke", "invariants", "perf"]);
}

#[tokio::test]
async fn test_full_preset_runs_every_command() {
    let dir = tempfile::tempdir().unwrap();
    let url = spawn_backend(StatusCode::OK).await;
    let (orchestrator, log) = orchestrator(&config(url, dir.path()));

    let result = orchestrator.run_preset("full").await.unwrap();

    let failures: Vec<_> = result
        .results
        .iter()
        .filter(|r| !r.success())
        .map(|r| format!("{}: {}", r.name, r.message))
        .collect();
    assert!(failures.is_empty(), "{:?}", failures);
    assert_eq!(result.passed, 9);
    assert!(!log.terrain.load(Ordering::SeqCst));

    // Missing baselines pass; promoting the captures creates them
    let updated = orchestrator.update_baselines().unwrap();
    assert_eq!(updated, vec!["visual_layers", "visual_overview", "visual_panel"]);

    let again = orchestrator.run_preset("visual").await.unwrap();
    assert!(again.success());
    assert!(again
        .results
        .iter()
        .all(|r| r.details["diff_percent"].as_f64() == Some(0.0)));
}

#[tokio::test]
async fn test_robust_fails_on_uncaught_page_errors() {
    let dir = tempfile::tempdir().unwrap();
    let url = spawn_backend(StatusCode::OK).await;
    let (orchestrator, log) = orchestrator(&config(url, dir.path()));
    log.error_on_click.store(true, Ordering::SeqCst);

    let result = orchestrator.run_preset("robust").await.unwrap();

    let robust = result.result("robust").unwrap();
    assert_eq!(robust.status, CommandStatus::Failed);
    assert!(robust.message.contains("uncaught page error"));
}

#[tokio::test]
async fn test_unknown_preset_rejected_before_anything_runs() {
    let dir = tempfile::tempdir().unwrap();
    let url = spawn_backend(StatusCode::OK).await;
    let (orchestrator, log) = orchestrator(&config(url, dir.path()));

    let names = vec!["smoke".to_string(), "does-not-exist".to_string()];
    let err = orchestrator.run_presets(&names).await.unwrap_err();

    assert!(matches!(err, E2eError::UnknownPreset(ref n) if n == "does-not-exist"));
    assert!(log.visits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_config_preset_with_unknown_command_fails_to_build() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config("http://127.0.0.1:9".to_string(), dir.path());
    config.presets.push(PresetDefinition {
        name: "release".to_string(),
        description: String::new(),
        fail_fast: true,
        timeout_secs: None,
        commands: vec!["smoke".to_string(), "screenshot_everything".to_string()],
    });

    let log = Arc::new(PageLog::default());
    let page = FakePage {
        log: log.clone(),
        screenshot_dir: dir.path().to_path_buf(),
    };
    let err = TestOrchestrator::with_page(&config, Box::new(page)).err().unwrap();

    assert!(matches!(err, E2eError::UnknownCommand(ref n) if n == "screenshot_everything"));
    assert!(log.visits.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_results_written_and_browser_closed() {
    let dir = tempfile::tempdir().unwrap();
    let url = spawn_backend(StatusCode::OK).await;
    let (orchestrator, log) = orchestrator(&config(url, dir.path()));

    let results = orchestrator
        .run_presets(&["smoke".to_string(), "safe_routes".to_string()])
        .await
        .unwrap();
    let path = orchestrator.write_results(&results).unwrap();
    orchestrator.shutdown().await.unwrap();

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(path.file_name().unwrap(), "test-results.json");
    assert_eq!(written[0]["suite"], "smoke");
    assert_eq!(written[1]["results"][0]["status"], "passed");
    assert_eq!(written[1]["results"][0]["details"]["seed"], 42);
    assert!(log.closed.load(Ordering::SeqCst));
}
