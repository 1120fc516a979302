//! Playwright browser automation
//!
//! A single Node process hosts the browser and one page for the whole run.
//! Requests go to it as JSON lines on stdin and replies come back on stdout,
//! tagged with the request id. A request abandoned by a timeout keeps running
//! inside the browser; its late reply is discarded when the next request
//! reads past it.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult};
use crate::page::{Page, Viewport, WaitState};

const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const playwright = require('playwright');

const send = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
const describe = (err) => String((err && err.message) || err);

(async () => {
  const opts = JSON.parse(process.argv[2]);
  const browser = await playwright[opts.browser].launch({ headless: opts.headless });
  const context = await browser.newContext({ viewport: opts.viewport });
  if (opts.mapboxToken) {
    await context.addInitScript((token) => { window.__MAPBOX_TOKEN__ = token; }, opts.mapboxToken);
  }
  const page = await context.newPage();
  const pageErrors = [];
  page.on('pageerror', (err) => pageErrors.push(describe(err)));

  const handlers = {
    goto: (m) => page.goto(m.url, { waitUntil: 'load' }).then(() => null),
    wait: (m) => page.waitForSelector(m.selector, { state: m.state, timeout: m.timeout }).then(() => null),
    click: (m) => page.click(m.selector).then(() => null),
    viewport: (m) => page.setViewportSize({ width: m.width, height: m.height }).then(() => null),
    evaluate: (m) => page.evaluate(m.expression),
    screenshot: (m) => page.screenshot({ path: m.path, fullPage: m.fullPage }).then(() => m.path),
    errors: () => Promise.resolve(pageErrors.splice(0)),
    close: () => browser.close().then(() => null),
  };

  send({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    let msg;
    try { msg = JSON.parse(line); } catch (err) { continue; }
    const handler = handlers[msg.op];
    if (!handler) {
      send({ id: msg.id, ok: false, error: `unknown op ${msg.op}` });
      continue;
    }
    handler(msg).then(
      (value) => {
        send({ id: msg.id, ok: true, value: value === undefined ? null : value });
        if (msg.op === 'close') setImmediate(() => process.exit(0));
      },
      (err) => send({ id: msg.id, ok: false, error: describe(err) }),
    );
  }
})().catch((err) => {
  send({ id: 0, ok: false, error: describe(err) });
  process.exit(1);
});
"#;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(E2eError::Config(format!("unknown browser '{}'", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,
    pub screenshot_dir: PathBuf,
    /// Exposed to the page as `window.__MAPBOX_TOKEN__`
    pub mapbox_token: Option<String>,
    /// Where `require('playwright')` resolves from (usually the dashboard checkout)
    pub node_modules_dir: Option<PathBuf>,
    pub launch_timeout: Duration,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            screenshot_dir: PathBuf::from("test-results/screenshots"),
            mapbox_token: None,
            node_modules_dir: None,
            launch_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DriverReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<String>,
}

struct DriverIo {
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

/// Playwright-backed [`Page`]
pub struct PlaywrightPage {
    io: Mutex<DriverIo>,
    child: Mutex<Child>,
    screenshot_dir: PathBuf,
    _script_dir: tempfile::TempDir,
}

impl PlaywrightPage {
    /// Spawn the driver and wait until the browser page is ready
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed().await?;
        std::fs::create_dir_all(&config.screenshot_dir)?;
        let screenshot_dir = std::fs::canonicalize(&config.screenshot_dir)?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("driver.js");
        std::fs::write(&script_path, DRIVER_SCRIPT)?;

        let options = json!({
            "browser": config.browser.as_str(),
            "headless": config.headless,
            "viewport": { "width": config.viewport.width, "height": config.viewport.height },
            "mapboxToken": config.mapbox_token,
        });

        info!(
            "Launching {} ({})",
            config.browser.as_str(),
            if config.headless { "headless" } else { "headed" }
        );

        let mut cmd = TokioCommand::new("node");
        cmd.arg(&script_path)
            .arg(options.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.node_modules_dir {
            cmd.env("NODE_PATH", dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| E2eError::Driver(format!("failed to spawn node: {}", e)))?;

        let stdin = child.stdin.take().ok_or(E2eError::DriverClosed)?;
        let stdout = child.stdout.take().ok_or(E2eError::DriverClosed)?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "playwright", "{}", line);
                }
            });
        }

        let mut io = DriverIo {
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        };

        let ready = tokio::time::timeout(config.launch_timeout, read_reply(&mut io, 0))
            .await
            .map_err(|_| E2eError::Timeout {
                what: "browser launch".to_string(),
                after: config.launch_timeout,
            })??;
        debug!("Driver ready: {}", ready);

        Ok(Self {
            io: Mutex::new(io),
            child: Mutex::new(child),
            screenshot_dir,
            _script_dir: script_dir,
        })
    }

    async fn check_playwright_installed() -> E2eResult<()> {
        let status = TokioCommand::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    async fn request(&self, mut message: serde_json::Value) -> E2eResult<serde_json::Value> {
        let mut io = self.io.lock().await;
        let id = io.next_id;
        io.next_id += 1;
        message["id"] = json!(id);

        debug!("-> driver {}", message);
        let mut line = message.to_string();
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        read_reply(&mut io, id).await
    }
}

/// Read replies until the one tagged `id`, dropping stale ones
async fn read_reply(io: &mut DriverIo, id: u64) -> E2eResult<serde_json::Value> {
    loop {
        let line = io
            .stdout
            .next_line()
            .await?
            .ok_or(E2eError::DriverClosed)?;
        let reply: DriverReply = match serde_json::from_str(&line) {
            Ok(reply) => reply,
            Err(_) => {
                debug!(target: "playwright", "{}", line);
                continue;
            }
        };

        if reply.id != id {
            debug!("Discarding stale driver reply {}", reply.id);
            continue;
        }

        return if reply.ok {
            Ok(reply.value)
        } else {
            Err(E2eError::Driver(
                reply.error.unwrap_or_else(|| "unknown driver error".to_string()),
            ))
        };
    }
}

#[async_trait]
impl Page for PlaywrightPage {
    async fn goto(&self, url: &str) -> E2eResult<()> {
        self.request(json!({ "op": "goto", "url": url })).await?;
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> E2eResult<()> {
        self.request(json!({
            "op": "wait",
            "selector": selector,
            "state": state.as_str(),
            "timeout": timeout.as_millis() as u64,
        }))
        .await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        self.request(json!({ "op": "click", "selector": selector })).await?;
        Ok(())
    }

    async fn set_viewport(&self, viewport: Viewport) -> E2eResult<()> {
        self.request(json!({
            "op": "viewport",
            "width": viewport.width,
            "height": viewport.height,
        }))
        .await?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> E2eResult<serde_json::Value> {
        self.request(json!({ "op": "evaluate", "expression": expression })).await
    }

    async fn screenshot(&self, name: &str, full_page: bool) -> E2eResult<PathBuf> {
        let path = self.screenshot_dir.join(format!("{}.png", name));
        self.request(json!({
            "op": "screenshot",
            "path": path.to_string_lossy(),
            "fullPage": full_page,
        }))
        .await?;
        Ok(path)
    }

    async fn take_page_errors(&self) -> E2eResult<Vec<String>> {
        let value = self.request(json!({ "op": "errors" })).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn close(&self) -> E2eResult<()> {
        let close = self.request(json!({ "op": "close" }));
        if tokio::time::timeout(Duration::from_secs(10), close).await.is_err() {
            warn!("Browser did not close in time; killing driver");
        }

        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_from_str() {
        assert_eq!("webkit".parse::<Browser>().unwrap(), Browser::Webkit);
        assert!("netscape".parse::<Browser>().is_err());
    }

    #[test]
    fn test_driver_handles_every_op() {
        for op in ["goto", "wait", "click", "viewport", "evaluate", "screenshot", "errors", "close"] {
            assert!(
                DRIVER_SCRIPT.contains(&format!("{}: ", op)),
                "driver has no handler for {}",
                op
            );
        }
    }

    #[test]
    fn test_reply_defaults() {
        let reply: DriverReply = serde_json::from_str(r#"{"id": 3, "ok": true}"#).unwrap();
        assert_eq!(reply.id, 3);
        assert!(reply.value.is_null());
        assert!(reply.error.is_none());
    }
}
