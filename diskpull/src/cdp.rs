//! Browser launch and the raw DevTools wire: JSON commands with integer
//! ids over a WebSocket, responses matched back through a pending map.

use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::errors::SurfaceError;
use crate::types::Point;

const CALL_TIMEOUT: Duration = Duration::from_secs(30);
const ENDPOINT_POLL_INTERVAL: Duration = Duration::from_millis(200);
const ENDPOINT_WAIT: Duration = Duration::from_secs(30);

type CommandResult = Result<Value, String>;
type PendingMap = HashMap<i64, oneshot::Sender<CommandResult>>;
type Pending = Arc<Mutex<PendingMap>>;

#[derive(Debug, Deserialize)]
struct WireMessage {
    id: Option<i64>,
    result: Option<Value>,
    error: Option<WireError>,
    method: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TargetInfo {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    ws_url: Option<String>,
}

/// A live DevTools session: the browser child process plus the WebSocket
/// attached to its first page target.
///
/// Commands are strictly ordered by program order; nothing here issues
/// concurrent calls. `close` is explicit and idempotent, and `Drop` is the
/// safety net for early returns.
pub struct CdpSession {
    cmd_tx: mpsc::UnboundedSender<Message>,
    pending: Pending,
    next_id: AtomicI64,
    closed: AtomicBool,
    connected: Arc<AtomicBool>,
    child: Mutex<Option<Child>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

pub(crate) fn launch_args(config: &SessionConfig) -> Vec<String> {
    vec![
        format!("--user-data-dir={}", config.profile_dir.display()),
        "--remote-debugging-port=0".to_string(),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!("--window-size={},{}", config.window_size.0, config.window_size.1),
    ]
}

impl CdpSession {
    /// Launch the browser and attach to its first page target.
    pub async fn open(config: &SessionConfig) -> Result<Self, SurfaceError> {
        // Stale from a previous run; the poll below must see a fresh one.
        let port_file = config.profile_dir.join("DevToolsActivePort");
        let _ = tokio::fs::remove_file(&port_file).await;

        info!(exec = %config.exec_path.display(), profile = %config.profile_dir.display(), "launching browser");
        let child = Command::new(&config.exec_path)
            .args(launch_args(config))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                SurfaceError::SessionClosed(format!(
                    "failed to launch browser {}: {e}",
                    config.exec_path.display()
                ))
            })?;

        let port = wait_for_devtools_port(&port_file).await?;
        let ws_url = discover_page_target(port).await?;
        debug!(%ws_url, "attaching to page target");

        let (ws_stream, _) = connect_async(ws_url.as_str())
            .await
            .map_err(|e| SurfaceError::SessionClosed(format!("devtools attach failed: {e}")))?;
        let (mut sink, mut stream) = ws_stream.split();

        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Message>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let connected = Arc::new(AtomicBool::new(true));

        let writer_connected = connected.clone();
        let writer = tokio::spawn(async move {
            while let Some(msg) = cmd_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    warn!("devtools send error: {e}");
                    break;
                }
            }
            writer_connected.store(false, Ordering::SeqCst);
        });

        let reader_pending = pending.clone();
        let reader_connected = connected.clone();
        let reader = tokio::spawn(async move {
            while let Some(next) = stream.next().await {
                let msg = match next {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("devtools socket error: {e}");
                        break;
                    }
                };
                if !msg.is_text() {
                    continue;
                }
                let text = msg.into_text().unwrap_or_default();
                match serde_json::from_str::<WireMessage>(&text) {
                    Ok(wire) => dispatch(&reader_pending, wire).await,
                    Err(e) => warn!("invalid devtools payload: {e}"),
                }
            }
            reader_connected.store(false, Ordering::SeqCst);
            // Fail anything still waiting so callers see a closed session,
            // not a silent stall.
            for (_, tx) in reader_pending.lock().await.drain() {
                let _ = tx.send(Err("websocket closed".into()));
            }
        });

        let session = Self {
            cmd_tx,
            pending,
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
            connected,
            child: Mutex::new(Some(child)),
            reader,
            writer,
        };

        session.call("Page.enable", json!({})).await?;
        session.call("Runtime.enable", json!({})).await?;
        Ok(session)
    }

    /// Issue one DevTools command and wait for its response.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, SurfaceError> {
        if self.closed.load(Ordering::SeqCst) || !self.connected.load(Ordering::SeqCst) {
            return Err(SurfaceError::SessionClosed(format!(
                "{method} issued after session ended"
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let payload = json!({ "id": id, "method": method, "params": params }).to_string();
        if self.cmd_tx.send(Message::Text(payload)).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(SurfaceError::SessionClosed(format!(
                "command channel closed before {method}"
            )));
        }

        match tokio::time::timeout(CALL_TIMEOUT, rx).await {
            Ok(Ok(Ok(result))) => Ok(result),
            Ok(Ok(Err(message))) => Err(SurfaceError::Protocol(format!("{method}: {message}"))),
            Ok(Err(_)) => Err(SurfaceError::SessionClosed(format!(
                "websocket closed while waiting for {method}"
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(SurfaceError::Timeout(format!(
                    "{method} did not answer within {CALL_TIMEOUT:?}"
                )))
            }
        }
    }

    /// Evaluate an expression in the page, returning its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, SurfaceError> {
        let result = self
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .and_then(Value::as_str)
                .or_else(|| details.get("text").and_then(Value::as_str))
                .unwrap_or("unknown script exception");
            return Err(SurfaceError::Script(text.to_string()));
        }

        Ok(result.pointer("/result/value").cloned().unwrap_or(Value::Null))
    }

    /// Evaluate a boolean probe; a non-boolean answer reads as `false`.
    pub async fn evaluate_bool(&self, expression: &str) -> Result<bool, SurfaceError> {
        Ok(self.evaluate(expression).await?.as_bool().unwrap_or(false))
    }

    pub async fn navigate(&self, url: &str) -> Result<(), SurfaceError> {
        self.call("Page.navigate", json!({ "url": url })).await.map(drop)
    }

    pub async fn current_url(&self) -> Result<String, SurfaceError> {
        let value = self.evaluate("window.location.href").await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SurfaceError::Protocol("window.location.href is not a string".into()))
    }

    pub async fn move_pointer(&self, point: Point) -> Result<(), SurfaceError> {
        self.call(
            "Input.dispatchMouseEvent",
            json!({ "type": "mouseMoved", "x": point.x, "y": point.y }),
        )
        .await
        .map(drop)
    }

    pub async fn click(&self, point: Point) -> Result<(), SurfaceError> {
        self.call(
            "Input.dispatchMouseEvent",
            json!({
                "type": "mousePressed",
                "x": point.x,
                "y": point.y,
                "button": "left",
                "clickCount": 1
            }),
        )
        .await?;
        self.call(
            "Input.dispatchMouseEvent",
            json!({
                "type": "mouseReleased",
                "x": point.x,
                "y": point.y,
                "button": "left",
                "clickCount": 1
            }),
        )
        .await
        .map(drop)
    }

    pub async fn press_escape(&self) -> Result<(), SurfaceError> {
        self.call(
            "Input.dispatchKeyEvent",
            json!({
                "type": "rawKeyDown",
                "key": "Escape",
                "windowsVirtualKeyCode": 27,
                "nativeVirtualKeyCode": 27
            }),
        )
        .await?;
        self.call(
            "Input.dispatchKeyEvent",
            json!({
                "type": "keyUp",
                "key": "Escape",
                "windowsVirtualKeyCode": 27,
                "nativeVirtualKeyCode": 27
            }),
        )
        .await
        .map(drop)
    }

    /// Route started downloads into `dir` instead of the profile default.
    pub async fn set_download_dir(&self, dir: &Path) -> Result<(), SurfaceError> {
        self.call(
            "Browser.setDownloadBehavior",
            json!({
                "behavior": "allow",
                "downloadPath": dir.display().to_string(),
                "eventsEnabled": true
            }),
        )
        .await
        .map(drop)
    }

    /// Non-blocking liveness probe: transport up and not explicitly closed.
    pub fn is_alive(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.connected.load(Ordering::SeqCst)
    }

    /// Tear the session down. Safe to call more than once; only the first
    /// call does anything.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("closing browser session");

        // Ask nicely first; the response does not matter and the browser
        // may already be gone.
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let payload = json!({ "id": id, "method": "Browser.close" }).to_string();
        let _ = self.cmd_tx.send(Message::Text(payload));
        tokio::time::sleep(Duration::from_millis(200)).await;

        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for CdpSession {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reader.abort();
        self.writer.abort();
        // The child process itself is covered by kill_on_drop.
    }
}

async fn dispatch(pending: &Pending, wire: WireMessage) {
    if let Some(id) = wire.id {
        if let Some(tx) = pending.lock().await.remove(&id) {
            let outcome = match wire.error {
                Some(err) => Err(err.message),
                None => Ok(wire.result.unwrap_or(Value::Null)),
            };
            let _ = tx.send(outcome);
        }
    } else if let Some(method) = wire.method {
        debug!(%method, "devtools event");
    }
}

/// The browser writes its ephemeral debugging port into the profile dir;
/// poll for it after launch.
async fn wait_for_devtools_port(port_file: &Path) -> Result<u16, SurfaceError> {
    let deadline = tokio::time::Instant::now() + ENDPOINT_WAIT;
    loop {
        if let Ok(contents) = tokio::fs::read_to_string(port_file).await {
            if let Some(port) = contents.lines().next().and_then(|l| l.trim().parse::<u16>().ok())
            {
                return Ok(port);
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(SurfaceError::Timeout(format!(
                "browser did not expose a DevTools endpoint within {ENDPOINT_WAIT:?}"
            )));
        }
        tokio::time::sleep(ENDPOINT_POLL_INTERVAL).await;
    }
}

async fn discover_page_target(port: u16) -> Result<String, SurfaceError> {
    let endpoint = format!("http://127.0.0.1:{port}/json/list");
    let deadline = tokio::time::Instant::now() + ENDPOINT_WAIT;
    loop {
        match fetch_targets(&endpoint).await {
            Ok(targets) => {
                let page = targets
                    .into_iter()
                    .find(|t| t.kind == "page")
                    .and_then(|t| t.ws_url);
                if let Some(ws_url) = page {
                    return Ok(ws_url);
                }
                debug!("no page target yet");
            }
            Err(e) => debug!("devtools endpoint not ready: {e}"),
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(SurfaceError::Timeout(format!(
                "no debuggable page target appeared within {ENDPOINT_WAIT:?}"
            )));
        }
        tokio::time::sleep(ENDPOINT_POLL_INTERVAL).await;
    }
}

async fn fetch_targets(endpoint: &str) -> Result<Vec<TargetInfo>, reqwest::Error> {
    reqwest::get(endpoint).await?.json().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn launch_args_carry_profile_and_window() {
        let config = SessionConfig {
            exec_path: PathBuf::from("/usr/bin/chromium"),
            profile_dir: PathBuf::from("/tmp/profile"),
            download_dir: PathBuf::from("/tmp/dl"),
            window_size: (1920, 1080),
            session_timeout: Duration::from_secs(60),
        };
        let args = launch_args(&config);
        assert!(args.contains(&"--user-data-dir=/tmp/profile".to_string()));
        assert!(args.contains(&"--window-size=1920,1080".to_string()));
        assert!(args.contains(&"--remote-debugging-port=0".to_string()));
    }

    #[test]
    fn wire_messages_parse_results_errors_and_events() {
        let ok: WireMessage =
            serde_json::from_str(r#"{"id":3,"result":{"value":true}}"#).unwrap();
        assert_eq!(ok.id, Some(3));
        assert!(ok.error.is_none());

        let err: WireMessage =
            serde_json::from_str(r#"{"id":4,"error":{"code":-32000,"message":"Target closed."}}"#)
                .unwrap();
        assert_eq!(err.error.unwrap().message, "Target closed.");

        let event: WireMessage =
            serde_json::from_str(r#"{"method":"Page.frameNavigated","params":{}}"#).unwrap();
        assert_eq!(event.id, None);
        assert_eq!(event.method.as_deref(), Some("Page.frameNavigated"));
    }
}
