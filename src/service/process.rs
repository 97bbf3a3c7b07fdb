// Subprocess-backed transform service speaking newline-delimited JSON

use super::{Message, ServiceLauncher, TransformOptions, TransformOutput, TransformService};
use crate::config::ServiceCommand;
use crate::error::{CompileMessage, ServiceError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use which::which;

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    source: &'a str,
    options: &'a TransformOptions,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    map: Option<Value>,
    #[serde(default)]
    warnings: Vec<Message>,
    #[serde(default)]
    errors: Vec<Message>,
}

impl Response {
    fn into_output(self) -> Result<TransformOutput, ServiceError> {
        if !self.errors.is_empty() {
            return Err(ServiceError::Compile {
                errors: self.errors.into_iter().map(compile_message).collect(),
            });
        }
        Ok(TransformOutput {
            code: self.code,
            map: self.map.and_then(normalize_map),
            warnings: self.warnings,
        })
    }
}

fn compile_message(message: Message) -> CompileMessage {
    match message.location {
        Some(loc) => CompileMessage {
            text: message.text,
            file: loc.file,
            line: Some(loc.line),
            column: Some(loc.column),
        },
        None => CompileMessage {
            text: message.text,
            file: None,
            line: None,
            column: None,
        },
    }
}

/// esbuild hands maps back as JSON text; keep them as objects
fn normalize_map(map: Value) -> Option<Value> {
    match map {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => serde_json::from_str(&text).ok(),
        other => Some(other),
    }
}

type Reply = oneshot::Sender<Result<Response, ServiceError>>;

#[derive(Default)]
struct Inflight {
    closed: bool,
    waiting: HashMap<u64, Reply>,
}

/// A running service subprocess
///
/// Requests are written to the child's stdin one JSON object per line and
/// answered on stdout the same way. A reader task routes each response to
/// its caller by `id`, so any number of transforms may be in flight.
pub struct ProcessService {
    stdin: tokio::sync::Mutex<Option<ChildStdin>>,
    child: tokio::sync::Mutex<Option<Child>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    inflight: Arc<Mutex<Inflight>>,
    next_id: AtomicU64,
}

impl ProcessService {
    fn from_child(mut child: Child) -> Result<Self, ServiceError> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ServiceError::Spawn("child stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ServiceError::Spawn("child stdout not captured".to_string()))?;

        let inflight = Arc::new(Mutex::new(Inflight::default()));
        let reader = tokio::spawn(read_responses(stdout, inflight.clone()));

        Ok(Self {
            stdin: tokio::sync::Mutex::new(Some(stdin)),
            child: tokio::sync::Mutex::new(Some(child)),
            reader: Mutex::new(Some(reader)),
            inflight,
            next_id: AtomicU64::new(1),
        })
    }
}

async fn read_responses(stdout: ChildStdout, inflight: Arc<Mutex<Inflight>>) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let response: Response = match serde_json::from_str(&line) {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!(error = %e, "unparseable esbuild service response");
                        continue;
                    }
                };
                let reply = inflight.lock().waiting.remove(&response.id);
                match reply {
                    Some(tx) => {
                        let _ = tx.send(Ok(response));
                    }
                    None => tracing::warn!(id = response.id, "response for unknown request"),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "failed reading esbuild service output");
                break;
            }
        }
    }

    let orphaned = {
        let mut guard = inflight.lock();
        guard.closed = true;
        std::mem::take(&mut guard.waiting)
    };
    for (_, tx) in orphaned {
        let _ = tx.send(Err(ServiceError::Protocol(
            "service exited before responding".to_string(),
        )));
    }
}

#[async_trait]
impl TransformService for ProcessService {
    async fn transform(
        &self,
        source: &str,
        options: &TransformOptions,
    ) -> Result<TransformOutput, ServiceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut line = serde_json::to_string(&Request {
            id,
            source,
            options,
        })
        .map_err(|e| ServiceError::Protocol(e.to_string()))?;
        line.push('\n');

        let (tx, rx) = oneshot::channel();
        {
            let mut guard = self.inflight.lock();
            if guard.closed {
                return Err(ServiceError::Stopped);
            }
            guard.waiting.insert(id, tx);
        }

        let written = {
            let mut stdin = self.stdin.lock().await;
            match stdin.as_mut() {
                Some(pipe) => match pipe.write_all(line.as_bytes()).await {
                    Ok(()) => pipe.flush().await.map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                },
                None => Err(String::new()),
            }
        };
        if let Err(message) = written {
            self.inflight.lock().waiting.remove(&id);
            return Err(if message.is_empty() {
                ServiceError::Stopped
            } else {
                ServiceError::Protocol(format!("failed to send request: {}", message))
            });
        }

        rx.await
            .map_err(|_| ServiceError::Protocol("request dropped".to_string()))??
            .into_output()
    }

    async fn stop(&self) {
        // closing stdin lets a well-behaved service exit on its own
        self.stdin.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.start_kill() {
                tracing::debug!(error = %e, "esbuild service already exited");
            }
            let _ = child.wait().await;
        }

        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            let _ = reader.await;
        }
    }
}

/// Launches [`ProcessService`]s from a configured command line
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: ServiceCommand,
}

impl ProcessLauncher {
    pub fn new(command: ServiceCommand) -> Self {
        Self { command }
    }

    /// Locate the service executable
    ///
    /// Bare names are looked up in PATH; anything with a directory part is
    /// used as given.
    pub fn program(&self) -> Result<PathBuf, ServiceError> {
        let program = &self.command.program;
        if program.components().count() > 1 {
            return Ok(program.clone());
        }
        which(program).map_err(|_| ServiceError::NotFound(program.display().to_string()))
    }
}

#[async_trait]
impl ServiceLauncher for ProcessLauncher {
    async fn launch(&self) -> Result<Arc<dyn TransformService>, ServiceError> {
        let program = self.program()?;
        let child = Command::new(&program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ServiceError::Spawn(format!("{}: {}", program.display(), e)))?;

        tracing::debug!(program = %program.display(), pid = ?child.id(), "spawned esbuild service");
        Ok(Arc::new(ProcessService::from_child(child)?))
    }
}
