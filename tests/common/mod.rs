// Shared fakes for plugin integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bundler_esbuild::error::CompileMessage;
use bundler_esbuild::service::{Location, Message};
use bundler_esbuild::{
    BuildMeta, PluginContext, ServiceError, ServiceLauncher, TransformOptions, TransformOutput,
    TransformService,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Bundler context that records warnings
#[derive(Default)]
pub struct RecordingContext {
    pub watch_mode: bool,
    pub warnings: Mutex<Vec<String>>,
}

impl RecordingContext {
    pub fn one_shot() -> Self {
        Self::default()
    }

    pub fn watching() -> Self {
        Self {
            watch_mode: true,
            ..Default::default()
        }
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}

impl PluginContext for RecordingContext {
    fn warn(&self, message: String) {
        self.warnings.lock().push(message);
    }

    fn meta(&self) -> BuildMeta {
        BuildMeta {
            watch_mode: self.watch_mode,
        }
    }
}

/// Counters shared by a launcher and every service it starts
#[derive(Default)]
pub struct Stats {
    pub launches: AtomicUsize,
    pub stops: AtomicUsize,
    pub requests: Mutex<Vec<(String, TransformOptions)>>,
}

impl Stats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, TransformOptions)> {
        self.requests.lock().clone()
    }
}

/// In-memory stand-in for the esbuild service
///
/// Sources containing `SYNTAX_ERROR` fail to compile, `EMPTY` yields no
/// code, and `WARN` adds a located warning.
pub struct FakeService {
    stats: Arc<Stats>,
    stopped: AtomicUsize,
}

#[async_trait]
impl TransformService for FakeService {
    async fn transform(
        &self,
        source: &str,
        options: &TransformOptions,
    ) -> Result<TransformOutput, ServiceError> {
        if self.stopped.load(Ordering::SeqCst) > 0 {
            return Err(ServiceError::Stopped);
        }
        self.stats
            .requests
            .lock()
            .push((source.to_string(), options.clone()));
        tokio::task::yield_now().await;

        if source.contains("SYNTAX_ERROR") {
            return Err(ServiceError::Compile {
                errors: vec![CompileMessage {
                    text: "Unexpected token".to_string(),
                    file: options.sourcefile.clone(),
                    line: Some(1),
                    column: Some(0),
                }],
            });
        }
        if source.contains("EMPTY") {
            return Ok(TransformOutput::default());
        }

        let mut warnings = vec![];
        if source.contains("WARN") {
            warnings.push(Message {
                text: "Suspicious use of WARN".to_string(),
                location: Some(Location {
                    file: options.sourcefile.clone(),
                    line: 1,
                    column: 4,
                }),
            });
            warnings.push(Message {
                text: "global note".to_string(),
                location: None,
            });
        }

        let code = if options.minify {
            format!("/*min {}*/{}", options.target, source.replace(' ', ""))
        } else {
            format!("/*{} {}*/{}", options.loader, options.target, source)
        };
        Ok(TransformOutput {
            code: Some(code),
            map: options
                .sourcemap
                .then(|| serde_json::json!({"version": 3, "mappings": ""})),
            warnings,
        })
    }

    async fn stop(&self) {
        if self.stopped.fetch_add(1, Ordering::SeqCst) == 0 {
            self.stats.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct FakeLauncher {
    pub stats: Arc<Stats>,
}

impl FakeLauncher {
    pub fn new() -> (Arc<Self>, Arc<Stats>) {
        let stats = Arc::new(Stats::default());
        (
            Arc::new(Self {
                stats: stats.clone(),
            }),
            stats,
        )
    }
}

#[async_trait]
impl ServiceLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Arc<dyn TransformService>, ServiceError> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeService {
            stats: self.stats.clone(),
            stopped: AtomicUsize::new(0),
        }))
    }
}
