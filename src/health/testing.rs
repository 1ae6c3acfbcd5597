//! In-memory `QueryExecutor` for unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::driver::{ConnectionDescriptor, DriverError, QueryExecutor, TextRow};

#[derive(Debug, Clone)]
enum Script {
    Row(TextRow),
    Down,
    Hang,
    Panic,
}

/// Answers queries from a per-host script; unknown hosts refuse connections
#[derive(Debug, Clone, Default)]
pub struct ScriptedExecutor {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_row(&self, host: &str, row: TextRow) {
        self.set(host, Script::Row(row));
    }

    pub fn set_down(&self, host: &str) {
        self.set(host, Script::Down);
    }

    pub fn set_hang(&self, host: &str) {
        self.set(host, Script::Hang);
    }

    pub fn set_panic(&self, host: &str) {
        self.set(host, Script::Panic);
    }

    /// Total queries executed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn set(&self, host: &str, script: Script) {
        self.scripts.lock().unwrap().insert(host.to_string(), script);
    }
}

#[async_trait]
impl QueryExecutor for ScriptedExecutor {
    async fn query_row(
        &self,
        descriptor: &ConnectionDescriptor,
        _sql: &str,
    ) -> Result<TextRow, DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().get(&descriptor.host).cloned();

        match script {
            Some(Script::Row(row)) => Ok(row),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Panic) => panic!("scripted panic for {}", descriptor.host),
            Some(Script::Down) | None => Err(DriverError::Connect("connection refused".into())),
        }
    }
}
