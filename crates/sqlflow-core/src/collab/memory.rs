//! Implementaciones en memoria de los colaboradores, para tests y demos.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use dashmap::DashMap;
use regex::Regex;

use super::{AuditLog, Cache, ExecutionEngine, Notifier, TaskHandle};
use crate::errors::FlowError;
use crate::model::{AuditLogEntry, Workflow, WorkflowId};

/// Motor que registra los workflows recibidos sin ejecutarlos.
#[derive(Default)]
pub struct RecordingEngine {
    submitted: Mutex<Vec<Workflow>>,
    next_task: AtomicU64,
    failing: AtomicBool,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn submitted(&self) -> Vec<Workflow> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn submitted_ids(&self) -> Vec<WorkflowId> {
        self.submitted().iter().map(|w| w.id).collect()
    }
}

impl ExecutionEngine for RecordingEngine {
    fn execute_workflow(&self, workflow: &Workflow) -> Result<TaskHandle, FlowError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlowError::EngineUnavailable(workflow.instance.clone()));
        }
        let n = self.next_task.fetch_add(1, Ordering::SeqCst) + 1;
        self.submitted
            .lock()
            .map_err(|_| FlowError::collaborator("engine", "recording engine poisoned"))?
            .push(workflow.clone());
        Ok(TaskHandle { task_id: format!("task-{n}") })
    }
}

/// Auditoría en memoria. Los workflows sin id de auditoría registrado reciben
/// uno nuevo en la primera consulta.
#[derive(Default)]
pub struct InMemoryAuditLog {
    audits: Mutex<HashMap<WorkflowId, i64>>,
    entries: Mutex<Vec<AuditLogEntry>>,
    failing: AtomicBool,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, workflow_id: WorkflowId, audit_id: i64) {
        if let Ok(mut a) = self.audits.lock() {
            a.insert(workflow_id, audit_id);
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn entries_for(&self, audit_id: i64) -> Vec<AuditLogEntry> {
        self.entries().into_iter().filter(|e| e.audit_id == audit_id).collect()
    }
}

impl AuditLog for InMemoryAuditLog {
    fn detail_by_workflow_id(&self, workflow_id: WorkflowId, _workflow_type: i32) -> Result<i64, FlowError> {
        let mut audits = self.audits
                             .lock()
                             .map_err(|_| FlowError::collaborator("audit", "audit store poisoned"))?;
        let next = audits.values().max().copied().unwrap_or(0) + 1;
        Ok(*audits.entry(workflow_id).or_insert(next))
    }

    fn add_log(&self, entry: AuditLogEntry) -> Result<(), FlowError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlowError::collaborator("audit", "audit store unavailable"));
        }
        self.entries
            .lock()
            .map_err(|_| FlowError::collaborator("audit", "audit store poisoned"))?
            .push(entry);
        Ok(())
    }
}

/// Caché clave/valor con invalidación por patrón glob (`*` y `?`).
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, String>,
    failing: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re)
}

impl Cache for InMemoryCache {
    fn invalidate_by_pattern(&self, pattern: &str) -> Result<usize, FlowError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlowError::collaborator("cache", "cache unavailable"));
        }
        let re = glob_to_regex(pattern).map_err(|e| FlowError::collaborator("cache", e.to_string()))?;
        let before = self.entries.len();
        self.entries.retain(|k, _| !re.is_match(k));
        Ok(before - self.entries.len())
    }
}

/// Notificador que registra los workflows notificados.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Workflow>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Workflow> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_for_execute(&self, workflow: &Workflow) -> Result<(), FlowError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(FlowError::collaborator("notify", "notification channel down"));
        }
        self.sent
            .lock()
            .map_err(|_| FlowError::collaborator("notify", "notifier poisoned"))?
            .push(workflow.clone());
        Ok(())
    }
}
