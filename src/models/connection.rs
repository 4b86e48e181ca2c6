use chrono::{DateTime, Utc};
use std::fmt;

/// The three backends brought up at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Relational,
    Cache,
    DocumentStore,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Relational => "relational",
            BackendKind::Cache => "cache",
            BackendKind::DocumentStore => "document_store",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Unconfigured,
    Configuring,
    Ready,
    Failed,
}

/// Lifecycle of one backend slot
#[derive(Debug, Clone)]
pub struct BackendStatus {
    pub backend: BackendKind,
    pub state: BackendState,
    pub ready_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl BackendStatus {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            state: BackendState::Unconfigured,
            ready_at: None,
            last_error: None,
        }
    }

    pub fn mark_configuring(&mut self) {
        self.state = BackendState::Configuring;
        self.last_error = None;
    }

    pub fn mark_ready(&mut self) {
        self.state = BackendState::Ready;
        self.ready_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl ToString) {
        self.state = BackendState::Failed;
        self.ready_at = None;
        self.last_error = Some(error.to_string());
    }

    pub fn is_ready(&self) -> bool {
        self.state == BackendState::Ready
    }
}
