use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Final status of a monitoring cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleStatus {
    /// Still running (never persisted as a final result)
    Running,
    /// Every page was fetched and processed
    Completed,
    /// Fetching failed after retries, or storage failed mid-cycle
    Failed,
    /// The compliance check refused the target; nothing was fetched
    ComplianceDisallowed,
    /// Shutdown interrupted the cycle
    Aborted,
}

impl CycleStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::ComplianceDisallowed => "compliance_disallowed",
            Self::Aborted => "aborted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "compliance_disallowed" => Some(Self::ComplianceDisallowed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// One execution of the pipeline for one search
#[derive(Debug, Clone, PartialEq)]
pub struct MonitoringCycle {
    pub id: String,
    pub search_id: i64,
    pub tier: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_fetched: u32,
    pub vehicles_found: u32,
    pub vehicles_new: u32,
    pub vehicles_notified: u32,
    pub status: CycleStatus,
    pub error: Option<String>,
}

impl MonitoringCycle {
    /// Opens a cycle for a search
    pub fn start(search_id: i64, tier: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            search_id,
            tier: tier.into(),
            started_at: Utc::now(),
            finished_at: None,
            pages_fetched: 0,
            vehicles_found: 0,
            vehicles_new: 0,
            vehicles_notified: 0,
            status: CycleStatus::Running,
            error: None,
        }
    }

    /// Closes the cycle with a final status
    pub fn finish(&mut self, status: CycleStatus, error: Option<String>) {
        self.status = status;
        self.error = error;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some() && self.status != CycleStatus::Running
    }
}
