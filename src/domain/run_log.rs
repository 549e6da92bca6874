use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which top-level operation produced a run log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunKind {
    ScrapeIpo,
    ScrapeSub,
    Evaluate,
    Trade,
    DailyJob,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::ScrapeIpo => "SCRAPE_IPO",
            RunKind::ScrapeSub => "SCRAPE_SUB",
            RunKind::Evaluate => "EVALUATE",
            RunKind::Trade => "TRADE",
            RunKind::DailyJob => "DAILY_JOB",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RunKind {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "SCRAPE_IPO" => Ok(RunKind::ScrapeIpo),
            "SCRAPE_SUB" => Ok(RunKind::ScrapeSub),
            "EVALUATE" => Ok(RunKind::Evaluate),
            "TRADE" => Ok(RunKind::Trade),
            "DAILY_JOB" => Ok(RunKind::DailyJob),
            _ => Err(format!("Unknown run kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for RunStatus {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "SUCCESS" => Ok(RunStatus::Success),
            "FAILED" => Ok(RunStatus::Failed),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// Result of one top-level pass; mirrored into the run log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_date: NaiveDate,
    pub kind: RunKind,
    pub status: RunStatus,
    pub details: String,
}

impl RunOutcome {
    pub fn success(run_date: NaiveDate, kind: RunKind, details: impl Into<String>) -> Self {
        Self {
            run_date,
            kind,
            status: RunStatus::Success,
            details: details.into(),
        }
    }

    pub fn failed(run_date: NaiveDate, kind: RunKind, details: impl Into<String>) -> Self {
        Self {
            run_date,
            kind,
            status: RunStatus::Failed,
            details: details.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

/// Stored, append-only run log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    pub id: i64,
    pub run_date: NaiveDate,
    pub kind: RunKind,
    pub status: RunStatus,
    pub details: String,
    pub created_at: DateTime<Utc>,
}
