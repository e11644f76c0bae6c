use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    UserEmail,
    Branch,
    Name,
    Marks,
    Credits,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserEmail => "userEmail",
            Self::Branch => "branch",
            Self::Name => "name",
            Self::Marks => "marks",
            Self::Credits => "credits",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why aggregation produced nothing to analyze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum InsufficientData {
    NoSemesters,
    NoSubjects,
}

impl InsufficientData {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoSemesters => "no grades data found; add your grades first",
            Self::NoSubjects => "no subject data found; add subjects to your semesters",
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{field}: {reason}")]
    Validation { field: Field, reason: String },
    #[error("maximum of {max} semesters allowed")]
    LimitExceeded { max: u8 },
    #[error("{0}")]
    InsufficientData(InsufficientData),
    #[error("analysis request failed: {0}")]
    Transport(String),
    #[error("semester not found: {0}")]
    SemesterNotFound(String),
    #[error("subject not found: {0}")]
    SubjectNotFound(String),
    #[error("ledger entry {key} could not be read: {source}")]
    CorruptLedger {
        key: String,
        source: serde_json::Error,
    },
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
    #[error("failed to serialize ledger: {0}")]
    Serialize(serde_json::Error),
}

impl std::fmt::Display for InsufficientData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl LedgerError {
    pub fn validation(field: Field, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Stable machine code surfaced over IPC.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::LimitExceeded { .. } => "limit_exceeded",
            Self::InsufficientData(_) => "insufficient_data",
            Self::Transport(_) => "transport_error",
            Self::SemesterNotFound(_) | Self::SubjectNotFound(_) => "not_found",
            Self::CorruptLedger { .. } => "corrupt_ledger",
            Self::Storage(_) => "storage_failed",
            Self::Serialize(_) => "serialize_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { field, reason } => Some(json!({
                "field": field.as_str(),
                "reason": reason,
            })),
            Self::LimitExceeded { max } => Some(json!({ "max": max })),
            Self::InsufficientData(reason) => Some(json!({ "reason": reason })),
            Self::SemesterNotFound(id) => Some(json!({ "semesterId": id })),
            Self::SubjectNotFound(id) => Some(json!({ "subjectId": id })),
            Self::CorruptLedger { key, .. } => Some(json!({ "key": key })),
            Self::Transport(_) => Some(json!({ "retryable": true })),
            Self::Storage(_) | Self::Serialize(_) => None,
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
