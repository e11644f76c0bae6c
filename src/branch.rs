use serde::Serialize;

use crate::error::{Field, LedgerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    pub code: &'static str,
    pub name: &'static str,
}

pub const BRANCHES: [BranchInfo; 5] = [
    BranchInfo {
        code: "CSE",
        name: "Computer Science and Engineering",
    },
    BranchInfo {
        code: "ECE",
        name: "Electronics and Communication Engineering",
    },
    BranchInfo {
        code: "EEE",
        name: "Electrical and Electronics Engineering",
    },
    BranchInfo {
        code: "ME",
        name: "Mechanical Engineering",
    },
    BranchInfo {
        code: "CE",
        name: "Civil Engineering",
    },
];

pub const DEFAULT_BRANCH: &str = "CSE";

pub fn find_branch(code: &str) -> Option<&'static BranchInfo> {
    BRANCHES.iter().find(|b| b.code == code)
}

/// Branch suffix of a ledger key.
///
/// Codes outside the catalog are accepted: older ledgers may carry branch codes
/// that are no longer offered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchCode(String);

impl BranchCode {
    pub fn parse(raw: &str) -> Result<Self> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(LedgerError::validation(
                Field::Branch,
                "branch code must not be empty",
            ));
        }
        // '_' separates the user and branch parts of a ledger key.
        if code.contains('_') || code.chars().any(char::is_whitespace) {
            return Err(LedgerError::validation(
                Field::Branch,
                "branch code must not contain '_' or whitespace",
            ));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_known(&self) -> bool {
        find_branch(&self.0).is_some()
    }
}

impl Default for BranchCode {
    fn default() -> Self {
        Self(DEFAULT_BRANCH.to_string())
    }
}

impl std::fmt::Display for BranchCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
