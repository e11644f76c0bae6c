use std::collections::BTreeMap;

use crate::branch::BranchCode;
use crate::error::{InsufficientData, LedgerError, Result};
use crate::kv::KvStore;
use crate::ledger::{user_prefix, LedgerKey};
use crate::model::Semester;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationOptions {
    /// Merge semesters from every branch ledger the user ever wrote. When
    /// false only the selected branch's ledger is read.
    pub merge_across_all_branches: bool,
}

impl Default for AggregationOptions {
    fn default() -> Self {
        Self {
            merge_across_all_branches: true,
        }
    }
}

/// Ledger keys that belong to this user. A suffix containing '_' is another
/// user whose email starts with this one followed by '_'.
fn user_ledger_keys(kv: &dyn KvStore, user_email: &str) -> Result<Vec<String>> {
    let prefix = user_prefix(user_email);
    let keys = kv.keys(&prefix)?;
    Ok(keys
        .into_iter()
        .filter(|k| {
            let suffix = &k[prefix.len()..];
            !suffix.is_empty() && !suffix.contains('_')
        })
        .collect())
}

/// Semesters stored under one key. Anything unreadable is skipped with a
/// warning; only storage failures propagate.
fn read_entry(kv: &dyn KvStore, key: &str) -> Result<Vec<Semester>> {
    let Some(raw) = kv.get(key)? else {
        return Ok(Vec::new());
    };
    let items: Vec<serde_json::Value> = match serde_json::from_slice(&raw) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) => {
            tracing::warn!(key, "ledger entry is not an array; skipping");
            return Ok(Vec::new());
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "ledger entry is not valid JSON; skipping");
            return Ok(Vec::new());
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        if !item.get("subjects").is_some_and(serde_json::Value::is_array) {
            tracing::warn!(key, idx, "semester without a subjects list; skipping");
            continue;
        }
        match serde_json::from_value::<Semester>(item) {
            Ok(sem) if sem.number >= 1 => out.push(sem),
            Ok(sem) => {
                tracing::warn!(key, idx, number = sem.number, "semester without a number; skipping");
            }
            Err(e) => {
                tracing::warn!(key, idx, error = %e, "unreadable semester; skipping");
            }
        }
    }
    Ok(out)
}

/// Canonical semester view for analysis: latest version of each semester
/// number, non-empty only, ascending by number.
///
/// Keys are scanned in ascending key order and a later entry only replaces an
/// earlier one with a strictly greater `lastUpdated`, so ties keep the first.
pub fn canonical_semesters(
    kv: &dyn KvStore,
    user_email: &str,
    selected_branch: &BranchCode,
    opts: AggregationOptions,
) -> Result<Vec<Semester>> {
    let keys = if opts.merge_across_all_branches {
        user_ledger_keys(kv, user_email)?
    } else {
        vec![LedgerKey::new(user_email, selected_branch.clone())?.storage_key()]
    };

    let mut best: BTreeMap<u8, Semester> = BTreeMap::new();
    let mut seen = 0usize;
    for key in &keys {
        for sem in read_entry(kv, key)? {
            seen += 1;
            let replace = best
                .get(&sem.number)
                .map(|cur| sem.recency() > cur.recency())
                .unwrap_or(true);
            if replace {
                best.insert(sem.number, sem);
            }
        }
    }

    if seen == 0 {
        return Err(LedgerError::InsufficientData(InsufficientData::NoSemesters));
    }
    let canonical: Vec<Semester> = best
        .into_values()
        .filter(|s| !s.subjects.is_empty())
        .collect();
    if canonical.is_empty() {
        return Err(LedgerError::InsufficientData(InsufficientData::NoSubjects));
    }

    tracing::debug!(
        user = user_email,
        keys = keys.len(),
        semesters = canonical.len(),
        "canonical semesters built"
    );
    Ok(canonical)
}
