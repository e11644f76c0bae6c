//! Key-value persistence behind the ledger.
//!
//! The ledger only needs three operations, so any substrate that can store
//! bytes under string keys and list keys by prefix can back it.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    /// Replaces any existing value; last writer wins.
    fn set(&mut self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    /// Keys starting with `prefix`, in ascending order.
    fn keys(&self, prefix: &str) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn keys(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        Ok(self
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

/// `kv_entries` table of the workspace database.
pub struct SqliteKv {
    conn: Connection,
}

impl SqliteKv {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_entries WHERE key = ?", [key], |r| {
                r.get::<_, Vec<u8>>(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let updated_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv_entries(key, value, updated_at)
             VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            (key, value, &updated_at),
        )?;
        Ok(())
    }

    fn keys(&self, prefix: &str) -> anyhow::Result<Vec<String>> {
        // substr comparison instead of LIKE: emails may contain '_' and '%'.
        let mut stmt = self.conn.prepare(
            "SELECT key FROM kv_entries
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key",
        )?;
        let keys = stmt
            .query_map([prefix], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn exercise(kv: &mut dyn KvStore) {
        kv.set("gradeGarage_a@x.io_CSE", b"[1]").expect("set");
        kv.set("gradeGarage_a@x.io_ECE", b"[2]").expect("set");
        kv.set("gradeGarage_a_b@x.io_CSE", b"[3]").expect("set");
        kv.set("other", b"x").expect("set");
        kv.set("gradeGarage_a@x.io_CSE", b"[4]").expect("overwrite");

        assert_eq!(
            kv.get("gradeGarage_a@x.io_CSE").expect("get"),
            Some(b"[4]".to_vec())
        );
        assert_eq!(kv.get("missing").expect("get"), None);
        assert_eq!(
            kv.keys("gradeGarage_a@x.io_").expect("keys"),
            vec![
                "gradeGarage_a@x.io_CSE".to_string(),
                "gradeGarage_a@x.io_ECE".to_string()
            ]
        );
        assert_eq!(kv.keys("gradeGarage_").expect("keys").len(), 3);
    }

    #[test]
    fn memory_kv_contract() {
        exercise(&mut MemoryKv::new());
    }

    #[test]
    fn sqlite_kv_contract() {
        let conn = db::open_in_memory().expect("db");
        exercise(&mut SqliteKv::new(conn));
    }

    #[test]
    fn sqlite_prefix_is_literal() {
        let conn = db::open_in_memory().expect("db");
        let mut kv = SqliteKv::new(conn);
        kv.set("gradeGarage_a%b_CSE", b"[]").expect("set");
        kv.set("gradeGarage_axxb_CSE", b"[]").expect("set");
        assert_eq!(
            kv.keys("gradeGarage_a%b_").expect("keys"),
            vec!["gradeGarage_a%b_CSE".to_string()]
        );
    }
}
