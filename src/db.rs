use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradeledger.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_entries(
            key TEXT PRIMARY KEY,
            value BLOB NOT NULL
        )",
        [],
    )?;
    // Workspaces created before write timestamps were tracked lack the column.
    ensure_kv_entries_updated_at(conn)?;
    Ok(())
}

fn ensure_kv_entries_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "kv_entries", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE kv_entries ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
