//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Captured leads; at most one per tracked conversation
        CREATE TABLE IF NOT EXISTS leads (
            id TEXT PRIMARY KEY,
            conversation_id TEXT UNIQUE,
            child_name TEXT,
            child_class TEXT NOT NULL,
            subjects TEXT NOT NULL,
            exam_info TEXT,
            budget_range TEXT,
            decision_maker TEXT,
            timeline TEXT,
            urgency TEXT,
            contact_phone TEXT NOT NULL,
            captured_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        PRAGMA user_version = 1;
        ",
    )?;

    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Newest-first listing
        CREATE INDEX IF NOT EXISTS idx_leads_captured_at ON leads(captured_at DESC);

        PRAGMA user_version = 2;
        ",
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        init(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_null_conversation_ids_not_unique() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();

        for id in ["a", "b"] {
            conn.execute(
                "INSERT INTO leads (id, child_class, subjects, contact_phone) VALUES (?1, '8', 'Maths', '1')",
                [id],
            )
            .unwrap();
        }

        let dup = conn.execute(
            "INSERT INTO leads (id, conversation_id, child_class, subjects, contact_phone)
             VALUES ('c', 'x', '8', 'Maths', '1'), ('d', 'x', '8', 'Maths', '1')",
            [],
        );
        assert!(dup.is_err());
    }
}
