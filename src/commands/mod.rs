pub mod calls;
pub mod dispatch;
pub mod expenses;
pub mod export;
pub mod init;
pub mod session;
pub mod status;
pub mod watch;

/// Truncate to `max_chars` characters, never splitting a multi-byte char.
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use fieldservice::db::Database;
    use tempfile::tempdir;

    pub fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    /// Signed-in engineer plus one customer. Returns (engineer_id, customer_id).
    pub fn signed_in(db: &Database) -> (i64, i64) {
        let engineer_id = db.create_engineer("Dana Field", "dana@example.com").unwrap();
        db.start_session(engineer_id).unwrap();
        let customer_id = db
            .create_customer("Acme Ltd", Some("ops@acme.test"), None, Some("Acme"), Some("1 Main St"))
            .unwrap();
        (engineer_id, customer_id)
    }
}
