/// Storage for rectification requests (the administrative record of record)

mod types;

pub use types::{RectificationRequest, RequestStatus};

use rusqlite::{Connection, OptionalExtension, Result};
use serde_json::Value;
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("../../../../sql/init_requests.sql");

pub struct RequestStore {
    db: Mutex<Connection>,
}

impl RequestStore {
    /// Opens the store at the given path and initializes the schema.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// In-memory store, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Looks up the request for a boleta, if any.
    pub fn get_request(&self, boleta: &str) -> Result<Option<RectificationRequest>> {
        let db = self.db.lock().unwrap();
        db.query_row(
            "SELECT boleta, codigo, dni, status, message, final_data, updated_at
             FROM rectification_requests WHERE boleta = ?",
            [boleta],
            |row| {
                let status: String = row.get(3)?;
                let final_data: Option<String> = row.get(5)?;
                Ok(RectificationRequest {
                    boleta: row.get(0)?,
                    codigo: row.get(1)?,
                    dni: row.get(2)?,
                    status: RequestStatus::parse(&status),
                    message: row.get(4)?,
                    final_data: final_data.and_then(|s| serde_json::from_str(&s).ok()),
                    updated_at: row.get(6)?,
                })
            },
        )
        .optional()
    }

    /// Creates or refreshes a request at login time.
    ///
    /// A new boleta starts as PENDING; an existing non-DONE row keeps its
    /// current status but picks up the latest codigo/dni. DONE rows are the
    /// caller's responsibility to reject before calling this.
    pub fn upsert_pending(&self, boleta: &str, codigo: &str, dni: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO rectification_requests (boleta, codigo, dni, status, updated_at)
             VALUES (?1, ?2, ?3, 'PENDING', datetime('now'))
             ON CONFLICT(boleta) DO UPDATE SET
                 codigo = excluded.codigo,
                 dni = excluded.dni,
                 updated_at = datetime('now')",
            (boleta, codigo, dni),
        )?;
        Ok(())
    }

    /// Stores the final plan and flips the request to DONE.
    ///
    /// Update-only: a rectification is one-time, so a request that is
    /// already DONE is left untouched, and a boleta that never logged in
    /// gets no row minted for it. Returns `false` in both cases.
    pub fn mark_done(&self, boleta: &str, final_data: &Value, message: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let payload = final_data.to_string();
        let updated = db.execute(
            "UPDATE rectification_requests
             SET status = 'DONE', message = ?2, final_data = ?3, updated_at = datetime('now')
             WHERE boleta = ?1 AND status != 'DONE'",
            (boleta, message, &payload),
        )?;
        Ok(updated > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_and_lookup() {
        let store = RequestStore::in_memory().unwrap();
        assert!(store.get_request("B-100").unwrap().is_none());

        store.upsert_pending("B-100", "C-200", "12345678").unwrap();
        let req = store.get_request("B-100").unwrap().unwrap();
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.codigo, "C-200");
        assert!(req.final_data.is_none());
    }

    #[test]
    fn test_upsert_refreshes_credentials() {
        let store = RequestStore::in_memory().unwrap();
        store.upsert_pending("B-100", "C-200", "12345678").unwrap();
        store.upsert_pending("B-100", "C-201", "87654321").unwrap();

        let req = store.get_request("B-100").unwrap().unwrap();
        assert_eq!(req.codigo, "C-201");
        assert_eq!(req.dni, "87654321");
        assert_eq!(req.status, RequestStatus::Pending);
    }

    #[test]
    fn test_mark_done_is_one_shot() {
        let store = RequestStore::in_memory().unwrap();
        store.upsert_pending("B-100", "C-200", "12345678").unwrap();

        let data = json!({"changes": []});
        assert!(store.mark_done("B-100", &data, "Submitted").unwrap());

        let req = store.get_request("B-100").unwrap().unwrap();
        assert_eq!(req.status, RequestStatus::Done);
        assert_eq!(req.final_data.unwrap(), data);
        assert_eq!(req.message.as_deref(), Some("Submitted"));

        // Second submit is rejected and the stored plan is untouched
        let other = json!({"changes": ["tampered"]});
        assert!(!store.mark_done("B-100", &other, "again").unwrap());
        let req = store.get_request("B-100").unwrap().unwrap();
        assert_eq!(req.final_data.unwrap(), data);
    }

    #[test]
    fn test_mark_done_requires_existing_request() {
        // A boleta that never logged in must not get a DONE row minted for
        // it; otherwise a guessed boleta could lock the real student out
        let store = RequestStore::in_memory().unwrap();
        assert!(!store.mark_done("B-900", &json!({}), "ok").unwrap());
        assert!(store.get_request("B-900").unwrap().is_none());
    }
}
