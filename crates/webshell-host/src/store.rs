// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Persistent user session and device registration backed by SQLite.
//
// Both tables hold at most one row (slot = 1): the shell serves one signed-in
// user on one install. The install-scoped device id is generated on first use
// and never changes afterwards.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use webshell_core::backend::{DeviceId, RegisterDeviceResponse};
use webshell_core::error::{Result, WebshellError};
use webshell_core::types::UserAuth;

const CREATE_TABLES_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS user_session (
        slot INTEGER PRIMARY KEY CHECK (slot = 1),
        user_id TEXT NOT NULL,
        user_email TEXT,
        user_token TEXT,
        updated_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS device_registration (
        slot INTEGER PRIMARY KEY CHECK (slot = 1),
        device_id TEXT NOT NULL,
        push_token TEXT,
        registered INTEGER NOT NULL DEFAULT 0,
        backend_id TEXT,
        user_id TEXT,
        updated_at TEXT NOT NULL
    );
"#;

/// The signed-in user as last reported by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
    pub user_id: String,
    pub user_email: Option<String>,
    pub user_token: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Push registration state of this install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRegistration {
    pub device_id: DeviceId,
    pub push_token: Option<String>,
    pub registered: bool,
    /// Row id the backend assigned on registration.
    pub backend_id: Option<String>,
    /// User the backend associated the device with.
    pub user_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed store. Synchronous; share it as a `SharedStore`.
pub struct UserStore {
    conn: Connection,
}

/// `UserStore` is `Send` but not `Sync`.
pub type SharedStore = Arc<Mutex<UserStore>>;

/// Lock a shared store, recovering from a poisoned lock.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, UserStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}

impl UserStore {
    /// Open (or create) the store at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| WebshellError::Database(format!("open: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| WebshellError::Database(format!("WAL pragma: {e}")))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| WebshellError::Database(format!("create tables: {e}")))?;

        info!("user store opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| WebshellError::Database(format!("open in-memory: {e}")))?;
        conn.execute_batch(CREATE_TABLES_SQL)
            .map_err(|e| WebshellError::Database(format!("create tables: {e}")))?;

        debug!("in-memory user store opened");
        Ok(Self { conn })
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // -- User session --------------------------------------------------------

    /// Replace the stored user with `auth`.
    #[instrument(skip(self, auth), fields(user_id = %auth.user_id))]
    pub fn save_user(&self, auth: &UserAuth) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO user_session (slot, user_id, user_email, user_token, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4)
                 ON CONFLICT(slot) DO UPDATE SET
                    user_id = excluded.user_id,
                    user_email = excluded.user_email,
                    user_token = excluded.user_token,
                    updated_at = excluded.updated_at",
                params![
                    auth.user_id,
                    auth.user_email,
                    auth.user_token,
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| WebshellError::Database(format!("save user: {e}")))?;

        debug!("user session saved");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn current_user(&self) -> Result<Option<StoredUser>> {
        self.conn
            .query_row(
                "SELECT user_id, user_email, user_token, updated_at
                 FROM user_session WHERE slot = 1",
                [],
                |row| {
                    Ok(StoredUser {
                        user_id: row.get(0)?,
                        user_email: row.get(1)?,
                        user_token: row.get(2)?,
                        updated_at: parse_timestamp(&row.get::<_, String>(3)?),
                    })
                },
            )
            .optional()
            .map_err(|e| WebshellError::Database(format!("query user: {e}")))
    }

    /// Forget the signed-in user (sign-out).
    ///
    /// The bridge has no sign-out message, so no handler calls this; it is
    /// kept for embedders that end the session natively.
    #[instrument(skip(self))]
    pub fn clear_user(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM user_session", [])
            .map_err(|e| WebshellError::Database(format!("clear user: {e}")))?;
        info!("user session cleared");
        Ok(())
    }

    // -- Device registration -------------------------------------------------

    /// The install-scoped device id, created and persisted on first call.
    #[instrument(skip(self))]
    pub fn device_id(&self) -> Result<DeviceId> {
        if let Some(existing) = self.device_registration()? {
            return Ok(existing.device_id);
        }
        let id = DeviceId::new();
        self.conn
            .execute(
                "INSERT INTO device_registration (slot, device_id, registered, updated_at)
                 VALUES (1, ?1, 0, ?2)",
                params![id.to_string(), Utc::now().to_rfc3339()],
            )
            .map_err(|e| WebshellError::Database(format!("create device id: {e}")))?;
        info!(device_id = %id, "device id generated");
        Ok(id)
    }

    #[instrument(skip(self))]
    pub fn device_registration(&self) -> Result<Option<DeviceRegistration>> {
        let row = self
            .conn
            .query_row(
                "SELECT device_id, push_token, registered, backend_id, user_id, updated_at
                 FROM device_registration WHERE slot = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, bool>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| WebshellError::Database(format!("query device: {e}")))?;

        let Some((device_id, push_token, registered, backend_id, user_id, updated_at)) = row else {
            return Ok(None);
        };
        let uuid = Uuid::from_str(&device_id)
            .map_err(|e| WebshellError::Database(format!("corrupt device id {device_id}: {e}")))?;

        Ok(Some(DeviceRegistration {
            device_id: DeviceId(uuid),
            push_token,
            registered,
            backend_id,
            user_id,
            updated_at: parse_timestamp(&updated_at),
        }))
    }

    /// Record the outcome of a registration attempt for `push_token`.
    ///
    /// `outcome` is `None` when the backend call failed or was skipped; the
    /// token is still kept so the next attempt can reuse it.
    #[instrument(skip(self, push_token, outcome), fields(registered = outcome.is_some()))]
    pub fn record_registration(
        &self,
        push_token: Option<&str>,
        outcome: Option<&RegisterDeviceResponse>,
    ) -> Result<()> {
        // Make sure the row exists before updating it.
        self.device_id()?;
        self.conn
            .execute(
                "UPDATE device_registration
                 SET push_token = ?1, registered = ?2, backend_id = ?3, user_id = ?4,
                     updated_at = ?5
                 WHERE slot = 1",
                params![
                    push_token,
                    outcome.is_some(),
                    outcome.map(|o| o.id.as_str()),
                    outcome.and_then(|o| o.user_id.as_deref()),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(|e| WebshellError::Database(format!("record registration: {e}")))?;

        debug!("device registration recorded");
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth(id: &str, email: Option<&str>) -> UserAuth {
        UserAuth {
            user_id: id.into(),
            user_email: email.map(Into::into),
            user_token: Some("tok".into()),
        }
    }

    #[test]
    fn user_round_trip_and_replace() {
        let store = UserStore::open_in_memory().expect("open");
        assert!(store.current_user().expect("query").is_none());

        store.save_user(&auth("u1", Some("a@x.test"))).expect("save");
        store.save_user(&auth("u2", None)).expect("save");

        let user = store.current_user().expect("query").expect("user");
        assert_eq!(user.user_id, "u2");
        assert_eq!(user.user_email, None);
        assert_eq!(user.user_token.as_deref(), Some("tok"));

        store.clear_user().expect("clear");
        assert!(store.current_user().expect("query").is_none());
    }

    #[test]
    fn device_id_is_stable() {
        let store = UserStore::open_in_memory().expect("open");
        let first = store.device_id().expect("id");
        assert_eq!(store.device_id().expect("id"), first);

        let reg = store.device_registration().expect("query").expect("row");
        assert!(!reg.registered);
        assert!(reg.push_token.is_none());
    }

    #[test]
    fn registration_outcome_is_recorded() {
        let store = UserStore::open_in_memory().expect("open");
        let outcome = RegisterDeviceResponse {
            id: "row-7".into(),
            user_id: Some("u1".into()),
        };
        store
            .record_registration(Some("push-tok"), Some(&outcome))
            .expect("record");

        let reg = store.device_registration().expect("query").expect("row");
        assert!(reg.registered);
        assert_eq!(reg.push_token.as_deref(), Some("push-tok"));
        assert_eq!(reg.backend_id.as_deref(), Some("row-7"));
        assert_eq!(reg.user_id.as_deref(), Some("u1"));

        store.record_registration(Some("push-tok"), None).expect("record");
        let reg = store.device_registration().expect("query").expect("row");
        assert!(!reg.registered);
        assert_eq!(reg.push_token.as_deref(), Some("push-tok"));
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("user.db");

        let id = {
            let store = UserStore::open(&path).expect("open");
            store.save_user(&auth("u1", Some("a@x.test"))).expect("save");
            store.device_id().expect("id")
        };

        let store = UserStore::open(&path).expect("reopen");
        assert_eq!(store.device_id().expect("id"), id);
        assert_eq!(
            store.current_user().expect("query").expect("user").user_email.as_deref(),
            Some("a@x.test")
        );
    }
}
