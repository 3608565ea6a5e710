// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Signed-in user tracking for USER_AUTH and UPDATE_USER_INFO.
//
// The page reports who is signed in; the user is persisted and the push
// registration is redone so the backend associates this device with them.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};

use webshell_core::error::{Result, WebshellError};
use webshell_core::types::{PushTokenNotice, UserAuth};

use crate::blocking;
use crate::push::PushService;
use crate::store::{SharedStore, lock_store};

pub struct AccountService {
    store: SharedStore,
    push: Arc<PushService>,
}

impl AccountService {
    pub fn new(store: SharedStore, push: Arc<PushService>) -> Self {
        Self { store, push }
    }

    /// Persist `auth` and re-associate the push registration.
    pub async fn sign_in(&self, auth: &UserAuth) -> Result<PushTokenNotice> {
        if auth.user_id.trim().is_empty() {
            return Err(WebshellError::InvalidPayload("userId must not be empty".into()));
        }
        let store = self.store.clone();
        let user = auth.clone();
        blocking(move || lock_store(&store).save_user(&user)).await?;
        info!(user_id = %auth.user_id, "user signed in");

        let notice = self.push.register().await;
        if !notice.is_registered {
            warn!(user_id = %auth.user_id, "push registration not associated with user");
        }
        Ok(notice)
    }

    /// UPDATE_USER_INFO: `sign_in`, answered with the stored identity.
    pub async fn update_user_info(&self, auth: &UserAuth) -> Result<(Value, PushTokenNotice)> {
        let notice = self.sign_in(auth).await?;
        let body = json!({
            "success": true,
            "userId": auth.user_id,
            "userEmail": auth.user_email,
        });
        Ok((body, notice))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::UserStore;
    use crate::testing::{MemoryRegistry, PushOnlyBridge};

    fn service() -> (AccountService, SharedStore, Arc<MemoryRegistry>) {
        let store = UserStore::open_in_memory().expect("store").into_shared();
        let registry = Arc::new(MemoryRegistry::default());
        let push = Arc::new(PushService::new(
            Arc::new(PushOnlyBridge {
                token: Some("tok".into()),
            }),
            registry.clone(),
            store.clone(),
            true,
        ));
        (AccountService::new(store.clone(), push), store, registry)
    }

    fn auth(id: &str) -> UserAuth {
        UserAuth {
            user_id: id.into(),
            user_email: Some(format!("{id}@x.test")),
            user_token: Some("jwt".into()),
        }
    }

    #[tokio::test]
    async fn sign_in_persists_and_reregisters() {
        let (account, store, registry) = service();
        let notice = account.sign_in(&auth("u9")).await.expect("sign in");
        assert!(notice.is_registered);

        let user = lock_store(&store).current_user().expect("query").expect("user");
        assert_eq!(user.user_id, "u9");
        let reg = lock_store(&store).device_registration().expect("query").expect("row");
        assert_eq!(reg.user_id.as_deref(), Some("u9"));
        assert_eq!(registry.requests.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn update_user_info_echoes_identity() {
        let (account, _store, _registry) = service();
        let (body, _notice) = account.update_user_info(&auth("u3")).await.expect("update");
        assert_eq!(
            body,
            json!({ "success": true, "userId": "u3", "userEmail": "u3@x.test" })
        );
    }

    #[tokio::test]
    async fn empty_user_id_is_rejected() {
        let (account, store, registry) = service();
        assert!(matches!(
            account.sign_in(&auth("  ")).await,
            Err(WebshellError::InvalidPayload(_))
        ));
        assert!(lock_store(&store).current_user().expect("query").is_none());
        assert!(registry.requests.lock().expect("lock").is_empty());
    }
}
