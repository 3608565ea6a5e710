// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Push-token registration.
//
// Obtains the native push token, registers this install with the backend
// (install id + platform + token + current user) and persists the outcome.
// Failures are logged and reported to the page as `isRegistered: false`;
// they never abort startup.

use std::sync::Arc;

use tracing::{info, warn};

use webshell_bridge::SharedBridge;
use webshell_core::backend::{RegisterDeviceRequest, RegisterDeviceResponse};
use webshell_core::error::Result;
use webshell_core::types::{Platform, PushTokenNotice};

use crate::blocking;
use crate::registry::DeviceRegistry;
use crate::store::{SharedStore, lock_store};

pub struct PushService {
    bridge: SharedBridge,
    registry: Arc<dyn DeviceRegistry>,
    store: SharedStore,
    enabled: bool,
}

impl PushService {
    pub fn new(
        bridge: SharedBridge,
        registry: Arc<dyn DeviceRegistry>,
        store: SharedStore,
        enabled: bool,
    ) -> Self {
        Self {
            bridge,
            registry,
            store,
            enabled,
        }
    }

    /// Register (or re-register) this install and return the notice for the
    /// page.
    pub async fn register(&self) -> PushTokenNotice {
        if !self.enabled {
            info!("push notifications disabled");
            return PushTokenNotice {
                token: None,
                is_registered: false,
            };
        }

        let bridge = SharedBridge::clone(&self.bridge);
        let token = match blocking(move || bridge.push_token()).await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "push token unavailable");
                None
            }
        };

        let Some(token) = token else {
            self.record(None, None).await;
            return PushTokenNotice {
                token: None,
                is_registered: false,
            };
        };

        let is_registered = match self.register_token(&token).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "device registration failed");
                self.record(Some(token.clone()), None).await;
                false
            }
        };

        PushTokenNotice {
            token: Some(token),
            is_registered,
        }
    }

    async fn register_token(&self, token: &str) -> Result<()> {
        let request = self.build_request(token).await?;
        let response = self.registry.register_device(&request).await?;

        info!(
            backend_id = %response.id,
            user_id = response.user_id.as_deref().unwrap_or("-"),
            "device registered for push"
        );
        self.record(Some(token.to_string()), Some(response)).await;
        Ok(())
    }

    async fn build_request(&self, token: &str) -> Result<RegisterDeviceRequest> {
        let store = self.store.clone();
        let (device_id, user) = blocking(move || {
            let store = lock_store(&store);
            Ok((store.device_id()?, store.current_user()?))
        })
        .await?;

        let bridge = SharedBridge::clone(&self.bridge);
        let (platform, device_name) = match blocking(move || bridge.device_info()).await {
            Ok(info) => (info.platform, info.device_name),
            Err(e) => {
                warn!(error = %e, "device info unavailable; using build platform");
                (Platform::current(), None)
            }
        };

        Ok(RegisterDeviceRequest {
            device_id,
            platform,
            push_token: token.to_string(),
            user_id: user.as_ref().map(|u| u.user_id.clone()),
            user_email: user.and_then(|u| u.user_email),
            device_name,
        })
    }

    async fn record(&self, token: Option<String>, outcome: Option<RegisterDeviceResponse>) {
        let store = self.store.clone();
        let saved = blocking(move || {
            lock_store(&store).record_registration(token.as_deref(), outcome.as_ref())
        })
        .await;
        if let Err(e) = saved {
            warn!(error = %e, "failed to persist device registration");
        }
    }
}
