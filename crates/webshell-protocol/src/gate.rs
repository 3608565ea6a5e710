// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Permission gate run before every permission-requiring capability.
//
// All requested kinds are prompted concurrently (they are independent device
// subsystems) and the outcome is a single boolean: true only if every grant
// succeeded. Unknown kinds are denied without prompting. There is no retry;
// the page asks again if the user changes settings.

use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use webshell_bridge::SharedBridge;
use webshell_core::types::{PermissionKind, PermissionSet};

#[derive(Clone)]
pub struct PermissionGate {
    bridge: SharedBridge,
}

impl PermissionGate {
    pub fn new(bridge: SharedBridge) -> Self {
        Self { bridge }
    }

    /// Request every permission in `kinds` and report whether all were granted.
    ///
    /// Waits for every prompt to settle before answering; a denial does not
    /// cancel prompts already on screen.
    pub async fn ensure(&self, kinds: &PermissionSet) -> bool {
        let mut all_granted = true;
        let mut prompts = JoinSet::new();

        for &kind in kinds {
            if kind == PermissionKind::Unknown {
                warn!("unknown permission kind requested; denying");
                all_granted = false;
                continue;
            }
            let bridge = SharedBridge::clone(&self.bridge);
            prompts.spawn_blocking(move || (kind, bridge.request_permission(kind)));
        }

        while let Some(joined) = prompts.join_next().await {
            match joined {
                Ok((kind, Ok(true))) => debug!(%kind, "permission granted"),
                Ok((kind, Ok(false))) => {
                    info!(%kind, "permission denied");
                    all_granted = false;
                }
                Ok((kind, Err(e))) => {
                    warn!(%kind, error = %e, "permission request failed; treating as denied");
                    all_granted = false;
                }
                Err(e) => {
                    warn!(error = %e, "permission prompt task aborted; treating as denied");
                    all_granted = false;
                }
            }
        }

        all_granted
    }
}
