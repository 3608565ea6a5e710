// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Webshell Host — everything around the bridge session: page readiness and
// the startup overlay, the persisted user/device store, push registration
// and the account messages the page sends.

pub mod account;
pub mod capabilities;
pub mod push;
pub mod readiness;
pub mod registry;
pub mod store;

#[cfg(test)]
mod testing;

pub use account::AccountService;
pub use capabilities::HostCapabilities;
pub use push::PushService;
pub use readiness::{
    DismissReason, ReadinessController, ReadinessMachine, ReadinessSignals, ReadinessSnapshot,
    ReadinessState, ShellCommand, Signal,
};
pub use registry::{DeviceRegistry, HttpDeviceRegistry, OfflineRegistry};
pub use store::{SharedStore, UserStore};

use webshell_core::error::{Result, WebshellError};

/// Run a synchronous call (SQLite, native bridge) on the blocking pool.
pub(crate) async fn blocking<T, F>(call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| WebshellError::NativeOperationFailed(format!("blocking call aborted: {e}")))?
}
