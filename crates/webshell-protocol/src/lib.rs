// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Webshell Protocol — the message bridge between an embedded web page and
// native device capabilities.
//
// Pages post JSON envelopes `{type, data, id}`. The transport validates them,
// the registry dispatches each one to a capability handler (behind the
// permission gate where required) and the result travels back to the page
// carrying the same `id`. One `BridgeSession` exists per mounted page view.

pub mod client;
pub mod correlation;
pub mod downloads;
pub mod envelope;
pub mod gate;
pub mod handlers;
pub mod recorder;
pub mod registry;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use client::{BridgeClient, ClientLink, Loopback, LoopbackChannel};
pub use correlation::{Correlator, IdGenerator, PendingRequest};
pub use envelope::Envelope;
pub use gate::PermissionGate;
pub use handlers::{CapabilityContext, register_device_capabilities};
pub use recorder::{AudioRecorder, RecordingState};
pub use registry::{Capability, CapabilityRegistry};
pub use session::BridgeSession;
pub use transport::{PageChannel, Transport};

use webshell_bridge::{PlatformBridge, SharedBridge};
use webshell_core::error::{Result, WebshellError};

/// Run a synchronous native call on the blocking pool.
///
/// Native capability methods may wait on the user (prompts, pickers), so they
/// never run on the async worker threads.
pub(crate) async fn run_native<T, F>(bridge: &SharedBridge, call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn PlatformBridge) -> Result<T> + Send + 'static,
{
    let bridge = SharedBridge::clone(bridge);
    tokio::task::spawn_blocking(move || call(bridge.as_ref()))
        .await
        .map_err(|e| WebshellError::NativeOperationFailed(format!("native call aborted: {e}")))?
}
