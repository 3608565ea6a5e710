// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Webshell — Native device capability abstractions.
//
// The traits here are the seam between the bridge protocol and whatever
// actually drives the camera, recorder, location services and so on. Mobile
// hosts implement `PlatformBridge` in their native glue and hand it to the
// session; desktop and CI builds use the stub.

use std::sync::Arc;

pub mod stub;
pub mod traits;

pub use traits::PlatformBridge;

/// Shared handle to a platform bridge implementation.
pub type SharedBridge = Arc<dyn PlatformBridge>;

/// Bridge used when the host does not inject one.
///
/// DESKTOP/CI: every capability reports `PlatformUnavailable` and every
/// permission is denied.
pub fn platform_bridge() -> SharedBridge {
    Arc::new(stub::StubBridge)
}
