// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge transport: native -> page via injected script, page -> native via
// the browsing surface's message callback.
//
// The page side is installed by `BOOTSTRAP_SCRIPT`, which keeps a single
// listener and a pending table keyed by correlation id. Native delivers an
// envelope by injecting `window.__webshell.receive(<envelope>)`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use webshell_core::error::{Result, WebshellError};

use crate::envelope::Envelope;

/// Page-side capability surface, injected before the site's own scripts.
pub const BOOTSTRAP_SCRIPT: &str = include_str!("bootstrap.js");

const DELIVERY_PREFIX: &str = "window.__webshell && window.__webshell.receive(";
const DELIVERY_SUFFIX: &str = "); true;";

/// The browsing surface's script-injection hook.
///
/// Implementations hand the script to the platform web view
/// (`evaluateJavaScript`, `injectJavaScript`, ...). Injection is
/// fire-and-forget.
pub trait PageChannel: Send + Sync {
    fn inject_script(&self, script: &str) -> Result<()>;
}

/// One transport per mounted page view.
pub struct Transport {
    channel: Arc<dyn PageChannel>,
    closed: AtomicBool,
    delivered: AtomicU64,
    dropped_inbound: AtomicU64,
}

impl Transport {
    pub fn new(channel: Arc<dyn PageChannel>) -> Self {
        Self {
            channel,
            closed: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
            dropped_inbound: AtomicU64::new(0),
        }
    }

    /// Serialize `envelope` and inject it into the page.
    ///
    /// Fails with `SessionClosed` once the page view has been torn down.
    pub fn deliver_to_page(&self, envelope: &Envelope) -> Result<()> {
        if self.is_closed() {
            debug!(message_type = %envelope.message_type, "transport closed; delivery skipped");
            return Err(WebshellError::SessionClosed);
        }
        let script = delivery_script(envelope)?;
        self.channel.inject_script(&script)?;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        debug!(
            message_type = %envelope.message_type,
            id = envelope.id.as_deref().unwrap_or("-"),
            "envelope delivered to page"
        );
        Ok(())
    }

    /// Parse a raw page message. Malformed input is logged and dropped; the
    /// page is never told (its call simply stays pending until it times out).
    pub fn receive_from_page(&self, raw: &str) -> Option<Envelope> {
        if self.is_closed() {
            debug!("transport closed; inbound message ignored");
            return None;
        }
        match Envelope::parse(raw) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                self.dropped_inbound.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, len = raw.len(), "dropping malformed page message");
                None
            }
        }
    }

    /// Install the page-side bridge. Safe to repeat: the script is a no-op
    /// when the bridge already exists.
    pub fn inject_bootstrap(&self) -> Result<()> {
        if self.is_closed() {
            return Err(WebshellError::SessionClosed);
        }
        self.channel.inject_script(BOOTSTRAP_SCRIPT)
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(
                delivered = self.delivered.load(Ordering::Relaxed),
                dropped_inbound = self.dropped_inbound.load(Ordering::Relaxed),
                "transport closed"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped_inbound_count(&self) -> u64 {
        self.dropped_inbound.load(Ordering::Relaxed)
    }
}

/// The script that hands `envelope` to the page's bridge listener.
///
/// U+2028/U+2029 are escaped because older JavaScript engines treat them as
/// line terminators inside source text.
pub fn delivery_script(envelope: &Envelope) -> Result<String> {
    let json = envelope
        .to_json()?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!("{DELIVERY_PREFIX}{json}{DELIVERY_SUFFIX}"))
}

/// Recover the envelope from a script built by `delivery_script`.
///
/// Used by in-process page implementations; returns `None` for any other
/// script (such as the bootstrap).
pub fn parse_delivery_script(script: &str) -> Option<Envelope> {
    let json = script
        .strip_prefix(DELIVERY_PREFIX)?
        .strip_suffix(DELIVERY_SUFFIX)?;
    serde_json::from_str(json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingChannel;
    use serde_json::json;

    #[test]
    fn delivery_round_trips_through_script() {
        let env = Envelope::request("TAKE_PHOTO_RESPONSE", json!({ "uri": "a\u{2028}b" }), "9_1");
        let script = delivery_script(&env).expect("script");
        assert!(!script.contains('\u{2028}'));
        assert_eq!(parse_delivery_script(&script), Some(env));
    }

    #[test]
    fn bootstrap_is_not_a_delivery() {
        assert!(parse_delivery_script(BOOTSTRAP_SCRIPT).is_none());
    }

    #[test]
    fn malformed_input_is_dropped_and_counted() {
        let channel = Arc::new(RecordingChannel::default());
        let transport = Transport::new(channel.clone());

        assert!(transport.receive_from_page("not json").is_none());
        assert!(transport.receive_from_page(r#"{"data":1}"#).is_none());
        assert_eq!(transport.dropped_inbound_count(), 2);
        assert!(channel.scripts().is_empty());
    }

    #[test]
    fn closed_transport_refuses_delivery() {
        let channel = Arc::new(RecordingChannel::default());
        let transport = Transport::new(channel.clone());
        transport.close();

        let env = Envelope::request("VIBRATE_RESPONSE", json!({}), "1");
        assert!(matches!(
            transport.deliver_to_page(&env),
            Err(WebshellError::SessionClosed)
        ));
        assert!(transport.receive_from_page(r#"{"type":"VIBRATE","id":"2"}"#).is_none());
        assert!(channel.scripts().is_empty());
    }
}
