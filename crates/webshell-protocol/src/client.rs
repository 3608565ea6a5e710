// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process bridge client: the page side of the protocol written in Rust.
//
// Mirrors what the bootstrap script does in the browser. Each call gets a
// correlation id and a pending entry; responses are matched by id and
// resolve the call at most once. Notifications (no id) are forwarded on a
// separate channel.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use webshell_bridge::SharedBridge;
use webshell_core::error::{Result, WebshellError};
use webshell_core::types::MessageType;

use crate::correlation::Correlator;
use crate::envelope::Envelope;
use crate::registry::CapabilityRegistry;
use crate::session::BridgeSession;
use crate::transport::{PageChannel, parse_delivery_script};

pub struct BridgeClient {
    correlator: Correlator,
    outbound: mpsc::UnboundedSender<String>,
    notifications: mpsc::UnboundedSender<Envelope>,
}

/// Receiving ends handed out with a new client.
pub struct ClientLink {
    /// Raw page messages to feed into `BridgeSession::on_page_message`.
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Native -> page notifications (BRIDGE_READY, PUSH_TOKEN).
    pub notifications: mpsc::UnboundedReceiver<Envelope>,
}

impl BridgeClient {
    pub fn new() -> (Self, ClientLink) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        (
            Self {
                correlator: Correlator::new(),
                outbound: outbound_tx,
                notifications: notify_tx,
            },
            ClientLink {
                outbound: outbound_rx,
                notifications: notify_rx,
            },
        )
    }

    /// Issue a request and wait for its response data.
    ///
    /// There is no native-side timeout; use `call_with_timeout` to bound the
    /// wait. Fails with `SessionClosed` if the session goes away first.
    pub async fn call(&self, message_type: MessageType, payload: Value) -> Result<Value> {
        let (id, response) = self.issue(message_type.as_str(), payload)?;
        response.await.map_err(|_| {
            debug!(%id, "request abandoned by closed session");
            WebshellError::SessionClosed
        })
    }

    /// `call`, giving up after `limit`. A response arriving later is dropped
    /// as unmatched.
    pub async fn call_with_timeout(
        &self,
        message_type: MessageType,
        payload: Value,
        limit: Duration,
    ) -> Result<Value> {
        let (id, response) = self.issue(message_type.as_str(), payload)?;
        match tokio::time::timeout(limit, response).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(_)) => Err(WebshellError::SessionClosed),
            Err(_) => {
                self.correlator.cancel(&id);
                Err(WebshellError::Timeout(limit))
            }
        }
    }

    /// Fire-and-forget message to native (USER_AUTH, PAGE_READY).
    pub fn notify(&self, message_type: MessageType, payload: Value) -> Result<()> {
        let raw = Envelope::notification(message_type, payload).to_json()?;
        self.outbound
            .send(raw)
            .map_err(|_| WebshellError::SessionClosed)
    }

    /// Handle one envelope delivered by native. Returns true if it resolved a
    /// pending call.
    pub fn receive(&self, envelope: Envelope) -> bool {
        if envelope.id.is_none() {
            if self.notifications.send(envelope).is_err() {
                debug!("notification receiver gone; dropping");
            }
            return false;
        }
        self.correlator.resolve(envelope)
    }

    pub fn pending_count(&self) -> usize {
        self.correlator.pending_count()
    }

    /// Abandon every pending call.
    pub fn disconnect(&self) {
        self.correlator.clear();
    }

    fn issue(
        &self,
        message_type: &str,
        payload: Value,
    ) -> Result<(String, tokio::sync::oneshot::Receiver<Value>)> {
        let (envelope, response) = self.correlator.send(message_type, payload);
        let id = envelope.id.clone().unwrap_or_default();
        let raw = envelope.to_json()?;
        if self.outbound.send(raw).is_err() {
            self.correlator.cancel(&id);
            return Err(WebshellError::SessionClosed);
        }
        Ok((id, response))
    }
}

/// Page channel that hands delivered envelopes straight to a `BridgeClient`.
///
/// Holds the client weakly so the session does not keep it alive.
pub struct LoopbackChannel {
    client: Weak<BridgeClient>,
}

impl LoopbackChannel {
    pub fn new(client: &Arc<BridgeClient>) -> Self {
        Self {
            client: Arc::downgrade(client),
        }
    }
}

impl PageChannel for LoopbackChannel {
    fn inject_script(&self, script: &str) -> Result<()> {
        let Some(envelope) = parse_delivery_script(script) else {
            // The bootstrap and any other page script have no meaning here.
            return Ok(());
        };
        match self.client.upgrade() {
            Some(client) => {
                client.receive(envelope);
                Ok(())
            }
            None => Err(WebshellError::SessionClosed),
        }
    }
}

/// A session wired to an in-process client.
pub struct Loopback {
    pub session: BridgeSession,
    pub client: Arc<BridgeClient>,
    pub notifications: mpsc::UnboundedReceiver<Envelope>,
}

impl Loopback {
    /// Mount a session whose page is `client`, pumping client messages into
    /// the session on a background task until the client is dropped.
    pub fn connect(bridge: SharedBridge, extend: impl FnOnce(&mut CapabilityRegistry)) -> Self {
        let (client, link) = BridgeClient::new();
        let client = Arc::new(client);
        let session = BridgeSession::mount(bridge, Arc::new(LoopbackChannel::new(&client)), extend);

        let pump = session.clone();
        let mut outbound = link.outbound;
        tokio::spawn(async move {
            while let Some(raw) = outbound.recv().await {
                pump.on_page_message(&raw);
            }
            debug!("loopback client gone; closing session");
            pump.close();
        });

        Self {
            session,
            client,
            notifications: link.notifications,
        }
    }
}
