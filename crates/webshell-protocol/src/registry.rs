// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability registry: message type -> handler.
//
// Dispatch is fire-and-forget from the transport's point of view: each
// envelope is handled on its own task and any response goes back out through
// the transport. Every failure (unknown type, denied permission, handler
// error, even a handler panic) becomes a `{success: false, error}` response
// correlated to the original id. Nothing escapes to the session.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use webshell_core::error::{Result, WebshellError};
use webshell_core::types::{MessageType, PermissionSet};

use crate::envelope::{Envelope, failure_body};
use crate::gate::PermissionGate;
use crate::transport::Transport;

/// Future returned by a capability.
pub type CapabilityFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'static>>;

/// A native capability reachable from the page.
///
/// Implemented for any `Fn(Value) -> impl Future<Output = Result<Value>>`.
pub trait Capability: Send + Sync {
    fn invoke(&self, payload: Value) -> CapabilityFuture;
}

impl<F, Fut> Capability for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn invoke(&self, payload: Value) -> CapabilityFuture {
        Box::pin(self(payload))
    }
}

struct Registration {
    permissions: PermissionSet,
    capability: Arc<dyn Capability>,
}

pub struct CapabilityRegistry {
    gate: PermissionGate,
    handlers: HashMap<String, Registration>,
}

impl CapabilityRegistry {
    pub fn new(gate: PermissionGate) -> Self {
        Self {
            gate,
            handlers: HashMap::new(),
        }
    }

    /// Register a catalog capability with the permissions the catalog
    /// declares for it.
    pub fn register<F, Fut>(&mut self, message_type: MessageType, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.register_with(
            message_type.as_str(),
            message_type.required_permissions(),
            handler,
        );
    }

    /// Register a capability under an arbitrary type name. Replaces any
    /// existing handler for that name.
    pub fn register_with<F, Fut>(
        &mut self,
        message_type: impl Into<String>,
        permissions: PermissionSet,
        handler: F,
    ) where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let message_type = message_type.into();
        if self
            .handlers
            .insert(
                message_type.clone(),
                Registration {
                    permissions,
                    capability: Arc::new(handler),
                },
            )
            .is_some()
        {
            debug!(%message_type, "capability handler replaced");
        }
    }

    pub fn is_registered(&self, message_type: &str) -> bool {
        self.handlers.contains_key(message_type)
    }

    pub fn registered_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Handle `envelope` on its own task and deliver any response through
    /// `transport`.
    pub fn dispatch(self: &Arc<Self>, envelope: Envelope, transport: Arc<Transport>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(response) = registry.handle(envelope).await
                && let Err(e) = transport.deliver_to_page(&response)
            {
                debug!(
                    error = %e,
                    id = response.id.as_deref().unwrap_or("-"),
                    "response not delivered"
                );
            }
        })
    }

    /// Run the handler for `envelope` and build its response.
    ///
    /// Returns `None` for notifications (no `id`); their failures are only
    /// logged.
    pub async fn handle(&self, mut envelope: Envelope) -> Option<Envelope> {
        let message_type = envelope.message_type.clone();
        let payload = std::mem::take(&mut envelope.data);
        let outcome = self.run(&message_type, payload).await;

        let body = match outcome {
            Ok(body) => body,
            Err(e) => {
                warn!(
                    %message_type,
                    id = envelope.id.as_deref().unwrap_or("-"),
                    error = %e,
                    "capability failed"
                );
                failure_body(&e)
            }
        };
        envelope.respond(body)
    }

    async fn run(&self, message_type: &str, payload: Value) -> Result<Value> {
        let Some(registration) = self.handlers.get(message_type) else {
            return Err(WebshellError::UnknownMessageType(message_type.to_string()));
        };

        if !registration.permissions.is_empty() && !self.gate.ensure(&registration.permissions).await {
            let names: Vec<&str> = registration.permissions.iter().map(|k| k.as_str()).collect();
            return Err(WebshellError::PermissionDenied(names.join(", ")));
        }

        // The handler runs on its own task so a panic surfaces as a JoinError
        // instead of unwinding through dispatch.
        let call = registration.capability.invoke(payload);
        match tokio::spawn(call).await {
            Ok(result) => result,
            Err(e) => Err(WebshellError::NativeOperationFailed(format!(
                "{message_type} handler aborted: {e}"
            ))),
        }
    }
}
