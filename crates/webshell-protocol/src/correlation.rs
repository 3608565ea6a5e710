// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Correlation ids and the pending-request table of the requesting side.
//
// Every request gets an id built from a wall-clock timestamp and a
// per-generator monotonic counter, so ids never collide within a session.
// A response is matched by id and removes its pending entry, which makes a
// second response for the same id a logged no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::envelope::Envelope;

/// Generates correlation ids of the form `<unix-millis>_<counter>`.
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{n}", Utc::now().timestamp_millis())
    }
}

/// An issued request still waiting for its response.
#[derive(Debug)]
pub struct PendingRequest {
    pub message_type: String,
    pub issued_at: Instant,
    responder: oneshot::Sender<Value>,
}

impl PendingRequest {
    /// Hand the response data to the waiting caller. Returns false if the
    /// caller has already given up.
    pub fn resolve(self, data: Value) -> bool {
        self.responder.send(data).is_ok()
    }
}

/// Pending-request table keyed by correlation id.
#[derive(Debug, Default)]
pub struct Correlator {
    ids: IdGenerator,
    pending: Mutex<HashMap<String, PendingRequest>>,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request envelope with a fresh id and register it as pending.
    ///
    /// The returned receiver yields the response `data` exactly once.
    pub fn send(&self, message_type: &str, payload: Value) -> (Envelope, oneshot::Receiver<Value>) {
        let id = self.ids.next_id();
        let (tx, rx) = oneshot::channel();
        self.lock().insert(
            id.clone(),
            PendingRequest {
                message_type: message_type.to_string(),
                issued_at: Instant::now(),
                responder: tx,
            },
        );
        debug!(%id, message_type, "request issued");
        (Envelope::request(message_type, payload, id), rx)
    }

    /// Remove and return the pending request this envelope answers.
    ///
    /// Envelopes without an id, or whose id was never issued or already
    /// resolved, are logged and yield `None`.
    pub fn match_response(&self, envelope: &Envelope) -> Option<PendingRequest> {
        let Some(id) = envelope.id.as_deref() else {
            debug!(message_type = %envelope.message_type, "envelope has no id; not a response");
            return None;
        };
        let matched = self.lock().remove(id);
        if matched.is_none() {
            warn!(%id, message_type = %envelope.message_type, "dropping response with no pending request");
        }
        matched
    }

    /// Match and resolve in one step. Returns whether a waiting caller got
    /// the data.
    pub fn resolve(&self, envelope: Envelope) -> bool {
        match self.match_response(&envelope) {
            Some(pending) => {
                debug!(
                    message_type = %pending.message_type,
                    elapsed_ms = pending.issued_at.elapsed().as_millis() as u64,
                    "request resolved"
                );
                pending.resolve(envelope.data)
            }
            None => false,
        }
    }

    /// Forget a pending request (the caller timed out).
    pub fn cancel(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Drop every pending request; their receivers observe a closed channel.
    pub fn clear(&self) {
        let dropped = self.lock().drain().count();
        if dropped > 0 {
            debug!(dropped, "pending requests abandoned");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingRequest>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
