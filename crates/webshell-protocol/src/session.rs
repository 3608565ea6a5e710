// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge session: one transport plus one capability registry bound to one
// mounted page view.
//
// Created when the page view mounts and closed when it unmounts. After close,
// inbound messages are ignored and results of handlers still in flight are
// discarded instead of being injected into a torn-down view.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use webshell_bridge::SharedBridge;
use webshell_core::error::Result;
use webshell_core::types::{MessageType, PushTokenNotice};

use crate::envelope::Envelope;
use crate::handlers::{CapabilityContext, register_device_capabilities};
use crate::recorder::AudioRecorder;
use crate::registry::CapabilityRegistry;
use crate::transport::{PageChannel, Transport};

struct SessionInner {
    transport: Arc<Transport>,
    registry: Arc<CapabilityRegistry>,
    context: CapabilityContext,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        if !self.transport.is_closed() {
            self.transport.close();
            release_recording(&self.context.recorder);
        }
    }
}

/// Stop a recording the page left running so the microphone is released with
/// the page view. Returns the stop task, or `None` when there was nothing to
/// stop.
fn release_recording(recorder: &Arc<AudioRecorder>) -> Option<JoinHandle<()>> {
    if !recorder.is_recording() {
        return None;
    }
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("session closed outside the runtime; recording left running");
        return None;
    };
    let recorder = Arc::clone(recorder);
    Some(runtime.spawn(async move {
        match recorder.stop().await {
            Ok(audio) => info!(uri = %audio.uri, "recording stopped with the session"),
            Err(e) => warn!(error = %e, "failed to stop recording on session close"),
        }
    }))
}

/// Handle to a mounted page's bridge. Cheap to clone; the session closes when
/// `close` is called or the last handle is dropped.
#[derive(Clone)]
pub struct BridgeSession {
    inner: Arc<SessionInner>,
}

impl BridgeSession {
    /// Mount a session on `channel` with every device capability registered.
    ///
    /// `extend` may register further capabilities (account messages, the
    /// ready signal) before the registry is frozen.
    pub fn mount(
        bridge: SharedBridge,
        channel: Arc<dyn PageChannel>,
        extend: impl FnOnce(&mut CapabilityRegistry),
    ) -> Self {
        let platform = bridge.platform_name().to_string();
        let context = CapabilityContext::new(bridge);
        let mut registry = CapabilityRegistry::new(context.gate.clone());
        register_device_capabilities(&mut registry, &context);
        extend(&mut registry);

        info!(
            %platform,
            capabilities = registry.registered_types().len(),
            "bridge session mounted"
        );

        Self {
            inner: Arc::new(SessionInner {
                transport: Arc::new(Transport::new(channel)),
                registry: Arc::new(registry),
                context,
            }),
        }
    }

    /// Feed one raw message from the page into the bridge.
    ///
    /// Returns the dispatch task, or `None` when the message was dropped
    /// (malformed, or the session is closed).
    pub fn on_page_message(&self, raw: &str) -> Option<JoinHandle<()>> {
        let envelope = self.inner.transport.receive_from_page(raw)?;
        debug!(
            message_type = %envelope.message_type,
            id = envelope.id.as_deref().unwrap_or("-"),
            "page message received"
        );
        Some(
            self.inner
                .registry
                .dispatch(envelope, Arc::clone(&self.inner.transport)),
        )
    }

    /// Install the page-side bridge and tell the page it may start calling.
    pub fn announce_ready(&self) -> Result<()> {
        self.inner.transport.inject_bootstrap()?;
        self.notify(MessageType::BridgeReady, json!({}))
    }

    /// Send a native -> page notification (no id, no response).
    pub fn notify(&self, message_type: MessageType, data: Value) -> Result<()> {
        self.inner
            .transport
            .deliver_to_page(&Envelope::notification(message_type, data))
    }

    /// Announce the push registration outcome to the page.
    pub fn push_token(&self, notice: &PushTokenNotice) -> Result<()> {
        self.notify(MessageType::PushToken, serde_json::to_value(notice)?)
    }

    pub fn recorder(&self) -> &Arc<AudioRecorder> {
        &self.inner.context.recorder
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.inner.registry
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    pub fn is_closed(&self) -> bool {
        self.inner.transport.is_closed()
    }

    /// Unmount: stop accepting page messages, discard late results and stop
    /// any active recording.
    ///
    /// Returns the recorder shutdown task when a recording was active.
    pub fn close(&self) -> Option<JoinHandle<()>> {
        if self.inner.transport.is_closed() {
            return None;
        }
        self.inner.transport.close();
        release_recording(&self.inner.context.recorder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBridge, RecordingChannel};
    use std::sync::atomic::Ordering;
    use webshell_core::error::WebshellError;

    fn mounted() -> (BridgeSession, Arc<RecordingChannel>) {
        let channel = Arc::new(RecordingChannel::default());
        let session = BridgeSession::mount(FakeBridge::shared().as_bridge(), channel.clone(), |_| {});
        (session, channel)
    }

    fn request(message_type: MessageType, id: &str) -> String {
        let data = match message_type {
            MessageType::DownloadFile => json!({ "url": "https://a.test/f.bin" }),
            MessageType::SaveToGallery | MessageType::ShareFile => json!({ "uri": "file:///x" }),
            MessageType::ShowAlert => json!({ "title": "Hi", "message": "there" }),
            _ => json!({}),
        };
        Envelope::request(message_type.as_str(), data, id)
            .to_json()
            .expect("json")
    }

    #[tokio::test]
    async fn each_request_gets_exactly_one_response() {
        let (session, channel) = mounted();
        let mut tasks = Vec::new();
        let mut ids = Vec::new();
        for t in MessageType::ALL {
            let id = format!("req-{t}");
            tasks.push(session.on_page_message(&request(t, &id)).expect("accepted"));
            ids.push(id);
        }
        for task in tasks {
            task.await.expect("dispatch task");
        }

        let responses = channel.envelopes();
        assert_eq!(responses.len(), ids.len());
        for id in &ids {
            let matching: Vec<_> = responses
                .iter()
                .filter(|r| r.id.as_deref() == Some(id.as_str()))
                .collect();
            assert_eq!(matching.len(), 1, "{id}");
            assert!(matching[0].message_type.ends_with("_RESPONSE"));
        }
    }

    #[tokio::test]
    async fn malformed_messages_are_dropped() {
        let (session, channel) = mounted();
        assert!(session.on_page_message("not json").is_none());
        assert!(session.on_page_message(r#"{"data":{}}"#).is_none());
        assert_eq!(session.transport().dropped_inbound_count(), 2);
        assert!(channel.scripts().is_empty());
    }

    #[tokio::test]
    async fn extensions_are_dispatched() {
        let channel = Arc::new(RecordingChannel::default());
        let session = BridgeSession::mount(FakeBridge::shared().as_bridge(), channel.clone(), |r| {
            r.register(MessageType::UpdateUserInfo, |payload: Value| async move {
                Ok::<_, WebshellError>(json!({ "success": true, "userId": payload["userId"] }))
            });
        });
        session
            .on_page_message(
                &Envelope::request("UPDATE_USER_INFO", json!({ "userId": "u1" }), "x1")
                    .to_json()
                    .expect("json"),
            )
            .expect("accepted")
            .await
            .expect("task");
        let responses = channel.envelopes();
        assert_eq!(responses[0].data["userId"], "u1");
    }

    #[tokio::test]
    async fn closed_session_ignores_page_and_drops_late_results() {
        let (session, channel) = mounted();
        session.close();
        assert!(session.is_closed());
        assert!(session.on_page_message(&request(MessageType::Vibrate, "late")).is_none());
        assert!(matches!(
            session.notify(MessageType::BridgeReady, json!({})),
            Err(WebshellError::SessionClosed)
        ));
        assert!(channel.scripts().is_empty());
    }

    #[tokio::test]
    async fn close_stops_active_recording() {
        let fake = FakeBridge::shared();
        let session =
            BridgeSession::mount(fake.as_bridge(), Arc::new(RecordingChannel::default()), |_| {});
        session.recorder().start().await.expect("start");

        let stopping = session.close().expect("stop task");
        stopping.await.expect("stop");
        assert!(!session.recorder().is_recording());
        assert_eq!(fake.recordings_stopped.load(Ordering::SeqCst), 1);
        assert!(session.close().is_none());
    }

    #[tokio::test]
    async fn dropping_last_handle_stops_active_recording() {
        let fake = FakeBridge::shared();
        let session =
            BridgeSession::mount(fake.as_bridge(), Arc::new(RecordingChannel::default()), |_| {});
        let recorder = Arc::clone(session.recorder());
        recorder.start().await.expect("start");

        drop(session);
        for _ in 0..100 {
            if !recorder.is_recording() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn close_without_recording_has_nothing_to_stop() {
        let (session, _channel) = mounted();
        assert!(session.close().is_none());
    }

    #[tokio::test]
    async fn announce_ready_injects_bootstrap_then_notification() {
        let (session, channel) = mounted();
        session.announce_ready().expect("ready");
        let scripts = channel.scripts();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[0].contains("__webshell"));
        let envelopes = channel.envelopes();
        assert_eq!(envelopes[0].message_type, "BRIDGE_READY");
        assert!(envelopes[0].id.is_none());
    }

    #[tokio::test]
    async fn push_token_notice_is_forwarded() {
        let (session, channel) = mounted();
        session
            .push_token(&PushTokenNotice {
                token: Some("tok".into()),
                is_registered: true,
            })
            .expect("notify");
        let env = &channel.envelopes()[0];
        assert_eq!(env.message_type, "PUSH_TOKEN");
        assert_eq!(env.data, json!({ "token": "tok", "isRegistered": true }));
    }
}
