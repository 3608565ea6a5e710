// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-side bridge messages: account updates and the page's ready signal.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use webshell_core::error::WebshellError;
use webshell_core::types::{MessageType, PushTokenNotice, UserAuth};
use webshell_protocol::CapabilityRegistry;
use webshell_protocol::envelope::success_only;
use webshell_protocol::handlers::parse_payload;

use crate::account::AccountService;
use crate::readiness::{ReadinessSignals, Signal};

/// Collaborators the host messages need. Push notices produced by account
/// changes are sent on `notices` for the owner of the session to announce.
pub struct HostCapabilities {
    pub account: Arc<AccountService>,
    pub readiness: ReadinessSignals,
    pub notices: mpsc::UnboundedSender<PushTokenNotice>,
}

impl HostCapabilities {
    pub fn register(self, registry: &mut CapabilityRegistry) {
        let account = Arc::clone(&self.account);
        let notices = self.notices.clone();
        registry.register(MessageType::UserAuth, move |payload: Value| {
            let account = Arc::clone(&account);
            let notices = notices.clone();
            async move {
                let auth: UserAuth = parse_payload(payload)?;
                let notice = account.sign_in(&auth).await?;
                forward(&notices, notice);
                Ok::<_, WebshellError>(success_only())
            }
        });

        let account = Arc::clone(&self.account);
        let notices = self.notices;
        registry.register(MessageType::UpdateUserInfo, move |payload: Value| {
            let account = Arc::clone(&account);
            let notices = notices.clone();
            async move {
                let auth: UserAuth = parse_payload(payload)?;
                let (body, notice) = account.update_user_info(&auth).await?;
                forward(&notices, notice);
                Ok::<_, WebshellError>(body)
            }
        });

        let readiness = self.readiness;
        registry.register(MessageType::PageReady, move |_payload: Value| {
            readiness.send(Signal::PageReady);
            async { Ok::<_, WebshellError>(success_only()) }
        });
    }
}

fn forward(notices: &mpsc::UnboundedSender<PushTokenNotice>, notice: PushTokenNotice) {
    if notices.send(notice).is_err() {
        debug!("push notice receiver gone");
    }
}
