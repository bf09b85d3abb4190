// Greeting composition and batched submission to the notification sink.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::state::{Language, RecipientCandidate};
use crate::updates::{CoreMsg, InternalEvent};

use super::AppCore;

pub(super) const GREETING_TITLE: &str = "नमस्ते 🙏";
pub(super) const GREETING_BODY: &str = "You have received a Namaste!";

/// One row for the backend `notifications` table. `recipient` is the
/// registered user's auth identity, never the reconciliation key.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutboundGreeting {
    pub sender: String,
    pub recipient: String,
    pub title: String,
    pub body: String,
}

/// Map the selection onto outbound rows.
///
/// Selection should already guarantee registration, but a local-only key
/// must never reach the sink, so the composer re-checks and excludes such
/// entries rather than failing the whole batch.
pub(super) fn compose_greetings(
    selected: &BTreeSet<String>,
    recipients: &[RecipientCandidate],
    sender_id: &str,
) -> Vec<OutboundGreeting> {
    recipients
        .iter()
        .filter(|r| selected.contains(&r.id) && r.registered)
        .filter_map(|r| {
            let auth_id = r.auth_id.as_deref()?;
            Some(OutboundGreeting {
                sender: sender_id.to_string(),
                recipient: auth_id.to_string(),
                title: GREETING_TITLE.to_string(),
                body: GREETING_BODY.to_string(),
            })
        })
        .collect()
}

impl AppCore {
    pub(super) fn send_greeting(&mut self) {
        if self.selected.is_empty() {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            // No authenticated user: send is unavailable, nothing to recover.
            return;
        };
        let sender_id = session.user_id.clone();
        let access_token = session.access_token.clone();

        let rows = compose_greetings(&self.selected, &self.state.recipients, &sender_id);
        if rows.is_empty() {
            tracing::warn!("send: selection contained no registered recipients");
            return;
        }
        if !self.network_enabled() {
            self.handle_greeting_sent(false, Some("network disabled".to_string()));
            return;
        }

        self.set_busy(|b| b.sending = true);
        let backend = self.backend.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend.insert_notifications(&access_token, &rows).await;
            let (ok, error) = match result {
                Ok(()) => (true, None),
                Err(e) => (false, Some(e.to_string())),
            };
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::GreetingSent {
                ok,
                error,
            })));
        });
    }

    pub(super) fn handle_greeting_sent(&mut self, ok: bool, error: Option<String>) {
        self.set_busy(|b| b.sending = false);
        if ok {
            // The whole batch went in; the selection is spent.
            self.selected.clear();
            self.sync_selected_ids();
            let msg = match self.state.language {
                Language::Hi => "आपका नमस्ते भेज दिया गया!",
                Language::En => "Your Namaste has been sent!",
            };
            self.toast(msg);
        } else {
            tracing::warn!(
                error = error.as_deref().unwrap_or("unknown"),
                "send: batch submission failed"
            );
            // Whole-batch failure; the selection stays so the user can retry.
            let msg = match self.state.language {
                Language::Hi => "नमस्ते भेजा नहीं जा सका। पुनः प्रयास करें!",
                Language::En => "Could not send your Namaste. Try again!",
            };
            self.toast(msg);
        }
    }
}
