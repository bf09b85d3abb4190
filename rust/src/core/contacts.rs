// Device address-book loading.

use crate::contact_book::{ContactAccess, ContactLoadResult, RawContact};
use crate::state::Language;
use crate::updates::{CoreMsg, InternalEvent};

use super::AppCore;

/// Entries with no usable name or no numbers are not reconciliation
/// candidates; drop them before anything downstream sees them.
pub(super) fn filter_entries(contacts: Vec<RawContact>) -> Vec<RawContact> {
    contacts
        .into_iter()
        .filter(|c| {
            c.name
                .as_deref()
                .map(str::trim)
                .is_some_and(|n| !n.is_empty())
                && !c.numbers.is_empty()
        })
        .collect()
}

impl AppCore {
    /// Reload triggers are enumerated: sign-in, explicit refresh, language
    /// change. Each load supersedes any in-flight one via `sync_token`.
    pub(super) fn refresh_contacts(&mut self) {
        if self.session.is_none() {
            return;
        }
        let bridge = match self.contact_book.read() {
            Ok(slot) => slot.clone(),
            Err(poison) => poison.into_inner().clone(),
        };
        let Some(bridge) = bridge else {
            tracing::warn!("contacts: no contact book bridge registered");
            return;
        };

        self.sync_token = self.sync_token.wrapping_add(1);
        let token = self.sync_token;
        self.set_busy(|b| b.loading_contacts = true);

        let tx = self.core_sender.clone();
        // The read can block on a permission prompt; keep it off the actor.
        std::thread::spawn(move || {
            let result = bridge.load_contacts();
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::ContactsLoaded {
                token,
                result,
            })));
        });
    }

    pub(super) fn handle_contacts_loaded(&mut self, token: u64, result: ContactLoadResult) {
        if token != self.sync_token {
            tracing::debug!(token, current = self.sync_token, "contacts: stale load discarded");
            return;
        }
        self.set_busy(|b| b.loading_contacts = false);

        match result.access {
            ContactAccess::Granted => {
                let entries = filter_entries(result.contacts);
                tracing::info!(entries = entries.len(), "contacts: loaded");
                self.device_contacts = entries;
                self.state.contact_access = ContactAccess::Granted;
            }
            ContactAccess::Denied => {
                // Degrade to an empty list; the rest of the screen stays usable.
                self.device_contacts = Vec::new();
                self.state.contact_access = ContactAccess::Denied;
                if !self.contact_denied_notified {
                    self.contact_denied_notified = true;
                    let msg = match self.state.language {
                        Language::Hi => "संपर्क एक्सेस अस्वीकृत है; आप अब भी नमस्ते प्राप्त कर सकते हैं",
                        Language::En => "Contact access was denied; you can still receive greetings",
                    };
                    self.toast(msg);
                }
            }
            ContactAccess::Unavailable | ContactAccess::Unknown => {
                tracing::warn!("contacts: platform source unavailable");
                self.device_contacts = Vec::new();
                self.state.contact_access = ContactAccess::Unavailable;
            }
        }

        // Contacts and registry refresh together; a registry snapshot must
        // not outlive the contact list that produced it.
        self.registry.clear();
        self.rederive_candidates();
        self.emit_state();
        self.refresh_registry(token);
    }
}
