// Registered-user matching: one batched lookup against the backend registry
// per contacts-changed event, never one query per contact.

use std::collections::{BTreeSet, HashMap};

use phonenumber::country;
use serde::Deserialize;

use crate::contact_book::RawContact;
use crate::updates::{CoreMsg, InternalEvent};

use super::backend::BackendError;
use super::phone;
use super::AppCore;

/// A backend registry row: someone who signed up with a phone number.
///
/// `id` is the stable reconciliation key for registered candidates;
/// `auth_id` is the identity greetings are addressed to. The registry is
/// unique on `phone_e164`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RegisteredUser {
    pub id: String,
    pub auth_id: String,
    pub phone_e164: String,
}

/// Dialing-canonical values to look up, deduplicated and filtered. Numbers
/// that fail canonical parsing are excluded: the registry stores E.164, so a
/// digits-only fallback could never match it.
pub(super) fn lookup_keys(contacts: &[RawContact], region: country::Id) -> BTreeSet<String> {
    contacts
        .iter()
        .flat_map(|c| c.numbers.iter())
        .filter_map(|raw| phone::normalize(raw, region).e164)
        .collect()
}

/// Key the registry by the digits-only form of the stored number so lookups
/// tolerate a registry canonicalization that differs from ours.
pub(super) fn registry_map(rows: Vec<RegisteredUser>) -> HashMap<String, RegisteredUser> {
    rows.into_iter()
        .map(|row| {
            let key: String = row
                .phone_e164
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            (key, row)
        })
        .collect()
}

impl AppCore {
    /// Issued once per contacts-changed event, batched across all numbers.
    /// Search-string changes never land here; they only re-derive locally.
    pub(super) fn refresh_registry(&mut self, token: u64) {
        let keys = lookup_keys(&self.device_contacts, self.default_region());
        if keys.is_empty() {
            // Nothing to match; skip the network round-trip entirely.
            self.registry.clear();
            self.rederive_candidates();
            self.emit_state();
            return;
        }
        if !self.network_enabled() {
            tracing::debug!("registry: network disabled, everyone stays unregistered");
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let backend = self.backend.clone();
        let access_token = session.access_token.clone();
        let phones: Vec<String> = keys.into_iter().collect();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend.profiles_by_phones(&access_token, &phones).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::RegistryFetched {
                token,
                result,
            })));
        });
    }

    pub(super) fn handle_registry_fetched(
        &mut self,
        token: u64,
        result: Result<Vec<RegisteredUser>, BackendError>,
    ) {
        if token != self.sync_token {
            // A newer contacts load superseded this query; merging would
            // resurrect a stale registry over fresher data.
            tracing::debug!(token, current = self.sync_token, "registry: stale result discarded");
            return;
        }
        match result {
            Ok(rows) => {
                tracing::info!(rows = rows.len(), "registry: matched registered users");
                self.registry = registry_map(rows);
            }
            Err(e) => {
                // Recoverable: browsing continues with everyone unregistered.
                tracing::warn!(%e, "registry: batch query failed");
                self.registry.clear();
            }
        }
        self.rederive_candidates();
        self.emit_state();
    }
}
