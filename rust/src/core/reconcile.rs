// Recipient reconciliation: merge the noisy device address book with the
// registered-user map into a deduplicated, stable-keyed candidate list, and
// run the working-list operations over it.

use std::collections::{HashMap, HashSet};

use phonenumber::country;

use crate::contact_book::RawContact;
use crate::state::{Language, RecipientCandidate};

use super::phone;
use super::registry::RegisteredUser;
use super::AppCore;

/// How many derived candidates the search UI surfaces. Presentation-layer
/// truncation only: applied after dedup, never before.
pub(super) const SEARCH_RESULT_CAP: usize = 20;

/// Derive the full candidate list for the current inputs.
///
/// Device-contact iteration order, first-seen wins on the stable key: two
/// address-book entries (or two numbers on one entry) that normalize to the
/// same phone reconcile to exactly one candidate. Normalization failures are
/// silent per-entry skips.
pub(super) fn derive_candidates(
    contacts: &[RawContact],
    registry: &HashMap<String, RegisteredUser>,
    query: &str,
    region: country::Id,
) -> Vec<RecipientCandidate> {
    let needle = normalized_query(query);

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for contact in contacts {
        let Some(name) = contact
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
        else {
            continue;
        };
        for raw in &contact.numbers {
            let number = phone::normalize(raw, region);
            let Some(local_key) = number.local_key() else {
                // Unusable entry; its siblings still get their chance.
                continue;
            };
            let digits = number.key_digits();

            if !needle.is_empty()
                && !name.to_lowercase().contains(&needle)
                && !digits.contains(&needle)
            {
                continue;
            }

            let registered = registry.get(&digits);
            let key = registered.map_or(local_key, |user| user.id.clone());
            if !seen.insert(key.clone()) {
                continue;
            }

            candidates.push(RecipientCandidate {
                id: key,
                name: name.to_string(),
                number: number.display(),
                auth_id: registered.map(|user| user.auth_id.clone()),
                registered: registered.is_some(),
            });
        }
    }

    candidates
}

/// Search strings compare case-insensitively with whitespace stripped.
fn normalized_query(query: &str) -> String {
    query
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

impl AppCore {
    /// Re-runs on any input change: contacts, registry map, or query. Pure
    /// and synchronous; never re-triggers the registry fetch.
    pub(super) fn rederive_candidates(&mut self) {
        self.derived = derive_candidates(
            &self.device_contacts,
            &self.registry,
            &self.state.contact_query,
            self.default_region(),
        );
        let mut surfaced = self.derived.clone();
        surfaced.truncate(SEARCH_RESULT_CAP);
        self.state.candidates = surfaced;
    }

    pub(super) fn set_contact_query(&mut self, query: String) {
        if self.state.contact_query == query {
            return;
        }
        self.state.contact_query = query;
        self.rederive_candidates();
        self.emit_state();
    }

    /// Promote a derived candidate into the working recipient list.
    ///
    /// Unregistered contacts can be seen (so the user knows who to invite)
    /// but never added as a send target. Adding an already-present key is a
    /// no-op.
    pub(super) fn add_recipient(&mut self, id: &str) {
        let Some(candidate) = self.derived.iter().find(|c| c.id == id).cloned() else {
            tracing::debug!("add_recipient: unknown candidate key");
            return;
        };
        if !candidate.registered {
            let msg = match self.state.language {
                Language::Hi => "यह संपर्क अभी नमस्ते पर नहीं है",
                Language::En => "This contact isn't on Namaste yet",
            };
            self.toast(msg);
            return;
        }
        if self.state.recipients.iter().any(|r| r.id == candidate.id) {
            return;
        }
        self.state.recipients.push(candidate);
        self.emit_state();
    }

    /// Removal and deselection are atomic from the caller's point of view:
    /// afterwards the key is in neither the working list nor the selection.
    pub(super) fn remove_recipient(&mut self, id: &str) {
        self.state.recipients.retain(|r| r.id != id);
        self.selected.remove(id);
        self.sync_selected_ids();
        self.emit_state();
    }

    /// Only defined for keys already in the working list; toggling an absent
    /// key must not materialize phantom selections.
    pub(super) fn toggle_recipient(&mut self, id: &str) {
        if !self.state.recipients.iter().any(|r| r.id == id) {
            return;
        }
        if !self.selected.remove(id) {
            self.selected.insert(id.to_string());
        }
        self.sync_selected_ids();
        self.emit_state();
    }

    pub(super) fn sync_selected_ids(&mut self) {
        self.state.selected_ids = self.selected.iter().cloned().collect();
    }
}
