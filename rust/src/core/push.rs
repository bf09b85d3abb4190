// Push token registration. Delivery itself is the backend's job; the core
// only keeps the device-token table current.

use crate::updates::{CoreMsg, InternalEvent};

use super::AppCore;

impl AppCore {
    /// The platform hands us its push token whenever it (re)issues one. The
    /// token can arrive before sign-in, so registration re-runs on session
    /// start.
    pub(super) fn set_push_token(&mut self, token: String) {
        tracing::info!("push: device token received");
        self.push_token = Some(token);
        self.register_push_token();
    }

    pub(super) fn register_push_token(&mut self) {
        let (Some(token), Some(session)) = (self.push_token.clone(), self.session.as_ref()) else {
            return;
        };
        if !self.network_enabled() {
            return;
        }
        let backend = self.backend.clone();
        let access_token = session.access_token.clone();
        let user_id = session.user_id.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend
                .upsert_device_token(&access_token, &user_id, &token)
                .await;
            let (ok, error) = match result {
                Ok(()) => (true, None),
                Err(e) => (false, Some(e.to_string())),
            };
            let _ = tx.send(CoreMsg::Internal(Box::new(
                InternalEvent::PushTokenRegistered { ok, error },
            )));
        });
    }

    pub(super) fn handle_push_token_registered(&mut self, ok: bool, error: Option<String>) {
        if ok {
            tracing::info!("push: device token registered");
        } else {
            // Best effort; greetings still reach other registered devices.
            tracing::warn!(
                error = error.as_deref().unwrap_or("unknown"),
                "push: device token registration failed"
            );
        }
    }
}
