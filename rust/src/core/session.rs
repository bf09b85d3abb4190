// Auth session lifecycle + persistence.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::state::AuthState;
use crate::updates::{CoreMsg, InternalEvent};

use super::backend::BackendError;
use super::AppCore;

/// The authenticated backend session. Tokens never leave the core; UI state
/// only carries the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

pub(super) fn session_path(data_dir: &str) -> PathBuf {
    std::path::Path::new(data_dir).join("session.json")
}

pub(super) fn load_session(data_dir: &str) -> anyhow::Result<AuthSession> {
    let path = session_path(data_dir);
    let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

impl AppCore {
    pub(super) fn restore_session(&mut self) {
        match load_session(&self.data_dir) {
            Ok(session) => {
                tracing::info!("session: restored from disk");
                self.start_session(session);
            }
            Err(e) => {
                tracing::debug!(%e, "session: nothing to restore");
                self.handle_auth_transition(false);
            }
        }
    }

    pub(super) fn start_session(&mut self, session: AuthSession) {
        tracing::info!(user_id = %session.user_id, "start_session");
        self.save_session(&session);
        self.state.auth = AuthState::LoggedIn {
            user_id: session.user_id.clone(),
        };
        self.session = Some(session);
        self.handle_auth_transition(true);
        self.refresh_contacts();
        self.register_push_token();
    }

    fn save_session(&self, session: &AuthSession) {
        if let Ok(json) = serde_json::to_vec(session) {
            let _ = std::fs::write(session_path(&self.data_dir), json);
        }
    }

    pub(super) fn sign_in(&mut self, email: String, password: String) {
        if !self.network_enabled() {
            self.toast("Network is disabled");
            return;
        }
        self.set_busy(|b| b.signing_in = true);
        let backend = self.backend.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend.sign_in_password(&email, &password).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::AuthCompleted {
                result,
            })));
        });
    }

    pub(super) fn sign_up(&mut self, email: String, password: String) {
        if !self.network_enabled() {
            self.toast("Network is disabled");
            return;
        }
        self.set_busy(|b| b.signing_in = true);
        let backend = self.backend.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend.sign_up(&email, &password).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::SignUpCompleted {
                result,
            })));
        });
    }

    pub(super) fn request_otp(&mut self, phone: String) {
        if !self.network_enabled() {
            self.toast("Network is disabled");
            return;
        }
        let backend = self.backend.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend.request_otp(&phone).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::OtpRequested {
                result,
            })));
        });
    }

    pub(super) fn verify_otp(&mut self, phone: String, code: String) {
        if !self.network_enabled() {
            self.toast("Network is disabled");
            return;
        }
        self.set_busy(|b| b.signing_in = true);
        let backend = self.backend.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend.verify_otp(&phone, &code).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(InternalEvent::AuthCompleted {
                result,
            })));
        });
    }

    pub(super) fn request_password_reset(&mut self, email: String) {
        if !self.network_enabled() {
            self.toast("Network is disabled");
            return;
        }
        let backend = self.backend.clone();
        let tx = self.core_sender.clone();
        self.runtime.spawn(async move {
            let result = backend.request_password_reset(&email).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(
                InternalEvent::PasswordResetRequested { result },
            )));
        });
    }

    pub(super) fn handle_auth_completed(&mut self, result: Result<AuthSession, BackendError>) {
        self.set_busy(|b| b.signing_in = false);
        match result {
            Ok(session) => self.start_session(session),
            Err(e) => {
                tracing::warn!(%e, "auth: sign in failed");
                self.toast(format!("Sign in failed: {e}"));
            }
        }
    }

    pub(super) fn handle_sign_up_completed(
        &mut self,
        result: Result<Option<AuthSession>, BackendError>,
    ) {
        self.set_busy(|b| b.signing_in = false);
        match result {
            Ok(Some(session)) => self.start_session(session),
            Ok(None) => self.toast("Check your email to confirm your account"),
            Err(e) => {
                tracing::warn!(%e, "auth: sign up failed");
                self.toast(format!("Sign up failed: {e}"));
            }
        }
    }

    pub(super) fn handle_otp_requested(&mut self, result: Result<(), BackendError>) {
        match result {
            Ok(()) => self.toast("Verification code sent"),
            Err(e) => {
                tracing::warn!(%e, "auth: otp request failed");
                self.toast(format!("Could not send code: {e}"));
            }
        }
    }

    pub(super) fn handle_password_reset_requested(&mut self, result: Result<(), BackendError>) {
        match result {
            Ok(()) => self.toast("Password reset email sent"),
            Err(e) => {
                tracing::warn!(%e, "auth: password reset request failed");
                self.toast(format!("Could not send reset email: {e}"));
            }
        }
    }

    pub(super) fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = std::fs::remove_file(session_path(&self.data_dir));
            if self.network_enabled() {
                let backend = self.backend.clone();
                self.runtime.spawn(async move {
                    // Best effort; the local session is gone either way.
                    if let Err(e) = backend.sign_out(&session.access_token).await {
                        tracing::debug!(%e, "auth: remote sign out failed");
                    }
                });
            }
        }
        self.state.auth = AuthState::LoggedOut;
        self.handle_auth_transition(false);
    }
}
