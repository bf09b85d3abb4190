// Typed client for the backend-as-a-service REST surface: auth endpoints
// plus the `profiles`, `notifications` and `device_tokens` tables. A
// separate backend worker drains `notifications` into device pushes; this
// client never talks to push services directly.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::config::AppConfig;
use super::registry::RegisteredUser;
use super::send::OutboundGreeting;
use super::session::AuthSession;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("auth response missing session")]
    MissingSession,
}

#[derive(Clone)]
pub(super) struct Backend {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<AuthUser>,
}

impl AuthResponse {
    fn into_session(self) -> Option<AuthSession> {
        let access_token = self.access_token?;
        let user = self.user?;
        Some(AuthSession {
            user_id: user.id,
            access_token,
            refresh_token: self.refresh_token,
        })
    }
}

impl Backend {
    pub(super) fn from_config(config: &AppConfig) -> Self {
        let base_url = config
            .backend_url
            .clone()
            .or_else(|| std::env::var("NAMASTE_BACKEND_URL").ok())
            .unwrap_or_default();
        let anon_key = config
            .backend_anon_key
            .clone()
            .or_else(|| std::env::var("NAMASTE_BACKEND_ANON_KEY").ok())
            .unwrap_or_default();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .text()
            .await
            .ok()
            .and_then(|body| extract_error_message(&body))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    pub(super) async fn sign_in_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, BackendError> {
        let resp = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let payload: AuthResponse = Self::check(resp).await?.json().await?;
        payload.into_session().ok_or(BackendError::MissingSession)
    }

    /// Sign-up may or may not return a session depending on whether the
    /// backend requires email confirmation.
    pub(super) async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<AuthSession>, BackendError> {
        let resp = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let payload: AuthResponse = Self::check(resp).await?.json().await?;
        Ok(payload.into_session())
    }

    pub(super) async fn request_otp(&self, phone: &str) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.auth_url("otp"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "phone": phone }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub(super) async fn verify_otp(
        &self,
        phone: &str,
        code: &str,
    ) -> Result<AuthSession, BackendError> {
        let resp = self
            .http
            .post(self.auth_url("verify"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "phone": phone, "token": code, "type": "sms" }))
            .send()
            .await?;
        let payload: AuthResponse = Self::check(resp).await?.json().await?;
        payload.into_session().ok_or(BackendError::MissingSession)
    }

    pub(super) async fn request_password_reset(&self, email: &str) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.auth_url("recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub(super) async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Single batched equality-in-set lookup over the registry table.
    pub(super) async fn profiles_by_phones(
        &self,
        access_token: &str,
        phones: &[String],
    ) -> Result<Vec<RegisteredUser>, BackendError> {
        let quoted: Vec<String> = phones.iter().map(|p| format!("\"{p}\"")).collect();
        let in_filter = format!("in.({})", quoted.join(","));
        let resp = self
            .http
            .get(self.rest_url("profiles"))
            .query(&[
                ("select", "id,auth_id,phone_e164"),
                ("phone_e164", in_filter.as_str()),
            ])
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// One insert for the whole batch; the sink accepts or rejects it
    /// atomically.
    pub(super) async fn insert_notifications(
        &self,
        access_token: &str,
        rows: &[OutboundGreeting],
    ) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.rest_url("notifications"))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(access_token)
            .json(rows)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Upsert keeps one row per user/token pair.
    pub(super) async fn upsert_device_token(
        &self,
        access_token: &str,
        user_id: &str,
        token: &str,
    ) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.rest_url("device_tokens"))
            .header("apikey", &self.anon_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .bearer_auth(access_token)
            .json(&json!({ "user_id": user_id, "token": token }))
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["error_description", "msg", "message", "error"] {
        if let Some(s) = v.get(key).and_then(|s| s.as_str()) {
            return Some(s.to_string());
        }
    }
    None
}
