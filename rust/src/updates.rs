use crate::contact_book::ContactLoadResult;
use crate::core::backend::BackendError;
use crate::core::registry::RegisteredUser;
use crate::core::session::AuthSession;
use crate::state::AppState;
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

/// Async results routed back to the app actor. `token` fields carry the
/// contacts-load generation that produced the work so stale results are
/// discarded instead of merged.
#[derive(Debug)]
pub enum InternalEvent {
    ContactsLoaded {
        token: u64,
        result: ContactLoadResult,
    },
    RegistryFetched {
        token: u64,
        result: Result<Vec<RegisteredUser>, BackendError>,
    },

    // Auth results
    AuthCompleted {
        result: Result<AuthSession, BackendError>,
    },
    SignUpCompleted {
        result: Result<Option<AuthSession>, BackendError>,
    },
    OtpRequested {
        result: Result<(), BackendError>,
    },
    PasswordResetRequested {
        result: Result<(), BackendError>,
    },

    // Send / push results
    GreetingSent {
        ok: bool,
        error: Option<String>,
    },
    PushTokenRegistered {
        ok: bool,
        error: Option<String>,
    },

    Toast(String),

    RegistryRowsInjectedForTests {
        rows: Vec<RegisteredUser>,
    },
}
