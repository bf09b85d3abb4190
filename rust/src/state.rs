use crate::contact_book::ContactAccess;

#[derive(uniffi::Record, Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub router: Router,
    pub auth: AuthState,
    pub busy: BusyState,
    pub language: Language,
    pub contact_access: ContactAccess,
    pub contact_query: String,
    /// Derived, deduplicated candidates for the current query (capped for
    /// the search dropdown).
    pub candidates: Vec<RecipientCandidate>,
    /// The user-curated working recipient list.
    pub recipients: Vec<RecipientCandidate>,
    /// Stable keys of recipients selected for the next send.
    pub selected_ids: Vec<String>,
    pub toast: Option<String>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            router: Router {
                default_screen: Screen::Login,
                screen_stack: vec![],
            },
            auth: AuthState::LoggedOut,
            busy: BusyState::idle(),
            language: Language::En,
            contact_access: ContactAccess::Unknown,
            contact_query: String::new(),
            candidates: vec![],
            recipients: vec![],
            selected_ids: vec![],
            toast: None,
        }
    }
}

#[derive(uniffi::Record, Clone, Debug)]
pub struct Router {
    pub default_screen: Screen,
    pub screen_stack: Vec<Screen>,
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq)]
pub enum Screen {
    Login,
    SignUp,
    PhoneOtp,
    ForgotPassword,
    Home,
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq)]
pub enum AuthState {
    LoggedOut,
    LoggedIn { user_id: String },
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum Language {
    En,
    Hi,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
        }
    }
}

/// "In flight" flags for long-ish operations that the UI should reflect.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct BusyState {
    pub signing_in: bool,
    pub loading_contacts: bool,
    pub sending: bool,
}

impl BusyState {
    pub fn idle() -> Self {
        Self {
            signing_in: false,
            loading_contacts: false,
            sending: false,
        }
    }
}

/// The reconciled, UI-facing recipient entity.
///
/// `id` is the stable deduplication key: the registry identity when the
/// phone belongs to a registered user, a `local_`-prefixed phone key
/// otherwise. The same real-world number always reconciles to the same key
/// no matter which address-book entry produced it.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct RecipientCandidate {
    pub id: String,
    pub name: String,
    pub number: String,
    /// Identity greetings are addressed to; present only when registered.
    pub auth_id: Option<String>,
    pub registered: bool,
}
