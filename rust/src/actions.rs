use crate::state::{Language, Screen};

#[derive(uniffi::Enum, Debug, Clone)]
pub enum AppAction {
    // Auth
    SignIn {
        email: String,
        password: String,
    },
    SignUp {
        email: String,
        password: String,
    },
    RequestOtp {
        phone: String,
    },
    VerifyOtp {
        phone: String,
        code: String,
    },
    RequestPasswordReset {
        email: String,
    },
    RestoreSession,
    SignOut,

    // Navigation
    PushScreen {
        screen: Screen,
    },
    UpdateScreenStack {
        stack: Vec<Screen>,
    },

    // Contacts & recipients
    RefreshContacts,
    SetContactQuery {
        query: String,
    },
    AddRecipient {
        id: String,
    },
    RemoveRecipient {
        id: String,
    },
    ToggleRecipient {
        id: String,
    },

    // Send
    SendGreeting,

    // Settings
    SetLanguage {
        language: Language,
    },
    SetPushToken {
        token: String,
    },

    // UI
    ClearToast,

    // Lifecycle
    Foregrounded,
}

impl AppAction {
    /// Log-safe action tag (never includes credentials, OTP codes, or phone
    /// numbers).
    pub fn tag(&self) -> &'static str {
        match self {
            // Auth
            AppAction::SignIn { .. } => "SignIn",
            AppAction::SignUp { .. } => "SignUp",
            AppAction::RequestOtp { .. } => "RequestOtp",
            AppAction::VerifyOtp { .. } => "VerifyOtp",
            AppAction::RequestPasswordReset { .. } => "RequestPasswordReset",
            AppAction::RestoreSession => "RestoreSession",
            AppAction::SignOut => "SignOut",

            // Navigation
            AppAction::PushScreen { .. } => "PushScreen",
            AppAction::UpdateScreenStack { .. } => "UpdateScreenStack",

            // Contacts & recipients
            AppAction::RefreshContacts => "RefreshContacts",
            AppAction::SetContactQuery { .. } => "SetContactQuery",
            AppAction::AddRecipient { .. } => "AddRecipient",
            AppAction::RemoveRecipient { .. } => "RemoveRecipient",
            AppAction::ToggleRecipient { .. } => "ToggleRecipient",

            // Send
            AppAction::SendGreeting => "SendGreeting",

            // Settings
            AppAction::SetLanguage { .. } => "SetLanguage",
            AppAction::SetPushToken { .. } => "SetPushToken",

            // UI
            AppAction::ClearToast => "ClearToast",

            // Lifecycle
            AppAction::Foregrounded => "Foregrounded",
        }
    }
}
