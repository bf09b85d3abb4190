pub(crate) mod backend;
mod config;
mod contacts;
mod phone;
mod push;
mod reconcile;
pub(crate) mod registry;
mod send;
pub(crate) mod session;

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use flume::Sender;

use crate::actions::AppAction;
use crate::contact_book::{ContactAccess, RawContact, SharedContactBookBridge};
use crate::state::{AppState, BusyState, RecipientCandidate, Screen};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};

use backend::Backend;
use registry::RegisteredUser;
use session::AuthSession;

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    data_dir: String,
    config: config::AppConfig,
    runtime: tokio::runtime::Runtime,
    backend: Backend,
    contact_book: SharedContactBookBridge,

    session: Option<AuthSession>,

    // Reconciliation inputs and outputs, owned by this actor session. The
    // registry map lives here, not in module state, so sign-out drops it.
    device_contacts: Vec<RawContact>,
    registry: HashMap<String, RegisteredUser>,
    derived: Vec<RecipientCandidate>,
    selected: BTreeSet<String>,

    // Generation counter for contact loads; async results carrying an older
    // token are dropped, never merged.
    sync_token: u64,
    contact_denied_notified: bool,
    push_token: Option<String>,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        contact_book: SharedContactBookBridge,
    ) -> Self {
        let config = config::load_app_config(&data_dir);
        let backend = Backend::from_config(&config);
        let state = AppState::empty();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .enable_io()
            .build()
            .expect("tokio runtime");

        let this = Self {
            state,
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            data_dir,
            config,
            runtime,
            backend,
            contact_book,
            session: None,
            device_contacts: Vec::new(),
            registry: HashMap::new(),
            derived: Vec::new(),
            selected: BTreeSet::new(),
            sync_token: 0,
            contact_denied_notified: false,
            push_token: None,
        };

        // Ensure FfiApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn next_rev(&mut self) {
        self.rev += 1;
        self.state.rev = self.rev;
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn toast(&mut self, msg: impl Into<String>) {
        // Sticky until the UI explicitly clears it, so snapshot resyncs
        // still carry it.
        self.state.toast = Some(msg.into());
        self.emit_state();
    }

    fn set_busy(&mut self, f: impl FnOnce(&mut BusyState)) {
        let mut next = self.state.busy.clone();
        f(&mut next);
        if next != self.state.busy {
            self.state.busy = next;
            self.emit_state();
        }
    }

    fn handle_auth_transition(&mut self, logged_in: bool) {
        if logged_in {
            self.state.router.default_screen = Screen::Home;
            self.state.router.screen_stack.clear();
            self.emit_state();
        } else {
            self.state.router.default_screen = Screen::Login;
            self.state.router.screen_stack.clear();
            self.state.busy = BusyState::idle();
            self.state.contact_access = ContactAccess::Unknown;
            self.state.contact_query.clear();
            self.state.candidates = vec![];
            self.state.recipients = vec![];
            self.state.selected_ids = vec![];
            self.device_contacts.clear();
            self.registry.clear();
            self.derived.clear();
            self.selected.clear();
            self.contact_denied_notified = false;
            // Invalidate in-flight contact/registry work for the old session.
            self.sync_token = self.sync_token.wrapping_add(1);
            self.emit_state();
        }
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(ref action) => {
                // Never log `?action` directly: it can carry credentials.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action.clone());
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            // Auth
            AppAction::SignIn { email, password } => self.sign_in(email, password),
            AppAction::SignUp { email, password } => self.sign_up(email, password),
            AppAction::RequestOtp { phone } => self.request_otp(phone),
            AppAction::VerifyOtp { phone, code } => self.verify_otp(phone, code),
            AppAction::RequestPasswordReset { email } => self.request_password_reset(email),
            AppAction::RestoreSession => self.restore_session(),
            AppAction::SignOut => self.sign_out(),

            // Navigation
            AppAction::PushScreen { screen } => {
                if self.state.router.screen_stack.last() != Some(&screen) {
                    self.state.router.screen_stack.push(screen);
                    self.emit_state();
                }
            }
            AppAction::UpdateScreenStack { stack } => {
                self.state.router.screen_stack = stack;
                self.emit_state();
            }

            // Contacts & recipients
            AppAction::RefreshContacts => self.refresh_contacts(),
            AppAction::SetContactQuery { query } => self.set_contact_query(query),
            AppAction::AddRecipient { id } => self.add_recipient(&id),
            AppAction::RemoveRecipient { id } => self.remove_recipient(&id),
            AppAction::ToggleRecipient { id } => self.toggle_recipient(&id),

            // Send
            AppAction::SendGreeting => self.send_greeting(),

            // Settings
            AppAction::SetLanguage { language } => {
                if self.state.language == language {
                    return;
                }
                self.state.language = language;
                self.emit_state();
                // Reload is an enumerated trigger of a language change.
                self.refresh_contacts();
            }
            AppAction::SetPushToken { token } => self.set_push_token(token),

            // UI
            AppAction::ClearToast => {
                if self.state.toast.take().is_some() {
                    self.emit_state();
                }
            }

            // Lifecycle
            AppAction::Foregrounded => self.emit_state(),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::ContactsLoaded { token, result } => {
                self.handle_contacts_loaded(token, result);
            }
            InternalEvent::RegistryFetched { token, result } => {
                self.handle_registry_fetched(token, result);
            }
            InternalEvent::AuthCompleted { result } => self.handle_auth_completed(result),
            InternalEvent::SignUpCompleted { result } => self.handle_sign_up_completed(result),
            InternalEvent::OtpRequested { result } => self.handle_otp_requested(result),
            InternalEvent::PasswordResetRequested { result } => {
                self.handle_password_reset_requested(result);
            }
            InternalEvent::GreetingSent { ok, error } => self.handle_greeting_sent(ok, error),
            InternalEvent::PushTokenRegistered { ok, error } => {
                self.handle_push_token_registered(ok, error);
            }
            InternalEvent::Toast(msg) => {
                tracing::info!(msg = %msg, "toast");
                self.toast(msg);
            }
            InternalEvent::RegistryRowsInjectedForTests { rows } => {
                self.registry = registry::registry_map(rows);
                self.rederive_candidates();
                self.emit_state();
            }
        }
    }
}
