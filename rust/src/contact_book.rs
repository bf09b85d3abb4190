use std::sync::{Arc, RwLock};

/// Outcome of asking the platform for address-book access.
#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum ContactAccess {
    /// No load has been attempted this session.
    Unknown,
    Granted,
    /// The user declined address-book access.
    Denied,
    /// The platform contact API failed.
    Unavailable,
}

/// One raw device address-book entry, exactly as the platform reports it.
/// Names may be missing and numbers arrive in arbitrary local formats.
#[derive(uniffi::Record, Clone, Debug)]
pub struct RawContact {
    pub contact_id: String,
    pub name: Option<String>,
    pub numbers: Vec<String>,
}

#[derive(uniffi::Record, Clone, Debug)]
pub struct ContactLoadResult {
    pub access: ContactAccess,
    pub contacts: Vec<RawContact>,
}

/// Platform-side device address book. A read can block on a permission
/// prompt, so the core always calls this off the actor thread.
#[uniffi::export(callback_interface)]
pub trait ContactBookBridge: Send + Sync + 'static {
    fn load_contacts(&self) -> ContactLoadResult;
}

pub type SharedContactBookBridge = Arc<RwLock<Option<Arc<dyn ContactBookBridge>>>>;
