//! Identity issued by the external sign-in providers.

use serde::{Deserialize, Serialize};

/// The authenticated user, as issued by Google or GitHub.
///
/// Read-only from this application's point of view: it lives in the
/// session token claims for the session lifetime and is never written
/// to storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Stable unique id, prefixed by provider ("google:…" / "github:…")
    pub user_id: String,
    /// Display name as reported by the provider
    pub display_name: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
}
