//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

/// Session-stored operator identity.
///
/// The dashboard has a single configured operator account, so the
/// username is all the session needs to carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub username: String,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the logged-in operator.
    pub const CURRENT_USER: &str = "current_user";
}
