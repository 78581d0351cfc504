//! Auth session file management

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::errors::DashboardError;
use crate::filesys::file::File;

/// Stored login
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Bearer token
    pub token: String,

    /// Login email
    #[serde(default)]
    pub email: Option<String>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"[redacted]")
            .field("email", &self.email)
            .finish()
    }
}

impl AuthSession {
    pub fn secret(&self) -> SecretString {
        SecretString::from(self.token.clone())
    }
}

/// Load the stored session, if logged in
pub async fn load_session(session_file: &File) -> Result<Option<AuthSession>, DashboardError> {
    let session: Option<AuthSession> = session_file.read_json_opt().await?;
    Ok(session.filter(|s| !s.token.is_empty()))
}

/// Store a session, readable by the owner only
pub async fn save_session(session_file: &File, session: &AuthSession) -> Result<(), DashboardError> {
    if session.token.is_empty() {
        return Err(DashboardError::AuthError("Token is empty".to_string()));
    }
    session_file.write_json(session).await?;
    session_file.set_permissions_600().await
}

/// Forget the stored session
pub async fn clear_session(session_file: &File) -> Result<(), DashboardError> {
    session_file.delete().await
}
