pub mod supabase;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub expires_in: i64,
    pub user: IdentityUser,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Bad credentials, duplicate sign-up or an invalid token.
    #[error("{0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<IdentityUser, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;

    /// `Ok(None)` when the token is not (or no longer) valid.
    async fn user_for_token(&self, access_token: &str)
        -> Result<Option<IdentityUser>, IdentityError>;
}
