//! Bearer credential verification for mutating routes.

use async_trait::async_trait;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential missing")]
    Missing,
    #[error("credential rejected")]
    Rejected,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// Accepts any of a fixed set of operator tokens.
pub struct StaticTokenVerifier {
    tokens: Vec<String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AuthError::Missing);
        }

        // No early exit: every configured token is compared.
        let mut matched = None;
        for (index, token) in self.tokens.iter().enumerate() {
            if bool::from(token.as_bytes().ct_eq(credential.as_bytes())) {
                matched = Some(index);
            }
        }

        matched
            .map(|index| Identity {
                subject: format!("operator-{}", index + 1),
            })
            .ok_or(AuthError::Rejected)
    }
}
