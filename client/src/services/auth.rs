//! Authentication service: login, registration and session lifecycle
//!
//! Talks to the backend auth endpoints and persists the resulting session
//! through [`SessionStore`]. With demo mode enabled, registration and login
//! fall back to accounts kept under the `registeredUsers` storage key when
//! the backend cannot be reached.

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::{
    validate_registration, RegisterInput, Session, SessionStorage, SessionStore, StorageError,
    UserProfile, REGISTERED_USERS_KEY,
};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::external::AuthApiClient;

/// bcrypt cost for demo-mode accounts
const DEMO_HASH_COST: u32 = 8;

/// Prefix of tokens minted in demo mode
pub const DEMO_TOKEN_PREFIX: &str = "demo-";

/// Locally registered account (demo mode only)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DemoUser {
    #[serde(flatten)]
    profile: UserProfile,
    password_hash: String,
}

/// Only the expiry matters client-side
#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Whether a bearer token carries an `exp` claim in the past.
///
/// The client cannot verify signatures; it only reads the claim so an
/// expired session is not presented as logged in. Opaque tokens never
/// expire here.
pub fn token_expired(token: &str) -> bool {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    match decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation) {
        Ok(data) => data
            .claims
            .exp
            .map(|exp| exp <= Utc::now().timestamp())
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Authentication service
pub struct AuthService<S: SessionStorage> {
    api: AuthApiClient,
    store: Arc<SessionStore<S>>,
    demo_mode: bool,
}

impl<S: SessionStorage> AuthService<S> {
    /// Create a new AuthService instance
    pub fn new(api: AuthApiClient, store: Arc<SessionStore<S>>, demo_mode: bool) -> Self {
        Self {
            api,
            store,
            demo_mode,
        }
    }

    pub fn session_store(&self) -> &Arc<SessionStore<S>> {
        &self.store
    }

    pub fn demo_mode(&self) -> bool {
        self.demo_mode
    }

    /// Log in and persist the session
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ClientError::ValidationError(
                "Email and password are required".to_string(),
            ));
        }

        let session = match self.api.login(email, password).await {
            Ok(token) => {
                let profile = match self.api.me(&token.access_token).await {
                    Ok(profile) => profile,
                    Err(e) => {
                        tracing::warn!("Could not load profile after login: {}", e);
                        UserProfile::from_email(email)
                    }
                };
                Session::new(token.access_token, profile)
            }
            Err(e) if e.is_transport() && self.demo_mode => {
                tracing::warn!("Auth backend unreachable, using demo login: {}", e);
                self.demo_login(email, password)?
            }
            Err(e) => return Err(e),
        };

        self.store.login(session.clone())?;
        tracing::info!(email = %session.profile.email, "User logged in");
        Ok(session)
    }

    /// Register a new account. Does not log in.
    pub async fn register(&self, input: &RegisterInput) -> ClientResult<UserProfile> {
        validate_registration(input).map_err(|m| ClientError::ValidationError(m.to_string()))?;

        match self.api.register(input).await {
            Ok(_) => {
                tracing::info!(email = %input.email, "User registered");
                Ok(input.profile())
            }
            Err(e) if e.is_transport() && self.demo_mode => {
                tracing::warn!("Auth backend unreachable, registering locally: {}", e);
                self.demo_register(input)
            }
            Err(e) => Err(e),
        }
    }

    /// Destroy the session
    pub fn logout(&self) -> ClientResult<()> {
        self.store.logout()?;
        tracing::info!("User logged out");
        Ok(())
    }

    /// Logged in with a token that has not expired
    pub fn is_authenticated(&self) -> bool {
        self.store
            .current()
            .map(|session| !token_expired(&session.token))
            .unwrap_or(false)
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.store.current().map(|session| session.profile)
    }

    fn demo_users(&self) -> ClientResult<Vec<DemoUser>> {
        match self.store.storage().get_item(REGISTERED_USERS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                ClientError::Storage(StorageError::Corrupt {
                    key: REGISTERED_USERS_KEY.to_string(),
                    message: e.to_string(),
                })
            }),
            None => Ok(Vec::new()),
        }
    }

    fn demo_register(&self, input: &RegisterInput) -> ClientResult<UserProfile> {
        let mut users = self.demo_users()?;
        if users
            .iter()
            .any(|u| u.profile.email.eq_ignore_ascii_case(&input.email))
        {
            return Err(ClientError::DuplicateEntry(input.email.clone()));
        }

        let password_hash = hash(&input.password, DEMO_HASH_COST)
            .map_err(|e| ClientError::Internal(format!("Password hashing failed: {}", e)))?;
        users.push(DemoUser {
            profile: input.profile(),
            password_hash,
        });

        let raw = serde_json::to_string(&users)
            .map_err(|e| ClientError::Internal(format!("Failed to encode accounts: {}", e)))?;
        self.store.storage().set_item(REGISTERED_USERS_KEY, &raw)?;
        Ok(input.profile())
    }

    fn demo_login(&self, email: &str, password: &str) -> ClientResult<Session> {
        let users = self.demo_users()?;
        let user = users
            .into_iter()
            .find(|u| u.profile.email.eq_ignore_ascii_case(email))
            .ok_or(ClientError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| ClientError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(ClientError::InvalidCredentials);
        }

        let token = format!("{}{}", DEMO_TOKEN_PREFIX, Uuid::new_v4());
        Ok(Session::new(token, user.profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn jwt(exp: i64) -> String {
        encode(
            &Header::default(),
            &json!({"sub": "farmer@example.com", "exp": exp}),
            &EncodingKey::from_secret(b"backend-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_expired_jwt() {
        assert!(token_expired(&jwt(Utc::now().timestamp() - 60)));
        assert!(!token_expired(&jwt(Utc::now().timestamp() + 3600)));
    }

    #[test]
    fn test_opaque_tokens_never_expire() {
        assert!(!token_expired("demo-0f8fad5b-d9cb-469f-a165-70867728950e"));
        assert!(!token_expired(""));
    }
}
