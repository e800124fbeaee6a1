use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AuthError, ValidationError};

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com/v1/token";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    id_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

/// Firebase identity session. Cheap to clone; clones share the token cache.
#[derive(Clone)]
pub struct FirebaseAuth {
    client: Client,
    api_key: Arc<str>,
    refresh_token: Arc<Mutex<String>>,
    cached_token: Arc<Mutex<Option<CachedToken>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
    email: Option<String>,
}

/// Outcome of a successful sign-in or sign-up.
#[derive(Clone)]
pub struct Session {
    pub auth: FirebaseAuth,
    pub user_id: String,
    pub email: Option<String>,
}

impl FirebaseAuth {
    /// Resume a session from a stored refresh token.
    pub fn new(api_key: &str, refresh_token: String) -> Self {
        Self {
            client: Client::new(),
            api_key: Arc::from(api_key),
            refresh_token: Arc::new(Mutex::new(refresh_token)),
            cached_token: Arc::new(Mutex::new(None)),
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_email(
        api_key: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let account = Self::account_request(api_key, "signInWithPassword", email, password).await?;
        info!(user_id = %account.local_id, "signed in");
        Ok(Self::session_from(api_key, account))
    }

    /// Create a new account. The caller is responsible for creating the
    /// user's root document afterwards.
    pub async fn sign_up_with_email(
        api_key: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        validate_credentials(email, password)?;
        let account = Self::account_request(api_key, "signUp", email.trim(), password).await?;
        info!(user_id = %account.local_id, "account created");
        Ok(Self::session_from(api_key, account))
    }

    async fn account_request(
        api_key: &str,
        operation: &'static str,
        email: &str,
        password: &str,
    ) -> Result<AccountResponse, AuthError> {
        let client = Client::new();
        let url = format!("{}/accounts:{}?key={}", IDENTITY_TOOLKIT_URL, operation, api_key);

        let resp = client
            .post(&url)
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                operation,
                status,
                body,
            });
        }

        Ok(resp.json().await?)
    }

    fn session_from(api_key: &str, account: AccountResponse) -> Session {
        let expires_in: i64 = account.expires_in.parse().unwrap_or(3600);
        let expires_at = chrono::Utc::now() + chrono::Duration::seconds(expires_in);

        let auth = Self {
            client: Client::new(),
            api_key: Arc::from(api_key),
            refresh_token: Arc::new(Mutex::new(account.refresh_token)),
            cached_token: Arc::new(Mutex::new(Some(CachedToken {
                id_token: account.id_token,
                expires_at,
            }))),
        };

        Session {
            auth,
            user_id: account.local_id,
            email: account.email,
        }
    }

    pub async fn get_id_token(&self) -> Result<String, AuthError> {
        // Reuse the cached token while it has at least a minute left
        {
            let cached = self.cached_token.lock().await;
            if let Some(ref token) = *cached {
                if token.expires_at > chrono::Utc::now() + chrono::Duration::seconds(60) {
                    return Ok(token.id_token.clone());
                }
            }
        }

        self.refresh_id_token().await
    }

    async fn refresh_id_token(&self) -> Result<String, AuthError> {
        let refresh_token = self.refresh_token.lock().await.clone();
        let url = format!("{}?key={}", SECURE_TOKEN_URL, self.api_key);

        let resp = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &refresh_token),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                operation: "token refresh",
                status,
                body,
            });
        }

        let token_resp: RefreshTokenResponse = resp.json().await?;
        debug!("id token refreshed");

        let expires_in: i64 = token_resp.expires_in.parse().unwrap_or(3600);
        let expires_at = chrono::Utc::now() + chrono::Duration::seconds(expires_in);

        *self.refresh_token.lock().await = token_resp.refresh_token;

        let id_token = token_resp.id_token.clone();
        *self.cached_token.lock().await = Some(CachedToken {
            id_token: token_resp.id_token,
            expires_at,
        });

        Ok(id_token)
    }

    /// The refresh token to persist for resuming this session later.
    pub async fn refresh_token(&self) -> String {
        self.refresh_token.lock().await.clone()
    }

    pub async fn get_user_id(&self) -> Result<String, AuthError> {
        let token = self.get_id_token().await?;
        user_id_from_token(&token)
    }
}

/// Read the `user_id` (or `sub`) claim from an unverified JWT.
pub fn user_id_from_token(token: &str) -> Result<String, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::InvalidToken("expected three segments".into()));
    }

    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    let claims: serde_json::Value =
        serde_json::from_slice(&decoded).map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    claims["user_id"]
        .as_str()
        .or_else(|| claims["sub"].as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| AuthError::InvalidToken("no user_id or sub claim".into()))
}

/// Sign-up form rules: a plausible email and a password of at least six characters.
pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Empty { field: "email" });
    }
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid_email {
        return Err(ValidationError::invalid("email", "Please enter a valid email."));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::invalid(
            "password",
            "Password must be at least 6 characters.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(claims: &serde_json::Value) -> String {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
        format!("eyJhbGciOiJub25lIn0.{}.sig", payload)
    }

    #[test]
    fn reads_user_id_claim() {
        let token = token_with(&serde_json::json!({"user_id": "u-123", "sub": "other"}));
        assert_eq!(user_id_from_token(&token).unwrap(), "u-123");
    }

    #[test]
    fn falls_back_to_sub_claim() {
        let token = token_with(&serde_json::json!({"sub": "u-456"}));
        assert_eq!(user_id_from_token(&token).unwrap(), "u-456");
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(user_id_from_token("not-a-jwt").is_err());
        let token = token_with(&serde_json::json!({"name": "x"}));
        assert!(user_id_from_token(&token).is_err());
    }

    #[test]
    fn credential_rules() {
        assert!(validate_credentials("a@b.co", "secret").is_ok());
        assert_eq!(
            validate_credentials("", "secret"),
            Err(ValidationError::Empty { field: "email" })
        );
        assert!(validate_credentials("nobody", "secret").is_err());
        assert!(validate_credentials("a@b.co", "short").is_err());
    }
}
