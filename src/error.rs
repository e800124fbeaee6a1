use thiserror::Error;

/// Errors raised by a document store implementation.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("request to {path} failed: {status} - {body}")]
    Http {
        path: String,
        status: u16,
        body: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid document at {path}: {reason}")]
    InvalidDocument { path: String, reason: String },
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

impl From<AuthError> for StoreError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e.to_string())
    }
}

/// Errors from the identity provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{operation} failed: {status} - {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("invalid id token: {0}")]
    InvalidToken(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl AuthError {
    /// Message shown to the user when sign-up fails.
    pub fn sign_up_message(&self) -> String {
        match self {
            AuthError::Validation(e) => match e {
                ValidationError::Invalid { reason, .. } => reason.clone(),
                other => other.to_string(),
            },
            AuthError::Rejected { body, .. } if body.contains("EMAIL_EXISTS") => {
                "This email is already registered. Please log in instead.".to_string()
            }
            _ => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

/// Malformed user input, caught before any remote or AI call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} is invalid: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ValidationError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Data-integrity failures when building logged food items.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NutritionError {
    #[error("food has no measurements")]
    NoMeasurements,
    #[error("food must have exactly one base unit with quantity 1, found {0}")]
    BaseUnitCount(usize),
    #[error("reference measurement {unit:?} has zero quantity")]
    ZeroReferenceQuantity { unit: String },
    #[error("unit {0:?} is not one of the item's measurements")]
    UnknownUnit(String),
    #[error("quantity must be a finite, non-negative number")]
    InvalidQuantity,
}

/// Failures at the AI gateway boundary.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("completion service error: {0}")]
    Service(String),
    #[error("completion returned malformed output: {0}")]
    MalformedOutput(String),
    #[error("completion returned no usable output")]
    EmptyOutput,
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        Self::Service(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_up_messages() {
        let taken = AuthError::Rejected {
            operation: "signUp",
            status: 400,
            body: r#"{"error":{"message":"EMAIL_EXISTS"}}"#.into(),
        };
        assert_eq!(
            taken.sign_up_message(),
            "This email is already registered. Please log in instead."
        );

        let short = AuthError::Validation(ValidationError::invalid(
            "password",
            "Password must be at least 6 characters.",
        ));
        assert_eq!(short.sign_up_message(), "Password must be at least 6 characters.");
    }
}
