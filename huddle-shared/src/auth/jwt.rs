/// Token service
///
/// Issues and validates the signed, time-bound credentials that bind a request
/// to a user. Tokens are JWTs signed with HS256 (HMAC-SHA256).
///
/// # Token Types
///
/// - **Access Token**: 24h, sent as `Authorization: Bearer <token>`
/// - **Refresh Token**: 30d, exchanged for a new access token
/// - **Password Reset Token**: 1h, embedded in the reset link sent by mail
///
/// Validation checks the signature, expiry, not-before time and the `huddle`
/// issuer. An expired token is reported as [`JwtError::Expired`] so the HTTP
/// layer can tell it apart from a forged or malformed one.
///
/// # Example
///
/// ```
/// use huddle_shared::auth::jwt::{create_token, validate_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, TokenType::Access);
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated_claims = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated_claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim carried by every token
pub const ISSUER: &str = "huddle";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Bad signature, malformed token, wrong issuer or wrong token kind
    #[error("Invalid token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
    PasswordReset,
}

impl TokenType {
    /// Gets default expiration duration for token type
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(24),
            TokenType::Refresh => Duration::days(30),
            TokenType::PasswordReset => Duration::hours(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::PasswordReset => "password_reset",
        }
    }
}

/// JWT claims structure
///
/// - `sub`: user ID
/// - `iss`: always "huddle"
/// - `iat` / `nbf` / `exp`: Unix timestamps
/// - `token_type`: which flow the token may be used for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub token_type: TokenType,
}

impl Claims {
    /// Creates new claims with the default expiration for `token_type`
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::with_expiration(user_id, token_type, token_type.default_expiration())
    }

    /// Creates claims with custom expiration
    ///
    /// # Example
    ///
    /// ```
    /// use huddle_shared::auth::jwt::{Claims, TokenType};
    /// use chrono::Duration;
    /// use uuid::Uuid;
    ///
    /// let claims = Claims::with_expiration(
    ///     Uuid::new_v4(),
    ///     TokenType::Access,
    ///     Duration::hours(1),
    /// );
    /// assert_eq!(claims.exp - claims.iat, 3600);
    /// ```
    pub fn with_expiration(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

}

/// Signs claims into a token string
///
/// The secret should be at least 32 bytes; the API refuses to start with a
/// shorter one.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if encoding fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a token of the given type for a user
pub fn issue_token(user_id: Uuid, token_type: TokenType, secret: &str) -> Result<String, JwtError> {
    create_token(&Claims::new(user_id, token_type), secret)
}

/// Validates a token and extracts its claims
///
/// # Errors
///
/// - `JwtError::Expired` if `exp` is in the past
/// - `JwtError::ValidationError` for anything else (signature, issuer,
///   format, not-before)
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    Ok(token_data.claims)
}

fn validate_kind(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if claims.token_type != expected {
        return Err(JwtError::ValidationError(format!(
            "Expected {} token, got {} token",
            expected.as_str(),
            claims.token_type.as_str()
        )));
    }

    Ok(claims)
}

/// Validates token and checks it's an access token
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_kind(token, secret, TokenType::Access)
}

/// Validates token and checks it's a refresh token
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_kind(token, secret, TokenType::Refresh)
}

/// Validates token and checks it's a password reset token
pub fn validate_reset_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_kind(token, secret, TokenType::PasswordReset)
}

/// Exchanges a valid refresh token for a new access token
///
/// # Example
///
/// ```
/// use huddle_shared::auth::jwt::{create_token, refresh_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "secret";
/// let refresh_claims = Claims::new(Uuid::new_v4(), TokenType::Refresh);
/// let refresh_token = create_token(&refresh_claims, secret)?;
///
/// let new_access_token = refresh_access_token(&refresh_token, secret)?;
/// assert!(!new_access_token.is_empty());
/// # Ok(())
/// # }
/// ```
pub fn refresh_access_token(refresh_token: &str, secret: &str) -> Result<String, JwtError> {
    let refresh_claims = validate_refresh_token(refresh_token, secret)?;
    issue_token(refresh_claims.sub, TokenType::Access, secret)
}
