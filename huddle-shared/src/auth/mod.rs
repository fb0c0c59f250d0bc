/// Authentication primitives for Huddle
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength checks
/// - [`jwt`]: access, refresh and password-reset tokens
/// - [`verification`]: 6-digit email verification codes
/// - [`middleware`]: bearer token authentication for Axum
///
/// # Example
///
/// ```no_run
/// use huddle_shared::auth::password::{hash_password, verify_password};
/// use huddle_shared::auth::jwt::{issue_token, validate_access_token, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let user_id = Uuid::new_v4();
/// let token = issue_token(user_id, TokenType::Access, "secret-key")?;
/// assert_eq!(validate_access_token(&token, "secret-key")?.sub, user_id);
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod verification;
