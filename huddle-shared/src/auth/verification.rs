/// Email verification codes
///
/// A code is a random 6-digit number mailed to the user. Only its SHA-256 hash
/// is stored, together with an expiry 15 minutes after issue and a count of
/// wrong guesses. After [`MAX_CODE_ATTEMPTS`] wrong guesses the code is burned.

use crate::models::user::PendingVerification;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// How long an issued code stays valid
pub const CODE_TTL_MINUTES: i64 = 15;

/// Wrong guesses allowed before the code is discarded
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// Generates a random code in `100000..=999999`
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Hex SHA-256 of a code
pub fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.trim().as_bytes()))
}

/// Builds the pending record to store for a freshly issued code
pub fn pending_for(code: &str, now: DateTime<Utc>) -> PendingVerification {
    PendingVerification {
        code_hash: hash_code(code),
        expires_at: now + Duration::minutes(CODE_TTL_MINUTES),
        attempts: 0,
    }
}

/// Pending record after one more wrong guess
///
/// Returns `None` once the guess budget is spent, meaning the code must be
/// cleared.
pub fn record_mismatch(pending: &PendingVerification) -> Option<PendingVerification> {
    let attempts = pending.attempts + 1;
    (attempts < MAX_CODE_ATTEMPTS).then(|| PendingVerification {
        attempts,
        ..pending.clone()
    })
}

/// Outcome of checking a submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeCheck {
    Valid,
    Mismatch,
    Expired,
    /// Guess budget already spent
    Exhausted,
}

/// Checks a submitted code against the pending record
pub fn check_code(pending: &PendingVerification, code: &str, now: DateTime<Utc>) -> CodeCheck {
    if now >= pending.expires_at {
        return CodeCheck::Expired;
    }

    if pending.attempts >= MAX_CODE_ATTEMPTS {
        return CodeCheck::Exhausted;
    }

    if hash_code(code) == pending.code_hash {
        CodeCheck::Valid
    } else {
        CodeCheck::Mismatch
    }
}
