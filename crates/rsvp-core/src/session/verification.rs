//! One-time verification codes for organizer registration

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;

use super::kv::{DashMapStore, KeyValueStore};

/// Hours a code stays valid after generation
pub const CODE_TTL_HOURS: i64 = 24;

/// Stored code for one phone number
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationEntry {
    pub code: String,
    pub verified: bool,
    pub generated_at: DateTime<Utc>,
}

/// Result of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// No code was ever generated for this number
    Missing,
    /// The code is older than [`CODE_TTL_HOURS`]
    Expired,
    /// The digits did not match
    Mismatch,
}

impl VerifyOutcome {
    pub fn is_verified(self) -> bool {
        self == VerifyOutcome::Verified
    }
}

/// Registry of verification codes
#[derive(Clone)]
pub struct VerificationRegistry {
    backend: Arc<dyn KeyValueStore<VerificationEntry>>,
}

impl VerificationRegistry {
    pub fn new() -> Self {
        Self::with_backend(Arc::new(DashMapStore::new()))
    }

    pub fn with_backend(backend: Arc<dyn KeyValueStore<VerificationEntry>>) -> Self {
        Self { backend }
    }

    /// Generate a fresh 6-digit code, replacing any previous one
    pub fn generate_code(&self, number: &str) -> String {
        self.generate_code_at(number, Utc::now())
    }

    pub fn generate_code_at(&self, number: &str, now: DateTime<Utc>) -> String {
        let mut rng = rand::thread_rng();
        let code: String = (0..6)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();

        self.backend.set(
            number,
            VerificationEntry {
                code: code.clone(),
                verified: false,
                generated_at: now,
            },
        );
        info!("Verification code generated for {}", number);
        code
    }

    pub fn verify_code(&self, number: &str, code: &str) -> VerifyOutcome {
        self.verify_code_at(number, code, Utc::now())
    }

    /// Check `code` against the stored entry as of `now`.
    ///
    /// Expired entries are rejected but left in place.
    pub fn verify_code_at(&self, number: &str, code: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let Some(mut entry) = self.backend.get(number) else {
            info!("No verification code found for {}", number);
            return VerifyOutcome::Missing;
        };

        if now - entry.generated_at > Duration::hours(CODE_TTL_HOURS) {
            info!("Verification code for {} has expired", number);
            return VerifyOutcome::Expired;
        }

        if entry.code != code.trim() {
            info!("Verification failed for {}", number);
            return VerifyOutcome::Mismatch;
        }

        entry.verified = true;
        self.backend.set(number, entry);
        info!("Verification successful for {}", number);
        VerifyOutcome::Verified
    }

    pub fn is_verified(&self, number: &str) -> bool {
        self.backend
            .get(number)
            .map(|entry| entry.verified)
            .unwrap_or(false)
    }

    pub fn entry(&self, number: &str) -> Option<VerificationEntry> {
        self.backend.get(number)
    }

    pub fn clear(&self, number: &str) {
        if self.backend.delete(number).is_some() {
            info!("Verification data cleared for {}", number);
        }
    }
}

impl Default for VerificationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_six_digits() {
        let registry = VerificationRegistry::new();
        let code = registry.generate_code("5551");
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert!(!registry.is_verified("5551"));
    }

    #[test]
    fn test_verify_is_idempotent_while_valid() {
        let registry = VerificationRegistry::new();
        let code = registry.generate_code("5551");

        assert_eq!(registry.verify_code("5551", &code), VerifyOutcome::Verified);
        assert!(registry.is_verified("5551"));
        assert_eq!(registry.verify_code("5551", &code), VerifyOutcome::Verified);
    }

    #[test]
    fn test_wrong_code_fails() {
        let registry = VerificationRegistry::new();
        let code = registry.generate_code("5551");
        let wrong = if code == "000000" { "111111" } else { "000000" };

        assert_eq!(registry.verify_code("5551", wrong), VerifyOutcome::Mismatch);
        assert!(!registry.is_verified("5551"));
    }

    #[test]
    fn test_missing_entry() {
        let registry = VerificationRegistry::new();
        assert_eq!(registry.verify_code("5551", "123456"), VerifyOutcome::Missing);
    }

    #[test]
    fn test_code_expires_after_ttl() {
        let registry = VerificationRegistry::new();
        let generated = Utc::now() - Duration::hours(CODE_TTL_HOURS) - Duration::minutes(1);
        let code = registry.generate_code_at("5551", generated);

        assert_eq!(
            registry.verify_code_at("5551", &code, Utc::now()),
            VerifyOutcome::Expired
        );
        // Rejected, not removed
        assert!(registry.entry("5551").is_some());
    }

    #[test]
    fn test_code_valid_just_before_ttl() {
        let registry = VerificationRegistry::new();
        let generated = Utc::now();
        let code = registry.generate_code_at("5551", generated);
        let almost = generated + Duration::hours(CODE_TTL_HOURS) - Duration::seconds(1);

        assert!(registry.verify_code_at("5551", &code, almost).is_verified());
    }

    #[test]
    fn test_regenerate_resets_verified_flag() {
        let registry = VerificationRegistry::new();
        let code = registry.generate_code("5551");
        registry.verify_code("5551", &code);
        registry.generate_code("5551");
        assert!(!registry.is_verified("5551"));
    }

    #[test]
    fn test_clear() {
        let registry = VerificationRegistry::new();
        registry.generate_code("5551");
        registry.clear("5551");
        assert!(registry.entry("5551").is_none());
    }
}
