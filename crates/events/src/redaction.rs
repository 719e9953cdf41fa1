//! Masking of stored passwords in user-visible messages.
//!
//! The credential service registers every password it stores, and error
//! messages pass through [`redact`] before they are shown, so a z/OSMF
//! response echoing the password is never displayed verbatim.
//!
//! Registrations are counted: two connections sharing a password keep it
//! masked until both have unregistered it.

use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

/// Secrets shorter than this are not masked; they would match ordinary words.
pub const MIN_SECRET_LENGTH: usize = 4;

/// Text substituted for a masked secret.
pub const REDACTED_PLACEHOLDER: &str = "********";

#[derive(Debug, Default)]
struct Redactor {
    secrets: HashMap<String, usize>,
}

impl Redactor {
    fn add(&mut self, secret: String) {
        if secret.chars().count() >= MIN_SECRET_LENGTH {
            *self.secrets.entry(secret).or_default() += 1;
        }
    }

    fn remove(&mut self, secret: &str) {
        if let Some(count) = self.secrets.get_mut(secret) {
            *count -= 1;
            if *count == 0 {
                self.secrets.remove(secret);
            }
        }
    }

    fn apply(&self, input: &str) -> String {
        let mut longest_first: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        longest_first.sort_unstable_by_key(|secret| std::cmp::Reverse(secret.len()));

        let mut output = input.to_string();
        for secret in longest_first {
            if output.contains(secret) {
                output = output.replace(secret, REDACTED_PLACEHOLDER);
            }
        }
        output
    }
}

static REDACTOR: LazyLock<RwLock<Redactor>> = LazyLock::new(RwLock::default);

/// Start masking `secret`.
///
/// ```rust
/// use formainframe_events::redaction::{redact, register_secret};
///
/// register_secret("n0t-a-real-pw");
/// assert_eq!(redact("login n0t-a-real-pw"), "login ********");
/// ```
pub fn register_secret(secret: impl Into<String>) {
    register_secrets([secret]);
}

/// Start masking every value of `secrets`.
pub fn register_secrets(secrets: impl IntoIterator<Item = impl Into<String>>) {
    let mut redactor = REDACTOR.write().unwrap_or_else(PoisonError::into_inner);
    for secret in secrets {
        redactor.add(secret.into());
    }
}

/// Drop one registration of `secret`.
pub fn unregister_secret(secret: &str) {
    REDACTOR
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(secret);
}

/// `input` with every registered secret replaced by [`REDACTED_PLACEHOLDER`].
///
/// A secret containing another registered one is masked as a whole.
#[must_use]
pub fn redact(input: &str) -> String {
    REDACTOR
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .apply(input)
}

/// Distinct secrets currently masked.
#[must_use]
pub fn secret_count() -> usize {
    REDACTOR
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .secrets
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exercised on a local Redactor; the global one is shared with other tests.

    fn redactor(secrets: &[&str]) -> Redactor {
        let mut redactor = Redactor::default();
        for secret in secrets {
            redactor.add((*secret).to_string());
        }
        redactor
    }

    #[test]
    fn test_password_masked_in_response_body() {
        let redactor = redactor(&["s3cr3tpw"]);
        assert_eq!(
            redactor.apply("Basic auth failed for IBMUSER/s3cr3tpw"),
            "Basic auth failed for IBMUSER/********"
        );
    }

    #[test]
    fn test_short_values_not_masked() {
        let redactor = redactor(&["ab", "abc", "abcd"]);
        assert_eq!(redactor.secrets.len(), 1);
        assert_eq!(redactor.apply("ab abc abcd"), "ab abc ********");
    }

    #[test]
    fn test_enclosing_secret_masked_whole() {
        let redactor = redactor(&["pass", "password"]);
        assert_eq!(redactor.apply("the password is set"), "the ******** is set");
    }

    #[test]
    fn test_shared_password_kept_until_last_unregister() {
        let mut redactor = redactor(&["shared-pw", "shared-pw"]);

        redactor.remove("shared-pw");
        assert_eq!(redactor.apply("shared-pw"), REDACTED_PLACEHOLDER);

        redactor.remove("shared-pw");
        redactor.remove("shared-pw");
        assert!(redactor.secrets.is_empty());
        assert_eq!(redactor.apply("shared-pw"), "shared-pw");
    }

    #[test]
    fn test_global_registry_round() {
        let secret = "global-registry-test-pw";
        register_secret(secret);
        assert!(secret_count() >= 1);
        assert_eq!(redact(&format!("pw={secret}")), "pw=********");

        unregister_secret(secret);
        assert_eq!(redact(secret), secret);
    }
}
