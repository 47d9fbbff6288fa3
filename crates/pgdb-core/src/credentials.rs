//! Random credential generation.

use rand::rngs::{OsRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

const LOWER_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"~!@#$%^&*()_+`-={}|[]\\:\"<>?,./";

/// Produces a fresh secret value for every call.
pub trait CredentialGenerator: Send + Sync {
    /// Generates a new credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Entropy`] if no randomness is available.
    fn generate(&self) -> Result<String, CredentialError>;
}

/// Fixed shape of generated passwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordPolicy {
    /// Total number of characters.
    #[serde(default = "default_length")]
    pub length: usize,
    /// Exact number of digits.
    #[serde(default = "default_digits")]
    pub digits: usize,
    /// Exact number of symbols.
    #[serde(default = "default_symbols")]
    pub symbols: usize,
    /// Whether letters may be upper case.
    #[serde(default = "default_true")]
    pub allow_upper: bool,
    /// Whether a character may appear more than once.
    #[serde(default)]
    pub allow_repeat: bool,
}

fn default_length() -> usize {
    30
}
fn default_digits() -> usize {
    5
}
fn default_symbols() -> usize {
    5
}
fn default_true() -> bool {
    true
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: default_length(),
            digits: default_digits(),
            symbols: default_symbols(),
            allow_upper: true,
            allow_repeat: false,
        }
    }
}

impl PasswordPolicy {
    fn letters(&self) -> &'static [u8] {
        if self.allow_upper {
            LETTERS
        } else {
            LOWER_LETTERS
        }
    }

    /// Checks that the policy can be satisfied.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Policy`] describing the first violation.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.length == 0 {
            return Err(CredentialError::Policy("length must be > 0".into()));
        }
        let Some(required) = self.digits.checked_add(self.symbols) else {
            return Err(CredentialError::Policy(format!(
                "digits ({}) + symbols ({}) overflow",
                self.digits, self.symbols
            )));
        };
        if required > self.length {
            return Err(CredentialError::Policy(format!(
                "digits ({}) + symbols ({}) exceed length ({})",
                self.digits, self.symbols, self.length
            )));
        }
        if !self.allow_repeat {
            let letters = self.length - required;
            let classes = [
                ("letters", letters, self.letters().len()),
                ("digits", self.digits, DIGITS.len()),
                ("symbols", self.symbols, SYMBOLS.len()),
            ];
            for (class, wanted, available) in classes {
                if wanted > available {
                    return Err(CredentialError::Policy(format!(
                        "{wanted} unique {class} requested but only {available} exist"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Password generator seeded from the operating system entropy source.
#[derive(Debug, Clone, Default)]
pub struct PasswordGenerator {
    policy: PasswordPolicy,
}

impl PasswordGenerator {
    /// Creates a generator for `policy`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Policy`] if the policy cannot be satisfied.
    pub fn new(policy: PasswordPolicy) -> Result<Self, CredentialError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    #[must_use]
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    fn pick(&self, rng: &mut StdRng, alphabet: &[u8], count: usize, out: &mut Vec<u8>) {
        if self.policy.allow_repeat {
            out.extend((0..count).map(|_| alphabet[rng.gen_range(0..alphabet.len())]));
        } else {
            out.extend(alphabet.choose_multiple(rng, count).copied());
        }
    }
}

impl CredentialGenerator for PasswordGenerator {
    fn generate(&self) -> Result<String, CredentialError> {
        let mut rng =
            StdRng::from_rng(OsRng).map_err(|e| CredentialError::Entropy(e.to_string()))?;

        let policy = &self.policy;
        let letters = policy.length - policy.digits - policy.symbols;
        let mut chars = Vec::with_capacity(policy.length);
        self.pick(&mut rng, policy.letters(), letters, &mut chars);
        self.pick(&mut rng, DIGITS, policy.digits, &mut chars);
        self.pick(&mut rng, SYMBOLS, policy.symbols, &mut chars);
        chars.shuffle(&mut rng);

        Ok(chars.into_iter().map(char::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const UPPER_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    fn count_in(password: &str, alphabet: &[u8]) -> usize {
        password.bytes().filter(|b| alphabet.contains(b)).count()
    }

    #[test]
    fn test_default_policy_shape() {
        let generator = PasswordGenerator::default();
        for _ in 0..50 {
            let password = generator.generate().unwrap();
            assert_eq!(password.len(), 30);
            assert_eq!(count_in(&password, DIGITS), 5);
            assert_eq!(count_in(&password, SYMBOLS), 5);
            let unique: HashSet<char> = password.chars().collect();
            assert_eq!(unique.len(), 30, "no repeats allowed: {password}");
        }
    }

    #[test]
    fn test_lowercase_only() {
        let generator = PasswordGenerator::new(PasswordPolicy {
            length: 12,
            digits: 2,
            symbols: 0,
            allow_upper: false,
            allow_repeat: true,
        })
        .unwrap();
        let password = generator.generate().unwrap();
        assert_eq!(password.len(), 12);
        assert_eq!(count_in(&password, UPPER_LETTERS), 0);
        assert_eq!(count_in(&password, LOWER_LETTERS), 10);
        assert_eq!(count_in(&password, DIGITS), 2);
    }

    #[test]
    fn test_consecutive_values_differ() {
        let generator = PasswordGenerator::default();
        assert_ne!(generator.generate().unwrap(), generator.generate().unwrap());
    }

    #[test]
    fn test_impossible_policies_are_rejected() {
        let too_many_classes = PasswordPolicy {
            length: 8,
            digits: 5,
            symbols: 5,
            ..Default::default()
        };
        assert!(matches!(
            PasswordGenerator::new(too_many_classes),
            Err(CredentialError::Policy(_))
        ));

        let too_many_unique_digits = PasswordPolicy {
            length: 20,
            digits: 11,
            symbols: 0,
            ..Default::default()
        };
        assert!(too_many_unique_digits.validate().is_err());

        let repeats_allowed = PasswordPolicy {
            allow_repeat: true,
            ..too_many_unique_digits
        };
        assert!(repeats_allowed.validate().is_ok());

        let empty = PasswordPolicy {
            length: 0,
            digits: 0,
            symbols: 0,
            ..Default::default()
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_overflowing_class_counts_are_rejected() {
        let overflowing = PasswordPolicy {
            length: 16,
            digits: usize::MAX,
            symbols: 1,
            allow_repeat: true,
            ..Default::default()
        };
        let err = overflowing.validate().unwrap_err();
        assert!(matches!(err, CredentialError::Policy(ref msg) if msg.contains("overflow")));
    }
}
