//! Challenge codes: the single-use token embedded in a verification link.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypeError;

/// Number of characters in every challenge code.
pub const CHALLENGE_CODE_LEN: usize = 12;

const ALPHABET: &[u8; 62] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Largest multiple of 62 that fits in a byte; bytes at or above it are
/// rejected so every symbol is equally likely.
const REJECTION_BOUND: u8 = 248;

/// A well-formed challenge code: exactly [`CHALLENGE_CODE_LEN`] ASCII alphanumerics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChallengeCode(String);

impl ChallengeCode {
    /// Validate and wrap a raw code (e.g. the path segment of a verification link).
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        if raw.len() != CHALLENGE_CODE_LEN {
            return Err(TypeError::InvalidCode(format!(
                "expected {} characters, got {}",
                CHALLENGE_CODE_LEN,
                raw.len()
            )));
        }
        if !raw.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidCode(
                "code must be ASCII alphanumeric".to_string(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChallengeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produces fresh challenge codes.
pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> Result<ChallengeCode, TypeError>;
}

/// Codes drawn from the operating system's CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsCodeSource;

impl CodeSource for OsCodeSource {
    fn next_code(&self) -> Result<ChallengeCode, TypeError> {
        let mut code = String::with_capacity(CHALLENGE_CODE_LEN);
        let mut buf = [0u8; 32];
        while code.len() < CHALLENGE_CODE_LEN {
            getrandom::getrandom(&mut buf).map_err(|e| TypeError::Random(e.to_string()))?;
            for &b in buf.iter().filter(|&&b| b < REJECTION_BOUND) {
                if code.len() == CHALLENGE_CODE_LEN {
                    break;
                }
                code.push(ALPHABET[(b % 62) as usize] as char);
            }
        }
        Ok(ChallengeCode(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_alphanumeric_codes() {
        let code = ChallengeCode::parse("abcDEF012345").unwrap();
        assert_eq!(code.as_str(), "abcDEF012345");
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(ChallengeCode::parse("short").is_err());
        assert!(ChallengeCode::parse("abcdefghijklm").is_err());
    }

    #[test]
    fn parse_rejects_non_alphanumeric() {
        assert!(ChallengeCode::parse("abc/ef..1234").is_err());
        assert!(ChallengeCode::parse("abcdéfgh123").is_err());
    }

    #[test]
    fn os_source_produces_valid_codes() {
        let source = OsCodeSource;
        for _ in 0..50 {
            let code = source.next_code().unwrap();
            assert!(ChallengeCode::parse(code.as_str()).is_ok());
        }
    }
}
