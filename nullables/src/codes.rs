//! Nullable code source: challenge codes in a fixed order.

use likegate_types::{ChallengeCode, CodeSource, TypeError};
use std::sync::Mutex;

/// Returns pre-configured codes in order, cycling when exhausted.
pub struct NullCodeSource {
    codes: Vec<ChallengeCode>,
    index: Mutex<usize>,
}

impl NullCodeSource {
    /// Panics if any code is malformed; test input only.
    pub fn new(codes: &[&str]) -> Self {
        assert!(!codes.is_empty(), "NullCodeSource needs at least one code");
        Self {
            codes: codes
                .iter()
                .map(|c| ChallengeCode::parse(c).expect("valid test code"))
                .collect(),
            index: Mutex::new(0),
        }
    }

    /// The same code for every call.
    pub fn constant(code: &str) -> Self {
        Self::new(&[code])
    }
}

impl CodeSource for NullCodeSource {
    fn next_code(&self) -> Result<ChallengeCode, TypeError> {
        let mut idx = self.index.lock().unwrap();
        let current = *idx % self.codes.len();
        *idx += 1;
        Ok(self.codes[current].clone())
    }
}
