//! Access token generation.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use rand::distr::Alphanumeric;
use rand::Rng;

/// Prefix of tokens issued for public folders.
pub const PUBLIC_TOKEN_PREFIX: &str = "public-";

/// Issues private (random) and public (timestamp-derived) tokens.
#[derive(Debug)]
pub struct TokenGenerator {
    length: usize,
    last_public_ms: AtomicI64,
}

impl TokenGenerator {
    /// Create a generator for private tokens of `length` characters.
    pub fn new(length: usize) -> Self {
        Self {
            length,
            last_public_ms: AtomicI64::new(0),
        }
    }

    /// Random alphanumeric token.
    pub fn private_token(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }

    /// `public-<millis>` token.
    ///
    /// The timestamp never repeats within one generator, even when two
    /// calls land in the same millisecond.
    pub fn public_token(&self) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = match self.last_public_ms.fetch_update(
            Ordering::SeqCst,
            Ordering::SeqCst,
            |last| Some(now.max(last + 1)),
        ) {
            Ok(prev) | Err(prev) => prev,
        };
        format!("{PUBLIC_TOKEN_PREFIX}{}", now.max(previous + 1))
    }

    /// Token for a folder with the given visibility.
    pub fn generate(&self, private: bool) -> String {
        if private {
            self.private_token()
        } else {
            self.public_token()
        }
    }
}
