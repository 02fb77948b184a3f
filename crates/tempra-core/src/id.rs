//! Identity types for Tempra
//!
//! Both identifiers are opaque strings on the wire. Tokens are short so a
//! performer can type them on stage; entry ids only need to be unique.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet used for generated tokens
pub const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of generated tokens
pub const TOKEN_LEN: usize = 6;

/// Token - binds one performer session to one spectator queue
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Token(value.into())
    }

    /// Generate a fresh random token
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let value: String = (0..TOKEN_LEN)
            .map(|_| TOKEN_ALPHABET[rng.gen_range(0..TOKEN_ALPHABET.len())] as char)
            .collect();
        Token(value)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::new(value)
    }
}

/// Queue entry identity - unique within a token's queue
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        EntryId(value.into())
    }

    /// Generate a fresh random (v4 UUID) entry id
    pub fn generate() -> Self {
        EntryId(uuid::Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        EntryId::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_token_shape() {
        let token = Token::generate();
        assert_eq!(token.as_str().len(), TOKEN_LEN);
        assert!(token
            .as_str()
            .bytes()
            .all(|b| TOKEN_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let a = EntryId::generate();
        let b = EntryId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_serializes_as_plain_string() {
        let token = Token::new("AB12CD");
        assert_eq!(serde_json::to_string(&token).unwrap(), "\"AB12CD\"");
    }
}
