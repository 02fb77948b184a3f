//! Directive store contract

use tempra_core::{EntryId, ForceDirective, QueueEntry, TempraResult, Token};

/// Aggregate counts for status reporting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub tokens: usize,
    pub queued: usize,
}

/// Token-addressed FIFO of force directives
///
/// Implementations serialize operations per token; enqueue only appends and
/// ack only removes, so a concurrent fetch sees either the old or new queue.
pub trait DirectiveStore: Send + Sync {
    /// Create and register a fresh token
    fn create_token(&self) -> Token;

    /// Register a caller-chosen token; `false` if it already existed
    fn register(&self, token: Token) -> bool;

    /// Drop a token and its whole queue; `false` if unknown
    fn delete_token(&self, token: &Token) -> bool;

    fn contains(&self, token: &Token) -> bool;

    /// Append a directive
    ///
    /// Fails with `TokenNotFound` for an unknown token and `InvalidDirective`
    /// for a directive that does not validate. Nothing is queued on failure.
    fn enqueue(&self, token: &Token, directive: ForceDirective) -> TempraResult<EntryId>;

    /// Unprocessed entries, oldest first
    fn fetch(&self, token: &Token) -> TempraResult<Vec<QueueEntry>>;

    /// Remove an entry; a no-op for unknown tokens or ids
    ///
    /// Returns whether anything was removed.
    fn ack(&self, token: &Token, id: &EntryId) -> bool;

    /// Number of unprocessed entries for a token
    fn queued_len(&self, token: &Token) -> TempraResult<usize> {
        self.fetch(token).map(|entries| entries.len())
    }

    fn stats(&self) -> StoreStats;
}
