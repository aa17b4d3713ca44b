//! Upload session identity and metadata.

use crate::video::{Classification, Priority};
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

/// Unique identifier for an upload session.
///
/// Rendered as exactly 32 lowercase hex characters. The id doubles as a
/// directory name in the spool, so parsing is strict: anything that is not
/// 32 lowercase hex digits is rejected before any path is built from it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a client-supplied id.
    ///
    /// Strict by design: the id becomes a spool directory name, so this is
    /// the primary defense against path traversal. Exactly 32 characters,
    /// each a lowercase hex digit.
    pub fn parse(s: &str) -> crate::Result<Self> {
        if s.len() != 32 || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(crate::Error::InvalidSessionId);
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| crate::Error::InvalidSessionId)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<String> for SessionId {
    type Error = crate::Error;

    fn try_from(s: String) -> crate::Result<Self> {
        Self::parse(&s)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0.simple())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Per-session metadata, persisted as `session.json` alongside the staged
/// chunks and rewritten on every chunk receipt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Station this upload belongs to.
    pub station_id: Uuid,
    /// Filename as declared by the client.
    pub original_filename: String,
    /// Total size in bytes as declared by the client.
    pub declared_size: u64,
    /// Video title.
    pub title: String,
    /// Content classification.
    pub classification: Classification,
    /// Upload priority.
    pub priority: Priority,
    /// Number of distinct chunk indices received so far.
    pub chunks_received: u32,
    /// Total chunk count as last declared by the client. Unknown until the
    /// first chunk call; every chunk call may restate it (last writer wins).
    pub total_chunks: Option<u32>,
    /// When the session was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl UploadSession {
    /// Create a new session with a fresh random id.
    pub fn new(
        station_id: Uuid,
        original_filename: String,
        declared_size: u64,
        title: String,
        classification: Classification,
        priority: Priority,
    ) -> Self {
        Self {
            id: SessionId::new(),
            station_id,
            original_filename,
            declared_size,
            title,
            classification,
            priority,
            chunks_received: 0,
            total_chunks: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Record one received chunk and the client-declared total.
    ///
    /// `fresh` is false when the index was already present; the chunk is
    /// overwritten without advancing the counter, keeping retries from
    /// inflating progress.
    pub fn record_chunk(&mut self, total_chunks: u32, fresh: bool) {
        if fresh {
            self.chunks_received += 1;
        }
        self.total_chunks = Some(total_chunks);
    }

    /// True when every declared chunk has been received.
    pub fn is_complete(&self) -> bool {
        self.total_chunks
            .is_some_and(|total| total > 0 && self.chunks_received == total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_roundtrip() {
        let id = SessionId::new();
        let as_str = id.to_string();
        assert_eq!(as_str.len(), 32);
        let parsed = SessionId::parse(&as_str).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn session_id_rejects_malformed() {
        for bad in [
            "",
            "short",
            "../../etc/passwd",
            "ABCDEF00112233445566778899aabbcc", // uppercase
            "g0000000000000000000000000000000", // non-hex
            "00112233445566778899aabbccddeeff0", // 33 chars
            "0011223344556677/899aabbccddeeff",
        ] {
            assert!(SessionId::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn session_id_serde_is_strict() {
        let id = SessionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let err = serde_json::from_str::<SessionId>("\"../../etc\"");
        assert!(err.is_err());
    }

    fn sample_session() -> UploadSession {
        UploadSession::new(
            Uuid::new_v4(),
            "show.mp4".to_string(),
            1024,
            "Morning Show".to_string(),
            Classification::Other,
            Priority::default(),
        )
    }

    #[test]
    fn record_chunk_counts_fresh_only() {
        let mut session = sample_session();
        session.record_chunk(3, true);
        session.record_chunk(3, true);
        session.record_chunk(3, false); // retry of an existing index
        assert_eq!(session.chunks_received, 2);
        assert_eq!(session.total_chunks, Some(3));
        assert!(!session.is_complete());

        session.record_chunk(3, true);
        assert!(session.is_complete());
    }

    #[test]
    fn total_chunks_is_last_writer_wins() {
        let mut session = sample_session();
        session.record_chunk(5, true);
        session.record_chunk(2, true);
        assert_eq!(session.total_chunks, Some(2));
        assert!(session.is_complete());
    }
}
