use hex;
use sha2::{Digest, Sha256};

/// Checksummed entries for the assistant turn cache.
///
/// Cached turns are replayed verbatim to users, so a corrupted or tampered
/// entry must never be served: each entry carries a SHA-256 digest computed
/// at insert time and re-verified on every read. A failed check falls
/// through to a fresh model call.

/// Wrapper for a cached payload with its integrity digest.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChecksummedEntry {
    /// The cached payload (JSON string of a validated turn).
    pub payload: String,
    /// SHA-256 digest of the payload (hex encoded).
    pub digest: String,
}

impl ChecksummedEntry {
    /// Seals a payload with its computed digest.
    pub fn seal(payload: String) -> Self {
        let digest = Self::compute_digest(&payload);
        Self { payload, digest }
    }

    fn compute_digest(payload: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(payload.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Returns true if the digest still matches the payload.
    pub fn is_intact(&self) -> bool {
        Self::compute_digest(&self.payload) == self.digest
    }

    /// Serializes the entry for storage in the cache.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserializes a cache entry and verifies its digest.
    ///
    /// Returns `Some(payload)` when intact, `None` on invalid JSON or a
    /// digest mismatch (the caller refetches from the model).
    pub fn open(serialized: &str) -> Option<String> {
        let entry: ChecksummedEntry = serde_json::from_str(serialized).ok()?;

        if entry.is_intact() {
            Some(entry.payload)
        } else {
            tracing::warn!(
                "Turn cache validation failed: digest mismatch. Expected: {}, payload length: {}",
                entry.digest,
                entry.payload.len()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sealed_entry_is_intact() {
        let payload = r#"{"reply":"Perfetto.","confidence":"alta"}"#.to_string();
        let entry = ChecksummedEntry::seal(payload.clone());

        assert!(entry.is_intact());
        assert_eq!(entry.payload, payload);
    }

    #[test]
    fn test_seal_then_open_round_trip() {
        let payload = r#"{"user_intent":"GET_QUOTE"}"#.to_string();
        let entry = ChecksummedEntry::seal(payload.clone());

        let opened = ChecksummedEntry::open(&entry.serialize());
        assert_eq!(opened, Some(payload));
    }

    #[test]
    fn test_tampered_payload_detected() {
        let entry = ChecksummedEntry::seal(r#"{"reply":"originale"}"#.to_string());

        let mut tampered = entry;
        tampered.payload = r#"{"reply":"manomessa"}"#.to_string();

        assert!(!tampered.is_intact());
    }

    #[test]
    fn test_tampered_serialized_entry_opens_to_none() {
        let entry = ChecksummedEntry::seal(r#"{"reply":"originale"}"#.to_string());
        let serialized = entry.serialize();

        let tampered = serialized.replace("originale", "manomessa");

        assert_eq!(ChecksummedEntry::open(&tampered), None);
    }

    #[test]
    fn test_garbage_input_opens_to_none() {
        assert_eq!(ChecksummedEntry::open("not json at all"), None);
    }

    #[test]
    fn test_digest_is_deterministic() {
        let entry1 = ChecksummedEntry::seal("same payload".to_string());
        let entry2 = ChecksummedEntry::seal("same payload".to_string());

        assert_eq!(entry1.digest, entry2.digest);
    }
}
