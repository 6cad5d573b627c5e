//! Identity and ordering types for flowsync.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::TypesError;

/// Alphabet used for room codes.
const ROOM_CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of characters in a room code.
pub const ROOM_CODE_LEN: usize = 6;

/// A unique identifier for a session member.
///
/// UUID v4, generated once per joining process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(uuid::Uuid);

impl MemberId {
    /// Create a new random MemberId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({})", &self.0.to_string()[..8])
    }
}

/// A short, human-shareable session code.
///
/// Six characters from `A-Z0-9`. Codes typed by users are normalized
/// (trimmed, upper-cased) before they are used as store keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Generate a random room code.
    pub fn generate() -> Result<Self, TypesError> {
        let mut bytes = [0u8; ROOM_CODE_LEN];
        getrandom::getrandom(&mut bytes).map_err(|e| TypesError::Random(e.to_string()))?;
        let code = bytes
            .iter()
            .map(|b| ROOM_CODE_ALPHABET[(*b as usize) % ROOM_CODE_ALPHABET.len()] as char)
            .collect();
        Ok(Self(code))
    }

    /// Normalize a user-entered code.
    ///
    /// Returns `None` when the input is empty after trimming. No length
    /// check is made here: an unknown code is a lookup miss, not a
    /// validation failure.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_ascii_uppercase()))
        }
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomCode({})", self.0)
    }
}

/// A wall-clock instant in milliseconds since the Unix epoch.
///
/// Used for phase deadlines and for record versions. Comparable across
/// processes only as far as their clocks agree.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a Timestamp from milliseconds since the epoch.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the epoch.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// This instant shifted forward by `duration`.
    pub fn add(&self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }

    /// This instant shifted forward by whole seconds.
    pub fn add_secs(&self, secs: u32) -> Self {
        Self(self.0.saturating_add(u64::from(secs) * 1000))
    }

    /// The smallest timestamp strictly after this one.
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whole seconds from `now` until this instant, rounded half-up.
    ///
    /// Zero if this instant is not after `now`.
    pub fn secs_until_rounded(&self, now: Timestamp) -> u32 {
        let diff = self.0.saturating_sub(now.0);
        u32::try_from((diff + 500) / 1000).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_ids_are_unique() {
        let a = MemberId::new();
        let b = MemberId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn member_id_debug_is_truncated() {
        let id = MemberId::new();
        let debug = format!("{:?}", id);
        assert!(debug.starts_with("MemberId("));
        assert_eq!(debug.len(), "MemberId(".len() + 8 + 1);
    }

    #[test]
    fn generated_room_code_shape() {
        for _ in 0..50 {
            let code = RoomCode::generate().unwrap();
            assert_eq!(code.as_str().len(), ROOM_CODE_LEN);
            assert!(code
                .as_str()
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn room_code_parse_normalizes() {
        let code = RoomCode::parse("  abc123 ").unwrap();
        assert_eq!(code.as_str(), "ABC123");
    }

    #[test]
    fn room_code_parse_rejects_blank() {
        assert!(RoomCode::parse("").is_none());
        assert!(RoomCode::parse("   ").is_none());
    }

    #[test]
    fn room_code_serializes_as_plain_string() {
        let code = RoomCode::parse("XYZ789").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"XYZ789\"");
    }

    #[test]
    fn secs_until_rounds_half_up() {
        let now = Timestamp::from_millis(10_000);
        assert_eq!(Timestamp::from_millis(11_499).secs_until_rounded(now), 1);
        assert_eq!(Timestamp::from_millis(11_500).secs_until_rounded(now), 2);
        assert_eq!(Timestamp::from_millis(10_400).secs_until_rounded(now), 0);
    }

    #[test]
    fn secs_until_past_deadline_is_zero() {
        let now = Timestamp::from_millis(50_000);
        assert_eq!(Timestamp::from_millis(1_000).secs_until_rounded(now), 0);
    }

    #[test]
    fn add_secs_and_next() {
        let t = Timestamp::from_millis(1_000);
        assert_eq!(t.add_secs(3), Timestamp::from_millis(4_000));
        assert_eq!(t.next(), Timestamp::from_millis(1_001));
        assert_eq!(
            t.add(Duration::from_millis(250)),
            Timestamp::from_millis(1_250)
        );
    }
}
