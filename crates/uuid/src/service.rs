//! Implementation of the identifier types.

use crate::{UuidError, UuidResult};
use chrono::{Datelike, NaiveDate};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// MediBook's canonical record id (32 lowercase hex characters, no hyphens).
///
/// This wrapper type guarantees that once constructed, the contained UUID is in canonical
/// form. It is used as the primary key of every stored document and to derive that document's
/// sharded directory.
///
/// # Construction
/// - [`RecordId::new`] generates a new canonical id.
/// - [`RecordId::parse`] validates an externally supplied identifier (URL path segment, token
///   subject, CLI argument).
///
/// # Errors
/// [`RecordId::parse`] returns [`UuidError::InvalidInput`] if the input is not already canonical.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new random (version 4) record id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an id string that must already be in canonical form.
    ///
    /// This does **not** normalise other common UUID forms (hyphenated or uppercase).
    ///
    /// # Arguments
    ///
    /// * `input` - Id string to validate and wrap. Must be exactly 32 lowercase hex characters.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not in canonical form.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "id must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(e.to_string()))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is in canonical form.
    ///
    /// Purely syntactic: exactly 32 bytes, only `0-9` and `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are derived from this id.
    ///
    /// - `s1` is the first two hex characters of the id
    /// - `s2` is the next two hex characters
    /// - The full id forms the leaf directory
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Human-readable appointment reference.
///
/// Format: `APT` + two-digit year + zero-padded month + zero-padded day + 4 random digits.
///
/// Example: `APT2610160427` for a booking created on 2026-10-16.
///
/// Uniqueness comes from the random suffix only; callers that need a guarantee must check the
/// candidate against existing ids and regenerate on collision.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BookingId(String);

impl BookingId {
    /// Literal prefix of every booking id.
    pub const PREFIX: &'static str = "APT";

    const LEN: usize = 13;

    /// Generates a booking id for a booking created on `created_on`.
    pub fn generate(created_on: NaiveDate, rng: &mut impl Rng) -> Self {
        let suffix: u16 = rng.gen_range(0..10_000);
        Self(format!(
            "{}{:02}{:02}{:02}{:04}",
            Self::PREFIX,
            created_on.year().rem_euclid(100),
            created_on.month(),
            created_on.day(),
            suffix
        ))
    }

    /// Validates an existing booking id string.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] unless `input` is `APT` followed by 10 ASCII digits
    /// whose month and day portions are plausible.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let invalid = || UuidError::InvalidInput(format!("invalid booking id: '{}'", input));

        let digits = input.strip_prefix(Self::PREFIX).ok_or_else(invalid)?;
        if input.len() != Self::LEN || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let month: u32 = digits[2..4].parse().map_err(|_| invalid())?;
        let day: u32 = digits[4..6].parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(invalid());
        }

        Ok(Self(input.to_owned()))
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for BookingId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for BookingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        BookingId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A SHA-256 digest rendered as 64 lowercase hex characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Builds the hex form of a raw 32-byte digest.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Validates a hex digest supplied from outside (for example a URL segment).
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] unless `input` is 64 lowercase hex characters.
    pub fn parse(input: &str) -> UuidResult<Self> {
        let ok = input.len() == 64
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !ok {
            return Err(UuidError::InvalidInput(format!(
                "hash must be 64 lowercase hex characters, got: '{}'",
                input
            )));
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the digest as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Sha256Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Sha256Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Sha256Hash::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        let canonical = id.to_string();

        assert_eq!(canonical.len(), 32);
        assert!(RecordId::is_canonical(&canonical));
    }

    #[test]
    fn test_parse_rejects_hyphenated_uuid() {
        let hyphenated = "550e8400-e29b-41d4-a716-446655440000";
        match RecordId::parse(hyphenated) {
            Err(UuidError::InvalidInput(msg)) => {
                assert!(msg.contains("32 lowercase hex characters"));
            }
            _ => panic!("Expected InvalidInput error"),
        }
    }

    #[test]
    fn test_parse_rejects_uppercase() {
        assert!(RecordId::parse("550E8400E29B41D4A716446655440000").is_err());
    }

    #[test]
    fn test_sharded_dir_layout() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").expect("canonical id");
        let dir = id.sharded_dir(Path::new("/data/appointments"));

        assert_eq!(
            dir,
            PathBuf::from("/data/appointments/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_booking_id_embeds_creation_date() {
        let mut rng = StdRng::seed_from_u64(7);
        let date = NaiveDate::from_ymd_opt(2026, 3, 9).expect("valid date");

        let id = BookingId::generate(date, &mut rng);
        let s = id.as_str();

        assert_eq!(s.len(), 13);
        assert!(s.starts_with("APT260309"), "unexpected booking id {s}");
        assert!(s[9..].bytes().all(|b| b.is_ascii_digit()));
        BookingId::parse(s).expect("generated id should parse");
    }

    #[test]
    fn test_booking_id_parse_rejects_bad_shapes() {
        for bad in [
            "APT26030912",
            "XYZ2603091234",
            "APT26130912 4",
            "APT2613091234",
            "APT2603001234",
        ] {
            assert!(BookingId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_sha256_hash_round_trips_bytes() {
        let hash = Sha256Hash::from_bytes(&[0xab; 32]);
        assert_eq!(hash.as_str().len(), 64);
        assert!(hash.as_str().starts_with("abab"));
        assert_eq!(Sha256Hash::parse(hash.as_str()).expect("valid hash"), hash);
    }

    #[test]
    fn test_record_id_serde_uses_canonical_form() {
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").expect("canonical id");
        let json = serde_json::to_string(&id).expect("serialise");
        assert_eq!(json, "\"550e8400e29b41d4a716446655440000\"");

        let back: RecordId = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back, id);
    }
}
