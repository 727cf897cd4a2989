//! Task identifier generation.
//!
//! Format: 3 random base-36 characters followed by 6 base-36 characters of
//! seconds since 2020-01-01 UTC, e.g. `k3f0qz9ma`. The random part comes
//! first so tasks created moments apart do not share a prefix; the time part
//! keeps a rough chronological order for anyone reading the suffix.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Length of the random component.
pub const RANDOM_LEN: usize = 3;

/// Length of the time-derived component.
pub const TIME_LEN: usize = 6;

/// Total identifier length.
pub const ID_LEN: usize = RANDOM_LEN + TIME_LEN;

/// Collision retries before giving up.
pub const MAX_ATTEMPTS: usize = 100;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Start of the time component (2020-01-01T00:00:00Z).
const EPOCH_SECS: i64 = 1_577_836_800;

static SEED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate an identifier not rejected by `is_taken`.
pub fn generate_id<F>(is_taken: F) -> Result<String>
where
    F: Fn(&str) -> bool,
{
    generate_id_with(is_taken, |attempt| candidate(Utc::now(), attempt))
}

/// Generate an identifier from an explicit candidate source.
///
/// `next_candidate` receives the attempt number; after [`MAX_ATTEMPTS`]
/// rejected candidates this fails with [`Error::IdExhausted`].
pub fn generate_id_with<F, G>(is_taken: F, mut next_candidate: G) -> Result<String>
where
    F: Fn(&str) -> bool,
    G: FnMut(usize) -> String,
{
    for attempt in 0..MAX_ATTEMPTS {
        let id = next_candidate(attempt);
        if !is_taken(&id) {
            return Ok(id);
        }
        tracing::debug!(id = %id, attempt, "identifier collision, retrying");
    }
    Err(Error::IdExhausted(MAX_ATTEMPTS))
}

/// Build one candidate identifier for the given creation time.
pub fn candidate(now: DateTime<Utc>, attempt: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(now.timestamp_nanos_opt().unwrap_or(0).to_le_bytes());
    hasher.update(attempt.to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(SEED_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    let hash = hasher.finalize();

    let mut id = String::with_capacity(ID_LEN);
    for byte in hash.iter().take(RANDOM_LEN) {
        id.push(ALPHABET[*byte as usize % ALPHABET.len()] as char);
    }
    id.push_str(&time_component(now));
    id
}

/// Seconds since 2020-01-01 in base 36, zero-padded to [`TIME_LEN`].
///
/// Wraps around after roughly 69 years so the width never changes.
pub fn time_component(now: DateTime<Utc>) -> String {
    let span = 36u64.pow(TIME_LEN as u32);
    let mut secs = (now.timestamp() - EPOCH_SECS).max(0) as u64 % span;
    let mut digits = [b'0'; TIME_LEN];
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(secs % 36) as usize];
        secs /= 36;
    }
    digits.iter().map(|&b| b as char).collect()
}

/// Creation time encoded in an identifier's suffix, if it has the expected shape.
pub fn created_at(id: &str) -> Option<DateTime<Utc>> {
    if id.len() != ID_LEN || !id.bytes().all(|b| ALPHABET.contains(&b)) {
        return None;
    }
    let secs = u64::from_str_radix(&id[RANDOM_LEN..], 36).ok()?;
    Utc.timestamp_opt(EPOCH_SECS + secs as i64, 0).single()
}
