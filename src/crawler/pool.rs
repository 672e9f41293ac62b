//! Credential pool with per-credential availability tracking
//!
//! Each queue owns one pool built from the configured bearer tokens. A
//! credential's `available_at` is moved optimistically to the dispatch
//! instant when a task is handed out, and authoritatively to the reported
//! reset time when a call comes back throttled.

use crate::MagpieError;
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

/// An opaque authorization handle
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    id: usize,
    bearer: String,
}

impl Credential {
    pub fn new(id: usize, bearer: impl Into<String>) -> Self {
        Self {
            id,
            bearer: bearer.into(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn bearer(&self) -> &str {
        &self.bearer
    }
}

// The bearer token must not end up in logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").field("id", &self.id).finish()
    }
}

#[derive(Debug)]
struct Entry {
    credential: Credential,
    available_at: Instant,
}

/// A set of credentials ordered by their next-available time
///
/// Never empty after construction; no credentials are added or removed
/// during a run.
#[derive(Debug)]
pub struct CredentialPool {
    entries: Mutex<Vec<Entry>>,
}

impl CredentialPool {
    /// Builds a pool from bearer tokens, all immediately available
    pub fn new<I, S>(bearers: I) -> Result<Self, MagpieError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Instant::now();
        let entries: Vec<Entry> = bearers
            .into_iter()
            .enumerate()
            .map(|(id, bearer)| Entry {
                credential: Credential::new(id, bearer),
                available_at: now,
            })
            .collect();

        if entries.is_empty() {
            return Err(MagpieError::EmptyPool);
        }

        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Returns the credential with the smallest `available_at`, and that
    /// instant
    pub fn earliest(&self) -> (Credential, Instant) {
        let entries = self.entries.lock().unwrap();
        let entry = entries
            .iter()
            .min_by_key(|e| (e.available_at, e.credential.id))
            .expect("pool is never empty after construction");
        (entry.credential.clone(), entry.available_at)
    }

    /// Overwrites one credential's next-available time
    pub fn set_available_at(&self, credential: &Credential, at: Instant) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.credential.id == credential.id());
        debug_assert!(entry.is_some(), "credential not in this pool");
        if let Some(entry) = entry {
            entry.available_at = at;
        }
    }

    /// True iff some credential is usable at `now`
    pub fn is_any_ready(&self, now: Instant) -> bool {
        self.earliest().1 <= now
    }

    /// The earliest next-available instant across all credentials
    pub fn next_available_at(&self) -> Instant {
        self.earliest().1
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}
