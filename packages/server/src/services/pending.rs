use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// A converted upload waiting to be attached to a resume.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub user_id: i32,
    /// Image path relative to the upload root.
    pub file_path: String,
    pub file_name: String,
    pub file_type: String,
    pub file_size: i64,
    pub created_at: Instant,
}

/// Why a pending upload could not be claimed.
#[derive(Debug, PartialEq, Eq)]
pub enum ClaimError {
    NotFound,
    NotOwner,
}

/// In-process registry of uploads addressed by `file_key`.
#[derive(Default)]
pub struct PendingUploads {
    entries: DashMap<Uuid, PendingUpload>,
}

impl PendingUploads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an upload and return its key.
    pub fn insert(&self, upload: PendingUpload) -> Uuid {
        let key = Uuid::new_v4();
        self.entries.insert(key, upload);
        key
    }

    /// Atomically remove the upload if it belongs to `user_id`.
    ///
    /// Two concurrent claims of the same key cannot both succeed.
    pub fn claim(&self, key: &Uuid, user_id: i32) -> Result<PendingUpload, ClaimError> {
        match self.entries.remove_if(key, |_, upload| upload.user_id == user_id) {
            Some((_, upload)) => Ok(upload),
            None if self.entries.contains_key(key) => Err(ClaimError::NotOwner),
            None => Err(ClaimError::NotFound),
        }
    }

    /// Put a claimed upload back, e.g. after a failed transaction.
    pub fn restore(&self, key: Uuid, upload: PendingUpload) {
        self.entries.insert(key, upload);
    }

    /// Remove and return every upload older than `ttl`.
    pub fn take_expired(&self, ttl: Duration) -> Vec<PendingUpload> {
        let expired: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| entry.created_at.elapsed() > ttl)
            .map(|entry| *entry.key())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| {
                self.entries
                    .remove_if(&key, |_, upload| upload.created_at.elapsed() > ttl)
                    .map(|(_, upload)| upload)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
