//! Profile store seam: loaded-state queries, deletion, and registry repair.

use crate::sid::Sid;
use crate::types::ProfileRecord;
use thiserror::Error;

/// Failures of a profile store operation, keyed by SID.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Local IO failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Loaded state could not be determined.
    #[error("loaded-state query for {sid} failed: {message}")]
    Query {
        /// Profile SID.
        sid: String,
        /// Underlying failure.
        message: String,
    },

    /// The profile was not deleted.
    #[error("delete of {sid} failed: {message}")]
    Delete {
        /// Profile SID.
        sid: String,
        /// Underlying failure.
        message: String,
    },

    /// Flags, State or `ProfileImagePath` could not be written back.
    #[error("registry repair for {sid} failed: {message}")]
    Repair {
        /// Profile SID.
        sid: String,
        /// Underlying failure.
        message: String,
    },
}

impl StoreError {
    /// A [`StoreError::Query`] for `sid`.
    pub fn query(sid: &Sid, message: impl std::fmt::Display) -> Self {
        Self::Query {
            sid: sid.to_string(),
            message: message.to_string(),
        }
    }

    /// A [`StoreError::Delete`] for `sid`.
    pub fn delete(sid: &Sid, message: impl std::fmt::Display) -> Self {
        Self::Delete {
            sid: sid.to_string(),
            message: message.to_string(),
        }
    }

    /// A [`StoreError::Repair`] for `sid`.
    pub fn repair(sid: &Sid, message: impl std::fmt::Display) -> Self {
        Self::Repair {
            sid: sid.to_string(),
            message: message.to_string(),
        }
    }
}

/// The OS facility that owns profiles.
///
/// `delete` must treat an already-absent profile as success so that an
/// interrupted run can simply be repeated.
pub trait ProfileStore {
    /// Whether the profile is currently loaded (a user is signed in or a
    /// service holds the hive).
    fn is_loaded(&self, sid: &Sid) -> Result<bool, StoreError>;

    /// Delete the profile, its registry key and its folder.
    fn delete(&self, sid: &Sid) -> Result<(), StoreError>;

    /// Re-create `Flags`, `State` and `ProfileImagePath` for `record` so a later
    /// delete can succeed.
    fn repair(&self, record: &ProfileRecord) -> Result<(), StoreError>;
}

impl<T: ProfileStore + ?Sized> ProfileStore for &T {
    fn is_loaded(&self, sid: &Sid) -> Result<bool, StoreError> {
        (**self).is_loaded(sid)
    }

    fn delete(&self, sid: &Sid) -> Result<(), StoreError> {
        (**self).delete(sid)
    }

    fn repair(&self, record: &ProfileRecord) -> Result<(), StoreError> {
        (**self).repair(record)
    }
}
