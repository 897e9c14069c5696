//! Shared fetch, edit, submit, re-fetch contract
//!
//! Every editor loads its record in full, keeps edits in a local draft, pushes
//! changes back and then reloads the record from the backend instead of
//! patching the draft. The pieces here keep that loop honest:
//!
//! * [`RecordSync`] allows one in-flight mutation per record and numbers every
//!   fetch so a slow, superseded response is never applied.
//! * [`LoadState`] and [`Notice`] are what a view renders.
//! * [`Confirm`] gates destructive calls.

use crate::error::{ClientError, ClientResult};
use kerala_core::{ImageRef, ImageUpload};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::debug;

/// Result of the last load of a record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState<T> {
    /// Nothing fetched yet
    #[default]
    NotLoaded,
    /// Last fetch succeeded
    Loaded(T),
    /// Last fetch failed; holds the message to show
    Failed(String),
}

impl<T> LoadState<T> {
    /// The loaded record, if any
    pub const fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(record) => Some(record),
            _ => None,
        }
    }

    /// The failure message, if the last load failed
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Severity of a [`Notice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// The action went through
    Success,
    /// The action failed
    Error,
}

/// Transient confirmation or alert produced by an action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity
    pub level: NoticeLevel,
    /// Text shown to the user
    pub message: String,
}

impl Notice {
    /// A success notice
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// An error notice
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Error notice for a failed call: the server's message, else `fallback`
    #[must_use]
    pub fn from_failure(err: &ClientError, fallback: &str) -> Self {
        match err {
            ClientError::Core(core) => Self::error(core.to_string()),
            other => Self::error(other.server_message().unwrap_or(fallback)),
        }
    }

    /// Whether this is a success notice
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.level == NoticeLevel::Success
    }
}

/// What happened to a confirmable action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The call was made and succeeded
    Applied(Notice),
    /// The user declined; nothing was sent
    Cancelled,
}

/// Blocking yes/no prompt shown before a destructive call
pub trait Confirm {
    /// Ask the user; `true` means go ahead
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Ticket for one fetch; only the newest ticket may update a draft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Per-record in-flight flag and fetch sequence counter
#[derive(Debug)]
pub struct RecordSync {
    record: &'static str,
    mutating: AtomicBool,
    issued: AtomicU64,
}

impl RecordSync {
    /// Tracker for the named record
    #[must_use]
    pub const fn new(record: &'static str) -> Self {
        Self {
            record,
            mutating: AtomicBool::new(false),
            issued: AtomicU64::new(0),
        }
    }

    /// Claim the record for a mutation
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Busy`] while another mutation holds the guard.
    pub fn begin_mutation(&self) -> ClientResult<MutationGuard<'_>> {
        self.mutating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::busy(self.record))?;

        Ok(MutationGuard { sync: self })
    }

    /// Whether a mutation is in flight
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.mutating.load(Ordering::Acquire)
    }

    /// Number a new fetch
    #[must_use]
    pub fn next_fetch(&self) -> FetchTicket {
        FetchTicket(self.issued.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` belongs to the newest fetch issued
    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        let current = self.issued.load(Ordering::Acquire) == ticket.0;
        if !current {
            debug!(record = self.record, ticket = ticket.0, "Discarding stale response");
        }
        current
    }
}

/// Releases the record when dropped, including on cancellation
#[derive(Debug)]
pub struct MutationGuard<'a> {
    sync: &'a RecordSync,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.sync.mutating.store(false, Ordering::Release);
    }
}

/// Image field of a draft
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageSlot {
    /// No image
    #[default]
    Empty,
    /// The image the backend currently stores
    Stored(ImageRef),
    /// A newly selected file, replacing whatever is stored
    Pending(ImageUpload),
}

impl ImageSlot {
    /// Slot for a stored reference
    #[must_use]
    pub fn from_stored(image: Option<&ImageRef>) -> Self {
        image.map_or(Self::Empty, |image| Self::Stored(image.clone()))
    }

    /// The newly selected file, if any
    #[must_use]
    pub const fn pending(&self) -> Option<&ImageUpload> {
        match self {
            Self::Pending(upload) => Some(upload),
            _ => None,
        }
    }

    /// What a preview shows: the resolved stored URL or the pending file name
    #[must_use]
    pub fn preview(&self, base_url: &str) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Stored(image) => Some(image.resolve(base_url)),
            Self::Pending(upload) => Some(format!("{} (not saved)", upload.file_name())),
        }
    }
}
