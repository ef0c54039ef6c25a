//! Shared-workspace coordination: the cross-process advisory lock and the
//! polled transcript file that lets multiple instances on one workspace
//! observe each other's output.

pub mod lock;
pub mod transcript;

pub use lock::{acquire_dir_lock, LockGuard};
pub use transcript::{hash_text, watch, TranscriptPoll, TranscriptSync, SYNC_INTERVAL};
