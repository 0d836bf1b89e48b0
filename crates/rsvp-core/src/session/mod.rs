//! Ephemeral per-phone-number state
//!
//! Conversation state and verification codes live in memory for the
//! lifetime of the process. Both sit on top of [`KeyValueStore`] so the
//! backing map can be swapped without touching callers.

mod kv;
mod state;
mod verification;

pub use kv::{DashMapStore, KeyValueStore};
pub use state::{PendingDeletion, PendingReply, SessionState, SessionStore};
pub use verification::{VerificationEntry, VerificationRegistry, VerifyOutcome, CODE_TTL_HOURS};
