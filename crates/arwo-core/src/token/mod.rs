//! Durable token state shared between independent processes.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`TokenStore`] | One token file per user; read / atomic write / seed |
//! | [`acquire`] | Enter the cross-process refresh critical section |
//! | [`RefreshLockGuard`] | RAII release of the refresh lock marker |
//!
//! The store and the lock are scoped per (credential directory, user), so
//! different users' credentials never contend.

mod lock;
mod store;

pub use lock::{LockAttempt, RefreshLockGuard, RefreshLockHolder, acquire};
pub use store::{Credential, TokenStore};
