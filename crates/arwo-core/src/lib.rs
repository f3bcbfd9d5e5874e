//! # arwo-core
//!
//! Client library for driving BMC Remedy work orders over its REST API.
//!
//! Every invocation of this library is expected to be a short-lived
//! process: authenticate from a file-backed token cache, perform one
//! operation (create, modify, attach, or category resolution), and exit.
//! Concurrency therefore means *sibling processes* racing over shared
//! filesystem state, and the design follows from that:
//!
//! - [`TokenStore`] keeps one bearer token per user in a plain file and
//!   re-reads it on every request, so a refresh performed by any sibling
//!   is picked up immediately.
//! - [`AuthSession::refresh`] is a cross-process critical section: a
//!   filesystem lock collapses a refresh storm (N processes all hitting
//!   401 at once) into a single login, with everyone else deferring.
//! - [`RetryOrchestrator`] wraps one operation in a bounded
//!   refresh-and-retry loop with deliberately coarse failure
//!   classification.
//!
//! ## Operations
//!
//! - [`WorkOrderClient`]: create a work order, modify one by public id,
//!   or attach a file via a fixed-boundary multipart upload.
//! - [`CategoryResolver`]: fetch a company's assignment candidates and
//!   select a default by technology, last match winning.
//! - [`EntryResolver`]: translate a public ticket id into the internal
//!   entry id that mutation endpoints require.
//!
//! Outcomes are reported as [`OperationOutcome`] values so any thin
//! wrapper can consume them.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assignment;
pub mod config;
pub mod endpoints;
pub mod entry;
pub mod error;
pub mod report;
pub mod retry;
pub mod session;
pub mod token;
pub mod transport;
pub mod types;
pub mod workorder;

// Re-export main types at crate root for convenience
pub use assignment::{AssignmentCandidate, AssignmentResolution, CategoryResolver};
pub use config::{Diagnostics, RemedyConfig};
pub use entry::EntryResolver;
pub use error::{RemedyError, TokenError, TransportError};
pub use report::OperationOutcome;
pub use retry::RetryOrchestrator;
pub use session::AuthSession;
pub use token::TokenStore;
pub use transport::{HttpTransport, Transport};
pub use types::TicketReference;
pub use workorder::{AttachmentRequest, WorkOrderClient};
