//! Shared wire and domain types.

use serde::Deserialize;

/// One record in an AR System entry list response.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry<T> {
    /// The record's field values.
    pub values: T,
}

/// Envelope for `GET /api/arsys/v1/entry/<form>` responses.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryList<T> {
    /// Matching records, in server order. Order is load-bearing for
    /// assignment default selection, which keeps the last matching row.
    #[serde(default = "Vec::new")]
    pub entries: Vec<Entry<T>>,
}

/// A work order addressed by both of its identifiers.
///
/// The internal entry id is resolved on demand and must not be cached
/// beyond one operation's scope: the server may reassign entry ids
/// between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketReference {
    /// Public work-order id (`WO…`) known to external callers.
    pub public_id: String,

    /// Server-assigned entry id required by mutation endpoints.
    pub internal_id: String,
}
