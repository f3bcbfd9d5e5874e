//! Public-to-internal work-order id resolution.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::RemedyConfig;
use crate::endpoints::{self, WORK_ORDER_FORM};
use crate::error::RemedyError;
use crate::session;
use crate::token::TokenStore;
use crate::transport::{ApiRequest, Method, Transport};
use crate::types::{EntryList, TicketReference};

#[derive(Debug, Clone, Deserialize)]
struct ResolvedValues {
    #[serde(rename = "Request ID")]
    request_id: String,
}

/// Resolves public work-order ids to the internal entry ids that mutation
/// endpoints require.
pub struct EntryResolver {
    transport: Arc<dyn Transport>,
    store: TokenStore,
}

impl EntryResolver {
    /// Creates a resolver over the given transport and token store.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: TokenStore) -> Self {
        Self { transport, store }
    }

    /// Resolves `public_id` to a [`TicketReference`] carrying the internal
    /// entry id, taken from the first matching record.
    ///
    /// The reference is only valid for the calling operation's scope; the
    /// server may reassign entry ids between calls.
    ///
    /// # Errors
    ///
    /// Returns [`RemedyError::NotFound`] when no record matches and
    /// [`RemedyError::Api`] on upstream error statuses.
    pub fn resolve(
        &self,
        config: &RemedyConfig,
        public_id: &str,
    ) -> Result<TicketReference, RemedyError> {
        let bearer = session::bearer_value(&self.store, &config.user)?;
        let request = ApiRequest::new(
            Method::Get,
            endpoints::entry_url(&config.api_base, WORK_ORDER_FORM),
        )
        .query("q", endpoints::qualification("Work Order ID", public_id))
        .header("Authorization", bearer)
        .timeout(config.request_timeout);

        let response = self.transport.execute(&request)?;
        if response.status != 200 {
            return Err(RemedyError::Api {
                status: response.status,
                body: response.text(),
            });
        }

        let list: EntryList<ResolvedValues> =
            response.json().map_err(|error| RemedyError::Parse {
                context: "work order lookup".to_string(),
                detail: error.to_string(),
            })?;
        let Some(entry) = list.entries.into_iter().next() else {
            return Err(RemedyError::NotFound {
                what: format!("work order {public_id}"),
            });
        };
        Ok(TicketReference {
            public_id: public_id.to_string(),
            internal_id: entry.values.request_id,
        })
    }
}
