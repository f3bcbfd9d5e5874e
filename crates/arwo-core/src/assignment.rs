//! Support-group assignment lookup and default-category selection.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::RemedyConfig;
use crate::endpoints::{self, ASSIGNMENT_FORM, PEOPLE_FORM, SUPPORT_GROUP_FORM};
use crate::error::RemedyError;
use crate::session;
use crate::token::TokenStore;
use crate::transport::{ApiRequest, Method, Transport};
use crate::types::EntryList;

/// Marker that identifies a company's generic user record by full name.
pub const GENERIC_USER_MARKER: &str = "GENERICO";

/// One assignable support-group row, joined with the company's generic
/// user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentCandidate {
    /// Submitter recorded on the assignment row.
    #[serde(rename = "Submitter", default)]
    pub submitter: String,

    /// Company the assignment row belongs to.
    #[serde(rename = "Company", default)]
    pub company: String,

    /// Organization that owns the support group.
    #[serde(rename = "Support Organization", default)]
    pub support_organization: String,

    /// Top categorization tier.
    #[serde(rename = "Categorization Tier 1", default)]
    pub categorization_tier_1: String,

    /// Middle categorization tier.
    #[serde(rename = "Categorization Tier 2", default)]
    pub categorization_tier_2: String,

    /// Bottom categorization tier; matched against the requested
    /// technology during default selection.
    #[serde(rename = "Categorization Tier 3", default)]
    pub categorization_tier_3: String,

    /// Internal id of the support group.
    #[serde(rename = "Support Group ID", default)]
    pub support_group_id: String,

    /// Display name of the assigned group.
    #[serde(rename = "Assigned Group", default)]
    pub assigned_group: String,

    /// Company that staffs the support group.
    #[serde(rename = "Support Company", default)]
    pub support_company: String,

    /// Person id of the generic user, merged from the people lookup.
    #[serde(rename = "Person ID", default)]
    pub person_id: String,

    /// Full name of the generic user, merged from the people lookup.
    #[serde(rename = "Full Name", default)]
    pub full_name: String,

    /// First name of the generic user, merged from the people lookup.
    #[serde(rename = "First Name", default)]
    pub first_name: String,

    /// Last name of the generic user, merged from the people lookup.
    #[serde(rename = "Last Name", default)]
    pub last_name: String,
}

/// Outcome of a category resolution: every candidate row in upstream
/// order, plus the selected default (when any row matched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentResolution {
    /// Selected default assignment, if any tier-3 value matched the
    /// requested or fallback technology.
    pub default: Option<AssignmentCandidate>,

    /// All candidate rows, in the order the upstream returned them.
    pub candidates: Vec<AssignmentCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GenericUserValues {
    #[serde(rename = "Person ID", default)]
    person_id: String,
    #[serde(rename = "Full Name", default)]
    full_name: String,
    #[serde(rename = "First Name", default)]
    first_name: String,
    #[serde(rename = "Last Name", default)]
    last_name: String,
}

#[derive(Debug, Deserialize)]
struct SupportGroupValues {
    #[serde(rename = "Support Group ID", default)]
    support_group_id: String,
}

/// Queries assignment candidates for a company and selects a default.
pub struct CategoryResolver {
    transport: Arc<dyn Transport>,
    store: TokenStore,
}

impl CategoryResolver {
    /// Creates a resolver over the given transport and token store.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, store: TokenStore) -> Self {
        Self { transport, store }
    }

    /// Resolves the assignment candidates for `company` and selects a
    /// default by technology.
    ///
    /// The assignment table is queried first and any upstream failure
    /// aborts the whole resolution. Every company is required to have a
    /// generic user record (full name containing
    /// [`GENERIC_USER_MARKER`]); the first such record supplies the
    /// identity fields merged into every candidate. Default selection
    /// scans the candidates in upstream order and keeps the last row
    /// whose tier-3 value contains `technology`, falling back to the
    /// last row containing `default_technology`, else no default.
    ///
    /// # Errors
    ///
    /// Returns [`RemedyError::NotFound`] when the generic user record is
    /// absent, and [`RemedyError::Api`] when either lookup fails
    /// upstream.
    pub fn get_categories(
        &self,
        config: &RemedyConfig,
        company: &str,
        technology: &str,
        default_technology: &str,
    ) -> Result<AssignmentResolution, RemedyError> {
        let rows: EntryList<AssignmentCandidate> = self.query(
            config,
            ASSIGNMENT_FORM,
            &endpoints::qualification("Company", company),
            "assignment lookup",
        )?;
        let user = self.generic_user(config, company)?;

        let candidates: Vec<AssignmentCandidate> = rows
            .entries
            .into_iter()
            .map(|entry| {
                let mut candidate = entry.values;
                candidate.person_id = user.person_id.clone();
                candidate.full_name = user.full_name.clone();
                candidate.first_name = user.first_name.clone();
                candidate.last_name = user.last_name.clone();
                candidate
            })
            .collect();

        let default = select_default(&candidates, technology, default_technology);
        Ok(AssignmentResolution {
            default,
            candidates,
        })
    }

    /// Looks up the internal id of a support group by company,
    /// organization, and group name.
    ///
    /// # Errors
    ///
    /// Returns [`RemedyError::NotFound`] when no group matches.
    pub fn support_group_id(
        &self,
        config: &RemedyConfig,
        company: &str,
        organization: &str,
        group_name: &str,
    ) -> Result<String, RemedyError> {
        let qualification = [
            endpoints::qualification("Company", company),
            endpoints::qualification("Support Organization", organization),
            endpoints::qualification("Support Group Name", group_name),
        ]
        .join(" AND ");
        let rows: EntryList<SupportGroupValues> =
            self.query(config, SUPPORT_GROUP_FORM, &qualification, "support group lookup")?;
        let entry = rows.entries.into_iter().next().ok_or_else(|| {
            RemedyError::NotFound {
                what: format!("support group {group_name} ({company} / {organization})"),
            }
        })?;
        Ok(entry.values.support_group_id)
    }

    fn generic_user(
        &self,
        config: &RemedyConfig,
        company: &str,
    ) -> Result<GenericUserValues, RemedyError> {
        let rows: EntryList<GenericUserValues> = self.query(
            config,
            PEOPLE_FORM,
            &endpoints::qualification("Company", company),
            "people lookup",
        )?;
        rows.entries
            .into_iter()
            .map(|entry| entry.values)
            .find(|user| user.full_name.contains(GENERIC_USER_MARKER))
            .ok_or_else(|| RemedyError::NotFound {
                what: format!("generic user for company {company}"),
            })
    }

    fn query<T: serde::de::DeserializeOwned>(
        &self,
        config: &RemedyConfig,
        form: &str,
        qualification: &str,
        context: &str,
    ) -> Result<EntryList<T>, RemedyError> {
        let bearer = session::bearer_value(&self.store, &config.user)?;
        let request = ApiRequest::new(Method::Get, endpoints::entry_url(&config.api_base, form))
            .query("q", qualification)
            .header("Authorization", bearer)
            .timeout(config.request_timeout);

        let response = self.transport.execute(&request)?;
        if response.status != 200 {
            return Err(RemedyError::Api {
                status: response.status,
                body: response.text(),
            });
        }
        response.json().map_err(|error| RemedyError::Parse {
            context: context.to_string(),
            detail: error.to_string(),
        })
    }
}

/// Keeps the last candidate whose tier-3 value contains the requested
/// technology, else the last containing the fallback technology.
fn select_default(
    candidates: &[AssignmentCandidate],
    technology: &str,
    default_technology: &str,
) -> Option<AssignmentCandidate> {
    let mut requested = None;
    let mut fallback = None;
    for candidate in candidates {
        if candidate.categorization_tier_3.contains(technology) {
            requested = Some(candidate);
        }
        if candidate.categorization_tier_3.contains(default_technology) {
            fallback = Some(candidate);
        }
    }
    requested.or(fallback).cloned()
}
