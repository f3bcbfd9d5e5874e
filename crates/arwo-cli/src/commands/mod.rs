//! Command implementations for the `arwo` binary.
//!
//! Every command follows the same shape: read its input, wire the shared
//! runtime, drive one operation through the retry orchestrator, and
//! report the outcome in text or JSON.
//!
//! # Exit Codes
//!
//! - 0: success
//! - 1: the operation failed (including an exhausted retry budget)
//! - 2: invalid configuration or input

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arwo_core::{
    AuthSession, Diagnostics, HttpTransport, OperationOutcome, RemedyConfig, RetryOrchestrator,
    TokenStore, Transport,
};

pub mod attach;
pub mod categories;
pub mod create;
pub mod modify;
pub mod support_group;

pub use attach::AttachArgs;
pub use categories::CategoriesArgs;
pub use create::CreateArgs;
pub use modify::ModifyArgs;
pub use support_group::SupportGroupArgs;

/// Exit codes shared by every command.
pub mod exit_codes {
    /// Success.
    pub const SUCCESS: u8 = 0;
    /// The operation failed.
    pub const ERROR: u8 = 1;
    /// Invalid configuration or input.
    pub const INVALID_INPUT: u8 = 2;
}

/// Per-invocation state: the loaded configuration plus the wired clients.
pub(crate) struct Runtime {
    pub(crate) config: RemedyConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) store: TokenStore,
    pub(crate) orchestrator: RetryOrchestrator,
    pub(crate) diagnostics: Diagnostics,
}

/// Loads configuration and wires the shared clients.
pub(crate) fn load_runtime(config_path: &Path) -> Result<Runtime> {
    let config = RemedyConfig::from_file(config_path)
        .with_context(|| format!("cannot load configuration from {}", config_path.display()))?;
    tracing::debug!(user = %config.user, api_base = %config.api_base, "configuration loaded");

    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new().context("cannot build HTTP client")?);
    let store = TokenStore::new(&config.credential_dir);
    let session = AuthSession::new(transport.clone(), store.clone());
    Ok(Runtime {
        config,
        transport,
        store,
        orchestrator: RetryOrchestrator::new(session),
        diagnostics: Diagnostics::new(),
    })
}

/// Reads and parses a JSON fields file.
pub(crate) fn read_fields(path: &Path) -> Result<serde_json::Value> {
    let bytes =
        std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not valid JSON", path.display()))
}

/// Prints a successful outcome in the selected format.
pub(crate) fn emit_outcome(json: bool, outcome: &OperationOutcome) {
    if json {
        match serde_json::to_string_pretty(outcome) {
            Ok(text) => println!("{text}"),
            Err(_) => println!("{}", outcome.message),
        }
        return;
    }
    println!("{}", outcome.message);
    if let Some(resolution) = &outcome.resolution {
        match &resolution.default {
            Some(candidate) => println!(
                "  Default:    {} ({})",
                candidate.assigned_group, candidate.categorization_tier_3
            ),
            None => println!("  Default:    none"),
        }
        for candidate in &resolution.candidates {
            println!(
                "  Candidate:  {} / {} / {} -> {}",
                candidate.categorization_tier_1,
                candidate.categorization_tier_2,
                candidate.categorization_tier_3,
                candidate.assigned_group
            );
        }
    }
}

/// Prints a failure in the selected format.
pub(crate) fn emit_failure(json: bool, message: &str) {
    if json {
        let report = serde_json::json!({ "changed": false, "error": message });
        eprintln!("{report}");
    } else {
        eprintln!("Error: {message}");
    }
}
