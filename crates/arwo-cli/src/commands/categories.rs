//! `arwo categories` - resolve assignment categories for a company.

use std::path::Path;

use arwo_core::{CategoryResolver, OperationOutcome};
use clap::Args;

use super::{Runtime, emit_failure, emit_outcome, exit_codes, load_runtime};

/// Arguments for `arwo categories`.
#[derive(Debug, Args)]
pub struct CategoriesArgs {
    /// Company whose assignment table is queried
    pub company: String,

    /// Technology to select the default assignment by
    #[arg(long)]
    pub technology: String,

    /// Fallback technology when the requested one matches no row
    #[arg(long, default_value = "OTROS")]
    pub default_technology: String,
}

/// Resolves the assignment candidates and selected default.
pub fn run(config_path: &Path, json: bool, args: &CategoriesArgs) -> u8 {
    let Runtime {
        config,
        transport,
        store,
        orchestrator,
        mut diagnostics,
    } = match load_runtime(config_path) {
        Ok(runtime) => runtime,
        Err(error) => {
            emit_failure(json, &format!("{error:#}"));
            return exit_codes::INVALID_INPUT;
        },
    };

    let resolver = CategoryResolver::new(transport, store);
    let result = orchestrator.run("categories", &config, &mut diagnostics, || {
        resolver.get_categories(
            &config,
            &args.company,
            &args.technology,
            &args.default_technology,
        )
    });
    match result {
        Ok(resolution) => {
            let message = format!(
                "{} assignment candidates for {}",
                resolution.candidates.len(),
                args.company
            );
            emit_outcome(json, &OperationOutcome::with_resolution(message, resolution));
            exit_codes::SUCCESS
        },
        Err(error) => {
            emit_failure(json, &error.to_string());
            exit_codes::ERROR
        },
    }
}
