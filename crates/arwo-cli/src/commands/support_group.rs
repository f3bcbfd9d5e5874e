//! `arwo support-group` - look up the internal id of a support group.

use std::path::Path;

use arwo_core::{CategoryResolver, OperationOutcome};
use clap::Args;

use super::{Runtime, emit_failure, emit_outcome, exit_codes, load_runtime};

/// Arguments for `arwo support-group`.
#[derive(Debug, Args)]
pub struct SupportGroupArgs {
    /// Company the group belongs to
    pub company: String,

    /// Support organization within the company
    pub organization: String,

    /// Display name of the support group
    pub group: String,
}

/// Looks up a support group id by company, organization, and name.
pub fn run(config_path: &Path, json: bool, args: &SupportGroupArgs) -> u8 {
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
    let result = orchestrator.run("support-group", &config, &mut diagnostics, || {
        resolver.support_group_id(&config, &args.company, &args.organization, &args.group)
    });
    match result {
        Ok(group_id) => {
            emit_outcome(json, &OperationOutcome::unchanged(group_id));
            exit_codes::SUCCESS
        },
        Err(error) => {
            emit_failure(json, &error.to_string());
            exit_codes::ERROR
        },
    }
}
