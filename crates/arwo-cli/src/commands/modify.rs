//! `arwo modify` - modify an existing work order.

use std::path::{Path, PathBuf};

use arwo_core::{OperationOutcome, WorkOrderClient};
use clap::Args;

use super::{Runtime, emit_failure, emit_outcome, exit_codes, load_runtime, read_fields};

/// Arguments for `arwo modify`.
#[derive(Debug, Args)]
pub struct ModifyArgs {
    /// Public id of the work order (for example WO0000000042)
    pub work_order: String,

    /// JSON file with the fields to change, shaped {"values": {...}}
    pub fields_file: PathBuf,
}

/// Modifies a work order addressed by its public id.
pub fn run(config_path: &Path, json: bool, args: &ModifyArgs) -> u8 {
    let fields = match read_fields(&args.fields_file) {
        Ok(fields) => fields,
        Err(error) => {
            emit_failure(json, &format!("{error:#}"));
            return exit_codes::INVALID_INPUT;
        },
    };
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

    let client = WorkOrderClient::new(transport, store);
    let result = orchestrator.run("modify", &config, &mut diagnostics, || {
        client.modify(&config, &args.work_order, &fields)
    });
    match result {
        Ok(()) => {
            let message = format!("work order {} modified", args.work_order);
            emit_outcome(json, &OperationOutcome::changed(message));
            exit_codes::SUCCESS
        },
        Err(error) => {
            emit_failure(json, &error.to_string());
            exit_codes::ERROR
        },
    }
}
