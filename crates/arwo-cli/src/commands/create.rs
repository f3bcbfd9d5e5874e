//! `arwo create` - create a work order.

use std::path::{Path, PathBuf};

use arwo_core::{OperationOutcome, WorkOrderClient};
use clap::Args;

use super::{Runtime, emit_failure, emit_outcome, exit_codes, load_runtime, read_fields};

/// Arguments for `arwo create`.
#[derive(Debug, Args)]
pub struct CreateArgs {
    /// JSON file with the work-order fields, shaped {"values": {...}}
    pub fields_file: PathBuf,
}

/// Creates a work order and reports its public id.
pub fn run(config_path: &Path, json: bool, args: &CreateArgs) -> u8 {
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
    let result = orchestrator.run("create", &config, &mut diagnostics, || {
        client.create(&config, &fields)
    });
    match result {
        Ok(public_id) => {
            emit_outcome(json, &OperationOutcome::changed(public_id));
            exit_codes::SUCCESS
        },
        Err(error) => {
            emit_failure(json, &error.to_string());
            exit_codes::ERROR
        },
    }
}
