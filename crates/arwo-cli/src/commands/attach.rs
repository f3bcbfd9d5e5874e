//! `arwo attach` - attach a file to an existing work order.

use std::path::{Path, PathBuf};

use arwo_core::{AttachmentRequest, OperationOutcome, WorkOrderClient};
use clap::Args;

use super::{Runtime, emit_failure, emit_outcome, exit_codes, load_runtime, read_fields};

/// Arguments for `arwo attach`.
#[derive(Debug, Args)]
pub struct AttachArgs {
    /// Public id of the work order (for example WO0000000042)
    pub work_order: String,

    /// File to attach
    pub file: PathBuf,

    /// Optional JSON file with extra work-info fields, shaped
    /// {"values": {...}}
    #[arg(long)]
    pub fields_file: Option<PathBuf>,
}

/// Attaches a file to a work order addressed by its public id.
pub fn run(config_path: &Path, json: bool, args: &AttachArgs) -> u8 {
    let fields = match &args.fields_file {
        Some(path) => match read_fields(path) {
            Ok(fields) => fields,
            Err(error) => {
                emit_failure(json, &format!("{error:#}"));
                return exit_codes::INVALID_INPUT;
            },
        },
        None => serde_json::json!({}),
    };
    // Read the file once; retried attempts reuse the same bytes.
    let attachment = match AttachmentRequest::read_from(&args.file, fields) {
        Ok(attachment) => attachment,
        Err(error) => {
            emit_failure(json, &format!("cannot read {}: {error}", args.file.display()));
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
    let result = orchestrator.run("attach", &config, &mut diagnostics, || {
        client.attach(&config, &args.work_order, &attachment)
    });
    match result {
        Ok(()) => {
            let message = format!("{} attached to {}", attachment.file_name, args.work_order);
            emit_outcome(json, &OperationOutcome::changed(message));
            exit_codes::SUCCESS
        },
        Err(error) => {
            emit_failure(json, &error.to_string());
            exit_codes::ERROR
        },
    }
}
