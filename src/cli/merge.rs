use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use tracing::info;

use crate::error::TestgraftError;
use crate::identity::CallableIdentity;
use crate::merge::{Mapping, MergeMode, merge};

#[derive(Debug, Args)]
pub struct MergeArgs {
    #[arg(value_name = "NEW", help = "File holding the new test unit")]
    pub new_unit: PathBuf,
    #[arg(value_name = "EXISTING", help = "Target test file to merge into")]
    pub existing: PathBuf,
    #[arg(
        long,
        value_name = "MODE",
        default_value = "add",
        help = "Merge mode (add|append|fold, case-insensitive)"
    )]
    pub mode: String,
    #[arg(
        long = "map",
        value_name = "FILE",
        help = "JSON object mapping new qualified names to existing ones (append mode)"
    )]
    pub map_file: Option<PathBuf>,
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Write merged text here instead of overwriting EXISTING"
    )]
    pub output: Option<PathBuf>,
    #[arg(long, help = "Print the merged text without writing any file")]
    pub dry_run: bool,
    #[arg(long, help = "Emit structured JSON output")]
    pub json: bool,
}

#[derive(Debug, Serialize)]
pub struct MergeResponse {
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<String>,
    pub merged_callables: Vec<CallableIdentity>,
    pub warnings: Vec<String>,
}

pub enum MergeCommandOutput {
    Text(String),
    Json(MergeResponse),
}

pub fn run_merge(args: MergeArgs) -> Result<MergeCommandOutput, TestgraftError> {
    let mapping = args.map_file.as_deref().map(load_mapping).transpose()?;
    // mode problems (unknown mode, append without a mapping) surface before
    // either source file is read
    let mode = MergeMode::resolve(&args.mode, mapping.as_ref())?;

    let new_unit_src = read_source(&args.new_unit)?;
    let target_src = read_source(&args.existing)?;

    let outcome = merge(&new_unit_src, &target_src, mode)?;

    let destination = if args.dry_run {
        None
    } else {
        let path = args.output.clone().unwrap_or_else(|| args.existing.clone());
        fs::write(&path, &outcome.merged).map_err(|source| TestgraftError::OutputWrite {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "merged output written");
        Some(path)
    };

    let mut merged_callables: Vec<CallableIdentity> =
        outcome.merged_callables.into_iter().collect();
    merged_callables.sort();
    let warnings: Vec<String> = outcome
        .warnings
        .iter()
        .map(ToString::to_string)
        .collect();

    if args.json {
        return Ok(MergeCommandOutput::Json(MergeResponse {
            output: destination,
            dry_run: args.dry_run,
            merged: args.dry_run.then_some(outcome.merged),
            merged_callables,
            warnings,
        }));
    }

    // a dry run in text mode shows the merged text itself
    if args.dry_run {
        return Ok(MergeCommandOutput::Text(
            outcome.merged.trim_end().to_string(),
        ));
    }

    let mut report = String::new();
    if let Some(path) = &destination {
        report.push_str(&format!("merged into {}\n", path.display()));
    }
    if merged_callables.is_empty() {
        report.push_str("no callables merged\n");
    } else {
        report.push_str("merged callables:\n");
        for identity in &merged_callables {
            report.push_str(&format!("  {identity}\n"));
        }
    }
    for warning in &warnings {
        report.push_str(&format!("warning: {warning}\n"));
    }
    Ok(MergeCommandOutput::Text(report.trim_end().to_string()))
}

fn read_source(path: &Path) -> Result<String, TestgraftError> {
    fs::read_to_string(path).map_err(|source| TestgraftError::io(path, source))
}

fn load_mapping(path: &Path) -> Result<Mapping, TestgraftError> {
    let raw = read_source(path)?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| TestgraftError::InvalidMapFile {
            path: path.display().to_string(),
            source,
        })?;

    let serde_json::Value::Object(entries) = value else {
        return Err(TestgraftError::MapFileShape {
            path: path.display().to_string(),
        });
    };

    let mut mapping = Mapping::new();
    for (key, value) in entries {
        let serde_json::Value::String(target) = value else {
            return Err(TestgraftError::MapFileShape {
                path: path.display().to_string(),
            });
        };
        mapping.insert(key, target);
    }
    Ok(mapping)
}
