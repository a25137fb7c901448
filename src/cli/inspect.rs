use std::fs;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::error::TestgraftError;
use crate::python::index::{CallableEntry, StructuralIndex};
use crate::python::signature::Signature;

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[arg(value_name = "FILE", help = "Test file to inspect")]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct InspectResponse {
    pub file: PathBuf,
    pub imports: Vec<String>,
    pub classes: Vec<ClassListing>,
    pub functions: Vec<CallableListing>,
}

#[derive(Debug, Serialize)]
pub struct ClassListing {
    pub name: String,
    pub methods: Vec<CallableListing>,
}

#[derive(Debug, Serialize)]
pub struct CallableListing {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    pub signature: Signature,
}

pub fn run_inspect(args: InspectArgs) -> Result<InspectResponse, TestgraftError> {
    let source =
        fs::read_to_string(&args.file).map_err(|source| TestgraftError::io(&args.file, source))?;
    let index = StructuralIndex::build(&source, "target")?;

    let classes = index
        .classes
        .iter()
        .map(|(name, entry)| ClassListing {
            name: name.clone(),
            methods: entry.methods.iter().map(listing).collect(),
        })
        .collect();

    Ok(InspectResponse {
        file: args.file,
        imports: index.imports.iter().cloned().collect(),
        classes,
        functions: index.functions.iter().map(listing).collect(),
    })
}

fn listing((name, entry): (&String, &CallableEntry)) -> CallableListing {
    CallableListing {
        name: name.clone(),
        decorators: entry.decorators.clone(),
        signature: entry.signature.clone(),
    }
}
