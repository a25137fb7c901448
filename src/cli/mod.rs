use clap::{Parser, Subcommand};

pub mod inspect;
pub mod merge;

#[derive(Debug, Parser)]
#[command(name = "testgraft")]
#[command(about = "Structural merging of new test units into existing test files")]
#[command(
    long_about = "Merges newly drafted test functions and classes into an existing Python test file without reformatting it. ADD inserts missing content; APPEND grows existing callables via a qualified-name mapping."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Merge a new test unit into a target test file")]
    Merge(merge::MergeArgs),
    #[command(about = "List the imports, classes, and callables of a test file")]
    Inspect(inspect::InspectArgs),
}
