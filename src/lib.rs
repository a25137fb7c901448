pub mod buffer;
pub mod cli;
pub mod error;
pub mod identity;
pub mod merge;
pub mod merger;
pub mod python;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
