//! splmine command implementations, shared by the binary and its tests.

pub mod commands;
pub mod report;

pub use commands::{
    run_dedup, run_explore, run_extract, DedupOutcome, ExploreOutcome, ExtractOptions,
    ExtractOutcome,
};
pub use report::{print_dedup, print_explore, print_summary};
