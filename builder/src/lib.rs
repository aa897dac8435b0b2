//! Exercise content builder.
//!
//! Loads exercise records from a TOML tree, runs each embedded reference
//! solution against its assertions, and emits normalized JSON artifacts only
//! when every assertion passes.
//!
//! - **[`core`]**: Pure logic (records, type descriptors, comparison, lints,
//!   verdicts). No I/O.
//! - **[`io`]**: Filesystem, configuration, and solution execution behind the
//!   [`io::evaluator::Evaluator`] trait.
//!
//! [`pipeline`] and [`validate`] tie the two together for the CLI.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod report;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod validate;
