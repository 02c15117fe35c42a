//! wasm-serve library
//!
//! Builds a wasm32 cargo target, runs wasm-bindgen over the artifact, and
//! serves the output directory over local HTTP. The binary is a thin clap
//! layer over these modules.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial library structure

pub mod config;
pub mod error;
pub mod invoker;
pub mod output;
pub mod pipeline;
pub mod server;

pub use config::{BuildConfig, BuildProfile, BuildTarget, ServeConfig};
pub use error::{Error, Result};
pub use invoker::{StepOutcome, SystemRunner, ToolRunner};
pub use pipeline::{build_and_prepare, run_build, PipelineReport};
pub use server::{BoundServer, MimeTable, StaticServer};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
