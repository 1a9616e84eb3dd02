//! Dispatch to the external multi-agent analysis pipeline.
//!
//! The pipeline itself lives out of process. This module defines what is
//! sent to it (`DispatchRequest` with a merged `AnalysisConfig`), what comes
//! back (`PipelineResult`), and the `PipelineRunner` implementations that
//! carry the exchange:
//! - `CommandRunner`: JSON over a child process's stdin/stdout
//! - `HttpRunner`: JSON over an HTTP POST

pub mod command;
pub mod http;
pub mod signal;
pub mod types;

pub use command::CommandRunner;
pub use http::HttpRunner;
pub use signal::extract_recommendation;
pub use types::{AnalysisConfig, DispatchRequest, PipelineResult, PipelineRunner};
