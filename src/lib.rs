//! Trading Chat: conversational front end for a multi-agent analysis pipeline.

pub mod channels;
pub mod config;
pub mod conversation;
pub mod error;
pub mod pipeline;
