//! QA service integration.
//!
//! Provides the HTTP client that implements the harness's collaborator
//! contracts against the document QA service, and its wire types.

mod client;
mod wire;

pub use client::QaServiceClient;
