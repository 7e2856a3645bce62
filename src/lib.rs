//! # filedeck
//!
//! Command-line client for a web-based file manager. It lists folders, creates
//! and deletes items, and moves files in both directions through the server's
//! REST API, showing progress with a time-remaining estimate while it does so.
//!
//! ## Architecture
//!
//! The client is built using:
//! - **Reqwest**: HTTP client for the REST API, with streamed request/response bodies
//! - **Tokio**: Async runtime; transfers run strictly one after another
//! - **Serde**: JSON DTOs and machine-readable status output
//! - **Clap**: Command-line interface
//!
//! ## Core Components
//!
//! - [`api`]: REST API client
//! - [`cli`]: Command-line arguments
//! - [`commands`]: Subcommand handlers
//! - [`config`]: Application configuration management
//! - [`error`]: Centralized error handling
//! - [`listing`]: Sorting, view modes and breadcrumb navigation
//! - [`metrics`]: Transfer counters
//! - [`status`]: Rendering of transfer progress
//! - [`transfer`]: Progress tracker, sequential runner and HTTP transports
//! - [`types`]: Data transfer objects and shared type definitions
//!
//! ## Transfers
//!
//! - One item in flight at a time, in the order given
//! - The first failing item aborts the rest of the batch
//! - Percent from bytes, or from completed items when sizes are unknown
//! - ETA from the average throughput since the batch started

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod listing;
pub mod metrics;
pub mod status;
pub mod transfer;
pub mod types;

#[cfg(test)]
mod tests;
