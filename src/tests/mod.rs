//! Unit and integration tests for filedeck.
//!
//! ## Test Modules
//!
//! - **tracker_tests**: Byte accounting, percent, throughput and ETA of the tracker
//! - **runner_tests**: Sequencing, fail-fast behaviour and event order of the runner
//! - **http_tests**: Upload/download transports against an in-process mock API
//! - **api_tests**: Listing, folder creation and deletion against the mock API
//! - **listing_tests**: Sorting, rendering and breadcrumb handling
//! - **status_tests**: Duration formatting and status rendering
//! - **error_tests**: Error conversions and input validation
//! - **config_tests**: Configuration loading and validation
//!
//! Individual test modules can be run with:
//! ```bash
//! cargo test tracker_tests
//! ```


pub mod http_tests;
