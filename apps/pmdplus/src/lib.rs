//! PMD+ core library.
//!
//! Runs the PMD static analyzer over Salesforce Apex and Visualforce
//! sources, parses its CSV report, and publishes per-file diagnostics to a
//! diagnostic store while keeping a three-state status indicator current.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective settings resolution.
//! - `validate`: Settings → validated `RunConfiguration`.
//! - `runner`: PMD subprocess execution with cancellation and buffer limits.
//! - `parser`: PMD CSV report → `DiagnosticBatch`.
//! - `orchestrator`: One analysis run end to end.
//! - `status`, `store`: Status indicator and diagnostic store boundaries.
//! - `ignore`: `.forceignore` matching.
//! - `debounce`, `watch`: Watch mode.
//! - `logging`: Tracing subscriber setup.
//! - `output`: Human/JSON printers.
pub mod cli;
pub mod config;
pub mod debounce;
pub mod error;
pub mod ignore;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod runner;
pub mod status;
pub mod store;
pub mod validate;
pub mod watch;
