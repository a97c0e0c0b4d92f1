//! Qwen MCP is a Model Context Protocol server that fronts the locally
//! installed Qwen Code CLI.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns configuration and the managed CLI client: availability
//!   probing, single-attempt process invocation, and bounded retry.
//! - [`mcp`] speaks newline-delimited JSON-RPC over stdio and exposes the
//!   fixed tool surface (`ping`, `help`, `ask-qwen`, `sandbox-test`).
//! - [`utils`] resolves `@path` file references into prompt text.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which initializes logging and dispatches
//! into [`mcp::server`] for stdio sessions.

pub mod cli;
pub mod core;
pub mod mcp;
pub mod utils;
