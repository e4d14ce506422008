//! CLI module for ghidra-bridge - command-line interface and subcommands.
//!
//! Provides the main entry point with subcommands for single queries, the
//! interactive session, health checks and the tool listing.

pub mod commands;

pub use commands::Cli;
