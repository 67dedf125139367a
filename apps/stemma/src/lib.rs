//! # Stemma
//!
//! Command-line front end for `stemma-core`: argument parsing, the
//! `stemma.toml` configuration and tree file I/O.

pub mod cli;
pub mod config;
