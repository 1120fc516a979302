//! ResQ CLI
//!
//! Command-line front end for the ResQ verification harness.

pub mod commands;
pub mod output;
