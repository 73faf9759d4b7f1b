//! CLI module for groundask
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{summary_style, Args, AskArgs, Commands, Verbosity};
