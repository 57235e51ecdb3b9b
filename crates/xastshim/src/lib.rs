//! The command line driver for `xastshim_ast`.
pub mod args;
pub mod config;
mod fs;
