//! CLI command implementations.

pub mod init_config;
pub mod run;
pub mod status;
