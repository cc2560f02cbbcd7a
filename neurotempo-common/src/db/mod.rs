//! Database bootstrap helpers

pub mod init;

pub use init::*;
