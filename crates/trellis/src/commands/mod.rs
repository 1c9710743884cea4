//! Command implementations that do more than call the store.

pub mod init;
