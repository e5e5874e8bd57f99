pub mod config;
pub mod ingest;
pub mod init;
pub mod list;
pub mod serve;
pub mod solve;
