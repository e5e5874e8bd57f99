pub mod query;
pub mod solve;
pub mod upload;
