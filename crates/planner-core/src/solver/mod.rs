//! The external solver boundary: spawning the process and reading its answer.

pub mod extract;
pub mod invoker;

pub use extract::extract;
pub use invoker::{invoke, Invocation, RawOutput, DATASET_ENV, KIND_ENV};
