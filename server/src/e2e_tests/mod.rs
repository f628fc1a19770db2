//! End-to-end tests from request path to cached deployment.
//!
//! Each test file covers a specific scenario, using counting collaborators to
//! observe how often the record store and builder are consulted.

#![cfg(test)]

mod helpers;

mod test_concurrent_resolve;
mod test_directory_records;
mod test_failures_not_cached;
mod test_resolve_flow;
