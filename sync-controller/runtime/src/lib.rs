//! Gateway Sync Runtime
//!
//! Drives gateway admin APIs towards a desired-state manifest. Each pass diffs the manifest
//! against the one last applied and pushes the resulting creates, updates and deletes through the
//! cluster's resource clients, ordered so that no object is removed while another still refers to
//! it. Failures are collected per resource rather than aborting the pass.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod admin;
mod args;
mod driver;
pub mod manifest;
mod metrics;
mod sync;


pub use self::{
    admin::Admin,
    args::Args,
    driver::Driver,
    metrics::SyncMetrics,
    sync::{reconcile, sync, Failure, Op, SyncError},
};
