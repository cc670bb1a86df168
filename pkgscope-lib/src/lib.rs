#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for pkgscope
//!
//! pkgscope answers questions about npm packages by fanning out to several
//! public services and folding their answers into one response. Every upstream
//! may fail on its own; a failure is reported next to the data it would have
//! provided instead of failing the whole request.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface, configuration, and server startup
//! - [`facts`]: Resilient HTTP client, upstream gateways, and the aggregation collector
//! - [`downloads`]: Download time-bucketing over daily series
//! - [`service`]: HTTP routes and middleware

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

#[cfg(any(debug_assertions, test))]
pub mod downloads;
#[cfg(not(any(debug_assertions, test)))]
mod downloads;

#[cfg(any(debug_assertions, test))]
pub mod facts;
#[cfg(not(any(debug_assertions, test)))]
mod facts;

#[cfg(any(debug_assertions, test))]
pub mod service;
#[cfg(not(any(debug_assertions, test)))]
mod service;

pub use crate::commands::{Host, run};
