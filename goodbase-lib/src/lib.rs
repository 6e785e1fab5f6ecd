#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core library for git-co-evg-base
//!
//! This library holds all functionality for the `git co-evg-base` tool, which finds the most
//! recent commit of an Evergreen project whose builds meet a quality bar and moves a local
//! checkout onto it.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and dispatch
//! - [`criteria`]: Build criteria rules and their persisted, named groups
//! - [`evergreen`]: The CI backend port and its Evergreen REST implementation
//! - [`search`]: Build evaluation, revision search, and orchestration
//! - [`vcs`]: The version-control port and its `git` implementation
//! - [`reports`]: Rendering of search results and saved criteria

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

pub mod commands;
pub mod criteria;
pub mod evergreen;
pub mod reports;
pub mod search;
pub mod vcs;

pub use crate::commands::{Host, run};
