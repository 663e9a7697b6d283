//! Main test module for gitsnap
//!
//! This module includes all test suites:
//! - Remote-engine tests against an in-memory object store
//! - Local-sync tests driving the real git tooling in scratch repositories
//!
//! Shared fixtures live in `support`.

pub mod support;

pub mod remote_engine;
