//! # strata
//!
//! The Strata application: command-line interface, interactive editing
//! session, configuration and the autosave coordinator.
//!
//! The editing engine itself lives in `strata-core`; this crate adds the
//! async runtime around it.

pub mod autosave;
pub mod cli;
pub mod config;
