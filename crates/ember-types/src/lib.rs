//! Foundation types for Ember.
//!
//! This crate contains the types shared by the shell core and its hosts:
//! the error enum, typed argument values, output lines with their severity,
//! and the shell configuration.

pub mod config;
pub mod error;
pub mod output;
pub mod value;
