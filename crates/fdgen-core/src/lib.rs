//! Core types for form-data synthesis.
//!
//! Provides the source model ([`model::SourceNode`]), the synthesized output tree
//! ([`output::OutputNode`]), the validation rule table, type expressions, the
//! error taxonomy, configuration and model-file persistence.

pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod rules;
pub mod schema;
pub mod storage;
pub mod types;
