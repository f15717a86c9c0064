//! # fdgen-engine
//!
//! Form-data synthesis for declarative form models.
//!
//! Given a root form, its ancestor chain, the reachable templates and the
//! extension declarations aimed at it, the engine builds a tree of
//! transfer-object types that mirrors the form's structure. It includes:
//!
//! - **Resolution**: decide whether each node supersedes an ancestor's node
//!   or introduces a new one
//! - **Rule diffs**: emit only the validation-rule statements that differ
//!   from the inherited state
//! - **Generics**: bind template type parameters along `extends` chains
//! - **Extensions**: compose layered external contributions into members
//! - **Rendering**: print the tree as Java-like source or JSON
//!
//! ## Architecture
//!
//! Generation is split in two phases:
//!
//! 1. [`Generator`] asks a [`TypeModelProvider`] for everything the request
//!    reads and freezes it into a [`ModelSnapshot`]
//! 2. [`synthesize`] turns the snapshot into an [`OutputNode`] without any
//!    further lookups, or fails with no tree at all
//!
//! [`OutputNode`]: fdgen_core::output::OutputNode

pub mod classify;
pub mod extension;
pub mod generator;
pub mod generics;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod rule_diff;
pub mod synthesize;

// Re-export main types for convenience
pub use classify::{Classification, classify};
pub use generator::{Generator, closest_name};
pub use provider::TypeModelProvider;
pub use render::{RenderFormat, RenderOptions, render, render_java, to_json};
pub use resolver::{AncestorIndex, ResolvedEntry, check_chain, resolve};
pub use rule_diff::{RuleDiff, RuleState, compute_rules};
pub use synthesize::{ModelSnapshot, SynthesisOptions, synthesize, synthesize_template};
