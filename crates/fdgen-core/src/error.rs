//! Structural errors raised while synthesizing a form-data tree.
//!
//! Every variant aborts the whole generation request; callers never receive a
//! partially built tree.

/// A failed generation request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// A same-identity node lacks replace intent, a replace has no unique
    /// target, or a super-type chain is cyclic.
    #[error("replace ambiguity at {path}: {detail}")]
    ReplaceAmbiguity { path: String, detail: String },

    /// An override or extension layer tries to bring back an ignored node.
    #[error("ignore conflict at {path}: {detail}")]
    IgnoreConflict { path: String, detail: String },

    /// A `USE` extension site references a type the model cannot resolve.
    #[error("unresolved external type `{reference}` at extension site {site}")]
    UnresolvedExternalType { site: String, reference: String },

    /// A template's type parameters cannot be bound at a consuming site.
    #[error("generic binding error at {path}: {detail}")]
    GenericBinding { path: String, detail: String },

    /// The requested root form does not exist in the model.
    #[error("unknown form `{identity}`{}", suggestion_suffix(.suggestion))]
    UnknownRoot {
        identity: String,
        suggestion: Option<String>,
    },

    /// The model violates a structural invariant.
    #[error("invalid model at {path}: {detail}")]
    InvalidModel { path: String, detail: String },
}

impl GenerationError {
    pub fn replace_ambiguity(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ReplaceAmbiguity {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn ignore_conflict(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::IgnoreConflict {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn generic_binding(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::GenericBinding {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn invalid_model(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidModel {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Short tag for reporting, stable across releases.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ReplaceAmbiguity { .. } => "replace_ambiguity",
            Self::IgnoreConflict { .. } => "ignore_conflict",
            Self::UnresolvedExternalType { .. } => "unresolved_external_type",
            Self::GenericBinding { .. } => "generic_binding",
            Self::UnknownRoot { .. } => "unknown_root",
            Self::InvalidModel { .. } => "invalid_model",
        }
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean `{s}`?)"))
        .unwrap_or_default()
}
