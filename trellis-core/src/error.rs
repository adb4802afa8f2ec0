//! Error and diagnostic types.
//!
//! Nothing in the reactivity core is fatal. Misuse is reported as a
//! [`Diagnostic`] through the warn hook and execution continues; failures
//! raised by subscribers are reported as a [`ReactivityError`] through the
//! error hook so the remaining subscribers still run.

use thiserror::Error;

use crate::reactive::SubscriberId;

/// Boxed error returned by a failing subscriber.
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// Non-fatal usage warnings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    /// `set`/`del` was called on something that cannot hold properties.
    #[error("cannot {op} reactive property on undefined, null, or primitive value: {target}")]
    NonReactiveTarget { op: &'static str, target: String },

    /// A key was added at runtime to a root instance or root-bound state.
    #[error(
        "avoid adding reactive properties to a root instance or its root state at runtime; \
         declare `{key}` upfront"
    )]
    RootAddition { key: String },

    /// A key was deleted at runtime from a root instance or root-bound state.
    #[error("avoid deleting `{key}` from a root instance or its root state; set it to null instead")]
    RootDeletion { key: String },

    /// An array was addressed with a key that is not an index.
    #[error("arrays only accept index keys, got `{key}`")]
    NonIndexArrayKey { key: String },

    /// An array index past the largest length an array may grow to.
    #[error("array index {index} is out of range")]
    IndexOutOfRange { index: usize },

    /// A key was added to an object that no longer accepts new keys.
    #[error("cannot add property `{key}`: object is not extensible")]
    NonExtensibleTarget { key: String },

    /// Raised by host code, typically from a custom setter hook.
    #[error("{0}")]
    Custom(String),
}

/// Errors reported through the host error channel.
#[derive(Debug, Error)]
pub enum ReactivityError {
    #[error("invalid reactivity config: {0}")]
    Config(#[from] serde_json::Error),

    #[error("subscriber {subscriber} failed during update: {source}")]
    SubscriberFailed {
        subscriber: SubscriberId,
        #[source]
        source: BoxError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_render_their_context() {
        let diag = Diagnostic::NonReactiveTarget {
            op: "set",
            target: "undefined".into(),
        };
        assert_eq!(
            diag.to_string(),
            "cannot set reactive property on undefined, null, or primitive value: undefined"
        );

        let diag = Diagnostic::RootAddition { key: "title".into() };
        assert!(diag.to_string().contains("`title`"));
    }

    #[test]
    fn subscriber_failure_keeps_its_source() {
        use std::error::Error as _;

        let err = ReactivityError::SubscriberFailed {
            subscriber: SubscriberId::new(),
            source: "boom".into(),
        };
        assert!(err.to_string().ends_with("boom"));
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
    }
}
