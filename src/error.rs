//! Error types.
//!
//! Operations on a fit fail with [`CalcError`]. Catalog loading fails
//! with [`CatalogError`]. Content problems the engine resolves on its own
//! are reported as [`Anomaly`] values attached to the resolved attribute
//! instead of failing the read.

use crate::ids::{AttrId, AttrNode, HolderId, TypeId};
use crate::state::State;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[AttrNode]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|node| node.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors returned by fit operations.
///
/// # Examples
///
/// ```rust
/// use fitcalc::{AttrId, CalcError, HolderId};
///
/// let err = CalcError::AttributeUndefined { holder: HolderId(2), attr: AttrId(30) };
/// assert_eq!(err.to_string(), "attribute attr:30 is undefined on holder#2");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    /// A state above the item's ceiling was requested. Nothing was changed.
    #[error("cannot put {holder} into state {requested}: ceiling is {ceiling}")]
    InvalidState {
        holder: HolderId,
        requested: State,
        ceiling: State,
    },

    /// The attribute has no base value and nothing pre-assigns it.
    #[error("attribute {attr} is undefined on {holder}")]
    AttributeUndefined { holder: HolderId, attr: AttrId },

    /// The holder is not part of this fit.
    #[error("unknown holder: {0}")]
    UnknownHolder(HolderId),

    /// The catalog has no item with this type id.
    #[error("unknown item type: {0}")]
    UnknownItem(TypeId),

    /// A charge was loaded into a holder that is not a module.
    #[error("{0} cannot carry a charge")]
    NotAContainer(HolderId),

    /// An attribute transitively depends on itself.
    ///
    /// Contains the resolution path, closed on the repeated node:
    /// `[a, b, a]`.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<AttrNode> },
}

/// Errors raised while building a [`Catalog`](crate::Catalog).
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("malformed catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("item type {0} is defined twice")]
    DuplicateItem(TypeId),

    #[error("attribute {0} is defined twice")]
    DuplicateAttribute(AttrId),
}

/// Advisory content problem, resolved deterministically by the engine.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum Anomaly {
    /// Several pre-assignments target the same attribute; the last one in
    /// affector order won.
    #[error("{count} pre-assignments compete, the one from {winner} applied")]
    CompetingPreAssignments { count: usize, winner: HolderId },

    /// A division by zero was requested and skipped.
    #[error("division by zero from {source_holder} skipped")]
    ZeroDivisor { source_holder: HolderId },

    /// A modifier read a source attribute its holder does not define and
    /// was skipped.
    #[error("modifier from {source_holder} skipped: {attr} is undefined there")]
    UndefinedSource { source_holder: HolderId, attr: AttrId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CalcError::UnknownHolder(HolderId(4));
        assert!(err.to_string().contains("holder#4"));
    }

    #[test]
    fn test_invalid_state_display() {
        let err = CalcError::InvalidState {
            holder: HolderId(1),
            requested: State::Active,
            ceiling: State::Online,
        };
        let display = err.to_string();
        assert!(display.contains("active"));
        assert!(display.contains("online"));
    }

    #[test]
    fn test_cycle_error_display() {
        let a = AttrNode::new(HolderId(1), AttrId(10));
        let b = AttrNode::new(HolderId(1), AttrId(20));
        let err = CalcError::Cycle {
            path: vec![a, b, a],
        };
        let display = err.to_string();
        assert!(display.contains("Cycle detected"));
        assert!(display.contains("holder#1.attr:10 -> holder#1.attr:20 -> holder#1.attr:10"));
    }

    #[test]
    fn test_empty_cycle_display() {
        let err = CalcError::Cycle { path: Vec::new() };
        assert!(err.to_string().contains("(empty cycle)"));
    }

    #[test]
    fn test_anomaly_display() {
        let anomaly = Anomaly::CompetingPreAssignments {
            count: 2,
            winner: HolderId(9),
        };
        assert!(anomaly.to_string().contains("holder#9"));

        let skipped = Anomaly::UndefinedSource {
            source_holder: HolderId(3),
            attr: AttrId(20),
        };
        assert_eq!(
            skipped.to_string(),
            "modifier from holder#3 skipped: attr:20 is undefined there"
        );
    }
}
