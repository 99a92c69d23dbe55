//! Resolved attribute values.
//!
//! Contains the `ResolvedAttribute` type: a computed value together with
//! the breakdown of how it was reached.

use crate::calculator::Contribution;
use crate::error::Anomaly;
use crate::ids::{AttrId, HolderId};
use serde::{Deserialize, Serialize};

/// A computed attribute value with full breakdown information.
///
/// This is what the attribute cache stores. It is plain data: cloning it
/// out of a fit detaches it from later invalidation.
///
/// # Examples
///
/// ```rust
/// use fitcalc::{AttrId, HolderId, ResolvedAttribute};
///
/// let mut resolved = ResolvedAttribute::new(HolderId(1), AttrId(30), 110.0);
/// resolved.base = Some(100.0);
/// resolved.add_step("post-percent", 110.0);
///
/// assert_eq!(resolved.value, 110.0);
/// assert_eq!(resolved.steps.len(), 1);
/// assert!(!resolved.overridden);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedAttribute {
    pub holder: HolderId,
    pub attr: AttrId,

    /// The final value.
    pub value: f64,

    /// Unmodified value from the item definition, if it has one.
    pub base: Option<f64>,

    /// Every modification that reached the attribute, in combination order.
    pub contributions: Vec<Contribution>,

    /// Applied stages.
    ///
    /// Each entry is `(stage_description, value_after_stage)`, in the order
    /// the stages ran.
    pub steps: Vec<(String, f64)>,

    /// Content problems the engine resolved on its own.
    pub anomalies: Vec<Anomaly>,

    /// Whether the value was forced by an override.
    pub overridden: bool,
}

impl ResolvedAttribute {
    pub fn new(holder: HolderId, attr: AttrId, value: f64) -> Self {
        Self {
            holder,
            attr,
            value,
            base: None,
            contributions: Vec::new(),
            steps: Vec::new(),
            anomalies: Vec::new(),
            overridden: false,
        }
    }

    /// A value forced by an override; no computation took place.
    pub fn forced(holder: HolderId, attr: AttrId, value: f64) -> Self {
        let mut resolved = Self::new(holder, attr, value);
        resolved.overridden = true;
        resolved.add_step("override", value);
        resolved
    }

    /// Record a stage and the value after it.
    pub fn add_step(&mut self, description: impl Into<String>, value: f64) {
        self.steps.push((description.into(), value));
    }

    /// Whether any modification reached the attribute.
    pub fn is_modified(&self) -> bool {
        !self.contributions.is_empty()
    }
}
