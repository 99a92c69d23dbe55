//! Identifier types.
//!
//! Every id in the engine is a small `Copy` newtype over an integer, so
//! ids can be used directly as graph nodes and ordered-set keys. Static
//! data ids (`AttrId`, `TypeId`, `EffectId`, `GroupId`) come from the
//! catalog; `HolderId`s are handed out by a [`Fit`](crate::Fit).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty), $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl $name {
            /// Get the raw numeric value.
            pub const fn get(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Attribute identifier (e.g. power output, CPU usage).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fitcalc::AttrId;
    ///
    /// let cpu = AttrId(50);
    /// assert_eq!(cpu.get(), 50);
    /// assert_eq!(cpu.to_string(), "attr:50");
    /// ```
    AttrId(u32),
    "attr:"
);

id_type!(
    /// Item type identifier. Skills are item types too, so prerequisite
    /// skills are referenced by `TypeId`.
    TypeId(u32),
    "type:"
);

id_type!(
    /// Effect identifier.
    EffectId(u32),
    "effect:"
);

id_type!(
    /// Item group identifier, used by group-filtered modifiers.
    GroupId(u32),
    "group:"
);

id_type!(
    /// Identity of a holder inside one fit. Never reused within that fit.
    HolderId(u64),
    "holder#"
);

/// A single attribute of a single holder: the unit of caching.
///
/// # Examples
///
/// ```rust
/// use fitcalc::{AttrId, AttrNode, HolderId};
///
/// let node = AttrNode::new(HolderId(3), AttrId(30));
/// assert_eq!(node.to_string(), "holder#3.attr:30");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttrNode {
    /// Holder owning the value.
    pub holder: HolderId,
    /// Attribute of that holder.
    pub attr: AttrId,
}

impl AttrNode {
    /// Create a new attribute node.
    pub const fn new(holder: HolderId, attr: AttrId) -> Self {
        Self { holder, attr }
    }
}

impl fmt::Display for AttrNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.holder, self.attr)
    }
}
