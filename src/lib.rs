//! # fitcalc - Incremental Attribute Engine for Ship Fits
//!
//! Computes the effective attributes of items assembled into a fit: a
//! carrier (the ship) plus the modules, charges, drones, rigs, skills and
//! implants placed into it. Items project numeric modifications onto each
//! other and onto themselves; the engine provides:
//! - **Lazy** resolution (values are computed on first read)
//! - **Incremental** invalidation (a mutation drops exactly the values it affects)
//! - **Deterministic** combination (fixed stage order, stable affector order)
//! - **Auditable** results (every value carries its breakdown)
//!
//! ## Core Concepts
//!
//! ### Attribute Pipeline
//!
//! ```text
//! [Modifier] → [Affector] → [TargetKey] → [calculator::combine] → [ResolvedAttribute]
//! ```
//!
//! 1. **Modifiers** are the static rules carried by item effects
//! 2. **Affectors** are modifiers bound to a live holder, enabled by its state
//! 3. **Target keys** decide which holders an affector reaches
//! 4. **Combination** applies contributions stage by stage, with the stacking penalty
//! 5. **ResolvedAttribute** holds the final value with full breakdown
//!
//! ### Key Features
//!
//! - **Dependency Graph**: every cached value records what it was computed from
//! - **Cycle Detection**: an attribute depending on itself is reported, not looped on
//! - **State Gating**: effects run only while their holder is in a high enough state
//! - **Volatile Stats**: fit-wide aggregates cached until an explicit settle point
//!
//! ## Example
//!
//! ```rust
//! use fitcalc::modifier::{Domain, Modifier, Operator};
//! use fitcalc::*;
//! use std::sync::Arc;
//!
//! let power_output = AttrId(11);
//! let bonus = AttrId(20);
//!
//! let ship = ItemDefinition::new(TypeId(587), GroupId(25)).with_attribute(power_output, 100.0);
//! let upgrade = ItemDefinition::new(TypeId(1), GroupId(1))
//!     .with_attribute(bonus, 10.0)
//!     .with_effect(Effect::new(EffectId(1), EffectCategory::Passive).with_modifier(
//!         Modifier::new(bonus, power_output, Operator::PostPercent).with_domain(Domain::Carrier),
//!     ));
//!
//! let mut fit = Fit::new(Arc::new(Catalog::new()));
//! let ship = fit.add(Arc::new(ship), Placement::Ship);
//! let module = fit.add(Arc::new(upgrade), Placement::Low);
//!
//! let resolved = fit.resolve(ship, power_output).unwrap();
//! assert!((resolved.value - 110.0).abs() < 1e-9);
//! assert_eq!(resolved.contributions.len(), 1);
//!
//! // Removing the module drops the stale value
//! fit.remove(module).unwrap();
//! assert_eq!(fit.attribute(ship, power_output).unwrap(), 100.0);
//! ```
//!
//! ## Modules
//!
//! - [`ids`] - Identifier types
//! - [`item`] - Static item data and the catalog
//! - [`modifier`] - Modifier records
//! - [`holder`] - Live item instances
//! - [`affector`] - Affectors and target keys
//! - [`calculator`] - Stage-ordered combination and stacking penalty
//! - [`fit`] - The fit and its attribute engine
//! - [`graph`] - Dependency graph management
//! - [`volatile`] - Volatile cache primitive
//! - [`stats`] - Fit-wide statistics
//! - [`error`] - Error types

pub mod affector;
pub mod calculator;
pub mod error;
pub mod fit;
pub mod graph;
pub mod holder;
pub mod ids;
pub mod item;
pub mod modifier;
pub mod placement;
pub mod resolved;
pub mod state;
pub mod stats;
pub mod volatile;

// Re-export main types for convenience
pub use affector::{Affector, TargetKey};
pub use error::{Anomaly, CalcError, CatalogError};
pub use fit::Fit;
pub use holder::{AttributeMap, Holder};
pub use ids::{AttrId, AttrNode, EffectId, GroupId, HolderId, TypeId};
pub use item::{AttributeDef, Catalog, Effect, ItemDefinition};
pub use modifier::{Domain, FilterType, Modifier, Operator};
pub use placement::{Location, Placement};
pub use resolved::ResolvedAttribute;
pub use state::{EffectCategory, Scope, State};
pub use stats::StatTracker;
pub use volatile::{Volatile, VolatileCell};
