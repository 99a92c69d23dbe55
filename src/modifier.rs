//! Modifier records.
//!
//! A [`Modifier`] is the normalized form of one rule inside an effect:
//! read `source_attribute` on the item carrying the effect, and apply it
//! with `operator` to `target_attribute` on every holder the
//! `domain`/`filter_type`/`filter_value` triple addresses. Modifiers are
//! produced by an external builder; their shape is a compatibility
//! contract and must not change.

use crate::ids::{AttrId, GroupId, TypeId};
use crate::placement::Location;
use crate::state::{Scope, State};
use serde::{Deserialize, Serialize};

/// How a modifier value is combined into the target attribute.
///
/// Operators are grouped into [`Stage`]s; stages run in a fixed order no
/// matter in which order modifiers were discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// Replace the running value.
    PreAssign,
    /// Multiply before flat additions.
    PreMul,
    /// Divide before flat additions.
    PreDiv,
    /// Add a flat amount.
    ModAdd,
    /// Subtract a flat amount.
    ModSub,
    /// Multiply after flat additions.
    PostMul,
    /// Divide after flat additions.
    PostDiv,
    /// Scale by `1 + value / 100` after everything else.
    PostPercent,
}

impl Operator {
    /// The stage this operator is applied in.
    pub fn stage(self) -> Stage {
        match self {
            Operator::PreAssign => Stage::PreAssign,
            Operator::PreMul | Operator::PreDiv => Stage::PreMul,
            Operator::ModAdd | Operator::ModSub => Stage::Additive,
            Operator::PostMul | Operator::PostDiv => Stage::PostMul,
            Operator::PostPercent => Stage::PostPercent,
        }
    }

    /// Whether contributions with this operator take part in the stacking
    /// penalty on non-stackable attributes. Assignments and flat
    /// additions never do.
    pub fn is_penalizable(self) -> bool {
        matches!(
            self,
            Operator::PreMul
                | Operator::PreDiv
                | Operator::PostMul
                | Operator::PostDiv
                | Operator::PostPercent
        )
    }
}

/// Combination stage. Stages are applied in declaration order.
///
/// # Examples
///
/// ```rust
/// use fitcalc::modifier::{Operator, Stage};
///
/// assert!(Operator::PreDiv.stage() < Operator::ModAdd.stage());
/// assert!(Operator::PostMul.stage() < Operator::PostPercent.stage());
/// assert_eq!(Operator::PostDiv.stage(), Stage::PostMul);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    PreAssign,
    PreMul,
    Additive,
    PostMul,
    PostPercent,
}

impl Stage {
    /// All stages in application order.
    pub const ORDER: [Stage; 5] = [
        Stage::PreAssign,
        Stage::PreMul,
        Stage::Additive,
        Stage::PostMul,
        Stage::PostPercent,
    ];
}

/// Which holders a modifier addresses, before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// The holder carrying the modifier.
    Itself,
    /// The fit's root holder.
    Carrier,
    /// Every non-root holder in the given location group.
    Location(Location),
    /// Every non-root holder in the fit.
    All,
    /// The holder linked to the source: a module's charge or a charge's module.
    Other,
}

/// Narrows a domain down to a subset of its holders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Holders whose item belongs to the group in `filter_value`.
    Group,
    /// Holders whose item requires the skill in `filter_value`.
    Skill,
    /// Holders whose item requires the source item itself as a skill.
    SkillSelf,
}

/// One normalized modification rule.
///
/// # Examples
///
/// ```rust
/// use fitcalc::modifier::{Domain, Modifier, Operator};
/// use fitcalc::{AttrId, GroupId, Location, State};
///
/// // Online: +10% damage to every module of group 55 fitted to the ship.
/// let modifier = Modifier::new(AttrId(20), AttrId(64), Operator::PostPercent)
///     .with_domain(Domain::Location(Location::Ship))
///     .with_filter_group(GroupId(55))
///     .with_state(State::Online);
///
/// assert_eq!(modifier.filter_value, Some(55));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Modifier {
    pub source_attribute: AttrId,
    pub target_attribute: AttrId,
    pub operator: Operator,
    #[serde(default)]
    pub required_state: State,
    pub domain: Domain,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub filter_type: Option<FilterType>,
    #[serde(default)]
    pub filter_value: Option<u32>,
}

impl Modifier {
    /// Create a local, unfiltered modifier on the carrying holder itself,
    /// eligible from `Offline` on.
    pub fn new(source_attribute: AttrId, target_attribute: AttrId, operator: Operator) -> Self {
        Self {
            source_attribute,
            target_attribute,
            operator,
            required_state: State::Offline,
            domain: Domain::Itself,
            scope: Scope::Local,
            filter_type: None,
            filter_value: None,
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.required_state = state;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Restrict to holders whose item is in `group`.
    pub fn with_filter_group(mut self, group: GroupId) -> Self {
        self.filter_type = Some(FilterType::Group);
        self.filter_value = Some(group.get());
        self
    }

    /// Restrict to holders whose item requires `skill`.
    pub fn with_filter_skill(mut self, skill: TypeId) -> Self {
        self.filter_type = Some(FilterType::Skill);
        self.filter_value = Some(skill.get());
        self
    }

    /// Restrict to holders whose item requires the source item.
    pub fn with_filter_skill_self(mut self) -> Self {
        self.filter_type = Some(FilterType::SkillSelf);
        self.filter_value = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_follows_operators() {
        let ops = [
            Operator::PreAssign,
            Operator::PreMul,
            Operator::PreDiv,
            Operator::ModAdd,
            Operator::ModSub,
            Operator::PostMul,
            Operator::PostDiv,
            Operator::PostPercent,
        ];
        for pair in ops.windows(2) {
            assert!(pair[0].stage() <= pair[1].stage());
        }
        assert_eq!(Stage::ORDER.len(), 5);
    }

    #[test]
    fn test_penalizable_operators() {
        assert!(!Operator::PreAssign.is_penalizable());
        assert!(!Operator::ModAdd.is_penalizable());
        assert!(!Operator::ModSub.is_penalizable());
        assert!(Operator::PreMul.is_penalizable());
        assert!(Operator::PostDiv.is_penalizable());
        assert!(Operator::PostPercent.is_penalizable());
    }

    #[test]
    fn test_builder_defaults() {
        let modifier = Modifier::new(AttrId(1), AttrId(2), Operator::ModAdd);
        assert_eq!(modifier.domain, Domain::Itself);
        assert_eq!(modifier.scope, Scope::Local);
        assert_eq!(modifier.required_state, State::Offline);
        assert_eq!(modifier.filter_type, None);
    }

    #[test]
    fn test_filter_builders() {
        let skill = Modifier::new(AttrId(1), AttrId(2), Operator::PostPercent)
            .with_filter_skill(TypeId(3300));
        assert_eq!(skill.filter_type, Some(FilterType::Skill));
        assert_eq!(skill.filter_value, Some(3300));

        let own = skill.with_filter_skill_self();
        assert_eq!(own.filter_type, Some(FilterType::SkillSelf));
        assert_eq!(own.filter_value, None);
    }

    #[test]
    fn test_modifier_from_json() {
        let json = r#"{
            "source_attribute": 20,
            "target_attribute": 64,
            "operator": "post_percent",
            "domain": { "location": "ship" },
            "filter_type": "group",
            "filter_value": 55
        }"#;
        let modifier: Modifier = serde_json::from_str(json).unwrap();
        assert_eq!(modifier.domain, Domain::Location(Location::Ship));
        assert_eq!(modifier.required_state, State::Offline);
        assert_eq!(modifier.scope, Scope::Local);
        assert_eq!(modifier.filter_value, Some(55));
    }
}
