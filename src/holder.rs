//! Live item instances.
//!
//! A [`Holder`] is one item placed into a fit. It owns its activation
//! state and its [`AttributeMap`]; everything that touches other holders
//! goes through the [`Fit`](crate::Fit).

use crate::affector::{Affector, DomainKey, FilterKey, TargetKey};
use crate::error::CalcError;
use crate::ids::{AttrId, HolderId, TypeId};
use crate::item::ItemDefinition;
use crate::placement::{Location, Placement};
use crate::resolved::ResolvedAttribute;
use crate::state::{Scope, State};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Cached attribute values and forced overrides of one holder.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    values: HashMap<AttrId, ResolvedAttribute>,
    overrides: BTreeMap<AttrId, f64>,
}

impl AttributeMap {
    /// The cached value of `attr`, if it has been computed and is still
    /// valid.
    pub fn get(&self, attr: AttrId) -> Option<&ResolvedAttribute> {
        self.values.get(&attr)
    }

    pub fn value(&self, attr: AttrId) -> Option<f64> {
        self.values.get(&attr).map(|resolved| resolved.value)
    }

    pub fn contains(&self, attr: AttrId) -> bool {
        self.values.contains_key(&attr)
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Cached attribute ids, ascending.
    pub fn cached(&self) -> Vec<AttrId> {
        let mut attrs: Vec<AttrId> = self.values.keys().copied().collect();
        attrs.sort();
        attrs
    }

    pub fn override_of(&self, attr: AttrId) -> Option<f64> {
        self.overrides.get(&attr).copied()
    }

    pub(crate) fn insert(&mut self, resolved: ResolvedAttribute) {
        self.values.insert(resolved.attr, resolved);
    }

    pub(crate) fn remove(&mut self, attr: AttrId) -> Option<ResolvedAttribute> {
        self.values.remove(&attr)
    }

    pub(crate) fn set_override(&mut self, attr: AttrId, value: f64) -> Option<f64> {
        self.overrides.insert(attr, value)
    }

    pub(crate) fn clear_override(&mut self, attr: AttrId) -> Option<f64> {
        self.overrides.remove(&attr)
    }
}

/// One item placed into a fit.
#[derive(Debug, Clone)]
pub struct Holder {
    id: HolderId,
    item: Arc<ItemDefinition>,
    placement: Placement,
    state: State,
    other: Option<HolderId>,
    attributes: AttributeMap,
}

impl Holder {
    /// A new holder starts `Offline` with an empty cache.
    pub(crate) fn new(id: HolderId, item: Arc<ItemDefinition>, placement: Placement) -> Self {
        Self {
            id,
            item,
            placement,
            state: State::Offline,
            other: None,
            attributes: AttributeMap::default(),
        }
    }

    pub fn id(&self) -> HolderId {
        self.id
    }

    pub fn item(&self) -> &Arc<ItemDefinition> {
        &self.item
    }

    pub fn type_id(&self) -> TypeId {
        self.item.id
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Linked charge (for a module) or container (for a charge).
    pub fn other(&self) -> Option<HolderId> {
        self.other
    }

    pub fn location(&self) -> Option<Location> {
        self.placement.location()
    }

    /// Whether this holder is the fit's carrier.
    pub fn is_root(&self) -> bool {
        self.placement == Placement::Ship
    }

    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut AttributeMap {
        &mut self.attributes
    }

    pub(crate) fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub(crate) fn set_other(&mut self, other: Option<HolderId>) {
        self.other = other;
    }

    /// Check `state` against the item's ceiling.
    pub fn check_state(&self, state: State) -> Result<(), CalcError> {
        let ceiling = self.item.ceiling();
        if state > ceiling {
            return Err(CalcError::InvalidState {
                holder: self.id,
                requested: state,
                ceiling,
            });
        }
        Ok(())
    }

    /// Affectors carried by this holder.
    ///
    /// `states` keeps only affectors whose required state lies in the
    /// range; `scopes` keeps only the listed modifier scopes. `None`
    /// disables the respective filter. An affector requires the higher of
    /// its effect's and its modifier's state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fitcalc::modifier::{Modifier, Operator};
    /// use fitcalc::{AttrId, Catalog, Effect, EffectCategory, EffectId, Fit, GroupId};
    /// use fitcalc::{ItemDefinition, Placement, State};
    /// use std::sync::Arc;
    ///
    /// let item = ItemDefinition::new(fitcalc::TypeId(1), GroupId(1))
    ///     .with_effect(Effect::new(EffectId(1), EffectCategory::Passive)
    ///         .with_modifier(Modifier::new(AttrId(1), AttrId(2), Operator::ModAdd)))
    ///     .with_effect(Effect::new(EffectId(2), EffectCategory::Active)
    ///         .with_modifier(Modifier::new(AttrId(1), AttrId(3), Operator::ModAdd)));
    ///
    /// let mut fit = Fit::new(Arc::new(Catalog::new()));
    /// let id = fit.add(Arc::new(item), Placement::High);
    /// let holder = fit.holder(id).unwrap();
    ///
    /// assert_eq!(holder.affectors(None, None).len(), 2);
    /// let passive = holder.affectors(Some(State::Offline..=State::Online), None);
    /// assert_eq!(passive.len(), 1);
    /// ```
    pub fn affectors(
        &self,
        states: Option<RangeInclusive<State>>,
        scopes: Option<&[Scope]>,
    ) -> BTreeSet<Affector> {
        let mut affectors = BTreeSet::new();
        for effect in &self.item.effects {
            let effect_state = effect.required_state();
            for (index, modifier) in effect.modifiers.iter().enumerate() {
                let state = effect_state.max(modifier.required_state);
                if let Some(range) = &states {
                    if !range.contains(&state) {
                        continue;
                    }
                }
                if let Some(scopes) = scopes {
                    if !scopes.contains(&modifier.scope) {
                        continue;
                    }
                }
                affectors.insert(Affector {
                    source: self.id,
                    effect: effect.id,
                    index,
                    state,
                    modifier: *modifier,
                });
            }
        }
        affectors
    }

    /// Every key this holder answers to, in ascending order.
    pub fn target_keys(&self) -> Vec<TargetKey> {
        let mut domains = vec![DomainKey::Holder(self.id)];
        if self.is_root() {
            domains.push(DomainKey::Carrier);
        } else {
            if let Some(location) = self.location() {
                domains.push(DomainKey::Location(location));
            }
            domains.push(DomainKey::All);
        }

        let mut filters = vec![FilterKey::Any, FilterKey::Group(self.item.group)];
        filters.extend(self.item.required_skills.iter().map(|s| FilterKey::Skill(*s)));

        let mut keys: Vec<TargetKey> = domains
            .iter()
            .flat_map(|d| filters.iter().map(|f| TargetKey::new(*d, *f)))
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{EffectId, GroupId};
    use crate::item::Effect;
    use crate::modifier::{Modifier, Operator};
    use crate::state::EffectCategory;

    fn module() -> Holder {
        let item = ItemDefinition::new(TypeId(10), GroupId(55))
            .with_required_skill(TypeId(3300))
            .with_effect(
                Effect::new(EffectId(1), EffectCategory::Online)
                    .with_modifier(Modifier::new(AttrId(1), AttrId(2), Operator::ModAdd))
                    .with_modifier(
                        Modifier::new(AttrId(1), AttrId(3), Operator::PostMul)
                            .with_state(State::Overloaded),
                    ),
            )
            .with_effect(Effect::new(EffectId(2), EffectCategory::Active).with_modifier(
                Modifier::new(AttrId(1), AttrId(4), Operator::ModAdd).with_scope(Scope::Gang),
            ));
        Holder::new(HolderId(7), Arc::new(item), Placement::Medium)
    }

    #[test]
    fn test_new_holder_is_offline() {
        let holder = module();
        assert_eq!(holder.state(), State::Offline);
        assert!(holder.attributes().is_empty());
        assert_eq!(holder.other(), None);
    }

    #[test]
    fn test_check_state() {
        let holder = module();
        assert!(holder.check_state(State::Active).is_ok());
        let err = holder.check_state(State::Overloaded).unwrap_err();
        assert_eq!(
            err,
            CalcError::InvalidState {
                holder: HolderId(7),
                requested: State::Overloaded,
                ceiling: State::Active,
            }
        );
    }

    #[test]
    fn test_affector_state_is_max_of_effect_and_modifier() {
        let holder = module();
        let states: Vec<State> = holder.affectors(None, None).iter().map(|a| a.state).collect();
        assert_eq!(states, vec![State::Online, State::Overloaded, State::Active]);
    }

    #[test]
    fn test_affector_filters() {
        let holder = module();
        let online = holder.affectors(Some(State::Online..=State::Online), None);
        assert_eq!(online.len(), 1);

        let local = holder.affectors(None, Some(&[Scope::Local]));
        assert_eq!(local.len(), 2);
        assert!(local.iter().all(|a| a.modifier.scope == Scope::Local));
    }

    #[test]
    fn test_target_keys() {
        let keys = module().target_keys();
        // 3 domains x (any, group, one skill)
        assert_eq!(keys.len(), 9);
        assert!(keys.contains(&TargetKey::new(
            DomainKey::Location(Location::Ship),
            FilterKey::Group(GroupId(55))
        )));
        assert!(keys.contains(&TargetKey::new(DomainKey::All, FilterKey::Skill(TypeId(3300)))));
        assert!(!keys.iter().any(|k| k.domain == DomainKey::Carrier));
        assert!(keys.iter().all(|k| k.matches(&module())));
    }

    #[test]
    fn test_root_target_keys() {
        let ship = Holder::new(
            HolderId(1),
            Arc::new(ItemDefinition::new(TypeId(587), GroupId(25))),
            Placement::Ship,
        );
        let keys = ship.target_keys();
        assert_eq!(keys.len(), 4);
        assert!(keys.iter().any(|k| k.domain == DomainKey::Carrier));
        assert!(!keys.iter().any(|k| k.domain == DomainKey::All));
    }

    #[test]
    fn test_attribute_map_overrides() {
        let mut map = AttributeMap::default();
        assert_eq!(map.set_override(AttrId(5), 1.0), None);
        assert_eq!(map.override_of(AttrId(5)), Some(1.0));
        assert_eq!(map.clear_override(AttrId(5)), Some(1.0));
        assert_eq!(map.override_of(AttrId(5)), None);
    }
}
