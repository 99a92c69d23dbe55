//! Static item data.
//!
//! Item definitions, their effects and attribute metadata are immutable
//! once loaded and shared between fits through `Arc`. The [`Catalog`] can
//! be built in code with the builder methods or loaded from JSON.

use crate::error::CatalogError;
use crate::ids::{AttrId, EffectId, GroupId, TypeId};
use crate::modifier::Modifier;
use crate::state::{EffectCategory, State};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn default_stackable() -> bool {
    true
}

/// Metadata of one attribute.
///
/// # Examples
///
/// ```rust
/// use fitcalc::{AttrId, AttributeDef};
///
/// let damage = AttributeDef::new(AttrId(64)).non_stackable();
/// assert!(!damage.stackable);
///
/// let shield = AttributeDef::new(AttrId(264)).with_max_attribute(AttrId(263));
/// assert_eq!(shield.max_attribute, Some(AttrId(263)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttributeDef {
    pub id: AttrId,
    /// `false` puts multiplicative modifications under the stacking penalty.
    #[serde(default = "default_stackable")]
    pub stackable: bool,
    /// Attribute on the same holder that caps this one.
    #[serde(default)]
    pub max_attribute: Option<AttrId>,
}

impl AttributeDef {
    /// Stackable, uncapped attribute. Also what the engine assumes for
    /// attributes the catalog does not describe.
    pub fn new(id: AttrId) -> Self {
        Self {
            id,
            stackable: true,
            max_attribute: None,
        }
    }

    pub fn non_stackable(mut self) -> Self {
        self.stackable = false;
        self
    }

    pub fn with_max_attribute(mut self, cap: AttrId) -> Self {
        self.max_attribute = Some(cap);
        self
    }
}

/// An effect: a category plus the modifiers it applies while running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: EffectId,
    pub category: EffectCategory,
    /// Explicit required state; derived from the category when absent.
    #[serde(default)]
    pub state: Option<State>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

impl Effect {
    pub fn new(id: EffectId, category: EffectCategory) -> Self {
        Self {
            id,
            category,
            state: None,
            modifiers: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// State the carrying holder must reach before this effect runs.
    pub fn required_state(&self) -> State {
        self.state.unwrap_or_else(|| self.category.required_state())
    }
}

/// Immutable definition of one item type.
///
/// # Examples
///
/// ```rust
/// use fitcalc::modifier::{Modifier, Operator};
/// use fitcalc::{AttrId, Effect, EffectCategory, EffectId, GroupId, ItemDefinition, State, TypeId};
///
/// let item = ItemDefinition::new(TypeId(2048), GroupId(60))
///     .with_attribute(AttrId(30), 1.0)
///     .with_effect(
///         Effect::new(EffectId(16), EffectCategory::Online)
///             .with_modifier(Modifier::new(AttrId(20), AttrId(64), Operator::PostPercent)),
///     );
///
/// assert_eq!(item.attribute(AttrId(30)), Some(1.0));
/// assert_eq!(item.ceiling(), State::Online);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub id: TypeId,
    #[serde(default)]
    pub group: GroupId,
    /// Base attribute values.
    #[serde(default)]
    pub attributes: BTreeMap<AttrId, f64>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Explicit activation ceiling; derived from the effects when absent.
    #[serde(default)]
    pub max_state: Option<State>,
    #[serde(default)]
    pub required_skills: BTreeSet<TypeId>,
    #[serde(default)]
    pub volume: Option<f64>,
}

impl ItemDefinition {
    pub fn new(id: TypeId, group: GroupId) -> Self {
        Self {
            id,
            group,
            attributes: BTreeMap::new(),
            effects: Vec::new(),
            max_state: None,
            required_skills: BTreeSet::new(),
            volume: None,
        }
    }

    pub fn with_attribute(mut self, attr: AttrId, value: f64) -> Self {
        self.attributes.insert(attr, value);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_required_skill(mut self, skill: TypeId) -> Self {
        self.required_skills.insert(skill);
        self
    }

    pub fn with_max_state(mut self, state: State) -> Self {
        self.max_state = Some(state);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Unmodified value of an attribute.
    pub fn attribute(&self, attr: AttrId) -> Option<f64> {
        self.attributes.get(&attr).copied()
    }

    /// Highest state a holder of this item may be put into.
    ///
    /// Without an explicit `max_state` this is the highest state any
    /// effect requires, and at least `Offline`.
    pub fn ceiling(&self) -> State {
        self.max_state.unwrap_or_else(|| {
            self.effects
                .iter()
                .map(Effect::required_state)
                .max()
                .unwrap_or(State::Offline)
        })
    }

    pub fn requires_skill(&self, skill: TypeId) -> bool {
        self.required_skills.contains(&skill)
    }
}

#[derive(Deserialize)]
struct CatalogData {
    #[serde(default)]
    attributes: Vec<AttributeDef>,
    #[serde(default)]
    items: Vec<ItemDefinition>,
}

/// Static data shared by every fit built from it.
///
/// # Examples
///
/// ```rust
/// use fitcalc::{AttrId, Catalog, TypeId};
///
/// let catalog = Catalog::from_json(r#"{
///     "attributes": [ { "id": 64, "stackable": false } ],
///     "items": [ { "id": 587, "group": 25, "attributes": { "11": 45.0 } } ]
/// }"#).unwrap();
///
/// assert!(!catalog.attribute(AttrId(64)).stackable);
/// assert_eq!(catalog.item(TypeId(587)).unwrap().attribute(AttrId(11)), Some(45.0));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    attributes: BTreeMap<AttrId, AttributeDef>,
    items: BTreeMap<TypeId, Arc<ItemDefinition>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load attribute metadata and item definitions from JSON.
    ///
    /// The document is an object with optional `attributes` and `items`
    /// arrays. Ids must be unique within each array.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;
        let mut catalog = Catalog::new();
        for def in data.attributes {
            catalog.insert_attribute(def)?;
        }
        for item in data.items {
            catalog.insert_item(item)?;
        }
        Ok(catalog)
    }

    /// Add attribute metadata; fails if the id is already described.
    pub fn insert_attribute(&mut self, def: AttributeDef) -> Result<(), CatalogError> {
        if self.attributes.contains_key(&def.id) {
            return Err(CatalogError::DuplicateAttribute(def.id));
        }
        self.attributes.insert(def.id, def);
        Ok(())
    }

    /// Add an item definition; fails if the type id is already defined.
    pub fn insert_item(
        &mut self,
        item: ItemDefinition,
    ) -> Result<Arc<ItemDefinition>, CatalogError> {
        if self.items.contains_key(&item.id) {
            return Err(CatalogError::DuplicateItem(item.id));
        }
        let item = Arc::new(item);
        self.items.insert(item.id, Arc::clone(&item));
        Ok(item)
    }

    /// Builder form of [`insert_attribute`](Self::insert_attribute);
    /// a repeated id replaces the earlier metadata.
    pub fn with_attribute(mut self, def: AttributeDef) -> Self {
        self.attributes.insert(def.id, def);
        self
    }

    /// Builder form of [`insert_item`](Self::insert_item); a repeated id
    /// replaces the earlier definition.
    pub fn with_item(mut self, item: ItemDefinition) -> Self {
        self.items.insert(item.id, Arc::new(item));
        self
    }

    /// Metadata for `attr`, or the stackable, uncapped default.
    pub fn attribute(&self, attr: AttrId) -> AttributeDef {
        self.attributes
            .get(&attr)
            .copied()
            .unwrap_or_else(|| AttributeDef::new(attr))
    }

    /// Whether the catalog explicitly describes `attr`.
    pub fn describes(&self, attr: AttrId) -> bool {
        self.attributes.contains_key(&attr)
    }

    pub fn item(&self, id: TypeId) -> Option<Arc<ItemDefinition>> {
        self.items.get(&id).cloned()
    }

    pub fn items(&self) -> impl Iterator<Item = &Arc<ItemDefinition>> {
        self.items.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_from_effects() {
        let item = ItemDefinition::new(TypeId(1), GroupId(1))
            .with_effect(Effect::new(EffectId(1), EffectCategory::Online))
            .with_effect(Effect::new(EffectId(2), EffectCategory::Active));
        assert_eq!(item.ceiling(), State::Active);
    }

    #[test]
    fn test_ceiling_without_effects() {
        let item = ItemDefinition::new(TypeId(1), GroupId(1));
        assert_eq!(item.ceiling(), State::Offline);
    }

    #[test]
    fn test_explicit_ceiling_wins() {
        let item = ItemDefinition::new(TypeId(1), GroupId(1))
            .with_effect(Effect::new(EffectId(1), EffectCategory::Passive))
            .with_max_state(State::Overloaded);
        assert_eq!(item.ceiling(), State::Overloaded);
    }

    #[test]
    fn test_effect_state_override() {
        let effect = Effect::new(EffectId(5), EffectCategory::Passive).with_state(State::Online);
        assert_eq!(effect.required_state(), State::Online);
    }

    #[test]
    fn test_unknown_attribute_defaults() {
        let catalog = Catalog::new();
        let def = catalog.attribute(AttrId(999));
        assert!(def.stackable);
        assert_eq!(def.max_attribute, None);
        assert!(!catalog.describes(AttrId(999)));
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{
            "attributes": [
                { "id": 64, "stackable": false },
                { "id": 264, "max_attribute": 263 }
            ],
            "items": [
                {
                    "id": 3300,
                    "group": 255,
                    "attributes": { "280": 5.0 },
                    "effects": [
                        {
                            "id": 132,
                            "category": "passive",
                            "modifiers": [
                                {
                                    "source_attribute": 292,
                                    "target_attribute": 64,
                                    "operator": "post_percent",
                                    "domain": { "location": "ship" },
                                    "filter_type": "skill_self"
                                }
                            ]
                        }
                    ]
                }
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert!(!catalog.attribute(AttrId(64)).stackable);
        assert!(catalog.attribute(AttrId(264)).stackable);
        assert_eq!(catalog.attribute(AttrId(264)).max_attribute, Some(AttrId(263)));

        let skill = catalog.item(TypeId(3300)).unwrap();
        assert_eq!(skill.group, GroupId(255));
        assert_eq!(skill.attribute(AttrId(280)), Some(5.0));
        assert_eq!(skill.effects[0].modifiers.len(), 1);
        assert_eq!(skill.ceiling(), State::Offline);
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let json = r#"{ "items": [ { "id": 1 }, { "id": 1 } ] }"#;
        let err = Catalog::from_json(json).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateItem(TypeId(1))));
    }

    #[test]
    fn test_catalog_rejects_malformed_json() {
        let err = Catalog::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }
}
