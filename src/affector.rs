//! Affectors and target keys.
//!
//! An [`Affector`] is one modifier of one effect of one holder: the unit
//! that gets enabled and disabled as holders change state. A [`TargetKey`]
//! is the structural coordinate an affector addresses. Every holder
//! answers to a small, fixed set of keys (its own id, its location, its
//! group, the skills it requires), so "which affectors reach this holder"
//! and "which cached values does this affector reach" are both plain key
//! lookups.

use crate::holder::Holder;
use crate::ids::{AttrId, EffectId, GroupId, HolderId, TypeId};
use crate::modifier::{Domain, FilterType, Modifier};
use crate::placement::Location;
use crate::state::{Scope, State};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A modifier bound to the holder carrying it.
///
/// The derived ordering (source holder, effect id, modifier index) is the
/// deterministic order in which contributions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Affector {
    /// Holder carrying the effect.
    pub source: HolderId,
    pub effect: EffectId,
    /// Position of the modifier inside its effect.
    pub index: usize,
    /// Lowest holder state at which this affector applies.
    pub state: State,
    pub modifier: Modifier,
}

impl Affector {
    /// The key of the holders this affector addresses.
    ///
    /// `source` must be the holder the affector came from. Returns `None`
    /// when nothing inside the fit can be targeted: non-local scope, a
    /// filter without its value, or an `Other` domain with no linked
    /// holder.
    pub fn target_key(&self, source: &Holder) -> Option<TargetKey> {
        if self.modifier.scope != Scope::Local {
            return None;
        }
        let domain = match self.modifier.domain {
            Domain::Itself => DomainKey::Holder(source.id()),
            Domain::Carrier => DomainKey::Carrier,
            Domain::Location(location) => DomainKey::Location(location),
            Domain::All => DomainKey::All,
            Domain::Other => DomainKey::Holder(source.other()?),
        };
        let filter = match (self.modifier.filter_type, self.modifier.filter_value) {
            (None, _) => FilterKey::Any,
            (Some(FilterType::Group), Some(group)) => FilterKey::Group(GroupId(group)),
            (Some(FilterType::Skill), Some(skill)) => FilterKey::Skill(TypeId(skill)),
            (Some(FilterType::SkillSelf), _) => FilterKey::Skill(source.type_id()),
            (Some(FilterType::Group | FilterType::Skill), None) => return None,
        };
        Some(TargetKey { domain, filter })
    }
}

/// Domain half of a [`TargetKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DomainKey {
    /// One specific holder (`Itself`, or `Other` once the link is known).
    Holder(HolderId),
    /// The fit's root holder.
    Carrier,
    /// Every non-root holder in a location.
    Location(Location),
    /// Every non-root holder.
    All,
}

/// Filter half of a [`TargetKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    Any,
    Group(GroupId),
    Skill(TypeId),
}

/// Structural coordinate shared by target resolution and invalidation.
///
/// # Examples
///
/// ```rust
/// use fitcalc::affector::{DomainKey, FilterKey, TargetKey};
/// use fitcalc::{GroupId, Location};
///
/// let key = TargetKey::new(DomainKey::Location(Location::Ship), FilterKey::Group(GroupId(55)));
/// assert_eq!(key.domain, DomainKey::Location(Location::Ship));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetKey {
    pub domain: DomainKey,
    pub filter: FilterKey,
}

impl TargetKey {
    pub fn new(domain: DomainKey, filter: FilterKey) -> Self {
        Self { domain, filter }
    }

    /// Whether `holder` answers to this key.
    pub fn matches(&self, holder: &Holder) -> bool {
        let domain = match self.domain {
            DomainKey::Holder(id) => holder.id() == id,
            DomainKey::Carrier => holder.is_root(),
            DomainKey::Location(location) => holder.location() == Some(location),
            DomainKey::All => !holder.is_root(),
        };
        domain
            && match self.filter {
                FilterKey::Any => true,
                FilterKey::Group(group) => holder.item().group == group,
                FilterKey::Skill(skill) => holder.item().requires_skill(skill),
            }
    }
}

/// Index of the affectors currently enabled in a fit.
///
/// Affectors are indexed both by what they reach, for attribute
/// computation, and by their source, for unregistration.
#[derive(Debug, Default)]
pub(crate) struct AffectorRegister {
    by_key: HashMap<(TargetKey, AttrId), BTreeSet<Affector>>,
    by_source: BTreeMap<HolderId, BTreeMap<Affector, Option<TargetKey>>>,
}

impl AffectorRegister {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enable an affector under the key it currently resolves to.
    pub(crate) fn register(&mut self, affector: Affector, key: Option<TargetKey>) {
        if let Some(key) = key {
            self.by_key
                .entry((key, affector.modifier.target_attribute))
                .or_default()
                .insert(affector);
        }
        self.by_source
            .entry(affector.source)
            .or_default()
            .insert(affector, key);
    }

    /// Disable an affector, returning the key it was registered under.
    pub(crate) fn unregister(&mut self, affector: &Affector) -> Option<TargetKey> {
        let sources = self.by_source.get_mut(&affector.source)?;
        let key = sources.remove(affector)?;
        if sources.is_empty() {
            self.by_source.remove(&affector.source);
        }
        if let Some(key) = key {
            let slot = (key, affector.modifier.target_attribute);
            if let Some(set) = self.by_key.get_mut(&slot) {
                set.remove(affector);
                if set.is_empty() {
                    self.by_key.remove(&slot);
                }
            }
        }
        key
    }

    /// Enabled affectors reaching `attr` through any of `keys`.
    pub(crate) fn affecting(&self, keys: &[TargetKey], attr: AttrId) -> BTreeSet<Affector> {
        keys.iter()
            .filter_map(|key| self.by_key.get(&(*key, attr)))
            .flatten()
            .copied()
            .collect()
    }

    /// Enabled affectors carried by `source`, with their keys.
    pub(crate) fn of_source(&self, source: HolderId) -> Vec<(Affector, Option<TargetKey>)> {
        self.by_source
            .get(&source)
            .map(|set| set.iter().map(|(a, k)| (*a, *k)).collect())
            .unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }
}
