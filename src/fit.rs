//! The fit: holders plus the attribute calculation engine.
//!
//! Provides the `Fit` type, the single entry point for mutations and
//! reads. It keeps every holder, the register of enabled affectors and
//! the dependency graph consistent with each other: mutations push
//! invalidation through the graph, reads pull values through the cache.

use crate::affector::{Affector, AffectorRegister, DomainKey, FilterKey, TargetKey};
use crate::calculator::{self, Contribution};
use crate::error::{Anomaly, CalcError};
use crate::graph::{DepNode, DependencyGraph};
use crate::holder::Holder;
use crate::ids::{AttrId, AttrNode, HolderId, TypeId};
use crate::item::{Catalog, ItemDefinition};
use crate::modifier::Domain;
use crate::placement::Placement;
use crate::resolved::ResolvedAttribute;
use crate::state::{Scope, State};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, trace};

/// Scopes whose affectors are enabled inside a fit.
const LOCAL: &[Scope] = &[Scope::Local];

/// A ship fit and its attribute engine.
///
/// Attribute values are computed lazily on first read, cached per holder
/// and dropped again as soon as anything they were computed from changes.
///
/// # Examples
///
/// ```rust
/// use fitcalc::modifier::{Domain, Modifier, Operator};
/// use fitcalc::*;
/// use std::sync::Arc;
///
/// let grid = AttrId(11);
/// let bonus = AttrId(20);
/// let catalog = Arc::new(Catalog::new());
/// let mut fit = Fit::new(catalog);
///
/// let ship = fit.add(
///     Arc::new(ItemDefinition::new(TypeId(587), GroupId(25)).with_attribute(grid, 100.0)),
///     Placement::Ship,
/// );
/// let upgrade = ItemDefinition::new(TypeId(1), GroupId(1))
///     .with_attribute(bonus, 10.0)
///     .with_effect(
///         Effect::new(EffectId(1), EffectCategory::Online).with_modifier(
///             Modifier::new(bonus, grid, Operator::PostPercent).with_domain(Domain::Carrier),
///         ),
///     );
/// let module = fit.add(Arc::new(upgrade), Placement::Low);
///
/// assert_eq!(fit.attribute(ship, grid).unwrap(), 100.0);
/// fit.set_state(module, State::Online).unwrap();
/// assert!((fit.attribute(ship, grid).unwrap() - 110.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct Fit {
    catalog: Arc<Catalog>,
    holders: BTreeMap<HolderId, Holder>,
    root: Option<HolderId>,
    next_id: u64,
    register: AffectorRegister,
    graph: DependencyGraph,
    /// Attributes currently being computed, outermost first.
    resolving: Vec<AttrNode>,
}

impl Fit {
    /// Create an empty fit drawing static data from `catalog`.
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            holders: BTreeMap::new(),
            root: None,
            next_id: 1,
            register: AffectorRegister::new(),
            graph: DependencyGraph::new(),
            resolving: Vec::new(),
        }
    }

    /// Static data this fit draws from.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Place an item into the fit. The new holder starts `Offline`.
    ///
    /// Placing a second carrier replaces the first one, which is removed
    /// with everything that depended on it.
    pub fn add(&mut self, item: Arc<ItemDefinition>, placement: Placement) -> HolderId {
        if placement == Placement::Ship {
            if let Some(old) = self.root {
                debug!(holder = %old, "replacing carrier");
                self.remove_holder(old);
            }
        }

        let id = HolderId(self.next_id);
        self.next_id += 1;
        debug!(holder = %id, item = %item.id, ?placement, "holder added");
        self.holders.insert(id, Holder::new(id, item, placement));
        if placement == Placement::Ship {
            self.root = Some(id);
        }
        self.enable(id, State::Offline..=State::Offline);
        id
    }

    /// Place an item from the catalog into the fit.
    pub fn add_type(
        &mut self,
        type_id: TypeId,
        placement: Placement,
    ) -> Result<HolderId, CalcError> {
        let item = self
            .catalog
            .item(type_id)
            .ok_or(CalcError::UnknownItem(type_id))?;
        Ok(self.add(item, placement))
    }

    /// Load a charge into a module, replacing any charge already loaded.
    ///
    /// The module and the charge become each other's `Other` target.
    pub fn add_charge(
        &mut self,
        container: HolderId,
        item: Arc<ItemDefinition>,
    ) -> Result<HolderId, CalcError> {
        let holder = self.holder_ref(container)?;
        if !holder.placement().is_module_rack() {
            return Err(CalcError::NotAContainer(container));
        }
        if let Some(old) = holder.other() {
            self.remove_holder(old);
        }

        let charge = self.add(item, Placement::Charge);
        if let Some(holder) = self.holders.get_mut(&charge) {
            holder.set_other(Some(container));
        }
        if let Some(holder) = self.holders.get_mut(&container) {
            holder.set_other(Some(charge));
        }
        self.relink(container);
        self.relink(charge);
        debug!(%container, %charge, "charge loaded");
        Ok(charge)
    }

    /// Remove a holder from the fit and return it.
    ///
    /// A module's charge is removed along with it. Every affector of the
    /// holder is disabled and every value computed from it is dropped.
    pub fn remove(&mut self, id: HolderId) -> Result<Holder, CalcError> {
        self.remove_holder(id).ok_or(CalcError::UnknownHolder(id))
    }

    fn remove_holder(&mut self, id: HolderId) -> Option<Holder> {
        let holder = self.holders.get(&id)?;
        let placement = holder.placement();
        let other = holder.other();

        match (placement, other) {
            (Placement::Charge, Some(container)) => {
                if let Some(container_holder) = self.holders.get_mut(&container) {
                    container_holder.set_other(None);
                }
                self.relink(container);
            }
            (_, Some(charge)) => {
                self.remove_holder(charge);
            }
            _ => {}
        }

        for (affector, key) in self.register.of_source(id) {
            self.register.unregister(&affector);
            if let Some(key) = key {
                self.sweep(DepNode::Reach(key, affector.modifier.target_attribute));
            }
        }
        let cached = self
            .holders
            .get(&id)
            .map(|h| h.attributes().cached())
            .unwrap_or_default();
        for attr in cached {
            self.sweep(DepNode::Attr(AttrNode::new(id, attr)));
        }

        if self.root == Some(id) {
            self.root = None;
        }
        debug!(holder = %id, "holder removed");
        self.holders.remove(&id)
    }

    /// Current state of a holder.
    pub fn state(&self, id: HolderId) -> Result<State, CalcError> {
        Ok(self.holder_ref(id)?.state())
    }

    /// Switch a holder's activation state.
    ///
    /// Requesting a state above the item's ceiling fails with
    /// [`CalcError::InvalidState`] and changes nothing. Affectors whose
    /// required state is crossed are enabled or disabled; the state itself
    /// is committed last.
    pub fn set_state(&mut self, id: HolderId, state: State) -> Result<(), CalcError> {
        let holder = self.holder_ref(id)?;
        holder.check_state(state)?;
        let old = holder.state();
        let Some(crossed) = State::crossed(old, state) else {
            return Ok(());
        };

        if state > old {
            self.enable(id, crossed);
        } else {
            self.disable(id, crossed);
        }
        if let Some(holder) = self.holders.get_mut(&id) {
            holder.set_state(state);
        }
        debug!(holder = %id, from = %old, to = %state, "state changed");
        Ok(())
    }

    /// A holder by id.
    pub fn holder(&self, id: HolderId) -> Option<&Holder> {
        self.holders.get(&id)
    }

    /// All holders, ascending by id.
    pub fn holders(&self) -> impl Iterator<Item = &Holder> {
        self.holders.values()
    }

    /// Holders in one placement, ascending by id.
    pub fn holders_in(&self, placement: Placement) -> impl Iterator<Item = &Holder> {
        self.holders
            .values()
            .filter(move |holder| holder.placement() == placement)
    }

    /// The carrier holder, if one is placed.
    pub fn root_holder(&self) -> Option<&Holder> {
        self.root.and_then(|id| self.holders.get(&id))
    }

    /// Id of the carrier holder.
    pub fn root_id(&self) -> Option<HolderId> {
        self.root
    }

    /// Number of holders in the fit.
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Whether the fit has no holders.
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Read-only view of the dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Affectors of `id` currently enabled, in combination order.
    pub fn enabled_affectors(&self, id: HolderId) -> Vec<Affector> {
        self.register
            .of_source(id)
            .into_iter()
            .map(|(affector, _)| affector)
            .collect()
    }

    /// Holders an affector currently reaches, ascending by id.
    ///
    /// This is a live query over the current membership of the fit.
    pub fn resolve_targets(&self, affector: &Affector) -> Vec<HolderId> {
        let Some(key) = self
            .holders
            .get(&affector.source)
            .and_then(|source| affector.target_key(source))
        else {
            return Vec::new();
        };
        self.holders
            .values()
            .filter(|holder| key.matches(holder))
            .map(Holder::id)
            .collect()
    }

    /// Effective value of an attribute.
    pub fn attribute(&mut self, id: HolderId, attr: AttrId) -> Result<f64, CalcError> {
        if let Some(value) = self.holder_ref(id)?.attributes().value(attr) {
            return Ok(value);
        }
        self.resolve(id, attr).map(|resolved| resolved.value)
    }

    /// Effective value of an attribute with its breakdown.
    ///
    /// Served from the cache when valid; otherwise computed, memoized and
    /// recorded in the dependency graph.
    pub fn resolve(&mut self, id: HolderId, attr: AttrId) -> Result<ResolvedAttribute, CalcError> {
        if let Some(cached) = self.holder_ref(id)?.attributes().get(attr) {
            return Ok(cached.clone());
        }

        let node = AttrNode::new(id, attr);
        if let Some(pos) = self.resolving.iter().position(|n| *n == node) {
            let mut path = self.resolving[pos..].to_vec();
            path.push(node);
            return Err(CalcError::Cycle { path });
        }

        self.resolving.push(node);
        let computed = self.compute(node);
        self.resolving.pop();
        let (resolved, deps) = computed?;

        self.graph.record(node, &deps);
        if let Some(holder) = self.holders.get_mut(&id) {
            holder.attributes_mut().insert(resolved.clone());
        }
        Ok(resolved)
    }

    /// Force an attribute to `value`, bypassing its computation.
    pub fn override_attribute(
        &mut self,
        id: HolderId,
        attr: AttrId,
        value: f64,
    ) -> Result<(), CalcError> {
        self.holder_mut(id)?.attributes_mut().set_override(attr, value);
        self.invalidate_own(id, attr);
        Ok(())
    }

    /// Drop an override, returning the forced value if there was one.
    pub fn clear_override(&mut self, id: HolderId, attr: AttrId) -> Result<Option<f64>, CalcError> {
        let previous = self.holder_mut(id)?.attributes_mut().clear_override(attr);
        if previous.is_some() {
            self.invalidate_own(id, attr);
        }
        Ok(previous)
    }

    fn compute(&mut self, node: AttrNode) -> Result<(ResolvedAttribute, Vec<DepNode>), CalcError> {
        let holder = self.holder_ref(node.holder)?;
        if let Some(value) = holder.attributes().override_of(node.attr) {
            trace!(%node, value, "override");
            return Ok((ResolvedAttribute::forced(node.holder, node.attr, value), Vec::new()));
        }
        let keys = holder.target_keys();
        let base = holder.item().attribute(node.attr);
        let def = self.catalog.attribute(node.attr);
        let affectors = self.register.affecting(&keys, node.attr);

        let mut deps: Vec<DepNode> = reach_nodes(&keys, node.attr).collect();
        let mut contributions = Vec::with_capacity(affectors.len());
        let mut skipped = Vec::new();
        for affector in &affectors {
            let source_attr = affector.modifier.source_attribute;
            let value = match self.attribute(affector.source, source_attr) {
                Ok(value) => value,
                // undefined source: the modifier does nothing until it is defined
                Err(CalcError::AttributeUndefined { holder, attr })
                    if holder == affector.source && attr == source_attr =>
                {
                    let source_keys = self.holder_ref(holder)?.target_keys();
                    deps.extend(reach_nodes(&source_keys, source_attr));
                    skipped.push(Anomaly::UndefinedSource {
                        source_holder: holder,
                        attr,
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };
            deps.push(DepNode::Attr(AttrNode::new(affector.source, source_attr)));
            let penalty_exempt = self
                .holders
                .get(&affector.source)
                .is_some_and(|source| source.placement().is_penalty_exempt());
            contributions.push(Contribution {
                source: affector.source,
                effect: affector.effect,
                operator: affector.modifier.operator,
                value,
                penalty_exempt,
            });
        }

        let combination = calculator::combine(base, &def, &contributions).ok_or(
            CalcError::AttributeUndefined {
                holder: node.holder,
                attr: node.attr,
            },
        )?;
        let mut resolved = ResolvedAttribute::new(node.holder, node.attr, combination.value);
        resolved.base = base;
        resolved.contributions = contributions;
        resolved.steps = combination.steps;
        resolved.anomalies = skipped;
        resolved.anomalies.extend(combination.anomalies);

        if let Some(cap_attr) = def.max_attribute {
            match self.attribute(node.holder, cap_attr) {
                Ok(cap) => {
                    deps.push(DepNode::Attr(AttrNode::new(node.holder, cap_attr)));
                    if resolved.value > cap {
                        resolved.value = cap;
                        resolved.add_step("cap", cap);
                    }
                }
                // no cap value: uncapped until something defines one
                Err(CalcError::AttributeUndefined { holder, attr })
                    if holder == node.holder && attr == cap_attr =>
                {
                    deps.extend(reach_nodes(&keys, cap_attr));
                }
                Err(err) => return Err(err),
            }
        }

        trace!(%node, value = resolved.value, modifiers = affectors.len(), "computed");
        Ok((resolved, deps))
    }

    /// Register affectors of `id` whose required state lies in `states`.
    fn enable(&mut self, id: HolderId, states: RangeInclusive<State>) {
        let Some(holder) = self.holders.get(&id) else {
            return;
        };
        let keyed: Vec<(Affector, Option<TargetKey>)> = holder
            .affectors(Some(states), Some(LOCAL))
            .into_iter()
            .map(|affector| (affector, affector.target_key(holder)))
            .collect();
        for (affector, key) in keyed {
            self.register.register(affector, key);
            if let Some(key) = key {
                self.sweep(DepNode::Reach(key, affector.modifier.target_attribute));
            }
        }
    }

    /// Unregister affectors of `id` whose required state lies in `states`.
    fn disable(&mut self, id: HolderId, states: RangeInclusive<State>) {
        let Some(holder) = self.holders.get(&id) else {
            return;
        };
        for affector in holder.affectors(Some(states), Some(LOCAL)) {
            if let Some(key) = self.register.unregister(&affector) {
                self.sweep(DepNode::Reach(key, affector.modifier.target_attribute));
            }
        }
    }

    /// Re-key the enabled `Other` affectors of `id` after a link change.
    fn relink(&mut self, id: HolderId) {
        let linked: Vec<Affector> = self
            .register
            .of_source(id)
            .into_iter()
            .filter(|(affector, _)| affector.modifier.domain == Domain::Other)
            .map(|(affector, _)| affector)
            .collect();
        for affector in linked {
            if let Some(old) = self.register.unregister(&affector) {
                self.sweep(DepNode::Reach(old, affector.modifier.target_attribute));
            }
            let key = self
                .holders
                .get(&id)
                .and_then(|holder| affector.target_key(holder));
            self.register.register(affector, key);
            if let Some(key) = key {
                self.sweep(DepNode::Reach(key, affector.modifier.target_attribute));
            }
        }
    }

    /// Drop a holder's own value of `attr` and everything computed from it.
    fn invalidate_own(&mut self, id: HolderId, attr: AttrId) {
        self.sweep(DepNode::Attr(AttrNode::new(id, attr)));
        let own = TargetKey::new(DomainKey::Holder(id), FilterKey::Any);
        self.sweep(DepNode::Reach(own, attr));
    }

    /// Invalidate from `start` and drop the stale values from the caches.
    fn sweep(&mut self, start: DepNode) {
        for node in self.graph.invalidate(start) {
            if let Some(holder) = self.holders.get_mut(&node.holder) {
                holder.attributes_mut().remove(node.attr);
            }
        }
    }

    fn holder_ref(&self, id: HolderId) -> Result<&Holder, CalcError> {
        self.holders.get(&id).ok_or(CalcError::UnknownHolder(id))
    }

    fn holder_mut(&mut self, id: HolderId) -> Result<&mut Holder, CalcError> {
        self.holders.get_mut(&id).ok_or(CalcError::UnknownHolder(id))
    }
}

fn reach_nodes(keys: &[TargetKey], attr: AttrId) -> impl Iterator<Item = DepNode> + '_ {
    keys.iter().map(move |key| DepNode::Reach(*key, attr))
}
