//! Fit-wide statistics.
//!
//! Aggregates over the whole fit (resource use, slot use) are read often
//! and change with almost every edit, so they are not tracked in the
//! dependency graph. They live in [`VolatileCell`]s instead and are
//! dropped together through [`Volatile::clear_volatile`] once the caller
//! is done editing.

use crate::error::CalcError;
use crate::fit::Fit;
use crate::holder::Holder;
use crate::ids::{AttrId, HolderId};
use crate::placement::Placement;
use crate::state::State;
use crate::volatile::{Volatile, VolatileCell};

/// Attribute ids the stats read.
pub mod attr {
    use crate::ids::AttrId;

    pub const RIG_SLOTS: AttrId = AttrId(1137);
    pub const LOW_SLOTS: AttrId = AttrId(12);
    pub const MEDIUM_SLOTS: AttrId = AttrId(13);
    pub const HIGH_SLOTS: AttrId = AttrId(14);
    pub const POWER_OUTPUT: AttrId = AttrId(11);
    pub const POWER: AttrId = AttrId(30);
    pub const CPU_OUTPUT: AttrId = AttrId(48);
    pub const CPU: AttrId = AttrId(50);
    pub const UPGRADE_CAPACITY: AttrId = AttrId(1132);
    pub const UPGRADE_COST: AttrId = AttrId(1153);
    pub const DRONE_BANDWIDTH: AttrId = AttrId(1271);
    pub const DRONE_BANDWIDTH_USED: AttrId = AttrId(1272);
}

/// A resource the carrier provides and holders consume.
///
/// Every non-carrier holder whose item defines the use attribute is a
/// consumer, whatever its placement.
#[derive(Debug, Clone)]
pub struct ResourceStat {
    output_attr: AttrId,
    use_attr: AttrId,
    /// Consumers below this state use nothing.
    min_state: State,
    used: VolatileCell<f64>,
    output: VolatileCell<Option<f64>>,
}

impl ResourceStat {
    pub fn new(output_attr: AttrId, use_attr: AttrId, min_state: State) -> Self {
        Self {
            output_attr,
            use_attr,
            min_state,
            used: VolatileCell::new(),
            output: VolatileCell::new(),
        }
    }

    /// Total modified use of the consumers in a high enough state,
    /// rounded to two decimals.
    pub fn used(&mut self, fit: &mut Fit) -> Result<f64, CalcError> {
        let (use_attr, min_state) = (self.use_attr, self.min_state);
        self.used
            .get_or_try_init(|| {
                let consumers: Vec<HolderId> = fit
                    .holders()
                    .filter(|h| {
                        !h.is_root()
                            && h.state() >= min_state
                            && h.item().attribute(use_attr).is_some()
                    })
                    .map(Holder::id)
                    .collect();
                let mut total = 0.0;
                for id in consumers {
                    total += fit.attribute(id, use_attr)?;
                }
                Ok((total * 100.0).round() / 100.0)
            })
            .copied()
    }

    /// Amount the carrier provides; `None` without a carrier or when the
    /// carrier lacks the output attribute.
    pub fn output(&mut self, fit: &mut Fit) -> Result<Option<f64>, CalcError> {
        let output_attr = self.output_attr;
        self.output
            .get_or_try_init(|| root_attribute(fit, output_attr))
            .copied()
    }
}

impl Volatile for ResourceStat {
    fn clear_volatile(&mut self) {
        self.used.clear();
        self.output.clear();
    }
}

/// Slots of one placement the carrier provides.
#[derive(Debug, Clone)]
pub struct SlotStat {
    total_attr: AttrId,
    placement: Placement,
    used: VolatileCell<usize>,
    total: VolatileCell<Option<u32>>,
}

impl SlotStat {
    pub fn new(total_attr: AttrId, placement: Placement) -> Self {
        Self {
            total_attr,
            placement,
            used: VolatileCell::new(),
            total: VolatileCell::new(),
        }
    }

    /// Holders currently in the placement, whatever their state.
    pub fn used(&mut self, fit: &Fit) -> usize {
        let placement = self.placement;
        *self.used.get_or_init(|| fit.holders_in(placement).count())
    }

    /// Slots the carrier provides; `None` without a carrier or when the
    /// carrier lacks the slot attribute.
    pub fn total(&mut self, fit: &mut Fit) -> Result<Option<u32>, CalcError> {
        let total_attr = self.total_attr;
        self.total
            .get_or_try_init(|| {
                Ok(root_attribute(fit, total_attr)?.map(|slots| slots.max(0.0).round() as u32))
            })
            .copied()
    }
}

impl Volatile for SlotStat {
    fn clear_volatile(&mut self) {
        self.used.clear();
        self.total.clear();
    }
}

/// Every fit-wide stat, cleared together.
///
/// # Examples
///
/// ```rust
/// use fitcalc::stats::{attr, StatTracker};
/// use fitcalc::volatile::Volatile;
/// use fitcalc::*;
/// use std::sync::Arc;
///
/// let mut fit = Fit::new(Arc::new(Catalog::new()));
/// let mut stats = StatTracker::new();
/// assert_eq!(stats.powergrid.output(&mut fit).unwrap(), None);
///
/// let ship = ItemDefinition::new(TypeId(587), GroupId(25))
///     .with_attribute(attr::POWER_OUTPUT, 45.0);
/// fit.add(Arc::new(ship), Placement::Ship);
///
/// // still the settled value until cleared
/// assert_eq!(stats.powergrid.output(&mut fit).unwrap(), None);
/// stats.clear_volatile();
/// assert_eq!(stats.powergrid.output(&mut fit).unwrap(), Some(45.0));
/// ```
#[derive(Debug, Clone)]
pub struct StatTracker {
    pub powergrid: ResourceStat,
    pub cpu: ResourceStat,
    pub calibration: ResourceStat,
    pub drone_bandwidth: ResourceStat,
    pub high_slots: SlotStat,
    pub medium_slots: SlotStat,
    pub low_slots: SlotStat,
    pub rig_slots: SlotStat,
}

impl StatTracker {
    pub fn new() -> Self {
        Self {
            powergrid: ResourceStat::new(attr::POWER_OUTPUT, attr::POWER, State::Online),
            cpu: ResourceStat::new(attr::CPU_OUTPUT, attr::CPU, State::Online),
            // rigs have no online state; fitted means consuming
            calibration: ResourceStat::new(
                attr::UPGRADE_CAPACITY,
                attr::UPGRADE_COST,
                State::Offline,
            ),
            drone_bandwidth: ResourceStat::new(
                attr::DRONE_BANDWIDTH,
                attr::DRONE_BANDWIDTH_USED,
                State::Online,
            ),
            high_slots: SlotStat::new(attr::HIGH_SLOTS, Placement::High),
            medium_slots: SlotStat::new(attr::MEDIUM_SLOTS, Placement::Medium),
            low_slots: SlotStat::new(attr::LOW_SLOTS, Placement::Low),
            rig_slots: SlotStat::new(attr::RIG_SLOTS, Placement::Rig),
        }
    }
}

impl Default for StatTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Volatile for StatTracker {
    fn clear_volatile(&mut self) {
        self.powergrid.clear_volatile();
        self.cpu.clear_volatile();
        self.calibration.clear_volatile();
        self.drone_bandwidth.clear_volatile();
        self.high_slots.clear_volatile();
        self.medium_slots.clear_volatile();
        self.low_slots.clear_volatile();
        self.rig_slots.clear_volatile();
    }
}

/// Map "this very attribute is undefined here" to `None`.
fn defined(
    result: Result<f64, CalcError>,
    holder: HolderId,
    attr: AttrId,
) -> Result<Option<f64>, CalcError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(CalcError::AttributeUndefined { holder: h, attr: a }) if h == holder && a == attr => {
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn root_attribute(fit: &mut Fit, attr: AttrId) -> Result<Option<f64>, CalcError> {
    let Some(root) = fit.root_id() else {
        return Ok(None);
    };
    defined(fit.attribute(root, attr), root, attr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{GroupId, TypeId};
    use crate::item::{Catalog, ItemDefinition};
    use std::sync::Arc;

    #[test]
    fn test_defined_filters_only_own_attribute() {
        let own = CalcError::AttributeUndefined {
            holder: HolderId(1),
            attr: attr::CPU,
        };
        assert_eq!(defined(Err(own), HolderId(1), attr::CPU), Ok(None));

        let other = CalcError::AttributeUndefined {
            holder: HolderId(2),
            attr: attr::CPU,
        };
        assert!(defined(Err(other), HolderId(1), attr::CPU).is_err());
    }

    #[test]
    fn test_slots_without_ship() {
        let mut fit = Fit::new(Arc::new(Catalog::new()));
        let mut slots = SlotStat::new(attr::HIGH_SLOTS, Placement::High);
        assert_eq!(slots.total(&mut fit).unwrap(), None);
        assert_eq!(slots.used(&fit), 0);
    }

    #[test]
    fn test_slot_total_from_ship() {
        let mut fit = Fit::new(Arc::new(Catalog::new()));
        let ship = ItemDefinition::new(TypeId(1), GroupId(1)).with_attribute(attr::LOW_SLOTS, 4.0);
        fit.add(Arc::new(ship), Placement::Ship);
        fit.add(Arc::new(ItemDefinition::new(TypeId(2), GroupId(2))), Placement::Low);

        let mut slots = SlotStat::new(attr::LOW_SLOTS, Placement::Low);
        assert_eq!(slots.total(&mut fit).unwrap(), Some(4));
        assert_eq!(slots.used(&fit), 1);
    }
}
