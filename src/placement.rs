//! Placement of holders inside a fit.
//!
//! A [`Placement`] is the fine-grained partition a fit keeps its holders in
//! (which rack, bay or sheet). A [`Location`] is the coarser group that
//! location-domain modifiers address.

use serde::{Deserialize, Serialize};

/// Targeting group addressed by `Domain::Location` modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Items fitted to the ship: modules, rigs, subsystems and loaded charges.
    Ship,
    /// Items belonging to the pilot: skills and implants.
    Character,
    /// Items launched into space: drones.
    Space,
}

/// Where a holder sits in a fit.
///
/// # Examples
///
/// ```rust
/// use fitcalc::{Location, Placement};
///
/// assert_eq!(Placement::Low.location(), Some(Location::Ship));
/// assert_eq!(Placement::Skill.location(), Some(Location::Character));
/// assert_eq!(Placement::Ship.location(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// The carrier itself. A fit holds at most one.
    Ship,
    High,
    Medium,
    Low,
    Rig,
    Subsystem,
    Drone,
    /// Loaded into a module; linked to it through the `Other` domain.
    Charge,
    Skill,
    Implant,
}

impl Placement {
    /// Location group of this placement; `None` for the carrier.
    pub fn location(self) -> Option<Location> {
        match self {
            Placement::Ship => None,
            Placement::High
            | Placement::Medium
            | Placement::Low
            | Placement::Rig
            | Placement::Subsystem
            | Placement::Charge => Some(Location::Ship),
            Placement::Skill | Placement::Implant => Some(Location::Character),
            Placement::Drone => Some(Location::Space),
        }
    }

    /// Whether holders here can carry a charge.
    pub fn is_module_rack(self) -> bool {
        matches!(self, Placement::High | Placement::Medium | Placement::Low)
    }

    /// Modifications sourced from these placements never suffer the
    /// stacking penalty.
    pub fn is_penalty_exempt(self) -> bool {
        matches!(
            self,
            Placement::Ship
                | Placement::Charge
                | Placement::Skill
                | Placement::Implant
                | Placement::Subsystem
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locations() {
        assert_eq!(Placement::Drone.location(), Some(Location::Space));
        assert_eq!(Placement::Charge.location(), Some(Location::Ship));
        assert_eq!(Placement::Implant.location(), Some(Location::Character));
    }

    #[test]
    fn test_module_racks() {
        assert!(Placement::High.is_module_rack());
        assert!(Placement::Low.is_module_rack());
        assert!(!Placement::Rig.is_module_rack());
        assert!(!Placement::Drone.is_module_rack());
    }

    #[test]
    fn test_penalty_exemption() {
        assert!(Placement::Skill.is_penalty_exempt());
        assert!(Placement::Charge.is_penalty_exempt());
        assert!(!Placement::Medium.is_penalty_exempt());
        assert!(!Placement::Rig.is_penalty_exempt());
        assert!(!Placement::Drone.is_penalty_exempt());
    }
}
