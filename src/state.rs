//! Activation states, effect categories and modifier scopes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

/// Activation state of a holder.
///
/// States are totally ordered: a holder in a given state also satisfies
/// every lower state, so an effect requiring `Online` runs while its
/// holder is `Online`, `Active` or `Overloaded`.
///
/// # Examples
///
/// ```rust
/// use fitcalc::State;
///
/// assert!(State::Offline < State::Online);
/// assert!(State::Active.satisfies(State::Online));
/// assert!(!State::Online.satisfies(State::Active));
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// Placed but not powered. Every holder starts here.
    #[default]
    Offline,
    /// Powered, passive bonuses of online effects apply.
    Online,
    /// Cycling.
    Active,
    /// Cycling beyond rated limits.
    Overloaded,
}

impl State {
    /// All states, lowest first.
    pub const ALL: [State; 4] = [
        State::Offline,
        State::Online,
        State::Active,
        State::Overloaded,
    ];

    /// Whether a holder in this state runs effects requiring `required`.
    pub fn satisfies(self, required: State) -> bool {
        self >= required
    }

    /// The next higher state, if any.
    pub fn next(self) -> Option<State> {
        match self {
            State::Offline => Some(State::Online),
            State::Online => Some(State::Active),
            State::Active => Some(State::Overloaded),
            State::Overloaded => None,
        }
    }

    /// States crossed when switching from `from` to `to`.
    ///
    /// Rising from `Offline` to `Active` crosses `Online..=Active`;
    /// falling back crosses the same range. The state being left (when
    /// rising) or entered (when falling) is excluded, because effects
    /// requiring it stay eligible on both sides of the switch.
    ///
    /// Returns `None` when the states are equal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fitcalc::State;
    ///
    /// let crossed = State::crossed(State::Offline, State::Active).unwrap();
    /// assert!(!crossed.contains(&State::Offline));
    /// assert!(crossed.contains(&State::Online));
    /// assert!(crossed.contains(&State::Active));
    /// assert_eq!(State::crossed(State::Online, State::Online), None);
    /// ```
    pub fn crossed(from: State, to: State) -> Option<RangeInclusive<State>> {
        let (low, high) = match from.cmp(&to) {
            std::cmp::Ordering::Equal => return None,
            std::cmp::Ordering::Less => (from, to),
            std::cmp::Ordering::Greater => (to, from),
        };
        // low < high, so low always has a successor
        let first = low.next().unwrap_or(high);
        Some(first..=high)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Offline => "offline",
            State::Online => "online",
            State::Active => "active",
            State::Overloaded => "overloaded",
        };
        f.write_str(name)
    }
}

/// Effect category, as carried by static data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectCategory {
    Passive,
    Active,
    Target,
    Area,
    Online,
    Overload,
    Dungeon,
    System,
}

impl EffectCategory {
    /// Activation state a holder needs before effects of this category run.
    pub fn required_state(self) -> State {
        match self {
            EffectCategory::Passive | EffectCategory::Dungeon | EffectCategory::System => {
                State::Offline
            }
            EffectCategory::Online => State::Online,
            EffectCategory::Active | EffectCategory::Target | EffectCategory::Area => {
                State::Active
            }
            EffectCategory::Overload => State::Overloaded,
        }
    }
}

/// Where a modifier is meant to apply relative to its source fit.
///
/// Only `Local` modifiers resolve targets inside a fit; the other scopes
/// address other fits and are carried for completeness of static data.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Local,
    Projected,
    Gang,
}
