//! Walkthrough: a small frigate fit from hull to stats
//!
//! This example demonstrates:
//! - Placing a ship, modules, a rig and a skill
//! - State changes enabling effects
//! - The breakdown of a resolved attribute
//! - Fit-wide stats and their settle point
//!
//! Run with `RUST_LOG=fitcalc=debug` to watch mutations and invalidation.

use fitcalc::stats::{attr, StatTracker};
use fitcalc::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const SHIELD: AttrId = AttrId(263);
const SHIELD_BONUS: AttrId = AttrId(72);
const SKILL_BONUS: AttrId = AttrId(337);

fn main() -> Result<(), CalcError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let catalog = Catalog::new().with_attribute(AttributeDef::new(SHIELD).non_stackable());
    let mut fit = Fit::new(Arc::new(catalog));

    let hull = ItemDefinition::new(TypeId(587), GroupId(25))
        .with_attribute(SHIELD, 450.0)
        .with_attribute(attr::POWER_OUTPUT, 40.0)
        .with_attribute(attr::CPU_OUTPUT, 130.0)
        .with_attribute(attr::MEDIUM_SLOTS, 3.0)
        .with_attribute(attr::UPGRADE_CAPACITY, 400.0);
    let ship = fit.add(Arc::new(hull), Placement::Ship);
    println!("Hull shield: {:.2}", fit.attribute(ship, SHIELD)?);

    // two shield extenders, penalized against each other
    let extender = Arc::new(
        ItemDefinition::new(TypeId(3831), GroupId(38))
            .with_required_skill(TypeId(3419))
            .with_attribute(SHIELD_BONUS, 20.0)
            .with_attribute(attr::POWER, 12.0)
            .with_attribute(attr::CPU, 20.0)
            .with_effect(
                Effect::new(EffectId(21), EffectCategory::Online).with_modifier(
                    Modifier::new(SHIELD_BONUS, SHIELD, Operator::PostPercent)
                        .with_domain(Domain::Carrier),
                ),
            ),
    );
    let first = fit.add(extender.clone(), Placement::Medium);
    let second = fit.add(extender, Placement::Medium);
    println!("\nExtenders fitted offline: {:.2}", fit.attribute(ship, SHIELD)?);

    fit.set_state(first, State::Online)?;
    fit.set_state(second, State::Online)?;
    println!("Extenders online: {:.2}", fit.attribute(ship, SHIELD)?);

    // skill reducing the extenders' powergrid need
    let skill = ItemDefinition::new(TypeId(3419), GroupId(255))
        .with_attribute(SKILL_BONUS, -25.0)
        .with_effect(
            Effect::new(EffectId(1), EffectCategory::Passive).with_modifier(
                Modifier::new(SKILL_BONUS, attr::POWER, Operator::PostPercent)
                    .with_domain(Domain::Location(Location::Ship))
                    .with_filter_skill_self(),
            ),
        );
    fit.add(Arc::new(skill), Placement::Skill);

    let rig = ItemDefinition::new(TypeId(31790), GroupId(774))
        .with_attribute(SHIELD_BONUS, 15.0)
        .with_attribute(attr::UPGRADE_COST, 150.0)
        .with_effect(
            Effect::new(EffectId(22), EffectCategory::Passive).with_modifier(
                Modifier::new(SHIELD_BONUS, SHIELD, Operator::PostPercent)
                    .with_domain(Domain::Carrier),
            ),
        );
    fit.add(Arc::new(rig), Placement::Rig);

    let resolved = fit.resolve(ship, SHIELD)?;
    println!("\n=== Resolved Shield ===");
    println!("Final Value: {:.2}", resolved.value);
    println!("\nContributions:");
    for contribution in &resolved.contributions {
        println!(
            "  {} {:?} {:.2}{}",
            contribution.source,
            contribution.operator,
            contribution.value,
            if contribution.penalty_exempt { " (exempt)" } else { "" }
        );
    }
    println!("\nSteps:");
    for (step, value) in &resolved.steps {
        println!("  {}: {:.2}", step, value);
    }

    let mut stats = StatTracker::new();
    println!("\n=== Stats ===");
    println!(
        "Powergrid: {:.2} / {:?}",
        stats.powergrid.used(&mut fit)?,
        stats.powergrid.output(&mut fit)?
    );
    println!(
        "CPU: {:.2} / {:?}",
        stats.cpu.used(&mut fit)?,
        stats.cpu.output(&mut fit)?
    );
    println!(
        "Calibration: {:.2} / {:?}",
        stats.calibration.used(&mut fit)?,
        stats.calibration.output(&mut fit)?
    );
    println!(
        "Medium slots: {} / {:?}",
        stats.medium_slots.used(&fit),
        stats.medium_slots.total(&mut fit)?
    );

    // stats settle until cleared
    fit.set_state(second, State::Offline)?;
    println!("\nSecond extender offline (unsettled): {:.2}", stats.powergrid.used(&mut fit)?);
    stats.clear_volatile();
    println!("Second extender offline (settled): {:.2}", stats.powergrid.used(&mut fit)?);
    println!("Shield: {:.2}", fit.attribute(ship, SHIELD)?);

    Ok(())
}
