use fitcalc::calculator::{combine, penalized_bonuses, Contribution};
use fitcalc::*;
use proptest::prelude::*;
use std::sync::Arc;

const TGT: AttrId = AttrId(1);
const SRC: AttrId = AttrId(2);

fn chain_product(bonuses: &[f64]) -> f64 {
    penalized_bonuses(bonuses)
        .iter()
        .fold(1.0, |value, bonus| value * (1.0 + bonus))
}

fn positive() -> impl Strategy<Value = f64> {
    0.0..2.0f64
}

fn negative() -> impl Strategy<Value = f64> {
    -0.99..0.0f64
}

proptest! {
    /// Another positive bonus never lowers the result.
    #[test]
    fn prop_positive_bonus_never_lowers(
        mut bonuses in prop::collection::vec(prop_oneof![positive(), negative()], 0..8),
        extra in positive(),
    ) {
        let before = chain_product(&bonuses);
        bonuses.push(extra);
        let after = chain_product(&bonuses);
        prop_assert!(after >= before * (1.0 - 1e-12), "{after} < {before}");
    }

    /// Another negative bonus never raises the result.
    #[test]
    fn prop_negative_bonus_never_raises(
        mut bonuses in prop::collection::vec(prop_oneof![positive(), negative()], 0..8),
        extra in negative(),
    ) {
        let before = chain_product(&bonuses);
        bonuses.push(extra);
        let after = chain_product(&bonuses);
        prop_assert!(after <= before * (1.0 + 1e-12), "{after} > {before}");
    }

    /// Penalized bonuses keep their sign and never grow.
    #[test]
    fn prop_penalty_only_shrinks(
        bonuses in prop::collection::vec(prop_oneof![positive(), negative()], 0..8),
    ) {
        let penalized = penalized_bonuses(&bonuses);
        prop_assert_eq!(penalized.len(), bonuses.len());

        let max = bonuses.iter().fold(0.0f64, |m, b| m.max(b.abs()));
        for bonus in &penalized {
            prop_assert!(bonus.abs() <= max);
        }
        let total: f64 = bonuses.iter().map(|b| b.abs()).sum();
        let shrunk: f64 = penalized.iter().map(|b| b.abs()).sum();
        prop_assert!(shrunk <= total + 1e-12);

        let positives = penalized.iter().filter(|b| **b >= 0.0).count();
        prop_assert_eq!(positives, bonuses.iter().filter(|b| **b >= 0.0).count());
    }

    /// With strictly decreasing magnitudes, each ranked bonus counts for
    /// strictly less than the one before it, for either sign.
    #[test]
    fn prop_ranked_bonuses_strictly_decrease(
        mut magnitudes in prop::collection::vec(0.01..2.0f64, 2..8),
        negative in any::<bool>(),
    ) {
        magnitudes.sort_by(|a, b| b.total_cmp(a));
        magnitudes.dedup();
        let sign = if negative { -0.45 } else { 1.0 };
        let bonuses: Vec<f64> = magnitudes.iter().map(|m| m * sign).collect();

        let penalized = penalized_bonuses(&bonuses);
        for pair in penalized.windows(2) {
            prop_assert!(pair[0].abs() > pair[1].abs(), "{} <= {}", pair[0], pair[1]);
        }
        let total: f64 = bonuses.iter().map(|b| b.abs()).sum();
        let shrunk: f64 = penalized.iter().map(|b| b.abs()).sum();
        prop_assert!(shrunk <= total);
    }

    /// Contribution order does not change the combined value.
    #[test]
    fn prop_combination_ignores_order(
        values in prop::collection::vec(0.5..1.5f64, 1..6),
    ) {
        let contributions: Vec<Contribution> = values
            .iter()
            .enumerate()
            .map(|(i, value)| Contribution {
                source: HolderId(i as u64 + 1),
                effect: EffectId(1),
                operator: Operator::PostMul,
                value: *value,
                penalty_exempt: false,
            })
            .collect();
        let mut reversed = contributions.clone();
        reversed.reverse();

        let def = AttributeDef::new(TGT).non_stackable();
        let forward = combine(Some(10.0), &def, &contributions).unwrap().value;
        let backward = combine(Some(10.0), &def, &reversed).unwrap().value;
        prop_assert!((forward - backward).abs() <= forward.abs() * 1e-12);
    }

    /// Adding modules and removing them again restores the exact base.
    #[test]
    fn prop_fit_round_trip(
        percents in prop::collection::vec(-50.0..50.0f64, 1..6),
    ) {
        let catalog = Catalog::new().with_attribute(AttributeDef::new(TGT).non_stackable());
        let mut fit = Fit::new(Arc::new(catalog));
        let ship = fit.add(
            Arc::new(ItemDefinition::new(TypeId(587), GroupId(25)).with_attribute(TGT, 250.0)),
            Placement::Ship,
        );
        prop_assert_eq!(fit.attribute(ship, TGT).unwrap(), 250.0);
        let nodes = fit.graph().node_count();

        let modules: Vec<HolderId> = percents
            .iter()
            .enumerate()
            .map(|(i, percent)| {
                let module = ItemDefinition::new(TypeId(i as u32 + 10), GroupId(1))
                    .with_attribute(SRC, *percent)
                    .with_effect(
                        Effect::new(EffectId(1), EffectCategory::Passive).with_modifier(
                            Modifier::new(SRC, TGT, Operator::PostPercent)
                                .with_domain(Domain::Carrier),
                        ),
                    );
                fit.add(Arc::new(module), Placement::Low)
            })
            .collect();
        prop_assert!(fit.attribute(ship, TGT).unwrap() > 0.0);

        for id in modules {
            fit.remove(id).unwrap();
        }
        prop_assert_eq!(fit.attribute(ship, TGT).unwrap(), 250.0);
        prop_assert_eq!(fit.graph().node_count(), nodes);
    }
}
