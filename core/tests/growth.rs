//! Passive growth tests.
//!
//! Tests cover: the daily formulas, the 24h cooldown, streaks, owner
//! stream aggregation and milestone multipliers.

use bandcard_core::{
    engine::ProgressionEngine,
    growth_engine::{self, GrowthOutcome, SalesTotals},
    rng::ScriptedRolls,
    tier_economy::SubscriptionTier,
};
use chrono::Duration;

fn build_with_card(seed: u64) -> ProgressionEngine {
    let mut engine = ProgressionEngine::build_test(seed).expect("build test engine");
    engine.register_user("owner", "Owner").unwrap();
    engine.register_card("owner", Some("card-1"), "The Night Shift", "House").unwrap();
    engine
}

fn grow(engine: &ProgressionEngine, rolls: &mut ScriptedRolls) -> GrowthOutcome {
    growth_engine::apply_daily_growth(engine.store(), &engine.config, "card-1", engine.now(), rolls)
        .expect("growth")
}

#[test]
fn first_tick_applies_documented_formulas() {
    let engine = build_with_card(1);
    // Variance roll 0.0 -> r = 0.8.
    let mut rolls = ScriptedRolls::new([0.0]);

    let GrowthOutcome::Applied { growth, card, achievements } = grow(&engine, &mut rolls) else {
        panic!("a fresh card must be eligible");
    };

    assert_eq!(growth.fame_growth, 1.0, "Fan base growth, no milestone");
    assert_eq!(growth.streams, 80);
    assert_eq!(growth.digital, 4);
    assert_eq!(growth.physical, 0);
    assert_eq!(card.current_fame, 6.0);
    assert_eq!(card.total_streams, 80);
    assert_eq!(card.daily_growth_streak, 1);
    assert!(achievements.is_empty());

    let owner = engine.user("owner").unwrap();
    assert_eq!(owner.total_streams, 80, "card streams roll up to the owner");
}

#[test]
fn second_tick_inside_cooldown_is_rejected() {
    let mut engine = build_with_card(2);
    let mut rolls = ScriptedRolls::new([0.5]);
    grow(&engine, &mut rolls);
    let before = engine.card("card-1").unwrap();

    engine.advance_clock(Duration::hours(23)).unwrap();
    let GrowthOutcome::NotYetEligible { hours_remaining } = grow(&engine, &mut rolls) else {
        panic!("growth inside the cooldown must be rejected");
    };
    assert!((hours_remaining - 1.0).abs() < 1e-9, "expected 1h left, got {hours_remaining}");
    assert_eq!(engine.card("card-1").unwrap(), before, "rejected tick must not touch the card");
    assert_eq!(rolls.consumed(), 1, "no variance drawn for a rejected tick");
}

#[test]
fn streak_counts_consecutive_days_and_resets_after_a_gap() {
    let mut engine = build_with_card(3);
    let mut rolls = ScriptedRolls::new([0.5]);

    grow(&engine, &mut rolls);
    engine.advance_clock(Duration::hours(24)).unwrap();
    grow(&engine, &mut rolls);
    engine.advance_clock(Duration::hours(30)).unwrap();
    grow(&engine, &mut rolls);
    assert_eq!(engine.card("card-1").unwrap().daily_growth_streak, 3);

    engine.advance_clock(Duration::hours(72)).unwrap();
    grow(&engine, &mut rolls);
    assert_eq!(engine.card("card-1").unwrap().daily_growth_streak, 1);
}

#[test]
fn milestones_multiply_passive_fame() {
    let engine = build_with_card(4);
    let totals = SalesTotals { physical: 0, digital: 100_000, streams: 500_000 };
    let mut rolls = ScriptedRolls::new([0.0]);

    let growth = growth_engine::calculate_daily_growth(
        10.0,
        totals,
        SubscriptionTier::Artist,
        &engine.config,
        &mut rolls,
    )
    .unwrap();

    assert_eq!(growth.milestone_boost, 1.05);
    assert!((growth.fame_growth - 1.5 * 1.05).abs() < 1e-9);
}

#[test]
fn highest_reached_milestone_wins() {
    let engine = build_with_card(5);
    let milestones = &engine.config.milestones;
    assert_eq!(growth_engine::milestone_boost(0, milestones), 1.0);
    assert_eq!(growth_engine::milestone_boost(499_999, milestones), 1.0);
    assert_eq!(growth_engine::milestone_boost(2_000_000, milestones), 1.25);
    assert_eq!(growth_engine::milestone_boost(50_000_000, milestones), 1.45);
}

#[test]
fn crossing_a_threshold_during_growth_awards_it() {
    let engine = build_with_card(6);
    let mut card = engine.card("card-1").unwrap();
    card.total_streams = 499_990;
    engine.store().save_card(&card).unwrap();

    let mut rolls = ScriptedRolls::new([0.0]);
    let GrowthOutcome::Applied { achievements, .. } = grow(&engine, &mut rolls) else {
        panic!("card should be eligible");
    };
    assert_eq!(achievements.len(), 1);
    assert_eq!(achievements[0].achievement.achievement_type, "gold");
}

#[test]
fn engine_growth_is_logged() {
    let mut engine = build_with_card(7);
    let outcome = engine.apply_daily_growth("card-1").unwrap();
    assert!(matches!(outcome, GrowthOutcome::Applied { .. }));

    let again = engine.apply_daily_growth("card-1").unwrap();
    assert!(matches!(again, GrowthOutcome::NotYetEligible { .. }));

    let logged = engine.store().event_count("daily_growth_applied").unwrap();
    assert_eq!(logged, 1, "only the applied tick is logged");
}

#[test]
fn unknown_card_is_an_error() {
    let mut engine = build_with_card(8);
    assert!(engine.apply_daily_growth("nope").is_err());
}
