//! Milestone achievement tests.

use bandcard_core::{achievement_engine, engine::ProgressionEngine, model::FAME_MAX};

fn build(seed: u64) -> ProgressionEngine {
    let mut engine = ProgressionEngine::build_test(seed).expect("build test engine");
    engine.register_user("owner", "Owner").unwrap();
    engine.register_card("owner", Some("card-1"), "Glass Harbor", "Indie").unwrap();
    engine
}

fn set_sales(engine: &ProgressionEngine, streams: i64, fame: f64) {
    let mut card = engine.card("card-1").unwrap();
    card.total_streams = streams;
    card.current_fame = fame;
    engine.store().save_card(&card).unwrap();
}

#[test]
fn gold_then_platinum_each_awarded_once() {
    let mut engine = build(1);
    set_sales(&engine, 600_000, 20.0);

    let first = engine.check_and_award_achievements("card-1").unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].achievement.achievement_type, "gold");
    assert_eq!(first[0].achievement.sales_at_achievement, 600_000);
    assert_eq!(first[0].fame_increase, 1, "floor(20 * 5%)");
    assert_eq!(engine.card("card-1").unwrap().current_fame, 21.0);
    assert_eq!(engine.user("owner").unwrap().fame, 2);

    let repeat = engine.check_and_award_achievements("card-1").unwrap();
    assert!(repeat.is_empty(), "unchanged sales must award nothing");

    let mut card = engine.card("card-1").unwrap();
    card.total_streams = 2_100_000;
    engine.store().save_card(&card).unwrap();

    let second = engine.check_and_award_achievements("card-1").unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].achievement.achievement_type, "platinum");
    assert_eq!(second[0].fame_increase, 5, "floor(21 * 25%)");

    let stored = engine.store().achievements_for_card("card-1").unwrap();
    let types: Vec<&str> = stored.iter().map(|a| a.achievement_type.as_str()).collect();
    assert_eq!(types, ["gold", "platinum"]);
    assert_eq!(engine.store().event_count("achievement_awarded").unwrap(), 2);
}

#[test]
fn jumping_past_several_thresholds_awards_each() {
    let mut engine = build(2);
    set_sales(&engine, 2_100_000, 20.0);

    let awarded = engine.check_and_award_achievements("card-1").unwrap();
    let types: Vec<&str> = awarded.iter().map(|a| a.achievement.achievement_type.as_str()).collect();
    assert_eq!(types, ["gold", "platinum"]);
    // Both boosts use the fame the card had when the check started.
    assert_eq!(awarded[0].fame_increase, 1);
    assert_eq!(awarded[1].fame_increase, 5);
    assert_eq!(engine.card("card-1").unwrap().current_fame, 26.0);
}

#[test]
fn below_first_threshold_awards_nothing() {
    let mut engine = build(3);
    set_sales(&engine, 499_999, 50.0);

    assert!(engine.check_and_award_achievements("card-1").unwrap().is_empty());
    assert!(engine.store().achievements_for_card("card-1").unwrap().is_empty());
}

#[test]
fn owner_fame_boost_is_clamped() {
    let engine = build(4);
    let mut owner = engine.user("owner").unwrap();
    owner.fame = 99;
    engine.store().save_user(&owner).unwrap();
    set_sales(&engine, 10_500_000, 100.0);

    let awarded = achievement_engine::check_and_award_achievements(
        engine.store(),
        &engine.config,
        "card-1",
        engine.now(),
    )
    .unwrap();

    assert_eq!(awarded.len(), 3);
    assert_eq!(engine.user("owner").unwrap().fame, FAME_MAX);
}

#[test]
fn check_on_unknown_card_fails() {
    let mut engine = build(5);
    assert!(engine.check_and_award_achievements("missing").is_err());
}
