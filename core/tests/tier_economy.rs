//! Subscription tier and credit economy tests.
//!
//! Tests cover: the tier ratchet, unknown tiers, credit spending, monthly
//! renewal and the band generation allowance.

use bandcard_core::{
    engine::ProgressionEngine,
    error::ProgressionError,
    tier_economy::{DenialReason, GenerationAllowance, SpendOutcome, SubscriptionTier, UNLIMITED_GENERATIONS},
};
use chrono::Duration;

fn build(seed: u64) -> ProgressionEngine {
    let mut engine = ProgressionEngine::build_test(seed).expect("build test engine");
    engine.register_user("u1", "User One").unwrap();
    engine
}

#[test]
fn new_accounts_start_on_fan_defaults() {
    let engine = build(1);
    let user = engine.user("u1").unwrap();
    assert_eq!(user.subscription_tier, SubscriptionTier::Fan);
    assert_eq!(user.credits, 500);
    assert_eq!(user.fame, 1);
    assert_eq!(user.experience, 0);
    assert_eq!(user.level, "Newcomer");
    assert_eq!(user.free_band_generations_remaining, 1);
}

#[test]
fn downgrade_never_lowers_stats() {
    let mut engine = build(2);

    let artist = engine.apply_subscription_tier("u1", "Artist").unwrap();
    assert_eq!(artist.credits, 1500);
    assert_eq!(artist.fame, 5);
    assert_eq!(artist.experience, 100);
    assert_eq!(artist.free_band_generations_remaining, 6);

    let fan = engine.apply_subscription_tier("u1", "Fan").unwrap();
    assert_eq!(fan.subscription_tier, SubscriptionTier::Fan);
    assert_eq!(fan.subscription_price, 0.0);
    assert_eq!(fan.credits, 1500);
    assert_eq!(fan.fame, 5);
    assert_eq!(fan.experience, 100);
    assert_eq!(fan.free_band_generations_remaining, 6);
}

#[test]
fn upgrade_keeps_stats_already_above_the_floor() {
    let mut engine = build(3);
    let mut user = engine.user("u1").unwrap();
    user.credits = 20_000;
    user.fame = 40;
    user.band_generation_count = 7;
    engine.store().save_user(&user).unwrap();

    let label = engine.apply_subscription_tier("u1", "Record Label").unwrap();
    assert_eq!(label.credits, 20_000);
    assert_eq!(label.fame, 40);
    assert_eq!(label.experience, 3500);
    assert_eq!(label.level, "Established Artist");
    assert_eq!(label.band_generation_count, 7, "lifetime count is never touched");
}

#[test]
fn mogul_grants_unlimited_generations() {
    let mut engine = build(4);
    let mogul = engine.apply_subscription_tier("u1", "mogul").unwrap();
    assert_eq!(mogul.subscription_tier, SubscriptionTier::Mogul);
    assert_eq!(mogul.free_band_generations_remaining, UNLIMITED_GENERATIONS);

    assert_eq!(
        engine.consume_band_generation("u1").unwrap(),
        GenerationAllowance::Free { remaining_after: None }
    );
    let after = engine.user("u1").unwrap();
    assert_eq!(after.free_band_generations_remaining, UNLIMITED_GENERATIONS);
    assert_eq!(after.band_generation_count, 1);
}

#[test]
fn unknown_tier_is_rejected_untouched() {
    let mut engine = build(5);
    let before = engine.user("u1").unwrap();

    let err = engine.apply_subscription_tier("u1", "Platinum").unwrap_err();
    assert!(matches!(err, ProgressionError::InvalidTier { ref name } if name == "Platinum"));
    assert_eq!(engine.user("u1").unwrap(), before);
    assert_eq!(engine.store().event_count("tier_applied").unwrap(), 0);
}

#[test]
fn tier_names_parse_both_spellings() {
    assert_eq!("Record Label".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::RecordLabel);
    assert_eq!("record_label".parse::<SubscriptionTier>().unwrap(), SubscriptionTier::RecordLabel);
    assert!("gold".parse::<SubscriptionTier>().is_err());
}

#[test]
fn spending_more_than_the_balance_is_refused() {
    let mut engine = build(6);

    let refused = engine.spend_credits("u1", 600, "cover art").unwrap();
    assert_eq!(refused, SpendOutcome::Insufficient { balance: 500, required: 600 });
    assert!(!refused.succeeded());
    assert_eq!(engine.user("u1").unwrap().credits, 500);
    assert_eq!(engine.store().event_count("credit_spend_rejected").unwrap(), 1);

    let spent = engine.spend_credits("u1", 100, "cover art").unwrap();
    assert_eq!(spent, SpendOutcome::Spent { remaining: 400 });
    assert!(spent.succeeded());
    let user = engine.user("u1").unwrap();
    assert_eq!(user.credits, 400);
    assert_eq!(user.total_credits_spent, 100);
}

#[test]
fn non_positive_spend_is_invalid() {
    let mut engine = build(7);
    let err = engine.spend_credits("u1", 0, "nothing").unwrap_err();
    assert!(matches!(err, ProgressionError::InvalidInput(_)));
}

#[test]
fn renewal_happens_once_per_interval() {
    let mut engine = build(8);
    engine.apply_subscription_tier("u1", "Artist").unwrap();
    engine.register_user("fan", "Fan").unwrap();

    assert!(engine.process_monthly_credits().unwrap().is_empty(), "not due on signup day");

    engine.advance_clock(Duration::days(30)).unwrap();
    let renewed = engine.process_monthly_credits().unwrap();
    assert_eq!(renewed.len(), 1, "fans are never renewed");
    assert_eq!(renewed[0].user_id, "u1");
    assert_eq!(renewed[0].amount, 1500);
    assert_eq!(renewed[0].new_balance, 3000);

    assert!(engine.process_monthly_credits().unwrap().is_empty(), "rerun must not double credit");
    engine.advance_clock(Duration::days(10)).unwrap();
    assert!(engine.process_monthly_credits().unwrap().is_empty());

    engine.advance_clock(Duration::days(20)).unwrap();
    assert_eq!(engine.process_monthly_credits().unwrap().len(), 1);

    let user = engine.user("u1").unwrap();
    assert_eq!(user.credits, 4500);
    assert_eq!(user.total_credits_earned, 4500);
    assert_eq!(engine.store().event_count("credits_renewed").unwrap(), 2);
}

#[test]
fn generations_use_free_allowance_then_credits() {
    let mut engine = build(9);

    assert_eq!(
        engine.check_band_generation("u1").unwrap(),
        GenerationAllowance::Free { remaining_after: Some(0) }
    );
    engine.consume_band_generation("u1").unwrap();

    assert_eq!(engine.check_band_generation("u1").unwrap(), GenerationAllowance::Credits { cost: 250 });
    assert!(engine.consume_band_generation("u1").unwrap().is_allowed());
    engine.consume_band_generation("u1").unwrap();

    let broke = engine.user("u1").unwrap();
    assert_eq!(broke.credits, 0);
    assert_eq!(broke.band_generation_count, 3);

    let denied = engine.consume_band_generation("u1").unwrap();
    assert!(!denied.is_allowed());
    assert_eq!(
        denied,
        GenerationAllowance::Denied {
            reason: DenialReason::InsufficientCredits { balance: 0, cost: 250 }
        }
    );
    assert_eq!(engine.user("u1").unwrap().band_generation_count, 3);
    assert_eq!(engine.store().event_count("band_generation_consumed").unwrap(), 3);
}

#[test]
fn unknown_user_is_reported() {
    let mut engine = build(10);
    let err = engine.spend_credits("ghost", 10, "x").unwrap_err();
    assert!(matches!(err, ProgressionError::UserNotFound { .. }));
}
