//! Ranking engine tests.
//!
//! Tests cover: release scoring formulas, fame bounds, provisional chart
//! moves, and the global leaderboard recompute.

use bandcard_core::{
    config::EngineConfig,
    engine::ProgressionEngine,
    error::ProgressionError,
    model::{FAME_MAX, FAME_MIN, UNRANKED},
    ranking_engine::{self, RankingUpdate, VIRAL_REASON},
    rng::ScriptedRolls,
};

fn build(seed: u64) -> ProgressionEngine {
    ProgressionEngine::build_test(seed).expect("build test engine")
}

fn update(fame_change: i64, streams: i64, fans: i64, chart: i64) -> RankingUpdate {
    RankingUpdate {
        fame_change,
        daily_streams_change: streams,
        total_streams_change: streams * 7,
        fanbase_change: fans,
        chart_position_change: chart,
        market_response: 1.0,
        viral: false,
        release_impact: 50,
        reason: "Solid release".into(),
    }
}

/// Register `n` users with strictly decreasing activity: user-000 is the best.
fn seed_active_users(engine: &mut ProgressionEngine, n: usize) {
    for i in 0..n {
        let id = format!("user-{i:03}");
        engine.register_user(&id, &format!("Artist {i}")).unwrap();
        let mut user = engine.user(&id).unwrap();
        user.fame = (2 + (n - i) as i64 / 2).min(FAME_MAX);
        user.total_streams = ((n - i) * 1_000) as i64;
        engine.store().save_user(&user).unwrap();
    }
}

#[test]
fn strong_release_without_viral_hit() {
    let config = EngineConfig::default();
    let mut rolls = ScriptedRolls::new([1.0, 0.99]);

    let u = ranking_engine::calculate_ranking_update(0.9, 80, &config.ranking, &mut rolls).unwrap();

    assert_eq!(u.daily_streams_change, 3000);
    assert_eq!(u.total_streams_change, 21_000);
    assert_eq!(u.fanbase_change, 500);
    // Only the quality bonus: 3000 streams and 500 fans stay under their thresholds.
    assert_eq!(u.fame_change, 4);
    assert_eq!(u.chart_position_change, 0);
    assert!(!u.viral);
    assert_eq!(u.reason, "Strong reception");
    assert_eq!(rolls.consumed(), 2, "chart roll must be skipped when momentum is flat");
}

#[test]
fn viral_hit_multiplies_and_climbs_the_chart() {
    let config = EngineConfig::default();
    let mut rolls = ScriptedRolls::new([1.0, 0.0, 0.5]);

    let u = ranking_engine::calculate_ranking_update(0.9, 80, &config.ranking, &mut rolls).unwrap();

    assert!(u.viral);
    assert_eq!(u.daily_streams_change, 15_000);
    assert_eq!(u.total_streams_change, 63_000);
    assert_eq!(u.fanbase_change, 1_500);
    assert_eq!(u.fame_change, 5 + 3 + 4);
    // 10 + floor(0.5 * 20) places up the chart.
    assert_eq!(u.chart_position_change, -20);
    assert_eq!(u.reason, VIRAL_REASON);
    assert_eq!(rolls.consumed(), 3);
}

#[test]
fn poor_release_loses_audience() {
    let config = EngineConfig::default();
    let mut rolls = ScriptedRolls::new([0.0, 0.99]);

    let u = ranking_engine::calculate_ranking_update(0.1, 10, &config.ranking, &mut rolls).unwrap();

    assert!(u.daily_streams_change < 0);
    assert!(u.fanbase_change < 0);
    assert_eq!(u.fame_change, -2);
    assert_eq!(u.reason, "Poor reception");
}

#[test]
fn viral_flop_falls_down_the_chart() {
    let config = EngineConfig::default();
    let mut rolls = ScriptedRolls::new([1.0, 0.0, 0.5]);

    let u = ranking_engine::calculate_ranking_update(0.0, 0, &config.ranking, &mut rolls).unwrap();

    assert!(u.viral, "the low-quality viral chance still fires on a zero roll");
    assert_eq!(u.daily_streams_change, -7_500);
    assert_eq!(u.total_streams_change, -31_500);
    assert_eq!(u.fanbase_change, -1_200);
    assert_eq!(u.fame_change, -2);
    // momentum -8.7 moves down 5 + floor(0.5 * 15) places.
    assert_eq!(u.chart_position_change, 12);
    assert_eq!(rolls.consumed(), 3);
}

#[test]
fn viral_chance_rises_above_the_quality_threshold() {
    let config = EngineConfig::default();

    let mut rolls = ScriptedRolls::new([0.0, 0.02, 0.0]);
    let at_threshold =
        ranking_engine::calculate_ranking_update(0.7, 50, &config.ranking, &mut rolls).unwrap();
    assert!(!at_threshold.viral, "0.7 is not above the threshold, so the chance is 1%");

    let mut rolls = ScriptedRolls::new([0.0, 0.02, 0.0]);
    let above = ranking_engine::calculate_ranking_update(0.71, 50, &config.ranking, &mut rolls).unwrap();
    assert!(above.viral, "above 0.7 the chance is 5%");
    assert_eq!(above.reason, VIRAL_REASON);
}

#[test]
fn quality_outside_unit_range_is_rejected() {
    let config = EngineConfig::default();
    let mut rolls = ScriptedRolls::new([0.5]);

    let err = ranking_engine::calculate_ranking_update(1.5, 50, &config.ranking, &mut rolls).unwrap_err();
    assert!(matches!(err, ProgressionError::InvalidInput(_)));
    assert_eq!(rolls.consumed(), 0);
}

#[test]
fn provisional_positions_follow_entry_rules() {
    assert_eq!(ranking_engine::provisional_position(UNRANKED, -20, 100), 80);
    assert_eq!(ranking_engine::provisional_position(UNRANKED, 7, 100), UNRANKED);
    assert_eq!(ranking_engine::provisional_position(40, -15, 100), 25);
    assert_eq!(ranking_engine::provisional_position(95, 12, 100), 100);
    // A ranked user moving past the top slot drops off the provisional chart.
    assert_eq!(ranking_engine::provisional_position(3, -5, 100), UNRANKED);
    assert_eq!(ranking_engine::provisional_position(3, -3, 100), UNRANKED);
    assert_eq!(ranking_engine::provisional_position(3, -2, 100), 1);
}

#[test]
fn fame_stays_within_bounds() {
    let mut engine = build(1);
    engine.register_user("u1", "One").unwrap();

    let user = engine.apply_ranking_update("u1", &update(500, 100, 10, 0)).unwrap();
    assert_eq!(user.fame, FAME_MAX);

    let user = engine.apply_ranking_update("u1", &update(-500, -10_000, -10_000, 0)).unwrap();
    assert_eq!(user.fame, FAME_MIN);
    assert_eq!(user.daily_streams, 0, "streams floor at zero");
    assert_eq!(user.fanbase, 0, "fanbase floors at zero");
}

#[test]
fn applied_update_settles_into_the_global_chart() {
    let mut engine = build(2);
    engine.register_user("u1", "One").unwrap();
    engine.register_user("u2", "Two").unwrap();

    engine.apply_ranking_update("u1", &update(3, 1_000, 100, -20)).unwrap();
    let top = engine.apply_ranking_update("u2", &update(10, 5_000, 800, -20)).unwrap();

    assert_eq!(top.chart_position, 1);
    assert_eq!(engine.user("u1").unwrap().chart_position, 2);
    assert!(top.last_activity_date.is_some());
    assert!(top.influence > 0);
}

#[test]
fn chart_positions_are_unique_and_capped() {
    let mut engine = build(3);
    seed_active_users(&mut engine, 105);
    engine.register_user("idle", "Idle").unwrap();

    let board = engine.update_global_rankings().unwrap();

    assert_eq!(board.active_users, 105, "the blank account is not active");
    assert_eq!(board.entries.len(), 100);

    let mut positions: Vec<i64> = board.entries.iter().map(|e| e.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, (1..=100).collect::<Vec<_>>());

    let stored = engine.leaderboard(200).unwrap();
    assert_eq!(stored.len(), 100);
    assert_eq!(stored[0].user_id, "user-000");

    for id in ["user-100", "user-104", "idle"] {
        assert_eq!(engine.user(id).unwrap().chart_position, UNRANKED, "{id} should be unranked");
    }
}

#[test]
fn small_population_fills_exactly_its_size() {
    let mut engine = build(4);
    seed_active_users(&mut engine, 7);

    let board = engine.update_global_rankings().unwrap();
    let positions: Vec<i64> = board.entries.iter().map(|e| e.position).collect();
    assert_eq!(positions, (1..=7).collect::<Vec<_>>());
}

#[test]
fn equal_scores_break_ties_by_user_id() {
    let mut engine = build(5);
    for id in ["zed", "amy", "mia"] {
        engine.register_user(id, id).unwrap();
        let mut user = engine.user(id).unwrap();
        user.fame = 10;
        engine.store().save_user(&user).unwrap();
    }

    let board = engine.update_global_rankings().unwrap();
    let order: Vec<&str> = board.entries.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(order, ["amy", "mia", "zed"]);
}

#[test]
fn recompute_drops_users_that_fell_out_of_the_top() {
    let mut engine = build(6);
    seed_active_users(&mut engine, 100);
    engine.update_global_rankings().unwrap();
    assert_eq!(engine.user("user-099").unwrap().chart_position, 100);

    engine.register_user("star", "Star").unwrap();
    engine.apply_ranking_update("star", &update(99, 50_000, 5_000, -30)).unwrap();

    assert_eq!(engine.user("star").unwrap().chart_position, 1);
    let dropped = engine.user("user-099").unwrap();
    assert_eq!(dropped.chart_position, UNRANKED);
    assert!(!dropped.is_ranked());
    assert!(dropped.is_active(), "still active, just outside the top 100");
}

#[test]
fn engine_scores_with_its_own_stream() {
    let mut engine = build(7);
    engine.register_user("u1", "One").unwrap();

    let scored = engine.calculate_ranking_update(0.95, 100).unwrap();
    assert!((0.5..=1.0).contains(&scored.market_response));
    assert!(scored.daily_streams_change > 0);

    let user = engine.apply_ranking_update("u1", &scored).unwrap();
    assert_eq!(user.chart_position, 1);
    assert_eq!(engine.store().event_count("ranking_applied").unwrap(), 1);
    assert_eq!(engine.store().event_count("leaderboard_recomputed").unwrap(), 1);
}
