//! Ranking engine — release reception, stat deltas and the global chart.
//!
//! Three operations:
//!   1. `calculate_ranking_update` turns a music-quality signal into a
//!      bounded `RankingUpdate` (pure apart from the injected rolls).
//!   2. `apply_ranking_update` applies it to one user: fame clamped to
//!      [1, 100], streams/fans floored at 0, and a provisional chart move.
//!   3. `update_global_rankings` is the authoritative chart: a full scan
//!      that clears every position and assigns 1..=N to the top N scores.
//!
//! Roll order in `calculate_ranking_update` (fixed, tests depend on it):
//!   market response, viral trial, chart movement (only when moving).

use crate::{
    config::{EngineConfig, RankingConfig},
    error::{ProgressionError, ProgressionResult},
    model::{UserProgress, FAME_MAX, FAME_MIN, UNRANKED},
    rng::Roll,
    score_model,
    store::ProgressStore,
    types::{Timestamp, UserId},
};
use serde::{Deserialize, Serialize};

pub const VIRAL_REASON: &str = "Viral hit! 🔥";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingUpdate {
    pub fame_change: i64,
    pub daily_streams_change: i64,
    pub total_streams_change: i64,
    pub fanbase_change: i64,
    /// Negative moves up the chart (towards position 1).
    pub chart_position_change: i64,
    pub market_response: f64,
    pub viral: bool,
    pub release_impact: i64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeaderboardEntry {
    pub position: i64,
    pub user_id: UserId,
    pub display_name: String,
    pub score: f64,
    pub fame: i64,
    pub fanbase: i64,
    pub total_streams: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Leaderboard {
    /// Users that qualified for scoring (any activity at all).
    pub active_users: usize,
    pub entries: Vec<LeaderboardEntry>,
}

fn reception(music_quality: f64) -> &'static str {
    if music_quality > 0.8 {
        "Strong reception"
    } else if music_quality >= 0.5 {
        "Solid release"
    } else if music_quality >= 0.3 {
        "Mixed reception"
    } else {
        "Poor reception"
    }
}

/// Score a release. Quality below 0.3 (streams) or 0.4 (fans) produces
/// negative deltas: a poorly received release costs audience.
pub fn calculate_ranking_update(
    music_quality: f64,
    release_impact: i64,
    config: &RankingConfig,
    rng: &mut impl Roll,
) -> ProgressionResult<RankingUpdate> {
    if !music_quality.is_finite() || !(0.0..=1.0).contains(&music_quality) {
        return Err(ProgressionError::InvalidInput(format!(
            "music quality must be within [0, 1], got {music_quality}"
        )));
    }
    if !(0..=100).contains(&release_impact) {
        return Err(ProgressionError::InvalidInput(format!(
            "release impact must be within [0, 100], got {release_impact}"
        )));
    }

    let base_streams_growth = ((music_quality - 0.3) * 5000.0).floor();
    let base_fans_growth = ((music_quality - 0.4) * 1000.0).floor();

    let market_response = 0.5 + 0.5 * rng.next_f64();
    let mut daily_streams_change = (base_streams_growth * market_response).floor() as i64;
    let mut fanbase_change = (base_fans_growth * market_response).floor() as i64;
    let mut total_streams_change = daily_streams_change * 7;

    let viral_chance = if music_quality > config.viral_quality_threshold {
        config.viral_chance_high
    } else {
        config.viral_chance_low
    };
    let viral = rng.chance(viral_chance);
    if viral {
        daily_streams_change *= 5;
        total_streams_change *= 3;
        fanbase_change *= 3;
    }

    let mut fame_change = 0;
    if daily_streams_change > 5000 {
        fame_change += 5;
    }
    if fanbase_change > 500 {
        fame_change += 3;
    }
    if music_quality > 0.8 {
        fame_change += 4;
    }
    if music_quality < 0.3 {
        fame_change -= 2;
    }

    let momentum = (daily_streams_change + fanbase_change) as f64 / 1000.0;
    let chart_position_change = if momentum > 10.0 {
        -rng.range_i64(10, 30)
    } else if momentum < -5.0 {
        rng.range_i64(5, 20)
    } else {
        0
    };

    let reason = if viral { VIRAL_REASON } else { reception(music_quality) };

    log::debug!(
        "ranking: q={music_quality:.2} market={market_response:.2} viral={viral} \
         daily={daily_streams_change:+} fans={fanbase_change:+} fame={fame_change:+} \
         chart={chart_position_change:+}"
    );

    Ok(RankingUpdate {
        fame_change,
        daily_streams_change,
        total_streams_change,
        fanbase_change,
        chart_position_change,
        market_response,
        viral,
        release_impact,
        reason: reason.to_string(),
    })
}

/// Provisional chart position after a move. Entering the chart counts down
/// from the bottom slot; a ranked user can drop out by falling past 0.
pub fn provisional_position(current: i64, change: i64, chart_size: i64) -> i64 {
    if current == UNRANKED {
        if change < 0 {
            chart_size.min(chart_size + change).max(1)
        } else {
            UNRANKED
        }
    } else {
        (current + change).clamp(UNRANKED, chart_size)
    }
}

/// Apply `update` to `user` in place. Pure; the caller persists.
pub fn apply_update_to_user(
    user: &mut UserProgress,
    update: &RankingUpdate,
    config: &RankingConfig,
    now: Timestamp,
) {
    user.fame = (user.fame + update.fame_change).clamp(FAME_MIN, FAME_MAX);
    user.daily_streams = (user.daily_streams + update.daily_streams_change).max(0);
    user.total_streams = (user.total_streams + update.total_streams_change).max(0);
    user.fanbase = (user.fanbase + update.fanbase_change).max(0);
    user.chart_position =
        provisional_position(user.chart_position, update.chart_position_change, config.chart_size);
    user.influence = score_model::influence(user, config);
    user.last_activity_date = Some(now);
}

/// Load, update and persist one user. The chart position written here is a
/// local estimate; callers finalize it with `update_global_rankings`.
pub fn apply_ranking_update(
    store: &ProgressStore,
    config: &EngineConfig,
    user_id: &str,
    update: &RankingUpdate,
    now: Timestamp,
) -> ProgressionResult<UserProgress> {
    let mut user = store.require_user(user_id)?;
    apply_update_to_user(&mut user, update, &config.ranking, now);
    store.save_user(&user)?;
    Ok(user)
}

/// Recompute the whole chart from scratch.
///
/// Ties on score are broken by user_id ascending so the result is a pure
/// function of the stored stats.
pub fn update_global_rankings(
    store: &ProgressStore,
    config: &EngineConfig,
) -> ProgressionResult<Leaderboard> {
    store.transaction(|store| {
        let weights = &config.ranking;
        let mut scored: Vec<(f64, UserProgress)> = store
            .active_users()?
            .into_iter()
            .map(|u| (score_model::ranking_score(&u, weights), u))
            .collect();
        debug_assert!(scored.iter().all(|(_, u)| u.is_active()));
        scored.sort_by(|a, b| {
            b.0.total_cmp(&a.0)
                .then_with(|| a.1.user_id.cmp(&b.1.user_id))
        });

        let active_users = scored.len();
        store.clear_chart_positions()?;

        let mut entries = Vec::new();
        for (idx, (score, user)) in scored
            .into_iter()
            .take(weights.chart_size.max(0) as usize)
            .enumerate()
        {
            let position = idx as i64 + 1;
            store.set_chart_position(&user.user_id, position)?;
            entries.push(LeaderboardEntry {
                position,
                user_id: user.user_id,
                display_name: user.display_name,
                score,
                fame: user.fame,
                fanbase: user.fanbase,
                total_streams: user.total_streams,
            });
        }

        log::info!("rankings: {active_users} active users, {} charted", entries.len());
        Ok(Leaderboard { active_users, entries })
    })
}

/// The current chart as last computed, top `limit` positions.
pub fn leaderboard(
    store: &ProgressStore,
    config: &EngineConfig,
    limit: usize,
) -> ProgressionResult<Vec<LeaderboardEntry>> {
    let entries = store
        .ranked_users(limit)?
        .into_iter()
        .map(|u| LeaderboardEntry {
            position: u.chart_position,
            score: score_model::ranking_score(&u, &config.ranking),
            user_id: u.user_id,
            display_name: u.display_name,
            fame: u.fame,
            fanbase: u.fanbase,
            total_streams: u.total_streams,
        })
        .collect();
    Ok(entries)
}
