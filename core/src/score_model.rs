//! Score model — pure functions over a user's stat vector.
//!
//! score = fame*1000 + total_streams*0.01 + daily_streams*1 + fanbase*10
//! (weights from `RankingConfig`). Fame dominates; lifetime streams only
//! nudge the order so stream farming cannot buy the top of the chart.

use crate::{config::RankingConfig, model::UserProgress};

pub fn ranking_score(user: &UserProgress, weights: &RankingConfig) -> f64 {
    user.fame as f64 * weights.fame_weight
        + user.total_streams as f64 * weights.total_streams_weight
        + user.daily_streams as f64 * weights.daily_streams_weight
        + user.fanbase as f64 * weights.fanbase_weight
}

/// Influence is the ranking score expressed in fame-point units.
pub fn influence(user: &UserProgress, weights: &RankingConfig) -> i64 {
    (ranking_score(user, weights) / weights.fame_weight.max(1.0)).floor() as i64
}

/// Career level name derived from accumulated experience.
pub fn career_level(experience: i64) -> &'static str {
    match experience {
        i64::MIN..=99 => "Newcomer",
        100..=999 => "Rising Artist",
        1000..=4999 => "Established Artist",
        5000..=9999 => "Headliner",
        _ => "Legend",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::EngineConfig, model::UserProgress};
    use chrono::Utc;

    fn user(fame: i64, total: i64, daily: i64, fans: i64) -> UserProgress {
        let mut u = UserProgress::new_account("u".into(), "U".into(), &EngineConfig::default(), Utc::now());
        u.fame = fame;
        u.total_streams = total;
        u.daily_streams = daily;
        u.fanbase = fans;
        u
    }

    #[test]
    fn score_uses_documented_weights() {
        let cfg = EngineConfig::default();
        let score = ranking_score(&user(10, 100_000, 500, 40), &cfg.ranking);
        assert!((score - (10_000.0 + 1_000.0 + 500.0 + 400.0)).abs() < 1e-9);
    }

    #[test]
    fn one_fame_point_outweighs_large_stream_counts() {
        let cfg = EngineConfig::default();
        let famous = ranking_score(&user(11, 0, 0, 0), &cfg.ranking);
        let farmer = ranking_score(&user(10, 90_000, 0, 0), &cfg.ranking);
        assert!(famous > farmer);
    }

    #[test]
    fn levels_follow_experience_bands() {
        assert_eq!(career_level(0), "Newcomer");
        assert_eq!(career_level(100), "Rising Artist");
        assert_eq!(career_level(3500), "Established Artist");
        assert_eq!(career_level(9999), "Headliner");
        assert_eq!(career_level(10_000), "Legend");
    }
}
