use crate::{
    career_progression::ReleaseRequest,
    engine::ProgressionEngine,
    error::{ProgressionError, ProgressionResult},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// All commands the runner accepts, one JSON object per line.
/// Variants are appended — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ProgressCommand {
    // ── Accounts ──────────────────────────────────
    RegisterUser {
        user_id: String,
        display_name: String,
    },
    RegisterCard {
        owner_id: String,
        #[serde(default)]
        card_id: Option<String>,
        name: String,
        genre: String,
    },
    GetUser {
        user_id: String,
    },

    // ── Releases and ranking ──────────────────────
    Release(ReleaseRequest),
    RecomputeRankings,
    Leaderboard {
        #[serde(default = "default_limit")]
        limit: usize,
    },

    // ── Growth ────────────────────────────────────
    DailyGrowth {
        card_id: String,
    },
    CheckAchievements {
        card_id: String,
    },
    CareerOverview {
        card_id: String,
    },

    // ── Economy ───────────────────────────────────
    ApplyTier {
        user_id: String,
        tier: String,
    },
    SpendCredits {
        user_id: String,
        amount: i64,
        #[serde(default)]
        reason: String,
    },
    CheckGeneration {
        user_id: String,
    },
    GenerateBand {
        user_id: String,
    },

    // ── Scheduling ────────────────────────────────
    RunBatch,
    AdvanceClock {
        hours: i64,
    },
}

fn default_limit() -> usize {
    100
}

impl ProgressCommand {
    /// Run the command against `engine` and render its result as JSON.
    pub fn execute(self, engine: &mut ProgressionEngine) -> ProgressionResult<Value> {
        let value = match self {
            Self::RegisterUser { user_id, display_name } => {
                serde_json::to_value(engine.register_user(&user_id, &display_name)?)?
            }
            Self::RegisterCard { owner_id, card_id, name, genre } => serde_json::to_value(
                engine.register_card(&owner_id, card_id.as_deref(), &name, &genre)?,
            )?,
            Self::GetUser { user_id } => {
                let user = engine.user(&user_id)?;
                let cards = engine.cards_for_owner(&user_id)?;
                json!({ "user": user, "cards": cards })
            }
            Self::Release(request) => serde_json::to_value(engine.release_new_music(&request)?)?,
            Self::RecomputeRankings => serde_json::to_value(engine.update_global_rankings()?)?,
            Self::Leaderboard { limit } => serde_json::to_value(engine.leaderboard(limit)?)?,
            Self::DailyGrowth { card_id } => serde_json::to_value(engine.apply_daily_growth(&card_id)?)?,
            Self::CheckAchievements { card_id } => {
                serde_json::to_value(engine.check_and_award_achievements(&card_id)?)?
            }
            Self::CareerOverview { card_id } => {
                serde_json::to_value(engine.artist_career_overview(&card_id)?)?
            }
            Self::ApplyTier { user_id, tier } => {
                serde_json::to_value(engine.apply_subscription_tier(&user_id, &tier)?)?
            }
            Self::SpendCredits { user_id, amount, reason } => {
                serde_json::to_value(engine.spend_credits(&user_id, amount, &reason)?)?
            }
            Self::CheckGeneration { user_id } => {
                serde_json::to_value(engine.check_band_generation(&user_id)?)?
            }
            Self::GenerateBand { user_id } => {
                serde_json::to_value(engine.consume_band_generation(&user_id)?)?
            }
            Self::RunBatch => {
                let events = engine.run_batch()?;
                json!({ "events": events.len() })
            }
            Self::AdvanceClock { hours } => {
                if hours <= 0 {
                    return Err(ProgressionError::InvalidInput(format!(
                        "clock can only move forward, got {hours}h"
                    )));
                }
                let by = Duration::try_hours(hours).ok_or_else(|| {
                    ProgressionError::InvalidInput(format!("clock step of {hours}h is out of range"))
                })?;
                let now = engine.advance_clock(by)?;
                json!({ "now": now })
            }
        };
        Ok(value)
    }
}
