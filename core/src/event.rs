//! The progression event log.
//!
//! RULE: Every state-changing engine operation records what it did as a
//! `ProgressionEvent`. The log is append-only and is the audit trail the
//! API layer reads to build activity feeds.

use crate::types::{CardId, ReleaseId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// Every event emitted by the engine.
/// Variants are appended — never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressionEvent {
    // ── Accounts ───────────────────────────────────
    UserRegistered {
        user_id: UserId,
    },
    CardRegistered {
        card_id: CardId,
        owner_id: UserId,
        genre: String,
    },

    // ── Releases and ranking ───────────────────────
    ReleaseScored {
        card_id: CardId,
        release_id: ReleaseId,
        genre_consistency: f64,
        release_impact: i64,
    },
    RankingApplied {
        user_id: UserId,
        fame_change: i64,
        daily_streams_change: i64,
        fanbase_change: i64,
        provisional_position: i64,
        viral: bool,
    },
    LeaderboardRecomputed {
        active_users: usize,
        ranked_users: usize,
    },

    // ── Growth and milestones ──────────────────────
    DailyGrowthApplied {
        card_id: CardId,
        fame_growth: f64,
        streams: i64,
        digital: i64,
        physical: i64,
        streak: i64,
    },
    AchievementAwarded {
        card_id: CardId,
        achievement_type: String,
        sales_at_achievement: i64,
        fame_increase: i64,
    },

    // ── Economy ────────────────────────────────────
    TierApplied {
        user_id: UserId,
        tier: String,
    },
    CreditsRenewed {
        user_id: UserId,
        amount: i64,
    },
    CreditsSpent {
        user_id: UserId,
        amount: i64,
        reason: String,
    },
    CreditSpendRejected {
        user_id: UserId,
        amount: i64,
        balance: i64,
    },
    BandGenerationConsumed {
        user_id: UserId,
        via: String,
    },
}

impl ProgressionEvent {
    /// Stable string name used for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "user_registered",
            Self::CardRegistered { .. } => "card_registered",
            Self::ReleaseScored { .. } => "release_scored",
            Self::RankingApplied { .. } => "ranking_applied",
            Self::LeaderboardRecomputed { .. } => "leaderboard_recomputed",
            Self::DailyGrowthApplied { .. } => "daily_growth_applied",
            Self::AchievementAwarded { .. } => "achievement_awarded",
            Self::TierApplied { .. } => "tier_applied",
            Self::CreditsRenewed { .. } => "credits_renewed",
            Self::CreditsSpent { .. } => "credits_spent",
            Self::CreditSpendRejected { .. } => "credit_spend_rejected",
            Self::BandGenerationConsumed { .. } => "band_generation_consumed",
        }
    }

    /// The user or card the event is about.
    pub fn subject_id(&self) -> &str {
        match self {
            Self::UserRegistered { user_id }
            | Self::RankingApplied { user_id, .. }
            | Self::TierApplied { user_id, .. }
            | Self::CreditsRenewed { user_id, .. }
            | Self::CreditsSpent { user_id, .. }
            | Self::CreditSpendRejected { user_id, .. }
            | Self::BandGenerationConsumed { user_id, .. } => user_id,
            Self::CardRegistered { card_id, .. }
            | Self::ReleaseScored { card_id, .. }
            | Self::DailyGrowthApplied { card_id, .. }
            | Self::AchievementAwarded { card_id, .. } => card_id,
            Self::LeaderboardRecomputed { .. } => "leaderboard",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub subject_id: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized ProgressionEvent
    pub created_at: Timestamp,
}
