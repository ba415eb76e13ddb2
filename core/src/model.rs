//! Persistent records owned by the progression engine.
//!
//! Identity fields of a card (name, genre) belong to the excluded
//! generation subsystem; everything else here is mutated only through the
//! engine components.

use crate::{
    config::EngineConfig,
    score_model,
    tier_economy::SubscriptionTier,
    types::{CardId, ReleaseId, Timestamp, UserId},
};
use serde::{Deserialize, Serialize};

/// Lowest and highest fame a user can hold.
pub const FAME_MIN: i64 = 1;
pub const FAME_MAX: i64 = 100;

/// Chart position of a user outside the Top-N.
pub const UNRANKED: i64 = 0;

/// Fame every new artist card starts with.
pub const CARD_STARTING_FAME: f64 = 5.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProgress {
    pub user_id: UserId,
    pub display_name: String,
    pub fame: i64,
    pub total_streams: i64,
    pub daily_streams: i64,
    pub fanbase: i64,
    pub chart_position: i64,
    pub experience: i64,
    pub influence: i64,
    pub level: String,
    pub subscription_tier: SubscriptionTier,
    pub subscription_price: f64,
    pub credits: i64,
    pub total_credits_earned: i64,
    pub total_credits_spent: i64,
    pub free_band_generations_remaining: i64,
    pub band_generation_count: i64,
    pub last_credit_renewal: Option<Timestamp>,
    pub last_activity_date: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl UserProgress {
    /// A fresh Fan-tier account.
    pub fn new_account(
        user_id: UserId,
        display_name: String,
        config: &EngineConfig,
        now: Timestamp,
    ) -> Self {
        let fan = config.tier(SubscriptionTier::Fan);
        let credits = fan.map(|t| t.starting_credits).unwrap_or(0);
        let fame = fan.map(|t| t.starting_fame).unwrap_or(FAME_MIN);
        let experience = fan.map(|t| t.starting_experience).unwrap_or(0);
        Self {
            user_id,
            display_name,
            fame,
            total_streams: 0,
            daily_streams: 0,
            fanbase: 0,
            chart_position: UNRANKED,
            experience,
            influence: 0,
            level: score_model::career_level(experience).to_string(),
            subscription_tier: SubscriptionTier::Fan,
            subscription_price: fan.map(|t| t.price).unwrap_or(0.0),
            credits,
            total_credits_earned: credits,
            total_credits_spent: 0,
            free_band_generations_remaining: config.economy.new_account_free_generations,
            band_generation_count: 0,
            last_credit_renewal: None,
            last_activity_date: None,
            created_at: now,
        }
    }

    /// Eligible for the leaderboard: anything beyond a blank account.
    pub fn is_active(&self) -> bool {
        self.fame > FAME_MIN || self.total_streams > 0 || self.fanbase > 0
    }

    pub fn is_ranked(&self) -> bool {
        self.chart_position != UNRANKED
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistCard {
    pub card_id: CardId,
    pub owner_id: UserId,
    pub name: String,
    /// Established genre the card was generated with.
    pub genre: String,
    pub current_fame: f64,
    pub physical_copies: i64,
    pub digital_downloads: i64,
    pub total_streams: i64,
    pub last_daily_update: Option<Timestamp>,
    pub daily_growth_streak: i64,
    pub created_at: Timestamp,
}

impl ArtistCard {
    pub fn new(
        card_id: CardId,
        owner_id: UserId,
        name: String,
        genre: String,
        now: Timestamp,
    ) -> Self {
        Self {
            card_id,
            owner_id,
            name,
            genre,
            current_fame: CARD_STARTING_FAME,
            physical_copies: 0,
            digital_downloads: 0,
            total_streams: 0,
            last_daily_update: None,
            daily_growth_streak: 0,
            created_at: now,
        }
    }

    /// Cumulative sales across every channel; drives milestones.
    pub fn total_sales(&self) -> i64 {
        self.physical_copies + self.digital_downloads + self.total_streams
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Release {
    pub release_id: ReleaseId,
    pub card_id: CardId,
    pub title: String,
    pub detected_genre: String,
    pub music_quality: f64,
    pub genre_consistency: f64,
    pub release_impact: i64,
    pub streams: i64,
    /// 0 when the release never charted.
    pub peak_chart_position: i64,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreShift {
    pub from: String,
    pub to: String,
    pub intensity: f64,
}

/// Append-only narrative record of how a release moved the artist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtistEvolution {
    pub evolution_id: String,
    pub card_id: CardId,
    pub release_id: ReleaseId,
    pub genre_shift: Option<GenreShift>,
    pub fame_change_from_release: i64,
    pub fanbase_change_from_release: i64,
    pub genre_mastery: f64,
    pub artistic_growth: String,
    pub fan_reaction: String,
    pub evolution_summary: String,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BandAchievement {
    pub achievement_id: String,
    pub card_id: CardId,
    pub achievement_type: String,
    pub sales_required: i64,
    pub sales_at_achievement: i64,
    pub fame_boost_percent: i64,
    pub achieved_at: Timestamp,
}
