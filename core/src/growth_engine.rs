//! Growth engine — passive daily growth for a single artist card.
//!
//! Each eligible card grows once per rolling cooldown window (24 h by
//! default):
//!   fame     += base_fame_growth[tier] * milestone_boost(total_sales)
//!   streams  += floor(fame * 20  * r)
//!   digital  += floor(fame * 1   * r)
//!   physical += floor(fame * 0.1 * r)
//! where r is ONE variance draw in [0.8, 1.2] shared by all channels.
//!
//! A call inside the window is not an error: it reports the hours left.

use crate::{
    achievement_engine::{self, AwardedAchievement},
    config::{EngineConfig, GrowthConfig, MilestoneConfig},
    error::{ProgressionError, ProgressionResult},
    model::ArtistCard,
    rng::Roll,
    store::ProgressStore,
    tier_economy::SubscriptionTier,
    types::Timestamp,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Cumulative sales split by channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SalesTotals {
    pub physical: i64,
    pub digital: i64,
    pub streams: i64,
}

impl SalesTotals {
    pub fn of(card: &ArtistCard) -> Self {
        Self {
            physical: card.physical_copies,
            digital: card.digital_downloads,
            streams: card.total_streams,
        }
    }

    pub fn total(&self) -> i64 {
        self.physical + self.digital + self.streams
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyGrowth {
    pub fame_growth: f64,
    pub milestone_boost: f64,
    pub variance: f64,
    pub streams: i64,
    pub digital: i64,
    pub physical: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GrowthOutcome {
    Applied {
        growth: DailyGrowth,
        card: ArtistCard,
        achievements: Vec<AwardedAchievement>,
    },
    NotYetEligible {
        hours_remaining: f64,
    },
}

/// Passive fame multiplier for the highest milestone `total_sales` reached.
pub fn milestone_boost(total_sales: i64, milestones: &[MilestoneConfig]) -> f64 {
    milestones
        .iter()
        .rev()
        .find(|m| total_sales >= m.sales_required)
        .map(|m| m.growth_multiplier)
        .unwrap_or(1.0)
}

/// Compute one day of growth. Pure apart from the single variance draw.
pub fn calculate_daily_growth(
    current_fame: f64,
    totals: SalesTotals,
    tier: SubscriptionTier,
    config: &EngineConfig,
    rng: &mut impl Roll,
) -> ProgressionResult<DailyGrowth> {
    let tier_cfg = config.tier(tier).ok_or_else(|| ProgressionError::InvalidTier {
        name: tier.to_string(),
    })?;
    let growth: &GrowthConfig = &config.growth;

    let boost = milestone_boost(totals.total(), &config.milestones);
    let fame_growth = tier_cfg.base_fame_growth * boost;

    let variance = rng.range_f64(growth.variance_min, growth.variance_max);
    let fame = current_fame.max(0.0);

    Ok(DailyGrowth {
        fame_growth,
        milestone_boost: boost,
        variance,
        streams: (fame * growth.streams_per_fame * variance).floor() as i64,
        digital: (fame * growth.digital_per_fame * variance).floor() as i64,
        physical: (fame * growth.physical_per_fame * variance).floor() as i64,
    })
}

/// Hours left before `card` may grow again, or `None` when eligible now.
pub fn cooldown_remaining(card: &ArtistCard, config: &GrowthConfig, now: Timestamp) -> Option<f64> {
    let last = card.last_daily_update?;
    let window = Duration::hours(config.cooldown_hours);
    let elapsed = now - last;
    if elapsed >= window {
        None
    } else {
        let left = window - elapsed;
        Some(left.num_seconds() as f64 / 3600.0)
    }
}

/// Guarded growth tick for one card: cooldown check, growth, owner stream
/// aggregation, streak bookkeeping and milestone check — one transaction.
pub fn apply_daily_growth(
    store: &ProgressStore,
    config: &EngineConfig,
    card_id: &str,
    now: Timestamp,
    rng: &mut impl Roll,
) -> ProgressionResult<GrowthOutcome> {
    store.transaction(|store| {
        let mut card = store.require_card(card_id)?;
        if let Some(hours_remaining) = cooldown_remaining(&card, &config.growth, now) {
            log::debug!("growth: card={card_id} not eligible, {hours_remaining:.1}h left");
            return Ok(GrowthOutcome::NotYetEligible { hours_remaining });
        }

        let mut owner = store.require_user(&card.owner_id)?;
        let growth = calculate_daily_growth(
            card.current_fame,
            SalesTotals::of(&card),
            owner.subscription_tier,
            config,
            rng,
        )?;

        let streak_broken = card
            .last_daily_update
            .map(|last| now - last > Duration::hours(config.growth.streak_grace_hours))
            .unwrap_or(false);

        card.current_fame += growth.fame_growth;
        card.total_streams += growth.streams;
        card.digital_downloads += growth.digital;
        card.physical_copies += growth.physical;
        card.last_daily_update = Some(now);
        card.daily_growth_streak = if streak_broken { 1 } else { card.daily_growth_streak + 1 };
        store.save_card(&card)?;

        owner.total_streams += growth.streams;
        store.save_user(&owner)?;

        let achievements = achievement_engine::check_and_award_achievements(store, config, card_id, now)?;
        let card = store.require_card(card_id)?;

        log::debug!(
            "growth: card={card_id} fame+{:.2} streams+{} digital+{} physical+{} streak={}",
            growth.fame_growth, growth.streams, growth.digital, growth.physical,
            card.daily_growth_streak
        );
        Ok(GrowthOutcome::Applied { growth, card, achievements })
    })
}
