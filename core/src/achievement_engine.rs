//! Achievement engine — sales milestones awarded at most once per card.
//!
//! total_sales = physical + digital + streams, checked against the
//! ascending milestone table (Gold 500k, Platinum 2M, Diamond 10M).
//! Each newly reached milestone inserts one achievement row and grants
//! floor(card fame * boost% / 100) fame to the card and its owner.
//!
//! The existence check, insert and fame grant share one transaction, and
//! the (card_id, achievement_type) UNIQUE constraint backs the check, so
//! concurrent callers cannot double-award.

use crate::{
    config::EngineConfig,
    error::ProgressionResult,
    model::{BandAchievement, FAME_MAX, FAME_MIN},
    store::ProgressStore,
    types::Timestamp,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwardedAchievement {
    pub achievement: BandAchievement,
    pub label: String,
    pub fame_increase: i64,
}

/// Award every milestone the card has reached but not yet received.
/// Calling it again with unchanged sales awards nothing.
pub fn check_and_award_achievements(
    store: &ProgressStore,
    config: &EngineConfig,
    card_id: &str,
    now: Timestamp,
) -> ProgressionResult<Vec<AwardedAchievement>> {
    store.transaction(|store| {
        let mut card = store.require_card(card_id)?;
        let total_sales = card.total_sales();
        // Boosts are computed from the fame the card had when the check began.
        let base_fame = card.current_fame;
        let mut awarded = Vec::new();

        for milestone in config.milestones.iter().filter(|m| total_sales >= m.sales_required) {
            if store.achievement_exists(card_id, &milestone.achievement_type)? {
                continue;
            }

            let achievement = BandAchievement {
                achievement_id: uuid::Uuid::new_v4().to_string(),
                card_id: card_id.to_string(),
                achievement_type: milestone.achievement_type.clone(),
                sales_required: milestone.sales_required,
                sales_at_achievement: total_sales,
                fame_boost_percent: milestone.fame_boost_percent,
                achieved_at: now,
            };
            if !store.insert_achievement(&achievement)? {
                continue;
            }

            let fame_increase =
                (base_fame * milestone.fame_boost_percent as f64 / 100.0).floor() as i64;
            card.current_fame += fame_increase as f64;

            log::info!(
                "achievement: card={card_id} {} at {total_sales} sales (+{fame_increase} fame)",
                milestone.label
            );
            awarded.push(AwardedAchievement {
                achievement,
                label: milestone.label.clone(),
                fame_increase,
            });
        }

        if !awarded.is_empty() {
            store.save_card(&card)?;
            let mut owner = store.require_user(&card.owner_id)?;
            let total_increase: i64 = awarded.iter().map(|a| a.fame_increase).sum();
            owner.fame = (owner.fame + total_increase).clamp(FAME_MIN, FAME_MAX);
            store.save_user(&owner)?;
        }

        Ok(awarded)
    })
}
