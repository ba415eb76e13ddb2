//! Tier economy — subscription tiers, credits and band-generation allowance.
//!
//! Tier application is a ratchet: every stat is raised to the tier's floor
//! and never lowered, so a downgrade changes the tier label and price but
//! leaves earned credits, fame and experience alone. Only spending and the
//! monthly renewal move credits afterwards.
//!
//! Execution: tier application and spends are per-request; monthly renewal
//! is a batch job (see batch_job.rs).

use crate::{
    config::{EngineConfig, TierConfig},
    error::{ProgressionError, ProgressionResult},
    model::{UserProgress, FAME_MAX, FAME_MIN},
    score_model,
    store::ProgressStore,
    types::{Timestamp, UserId},
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Free-generation count that stands for "unlimited".
pub const UNLIMITED_GENERATIONS: i64 = 999_999;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SubscriptionTier {
    Fan,
    Artist,
    #[serde(rename = "Record Label")]
    RecordLabel,
    Mogul,
}

impl SubscriptionTier {
    pub const ALL: [SubscriptionTier; 4] = [Self::Fan, Self::Artist, Self::RecordLabel, Self::Mogul];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fan => "Fan",
            Self::Artist => "Artist",
            Self::RecordLabel => "Record Label",
            Self::Mogul => "Mogul",
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionTier {
    type Err = ProgressionError;

    /// Accepts the display name ("Record Label") or its snake_case key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Fan" | "fan" => Ok(Self::Fan),
            "Artist" | "artist" => Ok(Self::Artist),
            "Record Label" | "record_label" => Ok(Self::RecordLabel),
            "Mogul" | "mogul" => Ok(Self::Mogul),
            other => Err(ProgressionError::InvalidTier { name: other.to_string() }),
        }
    }
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

/// Result of a credit spend. Insufficient balance is an expected outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SpendOutcome {
    Spent { remaining: i64 },
    Insufficient { balance: i64, required: i64 },
}

impl SpendOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Spent { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenialReason {
    InsufficientCredits { balance: i64, cost: i64 },
}

/// Whether a user may generate another band, and how it would be paid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "via", rename_all = "snake_case")]
pub enum GenerationAllowance {
    /// Covered by the free allowance. `None` means the allowance is unlimited.
    Free { remaining_after: Option<i64> },
    Credits { cost: i64 },
    Denied { reason: DenialReason },
}

impl GenerationAllowance {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Self::Denied { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreditRenewal {
    pub user_id: UserId,
    pub tier: SubscriptionTier,
    pub amount: i64,
    pub new_balance: i64,
}

// ── Tier application ─────────────────────────────────────────────────────────

fn tier_config(config: &EngineConfig, tier: SubscriptionTier) -> ProgressionResult<&TierConfig> {
    config.tier(tier).ok_or_else(|| ProgressionError::InvalidTier {
        name: tier.to_string(),
    })
}

/// Apply `tier`'s floors to `user` in place. Pure; the caller persists.
pub fn apply_tier_floors(user: &mut UserProgress, tier: &TierConfig) {
    user.subscription_tier = tier.tier;
    user.subscription_price = tier.price;

    user.credits = user.credits.max(tier.starting_credits);
    user.fame = user.fame.max(tier.starting_fame).clamp(FAME_MIN, FAME_MAX);
    user.experience = user.experience.max(tier.starting_experience);
    user.total_credits_earned = user.total_credits_earned.max(tier.starting_credits);

    user.free_band_generations_remaining = match tier.free_generation_bonus {
        None => UNLIMITED_GENERATIONS,
        Some(bonus) => (user.free_band_generations_remaining + bonus).min(UNLIMITED_GENERATIONS),
    };

    user.level = score_model::career_level(user.experience).to_string();
}

/// Switch a user to `tier_name`, ratcheting stats up to the tier's floors.
/// The tier name is validated before anything is read or written.
pub fn apply_subscription_tier_benefits(
    store: &ProgressStore,
    config: &EngineConfig,
    user_id: &str,
    tier_name: &str,
) -> ProgressionResult<UserProgress> {
    let tier: SubscriptionTier = tier_name.parse()?;
    let tier_cfg = tier_config(config, tier)?;

    store.transaction(|store| {
        let mut user = store.require_user(user_id)?;
        let before = (user.credits, user.fame, user.experience);
        apply_tier_floors(&mut user, tier_cfg);
        store.save_user(&user)?;

        log::info!(
            "tier: user={user_id} -> {tier} credits {}->{} fame {}->{} xp {}->{}",
            before.0, user.credits, before.1, user.fame, before.2, user.experience
        );
        Ok(user)
    })
}

// ── Monthly renewal ──────────────────────────────────────────────────────────

/// Credit every paying user whose last renewal is at least one interval old.
/// Safe to rerun: a renewed user is not due again until the next interval.
pub fn process_monthly_credits(
    store: &ProgressStore,
    config: &EngineConfig,
    now: Timestamp,
) -> ProgressionResult<Vec<CreditRenewal>> {
    let cutoff = now - Duration::days(config.economy.renewal_interval_days);

    store.transaction(|store| {
        let mut renewals = Vec::new();
        for mut user in store.users_due_for_renewal(cutoff)? {
            let amount = tier_config(config, user.subscription_tier)?.monthly_credits;
            user.credits += amount;
            user.total_credits_earned += amount;
            user.last_credit_renewal = Some(now);
            store.save_user(&user)?;

            log::debug!("renewal: user={} tier={} +{amount}", user.user_id, user.subscription_tier);
            renewals.push(CreditRenewal {
                user_id: user.user_id.clone(),
                tier: user.subscription_tier,
                amount,
                new_balance: user.credits,
            });
        }
        log::info!("renewal: {} users credited", renewals.len());
        Ok(renewals)
    })
}

// ── Spending ─────────────────────────────────────────────────────────────────

/// Deduct `amount` credits if, and only if, the balance covers it.
/// The balance check and the debit are one conditional UPDATE.
pub fn spend_credits(
    store: &ProgressStore,
    user_id: &str,
    amount: i64,
) -> ProgressionResult<SpendOutcome> {
    if amount <= 0 {
        return Err(ProgressionError::InvalidInput(format!(
            "credit spend must be positive, got {amount}"
        )));
    }

    store.transaction(|store| {
        let user = store.require_user(user_id)?;
        if store.try_debit_credits(user_id, amount)? {
            Ok(SpendOutcome::Spent { remaining: user.credits - amount })
        } else {
            log::warn!("credits: user={user_id} cannot spend {amount} (balance {})", user.credits);
            Ok(SpendOutcome::Insufficient { balance: user.credits, required: amount })
        }
    })
}

// ── Band generation allowance ────────────────────────────────────────────────

/// Decide how the next band generation would be paid. Pure.
pub fn check_band_generation(user: &UserProgress, config: &EngineConfig) -> GenerationAllowance {
    let remaining = user.free_band_generations_remaining;
    if remaining >= UNLIMITED_GENERATIONS {
        return GenerationAllowance::Free { remaining_after: None };
    }
    if remaining > 0 {
        return GenerationAllowance::Free { remaining_after: Some(remaining - 1) };
    }

    let cost = config.economy.band_generation_cost;
    if user.credits >= cost {
        GenerationAllowance::Credits { cost }
    } else {
        GenerationAllowance::Denied {
            reason: DenialReason::InsufficientCredits { balance: user.credits, cost },
        }
    }
}

/// Check and pay for one band generation atomically. A `Denied` result
/// leaves the user untouched.
pub fn consume_band_generation(
    store: &ProgressStore,
    config: &EngineConfig,
    user_id: &str,
) -> ProgressionResult<GenerationAllowance> {
    store.transaction(|store| {
        let mut user = store.require_user(user_id)?;
        let allowance = check_band_generation(&user, config);

        match &allowance {
            GenerationAllowance::Free { remaining_after } => {
                if let Some(left) = remaining_after {
                    user.free_band_generations_remaining = *left;
                }
                user.band_generation_count += 1;
                store.save_user(&user)?;
            }
            GenerationAllowance::Credits { cost } => {
                if !store.try_debit_credits(user_id, *cost)? {
                    return Ok(GenerationAllowance::Denied {
                        reason: DenialReason::InsufficientCredits {
                            balance: user.credits,
                            cost: *cost,
                        },
                    });
                }
                // Re-read so the debit made by the conditional UPDATE is kept.
                let mut paid = store.require_user(user_id)?;
                paid.band_generation_count += 1;
                store.save_user(&paid)?;
            }
            GenerationAllowance::Denied { .. } => {
                log::warn!("generation: user={user_id} denied: {allowance:?}");
            }
        }
        Ok(allowance)
    })
}
