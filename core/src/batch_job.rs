//! Batch job trait and the scheduled jobs.
//!
//! RULE: Every scheduled full-scan operation implements BatchJob.
//! The engine runs registered jobs in registration order on each
//! `run_batch()` call. Order is fixed and documented in engine.rs.

use crate::{
    config::EngineConfig,
    error::ProgressionResult,
    event::ProgressionEvent,
    growth_engine::{self, GrowthOutcome},
    ranking_engine,
    rng::EngineRng,
    store::ProgressStore,
    tier_economy,
    types::Timestamp,
};

/// Shared, read-only inputs for one batch pass.
pub struct BatchContext<'a> {
    pub store: &'a ProgressStore,
    pub config: &'a EngineConfig,
    pub now: Timestamp,
}

/// The contract every scheduled job must fulfill.
pub trait BatchJob: Send {
    /// Unique stable name for this job.
    fn name(&self) -> &'static str;

    /// Called once per batch pass by the engine.
    ///
    /// Returns the events describing what changed; the engine logs them.
    fn run(
        &mut self,
        ctx: &BatchContext<'_>,
        rng: &mut EngineRng,
    ) -> ProgressionResult<Vec<ProgressionEvent>>;
}

// ── Passive growth ───────────────────────────────────────────────────────────

/// One growth tick for every card that is off cooldown.
pub struct PassiveGrowthJob;

impl BatchJob for PassiveGrowthJob {
    fn name(&self) -> &'static str {
        "passive_growth"
    }

    fn run(
        &mut self,
        ctx: &BatchContext<'_>,
        rng: &mut EngineRng,
    ) -> ProgressionResult<Vec<ProgressionEvent>> {
        let mut out = Vec::new();
        if !ctx.config.schedule.passive_growth_enabled {
            return Ok(out);
        }

        let (mut grown, mut skipped) = (0usize, 0usize);
        for card_id in ctx.store.all_card_ids()? {
            match growth_engine::apply_daily_growth(ctx.store, ctx.config, &card_id, ctx.now, rng)? {
                GrowthOutcome::Applied { growth, card, achievements } => {
                    grown += 1;
                    out.push(ProgressionEvent::DailyGrowthApplied {
                        card_id: card_id.clone(),
                        fame_growth: growth.fame_growth,
                        streams: growth.streams,
                        digital: growth.digital,
                        physical: growth.physical,
                        streak: card.daily_growth_streak,
                    });
                    out.extend(achievements.into_iter().map(|a| ProgressionEvent::AchievementAwarded {
                        card_id: card_id.clone(),
                        achievement_type: a.achievement.achievement_type,
                        sales_at_achievement: a.achievement.sales_at_achievement,
                        fame_increase: a.fame_increase,
                    }));
                }
                GrowthOutcome::NotYetEligible { .. } => skipped += 1,
            }
        }

        log::info!("passive_growth: {grown} cards grew, {skipped} on cooldown");
        Ok(out)
    }
}

// ── Monthly credits ──────────────────────────────────────────────────────────

pub struct MonthlyCreditJob;

impl BatchJob for MonthlyCreditJob {
    fn name(&self) -> &'static str {
        "monthly_credits"
    }

    fn run(
        &mut self,
        ctx: &BatchContext<'_>,
        _rng: &mut EngineRng,
    ) -> ProgressionResult<Vec<ProgressionEvent>> {
        let renewals = tier_economy::process_monthly_credits(ctx.store, ctx.config, ctx.now)?;
        Ok(renewals
            .into_iter()
            .map(|r| ProgressionEvent::CreditsRenewed { user_id: r.user_id, amount: r.amount })
            .collect())
    }
}

// ── Leaderboard ──────────────────────────────────────────────────────────────

/// Authoritative chart recomputation. Runs last so it sees this pass's growth.
pub struct LeaderboardJob;

impl BatchJob for LeaderboardJob {
    fn name(&self) -> &'static str {
        "leaderboard"
    }

    fn run(
        &mut self,
        ctx: &BatchContext<'_>,
        _rng: &mut EngineRng,
    ) -> ProgressionResult<Vec<ProgressionEvent>> {
        let board = ranking_engine::update_global_rankings(ctx.store, ctx.config)?;
        Ok(vec![ProgressionEvent::LeaderboardRecomputed {
            active_users: board.active_users,
            ranked_users: board.entries.len(),
        }])
    }
}
