//! The progression engine — one façade over every component.
//!
//! BATCH ORDER (fixed, documented, never reordered):
//!   1. Passive growth     (one tick per eligible card)
//!   2. Monthly credits    (renew paying tiers)
//!   3. Leaderboard        (authoritative chart recompute, sees 1 and 2)
//!
//! RULES:
//!   - Components never call `Utc::now()`; time comes from the EngineClock.
//!   - All randomness flows through the RngBank.
//!   - Every state change is logged to event_log inside the same
//!     transaction that made it.

use crate::{
    achievement_engine::{self, AwardedAchievement},
    batch_job::{BatchContext, BatchJob, LeaderboardJob, MonthlyCreditJob, PassiveGrowthJob},
    career_progression::{self, CareerOverview, ReleaseOutcome, ReleaseRequest},
    clock::EngineClock,
    config::EngineConfig,
    error::{ProgressionError, ProgressionResult},
    event::{EventLogEntry, ProgressionEvent},
    growth_engine::{self, GrowthOutcome},
    model::{ArtistCard, UserProgress},
    ranking_engine::{self, Leaderboard, LeaderboardEntry, RankingUpdate},
    rng::{EngineSlot, RngBank},
    store::ProgressStore,
    tier_economy::{self, CreditRenewal, GenerationAllowance, SpendOutcome},
    types::{from_epoch, Timestamp},
};
use chrono::Duration;

/// 2025-01-01T00:00:00Z, where test engines start their manual clock.
pub const TEST_EPOCH: i64 = 1_735_689_600;

pub struct ProgressionEngine {
    pub config: EngineConfig,
    pub clock: EngineClock,
    rng_bank: RngBank,
    jobs: Vec<(EngineSlot, Box<dyn BatchJob>)>,
    store: ProgressStore,
}

impl ProgressionEngine {
    pub fn new(store: ProgressStore, config: EngineConfig, seed: u64, clock: EngineClock) -> Self {
        Self {
            config,
            clock,
            rng_bank: RngBank::new(seed),
            jobs: Vec::new(),
            store,
        }
    }

    /// Build a fully wired engine with every batch job registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(store: ProgressStore, config: EngineConfig, seed: u64, clock: EngineClock) -> Self {
        let mut engine = ProgressionEngine::new(store, config, seed, clock);

        // BATCH ORDER — fixed, documented, never reordered.
        engine.register(EngineSlot::Growth, Box::new(PassiveGrowthJob));
        engine.register(EngineSlot::Economy, Box::new(MonthlyCreditJob));
        engine.register(EngineSlot::Ranking, Box::new(LeaderboardJob));
        engine
    }

    /// In-memory store, default tables, manual clock at `TEST_EPOCH`.
    pub fn build_test(seed: u64) -> ProgressionResult<Self> {
        let store = ProgressStore::in_memory()?;
        store.migrate()?;
        Ok(Self::build(
            store,
            EngineConfig::default(),
            seed,
            EngineClock::manual(from_epoch(TEST_EPOCH)),
        ))
    }

    /// Register a batch job. Call in the documented batch order.
    pub fn register(&mut self, slot: EngineSlot, job: Box<dyn BatchJob>) {
        self.jobs.push((slot, job));
    }

    pub fn store(&self) -> &ProgressStore {
        &self.store
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn seed(&self) -> u64 {
        self.rng_bank.master_seed()
    }

    /// Move a manual clock forward. A system clock cannot be moved.
    pub fn advance_clock(&mut self, by: Duration) -> ProgressionResult<Timestamp> {
        if !self.clock.is_manual() {
            return Err(ProgressionError::InvalidInput(
                "cannot advance a system clock".into(),
            ));
        }
        self.clock.advance(by).ok_or_else(|| {
            ProgressionError::InvalidInput(format!("cannot advance the clock by {by}"))
        })
    }

    // ── Accounts ─────────────────────────────────────────────────────────────

    pub fn register_user(&mut self, user_id: &str, display_name: &str) -> ProgressionResult<UserProgress> {
        let now = self.now();
        let config = &self.config;
        self.store.transaction(|store| {
            if store.user(user_id)?.is_some() {
                return Err(ProgressionError::InvalidInput(format!(
                    "user {user_id} is already registered"
                )));
            }
            let user = UserProgress::new_account(user_id.into(), display_name.into(), config, now);
            store.insert_user(&user)?;
            record(store, &[ProgressionEvent::UserRegistered { user_id: user.user_id.clone() }], now)?;
            Ok(user)
        })
    }

    /// Register a card for an existing user. A missing `card_id` gets a v4 UUID.
    pub fn register_card(
        &mut self,
        owner_id: &str,
        card_id: Option<&str>,
        name: &str,
        genre: &str,
    ) -> ProgressionResult<ArtistCard> {
        let now = self.now();
        self.store.transaction(|store| {
            store.require_user(owner_id)?;
            let card_id = card_id
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let card = ArtistCard::new(card_id, owner_id.into(), name.into(), genre.into(), now);
            store.insert_card(&card)?;
            record(
                store,
                &[ProgressionEvent::CardRegistered {
                    card_id: card.card_id.clone(),
                    owner_id: card.owner_id.clone(),
                    genre: card.genre.clone(),
                }],
                now,
            )?;
            Ok(card)
        })
    }

    pub fn user(&self, user_id: &str) -> ProgressionResult<UserProgress> {
        self.store.require_user(user_id)
    }

    pub fn card(&self, card_id: &str) -> ProgressionResult<ArtistCard> {
        self.store.require_card(card_id)
    }

    pub fn cards_for_owner(&self, owner_id: &str) -> ProgressionResult<Vec<ArtistCard>> {
        self.store.require_user(owner_id)?;
        self.store.cards_for_owner(owner_id)
    }

    // ── Releases and ranking ─────────────────────────────────────────────────

    pub fn release_new_music(&mut self, request: &ReleaseRequest) -> ProgressionResult<ReleaseOutcome> {
        let now = self.now();
        let mut rng = self.rng_bank.for_slot(EngineSlot::Career);
        let config = &self.config;
        self.store.transaction(|store| {
            let outcome = career_progression::release_new_music(store, config, request, now, &mut rng)?;
            let update = &outcome.ranking_update;
            let mut events = vec![
                ProgressionEvent::ReleaseScored {
                    card_id: outcome.release.card_id.clone(),
                    release_id: outcome.release.release_id.clone(),
                    genre_consistency: outcome.release.genre_consistency,
                    release_impact: outcome.release.release_impact,
                },
                ProgressionEvent::RankingApplied {
                    user_id: request.user_id.clone(),
                    fame_change: update.fame_change,
                    daily_streams_change: update.daily_streams_change,
                    fanbase_change: update.fanbase_change,
                    provisional_position: outcome.provisional_position,
                    viral: update.viral,
                },
            ];
            events.extend(achievement_events(&request.card_id, &outcome.achievements));
            record(store, &events, now)?;
            Ok(outcome)
        })
    }

    /// Score a release without applying it.
    pub fn calculate_ranking_update(
        &mut self,
        music_quality: f64,
        release_impact: i64,
    ) -> ProgressionResult<RankingUpdate> {
        let mut rng = self.rng_bank.for_slot(EngineSlot::Ranking);
        ranking_engine::calculate_ranking_update(music_quality, release_impact, &self.config.ranking, &mut rng)
    }

    /// Apply a scored update to a user, then settle the chart if configured.
    pub fn apply_ranking_update(
        &mut self,
        user_id: &str,
        update: &RankingUpdate,
    ) -> ProgressionResult<UserProgress> {
        let now = self.now();
        let config = &self.config;
        self.store.transaction(|store| {
            let previous = store.require_user(user_id)?.chart_position;
            let user = ranking_engine::apply_ranking_update(store, config, user_id, update, now)?;
            let provisional = user.chart_position;

            let mut events = vec![ProgressionEvent::RankingApplied {
                user_id: user_id.into(),
                fame_change: update.fame_change,
                daily_streams_change: update.daily_streams_change,
                fanbase_change: update.fanbase_change,
                provisional_position: provisional,
                viral: update.viral,
            }];

            if config.schedule.recompute_rankings_on_release {
                let board = ranking_engine::update_global_rankings(store, config)?;
                events.push(ProgressionEvent::LeaderboardRecomputed {
                    active_users: board.active_users,
                    ranked_users: board.entries.len(),
                });
            } else {
                // The provisional slot may collide with another user's.
                store.set_chart_position(user_id, previous)?;
            }

            record(store, &events, now)?;
            store.require_user(user_id)
        })
    }

    pub fn update_global_rankings(&mut self) -> ProgressionResult<Leaderboard> {
        let now = self.now();
        let config = &self.config;
        self.store.transaction(|store| {
            let board = ranking_engine::update_global_rankings(store, config)?;
            record(
                store,
                &[ProgressionEvent::LeaderboardRecomputed {
                    active_users: board.active_users,
                    ranked_users: board.entries.len(),
                }],
                now,
            )?;
            Ok(board)
        })
    }

    pub fn leaderboard(&self, limit: usize) -> ProgressionResult<Vec<LeaderboardEntry>> {
        ranking_engine::leaderboard(&self.store, &self.config, limit)
    }

    // ── Growth and milestones ────────────────────────────────────────────────

    pub fn apply_daily_growth(&mut self, card_id: &str) -> ProgressionResult<GrowthOutcome> {
        let now = self.now();
        let mut rng = self.rng_bank.for_slot(EngineSlot::Growth);
        let config = &self.config;
        self.store.transaction(|store| {
            let outcome = growth_engine::apply_daily_growth(store, config, card_id, now, &mut rng)?;
            if let GrowthOutcome::Applied { growth, card, achievements } = &outcome {
                let mut events = vec![ProgressionEvent::DailyGrowthApplied {
                    card_id: card_id.into(),
                    fame_growth: growth.fame_growth,
                    streams: growth.streams,
                    digital: growth.digital,
                    physical: growth.physical,
                    streak: card.daily_growth_streak,
                }];
                events.extend(achievement_events(card_id, achievements));
                record(store, &events, now)?;
            }
            Ok(outcome)
        })
    }

    pub fn check_and_award_achievements(&mut self, card_id: &str) -> ProgressionResult<Vec<AwardedAchievement>> {
        let now = self.now();
        let config = &self.config;
        self.store.transaction(|store| {
            let awarded = achievement_engine::check_and_award_achievements(store, config, card_id, now)?;
            record(store, &achievement_events(card_id, &awarded), now)?;
            Ok(awarded)
        })
    }

    pub fn artist_career_overview(&self, card_id: &str) -> ProgressionResult<CareerOverview> {
        career_progression::artist_career_overview(&self.store, card_id)
    }

    // ── Economy ──────────────────────────────────────────────────────────────

    pub fn apply_subscription_tier(&mut self, user_id: &str, tier_name: &str) -> ProgressionResult<UserProgress> {
        let now = self.now();
        let config = &self.config;
        self.store.transaction(|store| {
            let user = tier_economy::apply_subscription_tier_benefits(store, config, user_id, tier_name)?;
            record(
                store,
                &[ProgressionEvent::TierApplied {
                    user_id: user_id.into(),
                    tier: user.subscription_tier.to_string(),
                }],
                now,
            )?;
            Ok(user)
        })
    }

    pub fn process_monthly_credits(&mut self) -> ProgressionResult<Vec<CreditRenewal>> {
        let now = self.now();
        let config = &self.config;
        self.store.transaction(|store| {
            let renewals = tier_economy::process_monthly_credits(store, config, now)?;
            let events: Vec<ProgressionEvent> = renewals
                .iter()
                .map(|r| ProgressionEvent::CreditsRenewed { user_id: r.user_id.clone(), amount: r.amount })
                .collect();
            record(store, &events, now)?;
            Ok(renewals)
        })
    }

    /// Spend credits. A short balance is logged and reported, not raised.
    pub fn spend_credits(&mut self, user_id: &str, amount: i64, reason: &str) -> ProgressionResult<SpendOutcome> {
        let now = self.now();
        self.store.transaction(|store| {
            let outcome = tier_economy::spend_credits(store, user_id, amount)?;
            let event = match &outcome {
                SpendOutcome::Spent { .. } => ProgressionEvent::CreditsSpent {
                    user_id: user_id.into(),
                    amount,
                    reason: reason.into(),
                },
                SpendOutcome::Insufficient { balance, .. } => ProgressionEvent::CreditSpendRejected {
                    user_id: user_id.into(),
                    amount,
                    balance: *balance,
                },
            };
            record(store, &[event], now)?;
            Ok(outcome)
        })
    }

    pub fn check_band_generation(&self, user_id: &str) -> ProgressionResult<GenerationAllowance> {
        let user = self.store.require_user(user_id)?;
        Ok(tier_economy::check_band_generation(&user, &self.config))
    }

    pub fn consume_band_generation(&mut self, user_id: &str) -> ProgressionResult<GenerationAllowance> {
        let now = self.now();
        let config = &self.config;
        self.store.transaction(|store| {
            let allowance = tier_economy::consume_band_generation(store, config, user_id)?;
            if allowance.is_allowed() {
                let via = match &allowance {
                    GenerationAllowance::Free { .. } => "free",
                    _ => "credits",
                };
                record(
                    store,
                    &[ProgressionEvent::BandGenerationConsumed { user_id: user_id.into(), via: via.into() }],
                    now,
                )?;
            }
            Ok(allowance)
        })
    }

    // ── Batch ────────────────────────────────────────────────────────────────

    /// Run every registered job once, in registration order.
    pub fn run_batch(&mut self) -> ProgressionResult<Vec<ProgressionEvent>> {
        let now = self.now();
        let config = &self.config;
        let mut batch_events = Vec::new();

        for (slot, job) in &mut self.jobs {
            let mut rng = self.rng_bank.for_slot(*slot);
            let events = self.store.transaction(|store| {
                let ctx = BatchContext { store, config, now };
                let events = job.run(&ctx, &mut rng)?;
                record(store, &events, now)?;
                Ok(events)
            })?;
            log::debug!("batch: {} emitted {} events", job.name(), events.len());
            batch_events.extend(events);
        }

        log::info!("batch complete: {} events", batch_events.len());
        Ok(batch_events)
    }

    /// Everything logged about one user or card, oldest first.
    pub fn events_for(&self, subject_id: &str) -> ProgressionResult<Vec<EventLogEntry>> {
        self.store.events_for_subject(subject_id)
    }
}

fn achievement_events(card_id: &str, awarded: &[AwardedAchievement]) -> Vec<ProgressionEvent> {
    awarded
        .iter()
        .map(|a| ProgressionEvent::AchievementAwarded {
            card_id: card_id.into(),
            achievement_type: a.achievement.achievement_type.clone(),
            sales_at_achievement: a.achievement.sales_at_achievement,
            fame_increase: a.fame_increase,
        })
        .collect()
}

fn record(store: &ProgressStore, events: &[ProgressionEvent], at: Timestamp) -> ProgressionResult<()> {
    for event in events {
        store.append_event(event, at)?;
    }
    Ok(())
}
