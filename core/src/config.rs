use crate::tier_economy::SubscriptionTier;
use serde::{Deserialize, Serialize};

// ── Ranking ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Score weight per fame point. Fame dominates the leaderboard.
    pub fame_weight: f64,
    /// Score weight per lifetime stream.
    pub total_streams_weight: f64,
    /// Score weight per current daily stream.
    pub daily_streams_weight: f64,
    /// Score weight per fan.
    pub fanbase_weight: f64,
    /// Number of chart slots assigned by the global recomputation.
    pub chart_size: i64,
    /// Viral probability when music quality exceeds `viral_quality_threshold`.
    pub viral_chance_high: f64,
    /// Viral probability otherwise.
    pub viral_chance_low: f64,
    pub viral_quality_threshold: f64,
}

// ── Growth ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    pub streams_per_fame: f64,
    pub digital_per_fame: f64,
    pub physical_per_fame: f64,
    /// Shared variance draw bounds applied to all three sales channels.
    pub variance_min: f64,
    pub variance_max: f64,
    /// Minimum gap between two growth ticks on one card.
    pub cooldown_hours: i64,
    /// A tick later than this after the previous one restarts the streak.
    pub streak_grace_hours: i64,
}

// ── Milestones ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MilestoneConfig {
    pub achievement_type: String,
    pub label: String,
    /// Cumulative sales (physical + digital + streams) required.
    pub sales_required: i64,
    /// One-off fame boost granted when the milestone is awarded.
    pub fame_boost_percent: i64,
    /// Passive fame growth multiplier once the milestone is reached.
    pub growth_multiplier: f64,
}

// ── Genres ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreFamily {
    pub family: String,
    /// Normalized genre keys (lowercase, `_`-separated).
    pub members: Vec<String>,
}

// ── Tiers ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub tier: SubscriptionTier,
    pub price: f64,
    pub starting_credits: i64,
    pub monthly_credits: i64,
    pub starting_fame: i64,
    pub starting_experience: i64,
    /// Free band generations granted on upgrade. `None` means unlimited.
    pub free_generation_bonus: Option<i64>,
    /// Passive fame growth per daily tick before milestone boosts.
    pub base_fame_growth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Days between two monthly credit renewals.
    pub renewal_interval_days: i64,
    /// Credits charged for a band generation once free allowance is used up.
    pub band_generation_cost: i64,
    /// Free generations a brand-new account starts with.
    pub new_account_free_generations: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Recompute the global leaderboard inside every release transaction.
    /// The batch job recomputes regardless.
    pub recompute_rankings_on_release: bool,
    /// Run the passive growth pass as part of `run_batch`.
    pub passive_growth_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub ranking: RankingConfig,
    pub growth: GrowthConfig,
    pub milestones: Vec<MilestoneConfig>,
    pub genre_families: Vec<GenreFamily>,
    pub tiers: Vec<TierConfig>,
    pub economy: EconomyConfig,
    pub schedule: ScheduleConfig,
}

impl EngineConfig {
    /// Load from `{data_dir}/engine_config.json`.
    /// In tests, use `EngineConfig::default()`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/engine_config.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tables the engine cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        for tier in SubscriptionTier::ALL {
            if self.tier(tier).is_none() {
                anyhow::bail!("tier table is missing '{tier}'");
            }
        }
        let ascending = self
            .milestones
            .windows(2)
            .all(|w| w[0].sales_required < w[1].sales_required);
        if !ascending {
            anyhow::bail!("milestones must be sorted by ascending sales_required");
        }
        if self.ranking.chart_size <= 0 {
            anyhow::bail!("chart_size must be positive");
        }
        if self.growth.variance_min > self.growth.variance_max {
            anyhow::bail!("growth variance_min exceeds variance_max");
        }
        Ok(())
    }

    pub fn tier(&self, tier: SubscriptionTier) -> Option<&TierConfig> {
        self.tiers.iter().find(|t| t.tier == tier)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let families = [
            ("electronic", &["electronic", "edm", "house", "techno", "trance", "dubstep",
                             "drum_and_bass", "drum_bass", "ambient", "synthwave"][..]),
            ("rock", &["rock", "metal", "punk", "alternative", "indie", "grunge",
                       "hard_rock", "post_rock"][..]),
            ("pop", &["pop", "synth_pop", "k_pop", "dance_pop", "indie_pop", "electropop"][..]),
            ("jazz", &["jazz", "blues", "swing", "bebop", "fusion", "smooth_jazz"][..]),
            ("classical", &["classical", "orchestral", "baroque", "opera", "chamber",
                            "neoclassical"][..]),
            ("hip_hop", &["hip_hop", "rap", "trap", "r_b", "rnb", "grime", "drill"][..]),
            ("folk", &["folk", "country", "bluegrass", "acoustic", "americana",
                       "singer_songwriter"][..]),
        ];

        Self {
            ranking: RankingConfig {
                fame_weight: 1000.0,
                total_streams_weight: 0.01,
                daily_streams_weight: 1.0,
                fanbase_weight: 10.0,
                chart_size: 100,
                viral_chance_high: 0.05,
                viral_chance_low: 0.01,
                viral_quality_threshold: 0.7,
            },
            growth: GrowthConfig {
                streams_per_fame: 20.0,
                digital_per_fame: 1.0,
                physical_per_fame: 0.1,
                variance_min: 0.8,
                variance_max: 1.2,
                cooldown_hours: 24,
                streak_grace_hours: 48,
            },
            milestones: vec![
                MilestoneConfig {
                    achievement_type: "gold".into(),
                    label: "Gold".into(),
                    sales_required: 500_000,
                    fame_boost_percent: 5,
                    growth_multiplier: 1.05,
                },
                MilestoneConfig {
                    achievement_type: "platinum".into(),
                    label: "Platinum".into(),
                    sales_required: 2_000_000,
                    fame_boost_percent: 25,
                    growth_multiplier: 1.25,
                },
                MilestoneConfig {
                    achievement_type: "diamond".into(),
                    label: "Diamond".into(),
                    sales_required: 10_000_000,
                    fame_boost_percent: 45,
                    growth_multiplier: 1.45,
                },
            ],
            genre_families: families
                .iter()
                .map(|(family, members)| GenreFamily {
                    family: (*family).into(),
                    members: members.iter().map(|m| (*m).into()).collect(),
                })
                .collect(),
            tiers: vec![
                TierConfig {
                    tier: SubscriptionTier::Fan,
                    price: 0.0,
                    starting_credits: 500,
                    monthly_credits: 0,
                    starting_fame: 1,
                    starting_experience: 0,
                    free_generation_bonus: Some(0),
                    base_fame_growth: 1.0,
                },
                TierConfig {
                    tier: SubscriptionTier::Artist,
                    price: 5.95,
                    starting_credits: 1500,
                    monthly_credits: 1500,
                    starting_fame: 5,
                    starting_experience: 100,
                    free_generation_bonus: Some(5),
                    base_fame_growth: 1.5,
                },
                TierConfig {
                    tier: SubscriptionTier::RecordLabel,
                    price: 19.95,
                    starting_credits: 5000,
                    monthly_credits: 5000,
                    starting_fame: 15,
                    starting_experience: 3500,
                    free_generation_bonus: Some(15),
                    base_fame_growth: 2.0,
                },
                TierConfig {
                    tier: SubscriptionTier::Mogul,
                    price: 49.50,
                    starting_credits: 15000,
                    monthly_credits: 15000,
                    starting_fame: 30,
                    starting_experience: 10000,
                    free_generation_bonus: None,
                    base_fame_growth: 2.5,
                },
            ],
            economy: EconomyConfig {
                renewal_interval_days: 30,
                band_generation_cost: 250,
                new_account_free_generations: 1,
            },
            schedule: ScheduleConfig {
                recompute_rankings_on_release: true,
                passive_growth_enabled: true,
            },
        }
    }
}
