//! Career progression — orchestrates a new release end to end.
//!
//! RELEASE PIPELINE (fixed order, one transaction):
//!   1. Load the card and verify ownership (nothing is scored for a
//!      non-owner).
//!   2. Genre consistency: exact / same family / different family.
//!   3. Insert the release with its consistency.
//!   4. Back-fill release impact: clamp(floor(q*100*c), 0, 100), then +10
//!      when mastery > 1.1, capped at 100. Clamp-then-bonus order matters
//!      near the boundary.
//!   5. Ranking update applied to the owner, release streams added to
//!      the card.
//!   6. Milestone check on the card, then the chart is recomputed so it
//!      sees any fame boost.
//!   7. Append the evolution record.
//!   8. Build the career summary.

use crate::{
    achievement_engine::{self, AwardedAchievement},
    config::{EngineConfig, GenreFamily},
    error::{ProgressionError, ProgressionResult},
    model::{ArtistEvolution, GenreShift, Release},
    ranking_engine::{self, RankingUpdate},
    rng::Roll,
    score_model,
    store::ProgressStore,
    types::{CardId, Timestamp, UserId},
};
use serde::{Deserialize, Serialize};

const EXACT_CONSISTENCY: f64 = 1.2;
const EXACT_MASTERY: f64 = 1.2;
const FAMILY_CONSISTENCY: f64 = 1.0;
const FAMILY_MASTERY: f64 = 1.1;
const FAMILY_SHIFT: f64 = 0.3;
const CROSS_CONSISTENCY: f64 = 0.6;
const CROSS_MASTERY: f64 = 0.8;
const CROSS_SHIFT: f64 = 0.8;

/// Mastery above this earns the release-impact bonus.
const MASTERY_BONUS_THRESHOLD: f64 = 1.1;
const MASTERY_BONUS: i64 = 10;

/// Shift intensity above this reads as a bold pivot.
const DRAMATIC_SHIFT: f64 = 0.7;
const MODERATE_SHIFT: f64 = 0.3;

// ── Public types ─────────────────────────────────────────────────────────────

/// A release as handed over by the upload/analysis layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub user_id: UserId,
    pub card_id: CardId,
    pub title: String,
    /// Genre detected by the excluded audio analysis.
    pub detected_genre: String,
    /// Opaque quality signal in [0, 1].
    pub music_quality: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenreMatch {
    Exact,
    SameFamily,
    Different,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreAnalysis {
    pub genre_match: GenreMatch,
    pub consistency: f64,
    pub mastery: f64,
    pub shift: Option<GenreShift>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseOutcome {
    pub release: Release,
    pub ranking_update: RankingUpdate,
    pub evolution: ArtistEvolution,
    pub summary: String,
    /// Chart position the provisional estimate pointed at.
    pub provisional_position: i64,
    /// Owner's chart position once the release committed.
    pub chart_position: i64,
    pub achievements: Vec<AwardedAchievement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CareerOverview {
    pub card_id: CardId,
    pub total_releases: usize,
    pub genre_consistency_score: f64,
    pub artistic_growth_trend: String,
    pub best_performing_release: Option<Release>,
    pub career_highlights: Vec<String>,
}

// ── Genre analysis ───────────────────────────────────────────────────────────

/// Lowercase, with every run of non-alphanumerics collapsed to `_`.
/// "Hip-Hop" and "hip hop" both become "hip_hop".
pub fn normalize_genre(genre: &str) -> String {
    let mut out = String::with_capacity(genre.len());
    for ch in genre.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Family a genre belongs to, if any. A family's own name counts as a member.
pub fn genre_family<'a>(genre: &str, families: &'a [GenreFamily]) -> Option<&'a str> {
    let key = normalize_genre(genre);
    families
        .iter()
        .find(|f| f.family == key || f.members.iter().any(|m| *m == key))
        .map(|f| f.family.as_str())
}

pub fn analyze_genre_consistency(
    established: &str,
    detected: &str,
    families: &[GenreFamily],
) -> GenreAnalysis {
    if normalize_genre(established) == normalize_genre(detected) {
        return GenreAnalysis {
            genre_match: GenreMatch::Exact,
            consistency: EXACT_CONSISTENCY,
            mastery: EXACT_MASTERY,
            shift: None,
        };
    }

    let shift = |intensity| {
        Some(GenreShift {
            from: established.to_string(),
            to: detected.to_string(),
            intensity,
        })
    };

    match (genre_family(established, families), genre_family(detected, families)) {
        (Some(a), Some(b)) if a == b => GenreAnalysis {
            genre_match: GenreMatch::SameFamily,
            consistency: FAMILY_CONSISTENCY,
            mastery: FAMILY_MASTERY,
            shift: shift(FAMILY_SHIFT),
        },
        _ => GenreAnalysis {
            genre_match: GenreMatch::Different,
            consistency: CROSS_CONSISTENCY,
            mastery: CROSS_MASTERY,
            shift: shift(CROSS_SHIFT),
        },
    }
}

/// Release impact in [0, 100].
pub fn release_impact(music_quality: f64, consistency: f64, mastery: f64) -> i64 {
    let impact = ((music_quality * 100.0 * consistency).floor() as i64).clamp(0, 100);
    if mastery > MASTERY_BONUS_THRESHOLD {
        (impact + MASTERY_BONUS).min(100)
    } else {
        impact
    }
}

// ── Narrative ────────────────────────────────────────────────────────────────

struct Narrative {
    artistic_growth: String,
    fan_reaction: String,
    headline: String,
}

fn narrative(shift: Option<&GenreShift>, established: &str) -> Narrative {
    match shift {
        Some(s) if s.intensity > DRAMATIC_SHIFT => Narrative {
            artistic_growth: format!("A bold pivot from {} to {}", s.from, s.to),
            fan_reaction: "Mixed reactions: longtime fans are divided while new listeners \
                           discover the sound"
                .into(),
            headline: format!("marks a bold pivot from {} to {}", s.from, s.to),
        },
        Some(s) if s.intensity >= MODERATE_SHIFT => Narrative {
            artistic_growth: format!("A measured evolution from {} toward {}", s.from, s.to),
            fan_reaction: "Fans welcome the fresh direction while recognising the core sound"
                .into(),
            headline: format!("shows a measured evolution from {} toward {}", s.from, s.to),
        },
        _ => Narrative {
            artistic_growth: format!("Refined mastery of {established}"),
            fan_reaction: "Core fans embrace the signature sound".into(),
            headline: format!("showcases refined mastery of {established}"),
        },
    }
}

/// "debut", "sophomore", "third", then "#4", "#5", ...
pub fn release_ordinal(n: i64) -> String {
    match n {
        1 => "debut".into(),
        2 => "sophomore".into(),
        3 => "third".into(),
        n => format!("#{n}"),
    }
}

fn career_summary(
    artist: &str,
    ordinal: &str,
    title: &str,
    headline: &str,
    update: &RankingUpdate,
) -> String {
    let mut summary = format!(
        "{artist}'s {ordinal} release \"{title}\" {headline}. Fame {:+}, Fans {:+}, Streams {:+}.",
        update.fame_change, update.fanbase_change, update.total_streams_change
    );
    if update.viral {
        summary.push(' ');
        summary.push_str(&update.reason);
    }
    summary
}

// ── Release ──────────────────────────────────────────────────────────────────

pub fn release_new_music(
    store: &ProgressStore,
    config: &EngineConfig,
    request: &ReleaseRequest,
    now: Timestamp,
    rng: &mut impl Roll,
) -> ProgressionResult<ReleaseOutcome> {
    let q = request.music_quality;
    if !q.is_finite() || !(0.0..=1.0).contains(&q) {
        return Err(ProgressionError::InvalidInput(format!(
            "music quality must be within [0, 1], got {q}"
        )));
    }

    store.transaction(|store| {
        let mut card = store.require_card(&request.card_id)?;
        if card.owner_id != request.user_id {
            log::warn!(
                "release: user={} rejected for card={} owned by {}",
                request.user_id, card.card_id, card.owner_id
            );
            return Err(ProgressionError::OwnershipViolation {
                user_id: request.user_id.clone(),
                card_id: card.card_id.clone(),
            });
        }
        let mut user = store.require_user(&request.user_id)?;

        let analysis = analyze_genre_consistency(&card.genre, &request.detected_genre, &config.genre_families);

        let mut release = Release {
            release_id: uuid::Uuid::new_v4().to_string(),
            card_id: card.card_id.clone(),
            title: request.title.clone(),
            detected_genre: request.detected_genre.clone(),
            music_quality: q,
            genre_consistency: analysis.consistency,
            release_impact: 0,
            streams: 0,
            peak_chart_position: 0,
            created_at: now,
        };
        store.insert_release(&release)?;

        release.release_impact = release_impact(q, analysis.consistency, analysis.mastery);
        store.update_release_impact(&release.release_id, release.release_impact)?;

        let update = ranking_engine::calculate_ranking_update(q, release.release_impact, &config.ranking, rng)?;

        let previous_position = user.chart_position;
        ranking_engine::apply_update_to_user(&mut user, &update, &config.ranking, now);
        let provisional_position = user.chart_position;
        if !config.schedule.recompute_rankings_on_release {
            // Without a recompute the estimate could collide with another
            // user's slot; the batch job settles the chart instead.
            user.chart_position = previous_position;
        }
        user.experience += release.release_impact;
        user.level = score_model::career_level(user.experience).to_string();
        store.save_user(&user)?;

        release.streams = update.total_streams_change.max(0);
        card.total_streams += release.streams;
        store.save_card(&card)?;

        // Milestone boosts land on the owner before the chart is settled.
        let achievements = achievement_engine::check_and_award_achievements(store, config, &card.card_id, now)?;

        if config.schedule.recompute_rankings_on_release {
            ranking_engine::update_global_rankings(store, config)?;
        }
        let chart_position = store.require_user(&request.user_id)?.chart_position;

        store.update_release_performance(&release.release_id, release.streams, chart_position)?;
        release.peak_chart_position = chart_position;

        let story = narrative(analysis.shift.as_ref(), &card.genre);
        let evolution = ArtistEvolution {
            evolution_id: uuid::Uuid::new_v4().to_string(),
            card_id: card.card_id.clone(),
            release_id: release.release_id.clone(),
            genre_shift: analysis.shift.clone(),
            fame_change_from_release: update.fame_change,
            fanbase_change_from_release: update.fanbase_change,
            genre_mastery: analysis.mastery,
            evolution_summary: format!(
                "{}. Fame {:+}, fanbase {:+}.",
                story.artistic_growth, update.fame_change, update.fanbase_change
            ),
            artistic_growth: story.artistic_growth,
            fan_reaction: story.fan_reaction,
            created_at: now,
        };
        store.insert_evolution(&evolution)?;

        let ordinal = release_ordinal(store.release_count_for_card(&card.card_id)?);
        let summary = career_summary(&card.name, &ordinal, &release.title, &story.headline, &update);

        log::info!(
            "release: card={} \"{}\" {:?} impact={} chart={}",
            card.card_id, release.title, analysis.genre_match, release.release_impact, chart_position
        );

        Ok(ReleaseOutcome {
            release,
            ranking_update: update,
            evolution,
            summary,
            provisional_position,
            chart_position,
            achievements,
        })
    })
}

// ── Overview ─────────────────────────────────────────────────────────────────

/// Label for the mean mastery of the most recent releases.
pub fn artistic_growth_trend(recent_mastery: &[f64]) -> &'static str {
    if recent_mastery.is_empty() {
        return "Finding direction";
    }
    let mean = recent_mastery.iter().sum::<f64>() / recent_mastery.len() as f64;
    if mean > 1.3 {
        "Mastering craft"
    } else if mean > 1.1 {
        "Steady growth"
    } else if mean > 0.9 {
        "Exploring sound"
    } else {
        "Finding direction"
    }
}

fn performance(r: &Release) -> f64 {
    r.release_impact as f64 + r.streams as f64 / 1000.0
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

fn career_highlights(releases: &[Release], evolutions: &[ArtistEvolution]) -> Vec<String> {
    let mut highlights = Vec::new();
    let total = releases.len();
    if total >= 1 {
        highlights.push("Debut release".to_string());
    }
    if total >= 5 {
        highlights.push("Prolific artist (5+ releases)".to_string());
    }
    if total >= 10 {
        highlights.push("Veteran artist (10+ releases)".to_string());
    }

    let high_quality = releases.iter().filter(|r| r.music_quality > 0.8).count();
    if high_quality > 0 {
        highlights.push(plural(high_quality, "high-quality release"));
    }

    let pioneer = evolutions
        .iter()
        .filter_map(|e| e.genre_shift.as_ref())
        .any(|s| s.intensity > DRAMATIC_SHIFT);
    if pioneer {
        highlights.push("Genre pioneer".to_string());
    }

    let charting = releases.iter().filter(|r| r.peak_chart_position > 0).count();
    if charting > 0 {
        highlights.push(plural(charting, "charting release"));
    }
    highlights
}

pub fn artist_career_overview(store: &ProgressStore, card_id: &str) -> ProgressionResult<CareerOverview> {
    store.require_card(card_id)?;
    let releases = store.releases_for_card(card_id)?;
    let evolutions = store.evolutions_for_card(card_id)?;

    let genre_consistency_score = if releases.is_empty() {
        0.0
    } else {
        releases.iter().map(|r| r.genre_consistency).sum::<f64>() / releases.len() as f64
    };

    let recent: Vec<f64> = evolutions
        .iter()
        .rev()
        .take(3)
        .map(|e| e.genre_mastery)
        .collect();

    let best_performing_release = releases
        .iter()
        .fold(None::<&Release>, |best, r| match best {
            Some(b) if performance(b) >= performance(r) => Some(b),
            _ => Some(r),
        })
        .cloned();

    Ok(CareerOverview {
        card_id: card_id.to_string(),
        total_releases: releases.len(),
        genre_consistency_score,
        artistic_growth_trend: artistic_growth_trend(&recent).to_string(),
        best_performing_release,
        career_highlights: career_highlights(&releases, &evolutions),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_separators() {
        assert_eq!(normalize_genre("Hip-Hop"), "hip_hop");
        assert_eq!(normalize_genre("  Drum & Bass "), "drum_bass");
        assert_eq!(normalize_genre("R&B"), "r_b");
    }

    #[test]
    fn impact_bonus_applies_after_clamp() {
        // 0.95 * 100 * 1.2 = 114 -> 100, bonus capped at 100.
        assert_eq!(release_impact(0.95, 1.2, 1.2), 100);
        // 0.5 * 100 * 1.2 = 60 -> +10 = 70.
        assert_eq!(release_impact(0.5, 1.2, 1.2), 70);
        // Same family mastery 1.1 earns no bonus.
        assert_eq!(release_impact(0.5, 1.0, 1.1), 50);
        assert_eq!(release_impact(0.5, 0.6, 0.8), 30);
    }

    #[test]
    fn ordinals() {
        assert_eq!(release_ordinal(1), "debut");
        assert_eq!(release_ordinal(2), "sophomore");
        assert_eq!(release_ordinal(3), "third");
        assert_eq!(release_ordinal(7), "#7");
    }

    #[test]
    fn trend_thresholds() {
        assert_eq!(artistic_growth_trend(&[1.2, 1.2, 1.2]), "Steady growth");
        assert_eq!(artistic_growth_trend(&[1.0, 1.0]), "Exploring sound");
        assert_eq!(artistic_growth_trend(&[0.8]), "Finding direction");
        assert_eq!(artistic_growth_trend(&[]), "Finding direction");
    }
}
