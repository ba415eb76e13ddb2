use super::ProgressStore;
use crate::{
    error::{ProgressionError, ProgressionResult},
    model::{ArtistEvolution, GenreShift, Release},
    types::{from_epoch, to_epoch},
};
use rusqlite::{params, Row};

const RELEASE_COLUMNS: &str = "release_id, card_id, title, detected_genre, music_quality,
     genre_consistency, release_impact, streams, peak_chart_position, created_at";

const EVOLUTION_COLUMNS: &str = "evolution_id, card_id, release_id, shift_from, shift_to,
     shift_intensity, fame_change, fanbase_change, genre_mastery, artistic_growth,
     fan_reaction, evolution_summary, created_at";

fn release_from_row(row: &Row<'_>) -> rusqlite::Result<Release> {
    Ok(Release {
        release_id: row.get(0)?,
        card_id: row.get(1)?,
        title: row.get(2)?,
        detected_genre: row.get(3)?,
        music_quality: row.get(4)?,
        genre_consistency: row.get(5)?,
        release_impact: row.get(6)?,
        streams: row.get(7)?,
        peak_chart_position: row.get(8)?,
        created_at: from_epoch(row.get(9)?),
    })
}

fn evolution_from_row(row: &Row<'_>) -> rusqlite::Result<ArtistEvolution> {
    let shift_from: Option<String> = row.get(3)?;
    let shift_to: Option<String> = row.get(4)?;
    let shift_intensity: Option<f64> = row.get(5)?;
    let genre_shift = match (shift_from, shift_to, shift_intensity) {
        (Some(from), Some(to), Some(intensity)) => Some(GenreShift { from, to, intensity }),
        _ => None,
    };
    Ok(ArtistEvolution {
        evolution_id: row.get(0)?,
        card_id: row.get(1)?,
        release_id: row.get(2)?,
        genre_shift,
        fame_change_from_release: row.get(6)?,
        fanbase_change_from_release: row.get(7)?,
        genre_mastery: row.get(8)?,
        artistic_growth: row.get(9)?,
        fan_reaction: row.get(10)?,
        evolution_summary: row.get(11)?,
        created_at: from_epoch(row.get(12)?),
    })
}

impl ProgressStore {
    // ── Releases ──────────────────────────────────────────────────

    pub fn insert_release(&self, r: &Release) -> ProgressionResult<()> {
        self.conn.execute(
            &format!("INSERT INTO music_release ({RELEASE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
            params![
                r.release_id,
                r.card_id,
                r.title,
                r.detected_genre,
                r.music_quality,
                r.genre_consistency,
                r.release_impact,
                r.streams,
                r.peak_chart_position,
                to_epoch(r.created_at),
            ],
        )?;
        Ok(())
    }

    /// Back-fill the impact score once consistency is known.
    pub fn update_release_impact(&self, release_id: &str, impact: i64) -> ProgressionResult<()> {
        let changed = self.conn.execute(
            "UPDATE music_release SET release_impact = ?1 WHERE release_id = ?2",
            params![impact, release_id],
        )?;
        if changed == 0 {
            return Err(ProgressionError::ReleaseNotFound { release_id: release_id.to_string() });
        }
        Ok(())
    }

    /// Record streams earned and the best chart position seen so far.
    pub fn update_release_performance(
        &self,
        release_id: &str,
        streams: i64,
        chart_position: i64,
    ) -> ProgressionResult<()> {
        self.conn.execute(
            "UPDATE music_release SET
                streams = ?1,
                peak_chart_position = CASE
                    WHEN ?2 = 0 THEN peak_chart_position
                    WHEN peak_chart_position = 0 OR ?2 < peak_chart_position THEN ?2
                    ELSE peak_chart_position
                END
             WHERE release_id = ?3",
            params![streams, chart_position, release_id],
        )?;
        Ok(())
    }

    /// All releases of a card in release order.
    pub fn releases_for_card(&self, card_id: &str) -> ProgressionResult<Vec<Release>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RELEASE_COLUMNS} FROM music_release WHERE card_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![card_id], release_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn release_count_for_card(&self, card_id: &str) -> ProgressionResult<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM music_release WHERE card_id = ?1",
            params![card_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ── Evolutions (append-only) ──────────────────────────────────

    pub fn insert_evolution(&self, e: &ArtistEvolution) -> ProgressionResult<()> {
        let shift = e.genre_shift.as_ref();
        self.conn.execute(
            &format!("INSERT INTO artist_evolution ({EVOLUTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
            params![
                e.evolution_id,
                e.card_id,
                e.release_id,
                shift.map(|s| s.from.as_str()),
                shift.map(|s| s.to.as_str()),
                shift.map(|s| s.intensity),
                e.fame_change_from_release,
                e.fanbase_change_from_release,
                e.genre_mastery,
                e.artistic_growth,
                e.fan_reaction,
                e.evolution_summary,
                to_epoch(e.created_at),
            ],
        )?;
        Ok(())
    }

    /// All evolutions of a card, oldest first.
    pub fn evolutions_for_card(&self, card_id: &str) -> ProgressionResult<Vec<ArtistEvolution>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EVOLUTION_COLUMNS} FROM artist_evolution WHERE card_id = ?1
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![card_id], evolution_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
