use super::{opt_ts, ProgressStore};
use crate::{
    error::{ProgressionError, ProgressionResult},
    model::ArtistCard,
    types::{from_epoch, to_epoch},
};
use rusqlite::{params, OptionalExtension, Row};

const CARD_COLUMNS: &str = "card_id, owner_id, name, genre, current_fame, physical_copies,
     digital_downloads, total_streams, last_daily_update, daily_growth_streak, created_at";

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<ArtistCard> {
    Ok(ArtistCard {
        card_id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        genre: row.get(3)?,
        current_fame: row.get(4)?,
        physical_copies: row.get(5)?,
        digital_downloads: row.get(6)?,
        total_streams: row.get(7)?,
        last_daily_update: opt_ts(row.get(8)?),
        daily_growth_streak: row.get(9)?,
        created_at: from_epoch(row.get(10)?),
    })
}

impl ProgressStore {
    // ── Artist cards ──────────────────────────────────────────────

    pub fn insert_card(&self, c: &ArtistCard) -> ProgressionResult<()> {
        self.conn.execute(
            &format!("INSERT INTO artist_card ({CARD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                c.card_id,
                c.owner_id,
                c.name,
                c.genre,
                c.current_fame,
                c.physical_copies,
                c.digital_downloads,
                c.total_streams,
                c.last_daily_update.map(to_epoch),
                c.daily_growth_streak,
                to_epoch(c.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn card(&self, card_id: &str) -> ProgressionResult<Option<ArtistCard>> {
        let card = self
            .conn
            .query_row(
                &format!("SELECT {CARD_COLUMNS} FROM artist_card WHERE card_id = ?1"),
                params![card_id],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    pub fn require_card(&self, card_id: &str) -> ProgressionResult<ArtistCard> {
        self.card(card_id)?.ok_or_else(|| ProgressionError::CardNotFound {
            card_id: card_id.to_string(),
        })
    }

    /// Write back the card's economic state. Identity columns never change.
    pub fn save_card(&self, c: &ArtistCard) -> ProgressionResult<()> {
        let changed = self.conn.execute(
            "UPDATE artist_card SET
                current_fame = ?2, physical_copies = ?3, digital_downloads = ?4,
                total_streams = ?5, last_daily_update = ?6, daily_growth_streak = ?7
             WHERE card_id = ?1",
            params![
                c.card_id,
                c.current_fame,
                c.physical_copies,
                c.digital_downloads,
                c.total_streams,
                c.last_daily_update.map(to_epoch),
                c.daily_growth_streak,
            ],
        )?;
        if changed == 0 {
            return Err(ProgressionError::CardNotFound { card_id: c.card_id.clone() });
        }
        Ok(())
    }

    /// Every card id, oldest first. Used by the passive growth pass.
    pub fn all_card_ids(&self) -> ProgressionResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT card_id FROM artist_card ORDER BY created_at ASC, card_id ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn cards_for_owner(&self, owner_id: &str) -> ProgressionResult<Vec<ArtistCard>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM artist_card WHERE owner_id = ?1
             ORDER BY created_at ASC, card_id ASC"
        ))?;
        let rows = stmt.query_map(params![owner_id], card_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
