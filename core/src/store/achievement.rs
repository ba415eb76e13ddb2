//! Store methods for sales milestone achievements.

use super::ProgressStore;
use crate::{
    error::ProgressionResult,
    model::BandAchievement,
    types::{from_epoch, to_epoch},
};
use rusqlite::params;

impl ProgressStore {
    pub fn achievement_exists(&self, card_id: &str, achievement_type: &str) -> ProgressionResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM band_achievement
             WHERE card_id = ?1 AND achievement_type = ?2",
            params![card_id, achievement_type],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert unless the (card, type) pair already exists.
    /// Returns true only when a new row was written.
    pub fn insert_achievement(&self, a: &BandAchievement) -> ProgressionResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO band_achievement (
                achievement_id, card_id, achievement_type, sales_required,
                sales_at_achievement, fame_boost_percent, achieved_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                a.achievement_id,
                a.card_id,
                a.achievement_type,
                a.sales_required,
                a.sales_at_achievement,
                a.fame_boost_percent,
                to_epoch(a.achieved_at),
            ],
        )?;
        Ok(changed == 1)
    }

    pub fn achievements_for_card(&self, card_id: &str) -> ProgressionResult<Vec<BandAchievement>> {
        let mut stmt = self.conn.prepare(
            "SELECT achievement_id, card_id, achievement_type, sales_required,
                    sales_at_achievement, fame_boost_percent, achieved_at
             FROM band_achievement WHERE card_id = ?1
             ORDER BY sales_required ASC",
        )?;
        let rows = stmt.query_map(params![card_id], |row| {
            Ok(BandAchievement {
                achievement_id: row.get(0)?,
                card_id: row.get(1)?,
                achievement_type: row.get(2)?,
                sales_required: row.get(3)?,
                sales_at_achievement: row.get(4)?,
                fame_boost_percent: row.get(5)?,
                achieved_at: from_epoch(row.get(6)?),
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
