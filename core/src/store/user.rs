use super::{opt_ts, ProgressStore};
use crate::{
    error::{ProgressionError, ProgressionResult},
    model::UserProgress,
    tier_economy::SubscriptionTier,
    types::{from_epoch, to_epoch, Timestamp},
};
use rusqlite::{params, OptionalExtension, Row};

const USER_COLUMNS: &str = "user_id, display_name, fame, total_streams, daily_streams, fanbase,
     chart_position, experience, influence, level, subscription_tier, subscription_price,
     credits, total_credits_earned, total_credits_spent, free_band_generations_remaining,
     band_generation_count, last_credit_renewal, last_activity_date, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserProgress> {
    let tier_name: String = row.get(10)?;
    let subscription_tier = tier_name.parse::<SubscriptionTier>().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            10,
            rusqlite::types::Type::Text,
            format!("unknown subscription tier '{tier_name}'").into(),
        )
    })?;
    Ok(UserProgress {
        user_id: row.get(0)?,
        display_name: row.get(1)?,
        fame: row.get(2)?,
        total_streams: row.get(3)?,
        daily_streams: row.get(4)?,
        fanbase: row.get(5)?,
        chart_position: row.get(6)?,
        experience: row.get(7)?,
        influence: row.get(8)?,
        level: row.get(9)?,
        subscription_tier,
        subscription_price: row.get(11)?,
        credits: row.get(12)?,
        total_credits_earned: row.get(13)?,
        total_credits_spent: row.get(14)?,
        free_band_generations_remaining: row.get(15)?,
        band_generation_count: row.get(16)?,
        last_credit_renewal: opt_ts(row.get(17)?),
        last_activity_date: opt_ts(row.get(18)?),
        created_at: from_epoch(row.get(19)?),
    })
}

impl ProgressStore {
    // ── User progress ─────────────────────────────────────────────

    pub fn insert_user(&self, u: &UserProgress) -> ProgressionResult<()> {
        self.conn.execute(
            &format!("INSERT INTO user_progress ({USER_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20)"),
            params![
                u.user_id,
                u.display_name,
                u.fame,
                u.total_streams,
                u.daily_streams,
                u.fanbase,
                u.chart_position,
                u.experience,
                u.influence,
                u.level,
                u.subscription_tier.as_str(),
                u.subscription_price,
                u.credits,
                u.total_credits_earned,
                u.total_credits_spent,
                u.free_band_generations_remaining,
                u.band_generation_count,
                u.last_credit_renewal.map(to_epoch),
                u.last_activity_date.map(to_epoch),
                to_epoch(u.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn user(&self, user_id: &str) -> ProgressionResult<Option<UserProgress>> {
        let user = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM user_progress WHERE user_id = ?1"),
                params![user_id],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    /// Like `user()`, but a missing row is a `UserNotFound` error.
    pub fn require_user(&self, user_id: &str) -> ProgressionResult<UserProgress> {
        self.user(user_id)?.ok_or_else(|| ProgressionError::UserNotFound {
            user_id: user_id.to_string(),
        })
    }

    /// Write back every mutable column of `u`.
    pub fn save_user(&self, u: &UserProgress) -> ProgressionResult<()> {
        let changed = self.conn.execute(
            "UPDATE user_progress SET
                fame = ?2, total_streams = ?3, daily_streams = ?4, fanbase = ?5,
                chart_position = ?6, experience = ?7, influence = ?8, level = ?9,
                subscription_tier = ?10, subscription_price = ?11, credits = ?12,
                total_credits_earned = ?13, total_credits_spent = ?14,
                free_band_generations_remaining = ?15, band_generation_count = ?16,
                last_credit_renewal = ?17, last_activity_date = ?18
             WHERE user_id = ?1",
            params![
                u.user_id,
                u.fame,
                u.total_streams,
                u.daily_streams,
                u.fanbase,
                u.chart_position,
                u.experience,
                u.influence,
                u.level,
                u.subscription_tier.as_str(),
                u.subscription_price,
                u.credits,
                u.total_credits_earned,
                u.total_credits_spent,
                u.free_band_generations_remaining,
                u.band_generation_count,
                u.last_credit_renewal.map(to_epoch),
                u.last_activity_date.map(to_epoch),
            ],
        )?;
        if changed == 0 {
            return Err(ProgressionError::UserNotFound { user_id: u.user_id.clone() });
        }
        Ok(())
    }

    /// Users with any activity beyond a blank account, in user_id order.
    pub fn active_users(&self) -> ProgressionResult<Vec<UserProgress>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user_progress
             WHERE fame > 1 OR total_streams > 0 OR fanbase > 0
             ORDER BY user_id ASC"
        ))?;
        let rows = stmt.query_map([], user_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Ranked users ordered by chart position (1 first).
    pub fn ranked_users(&self, limit: usize) -> ProgressionResult<Vec<UserProgress>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user_progress
             WHERE chart_position > 0
             ORDER BY chart_position ASC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], user_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn clear_chart_positions(&self) -> ProgressionResult<usize> {
        let cleared = self.conn.execute(
            "UPDATE user_progress SET chart_position = 0 WHERE chart_position != 0",
            [],
        )?;
        Ok(cleared)
    }

    pub fn set_chart_position(&self, user_id: &str, position: i64) -> ProgressionResult<()> {
        self.conn.execute(
            "UPDATE user_progress SET chart_position = ?1 WHERE user_id = ?2",
            params![position, user_id],
        )?;
        Ok(())
    }

    /// Paying users whose last renewal (or signup) is at or before `cutoff`.
    pub fn users_due_for_renewal(&self, cutoff: Timestamp) -> ProgressionResult<Vec<UserProgress>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user_progress
             WHERE subscription_tier != ?1
               AND COALESCE(last_credit_renewal, created_at) <= ?2
             ORDER BY user_id ASC"
        ))?;
        let rows = stmt.query_map(
            params![SubscriptionTier::Fan.as_str(), to_epoch(cutoff)],
            user_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Deduct `amount` only if the balance covers it.
    /// Returns false (and changes nothing) when it does not.
    pub fn try_debit_credits(&self, user_id: &str, amount: i64) -> ProgressionResult<bool> {
        let changed = self.conn.execute(
            "UPDATE user_progress
             SET credits = credits - ?1, total_credits_spent = total_credits_spent + ?1
             WHERE user_id = ?2 AND credits >= ?1",
            params![amount, user_id],
        )?;
        Ok(changed == 1)
    }

    pub fn user_count(&self) -> ProgressionResult<i64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM user_progress", [], |row| row.get(0))?;
        Ok(count)
    }
}
