// Repository pattern - isolates all database side effects
use crate::db::models::{
    AudioMessage, Charity, Donation, DonationStatus, LeaderboardEntry, TimelineEntry, User,
};
use crate::state::DbPool;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Outcome of a settlement attempt.
#[derive(Debug, Clone)]
pub enum Settlement {
    /// The donation flipped pending -> completed and both counters
    /// were credited.
    Credited(Donation),
    /// The donation had been settled before; nothing changed and the
    /// stored payment reference is returned.
    AlreadySettled(Donation),
}

/// Repository trait - all database operations
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert a new user; duplicate email maps to Conflict
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError>;

    /// Load a user by id
    async fn user_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;

    /// Load a user by email (exact match)
    async fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Insert the default charities if the table is empty; returns how
    /// many were inserted (0 when already seeded)
    async fn seed_charities(&self, defaults: &[Charity]) -> Result<usize, RepositoryError>;

    /// All charities
    async fn charities(&self) -> Result<Vec<Charity>, RepositoryError>;

    /// Load a charity by id
    async fn charity_by_id(&self, id: &str) -> Result<Option<Charity>, RepositoryError>;

    /// Insert a new (pending) donation
    async fn insert_donation(&self, donation: &Donation) -> Result<(), RepositoryError>;

    /// Load a donation by id
    async fn donation_by_id(&self, id: &str) -> Result<Option<Donation>, RepositoryError>;

    /// Completed donations, newest first
    async fn completed_donations(&self, limit: u32) -> Result<Vec<Donation>, RepositoryError>;

    /// Atomically settle a donation: flip it to completed and credit
    /// the charity total and the donor's hope points, exactly once
    async fn settle_donation(
        &self,
        donation_id: &str,
        payment_id: &str,
        paid_at: DateTime<Utc>,
        points: i64,
    ) -> Result<Settlement, RepositoryError>;

    /// Store a voice note
    async fn insert_audio_message(&self, message: &AudioMessage) -> Result<(), RepositoryError>;

    /// The newest voice note attached to a donation
    async fn latest_audio_for_donation(
        &self,
        donation_id: &str,
    ) -> Result<Option<AudioMessage>, RepositoryError>;

    /// Users ranked by number of completed donations
    async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, RepositoryError>;

    /// A user's completed donations, newest first, enriched with
    /// charity display fields
    async fn user_timeline(&self, user_id: &str) -> Result<Vec<TimelineEntry>, RepositoryError>;
}

/// SQLite implementation
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width RFC 3339 text so lexicographic order in SQL matches
/// chronological order.
fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, false)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let created_raw: String = row.get(7)?;
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        initials: row.get(3)?,
        avatar_color: row.get(4)?,
        emotion: row.get(5)?,
        hope_points: row.get(6)?,
        created_at: parse_ts(7, &created_raw)?,
    })
}

fn row_to_charity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Charity> {
    Ok(Charity {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        charity_type: row.get(3)?,
        goal: row.get(4)?,
        current_amount: row.get(5)?,
        visual_type: row.get(6)?,
    })
}

fn row_to_donation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Donation> {
    let status_raw: String = row.get(6)?;
    let status = DonationStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown donation status: {status_raw}").into(),
        )
    })?;
    let paid_raw: Option<String> = row.get(8)?;
    let paid_at = match paid_raw {
        Some(raw) => Some(parse_ts(8, &raw)?),
        None => None,
    };
    let created_raw: String = row.get(9)?;
    Ok(Donation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        charity_id: row.get(2)?,
        amount: row.get(3)?,
        ripple_color: row.get(4)?,
        ripple_size: row.get(5)?,
        status,
        payment_id: row.get(7)?,
        paid_at,
        created_at: parse_ts(9, &created_raw)?,
    })
}

fn row_to_audio(row: &rusqlite::Row<'_>) -> rusqlite::Result<AudioMessage> {
    let created_raw: String = row.get(5)?;
    Ok(AudioMessage {
        id: row.get(0)?,
        user_id: row.get(1)?,
        donation_id: row.get(2)?,
        audio_data: row.get(3)?,
        duration: row.get(4)?,
        created_at: parse_ts(5, &created_raw)?,
    })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO users (id, name, email, initials, avatar_color, emotion, hope_points, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.name,
                user.email,
                user.initials,
                user.avatar_color,
                user.emotion,
                user.hope_points,
                ts(user.created_at)
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                RepositoryError::Conflict(format!("email {} is already registered", user.email))
            } else {
                e.into()
            }
        })?;

        Ok(())
    }

    async fn user_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, name, email, initials, avatar_color, emotion, hope_points, created_at
             FROM users WHERE id = ?1",
            params![id],
            row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, name, email, initials, avatar_color, emotion, hope_points, created_at
             FROM users WHERE email = ?1",
            params![email],
            row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn seed_charities(&self, defaults: &[Charity]) -> Result<usize, RepositoryError> {
        let conn = self.pool.get()?;

        // The emptiness check and the inserts must see the same state.
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<usize, RepositoryError> = (|| {
            let existing: i64 =
                conn.query_row("SELECT COUNT(*) FROM charities", [], |row| row.get(0))?;
            if existing > 0 {
                return Ok(0);
            }

            for charity in defaults {
                conn.execute(
                    "INSERT INTO charities (id, name, description, charity_type, goal, current_amount, visual_type)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        charity.id,
                        charity.name,
                        charity.description,
                        charity.charity_type,
                        charity.goal,
                        charity.current_amount,
                        charity.visual_type
                    ],
                )?;
            }

            Ok(defaults.len())
        })();

        match result {
            Ok(inserted) => {
                conn.execute("COMMIT", [])?;
                Ok(inserted)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }

    async fn charities(&self) -> Result<Vec<Charity>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, description, charity_type, goal, current_amount, visual_type
             FROM charities",
        )?;
        let charities = stmt
            .query_map([], row_to_charity)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(charities)
    }

    async fn charity_by_id(&self, id: &str) -> Result<Option<Charity>, RepositoryError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, name, description, charity_type, goal, current_amount, visual_type
             FROM charities WHERE id = ?1",
            params![id],
            row_to_charity,
        );

        match result {
            Ok(charity) => Ok(Some(charity)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_donation(&self, donation: &Donation) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO donations (id, user_id, charity_id, amount, ripple_color, ripple_size, status, payment_id, paid_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                donation.id,
                donation.user_id,
                donation.charity_id,
                donation.amount,
                donation.ripple_color,
                donation.ripple_size,
                donation.status.as_str(),
                donation.payment_id,
                donation.paid_at.map(ts),
                ts(donation.created_at)
            ],
        )?;

        Ok(())
    }

    async fn donation_by_id(&self, id: &str) -> Result<Option<Donation>, RepositoryError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, user_id, charity_id, amount, ripple_color, ripple_size, status, payment_id, paid_at, created_at
             FROM donations WHERE id = ?1",
            params![id],
            row_to_donation,
        );

        match result {
            Ok(donation) => Ok(Some(donation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn completed_donations(&self, limit: u32) -> Result<Vec<Donation>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, user_id, charity_id, amount, ripple_color, ripple_size, status, payment_id, paid_at, created_at
             FROM donations
             WHERE status = 'completed'
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;
        let donations = stmt
            .query_map(params![limit], row_to_donation)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(donations)
    }

    async fn settle_donation(
        &self,
        donation_id: &str,
        payment_id: &str,
        paid_at: DateTime<Utc>,
        points: i64,
    ) -> Result<Settlement, RepositoryError> {
        let conn = self.pool.get()?;

        // ATOMIC TRANSACTION - the status flip and both credits land
        // together or not at all
        conn.execute("BEGIN IMMEDIATE", [])?;

        let result: Result<Settlement, RepositoryError> = (|| {
            // Guarded flip: only a pending donation settles. Zero rows
            // changed means someone else settled it first.
            let changed = conn.execute(
                "UPDATE donations
                 SET status = 'completed', payment_id = ?1, paid_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![payment_id, ts(paid_at), donation_id],
            )?;

            let donation = match conn.query_row(
                "SELECT id, user_id, charity_id, amount, ripple_color, ripple_size, status, payment_id, paid_at, created_at
                 FROM donations WHERE id = ?1",
                params![donation_id],
                row_to_donation,
            ) {
                Ok(donation) => donation,
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    return Err(RepositoryError::NotFound(format!("donation {donation_id}")));
                }
                Err(e) => return Err(e.into()),
            };

            if changed == 0 {
                return Ok(Settlement::AlreadySettled(donation));
            }

            conn.execute(
                "UPDATE charities SET current_amount = current_amount + ?1 WHERE id = ?2",
                params![donation.amount, donation.charity_id],
            )?;
            conn.execute(
                "UPDATE users SET hope_points = hope_points + ?1 WHERE id = ?2",
                params![points, donation.user_id],
            )?;

            Ok(Settlement::Credited(donation))
        })();

        match result {
            Ok(settlement) => {
                conn.execute("COMMIT", [])?;
                Ok(settlement)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }

    async fn insert_audio_message(&self, message: &AudioMessage) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO audio_messages (id, user_id, donation_id, audio_data, duration, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                message.id,
                message.user_id,
                message.donation_id,
                message.audio_data,
                message.duration,
                ts(message.created_at)
            ],
        )?;

        Ok(())
    }

    async fn latest_audio_for_donation(
        &self,
        donation_id: &str,
    ) -> Result<Option<AudioMessage>, RepositoryError> {
        let conn = self.pool.get()?;

        let result = conn.query_row(
            "SELECT id, user_id, donation_id, audio_data, duration, created_at
             FROM audio_messages
             WHERE donation_id = ?1
             ORDER BY created_at DESC
             LIMIT 1",
            params![donation_id],
            row_to_audio,
        );

        match result {
            Ok(message) => Ok(Some(message)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn leaderboard(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT d.user_id, u.name, COUNT(*) AS completed, u.hope_points
             FROM donations d
             JOIN users u ON u.id = d.user_id
             WHERE d.status = 'completed'
             GROUP BY d.user_id, u.name, u.hope_points
             ORDER BY completed DESC, u.name ASC
             LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], |row| {
                let completed: i64 = row.get(2)?;
                Ok(LeaderboardEntry {
                    user_id: row.get(0)?,
                    name: row.get(1)?,
                    weekly_donations: completed,
                    consistency_score: completed * 10,
                    hope_points: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    async fn user_timeline(&self, user_id: &str) -> Result<Vec<TimelineEntry>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT d.id, d.amount, c.name, c.charity_type, c.visual_type, d.created_at
             FROM donations d
             JOIN charities c ON c.id = d.charity_id
             WHERE d.user_id = ?1 AND d.status = 'completed'
             ORDER BY d.created_at DESC",
        )?;
        let entries = stmt
            .query_map(params![user_id], |row| {
                let created_raw: String = row.get(5)?;
                Ok(TimelineEntry {
                    donation_id: row.get(0)?,
                    amount: row.get(1)?,
                    charity_name: row.get(2)?,
                    charity_type: row.get(3)?,
                    visual_type: row.get(4)?,
                    timestamp: parse_ts(5, &created_raw)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

/// Type alias for Arc-wrapped repository (for AppState)
pub type DynLedger = Arc<dyn Ledger>;
