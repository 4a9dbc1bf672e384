use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::donations;
use crate::profile;

/// Timestamps round-trip through fixed-width text storage at microsecond
/// precision; clamp at creation so in-memory values match what readers see.
fn clamp_micros(t: DateTime<Utc>) -> DateTime<Utc> {
    t - chrono::Duration::nanoseconds(i64::from(t.timestamp_subsec_nanos() % 1000))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub initials: String,
    pub avatar_color: String,
    pub emotion: String,
    pub hope_points: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user with profile fields derived from the name.
    pub fn new(name: &str, email: &str, emotion: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            initials: profile::initials(name),
            avatar_color: profile::avatar_color(name).to_string(),
            emotion: emotion.unwrap_or_else(|| "neutral".to_string()),
            hope_points: 0,
            created_at: clamp_micros(now),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charity {
    pub id: String,
    pub name: String,
    pub description: String,
    pub charity_type: String,
    pub goal: f64,
    pub current_amount: f64,
    pub visual_type: String,
}

impl Charity {
    pub fn new(
        name: &str,
        description: &str,
        charity_type: &str,
        goal: f64,
        visual_type: &str,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            charity_type: charity_type.to_string(),
            goal,
            current_amount: 0.0,
            visual_type: visual_type.to_string(),
        }
    }

    /// The seed set served on first run.
    pub fn defaults() -> Vec<Charity> {
        vec![
            Charity::new(
                "Children's Future Fund",
                "Supporting education and healthcare for underprivileged children",
                "children",
                100_000.0,
                "tree",
            ),
            Charity::new(
                "Wildlife Protection",
                "Protecting endangered species and their habitats",
                "animals",
                75_000.0,
                "butterfly",
            ),
            Charity::new(
                "Education For All",
                "Providing books and educational resources to rural schools",
                "education",
                50_000.0,
                "books",
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Completed,
    /// Reserved for gateway rejections; nothing transitions here yet.
    Failed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Completed => "completed",
            DonationStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DonationStatus::Pending),
            "completed" => Some(DonationStatus::Completed),
            "failed" => Some(DonationStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: String,
    pub user_id: String,
    pub charity_id: String,
    pub amount: f64,
    pub ripple_color: String,
    pub ripple_size: f64,
    pub status: DonationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Donation {
    /// Build a pending donation. Ripple visuals are fixed here from the
    /// amount and never recomputed afterwards.
    pub fn new(user_id: &str, charity_id: &str, amount: f64, now: DateTime<Utc>) -> Self {
        let ripple = donations::ripple_properties(amount);
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            charity_id: charity_id.to_string(),
            amount,
            ripple_color: ripple.color.to_string(),
            ripple_size: ripple.size,
            status: DonationStatus::Pending,
            payment_id: None,
            paid_at: None,
            created_at: clamp_micros(now),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioMessage {
    pub id: String,
    pub user_id: String,
    pub donation_id: String,
    pub audio_data: String,
    pub duration: f64,
    pub created_at: DateTime<Utc>,
}

impl AudioMessage {
    pub fn new(
        user_id: &str,
        donation_id: &str,
        audio_data: String,
        duration: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.to_string(),
            donation_id: donation_id.to_string(),
            audio_data,
            duration,
            created_at: clamp_micros(now),
        }
    }
}

/// One leaderboard row; `weekly_donations` keeps its historical wire name
/// but counts all completed donations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub weekly_donations: i64,
    pub consistency_score: i64,
    pub hope_points: i64,
}

/// One settled donation on a user's timeline, enriched with charity info
/// for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub donation_id: String,
    pub amount: f64,
    pub charity_name: String,
    pub charity_type: String,
    pub visual_type: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_derives_profile_fields() {
        let user = User::new("Mitha M K", "mitha@example.com", None, Utc::now());
        assert_eq!(user.initials, "MK");
        assert!(user.avatar_color.starts_with('#'));
        assert_eq!(user.emotion, "neutral");
        assert_eq!(user.hope_points, 0);
    }

    #[test]
    fn new_donation_starts_pending_with_ripple() {
        let donation = Donation::new("u1", "c1", 75.5, Utc::now());
        assert_eq!(donation.status, DonationStatus::Pending);
        assert_eq!(donation.ripple_color, "#FFD93D");
        assert_eq!(donation.ripple_size, 7.55);
        assert!(donation.payment_id.is_none());
        assert!(donation.paid_at.is_none());
    }

    #[test]
    fn pending_donation_serializes_without_payment_fields() {
        let donation = Donation::new("u1", "c1", 20.0, Utc::now());
        let json = serde_json::to_value(&donation).unwrap();
        assert_eq!(json["status"], "pending");
        assert!(json.get("payment_id").is_none());
        assert!(json.get("paid_at").is_none());
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            DonationStatus::Pending,
            DonationStatus::Completed,
            DonationStatus::Failed,
        ] {
            assert_eq!(DonationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DonationStatus::parse("paid"), None);
    }

    #[test]
    fn default_charities_start_at_zero() {
        let defaults = Charity::defaults();
        assert_eq!(defaults.len(), 3);
        assert!(defaults.iter().all(|c| c.current_amount == 0.0));
        assert!(defaults.iter().any(|c| c.visual_type == "butterfly"));
    }
}
