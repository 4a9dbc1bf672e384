// Donation rules - pure functions over amounts, no side effects

use serde::Serialize;
use uuid::Uuid;

const RIPPLE_TURQUOISE: &str = "#4ECDC4";
const RIPPLE_GOLD: &str = "#FFD93D";
const RIPPLE_PINK: &str = "#FF6B9D";
const RIPPLE_PURPLE: &str = "#9D4EDD";

/// Visual properties of the ripple a donation paints on the globe.
/// Computed once at creation time and stored with the donation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RippleProperties {
    pub size: f64,
    pub color: &'static str,
}

/// Size scales linearly with amount on a 1..=10 scale (amount / 10,
/// clamped); color steps through fixed tiers.
pub fn ripple_properties(amount: f64) -> RippleProperties {
    let size = (amount / 10.0).clamp(1.0, 10.0);
    let color = if amount < 50.0 {
        RIPPLE_TURQUOISE
    } else if amount < 100.0 {
        RIPPLE_GOLD
    } else if amount < 500.0 {
        RIPPLE_PINK
    } else {
        RIPPLE_PURPLE
    };
    RippleProperties { size, color }
}

/// Hope points awarded when a donation settles: one point per ten
/// currency units, fractions discarded.
pub fn reward_points(amount: f64) -> i64 {
    (amount / 10.0).floor() as i64
}

/// A one-shot payment reference. Nothing here is persisted; the link is
/// regenerated on demand and the id only becomes durable if a gateway
/// callback hands it back through verification.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReference {
    pub upi_link: String,
    pub qr_data: String,
    pub payment_id: String,
}

/// Build the UPI deep link for a donation. The transaction note carries
/// the donation id (space percent-encoded) so the gateway round-trips it.
pub fn payment_reference(
    donation_id: &str,
    amount: f64,
    handle: &str,
    payee: &str,
    currency: &str,
) -> PaymentReference {
    let upi_link = format!(
        "upi://pay?pa={handle}&pn={payee}&am={amount}&cu={currency}&tn=Donation%20{donation_id}"
    );
    PaymentReference {
        qr_data: upi_link.clone(),
        upi_link,
        payment_id: Uuid::now_v7().to_string(),
    }
}
