// Lifecycle tests for the donation ledger: create -> verify -> credit,
// exercised through the same trait object the handlers use.
use std::sync::Arc;

use chrono::{Duration, Utc};
use hopeorb::db;
use hopeorb::db::models::{AudioMessage, Charity, Donation, DonationStatus, User};
use hopeorb::db::repository::{DynLedger, Settlement, SqliteLedger};
use hopeorb::donations::reward_points;
use tempfile::TempDir;

fn test_store() -> (DynLedger, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");

    (Arc::new(SqliteLedger::new(pool)), temp_dir)
}

async fn register(store: &DynLedger, name: &str, email: &str) -> User {
    let user = User::new(name, email, None, Utc::now());
    store.insert_user(&user).await.unwrap();
    user
}

async fn first_charity(store: &DynLedger) -> Charity {
    store.seed_charities(&Charity::defaults()).await.unwrap();
    store.charities().await.unwrap().into_iter().next().unwrap()
}

#[tokio::test]
async fn full_lifecycle_credits_every_aggregate_exactly_once() {
    let (store, _temp) = test_store();

    let user = register(&store, "Mitha M K", "mitha@example.com").await;
    let charity = first_charity(&store).await;
    let goal_before = charity.goal;

    let donation = Donation::new(&user.id, &charity.id, 100.0, Utc::now());
    store.insert_donation(&donation).await.unwrap();

    // Pending donations are invisible to the public feed.
    assert!(store.completed_donations(100).await.unwrap().is_empty());

    let points = reward_points(donation.amount);
    let settlement = store
        .settle_donation(&donation.id, "pay-123", Utc::now(), points)
        .await
        .unwrap();
    assert!(matches!(settlement, Settlement::Credited(_)));

    let user = store.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(user.hope_points, 10);

    let charity = store.charity_by_id(&charity.id).await.unwrap().unwrap();
    assert_eq!(charity.current_amount, 100.0);
    // Settlement never touches the goal.
    assert_eq!(charity.goal, goal_before);

    let feed = store.completed_donations(100).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].status, DonationStatus::Completed);
    assert_eq!(feed[0].payment_id.as_deref(), Some("pay-123"));
}

#[tokio::test]
async fn repeated_verification_does_not_double_credit() {
    let (store, _temp) = test_store();

    let user = register(&store, "Donor", "donor@example.com").await;
    let charity = first_charity(&store).await;

    let donation = Donation::new(&user.id, &charity.id, 250.0, Utc::now());
    store.insert_donation(&donation).await.unwrap();

    let points = reward_points(250.0);
    store
        .settle_donation(&donation.id, "pay-first", Utc::now(), points)
        .await
        .unwrap();

    // A retry (client refresh, gateway callback replay) must be a no-op.
    let second = store
        .settle_donation(&donation.id, "pay-second", Utc::now(), points)
        .await
        .unwrap();
    match second {
        Settlement::AlreadySettled(d) => {
            assert_eq!(d.payment_id.as_deref(), Some("pay-first"));
        }
        Settlement::Credited(_) => panic!("retry must not credit again"),
    }

    let user = store.user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(user.hope_points, 25);

    let charity = store.charity_by_id(&charity.id).await.unwrap().unwrap();
    assert_eq!(charity.current_amount, 250.0);
}

#[tokio::test]
async fn stored_ripple_matches_amount_rules() {
    let (store, _temp) = test_store();

    let user = register(&store, "Donor", "donor@example.com").await;
    let charity = first_charity(&store).await;

    for (amount, color, size) in [
        (5.0, "#4ECDC4", 1.0),
        (75.5, "#FFD93D", 7.55),
        (100.0, "#FF6B9D", 10.0),
        (2000.0, "#9D4EDD", 10.0),
    ] {
        let donation = Donation::new(&user.id, &charity.id, amount, Utc::now());
        store.insert_donation(&donation).await.unwrap();

        let loaded = store.donation_by_id(&donation.id).await.unwrap().unwrap();
        assert_eq!(loaded.ripple_color, color, "color for amount {amount}");
        assert_eq!(loaded.ripple_size, size, "size for amount {amount}");
    }
}

#[tokio::test]
async fn charity_bootstrap_is_idempotent() {
    let (store, _temp) = test_store();

    assert_eq!(store.seed_charities(&Charity::defaults()).await.unwrap(), 3);
    assert_eq!(store.seed_charities(&Charity::defaults()).await.unwrap(), 0);

    let charities = store.charities().await.unwrap();
    assert_eq!(charities.len(), 3);
    let names: Vec<_> = charities.iter().map(|c| c.name.as_str()).collect();
    assert!(names.contains(&"Children's Future Fund"));
    assert!(names.contains(&"Wildlife Protection"));
    assert!(names.contains(&"Education For All"));
}

#[tokio::test]
async fn leaderboard_and_timeline_reflect_settled_donations() {
    let (store, _temp) = test_store();

    let alice = register(&store, "Alice", "alice@example.com").await;
    let bob = register(&store, "Bob", "bob@example.com").await;
    let charity = first_charity(&store).await;
    let now = Utc::now();

    // Alice settles three, Bob settles one and leaves one pending.
    for i in 0..3 {
        let d = Donation::new(&alice.id, &charity.id, 30.0, now - Duration::minutes(i));
        store.insert_donation(&d).await.unwrap();
        store
            .settle_donation(&d.id, "pay", now, reward_points(30.0))
            .await
            .unwrap();
    }
    let settled = Donation::new(&bob.id, &charity.id, 600.0, now);
    store.insert_donation(&settled).await.unwrap();
    store
        .settle_donation(&settled.id, "pay", now, reward_points(600.0))
        .await
        .unwrap();
    let pending = Donation::new(&bob.id, &charity.id, 50.0, now);
    store.insert_donation(&pending).await.unwrap();

    let board = store.leaderboard(10).await.unwrap();
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].name, "Alice");
    assert_eq!(board[0].weekly_donations, 3);
    assert_eq!(board[0].consistency_score, 30);
    assert_eq!(board[0].hope_points, 9);
    assert_eq!(board[1].name, "Bob");
    assert_eq!(board[1].hope_points, 60);

    let timeline = store.user_timeline(&bob.id).await.unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].donation_id, settled.id);
    assert_eq!(timeline[0].charity_name, charity.name);
    assert_eq!(timeline[0].visual_type, charity.visual_type);
}

#[tokio::test]
async fn newest_audio_message_wins_for_a_donation() {
    let (store, _temp) = test_store();

    let now = Utc::now();
    let earlier = AudioMessage::new("u1", "d1", "payload-one".into(), 4.0, now - Duration::seconds(30));
    let later = AudioMessage::new("u1", "d1", "payload-two".into(), 2.5, now);
    store.insert_audio_message(&earlier).await.unwrap();
    store.insert_audio_message(&later).await.unwrap();

    let found = store.latest_audio_for_donation("d1").await.unwrap().unwrap();
    assert_eq!(found.id, later.id);
    assert_eq!(found.duration, 2.5);

    assert!(store
        .latest_audio_for_donation("unheard")
        .await
        .unwrap()
        .is_none());
}
