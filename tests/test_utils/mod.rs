//! Test utilities for database testing.
//!
//! In-memory SQLite databases with migrations applied, plus fixture helpers
//! that go through the repositories so ledger invariants hold.

#![allow(dead_code)]

use anyhow::Result;
use databundle::config::AppConfig;
use databundle::models::{OrderStatus, bundle, network, order, vendor};
use databundle::password::hash_password;
use databundle::repositories::{
    BundleRepository, NetworkRepository, NewBundle, NewOrder, NewVendor, OrderRepository,
    VendorRepository,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-tests-secret-0123456789abcdef";
pub const TEST_PASSWORD: &str = "correct-horse-battery";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password-123";

/// 10% commission: a bundle priced 200 earns its vendor 20.
pub const COMMISSION_BPS: u32 = 1000;

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Sets up a migrated SQLite database file inside `dir`, so several pooled
/// connections see the same data.
pub async fn setup_file_db(dir: &TempDir) -> Result<DatabaseConnection> {
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("ledger.db").display()
    );
    let db = Database::connect(&url).await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Configuration suitable for driving the router in tests, with admin login enabled.
pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password_hash: Some(
            hash_password(ADMIN_PASSWORD).expect("hashing admin fixture password"),
        ),
        vendor_commission_bps: COMMISSION_BPS,
        ..AppConfig::default()
    }
}

/// Creates a vendor whose password is [`TEST_PASSWORD`].
pub async fn create_test_vendor(db: &DatabaseConnection, email: &str) -> Result<vendor::Model> {
    let vendor = VendorRepository::new(db)
        .create(NewVendor {
            full_name: format!("Vendor {email}"),
            email: email.to_string(),
            password_hash: hash_password(TEST_PASSWORD)?,
            phone_number: "+233241234567".to_string(),
            momo_number: "0241234567".to_string(),
        })
        .await?;
    Ok(vendor)
}

pub async fn create_test_network(db: &DatabaseConnection, name: &str) -> Result<network::Model> {
    Ok(NetworkRepository::new(db).create(name).await?)
}

pub async fn create_test_bundle(
    db: &DatabaseConnection,
    network_id: Uuid,
    price: i64,
) -> Result<bundle::Model> {
    let bundle = BundleRepository::new(db)
        .create(NewBundle {
            network_id,
            name: format!("Bundle {price}"),
            size: "1GB".to_string(),
            price,
        })
        .await?;
    Ok(bundle)
}

/// Places an order for `bundle_id`, optionally attributed to `vendor_id`.
pub async fn place_test_order(
    db: &DatabaseConnection,
    bundle_id: Uuid,
    vendor_id: Option<Uuid>,
) -> Result<order::Model> {
    let order = OrderRepository::new(db, COMMISSION_BPS)
        .place(NewOrder {
            phone_number: "0241234567".to_string(),
            network: "MTN".to_string(),
            package: "1GB".to_string(),
            bundle_id: Some(bundle_id),
            vendor_id,
        })
        .await?;
    Ok(order)
}

/// Places a vendor order priced so that its profit is `profit`, then completes it.
pub async fn completed_order_with_profit(
    db: &DatabaseConnection,
    vendor_id: Uuid,
    profit: i64,
) -> Result<order::Model> {
    let network = create_test_network(db, &format!("Net-{}", Uuid::new_v4())).await?;
    let price = profit * 10_000 / i64::from(COMMISSION_BPS);
    let bundle = create_test_bundle(db, network.id, price).await?;
    let placed = place_test_order(db, bundle.id, Some(vendor_id)).await?;

    let completed = OrderRepository::new(db, COMMISSION_BPS)
        .update_status(placed.id, OrderStatus::Completed)
        .await?;
    assert_eq!(completed.profit, profit);
    Ok(completed)
}
