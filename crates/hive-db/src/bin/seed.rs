//! # Seed Data Generator
//!
//! Populates the database with development data: a default admin account,
//! a small product catalog, and a pair of discounts.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p hive-db --bin seed
//!
//! # Specify database path
//! cargo run -p hive-db --bin seed -- --db ./data/hive.db
//! ```
//!
//! ## Default Accounts
//! - admin@hivepos.local / ChangeMe1! (admin, must change password)
//!
//! Products cover a small apiary-shop catalog (honey, wax, candles, soap)
//! with varied stock levels so the low/out-of-stock states show up in the
//! dashboard immediately.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHasher,
};
use chrono::Utc;
use std::env;
use uuid::Uuid;

use hive_core::{
    Customer, Discount, DiscountType, Product, User, UserRole, DEFAULT_LOW_STOCK_THRESHOLD,
};
use hive_db::{Database, DbConfig};

const PRODUCTS: &[(&str, &str, &str, f64, i64)] = &[
    // (sku, name, category, price, stock)
    ("HONEY250", "Wildflower Honey 250g", "Pantry", 5.49, 40),
    ("HONEY500", "Wildflower Honey 500g", "Pantry", 8.99, 25),
    ("HONEY1KG", "Wildflower Honey 1kg", "Pantry", 15.99, 12),
    ("COMB200", "Raw Honeycomb 200g", "Pantry", 9.49, 4),
    ("WAX100", "Beeswax Block 100g", "Craft", 4.50, 30),
    ("CANDLE1", "Beeswax Taper Candle", "Craft", 6.00, 18),
    ("CANDLE2", "Beeswax Pillar Candle", "Craft", 11.00, 3),
    ("SOAP90", "Honey Oat Soap 90g", "Bath", 4.25, 50),
    ("BALM15", "Beeswax Lip Balm 15ml", "Bath", 3.75, 0),
    ("GIFTBOX", "Apiary Gift Box", "Gifts", 29.99, 6),
];

fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| format!("password hashing failed: {e}"))?;
    Ok(hash.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let db_path = args
        .iter()
        .position(|a| a == "--db")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "./hive.db".to_string());

    tracing::info!(path = %db_path, "Seeding database");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let now = Utc::now();

    // Default admin, forced through a password change on first login
    let admin = User {
        id: Uuid::new_v4().to_string(),
        email: "admin@hivepos.local".to_string(),
        password_hash: hash_password("ChangeMe1!")?,
        first_name: "Hive".to_string(),
        last_name: "Admin".to_string(),
        role: UserRole::Admin,
        active: true,
        confirmed_at: Some(now),
        failed_attempts: 0,
        locked_at: None,
        unlock_token: None,
        two_factor_enabled: false,
        two_factor_secret: None,
        two_factor_backup_codes: None,
        sms_verification_enabled: false,
        phone_number: None,
        phone_verified_at: None,
        sms_verification_code: None,
        sms_code_expires_at: None,
        session_token: Some(Uuid::new_v4().to_string()),
        password_changed_at: None,
        must_change_password: true,
        sign_in_count: 0,
        current_sign_in_at: None,
        last_sign_in_at: None,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&admin).await?;
    tracing::info!(email = %admin.email, "Seeded admin user");

    for (sku, name, category, price, stock) in PRODUCTS {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            description: None,
            category: category.to_string(),
            price: *price,
            stock_quantity: *stock,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await?;
    }
    tracing::info!(count = PRODUCTS.len(), "Seeded products");

    let discounts = [
        Discount {
            id: Uuid::new_v4().to_string(),
            name: "Big basket 10%".to_string(),
            description: Some("10% off sales of $100 or more".to_string()),
            discount_type: DiscountType::Percentage,
            value: 10.0,
            minimum_amount: 100.0,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: now,
            updated_at: now,
        },
        Discount {
            id: Uuid::new_v4().to_string(),
            name: "Loyalty $5".to_string(),
            description: Some("$5 off sales of $10 or more".to_string()),
            discount_type: DiscountType::FixedAmount,
            value: 5.0,
            minimum_amount: 10.0,
            active: true,
            starts_at: None,
            ends_at: None,
            created_at: now,
            updated_at: now,
        },
    ];
    for discount in &discounts {
        db.discounts().insert(discount).await?;
    }
    tracing::info!(count = discounts.len(), "Seeded discounts");

    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        first_name: "Rowan".to_string(),
        last_name: "Hale".to_string(),
        email: Some("rowan@example.com".to_string()),
        phone: None,
        created_at: now,
        updated_at: now,
    };
    db.customers().insert(&customer).await?;
    tracing::info!("Seeded sample customer");

    tracing::info!("Seed complete");
    Ok(())
}
