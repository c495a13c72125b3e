//! Shared fixtures for handler and service tests.

use std::sync::Arc;

use chrono::Utc;

use crate::config::BackofficeConfig;
use crate::ratelimit::MemoryCounterStore;
use crate::services::auth_service::hash_password;
use crate::services::sms_service::LogSmsSender;
use crate::AppState;
use hive_core::{Product, User, UserRole};
use hive_db::repository::product::generate_product_id;
use hive_db::repository::user::generate_user_id;
use hive_db::{Database, DbConfig};

/// An AppState over a fresh in-memory database.
pub async fn test_state() -> (AppState, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let state = AppState::with_dependencies(
        BackofficeConfig::for_tests(),
        db.clone(),
        Arc::new(MemoryCounterStore::new()),
        Arc::new(LogSmsSender),
    );
    (state, db)
}

/// Inserts an active, confirmed employee with the given credentials.
pub async fn seed_user(db: &Database, email: &str, password: &str) -> User {
    let now = Utc::now();
    let user = User {
        id: generate_user_id(),
        email: email.to_string(),
        password_hash: hash_password(password).unwrap(),
        first_name: "Avery".to_string(),
        last_name: "Quinn".to_string(),
        role: UserRole::Employee,
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
        session_token: Some("seed-session".to_string()),
        password_changed_at: None,
        must_change_password: false,
        sign_in_count: 0,
        current_sign_in_at: None,
        last_sign_in_at: None,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&user).await.unwrap();
    user
}

/// Inserts an active product.
pub async fn seed_product(db: &Database, sku: &str, price: f64, stock: i64) -> Product {
    let now = Utc::now();
    let product = Product {
        id: generate_product_id(),
        sku: sku.to_string(),
        name: format!("Product {sku}"),
        description: None,
        category: "Pantry".to_string(),
        price,
        stock_quantity: stock,
        low_stock_threshold: 5,
        active: true,
        created_at: now,
        updated_at: now,
    };
    db.products().insert(&product).await.unwrap();
    product
}
