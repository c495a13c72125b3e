//! # hive-backoffice: Service Layer for the Hive POS Back Office
//!
//! Authentication, the sale lifecycle, and the typed handler surface the
//! HTTP edge mounts.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Back Office Service Layer                           │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  handlers      │  │  services      │  │  infrastructure            ││
//! │  │                │  │                │  │                            ││
//! │  │ • auth         │  │ • AuthService  │  │ • TokenManager (JWT)       ││
//! │  │ • sales        │  │ • SaleService  │  │ • RateLimiter + counters   ││
//! │  │ • sale_items   │  │ • SmsSender    │  │ • AuthContext              ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  Request flow:                                                          │
//! │    edge → authenticate_optional(header) → AuthContext                  │
//! │         → handler(state, ctx, request DTO) → response DTO / ApiError   │
//! │         → edge maps ApiError::status_code() onto the response          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The HTTP edge itself (routing, parameter parsing) is an external
//! collaborator; everything behind it lives here.

pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod ratelimit;
pub mod services;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::ratelimit::{CounterStore, MemoryCounterStore};
use crate::services::sms_service::{LogSmsSender, SmsSender};
use crate::services::{AuthService, SaleService};
use hive_db::{Database, DbConfig};

// Re-exports
pub use config::BackofficeConfig;
pub use context::AuthContext;
pub use error::{ApiError, ApiResult};

/// Shared application state: one per process, handed to every handler.
pub struct AppState {
    pub config: BackofficeConfig,
    pub db: Database,
    pub auth: AuthService,
    pub sales: SaleService,
}

impl AppState {
    /// Production wiring: SQLite from config, in-memory rate-limit counters,
    /// logging SMS sender.
    pub async fn new(config: BackofficeConfig) -> ApiResult<Self> {
        let db = Database::new(DbConfig::new(&config.database_path))
            .await
            .map_err(ApiError::from)?;

        Ok(Self::with_dependencies(
            config,
            db,
            Arc::new(MemoryCounterStore::new()),
            Arc::new(LogSmsSender),
        ))
    }

    /// Explicit wiring, used by tests and by deployments that substitute a
    /// shared counter store or a real SMS gateway.
    pub fn with_dependencies(
        config: BackofficeConfig,
        db: Database,
        counters: Arc<dyn CounterStore>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        let auth = AuthService::new(db.clone(), &config, counters, sms);
        let sales = SaleService::new(db.clone());

        AppState {
            config,
            db,
            auth,
            sales,
        }
    }
}
