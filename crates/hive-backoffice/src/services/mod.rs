//! Service layer: authentication and the sale lifecycle.
//!
//! Services own the business flow (guards, pricing, security policy) and
//! delegate persistence to the repositories in `hive-db`.

pub mod auth_service;
pub mod sale_service;
pub mod sms_service;

pub use auth_service::{AuthService, LoginOutcome, TwoFactorSetup};
pub use sale_service::{SaleService, SaleWithItems};
pub use sms_service::{LogSmsSender, SmsSender};
