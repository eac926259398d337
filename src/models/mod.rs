//! # Data Models
//!
//! SeaORM entities for the vendor, catalog and ledger tables, plus the closed
//! status enumerations stored in the ledger `status` columns.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub mod bundle;
pub mod network;
pub mod order;
pub mod vendor;
pub mod withdrawal;

pub use bundle::Entity as Bundle;
pub use network::Entity as Network;
pub use order::{Entity as Order, OrderStatus};
pub use vendor::Entity as Vendor;
pub use withdrawal::{Entity as Withdrawal, WithdrawalStatus};

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "databundle".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A status string that is not part of the closed enumeration for its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {ledger} status '{value}'")]
pub struct UnknownStatus {
    pub ledger: &'static str,
    pub value: String,
}
