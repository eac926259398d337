//! Withdrawal entity model
//!
//! Vendor payout requests drawn against accrued order profit.

use std::fmt;
use std::str::FromStr;

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UnknownStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub vendor_id: Uuid,

    pub amount: i64,

    pub status: String,

    pub created_at: DateTimeWithTimeZone,

    /// Stamped by every admin transition
    pub processed_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Parses the stored status column.
    pub fn status(&self) -> Result<WithdrawalStatus, UnknownStatus> {
        self.status.parse()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor::Entity",
        from = "Column::VendorId",
        to = "super::vendor::Column::Id"
    )]
    Vendor,
}

impl Related<super::vendor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vendor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Withdrawal lifecycle: `Pending → Approved → Completed`, or `Pending → Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub const ALL: [WithdrawalStatus; 4] = [
        WithdrawalStatus::Pending,
        WithdrawalStatus::Approved,
        WithdrawalStatus::Completed,
        WithdrawalStatus::Rejected,
    ];

    /// Statuses whose amount is deducted from the vendor's available balance.
    pub const HOLDING: [WithdrawalStatus; 3] = [
        WithdrawalStatus::Pending,
        WithdrawalStatus::Approved,
        WithdrawalStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "Pending",
            WithdrawalStatus::Approved => "Approved",
            WithdrawalStatus::Completed => "Completed",
            WithdrawalStatus::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Completed | WithdrawalStatus::Rejected)
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        use WithdrawalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Approved, Completed)
        )
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        WithdrawalStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| UnknownStatus {
                ledger: "withdrawal",
                value: value.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_only_from_pending() {
        assert!(WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Approved));
        assert!(!WithdrawalStatus::Approved.can_transition_to(WithdrawalStatus::Approved));
        assert!(!WithdrawalStatus::Rejected.can_transition_to(WithdrawalStatus::Approved));
        assert!(!WithdrawalStatus::Completed.can_transition_to(WithdrawalStatus::Approved));
    }

    #[test]
    fn completion_requires_approval() {
        assert!(!WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Completed));
        assert!(WithdrawalStatus::Approved.can_transition_to(WithdrawalStatus::Completed));
    }

    #[test]
    fn rejected_funds_are_released() {
        assert!(!WithdrawalStatus::HOLDING.contains(&WithdrawalStatus::Rejected));
        assert!(WithdrawalStatus::Rejected.is_terminal());
    }
}
