//! # Withdrawal Repository
//!
//! A vendor's available balance is the profit of every attributed order that
//! has not failed, minus every withdrawal still holding funds (pending,
//! approved or completed).
//! Requests check that balance and bump `vendors.ledger_version` in the same
//! transaction; the bump is a compare-and-set, so of two concurrent requests
//! reading the same balance only one can commit.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::Expr,
};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use super::sum_as_bigint;
use crate::error::RepositoryError;
use crate::models::order::{Column as OrderColumn, Entity as Order};
use crate::models::vendor::{Column as VendorColumn, Entity as Vendor, Model as VendorModel};
use crate::models::withdrawal::{
    ActiveModel as WithdrawalActiveModel, Column as WithdrawalColumn, Entity as Withdrawal,
    Model as WithdrawalModel,
};
use crate::models::{OrderStatus, UnknownStatus, WithdrawalStatus};

/// Ledger position of one vendor, in minor units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Balance {
    /// Profit from attributed orders that have not failed
    pub earned: i64,
    /// Withdrawals pending, approved or completed
    pub withdrawn: i64,
    pub available: i64,
}

/// Computes the balance of `vendor_id` on `conn` (a pool or an open transaction).
pub async fn vendor_balance<C: ConnectionTrait>(conn: &C, vendor_id: Uuid) -> Result<Balance, DbErr> {
    let earned = Order::find()
        .select_only()
        .column_as(sum_as_bigint((Order, OrderColumn::Profit)), "total")
        .filter(OrderColumn::VendorId.eq(vendor_id))
        .filter(OrderColumn::Status.ne(OrderStatus::Failed.as_str()))
        .into_tuple::<i64>()
        .one(conn)
        .await?
        .unwrap_or(0);

    let withdrawn = Withdrawal::find()
        .select_only()
        .column_as(sum_as_bigint((Withdrawal, WithdrawalColumn::Amount)), "total")
        .filter(WithdrawalColumn::VendorId.eq(vendor_id))
        .filter(
            WithdrawalColumn::Status
                .is_in(WithdrawalStatus::HOLDING.iter().map(WithdrawalStatus::as_str)),
        )
        .into_tuple::<i64>()
        .one(conn)
        .await?
        .unwrap_or(0);

    Ok(Balance {
        earned,
        withdrawn,
        available: earned - withdrawn,
    })
}

/// Repository for Withdrawal database operations
pub struct WithdrawalRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> WithdrawalRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Records a pending withdrawal of `amount` if the vendor's balance covers it.
    pub async fn request(
        &self,
        vendor_id: Uuid,
        amount: i64,
    ) -> Result<WithdrawalModel, RepositoryError> {
        if amount <= 0 {
            return Err(RepositoryError::validation_error(
                "Withdrawal amount must be greater than zero",
            ));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(RepositoryError::database_error)?;

        let vendor = Vendor::find_by_id(vendor_id)
            .one(&txn)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Vendor not found"))?;

        let balance = vendor_balance(&txn, vendor_id)
            .await
            .map_err(RepositoryError::database_error)?;

        if amount > balance.available {
            tracing::info!(
                vendor_id = %vendor_id,
                amount,
                available = balance.available,
                "Withdrawal rejected for insufficient balance"
            );
            return Err(RepositoryError::InsufficientBalance {
                requested: amount,
                available: balance.available,
            });
        }

        claim_ledger_version(&txn, &vendor).await?;

        let withdrawal = WithdrawalActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(vendor_id),
            amount: Set(amount),
            status: Set(WithdrawalStatus::Pending.as_str().to_string()),
            created_at: Set(Utc::now().into()),
            processed_at: Set(None),
        }
        .insert(&txn)
        .await
        .map_err(RepositoryError::database_error)?;

        txn.commit()
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            withdrawal_id = %withdrawal.id,
            vendor_id = %vendor_id,
            amount,
            "Withdrawal requested"
        );
        Ok(withdrawal)
    }

    /// Pending → Approved.
    pub async fn approve(&self, withdrawal_id: Uuid) -> Result<WithdrawalModel, RepositoryError> {
        self.transition(withdrawal_id, WithdrawalStatus::Approved)
            .await
    }

    /// Pending → Rejected; the amount returns to the vendor's balance.
    pub async fn reject(&self, withdrawal_id: Uuid) -> Result<WithdrawalModel, RepositoryError> {
        self.transition(withdrawal_id, WithdrawalStatus::Rejected)
            .await
    }

    /// Approved → Completed once the payout has been sent.
    pub async fn complete(&self, withdrawal_id: Uuid) -> Result<WithdrawalModel, RepositoryError> {
        self.transition(withdrawal_id, WithdrawalStatus::Completed)
            .await
    }

    pub async fn find(&self, withdrawal_id: Uuid) -> Result<Option<WithdrawalModel>, RepositoryError> {
        Withdrawal::find_by_id(withdrawal_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Withdrawal history of one vendor, newest first.
    pub async fn list_for_vendor(
        &self,
        vendor_id: Uuid,
    ) -> Result<Vec<WithdrawalModel>, RepositoryError> {
        Withdrawal::find()
            .filter(WithdrawalColumn::VendorId.eq(vendor_id))
            .order_by_desc(WithdrawalColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Every withdrawal with its vendor, newest first.
    pub async fn list_all_with_vendor(
        &self,
    ) -> Result<Vec<(WithdrawalModel, Option<VendorModel>)>, RepositoryError> {
        Withdrawal::find()
            .find_also_related(Vendor)
            .order_by_desc(WithdrawalColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    async fn transition(
        &self,
        withdrawal_id: Uuid,
        next: WithdrawalStatus,
    ) -> Result<WithdrawalModel, RepositoryError> {
        let withdrawal = self
            .find(withdrawal_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Withdrawal request not found"))?;
        let current = withdrawal.status().map_err(corrupt_status)?;

        if !current.can_transition_to(next) {
            return Err(invalid_transition(current, next));
        }

        let result = Withdrawal::update_many()
            .col_expr(WithdrawalColumn::Status, Expr::value(next.as_str()))
            .col_expr(
                WithdrawalColumn::ProcessedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(WithdrawalColumn::Id.eq(withdrawal_id))
            .filter(WithdrawalColumn::Status.eq(current.as_str()))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected == 0 {
            // Another admin action won the race; report the state it left behind
            let latest = self
                .find(withdrawal_id)
                .await?
                .ok_or_else(|| RepositoryError::not_found("Withdrawal request not found"))?;
            let latest_status = latest.status().map_err(corrupt_status)?;
            return Err(invalid_transition(latest_status, next));
        }

        tracing::info!(
            withdrawal_id = %withdrawal_id,
            vendor_id = %withdrawal.vendor_id,
            amount = withdrawal.amount,
            from = %current,
            status = %next,
            "Withdrawal status updated"
        );

        self.find(withdrawal_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Withdrawal request not found"))
    }
}

async fn claim_ledger_version<C: ConnectionTrait>(
    conn: &C,
    vendor: &VendorModel,
) -> Result<(), RepositoryError> {
    let result = Vendor::update_many()
        .col_expr(
            VendorColumn::LedgerVersion,
            Expr::col(VendorColumn::LedgerVersion).add(1),
        )
        .filter(VendorColumn::Id.eq(vendor.id))
        .filter(VendorColumn::LedgerVersion.eq(vendor.ledger_version))
        .exec(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    if result.rows_affected == 0 {
        tracing::warn!(vendor_id = %vendor.id, "Concurrent withdrawal request detected");
        return Err(RepositoryError::conflict(
            "CONCURRENT_UPDATE",
            "Balance changed while processing the request, please retry",
        ));
    }
    Ok(())
}

fn invalid_transition(current: WithdrawalStatus, next: WithdrawalStatus) -> RepositoryError {
    RepositoryError::conflict_with_details(
        "INVALID_TRANSITION",
        format!("Withdrawal is {current} and cannot become {next}"),
        json!({ "from": current, "to": next }),
    )
}

fn corrupt_status(err: UnknownStatus) -> RepositoryError {
    RepositoryError::database_error(DbErr::Type(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::vendor::ActiveModel as VendorActiveModel;
    use axum::http::StatusCode;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn db_with_vendor() -> (DatabaseConnection, VendorModel) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let now = Utc::now();
        let vendor = VendorActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set("Ledger Vendor".to_string()),
            email: Set("ledger@example.com".to_string()),
            password_hash: Set("$argon2id$unused".to_string()),
            phone_number: Set("0241234567".to_string()),
            momo_number: Set("0241234567".to_string()),
            ledger_version: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&db)
        .await
        .unwrap();

        (db, vendor)
    }

    #[tokio::test]
    async fn stale_ledger_version_is_a_concurrent_update() {
        let (db, vendor) = db_with_vendor().await;

        claim_ledger_version(&db, &vendor).await.unwrap();
        let bumped = Vendor::find_by_id(vendor.id).one(&db).await.unwrap().unwrap();
        assert_eq!(bumped.ledger_version, vendor.ledger_version + 1);

        // `vendor` still carries the version read before the bump
        let err = claim_ledger_version(&db, &vendor).await.unwrap_err();
        let api_error = ApiError::from(err);
        assert_eq!(api_error.status, StatusCode::CONFLICT);
        assert_eq!(&*api_error.code, "CONCURRENT_UPDATE");

        let unchanged = Vendor::find_by_id(vendor.id).one(&db).await.unwrap().unwrap();
        assert_eq!(unchanged.ledger_version, bumped.ledger_version);
    }
}
