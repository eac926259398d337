//! # Analytics Repository
//!
//! Read-only aggregates over the order and withdrawal ledgers, computed at
//! query time.

use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{sum_as_bigint, vendor_balance};
use crate::error::RepositoryError;
use crate::models::order::{Column as OrderColumn, Entity as Order, Relation as OrderRelation};
use crate::models::vendor::{Column as VendorColumn, Entity as Vendor};
use crate::models::withdrawal::{Column as WithdrawalColumn, Entity as Withdrawal};
use crate::models::WithdrawalStatus;

/// Admin-wide metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_vendors: u64,
    /// Sum of profit over every order
    pub total_sales: i64,
    /// Sum of pending withdrawal amounts
    pub pending_withdrawals: i64,
    pub top_vendors: Vec<TopVendor>,
}

/// Vendor ranked by attributed profit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult, ToSchema)]
pub struct TopVendor {
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub total_sales: i64,
}

/// Figures shown on a vendor's own dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VendorDashboard {
    pub vendor_id: Uuid,
    pub full_name: String,
    pub total_orders: u64,
    /// Profit over all attributed orders, whatever their status
    pub total_profit: i64,
    /// Profit over attributed orders that have not failed
    pub earned_profit: i64,
    pub withdrawn: i64,
    pub available_balance: i64,
    pub pending_withdrawals: i64,
}

/// Repository for ledger aggregates
pub struct AnalyticsRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> AnalyticsRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn summary(&self, top_limit: u64) -> Result<AnalyticsSummary, RepositoryError> {
        let total_vendors = Vendor::find()
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let total_sales = Order::find()
            .select_only()
            .column_as(sum_as_bigint((Order, OrderColumn::Profit)), "total")
            .into_tuple::<i64>()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .unwrap_or(0);

        let pending_withdrawals = self.pending_total(None).await?;
        let top_vendors = self.top_vendors(top_limit).await?;

        Ok(AnalyticsSummary {
            total_vendors,
            total_sales,
            pending_withdrawals,
            top_vendors,
        })
    }

    /// Vendors ordered by total attributed profit, highest first.
    pub async fn top_vendors(&self, limit: u64) -> Result<Vec<TopVendor>, RepositoryError> {
        let total = sum_as_bigint((Order, OrderColumn::Profit));

        Order::find()
            .select_only()
            .column_as(OrderColumn::VendorId, "vendor_id")
            .column_as(VendorColumn::FullName, "vendor_name")
            .column_as(total.clone(), "total_sales")
            .join(JoinType::InnerJoin, OrderRelation::Vendor.def())
            .group_by(OrderColumn::VendorId)
            .group_by(VendorColumn::FullName)
            .order_by_desc(total)
            .order_by_asc(VendorColumn::FullName)
            .limit(limit)
            .into_model::<TopVendor>()
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn vendor_dashboard(&self, vendor_id: Uuid) -> Result<VendorDashboard, RepositoryError> {
        let vendor = Vendor::find_by_id(vendor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Vendor not found"))?;

        let total_orders = Order::find()
            .filter(OrderColumn::VendorId.eq(vendor_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        let total_profit = Order::find()
            .select_only()
            .column_as(sum_as_bigint((Order, OrderColumn::Profit)), "total")
            .filter(OrderColumn::VendorId.eq(vendor_id))
            .into_tuple::<i64>()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .unwrap_or(0);

        let balance = vendor_balance(self.db, vendor_id)
            .await
            .map_err(RepositoryError::database_error)?;
        let pending_withdrawals = self.pending_total(Some(vendor_id)).await?;

        Ok(VendorDashboard {
            vendor_id,
            full_name: vendor.full_name,
            total_orders,
            total_profit,
            earned_profit: balance.earned,
            withdrawn: balance.withdrawn,
            available_balance: balance.available,
            pending_withdrawals,
        })
    }

    async fn pending_total(&self, vendor_id: Option<Uuid>) -> Result<i64, RepositoryError> {
        let mut query = Withdrawal::find()
            .select_only()
            .column_as(sum_as_bigint((Withdrawal, WithdrawalColumn::Amount)), "total")
            .filter(WithdrawalColumn::Status.eq(WithdrawalStatus::Pending.as_str()));
        if let Some(vendor_id) = vendor_id {
            query = query.filter(WithdrawalColumn::VendorId.eq(vendor_id));
        }

        Ok(query
            .into_tuple::<i64>()
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .unwrap_or(0))
    }
}
