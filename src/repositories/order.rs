//! # Order Repository
//!
//! Placement always lands in `Pending`; status moves forward only, through a
//! compare-and-set on the current status.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::bundle::Entity as Bundle;
use crate::models::network::Entity as Network;
use crate::models::order::{
    ActiveModel as OrderActiveModel, Column as OrderColumn, Entity as Order, Model as OrderModel,
};
use crate::models::vendor::{Entity as Vendor, Model as VendorModel};
use crate::models::{OrderStatus, UnknownStatus};

/// Vendor commission on `amount` at `bps` basis points, rounded down.
pub fn commission(amount: i64, bps: u32) -> i64 {
    let profit = i128::from(amount) * i128::from(bps) / 10_000;
    i64::try_from(profit).unwrap_or(i64::MAX)
}

/// Order placement request
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub phone_number: String,
    pub network: String,
    pub package: String,
    pub bundle_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
}

/// Repository for Order database operations
pub struct OrderRepository<'a> {
    db: &'a DatabaseConnection,
    commission_bps: u32,
}

impl<'a> OrderRepository<'a> {
    pub fn new(db: &'a DatabaseConnection, commission_bps: u32) -> Self {
        Self { db, commission_bps }
    }

    /// Places an order in `Pending`. A referenced bundle prices the order and
    /// supplies its network and package names.
    pub async fn place(&self, order: NewOrder) -> Result<OrderModel, RepositoryError> {
        let (amount, network, package) = match order.bundle_id {
            Some(bundle_id) => {
                let (bundle, network) = Bundle::find_by_id(bundle_id)
                    .find_also_related(Network)
                    .one(self.db)
                    .await
                    .map_err(RepositoryError::database_error)?
                    .ok_or_else(|| RepositoryError::not_found("Bundle not found"))?;
                let network = network
                    .ok_or_else(|| RepositoryError::not_found("Network not found"))?;
                (bundle.price, network.name, bundle.name)
            }
            None => (
                0,
                order.network.trim().to_string(),
                order.package.trim().to_string(),
            ),
        };

        if let Some(vendor_id) = order.vendor_id {
            self.require_vendor(vendor_id).await?;
        }

        let profit = match order.vendor_id {
            Some(_) => commission(amount, self.commission_bps),
            None => 0,
        };

        let now = Utc::now();
        let model = OrderActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(order.vendor_id),
            bundle_id: Set(order.bundle_id),
            phone_number: Set(order.phone_number.trim().to_string()),
            network: Set(network),
            package: Set(package),
            status: Set(OrderStatus::Pending.as_str().to_string()),
            amount: Set(amount),
            profit: Set(profit),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let created = model
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        tracing::info!(
            order_id = %created.id,
            vendor_id = ?created.vendor_id,
            amount = created.amount,
            profit = created.profit,
            "Order placed"
        );
        Ok(created)
    }

    pub async fn find(&self, order_id: Uuid) -> Result<Option<OrderModel>, RepositoryError> {
        Order::find_by_id(order_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Every order with its attributed vendor, newest first.
    pub async fn list_all_with_vendor(
        &self,
    ) -> Result<Vec<(OrderModel, Option<VendorModel>)>, RepositoryError> {
        Order::find()
            .find_also_related(Vendor)
            .order_by_desc(OrderColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Orders attributed to `vendor_id`, newest first.
    pub async fn list_for_vendor(&self, vendor_id: Uuid) -> Result<Vec<OrderModel>, RepositoryError> {
        Order::find()
            .filter(OrderColumn::VendorId.eq(vendor_id))
            .order_by_desc(OrderColumn::CreatedAt)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Moves an order to `next`, rejecting backward or terminal transitions.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        next: OrderStatus,
    ) -> Result<OrderModel, RepositoryError> {
        let order = self.require_order(order_id).await?;
        let current = order.status().map_err(corrupt_status)?;

        if !current.can_transition_to(next) {
            return Err(RepositoryError::conflict_with_details(
                "INVALID_TRANSITION",
                format!("Order cannot move from {current} to {next}"),
                json!({ "from": current, "to": next }),
            ));
        }

        swap_status(self.db, order_id, current, next).await?;

        tracing::info!(order_id = %order_id, from = %current, status = %next, "Order status updated");
        self.require_order(order_id).await
    }

    /// Attributes an unassigned, non-failed order to `vendor_id` and credits its commission.
    pub async fn assign_vendor(
        &self,
        order_id: Uuid,
        vendor_id: Uuid,
    ) -> Result<OrderModel, RepositoryError> {
        let order = self.require_order(order_id).await?;
        self.require_vendor(vendor_id).await?;

        if order.vendor_id.is_some() {
            return Err(RepositoryError::conflict(
                "ALREADY_ASSIGNED",
                "Order is already attributed to a vendor",
            ));
        }
        if order.status().map_err(corrupt_status)? == OrderStatus::Failed {
            return Err(RepositoryError::conflict(
                "INVALID_TRANSITION",
                "Failed orders cannot be attributed",
            ));
        }

        let profit = commission(order.amount, self.commission_bps);
        let result = Order::update_many()
            .col_expr(OrderColumn::VendorId, Expr::value(vendor_id))
            .col_expr(OrderColumn::Profit, Expr::value(profit))
            .col_expr(OrderColumn::UpdatedAt, Expr::value(chrono_now()))
            .filter(OrderColumn::Id.eq(order_id))
            .filter(OrderColumn::VendorId.is_null())
            .filter(OrderColumn::Status.ne(OrderStatus::Failed.as_str()))
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;

        if result.rows_affected == 0 {
            return Err(concurrent_update());
        }

        tracing::info!(order_id = %order_id, vendor_id = %vendor_id, profit, "Order attributed to vendor");
        self.require_order(order_id).await
    }

    async fn require_order(&self, order_id: Uuid) -> Result<OrderModel, RepositoryError> {
        self.find(order_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Order not found"))
    }

    async fn require_vendor(&self, vendor_id: Uuid) -> Result<VendorModel, RepositoryError> {
        Vendor::find_by_id(vendor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .ok_or_else(|| RepositoryError::not_found("Vendor not found"))
    }
}

/// Writes `next` only while the stored status is still `expected`.
async fn swap_status<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    expected: OrderStatus,
    next: OrderStatus,
) -> Result<(), RepositoryError> {
    let result = Order::update_many()
        .col_expr(OrderColumn::Status, Expr::value(next.as_str()))
        .col_expr(OrderColumn::UpdatedAt, Expr::value(chrono_now()))
        .filter(OrderColumn::Id.eq(order_id))
        .filter(OrderColumn::Status.eq(expected.as_str()))
        .exec(conn)
        .await
        .map_err(RepositoryError::database_error)?;

    if result.rows_affected == 0 {
        return Err(concurrent_update());
    }
    Ok(())
}

fn chrono_now() -> sea_orm::prelude::DateTimeWithTimeZone {
    Utc::now().into()
}

fn corrupt_status(err: UnknownStatus) -> RepositoryError {
    RepositoryError::database_error(sea_orm::DbErr::Type(err.to_string()))
}

fn concurrent_update() -> RepositoryError {
    RepositoryError::conflict(
        "CONCURRENT_UPDATE",
        "Order was modified by another request, please retry",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bundle::ActiveModel as BundleActiveModel;
    use crate::models::network::ActiveModel as NetworkActiveModel;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn db_with_bundle() -> (DatabaseConnection, Uuid) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let network_id = Uuid::new_v4();
        NetworkActiveModel {
            id: Set(network_id),
            name: Set("MTN".to_string()),
            created_at: Set(chrono_now()),
        }
        .insert(&db)
        .await
        .unwrap();

        let bundle_id = Uuid::new_v4();
        BundleActiveModel {
            id: Set(bundle_id),
            network_id: Set(network_id),
            name: Set("Daily 1GB".to_string()),
            size: Set("1GB".to_string()),
            price: Set(400),
            created_at: Set(chrono_now()),
        }
        .insert(&db)
        .await
        .unwrap();

        (db, bundle_id)
    }

    fn order_for(bundle_id: Uuid) -> NewOrder {
        NewOrder {
            phone_number: "0241234567".to_string(),
            network: "Vodafone".to_string(),
            package: "whatever the form said".to_string(),
            bundle_id: Some(bundle_id),
            vendor_id: None,
        }
    }

    #[tokio::test]
    async fn stale_status_loses_the_swap() {
        let (db, bundle_id) = db_with_bundle().await;
        let repo = OrderRepository::new(&db, 1000);
        let order = repo.place(order_for(bundle_id)).await.unwrap();

        repo.update_status(order.id, OrderStatus::Processing)
            .await
            .unwrap();

        // A writer that still believes the order is Pending
        let err = swap_status(&db, order.id, OrderStatus::Pending, OrderStatus::Failed)
            .await
            .unwrap_err();
        match err {
            RepositoryError::Conflict { code, .. } => assert_eq!(code, "CONCURRENT_UPDATE"),
            other => panic!("expected conflict, got {other:?}"),
        }

        let stored = repo.find(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, "Processing");
    }

    #[tokio::test]
    async fn bundle_supplies_network_and_package() {
        let (db, bundle_id) = db_with_bundle().await;
        let order = OrderRepository::new(&db, 1000)
            .place(order_for(bundle_id))
            .await
            .unwrap();

        assert_eq!(order.network, "MTN");
        assert_eq!(order.package, "Daily 1GB");
        assert_eq!(order.amount, 400);
    }

    #[test]
    fn commission_rounds_down() {
        assert_eq!(commission(1000, 1000), 100);
        assert_eq!(commission(999, 1000), 99);
        assert_eq!(commission(500, 0), 0);
        assert_eq!(commission(500, 10_000), 500);
    }

    #[test]
    fn commission_does_not_overflow() {
        assert_eq!(commission(i64::MAX, 10_000), i64::MAX);
    }
}
