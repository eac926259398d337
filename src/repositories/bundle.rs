//! # Bundle Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{RepositoryError, is_foreign_key_violation};
use crate::models::bundle::{
    ActiveModel as BundleActiveModel, Column as BundleColumn, Entity as Bundle,
    Model as BundleModel,
};
use crate::models::network::Entity as Network;
use crate::models::order::{Column as OrderColumn, Entity as Order};

/// Fields for creating or replacing a bundle
#[derive(Debug, Clone)]
pub struct NewBundle {
    pub network_id: Uuid,
    pub name: String,
    pub size: String,
    pub price: i64,
}

impl NewBundle {
    fn validate(&self) -> Result<(), RepositoryError> {
        if self.name.trim().is_empty() || self.size.trim().is_empty() {
            return Err(RepositoryError::validation_error(
                "Bundle name and size cannot be empty",
            ));
        }
        if self.price <= 0 {
            return Err(RepositoryError::validation_error(
                "Bundle price must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Repository for Bundle database operations
pub struct BundleRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> BundleRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, bundle: NewBundle) -> Result<BundleModel, RepositoryError> {
        bundle.validate()?;
        self.ensure_network(bundle.network_id).await?;

        let model = BundleActiveModel {
            id: Set(Uuid::new_v4()),
            network_id: Set(bundle.network_id),
            name: Set(bundle.name.trim().to_string()),
            size: Set(bundle.size.trim().to_string()),
            price: Set(bundle.price),
            created_at: Set(Utc::now().into()),
        };

        model
            .insert(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Bundles ordered by name, optionally restricted to one network.
    pub async fn list(&self, network_id: Option<Uuid>) -> Result<Vec<BundleModel>, RepositoryError> {
        let mut query = Bundle::find();
        if let Some(network_id) = network_id {
            query = query.filter(BundleColumn::NetworkId.eq(network_id));
        }

        query
            .order_by_asc(BundleColumn::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find(&self, bundle_id: Uuid) -> Result<Option<BundleModel>, RepositoryError> {
        Bundle::find_by_id(bundle_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        bundle_id: Uuid,
        bundle: NewBundle,
    ) -> Result<BundleModel, RepositoryError> {
        bundle.validate()?;
        let existing = self
            .find(bundle_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Bundle not found"))?;
        self.ensure_network(bundle.network_id).await?;

        let mut active = existing.into_active_model();
        active.network_id = Set(bundle.network_id);
        active.name = Set(bundle.name.trim().to_string());
        active.size = Set(bundle.size.trim().to_string());
        active.price = Set(bundle.price);

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Deletes a bundle that no order references.
    pub async fn delete(&self, bundle_id: Uuid) -> Result<(), RepositoryError> {
        if self.find(bundle_id).await?.is_none() {
            return Err(RepositoryError::not_found("Bundle not found"));
        }

        let orders = Order::find()
            .filter(OrderColumn::BundleId.eq(bundle_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if orders > 0 {
            return Err(still_referenced(orders));
        }

        Bundle::delete_by_id(bundle_id)
            .exec(self.db)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    still_referenced(1)
                } else {
                    RepositoryError::database_error(err)
                }
            })?;

        tracing::info!(bundle_id = %bundle_id, "Bundle deleted");
        Ok(())
    }

    async fn ensure_network(&self, network_id: Uuid) -> Result<(), RepositoryError> {
        Network::find_by_id(network_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)?
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found("Network not found"))
    }
}

fn still_referenced(orders: u64) -> RepositoryError {
    RepositoryError::conflict_with_details(
        "RESOURCE_IN_USE",
        "Bundle is referenced by existing orders",
        json!({ "orders": orders }),
    )
}
