//! # Network Repository

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use uuid::Uuid;

use crate::error::{RepositoryError, is_foreign_key_violation, is_unique_violation};
use crate::models::bundle::{Column as BundleColumn, Entity as Bundle};
use crate::models::network::{
    ActiveModel as NetworkActiveModel, Column as NetworkColumn, Entity as Network,
    Model as NetworkModel,
};

/// Repository for Network database operations
pub struct NetworkRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> NetworkRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str) -> Result<NetworkModel, RepositoryError> {
        let network = NetworkActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(validate_name(name)?),
            created_at: Set(Utc::now().into()),
        };

        network.insert(self.db).await.map_err(map_write_error)
    }

    /// All networks ordered by name.
    pub async fn list(&self) -> Result<Vec<NetworkModel>, RepositoryError> {
        Network::find()
            .order_by_asc(NetworkColumn::Name)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find(&self, network_id: Uuid) -> Result<Option<NetworkModel>, RepositoryError> {
        Network::find_by_id(network_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn update(
        &self,
        network_id: Uuid,
        name: &str,
    ) -> Result<NetworkModel, RepositoryError> {
        let name = validate_name(name)?;
        let network = self
            .find(network_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Network not found"))?;

        let mut active = network.into_active_model();
        active.name = Set(name);
        active.update(self.db).await.map_err(map_write_error)
    }

    /// Deletes a network that no bundle references.
    pub async fn delete(&self, network_id: Uuid) -> Result<(), RepositoryError> {
        let network = self
            .find(network_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Network not found"))?;

        let bundles = Bundle::find()
            .filter(BundleColumn::NetworkId.eq(network_id))
            .count(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        if bundles > 0 {
            return Err(still_referenced(bundles));
        }

        Network::delete_by_id(network.id)
            .exec(self.db)
            .await
            .map_err(|err| {
                if is_foreign_key_violation(&err) {
                    still_referenced(1)
                } else {
                    RepositoryError::database_error(err)
                }
            })?;

        tracing::info!(network_id = %network_id, "Network deleted");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, RepositoryError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::validation_error("Network name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn map_write_error(err: sea_orm::DbErr) -> RepositoryError {
    if is_unique_violation(&err) {
        RepositoryError::conflict("DUPLICATE_NETWORK", "A network with this name already exists")
    } else {
        RepositoryError::database_error(err)
    }
}

fn still_referenced(bundles: u64) -> RepositoryError {
    RepositoryError::conflict_with_details(
        "RESOURCE_IN_USE",
        "Network still has bundles",
        json!({ "bundles": bundles }),
    )
}
