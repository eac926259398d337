//! # Vendor Repository
//!
//! Persistence for vendor accounts. Callers hash passwords before they reach
//! this layer; the repository only ever sees PHC strings.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use uuid::Uuid;

use crate::error::{RepositoryError, is_unique_violation};
use crate::models::vendor::{
    ActiveModel as VendorActiveModel, Column as VendorColumn, Entity as Vendor,
    Model as VendorModel,
};

/// Canonical form of a login email.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Data for a new vendor account
#[derive(Debug, Clone)]
pub struct NewVendor {
    pub full_name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_number: String,
    pub momo_number: String,
}

/// Repository for Vendor database operations
pub struct VendorRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> VendorRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts a vendor, failing with `DUPLICATE_EMAIL` if the email is taken.
    pub async fn create(&self, vendor: NewVendor) -> Result<VendorModel, RepositoryError> {
        let email = normalize_email(&vendor.email);

        if self.find_by_email(&email).await?.is_some() {
            return Err(duplicate_email());
        }

        let now = Utc::now();
        let model = VendorActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(vendor.full_name.trim().to_string()),
            email: Set(email),
            password_hash: Set(vendor.password_hash),
            phone_number: Set(vendor.phone_number.trim().to_string()),
            momo_number: Set(vendor.momo_number.trim().to_string()),
            ledger_version: Set(0),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        model.insert(self.db).await.map_err(|err| {
            // Lost a registration race on the unique index
            if is_unique_violation(&err) {
                duplicate_email()
            } else {
                RepositoryError::database_error(err)
            }
        })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<VendorModel>, RepositoryError> {
        Vendor::find()
            .filter(VendorColumn::Email.eq(normalize_email(email)))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn find_by_id(&self, vendor_id: Uuid) -> Result<Option<VendorModel>, RepositoryError> {
        Vendor::find_by_id(vendor_id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Replaces the stored password hash.
    pub async fn update_password(
        &self,
        vendor_id: Uuid,
        password_hash: String,
    ) -> Result<VendorModel, RepositoryError> {
        let vendor = self
            .find_by_id(vendor_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Vendor not found"))?;

        let mut active = vendor.into_active_model();
        active.password_hash = Set(password_hash);
        active.updated_at = Set(Utc::now().into());

        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }
}

fn duplicate_email() -> RepositoryError {
    RepositoryError::conflict("DUPLICATE_EMAIL", "A vendor with this email already exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ama@Example.COM "), "ama@example.com");
    }
}
