//! Migration to create the vendors table.
//!
//! Vendors are the reselling accounts that own orders and request payouts.
//! `ledger_version` is bumped on every withdrawal request and guards the
//! balance check against concurrent requests.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vendors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vendors::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Vendors::FullName).text().not_null())
                    .col(ColumnDef::new(Vendors::Email).text().not_null().unique_key())
                    .col(ColumnDef::new(Vendors::PasswordHash).text().not_null())
                    .col(ColumnDef::new(Vendors::PhoneNumber).text().not_null())
                    .col(ColumnDef::new(Vendors::MomoNumber).text().not_null())
                    .col(
                        ColumnDef::new(Vendors::LedgerVersion)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Vendors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Vendors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vendors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vendors {
    Table,
    Id,
    FullName,
    Email,
    PasswordHash,
    PhoneNumber,
    MomoNumber,
    LedgerVersion,
    CreatedAt,
    UpdatedAt,
}
