//! Migration to create the bundles table.
//!
//! Bundles belong to a network; deleting a network that still has bundles is
//! refused by the `RESTRICT` foreign key.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bundles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bundles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Bundles::NetworkId).uuid().not_null())
                    .col(ColumnDef::new(Bundles::Name).text().not_null())
                    .col(ColumnDef::new(Bundles::Size).text().not_null())
                    .col(ColumnDef::new(Bundles::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Bundles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bundles_network_id")
                            .from(Bundles::Table, Bundles::NetworkId)
                            .to(Networks::Table, Networks::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bundles_network_id")
                    .table(Bundles::Table)
                    .col(Bundles::NetworkId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_bundles_network_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Bundles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Bundles {
    Table,
    Id,
    NetworkId,
    Name,
    Size,
    Price,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Networks {
    Table,
    Id,
}
