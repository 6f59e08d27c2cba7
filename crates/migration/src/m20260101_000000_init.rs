//! Initial schema for the trip document store.
//!
//! - `trips`: one row per shared trip (the `trips/{id}` document)
//! - `trip_documents`: the documents of every sub-collection of a trip
//!   (`days`, `sharedExpenses`, `personalExpenses`), keyed by
//!   `(trip_id, collection, doc_key)`

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Trips {
    Table,
    Id,
    InviteCode,
    Title,
    Destination,
    StartDate,
    DaysCount,
    Participants,
    Config,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum TripDocuments {
    Table,
    TripId,
    Collection,
    DocKey,
    Body,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Trips
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Trips::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Trips::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Trips::InviteCode).string().not_null())
                    .col(ColumnDef::new(Trips::Title).string().not_null())
                    .col(ColumnDef::new(Trips::Destination).string().not_null())
                    .col(ColumnDef::new(Trips::StartDate).string().not_null())
                    .col(
                        ColumnDef::new(Trips::DaysCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Trips::Participants).string().not_null())
                    .col(ColumnDef::new(Trips::Config).text().not_null())
                    .col(ColumnDef::new(Trips::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Trips::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-trips-invite_code-unique")
                    .table(Trips::Table)
                    .col(Trips::InviteCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Trip documents
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(TripDocuments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TripDocuments::TripId).string().not_null())
                    .col(
                        ColumnDef::new(TripDocuments::Collection)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TripDocuments::DocKey).string().not_null())
                    .col(ColumnDef::new(TripDocuments::Body).text().not_null())
                    .col(
                        ColumnDef::new(TripDocuments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(TripDocuments::TripId)
                            .col(TripDocuments::Collection)
                            .col(TripDocuments::DocKey),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-trip_documents-trip_id")
                            .from(TripDocuments::Table, TripDocuments::TripId)
                            .to(Trips::Table, Trips::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TripDocuments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Trips::Table).to_owned())
            .await?;
        Ok(())
    }
}
