//! Trip documents (`trips/{id}`).

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub invite_code: String,
    pub title: String,
    pub destination: String,
    pub start_date: String,
    pub days_count: i32,
    pub participants: String,
    /// JSON encoded `RemoteTripConfig`.
    pub config: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::trip_documents::Entity")]
    TripDocuments,
}

impl Related<super::trip_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TripDocuments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
