use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a circle an SOS was sent to. No foreign key to `circles`:
/// the snapshot outlives the circle.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "sos_circles")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i32,
    pub sos_id: Uuid,
    pub circle_id: Uuid,
    pub circle_name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sos::Entity",
        from = "Column::SosId",
        to = "super::sos::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Sos,
}

impl Related<super::sos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
