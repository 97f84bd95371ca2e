use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "sos_recipients")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i32,
    pub sos_id: Uuid,
    pub contact_id: String,
    pub name: Option<String>,
    pub notified_via: String,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTimeUtc>,
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
