use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "sos")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    #[sea_orm(column_type = "Text")]
    pub message: String,
    pub emergency_type: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub location_address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub sender_name: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub sender_profile_image: Option<String>,
    pub sender_battery: i32,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sos_circle::Entity")]
    SosCircle,
    #[sea_orm(has_many = "super::sos_recipient::Entity")]
    SosRecipient,
}

impl Related<super::sos_circle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SosCircle.def()
    }
}

impl Related<super::sos_recipient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SosRecipient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
