use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Directory entry used as the fan-out unit for notifications.
/// Circle roles live in `circle_members`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "contacts")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub battery_percentage: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub profile_image: Option<String>,
    pub emergency_number: Option<String>,
    pub status: String,
    pub expo_push_token: Option<String>,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Uid",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::circle_member::Entity")]
    CircleMember,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::circle_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CircleMember.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
