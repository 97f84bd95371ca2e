use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "user_cards")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uid: String,
    pub full_name: String,
    pub age: i32,
    pub blood_group: String,
    pub medicines: Json,
    pub disease: Json,
    pub allergies: Json,
    pub emergency_numbers: Json,
    #[sea_orm(column_type = "Text")]
    pub address: String,
    #[sea_orm(column_type = "Text")]
    pub emergency_instructions: String,
    // Full submitted details, served back as `qrCodeDetails`
    pub qr_code_details: Json,
    #[sea_orm(column_type = "Text")]
    pub qr_code_image: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
