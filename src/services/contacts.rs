use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, OnConflict},
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entities::{contact, user, Contact};
use crate::error::AppError;

/// Inserts the directory entry for `user`, or overwrites the mirrored
/// profile fields of an existing one. `emergency_number` is never touched.
pub async fn upsert_from_user<C: ConnectionTrait>(conn: &C, user: &user::Model) -> Result<(), DbErr> {
    let entry = contact::ActiveModel {
        user_id: Set(user.uid.clone()),
        name: Set(user.name.clone()),
        email: Set(user.email.clone()),
        phone_number: Set(user.phone_number.clone()),
        latitude: Set(user.latitude),
        longitude: Set(user.longitude),
        battery_percentage: Set(user.battery_level),
        profile_image: Set(user.profile_image.clone()),
        emergency_number: Set(None),
        status: Set(user.status.clone()),
        expo_push_token: Set(user.expo_push_token.clone()),
        updated_at: Set(Utc::now()),
    };

    Contact::insert(entry)
        .on_conflict(
            OnConflict::column(contact::Column::UserId)
                .update_columns([
                    contact::Column::Name,
                    contact::Column::Email,
                    contact::Column::PhoneNumber,
                    contact::Column::Latitude,
                    contact::Column::Longitude,
                    contact::Column::BatteryPercentage,
                    contact::Column::ProfileImage,
                    contact::Column::Status,
                    contact::Column::ExpoPushToken,
                    contact::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Copies the profile of `user` onto its directory entry if one exists.
/// Returns whether an entry was updated.
pub async fn refresh_existing<C: ConnectionTrait>(conn: &C, user: &user::Model) -> Result<bool, DbErr> {
    let result = Contact::update_many()
        .col_expr(contact::Column::Name, Expr::value(user.name.clone()))
        .col_expr(contact::Column::Email, Expr::value(user.email.clone()))
        .col_expr(contact::Column::PhoneNumber, Expr::value(user.phone_number.clone()))
        .col_expr(contact::Column::Latitude, Expr::value(user.latitude))
        .col_expr(contact::Column::Longitude, Expr::value(user.longitude))
        .col_expr(contact::Column::BatteryPercentage, Expr::value(user.battery_level))
        .col_expr(contact::Column::ProfileImage, Expr::value(user.profile_image.clone()))
        .col_expr(contact::Column::Status, Expr::value(user.status.clone()))
        .col_expr(contact::Column::ExpoPushToken, Expr::value(user.expo_push_token.clone()))
        .col_expr(contact::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(contact::Column::UserId.eq(user.uid.as_str()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusUpdate {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub battery_percentage: Option<i32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub location: Location,
    pub battery_percentage: Option<i32>,
    pub profile_image: Option<String>,
    pub emergency_number: Option<String>,
    pub status: String,
}

impl From<contact::Model> for ContactResponse {
    fn from(model: contact::Model) -> Self {
        Self {
            user_id: model.user_id,
            name: model.name,
            email: model.email,
            phone_number: model.phone_number,
            location: Location {
                latitude: model.latitude,
                longitude: model.longitude,
            },
            battery_percentage: model.battery_percentage,
            profile_image: model.profile_image,
            emergency_number: model.emergency_number,
            status: model.status,
        }
    }
}

/// Live location and battery reported by the contact's own device.
pub async fn update_live_status(
    db: &DatabaseConnection,
    caller: &str,
    contact_id: &str,
    update: LiveStatusUpdate,
) -> Result<contact::Model, AppError> {
    if caller != contact_id {
        return Err(AppError::forbidden("Contacts can only update their own status."));
    }

    let existing = Contact::find_by_id(contact_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Contact not found."))?;

    let mut active: contact::ActiveModel = existing.into();
    active.latitude = Set(update.latitude);
    active.longitude = Set(update.longitude);
    if let Some(battery) = update.battery_percentage {
        active.battery_percentage = Set(Some(battery.clamp(0, 100)));
    }
    active.updated_at = Set(Utc::now());

    let updated = active.update(db).await?;
    info!("Updated live status for contact {}", contact_id);
    Ok(updated)
}
