use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::entities::{scheduled_sos, ScheduledSos};
use crate::error::AppError;
use crate::services::sos::{battery_snapshot, UserLocation};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSos {
    pub message: Option<String>,
    pub emergency_type: Option<String>,
    pub user_location: Option<UserLocation>,
    #[serde(default)]
    pub selected_circle_ids: Vec<String>,
    pub scheduled_time: Option<String>,
    pub battery_status: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheduled {
    pub message: String,
    pub id: Uuid,
    pub scheduled_time: DateTime<Utc>,
}

/// Stores a future-dated alert. Nothing fires it.
pub async fn schedule(db: &DatabaseConnection, uid: &str, req: ScheduleSos) -> Result<Scheduled, AppError> {
    let invalid = || {
        AppError::bad_request(
            "Invalid request: missing message, user location, emergency type, or schedule time.",
        )
    };

    let message = req
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .ok_or_else(invalid)?;
    let emergency_type = req
        .emergency_type
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(invalid)?;
    let (latitude, longitude) = req
        .user_location
        .and_then(|l| l.latitude.zip(l.longitude))
        .ok_or_else(invalid)?;
    let scheduled_time = req.scheduled_time.ok_or_else(invalid)?;
    let scheduled_time = DateTime::parse_from_rfc3339(&scheduled_time)
        .map_err(|_| AppError::bad_request("scheduledTime must be an RFC 3339 timestamp."))?
        .with_timezone(&Utc);

    let row = scheduled_sos::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(uid.to_string()),
        message: Set(message),
        emergency_type: Set(emergency_type),
        latitude: Set(latitude),
        longitude: Set(longitude),
        selected_circle_ids: Set(json!(req.selected_circle_ids)),
        scheduled_time: Set(scheduled_time),
        battery_status: Set(battery_snapshot(req.battery_status, None)),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;

    info!("Scheduled SOS {} for {} at {}", row.id, uid, row.scheduled_time);
    Ok(Scheduled {
        message: "Scheduled SOS alert created successfully!".to_string(),
        id: row.id,
        scheduled_time: row.scheduled_time,
    })
}

pub async fn list_for_user(db: &DatabaseConnection, uid: &str) -> Result<Vec<scheduled_sos::Model>, AppError> {
    Ok(ScheduledSos::find()
        .filter(scheduled_sos::Column::UserId.eq(uid))
        .order_by_asc(scheduled_sos::Column::ScheduledTime)
        .all(db)
        .await?)
}
