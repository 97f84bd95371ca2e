use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::entities::{sos, user, user_card, Sos, User, UserCard};
use crate::error::AppError;
use crate::services::{circles, contacts, sos as alerts};

pub const SOS_PAGE_SIZE: u64 = 10;
const CATCH_ALL: &str = "Custom";

pub const EMERGENCY_TYPES: [&str; 35] = [
    "Fire",
    "Medical",
    "Police",
    "Natural Disaster",
    "Accident",
    "Theft",
    "Flood",
    "Earthquake",
    "Tsunami",
    "Hurricane",
    "Tornado",
    "Lightning Strike",
    "Animal Attack",
    "Drowning",
    "Child Abduction",
    "Domestic Violence",
    "Armed Robbery",
    "Poisoning",
    "Gas Leak",
    "Power Outage",
    "Lost Person",
    "Explosive Threat",
    "Chemical Spill",
    "Biological Hazard",
    "Radiation Exposure",
    "Mental Health Crisis",
    "Suicide Attempt",
    "Firearm Incident",
    "Building Collapse",
    "Hostage Situation",
    "Vehicular Breakdown",
    "Heat Stroke",
    "Cold Exposure",
    "General",
    "Custom",
];

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrendEntry {
    pub emergency_type: String,
    pub count: usize,
}

/// Counts alerts per catalog label. Labels outside the catalog count as
/// "Custom"; zero counts are dropped; ties keep catalog order.
pub fn fold_trends<I, S>(types: I) -> Vec<TrendEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts: HashMap<&'static str, usize> = HashMap::new();
    for label in types {
        let label = label.as_ref();
        let bucket = EMERGENCY_TYPES
            .iter()
            .find(|known| **known == label)
            .copied()
            .unwrap_or(CATCH_ALL);
        *counts.entry(bucket).or_default() += 1;
    }

    let mut trends: Vec<TrendEntry> = EMERGENCY_TYPES
        .iter()
        .filter_map(|label| {
            counts.get(label).map(|count| TrendEntry {
                emergency_type: label.to_string(),
                count: *count,
            })
        })
        .collect();
    // Stable sort keeps catalog order among equal counts
    trends.sort_by(|a, b| b.count.cmp(&a.count));
    trends
}

pub async fn emergency_trends(db: &DatabaseConnection) -> Result<Vec<TrendEntry>, AppError> {
    let labels: Vec<String> = Sos::find()
        .select_only()
        .column(sos::Column::EmergencyType)
        .into_tuple()
        .all(db)
        .await?;
    Ok(fold_trends(labels))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_records: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct SosPage {
    pub data: Vec<alerts::SosRecord>,
    pub pagination: Pagination,
}

pub fn total_pages(total_records: u64) -> u64 {
    total_records.div_ceil(SOS_PAGE_SIZE)
}

/// One page of alerts, newest first. Pages are 1-based.
pub async fn sos_page(db: &DatabaseConnection, page: Option<u64>) -> Result<SosPage, AppError> {
    let page = page.unwrap_or(1).max(1);
    let paginator = Sos::find()
        .order_by_desc(sos::Column::CreatedAt)
        .paginate(db, SOS_PAGE_SIZE);

    let total_records = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    Ok(SosPage {
        data: alerts::records(db, rows).await?,
        pagination: Pagination {
            total_records,
            current_page: page,
            total_pages: total_pages(total_records),
        },
    })
}

pub async fn active_sos(db: &DatabaseConnection) -> Result<Vec<alerts::SosRecord>, AppError> {
    let rows = alerts::active_since_yesterday(db).await?;
    Ok(alerts::records(db, rows).await?)
}

pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>, AppError> {
    Ok(User::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn list_circles(db: &DatabaseConnection) -> Result<Vec<circles::CircleView>, AppError> {
    circles::all(db).await
}

pub async fn list_user_cards(db: &DatabaseConnection) -> Result<Vec<user_card::Model>, AppError> {
    Ok(UserCard::find()
        .order_by_asc(user_card::Column::CreatedAt)
        .all(db)
        .await?)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub battery_level: Option<i32>,
    pub status: Option<String>,
    pub expo_push_token: Option<String>,
}

pub async fn update_user(db: &DatabaseConnection, uid: &str, changes: UpdateUser) -> Result<user::Model, AppError> {
    let existing = User::find_by_id(uid.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    if let Some(status) = changes.status.as_deref() {
        if status != user::STATUS_ONLINE && status != user::STATUS_OFFLINE {
            return Err(AppError::bad_request("status must be 'online' or 'offline'"));
        }
    }

    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = changes.name {
        active.name = Set(Some(name));
    }
    if let Some(email) = changes.email {
        active.email = Set(Some(email));
    }
    if let Some(phone) = changes.phone_number {
        active.phone_number = Set(Some(phone));
    }
    if let Some(image) = changes.profile_image {
        active.profile_image = Set(Some(image));
    }
    if let Some(lat) = changes.latitude {
        active.latitude = Set(Some(lat));
    }
    if let Some(lng) = changes.longitude {
        active.longitude = Set(Some(lng));
    }
    if let Some(battery) = changes.battery_level {
        active.battery_level = Set(Some(battery.clamp(0, 100)));
    }
    if let Some(status) = changes.status {
        active.status = Set(status);
    }
    if let Some(token) = changes.expo_push_token {
        active.expo_push_token = Set(Some(token));
    }
    active.last_synced_at = Set(Utc::now());

    let updated = active.update(db).await?;
    contacts::refresh_existing(db, &updated).await?;
    info!("Admin updated user {}", uid);
    Ok(updated)
}

pub async fn delete_user(db: &DatabaseConnection, uid: &str) -> Result<(), AppError> {
    let txn = db.begin().await?;
    let purged = circles::purge_user(&txn, uid).await?;
    if !purged.existed {
        txn.rollback().await?;
        return Err(AppError::not_found("User not found"));
    }
    txn.commit().await?;
    purged.record_metrics();
    info!(
        "Admin deleted user {} and {} administered circle(s)",
        uid, purged.circles_removed
    );
    Ok(())
}

pub async fn delete_sos(db: &DatabaseConnection, sos_id: Uuid) -> Result<(), AppError> {
    if !alerts::delete_alert(db, sos_id).await? {
        return Err(AppError::not_found("SOS not found"));
    }
    info!("Admin deleted SOS {}", sos_id);
    Ok(())
}

pub async fn delete_circle(db: &DatabaseConnection, circle_id: Uuid) -> Result<(), AppError> {
    if !circles::remove_circle(db, circle_id).await? {
        return Err(AppError::not_found("Circle not found"));
    }
    info!("Admin deleted circle {}", circle_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trends_count_and_sort_descending() {
        let trends = fold_trends(["Fire", "Fire", "Medical"]);
        assert_eq!(
            trends,
            vec![
                TrendEntry { emergency_type: "Fire".into(), count: 2 },
                TrendEntry { emergency_type: "Medical".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn unknown_labels_fold_into_custom() {
        let trends = fold_trends(["Alien Invasion", "Custom", "Flood"]);
        assert_eq!(trends[0], TrendEntry { emergency_type: "Custom".into(), count: 2 });
        assert_eq!(trends[1], TrendEntry { emergency_type: "Flood".into(), count: 1 });
    }

    #[test]
    fn ties_keep_catalog_order() {
        let trends = fold_trends(["Theft", "Fire", "Police"]);
        let labels: Vec<&str> = trends.iter().map(|t| t.emergency_type.as_str()).collect();
        assert_eq!(labels, vec!["Fire", "Police", "Theft"]);
    }

    #[test]
    fn no_alerts_means_no_trends() {
        assert!(fold_trends(Vec::<String>::new()).is_empty());
    }

    #[test]
    fn pages_round_up() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(10), 1);
        assert_eq!(total_pages(11), 2);
    }
}
