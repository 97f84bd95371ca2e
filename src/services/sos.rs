use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{
    circle, contact, sos, sos_circle, sos_recipient, user, Circle, Contact, Sos, SosCircle,
    SosRecipient, User,
};
use crate::error::AppError;
use crate::notifications::{NotificationGateway, NotificationTemplates, PushMessage};
use crate::services::circles;

pub const NOTIFIED_VIA_APP: &str = "App";
const DEFAULT_BATTERY: i32 = 100;
const UNKNOWN_LOCATION: &str = "Unknown location";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl UserLocation {
    fn is_usable(&self) -> bool {
        let has_address = self.address.as_deref().is_some_and(|a| !a.trim().is_empty());
        has_address || (self.latitude.is_some() && self.longitude.is_some())
    }

    /// Human-readable form used in push bodies.
    pub fn label(&self) -> String {
        match (&self.address, self.latitude, self.longitude) {
            (Some(address), _, _) if !address.trim().is_empty() => address.clone(),
            (_, Some(lat), Some(lng)) => format!("{}, {}", lat, lng),
            _ => UNKNOWN_LOCATION.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSos {
    pub message: Option<String>,
    pub emergency_type: Option<String>,
    pub user_location: Option<UserLocation>,
    #[serde(default)]
    pub selected_circle_ids: Vec<String>,
    #[serde(default)]
    pub send_to_all_circles: bool,
    pub battery_status: Option<i32>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotifiedContact {
    pub contact_id: String,
    pub name: Option<String>,
    pub notified_via: String,
    pub emergency_message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosDispatch {
    pub message: String,
    pub sos_id: Uuid,
    pub circles: Vec<String>,
    pub notified_contacts: Vec<NotifiedContact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeSos {
    pub sos_id: String,
    pub contact_id: Option<String>,
}

struct ValidatedSos {
    message: String,
    emergency_type: String,
    location: UserLocation,
}

fn validate(req: &SendSos) -> Result<ValidatedSos, AppError> {
    let message = req.message.as_deref().map(str::trim).filter(|m| !m.is_empty());
    let emergency_type = req
        .emergency_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let location = req.user_location.as_ref().filter(|l| l.is_usable());

    match (message, emergency_type, location) {
        (Some(message), Some(emergency_type), Some(location)) => Ok(ValidatedSos {
            message: message.to_string(),
            emergency_type: emergency_type.to_string(),
            location: location.clone(),
        }),
        _ => Err(AppError::bad_request(
            "Invalid request: missing message, user location, or emergency type.",
        )),
    }
}

/// Battery reported with the request, else the profile's, else full.
pub fn battery_snapshot(requested: Option<i32>, profile: Option<i32>) -> i32 {
    requested.or(profile).unwrap_or(DEFAULT_BATTERY).clamp(0, 100)
}

/// Walks circles in order and their members in insertion order, skipping
/// the sender and keeping the first occurrence of each identity.
pub fn recipient_order(
    sender: &str,
    circle_ids: &[Uuid],
    members: &HashMap<Uuid, Vec<String>>,
    known_contacts: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for circle_id in circle_ids {
        for user_id in members.get(circle_id).into_iter().flatten() {
            if user_id == sender || !known_contacts.contains(user_id) {
                continue;
            }
            if seen.insert(user_id.clone()) {
                ordered.push(user_id.clone());
            }
        }
    }
    ordered
}

async fn target_circles(
    db: &DatabaseConnection,
    sender: &str,
    req: &SendSos,
    send_to_all: bool,
) -> Result<Vec<circle::Model>, DbErr> {
    if send_to_all || req.send_to_all_circles {
        return circles::circles_containing(db, sender).await;
    }

    // Ids that are not UUIDs cannot name a circle
    let ids: Vec<Uuid> = req
        .selected_circle_ids
        .iter()
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect();
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Circle::find()
        .filter(circle::Column::Id.is_in(ids))
        .order_by_asc(circle::Column::CreatedAt)
        .all(db)
        .await
}

/// Resolves recipients, persists the alert and fans out push notifications.
pub async fn send(
    db: &DatabaseConnection,
    notifier: &NotificationGateway,
    sender_id: &str,
    req: SendSos,
    send_to_all: bool,
) -> Result<SosDispatch, AppError> {
    let valid = validate(&req)?;

    let sender = User::find_by_id(sender_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Sender not found."))?;

    let circles = target_circles(db, &sender.uid, &req, send_to_all).await?;
    if circles.is_empty() {
        return Err(AppError::not_found("No circles found."));
    }
    let circle_ids: Vec<Uuid> = circles.iter().map(|c| c.id).collect();

    let members: HashMap<Uuid, Vec<String>> = circles::members_of(db, &circle_ids)
        .await?
        .into_iter()
        .map(|(id, rows)| (id, rows.into_iter().map(|m| m.user_id).collect()))
        .collect();
    let candidate_ids: Vec<String> = members
        .values()
        .flatten()
        .filter(|id| **id != sender.uid)
        .cloned()
        .collect();
    let mut contacts: HashMap<String, contact::Model> = Contact::find()
        .filter(contact::Column::UserId.is_in(candidate_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.user_id.clone(), c))
        .collect();
    let known: HashSet<String> = contacts.keys().cloned().collect();

    let recipients: Vec<contact::Model> = recipient_order(&sender.uid, &circle_ids, &members, &known)
        .into_iter()
        .filter_map(|id| contacts.remove(&id))
        .collect();

    if recipients.is_empty() {
        return Err(AppError::bad_request(
            "No contacts found in the selected circles. Please select other circles or create new ones.",
        ));
    }

    let battery = battery_snapshot(req.battery_status, sender.battery_level);
    let sender_name = sender.name.clone().unwrap_or_else(|| "Unknown".to_string());
    let emergency_message = NotificationTemplates::sos_message(&valid.message, &sender_name);

    let sos_id = persist(db, &sender, &valid, battery, &circles, &recipients).await?;
    tracing::Span::current().record("sos_id", tracing::field::display(sos_id));

    let location = valid.location.label();
    let body = NotificationTemplates::sos_body(&emergency_message, battery, &location, &valid.emergency_type);
    let pushes: Vec<PushMessage> = recipients
        .iter()
        .filter_map(|c| c.expo_push_token.as_ref())
        .map(|token| {
            PushMessage::new(
                token.clone(),
                body.clone(),
                json!({
                    "sosId": sos_id,
                    "message": emergency_message,
                    "batteryStatus": battery,
                    "location": location,
                    "emergencyType": valid.emergency_type,
                    "acknowledge": false,
                }),
            )
        })
        .collect();
    let skipped = recipients.len() - pushes.len();
    if skipped > 0 {
        info!("{} recipients have no push token; skipped", skipped);
    }
    notifier.deliver(pushes).await;

    let circle_names: Vec<String> = circles.iter().map(|c| c.name.clone()).collect();
    if let Some(token) = &sender.expo_push_token {
        let confirmation = NotificationTemplates::sos_confirmation(&circle_names);
        notifier
            .deliver_one(PushMessage::new(
                token.clone(),
                NotificationTemplates::sos_body(&confirmation, battery, &location, &valid.emergency_type),
                json!({
                    "sosId": sos_id,
                    "message": confirmation,
                    "batteryStatus": battery,
                    "location": location,
                    "emergencyType": valid.emergency_type,
                    "acknowledge": true,
                }),
            ))
            .await;
    }

    crate::metrics::increment_sos_sent(&valid.emergency_type, recipients.len());
    info!(
        "SOS {} from {} sent to {} contacts across {} circles",
        sos_id,
        sender.uid,
        recipients.len(),
        circles.len()
    );

    Ok(SosDispatch {
        message: "SOS message sent successfully!".to_string(),
        sos_id,
        circles: circle_names,
        notified_contacts: recipients
            .into_iter()
            .map(|c| NotifiedContact {
                contact_id: c.user_id,
                name: c.name,
                notified_via: NOTIFIED_VIA_APP.to_string(),
                emergency_message: emergency_message.clone(),
            })
            .collect(),
    })
}

async fn persist(
    db: &DatabaseConnection,
    sender: &user::Model,
    valid: &ValidatedSos,
    battery: i32,
    circles: &[circle::Model],
    recipients: &[contact::Model],
) -> Result<Uuid, DbErr> {
    let sos_id = Uuid::new_v4();
    let txn = db.begin().await?;

    Sos::insert(sos::ActiveModel {
        id: Set(sos_id),
        user_id: Set(sender.uid.clone()),
        message: Set(valid.message.clone()),
        emergency_type: Set(valid.emergency_type.clone()),
        location_address: Set(valid.location.address.clone()),
        latitude: Set(valid.location.latitude),
        longitude: Set(valid.location.longitude),
        sender_name: Set(sender.name.clone()),
        sender_profile_image: Set(sender.profile_image.clone()),
        sender_battery: Set(battery),
        created_at: Set(Utc::now()),
    })
    .exec_without_returning(&txn)
    .await?;

    SosCircle::insert_many(circles.iter().map(|c| sos_circle::ActiveModel {
        sos_id: Set(sos_id),
        circle_id: Set(c.id),
        circle_name: Set(c.name.clone()),
        ..Default::default()
    }))
    .exec_without_returning(&txn)
    .await?;

    SosRecipient::insert_many(recipients.iter().map(|c| sos_recipient::ActiveModel {
        sos_id: Set(sos_id),
        contact_id: Set(c.user_id.clone()),
        name: Set(c.name.clone()),
        notified_via: Set(NOTIFIED_VIA_APP.to_string()),
        acknowledged: Set(false),
        acknowledged_at: Set(None),
        ..Default::default()
    }))
    .exec_without_returning(&txn)
    .await?;

    txn.commit().await?;
    Ok(sos_id)
}

pub async fn acknowledge(
    db: &DatabaseConnection,
    notifier: &NotificationGateway,
    caller: &str,
    req: AcknowledgeSos,
) -> Result<(), AppError> {
    let sos_id = Uuid::parse_str(&req.sos_id).map_err(|_| AppError::not_found("SOS not found"))?;
    let sos = Sos::find_by_id(sos_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("SOS not found"))?;
    tracing::Span::current().record("sos_id", tracing::field::display(sos_id));

    let contact_id = req.contact_id.unwrap_or_else(|| caller.to_string());
    let recipient = SosRecipient::find()
        .filter(sos_recipient::Column::SosId.eq(sos_id))
        .filter(sos_recipient::Column::ContactId.eq(contact_id.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::forbidden("Contact not authorized to acknowledge this SOS"))?;

    if recipient.acknowledged {
        return Err(AppError::conflict("SOS already acknowledged by this contact"));
    }

    // Only one of two racing acknowledgments can flip the flag
    let flipped = SosRecipient::update_many()
        .col_expr(sos_recipient::Column::Acknowledged, Expr::value(true))
        .col_expr(sos_recipient::Column::AcknowledgedAt, Expr::value(Utc::now()))
        .filter(sos_recipient::Column::Id.eq(recipient.id))
        .filter(sos_recipient::Column::Acknowledged.eq(false))
        .exec(db)
        .await?;
    if flipped.rows_affected == 0 {
        return Err(AppError::conflict("SOS already acknowledged by this contact"));
    }
    crate::metrics::increment_sos_acknowledged();
    info!("SOS {} acknowledged by {}", sos_id, contact_id);

    let sender = User::find_by_id(sos.user_id.clone()).one(db).await?;
    let acknowledger = Contact::find_by_id(contact_id.clone()).one(db).await?;
    match (sender, acknowledger) {
        (Some(sender), Some(acknowledger)) => {
            let Some(token) = sender.expo_push_token else {
                info!("Sender {} has no push token; acknowledgment not pushed", sos.user_id);
                return Ok(());
            };
            let text = NotificationTemplates::acknowledgment(
                acknowledger.name.as_deref().unwrap_or("A contact"),
                acknowledger.phone_number.as_deref().unwrap_or("no phone"),
            );
            notifier
                .deliver_one(PushMessage::new(
                    token,
                    text.clone(),
                    json!({ "sosId": sos_id, "message": text, "acknowledge": true }),
                ))
                .await;
        }
        (None, _) => warn!("Sender {} of SOS {} no longer exists", sos.user_id, sos_id),
        (_, None) => warn!("Acknowledging contact {} no longer exists", contact_id),
    }

    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderSummary {
    pub name: Option<String>,
    pub battery_status: i32,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosDetails {
    pub emergency_type: String,
    pub message: String,
    pub user_location: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientStatus {
    pub contact_id: String,
    pub name: Option<String>,
    pub acknowledged: bool,
}

#[derive(Debug, Serialize)]
pub struct CircleName {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSos {
    pub id: Uuid,
    pub sender: SenderSummary,
    pub sos_details: SosDetails,
    pub contacts: Vec<RecipientStatus>,
    pub circles: Vec<CircleName>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderSnapshot {
    pub user_id: String,
    pub name: Option<String>,
    pub profile_image: Option<String>,
    pub battery_status: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleSnapshot {
    pub circle_id: Uuid,
    pub circle_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientRecord {
    pub contact_id: String,
    pub name: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub notified_via: String,
}

/// Full alert record as stored: sender snapshot, circles and recipients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SosRecord {
    pub id: Uuid,
    pub sender: SenderSnapshot,
    pub emergency_type: String,
    pub message: String,
    pub user_location: UserLocation,
    pub battery_status: i32,
    pub circles: Vec<CircleSnapshot>,
    pub contacts: Vec<RecipientRecord>,
    pub created_at: DateTime<Utc>,
}

struct Attached {
    circles: HashMap<Uuid, Vec<sos_circle::Model>>,
    recipients: HashMap<Uuid, Vec<sos_recipient::Model>>,
}

async fn attach<C: ConnectionTrait>(conn: &C, alerts: &[sos::Model]) -> Result<Attached, DbErr> {
    let ids: Vec<Uuid> = alerts.iter().map(|s| s.id).collect();
    let mut attached = Attached {
        circles: HashMap::new(),
        recipients: HashMap::new(),
    };
    if ids.is_empty() {
        return Ok(attached);
    }

    for row in SosCircle::find()
        .filter(sos_circle::Column::SosId.is_in(ids.clone()))
        .order_by_asc(sos_circle::Column::Id)
        .all(conn)
        .await?
    {
        attached.circles.entry(row.sos_id).or_default().push(row);
    }
    for row in SosRecipient::find()
        .filter(sos_recipient::Column::SosId.is_in(ids))
        .order_by_asc(sos_recipient::Column::Id)
        .all(conn)
        .await?
    {
        attached.recipients.entry(row.sos_id).or_default().push(row);
    }
    Ok(attached)
}

/// Expands stored alerts into full records, keeping their order.
pub async fn records<C: ConnectionTrait>(conn: &C, alerts: Vec<sos::Model>) -> Result<Vec<SosRecord>, DbErr> {
    let mut attached = attach(conn, &alerts).await?;
    Ok(alerts
        .into_iter()
        .map(|s| {
            let circles = attached.circles.remove(&s.id).unwrap_or_default();
            let recipients = attached.recipients.remove(&s.id).unwrap_or_default();
            SosRecord {
                id: s.id,
                sender: SenderSnapshot {
                    user_id: s.user_id,
                    name: s.sender_name,
                    profile_image: s.sender_profile_image,
                    battery_status: s.sender_battery,
                },
                emergency_type: s.emergency_type,
                message: s.message,
                user_location: UserLocation {
                    address: s.location_address,
                    latitude: s.latitude,
                    longitude: s.longitude,
                },
                battery_status: s.sender_battery,
                circles: circles
                    .into_iter()
                    .map(|c| CircleSnapshot {
                        circle_id: c.circle_id,
                        circle_name: c.circle_name,
                    })
                    .collect(),
                contacts: recipients
                    .into_iter()
                    .map(|r| RecipientRecord {
                        contact_id: r.contact_id,
                        name: r.name,
                        acknowledged: r.acknowledged,
                        acknowledged_at: r.acknowledged_at,
                        notified_via: r.notified_via,
                    })
                    .collect(),
                created_at: s.created_at,
            }
        })
        .collect())
}

/// Alerts created in the trailing 24 hours, newest first.
pub async fn active_since_yesterday(db: &DatabaseConnection) -> Result<Vec<sos::Model>, DbErr> {
    Sos::find()
        .filter(sos::Column::CreatedAt.gte(Utc::now() - Duration::hours(24)))
        .order_by_desc(sos::Column::CreatedAt)
        .all(db)
        .await
}

pub async fn list_recent(db: &DatabaseConnection) -> Result<Vec<RecentSos>, AppError> {
    let alerts = active_since_yesterday(db).await?;
    let mut attached = attach(db, &alerts).await?;

    Ok(alerts
        .into_iter()
        .map(|s| {
            let location = UserLocation {
                address: s.location_address,
                latitude: s.latitude,
                longitude: s.longitude,
            };
            RecentSos {
                id: s.id,
                sender: SenderSummary {
                    name: s.sender_name,
                    battery_status: s.sender_battery,
                    user_id: s.user_id,
                },
                sos_details: SosDetails {
                    emergency_type: s.emergency_type,
                    message: s.message,
                    user_location: location
                        .address
                        .filter(|a| !a.trim().is_empty())
                        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
                    created_at: s.created_at.format("%H:%M").to_string(),
                },
                contacts: attached
                    .recipients
                    .remove(&s.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| RecipientStatus {
                        contact_id: r.contact_id,
                        name: r.name,
                        acknowledged: r.acknowledged,
                    })
                    .collect(),
                circles: attached
                    .circles
                    .remove(&s.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| CircleName { name: c.circle_name })
                    .collect(),
            }
        })
        .collect())
}

pub async fn list_by_user(db: &DatabaseConnection, user_id: &str) -> Result<Vec<SosRecord>, AppError> {
    let alerts = Sos::find()
        .filter(sos::Column::UserId.eq(user_id))
        .order_by_desc(sos::Column::CreatedAt)
        .all(db)
        .await?;
    Ok(records(db, alerts).await?)
}

pub async fn delete_by_user(
    db: &DatabaseConnection,
    caller: &str,
    user_id: &str,
    sos_id: &str,
) -> Result<(), AppError> {
    if caller != user_id {
        return Err(AppError::forbidden("You can only delete your own SOS requests."));
    }

    let not_found = || {
        AppError::not_found(format!(
            "No SOS request found for user {} with ID {} to delete.",
            user_id, sos_id
        ))
    };
    let sos_id = Uuid::parse_str(sos_id).map_err(|_| not_found())?;

    let owned = Sos::find_by_id(sos_id)
        .filter(sos::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    if owned.is_none() {
        return Err(not_found());
    }

    delete_alert(db, sos_id).await?;
    info!("SOS {} deleted by its sender {}", sos_id, user_id);
    Ok(())
}

/// Removes an alert with its circle snapshots and recipients. Returns
/// whether the alert existed.
pub async fn delete_alert(db: &DatabaseConnection, sos_id: Uuid) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    SosRecipient::delete_many()
        .filter(sos_recipient::Column::SosId.eq(sos_id))
        .exec(&txn)
        .await?;
    SosCircle::delete_many()
        .filter(sos_circle::Column::SosId.eq(sos_id))
        .exec(&txn)
        .await?;
    let deleted = Sos::delete_by_id(sos_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(deleted.rows_affected > 0)
}
