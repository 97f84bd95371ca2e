use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{
    circle, circle_member, contact, user, Circle, CircleMember, Contact, User,
};
use crate::error::AppError;
use crate::services::contacts::{self, Location};
use crate::services::profile_mirror::{ProfileMirror, SyncOutcome};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LENGTH: usize = 6;
const CODE_ATTEMPTS: usize = 5;

pub fn generate_circle_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCircle {
    pub name: Option<String>,
    pub profile_image: Option<String>,
    #[serde(default)]
    pub member_user_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemberEntry {
    pub user_id: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CircleView {
    pub id: Uuid,
    pub name: String,
    pub profile_image: Option<String>,
    pub admin_id: String,
    pub circle_code: String,
    pub created_at: DateTime<Utc>,
    pub contacts: Vec<MemberEntry>,
}

impl CircleView {
    fn new(model: circle::Model, members: Vec<circle_member::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            profile_image: model.profile_image,
            admin_id: model.admin_id,
            circle_code: model.circle_code,
            created_at: model.created_at,
            contacts: members
                .into_iter()
                .map(|m| MemberEntry {
                    user_id: m.user_id,
                    role: m.role,
                })
                .collect(),
        }
    }
}

/// A directory entry seen through one circle: carries that circle's role only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleContact {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub location: Location,
    pub battery_percentage: Option<i32>,
    pub profile_image: Option<String>,
    pub status: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    pub uid: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image: Option<String>,
}

pub async fn create(
    db: &DatabaseConnection,
    creator_id: &str,
    req: CreateCircle,
) -> Result<CircleView, AppError> {
    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::bad_request("Circle name is required."))?;

    let creator = User::find_by_id(creator_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("User profile not found."))?;

    let mut seen = HashSet::from([creator.uid.clone()]);
    let requested: Vec<String> = req
        .member_user_ids
        .into_iter()
        .filter(|id| seen.insert(id.clone()))
        .collect();

    // Unknown ids are dropped; request order is kept
    let mut found: HashMap<String, user::Model> = User::find()
        .filter(user::Column::Uid.is_in(requested.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.uid.clone(), u))
        .collect();
    let members: Vec<user::Model> = requested
        .iter()
        .filter_map(|id| found.remove(id))
        .collect();

    let code = unique_circle_code(db).await?;
    let now = Utc::now();
    let circle_id = Uuid::new_v4();

    let txn = db.begin().await?;

    let circle = circle::ActiveModel {
        id: Set(circle_id),
        name: Set(name),
        profile_image: Set(req.profile_image),
        admin_id: Set(creator.uid.clone()),
        circle_code: Set(code),
        created_at: Set(now),
    };
    let circle = circle.insert(&txn).await?;

    let mut entries = Vec::with_capacity(members.len() + 1);
    for (participant, role) in std::iter::once((&creator, circle_member::ROLE_ADMIN))
        .chain(members.iter().map(|m| (m, circle_member::ROLE_MEMBER)))
    {
        contacts::upsert_from_user(&txn, participant).await?;
        let entry = circle_member::ActiveModel {
            circle_id: Set(circle_id),
            user_id: Set(participant.uid.clone()),
            role: Set(role.to_string()),
            joined_at: Set(now),
            ..Default::default()
        };
        entries.push(entry.insert(&txn).await?);
    }

    txn.commit().await?;

    crate::metrics::increment_circles_created();
    info!(
        "Created circle {} with {} members for {}",
        circle_id,
        entries.len(),
        creator.uid
    );
    Ok(CircleView::new(circle, entries))
}

async fn unique_circle_code(db: &DatabaseConnection) -> Result<String, AppError> {
    for attempt in 1..=CODE_ATTEMPTS {
        let code = generate_circle_code();
        let taken = Circle::find()
            .filter(circle::Column::CircleCode.eq(code.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(code);
        }
        warn!("Circle code collision on attempt {}", attempt);
    }
    Err(AppError::Internal("could not allocate a unique circle code".into()))
}

pub async fn join(
    db: &DatabaseConnection,
    mirror: &ProfileMirror,
    code: &str,
    uid: &str,
) -> Result<CircleView, AppError> {
    let circle = Circle::find()
        .filter(circle::Column::CircleCode.eq(code.trim().to_uppercase()))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Circle not found"))?;

    let joiner = match mirror.sync_one(uid).await? {
        SyncOutcome::Upserted(user) => user,
        SyncOutcome::Removed | SyncOutcome::Retained => {
            return Err(AppError::not_found("User profile not found"))
        }
    };

    let already = CircleMember::find()
        .filter(circle_member::Column::CircleId.eq(circle.id))
        .filter(circle_member::Column::UserId.eq(uid))
        .count(db)
        .await?;
    if already > 0 {
        return Err(AppError::bad_request("User has already joined this circle"));
    }

    contacts::upsert_from_user(db, &joiner).await?;
    let entry = circle_member::ActiveModel {
        circle_id: Set(circle.id),
        user_id: Set(joiner.uid.clone()),
        role: Set(circle_member::ROLE_MEMBER.to_string()),
        joined_at: Set(Utc::now()),
        ..Default::default()
    };
    if let Err(e) = CircleMember::insert(entry).exec_without_returning(db).await {
        // A concurrent join of the same identity lost the race on the unique index
        return Err(match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::bad_request("User has already joined this circle")
            }
            _ => e.into(),
        });
    }

    info!("{} joined circle {}", uid, circle.id);
    let members = members_of(db, &[circle.id]).await?.remove(&circle.id).unwrap_or_default();
    Ok(CircleView::new(circle, members))
}

pub async fn delete(db: &DatabaseConnection, circle_id: Uuid, requester: &str) -> Result<(), AppError> {
    let circle = Circle::find_by_id(circle_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Circle not found"))?;

    if circle.admin_id != requester {
        return Err(AppError::forbidden("Only the admin can delete this circle."));
    }

    remove_circle(db, circle_id).await?;
    info!("Circle {} deleted by {}", circle_id, requester);
    Ok(())
}

/// Drops the circle and its role entries in one transaction. Directory
/// entries stay. Returns whether the circle existed.
pub async fn remove_circle(db: &DatabaseConnection, circle_id: Uuid) -> Result<bool, DbErr> {
    let txn = db.begin().await?;
    let existed = delete_circle_rows(&txn, circle_id).await?;
    txn.commit().await?;

    if existed {
        crate::metrics::decrement_circles();
    }
    Ok(existed)
}

async fn delete_circle_rows<C: ConnectionTrait>(conn: &C, circle_id: Uuid) -> Result<bool, DbErr> {
    CircleMember::delete_many()
        .filter(circle_member::Column::CircleId.eq(circle_id))
        .exec(conn)
        .await?;
    let deleted = Circle::delete_by_id(circle_id).exec(conn).await?;
    Ok(deleted.rows_affected > 0)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgedUser {
    pub existed: bool,
    pub circles_removed: usize,
}

impl PurgedUser {
    /// Call once the surrounding transaction has committed.
    pub fn record_metrics(&self) {
        for _ in 0..self.circles_removed {
            crate::metrics::decrement_circles();
        }
        if self.existed {
            crate::metrics::decrement_users();
        }
    }
}

/// Removes a user with everything hanging off them: the circles they
/// administer, their role entries elsewhere, and their directory entry.
/// A circle never outlives its admin. Run it inside a transaction.
pub async fn purge_user<C: ConnectionTrait>(conn: &C, uid: &str) -> Result<PurgedUser, DbErr> {
    let administered: Vec<Uuid> = Circle::find()
        .select_only()
        .column(circle::Column::Id)
        .filter(circle::Column::AdminId.eq(uid))
        .into_tuple()
        .all(conn)
        .await?;

    let mut circles_removed = 0;
    for circle_id in administered {
        if delete_circle_rows(conn, circle_id).await? {
            circles_removed += 1;
        }
    }

    CircleMember::delete_many()
        .filter(circle_member::Column::UserId.eq(uid))
        .exec(conn)
        .await?;
    Contact::delete_many()
        .filter(contact::Column::UserId.eq(uid))
        .exec(conn)
        .await?;
    let deleted = User::delete_by_id(uid.to_string()).exec(conn).await?;

    Ok(PurgedUser {
        existed: deleted.rows_affected > 0,
        circles_removed,
    })
}

pub async fn remove_member(
    db: &DatabaseConnection,
    circle_id: Uuid,
    contact_id: &str,
    requester: &str,
) -> Result<(), AppError> {
    let circle = Circle::find_by_id(circle_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Circle not found"))?;

    let entry = CircleMember::find()
        .filter(circle_member::Column::CircleId.eq(circle_id))
        .filter(circle_member::Column::UserId.eq(contact_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Contact not found in this circle."))?;

    if requester != circle.admin_id && requester != contact_id {
        return Err(AppError::forbidden(
            "Only the admin or the contact itself can remove a member.",
        ));
    }
    if entry.role == circle_member::ROLE_ADMIN {
        return Err(AppError::bad_request("The circle admin cannot be removed."));
    }

    CircleMember::delete_by_id(entry.id).exec(db).await?;
    info!("Removed {} from circle {}", contact_id, circle_id);
    Ok(())
}

pub async fn contacts_of(db: &DatabaseConnection, circle_id: Uuid) -> Result<Vec<CircleContact>, AppError> {
    Circle::find_by_id(circle_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("Circle not found"))?;

    let rows = CircleMember::find()
        .filter(circle_member::Column::CircleId.eq(circle_id))
        .order_by_asc(circle_member::Column::Id)
        .find_also_related(Contact)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(entry, contact)| contact.map(|c| circle_contact(c, entry.role)))
        .collect())
}

fn circle_contact(contact: contact::Model, role: String) -> CircleContact {
    CircleContact {
        user_id: contact.user_id,
        name: contact.name,
        email: contact.email,
        phone_number: contact.phone_number,
        location: Location {
            latitude: contact.latitude,
            longitude: contact.longitude,
        },
        battery_percentage: contact.battery_percentage,
        profile_image: contact.profile_image,
        status: contact.status,
        role,
    }
}

pub async fn created_by(db: &DatabaseConnection, uid: &str) -> Result<Vec<CircleView>, AppError> {
    let circles = Circle::find()
        .filter(circle::Column::AdminId.eq(uid))
        .order_by_asc(circle::Column::CreatedAt)
        .all(db)
        .await?;
    with_members(db, circles).await
}

pub async fn joined_by(db: &DatabaseConnection, uid: &str) -> Result<Vec<CircleView>, AppError> {
    let circles = circles_containing(db, uid).await?;
    with_members(db, circles).await
}

pub async fn all(db: &DatabaseConnection) -> Result<Vec<CircleView>, AppError> {
    let circles = Circle::find()
        .order_by_asc(circle::Column::CreatedAt)
        .all(db)
        .await?;
    with_members(db, circles).await
}

/// Circles holding a role entry for `uid`, oldest first.
pub async fn circles_containing(db: &DatabaseConnection, uid: &str) -> Result<Vec<circle::Model>, DbErr> {
    Circle::find()
        .join(JoinType::InnerJoin, circle::Relation::CircleMember.def())
        .filter(circle_member::Column::UserId.eq(uid))
        .order_by_asc(circle::Column::CreatedAt)
        .all(db)
        .await
}

/// Role entries per circle, in insertion order.
pub async fn members_of(
    db: &DatabaseConnection,
    circle_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<circle_member::Model>>, DbErr> {
    let mut grouped: HashMap<Uuid, Vec<circle_member::Model>> = HashMap::new();
    if circle_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = CircleMember::find()
        .filter(circle_member::Column::CircleId.is_in(circle_ids.to_vec()))
        .order_by_asc(circle_member::Column::Id)
        .all(db)
        .await?;
    for row in rows {
        grouped.entry(row.circle_id).or_default().push(row);
    }
    Ok(grouped)
}

async fn with_members(
    db: &DatabaseConnection,
    circles: Vec<circle::Model>,
) -> Result<Vec<CircleView>, AppError> {
    let ids: Vec<Uuid> = circles.iter().map(|c| c.id).collect();
    let mut members = members_of(db, &ids).await?;
    Ok(circles
        .into_iter()
        .map(|c| {
            let entries = members.remove(&c.id).unwrap_or_default();
            CircleView::new(c, entries)
        })
        .collect())
}

pub async fn member_profile(db: &DatabaseConnection, uid: &str) -> Result<MemberProfile, AppError> {
    let user = User::find_by_id(uid.to_string())
        .one(db)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok(MemberProfile {
        uid: user.uid,
        name: user.name,
        email: user.email,
        phone_number: user.phone_number,
        profile_image: user.profile_image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_codes_are_six_uppercase_alphanumerics() {
        for _ in 0..200 {
            let code = generate_circle_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn circle_codes_vary() {
        let codes: HashSet<String> = (0..50).map(|_| generate_circle_code()).collect();
        assert!(codes.len() > 1);
    }
}
