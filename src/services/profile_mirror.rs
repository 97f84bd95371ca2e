use std::sync::Arc;

use chrono::Utc;
use futures::{stream, StreamExt};
use sea_orm::{sea_query::OnConflict, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use tracing::{error, info, warn};

use crate::entities::{user, User};
use crate::error::AppError;
use crate::identity::{ExternalProfile, ProfileSource};
use crate::services::{circles, contacts};

const SYNC_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Upserted(user::Model),
    /// The external record is gone and the local copy was deleted.
    Removed,
    /// The external record is gone but the local store did not answer.
    Retained,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub upserted: usize,
    pub removed: usize,
    pub failed: usize,
}

/// One-way copy of external profile documents into `users`, refreshing
/// the matching directory entry when there is one.
pub struct ProfileMirror {
    db: DatabaseConnection,
    source: Arc<dyn ProfileSource>,
}

impl ProfileMirror {
    pub fn new(db: DatabaseConnection, source: Arc<dyn ProfileSource>) -> Self {
        Self { db, source }
    }

    pub async fn fetch_external(&self, uid: &str) -> Result<Option<ExternalProfile>, AppError> {
        Ok(self.source.fetch(uid).await?)
    }

    pub async fn sync_one(&self, uid: &str) -> Result<SyncOutcome, AppError> {
        let Some(profile) = self.fetch_external(uid).await? else {
            if self.db.ping().await.is_ok() {
                self.delete_local(uid).await?;
                info!("Profile {} no longer exists externally; removed local copy", uid);
                crate::metrics::increment_profile_sync("removed");
                return Ok(SyncOutcome::Removed);
            }
            warn!("Profile {} no longer exists externally, but the store is unreachable", uid);
            crate::metrics::increment_profile_sync("retained");
            return Ok(SyncOutcome::Retained);
        };

        let user = self.upsert_user(uid, profile).await?;
        if contacts::refresh_existing(&self.db, &user).await? {
            info!("Directory entry for {} refreshed", uid);
        }
        crate::metrics::increment_profile_sync("upserted");
        Ok(SyncOutcome::Upserted(user))
    }

    /// Syncs every externally known identity. Per-identity failures are
    /// logged and counted; only failing to enumerate is an error.
    pub async fn sync_all(&self) -> Result<SyncSummary, AppError> {
        let uids = self.source.list_uids().await?;
        let total = uids.len();

        let results: Vec<(String, Result<SyncOutcome, AppError>)> = stream::iter(uids)
            .map(|uid| async move {
                let outcome = self.sync_one(&uid).await;
                (uid, outcome)
            })
            .buffer_unordered(SYNC_CONCURRENCY)
            .collect()
            .await;

        let mut summary = SyncSummary::default();
        for (uid, result) in results {
            match result {
                Ok(SyncOutcome::Upserted(_)) => summary.upserted += 1,
                Ok(SyncOutcome::Removed) => summary.removed += 1,
                Ok(SyncOutcome::Retained) => {}
                Err(e) => {
                    error!("Failed to sync profile {}: {}", uid, e);
                    crate::metrics::increment_profile_sync("failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            total,
            upserted = summary.upserted,
            removed = summary.removed,
            failed = summary.failed,
            "Profile sync pass finished"
        );
        Ok(summary)
    }

    /// Applies a removal reported by the change feed. Returns whether a
    /// local user existed.
    pub async fn remove(&self, uid: &str) -> Result<bool, AppError> {
        if self.db.ping().await.is_err() {
            warn!("Skipping removal of {}: store is unreachable", uid);
            return Ok(false);
        }
        let existed = self.delete_local(uid).await?;
        if existed {
            crate::metrics::increment_profile_sync("removed");
        }
        Ok(existed)
    }

    async fn upsert_user(&self, uid: &str, profile: ExternalProfile) -> Result<user::Model, AppError> {
        let is_new = User::find_by_id(uid.to_string()).one(&self.db).await?.is_none();
        let now = Utc::now();
        let row = user::ActiveModel {
            uid: Set(uid.to_string()),
            name: Set(profile.full_name),
            email: Set(profile.email),
            phone_number: Set(profile.phone_number),
            profile_image: Set(profile.profile_image),
            latitude: Set(profile.latitude),
            longitude: Set(profile.longitude),
            battery_level: Set(profile.battery_level.map(|b| b.round().clamp(0.0, 100.0) as i32)),
            expo_push_token: Set(profile.expo_push_token),
            status: Set(user::STATUS_OFFLINE.to_string()),
            last_synced_at: Set(now),
            created_at: Set(now),
        };

        User::insert(row)
            .on_conflict(
                OnConflict::column(user::Column::Uid)
                    .update_columns([
                        user::Column::Name,
                        user::Column::Email,
                        user::Column::PhoneNumber,
                        user::Column::ProfileImage,
                        user::Column::Latitude,
                        user::Column::Longitude,
                        user::Column::BatteryLevel,
                        user::Column::ExpoPushToken,
                        user::Column::LastSyncedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        if is_new {
            crate::metrics::increment_users();
        }

        User::find_by_id(uid.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::Internal(format!("user {uid} missing after upsert")))
    }

    async fn delete_local(&self, uid: &str) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;
        let purged = circles::purge_user(&txn, uid).await?;
        txn.commit().await?;
        purged.record_metrics();
        Ok(purged.existed)
    }
}
