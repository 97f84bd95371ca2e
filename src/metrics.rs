use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use crate::entities::{Circle, Sos, User};

pub async fn init_metrics(db: &DatabaseConnection) {
    let user_count = User::find().count(db).await.unwrap_or(0);
    metrics::gauge!("eas_users_total").set(user_count as f64);

    let circle_count = Circle::find().count(db).await.unwrap_or(0);
    metrics::gauge!("eas_circles_total").set(circle_count as f64);

    let sos_count = Sos::find().count(db).await.unwrap_or(0);

    tracing::info!(
        "Initialized metrics: Users={}, Circles={}, SOS={}",
        user_count, circle_count, sos_count
    );
}

pub fn increment_sos_sent(emergency_type: &str, recipients: usize) {
    metrics::counter!("eas_sos_sent_total", "emergency_type" => emergency_type.to_string()).increment(1);
    metrics::histogram!("eas_sos_recipients").record(recipients as f64);
}

pub fn increment_sos_acknowledged() {
    metrics::counter!("eas_sos_acknowledged_total").increment(1);
}

pub fn increment_users() {
    metrics::gauge!("eas_users_total").increment(1.0);
}

pub fn decrement_users() {
    metrics::gauge!("eas_users_total").decrement(1.0);
}

pub fn increment_circles_created() {
    metrics::counter!("eas_circles_created_total").increment(1);
    metrics::gauge!("eas_circles_total").increment(1.0);
}

pub fn decrement_circles() {
    metrics::gauge!("eas_circles_total").decrement(1.0);
}

pub fn record_push_delivery(accepted: usize, failed: usize) {
    metrics::counter!("eas_notifications_sent_total").increment(accepted as u64);
    metrics::counter!("eas_notifications_failed_total").increment(failed as u64);
}

pub fn increment_profile_sync(outcome: &'static str) {
    metrics::counter!("eas_profile_syncs_total", "outcome" => outcome).increment(1);
}
