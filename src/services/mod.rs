pub mod assistance;
pub mod circles;
pub mod contacts;
pub mod profile_mirror;
pub mod reporting;
pub mod scheduled_sos;
pub mod sos;
pub mod user_cards;

pub use profile_mirror::{ProfileMirror, SyncOutcome, SyncSummary};
