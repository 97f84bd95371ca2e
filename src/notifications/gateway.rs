use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, warn};

/// Largest batch the Expo push endpoint accepts in one request.
pub const EXPO_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub sound: &'static str,
    pub body: String,
    pub data: Value,
}

impl PushMessage {
    pub fn new(to: impl Into<String>, body: impl Into<String>, data: Value) -> Self {
        Self {
            to: to.into(),
            sound: "default",
            body: body.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TicketDetails {
    pub error: Option<String>,
}

/// One ticket per submitted message, in submission order.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PushTicket {
    Ok {
        id: Option<String>,
    },
    Error {
        message: String,
        details: Option<TicketDetails>,
    },
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("push transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("push provider rejected the batch ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[async_trait]
pub trait PushProvider: Send + Sync + 'static {
    fn max_chunk_size(&self) -> usize {
        EXPO_CHUNK_SIZE
    }

    async fn send_chunk(&self, chunk: &[PushMessage]) -> Result<Vec<PushTicket>, PushError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub accepted: usize,
    pub failed: usize,
}

/// Best-effort fan-out over a push provider. Failures are logged and
/// counted, never returned to the caller.
#[derive(Clone)]
pub struct NotificationGateway {
    provider: Arc<dyn PushProvider>,
}

impl NotificationGateway {
    pub fn new(provider: Arc<dyn PushProvider>) -> Self {
        Self { provider }
    }

    pub async fn deliver(&self, messages: Vec<PushMessage>) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if messages.is_empty() {
            return report;
        }

        let chunk_size = self.provider.max_chunk_size().max(1);
        for chunk in messages.chunks(chunk_size) {
            match self.provider.send_chunk(chunk).await {
                Ok(tickets) => {
                    for ticket in &tickets {
                        match ticket {
                            PushTicket::Ok { .. } => report.accepted += 1,
                            PushTicket::Error { message, details } => {
                                report.failed += 1;
                                error!("Error sending notification: {}", message);
                                if let Some(code) = details.as_ref().and_then(|d| d.error.as_ref()) {
                                    error!("Error code: {}", code);
                                }
                            }
                        }
                    }
                    if tickets.len() < chunk.len() {
                        let missing = chunk.len() - tickets.len();
                        warn!("Push provider returned {} fewer tickets than messages", missing);
                        report.failed += missing;
                    }
                }
                Err(e) => {
                    error!("Error sending notification chunk: {}", e);
                    report.failed += chunk.len();
                }
            }
        }

        crate::metrics::record_push_delivery(report.accepted, report.failed);
        info!(
            accepted = report.accepted,
            failed = report.failed,
            "Push delivery finished"
        );
        report
    }

    pub async fn deliver_one(&self, message: PushMessage) -> DeliveryReport {
        self.deliver(vec![message]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedProvider {
        chunk_size: usize,
        batches: Mutex<Vec<usize>>,
        fail_every_other: bool,
    }

    #[async_trait]
    impl PushProvider for ScriptedProvider {
        fn max_chunk_size(&self) -> usize {
            self.chunk_size
        }

        async fn send_chunk(&self, chunk: &[PushMessage]) -> Result<Vec<PushTicket>, PushError> {
            self.batches.lock().unwrap().push(chunk.len());
            Ok(chunk
                .iter()
                .enumerate()
                .map(|(i, _)| {
                    if self.fail_every_other && i % 2 == 1 {
                        PushTicket::Error {
                            message: "device not registered".into(),
                            details: Some(TicketDetails {
                                error: Some("DeviceNotRegistered".into()),
                            }),
                        }
                    } else {
                        PushTicket::Ok { id: Some(format!("t{i}")) }
                    }
                })
                .collect())
        }
    }

    fn messages(n: usize) -> Vec<PushMessage> {
        (0..n)
            .map(|i| PushMessage::new(format!("ExponentPushToken[{i}]"), "hi", Value::Null))
            .collect()
    }

    #[tokio::test]
    async fn splits_into_provider_sized_chunks() {
        let provider = Arc::new(ScriptedProvider {
            chunk_size: 100,
            batches: Mutex::new(Vec::new()),
            fail_every_other: false,
        });
        let gateway = NotificationGateway::new(provider.clone());

        let report = gateway.deliver(messages(250)).await;

        assert_eq!(*provider.batches.lock().unwrap(), vec![100, 100, 50]);
        assert_eq!(report, DeliveryReport { accepted: 250, failed: 0 });
    }

    #[tokio::test]
    async fn error_tickets_are_counted_not_raised() {
        let provider = Arc::new(ScriptedProvider {
            chunk_size: 10,
            batches: Mutex::new(Vec::new()),
            fail_every_other: true,
        });
        let gateway = NotificationGateway::new(provider);

        let report = gateway.deliver(messages(4)).await;

        assert_eq!(report, DeliveryReport { accepted: 2, failed: 2 });
    }

    #[tokio::test]
    async fn empty_batch_never_reaches_the_provider() {
        let provider = Arc::new(ScriptedProvider {
            chunk_size: 10,
            batches: Mutex::new(Vec::new()),
            fail_every_other: false,
        });
        let gateway = NotificationGateway::new(provider.clone());

        let report = gateway.deliver(Vec::new()).await;

        assert!(provider.batches.lock().unwrap().is_empty());
        assert_eq!(report, DeliveryReport::default());
    }

    #[test]
    fn message_serializes_to_expo_shape() {
        let message = PushMessage::new("ExponentPushToken[a]", "help", serde_json::json!({"k": 1}));
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({
                "to": "ExponentPushToken[a]",
                "sound": "default",
                "body": "help",
                "data": {"k": 1}
            })
        );
    }

    #[test]
    fn decodes_expo_tickets() {
        let raw = r#"[{"status":"ok","id":"abc"},{"status":"error","message":"bad","details":{"error":"DeviceNotRegistered"}}]"#;
        let tickets: Vec<PushTicket> = serde_json::from_str(raw).unwrap();
        assert_eq!(tickets[0], PushTicket::Ok { id: Some("abc".into()) });
        assert!(matches!(&tickets[1], PushTicket::Error { message, .. } if message == "bad"));
    }
}
