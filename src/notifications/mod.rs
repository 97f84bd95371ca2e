pub mod expo;
pub mod gateway;
pub mod templates;

pub use expo::ExpoPushClient;
pub use gateway::{
    DeliveryReport, NotificationGateway, PushError, PushMessage, PushProvider, PushTicket,
};
pub use templates::NotificationTemplates;
