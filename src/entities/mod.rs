pub mod circle;
pub mod circle_member;
pub mod contact;
pub mod scheduled_sos;
pub mod sos;
pub mod sos_circle;
pub mod sos_recipient;
pub mod user;
pub mod user_card;

pub use circle::Entity as Circle;
pub use circle_member::Entity as CircleMember;
pub use contact::Entity as Contact;
pub use scheduled_sos::Entity as ScheduledSos;
pub use sos::Entity as Sos;
pub use sos_circle::Entity as SosCircle;
pub use sos_recipient::Entity as SosRecipient;
pub use user::Entity as User;
pub use user_card::Entity as UserCard;

