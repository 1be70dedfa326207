//! Database entities.

pub mod delivery;
pub mod notification;
pub mod user;

pub use delivery::Entity as Delivery;
pub use notification::Entity as Notification;
pub use user::Entity as User;
