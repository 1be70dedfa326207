//! Database repositories.

mod delivery;
mod notification;
mod user;

pub use delivery::{DeliveryRepository, FeedPage};
pub use notification::NotificationRepository;
pub use user::UserRepository;
