//! Business logic services.

pub mod directory;
pub mod notification;
pub mod recipient;
pub mod user;

pub use directory::{DbUserDirectory, IdentityStore, UserDirectory};
pub use notification::{
    CreateNotificationInput, FeedItem, NotificationFeed, NotificationService,
};
pub use recipient::RecipientResolver;
pub use user::UserService;
