//! MongoDB-backed repositories

mod chat;
mod connect;
mod moderation;
mod notifications;
mod posts;
mod profiles;
mod users;

pub use chat::MongoChatRepository;
pub use connect::MongoConnectRepository;
pub use moderation::MongoModerationRepository;
pub use notifications::MongoNotificationRepository;
pub use posts::MongoPostRepository;
pub use profiles::MongoProfileRepository;
pub use users::MongoUserRepository;

use futures::TryStreamExt;
use mongodb::Cursor;
use serde::de::DeserializeOwned;

use crate::error::Result;

async fn collect<T>(cursor: Cursor<T>) -> Result<Vec<T>>
where
    T: DeserializeOwned + Unpin + Send + Sync,
{
    Ok(cursor.try_collect().await?)
}
