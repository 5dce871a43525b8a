use chrono::Utc;

pub use uuid::{uuid, Uuid};
pub type Time = chrono::DateTime<Utc>;

mod comment;
pub use comment::{Comment, CommentId, Reply, Vote};

mod error;
pub use error::Error;

mod user;
pub use user::{User, UserImage};
