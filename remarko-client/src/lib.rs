mod error;
pub use error::Error;

mod persisted;
pub use persisted::Persisted;

mod storage;
pub use storage::{FileStorage, MemoryStorage, Storage};

#[cfg(target_arch = "wasm32")]
mod browser;
#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStorage;

mod store;
pub use store::{
    Change, CommentStore, Snapshot, SubscriptionId, KEY_COMMENTS, KEY_CURRENT_USER, KEY_USERS,
};

mod fuzz;

pub mod api {
    pub use remarko_api::*;
}
