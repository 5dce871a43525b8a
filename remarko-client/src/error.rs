use crate::api::{CommentId, Error as ApiError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] anyhow::Error),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl Error {
    pub fn comment_not_found(id: &CommentId) -> Error {
        Error::Api(ApiError::CommentNotFound(id.clone()))
    }

    pub fn reply_not_found(root: &CommentId, reply: &CommentId) -> Error {
        Error::Api(ApiError::ReplyNotFound {
            root: root.clone(),
            reply: reply.clone(),
        })
    }

    pub fn id_already_used(id: &CommentId) -> Error {
        Error::Api(ApiError::IdAlreadyUsed(id.clone()))
    }

    pub fn not_signed_in() -> Error {
        Error::Api(ApiError::NotSignedIn)
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            Error::Storage(_) => None,
        }
    }

    pub fn is_lookup_miss(&self) -> bool {
        self.api().map_or(false, ApiError::is_lookup_miss)
    }
}
