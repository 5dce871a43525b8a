use crate::CommentId;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Comment not found {0}")]
    CommentNotFound(CommentId),

    #[error("Reply {reply} not found under comment {root}")]
    ReplyNotFound { root: CommentId, reply: CommentId },

    #[error("Comment id already used {0}")]
    IdAlreadyUsed(CommentId),

    #[error("Unknown user {0:?}")]
    UnknownUser(String),

    #[error("Name already used {0}")]
    NameAlreadyUsed(String),

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("An avatar image is required")]
    MissingAvatar,

    #[error("Not signed in")]
    NotSignedIn,

    #[error("Users cannot vote on their own comments")]
    SelfVote,

    #[error("{0:?} did not take part in thread {1}")]
    UnknownReplyTarget(String, CommentId),

    #[error("Unknown vote {0:?}")]
    InvalidVote(String),

    #[error("New comment {0} must not come with replies")]
    RepliesOnNewComment(CommentId),

    #[error("Score of {0} is out of range")]
    ScoreOverflow(CommentId),
}

impl Error {
    /// Lookup misses leave the store untouched and are safe to ignore
    pub fn is_lookup_miss(&self) -> bool {
        matches!(
            self,
            Error::CommentNotFound(_) | Error::ReplyNotFound { .. }
        )
    }
}
