use std::{fmt, str::FromStr};

use chrono::Utc;
use uuid::Uuid;

use crate::{Error, Time, User};

#[derive(
    Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn random() -> CommentId {
        CommentId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> CommentId {
        CommentId(String::from(s))
    }
}

impl From<String> for CommentId {
    fn from(s: String) -> CommentId {
        CommentId(s)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub created_at: Time,
    pub score: i64,
    pub user: User,

    /// Replies in insertion order, oldest first. Replies never nest further.
    #[serde(default)]
    pub replies: im::Vector<Reply>,
}

impl Comment {
    pub fn now(user: User, content: String) -> Comment {
        Comment {
            id: CommentId::random(),
            content,
            created_at: Utc::now(),
            score: 0,
            user,
            replies: im::Vector::new(),
        }
    }

    pub fn reply(&self, id: &CommentId) -> Option<&Reply> {
        self.replies.iter().find(|r| r.id == *id)
    }

    pub fn reply_index(&self, id: &CommentId) -> Option<usize> {
        self.replies.iter().position(|r| r.id == *id)
    }

    /// Whether `id` names this comment or one of its replies
    pub fn contains_id(&self, id: &CommentId) -> bool {
        self.id == *id || self.replies.iter().any(|r| r.id == *id)
    }

    /// Returns the author of this comment or of one of its replies named `username`
    pub fn participant(&self, username: &str) -> Option<&User> {
        std::iter::once(&self.user)
            .chain(self.replies.iter().map(|r| &r.user))
            .find(|u| u.username == username)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: CommentId,
    pub content: String,
    pub created_at: Time,
    pub score: i64,

    /// `@username` of the thread participant this reply answers
    pub replying_to: String,
    pub user: User,
}

impl Reply {
    pub fn now(user: User, content: String, replying_to: &User) -> Reply {
        Reply {
            id: CommentId::random(),
            content,
            created_at: Utc::now(),
            score: 0,
            replying_to: replying_to.mention(),
            user,
        }
    }

    /// Splits a leading `@username` matching `replying_to` off the content
    pub fn split_mention(&self) -> (Option<&str>, &str) {
        let mention = self.replying_to.as_str();
        match self.content.strip_prefix(mention) {
            Some("") => (Some(mention), ""),
            Some(rest) if rest.starts_with(' ') => (Some(mention), &rest[1..]),
            _ => (None, self.content.as_str()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Upvote,
    Downvote,
}

impl Vote {
    pub fn delta(self) -> i64 {
        match self {
            Vote::Upvote => 1,
            Vote::Downvote => -1,
        }
    }

    /// `None` when the score would leave the `i64` range
    pub fn apply(self, score: i64) -> Option<i64> {
        score.checked_add(self.delta())
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Upvote => f.write_str("upvote"),
            Vote::Downvote => f.write_str("downvote"),
        }
    }
}

impl FromStr for Vote {
    type Err = Error;

    fn from_str(s: &str) -> Result<Vote, Error> {
        match s {
            "upvote" => Ok(Vote::Upvote),
            "downvote" => Ok(Vote::Downvote),
            _ => Err(Error::InvalidVote(String::from(s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User::new(String::from(name), format!("images/avatars/{name}.png"))
    }

    fn reply_with(content: &str) -> Reply {
        Reply::now(user("bob"), String::from(content), &user("ana"))
    }

    #[test]
    fn mention_is_split_off_replies() {
        assert_eq!(reply_with("@ana hey").split_mention(), (Some("@ana"), "hey"));
        assert_eq!(reply_with("@ana").split_mention(), (Some("@ana"), ""));
        assert_eq!(reply_with("@anastasia hey").split_mention(), (None, "@anastasia hey"));
        assert_eq!(reply_with("hey @ana").split_mention(), (None, "hey @ana"));
    }

    #[test]
    fn participants_are_root_and_reply_authors() {
        let mut c = Comment::now(user("ana"), String::from("hi"));
        c.replies.push_back(reply_with("@ana hey"));
        assert_eq!(c.participant("ana"), Some(&user("ana")));
        assert_eq!(c.participant("bob"), Some(&user("bob")));
        assert_eq!(c.participant("carol"), None);
        assert!(c.contains_id(&c.id));
        assert!(c.contains_id(&c.replies[0].id));
        assert!(!c.contains_id(&CommentId::from("nope")));
    }

    #[test]
    fn votes_parse_like_the_view_strings() {
        assert_eq!("upvote".parse::<Vote>(), Ok(Vote::Upvote));
        assert_eq!("downvote".parse::<Vote>(), Ok(Vote::Downvote));
        assert_eq!(
            "sideways".parse::<Vote>(),
            Err(Error::InvalidVote(String::from("sideways")))
        );
        assert_eq!(Vote::Downvote.apply(0), Some(-1));
        assert_eq!(Vote::Upvote.apply(i64::MAX), None);
        assert_eq!(Vote::Downvote.apply(i64::MIN), None);
    }

    #[test]
    fn json_layout_uses_camel_case() {
        let mut c = Comment::now(user("ana"), String::from("hi"));
        c.replies.push_back(reply_with("@ana hey"));
        let json = serde_json::to_value(&c).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["replies"][0]["replyingTo"], "@ana");
        assert_eq!(json["replies"][0]["user"]["username"], "bob");

        let back: Comment = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn missing_replies_default_to_empty() {
        let c: Comment = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "content": "hi",
            "createdAt": "2023-01-01T00:00:00Z",
            "score": 3,
            "user": { "username": "ana", "image": { "png": "a.png" } },
        }))
        .unwrap();
        assert!(c.replies.is_empty());
        assert_eq!(c.id, CommentId::from("c1"));
    }
}
