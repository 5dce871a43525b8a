use std::fmt;

use serde_json::Value;

use crate::{
    api::{Comment, CommentId, Error as ApiError, Reply, User, Vote},
    Error, Persisted, Storage,
};

pub const KEY_USERS: &str = "USERS";
pub const KEY_COMMENTS: &str = "COMMENTS";
pub const KEY_CURRENT_USER: &str = "CURRENT USER";

/// Which slice of the store a committed mutation replaced
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Change {
    Users,
    Session,
    Comments,
}

/// Cheap copy of the whole store state, handed to observers
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Snapshot {
    pub users: im::Vector<User>,
    pub current_user: Option<User>,
    pub comments: im::Vector<Comment>,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(Change, &Snapshot)>;

/// Owner of the users, the session and the comment tree
///
/// Every mutation replaces the slice it touches, writes it to `S` and then
/// notifies observers. Operations that fail leave state, storage and
/// observers untouched, except for a failed write, which happens after the
/// in-memory update.
pub struct CommentStore<S> {
    storage: S,
    users: Persisted<im::Vector<User>>,
    current_user: Persisted<Option<User>>,
    comments: Persisted<im::Vector<Comment>>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<S: fmt::Debug> fmt::Debug for CommentStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommentStore")
            .field("storage", &self.storage)
            .field("users", self.users.get())
            .field("current_user", self.current_user.get())
            .field("comments", self.comments.get())
            .field("observers", &self.observers.len())
            .finish()
    }
}

fn reply_mut<'a>(root: &'a mut Comment, reply_id: &CommentId) -> Result<&'a mut Reply, Error> {
    let root_id = root.id.clone();
    match root.reply_index(reply_id) {
        Some(i) => root
            .replies
            .get_mut(i)
            .ok_or_else(|| Error::reply_not_found(&root_id, reply_id)),
        None => {
            tracing::warn!(root = %root_id, reply = %reply_id, "reply not found");
            Err(Error::reply_not_found(&root_id, reply_id))
        }
    }
}

impl<S: Storage> CommentStore<S> {
    pub fn open(mut storage: S) -> Result<CommentStore<S>, Error> {
        // a session stored as `{}` means nobody is signed in
        if storage.load(KEY_CURRENT_USER)? == Some(Value::Object(Default::default())) {
            tracing::warn!("replacing empty stored session with null");
            storage.store(KEY_CURRENT_USER, &Value::Null)?;
        }
        let users = Persisted::load(&mut storage, KEY_USERS, im::Vector::new)?;
        let current_user = Persisted::load(&mut storage, KEY_CURRENT_USER, || None)?;
        let comments = Persisted::load(&mut storage, KEY_COMMENTS, im::Vector::new)?;
        tracing::debug!(
            num_users = users.get().len(),
            num_comments = comments.get().len(),
            "opened comment store"
        );
        Ok(CommentStore {
            storage,
            users,
            current_user,
            comments,
            observers: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn users(&self) -> &im::Vector<User> {
        self.users.get()
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.get().as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_user.get().is_some()
    }

    /// Root comments, oldest first
    pub fn comments(&self) -> &im::Vector<Comment> {
        self.comments.get()
    }

    pub fn comment(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.get().iter().find(|c| c.id == *id)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            users: self.users.get().clone(),
            current_user: self.current_user.get().clone(),
            comments: self.comments.get().clone(),
        }
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(Change, &Snapshot) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let len = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != len
    }

    fn notify(&mut self, change: Change) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, observer) in self.observers.iter_mut() {
            observer(change, &snapshot);
        }
    }

    /// Adds `user` and signs them in, without any validation
    pub fn submit_user(&mut self, user: User) -> Result<(), Error> {
        tracing::info!(username = %user.username, "adding user");
        let new_user = user.clone();
        self.users.update(&mut self.storage, |users| {
            let mut users = users.clone();
            users.push_back(new_user);
            users
        })?;
        self.notify(Change::Users);
        self.current_user.set(&mut self.storage, Some(user))?;
        self.notify(Change::Session);
        Ok(())
    }

    /// Validated `submit_user`: non-empty unique username and an avatar
    pub fn signup(&mut self, user: User) -> Result<(), Error> {
        if let Err(e) = user.validate(self.users.get()) {
            tracing::info!(username = %user.username, "rejected signup: {e}");
            return Err(e.into());
        }
        self.submit_user(user)
    }

    /// Signs in the user named exactly `username`, leaving the session alone if there is none
    pub fn login_user(&mut self, username: &str) -> Result<(), Error> {
        let user = match self.users.get().iter().find(|u| u.username == username) {
            Some(u) => u.clone(),
            None => {
                tracing::warn!(username, "login attempt for unknown user");
                return Err(ApiError::UnknownUser(String::from(username)).into());
            }
        };
        tracing::info!(username, "signing in");
        self.current_user.set(&mut self.storage, Some(user))?;
        self.notify(Change::Session);
        Ok(())
    }

    pub fn signout(&mut self) -> Result<(), Error> {
        tracing::info!("signing out");
        self.current_user.set(&mut self.storage, None)?;
        self.notify(Change::Session);
        Ok(())
    }

    fn contains_id(&self, id: &CommentId) -> bool {
        self.comments.get().iter().any(|c| c.contains_id(id))
    }

    fn root_index(&self, id: &CommentId) -> Result<usize, Error> {
        match self.comments.get().iter().position(|c| c.id == *id) {
            Some(i) => Ok(i),
            None => {
                tracing::warn!(%id, "comment not found");
                Err(Error::comment_not_found(id))
            }
        }
    }

    /// Replaces the root `root_id` with the result of `f`, leaving its siblings shared
    fn modify_root<F>(&mut self, root_id: &CommentId, f: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Comment) -> Result<(), Error>,
    {
        let idx = self.root_index(root_id)?;
        let mut comments = self.comments.get().clone();
        match comments.get_mut(idx) {
            Some(root) => f(root)?,
            None => return Err(Error::comment_not_found(root_id)),
        }
        self.comments.set(&mut self.storage, comments)?;
        self.notify(Change::Comments);
        Ok(())
    }

    /// Appends a root comment after all existing ones
    ///
    /// Replies must go through `add_reply`, so `comment.replies` has to be empty.
    pub fn add_comment(&mut self, comment: Comment) -> Result<(), Error> {
        if !comment.replies.is_empty() {
            return Err(ApiError::RepliesOnNewComment(comment.id).into());
        }
        if self.contains_id(&comment.id) {
            return Err(Error::id_already_used(&comment.id));
        }
        tracing::debug!(id = %comment.id, "adding comment");
        self.comments.update(&mut self.storage, |comments| {
            let mut comments = comments.clone();
            comments.push_back(comment);
            comments
        })?;
        self.notify(Change::Comments);
        Ok(())
    }

    /// Appends `reply` to the replies of root comment `root_id`
    pub fn add_reply(&mut self, root_id: &CommentId, reply: Reply) -> Result<(), Error> {
        let idx = self.root_index(root_id)?;
        if self.contains_id(&reply.id) {
            return Err(Error::id_already_used(&reply.id));
        }
        let target = reply.replying_to.strip_prefix('@');
        if target
            .and_then(|name| self.comments.get()[idx].participant(name))
            .is_none()
        {
            tracing::warn!(root = %root_id, replying_to = %reply.replying_to, "reply target not in thread");
            let name = target.unwrap_or(reply.replying_to.as_str());
            return Err(ApiError::UnknownReplyTarget(String::from(name), root_id.clone()).into());
        }
        tracing::debug!(root = %root_id, id = %reply.id, "adding reply");
        self.modify_root(root_id, |root| {
            root.replies.push_back(reply);
            Ok(())
        })
    }

    /// Replaces the content of root `root_id`, or of its reply `reply_id`
    pub fn edit_comment(
        &mut self,
        root_id: &CommentId,
        content: String,
        reply_id: Option<&CommentId>,
    ) -> Result<(), Error> {
        tracing::debug!(root = %root_id, reply = ?reply_id, "editing comment");
        self.modify_root(root_id, |root| {
            match reply_id {
                None => root.content = content,
                Some(reply_id) => reply_mut(root, reply_id)?.content = content,
            }
            Ok(())
        })
    }

    /// Removes root `root_id` with all its replies, or only its reply `reply_id`
    pub fn delete_comment(
        &mut self,
        root_id: &CommentId,
        reply_id: Option<&CommentId>,
    ) -> Result<(), Error> {
        tracing::debug!(root = %root_id, reply = ?reply_id, "deleting comment");
        match reply_id {
            None => {
                let idx = self.root_index(root_id)?;
                self.comments.update(&mut self.storage, |comments| {
                    let mut comments = comments.clone();
                    comments.remove(idx);
                    comments
                })?;
                self.notify(Change::Comments);
                Ok(())
            }
            Some(reply_id) => self.modify_root(root_id, |root| {
                match root.reply_index(reply_id) {
                    Some(i) => {
                        root.replies.remove(i);
                        Ok(())
                    }
                    None => {
                        tracing::warn!(root = %root_id, reply = %reply_id, "reply not found");
                        Err(Error::reply_not_found(root_id, reply_id))
                    }
                }
            }),
        }
    }

    /// Moves the score of exactly one comment or reply by one
    pub fn handle_comment_score(
        &mut self,
        root_id: &CommentId,
        vote: Vote,
        reply_id: Option<&CommentId>,
    ) -> Result<(), Error> {
        tracing::debug!(root = %root_id, reply = ?reply_id, %vote, "scoring comment");
        self.modify_root(root_id, |root| {
            let (id, score) = match reply_id {
                None => (root.id.clone(), &mut root.score),
                Some(reply_id) => {
                    let reply = reply_mut(root, reply_id)?;
                    (reply.id.clone(), &mut reply.score)
                }
            };
            *score = vote.apply(*score).ok_or(ApiError::ScoreOverflow(id))?;
            Ok(())
        })
    }

    fn signed_in_user(&self) -> Result<User, Error> {
        self.current_user().cloned().ok_or_else(Error::not_signed_in)
    }

    /// Posts a new root comment as the current user
    pub fn post_comment(&mut self, content: String) -> Result<CommentId, Error> {
        let comment = Comment::now(self.signed_in_user()?, content);
        let id = comment.id.clone();
        self.add_comment(comment)?;
        Ok(id)
    }

    /// Posts a reply as the current user to `to`, who must have written in the thread
    ///
    /// The `@to` mention is prepended to `content` unless it already starts with it.
    pub fn post_reply(
        &mut self,
        root_id: &CommentId,
        to: &str,
        content: String,
    ) -> Result<CommentId, Error> {
        let user = self.signed_in_user()?;
        let root = self
            .comment(root_id)
            .ok_or_else(|| Error::comment_not_found(root_id))?;
        let target = root
            .participant(to)
            .cloned()
            .ok_or_else(|| ApiError::UnknownReplyTarget(String::from(to), root_id.clone()))?;
        let mut reply = Reply::now(user, content, &target);
        if reply.split_mention().0.is_none() {
            reply.content = format!("{} {}", reply.replying_to, reply.content);
        }
        let id = reply.id.clone();
        self.add_reply(root_id, reply)?;
        Ok(id)
    }

    /// `handle_comment_score` for the current user, who may not vote on their own writing
    pub fn vote(
        &mut self,
        root_id: &CommentId,
        vote: Vote,
        reply_id: Option<&CommentId>,
    ) -> Result<(), Error> {
        let voter = self.signed_in_user()?;
        let root = self
            .comment(root_id)
            .ok_or_else(|| Error::comment_not_found(root_id))?;
        let author = match reply_id {
            None => &root.user,
            Some(reply_id) => {
                &root
                    .reply(reply_id)
                    .ok_or_else(|| Error::reply_not_found(root_id, reply_id))?
                    .user
            }
        };
        if author.username == voter.username {
            return Err(ApiError::SelfVote.into());
        }
        self.handle_comment_score(root_id, vote, reply_id)
    }
}
