#![cfg(test)]

use std::collections::HashSet;

use bolero::generator::TypeGenerator;

use crate::{
    api::{Comment, CommentId, Reply, Time, User, Vote},
    CommentStore, MemoryStorage, KEY_COMMENTS,
};

#[derive(Clone, Debug, TypeGenerator)]
enum Op {
    AddComment,
    AddReply { root: u8 },
    Edit { root: u8, reply: Option<u8>, text: u8 },
    Delete { root: u8, reply: Option<u8> },
    Score { root: u8, reply: Option<u8>, upvote: bool },
}

#[derive(Clone, Debug, PartialEq)]
struct Node {
    id: String,
    content: String,
    score: i64,
}

/// What the comment tree should look like, maintained with plain vectors
#[derive(Clone, Debug, Default, PartialEq)]
struct Model(Vec<(Node, Vec<Node>)>);

impl Model {
    fn of(store: &CommentStore<MemoryStorage>) -> Model {
        let node = |id: &CommentId, content: &str, score: i64| Node {
            id: id.0.clone(),
            content: String::from(content),
            score,
        };
        Model(
            store
                .comments()
                .iter()
                .map(|c| {
                    (
                        node(&c.id, &c.content, c.score),
                        c.replies
                            .iter()
                            .map(|r| node(&r.id, &r.content, r.score))
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Picks an existing root, or an unknown id one time in `len + 1`
    fn pick_root(&self, n: u8) -> String {
        match self.0.get(n as usize % (self.0.len() + 1)) {
            Some((root, _)) => root.id.clone(),
            None => String::from("missing"),
        }
    }

    fn pick_reply(&self, root: &str, n: Option<u8>) -> Option<String> {
        let n = n?;
        let replies = self
            .0
            .iter()
            .find(|(r, _)| r.id == root)
            .map(|(_, replies)| &replies[..])
            .unwrap_or(&[]);
        Some(match replies.get(n as usize % (replies.len() + 1)) {
            Some(reply) => reply.id.clone(),
            None => String::from("missing"),
        })
    }

    fn node(&mut self, root: &str, reply: Option<&str>) -> Option<&mut Node> {
        let (r, replies) = self.0.iter_mut().find(|(r, _)| r.id == root)?;
        match reply {
            None => Some(r),
            Some(id) => replies.iter_mut().find(|n| n.id == id),
        }
    }
}

struct Harness {
    store: CommentStore<MemoryStorage>,
    model: Model,
    next_id: usize,
    ana: User,
    bob: User,
}

impl Harness {
    fn new() -> Harness {
        Harness {
            store: CommentStore::open(MemoryStorage::new()).expect("opening empty store"),
            model: Model::default(),
            next_id: 0,
            ana: User::new(String::from("ana"), String::from("ana.png")),
            bob: User::new(String::from("bob"), String::from("bob.png")),
        }
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn raw_comments(&self) -> String {
        String::from(self.store.storage().raw(KEY_COMMENTS).unwrap_or(""))
    }

    fn date() -> Time {
        "2023-03-01T12:00:00Z".parse().unwrap()
    }

    /// Applies `op` to both store and model, returning whether it found its target
    fn apply(&mut self, op: Op) -> bool {
        match op {
            Op::AddComment => {
                let id = self.fresh_id("c");
                self.store
                    .add_comment(Comment {
                        id: CommentId::from(id.clone()),
                        content: String::from("root"),
                        created_at: Harness::date(),
                        score: 0,
                        user: self.ana.clone(),
                        replies: im::Vector::new(),
                    })
                    .expect("adding comment with fresh id");
                let root = Node {
                    id,
                    content: String::from("root"),
                    score: 0,
                };
                self.model.0.push((root, Vec::new()));
                true
            }
            Op::AddReply { root } => {
                let root = self.model.pick_root(root);
                let id = self.fresh_id("r");
                let res = self.store.add_reply(
                    &CommentId::from(root.clone()),
                    Reply {
                        id: CommentId::from(id.clone()),
                        content: String::from("@ana reply"),
                        created_at: Harness::date(),
                        score: 0,
                        replying_to: self.ana.mention(),
                        user: self.bob.clone(),
                    },
                );
                match self.model.0.iter_mut().find(|(r, _)| r.id == root) {
                    Some((_, replies)) => {
                        res.expect("adding reply to existing root");
                        replies.push(Node {
                            id,
                            content: String::from("@ana reply"),
                            score: 0,
                        });
                        true
                    }
                    None => {
                        assert!(res.expect_err("reply to missing root").is_lookup_miss());
                        false
                    }
                }
            }
            Op::Edit { root, reply, text } => {
                let root = self.model.pick_root(root);
                let reply = self.model.pick_reply(&root, reply);
                let content = format!("text {text}");
                let res = self.store.edit_comment(
                    &CommentId::from(root.clone()),
                    content.clone(),
                    reply.clone().map(CommentId::from).as_ref(),
                );
                match self.model.node(&root, reply.as_deref()) {
                    Some(n) => {
                        res.expect("editing existing comment");
                        n.content = content;
                        true
                    }
                    None => {
                        assert!(res.expect_err("editing missing comment").is_lookup_miss());
                        false
                    }
                }
            }
            Op::Delete { root, reply } => {
                let root = self.model.pick_root(root);
                let reply = self.model.pick_reply(&root, reply);
                let res = self.store.delete_comment(
                    &CommentId::from(root.clone()),
                    reply.clone().map(CommentId::from).as_ref(),
                );
                let found = self.model.node(&root, reply.as_deref()).is_some();
                if found {
                    res.expect("deleting existing comment");
                    let idx = self.model.0.iter().position(|(r, _)| r.id == root);
                    match (idx, reply) {
                        (Some(i), None) => {
                            self.model.0.remove(i);
                        }
                        (Some(i), Some(reply)) => self.model.0[i].1.retain(|n| n.id != reply),
                        (None, _) => unreachable!(),
                    }
                } else {
                    assert!(res.expect_err("deleting missing comment").is_lookup_miss());
                }
                found
            }
            Op::Score {
                root,
                reply,
                upvote,
            } => {
                let root = self.model.pick_root(root);
                let reply = self.model.pick_reply(&root, reply);
                let vote = match upvote {
                    true => Vote::Upvote,
                    false => Vote::Downvote,
                };
                let res = self.store.handle_comment_score(
                    &CommentId::from(root.clone()),
                    vote,
                    reply.clone().map(CommentId::from).as_ref(),
                );
                match self.model.node(&root, reply.as_deref()) {
                    Some(n) => {
                        res.expect("scoring existing comment");
                        n.score += vote.delta();
                        true
                    }
                    None => {
                        assert!(res.expect_err("scoring missing comment").is_lookup_miss());
                        false
                    }
                }
            }
        }
    }
}

#[test]
fn store_behaves_like_plain_vectors() {
    bolero::check!()
        .with_type::<Vec<Op>>()
        .cloned()
        .for_each(|ops| {
            let mut h = Harness::new();
            for op in ops {
                let raw_before = h.raw_comments();
                if !h.apply(op.clone()) {
                    assert_eq!(h.raw_comments(), raw_before, "{op:?} missed but wrote");
                }
                assert_eq!(Model::of(&h.store), h.model, "after {op:?}");
            }

            let mut ids = HashSet::new();
            for (root, replies) in h.model.0.iter() {
                assert!(ids.insert(root.id.clone()));
                for r in replies {
                    assert!(ids.insert(r.id.clone()));
                }
            }
        })
}

#[test]
fn upvote_then_downvote_restores_stored_bytes() {
    bolero::check!()
        .with_type::<(Vec<Op>, u8, Option<u8>)>()
        .cloned()
        .for_each(|(ops, root, reply)| {
            let mut h = Harness::new();
            for op in ops {
                h.apply(op);
            }
            let root = h.model.pick_root(root);
            let reply = h.model.pick_reply(&root, reply);
            let before = h.raw_comments();
            let up = h.apply_score(&root, reply.as_deref(), Vote::Upvote);
            let down = h.apply_score(&root, reply.as_deref(), Vote::Downvote);
            assert_eq!(up, down);
            assert_eq!(h.raw_comments(), before);
        })
}

impl Harness {
    fn apply_score(&mut self, root: &str, reply: Option<&str>, vote: Vote) -> bool {
        let reply = reply.map(CommentId::from);
        self.store
            .handle_comment_score(&CommentId::from(root), vote, reply.as_ref())
            .is_ok()
    }
}
