use anyhow::Context;
use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng};
use remarko_client::{
    api::{Comment, Reply, User},
    CommentStore, FileStorage,
};

const NUM_USERS: usize = 6;

const NUM_COMMENTS: usize = 40;
const MAX_REPLIES: usize = 5;
const COMMENT_WORD_COUNT: usize = 30;

const MAX_SCORE: i64 = 20;
const MAX_AGE_DAYS: i64 = 400;

fn gen_username(i: usize) -> String {
    let word: String = lipsum::lipsum_words(1)
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    format!("{word}{i}")
}

fn gen_comment_text(rng: &mut impl Rng) -> String {
    lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORD_COUNT))
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("remarko.json"));
    let storage = FileStorage::open(&path).with_context(|| format!("opening {path:?}"))?;
    let mut store = CommentStore::open(storage).context("loading store")?;
    let mut rng = rand::thread_rng();

    // Generate users
    let mut users = Vec::new();
    for i in 0..NUM_USERS {
        let name = gen_username(i);
        let user = User::new(name.clone(), format!("./images/avatars/image-{name}.png"));
        store
            .signup(user.clone())
            .with_context(|| format!("signing up {name:?}"))?;
        users.push(user);
    }

    // Generate threads, oldest first
    let mut ages = (0..NUM_COMMENTS)
        .map(|_| rng.gen_range(0..MAX_AGE_DAYS))
        .collect::<Vec<_>>();
    ages.sort_unstable_by(|a, b| b.cmp(a));
    for age in ages {
        let author = users.choose(&mut rng).context("no users generated")?;
        let mut comment = Comment::now(author.clone(), gen_comment_text(&mut rng));
        let created_at = Utc::now() - Duration::days(age);
        comment.created_at = created_at;
        comment.score = rng.gen_range(0..=MAX_SCORE);
        let root = comment.id.clone();
        store.add_comment(comment)?;

        // Replies only ever go to someone already in the thread
        let mut participants = vec![author.clone()];
        for _ in 0..rng.gen_range(0..=MAX_REPLIES) {
            let to = participants
                .choose(&mut rng)
                .context("thread has no author")?
                .clone();
            let from = users.choose(&mut rng).context("no users generated")?;
            let mut reply = Reply::now(
                from.clone(),
                format!("{} {}", to.mention(), gen_comment_text(&mut rng)),
                &to,
            );
            reply.created_at = created_at + Duration::minutes(rng.gen_range(0..=age * 24 * 60));
            reply.score = rng.gen_range(0..=MAX_SCORE);
            store.add_reply(&root, reply)?;
            if !participants.iter().any(|p| p.same_name(&from.username)) {
                participants.push(from.clone());
            }
        }
    }

    store.signout()?;
    println!(
        "wrote {} users and {} threads to {path}",
        store.users().len(),
        store.comments().len()
    );
    Ok(())
}
