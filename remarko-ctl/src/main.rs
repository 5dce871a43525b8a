use std::path::PathBuf;

use anyhow::Context;
use remarko_client::{
    api::{CommentId, User, Vote},
    CommentStore, Error, FileStorage,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// JSON file holding the store
    #[structopt(long, env = "REMARKO_DB", default_value = "remarko.json")]
    db: PathBuf,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Register a user and sign in as them
    Signup {
        /// Username
        name: String,

        /// Avatar image path or URL
        avatar: String,
    },

    /// Sign in as an already registered user
    Login { name: String },

    Signout,

    /// Show the signed-in user
    Whoami,

    /// List registered users
    Users,

    /// Print all threads
    List,

    /// Post a root comment
    Comment { text: String },

    /// Reply to someone who wrote in thread `root`
    Reply {
        root: String,
        to: String,
        text: String,
    },

    Edit {
        root: String,

        #[structopt(long)]
        reply: Option<String>,

        text: String,
    },

    Delete {
        root: String,

        #[structopt(long)]
        reply: Option<String>,
    },

    Upvote {
        root: String,

        #[structopt(long)]
        reply: Option<String>,
    },

    Downvote {
        root: String,

        #[structopt(long)]
        reply: Option<String>,
    },
}

fn print_threads(store: &CommentStore<FileStorage>) {
    for c in store.comments().iter() {
        println!(
            "[{}] {} ({}) {:+}",
            c.id,
            c.user.username,
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.score
        );
        println!("    {}", c.content);
        for r in c.replies.iter() {
            let (mention, body) = r.split_mention();
            println!(
                "  [{}] {} -> {} ({}) {:+}",
                r.id,
                r.user.username,
                mention.unwrap_or(r.replying_to.as_str()),
                r.created_at.format("%Y-%m-%d %H:%M"),
                r.score
            );
            println!("      {}", body);
        }
    }
}

fn run(store: &mut CommentStore<FileStorage>, cmd: Command) -> Result<(), Error> {
    let reply_id = |reply: Option<String>| reply.map(CommentId::from);
    match cmd {
        Command::Signup { name, avatar } => store.signup(User::new(name, avatar))?,
        Command::Login { name } => store.login_user(&name)?,
        Command::Signout => store.signout()?,
        Command::Whoami => match store.current_user() {
            Some(u) => println!("{}", u.username),
            None => println!("signed out"),
        },
        Command::Users => {
            for u in store.users().iter() {
                println!("{}\t{}", u.username, u.avatar().unwrap_or(""));
            }
        }
        Command::List => print_threads(store),
        Command::Comment { text } => println!("{}", store.post_comment(text)?),
        Command::Reply { root, to, text } => {
            println!("{}", store.post_reply(&CommentId::from(root), &to, text)?)
        }
        Command::Edit { root, reply, text } => {
            store.edit_comment(&CommentId::from(root), text, reply_id(reply).as_ref())?
        }
        Command::Delete { root, reply } => {
            store.delete_comment(&CommentId::from(root), reply_id(reply).as_ref())?
        }
        Command::Upvote { root, reply } => {
            store.vote(&CommentId::from(root), Vote::Upvote, reply_id(reply).as_ref())?
        }
        Command::Downvote { root, reply } => {
            store.vote(&CommentId::from(root), Vote::Downvote, reply_id(reply).as_ref())?
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    let opt = <Opt as structopt::StructOpt>::from_args();

    let storage = FileStorage::open(&opt.db)
        .with_context(|| format!("opening store file {:?}", opt.db))?;
    let mut store = CommentStore::open(storage).context("loading store")?;

    match run(&mut store, opt.cmd) {
        Err(e) if e.is_lookup_miss() => {
            tracing::warn!(error = %e, "nothing to do");
            Ok(())
        }
        res => res.context("running command"),
    }
}
