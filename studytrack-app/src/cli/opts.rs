use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, ValueEnum)]
pub enum StoreKind {
    Json,
    Sqlite,
}

#[derive(Debug, Parser, Clone)]
#[command(name = "studytrack", version, about = "StudyTrack spaced-repetition CLI/API")]
pub struct Cli {
    /// Storage backend
    #[arg(long, value_enum, default_value_t = StoreKind::Json)]
    pub store: StoreKind,

    /// SQLite DB path when --store sqlite (defaults to app data dir)
    #[arg(long)]
    pub db_path: Option<PathBuf>,

    /// TOML config with [scheduler], [mastery], [service] and [store] tables
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tracing filter, e.g. "info" or "studytrack_core=debug" (RUST_LOG wins when set)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// User operations
    #[command(subcommand)]
    User(UserCmd),
    /// Card operations
    #[command(subcommand)]
    Card(CardCmd),
    /// Record one answer to a card
    Attempt(AttemptCmd),
    /// Record a finished study session for a user
    Session(SessionCmd),
    /// Count a document upload for a user
    Upload { user: String },
    /// List cards due for review
    Due(DueCmd),
    /// Launch Axum HTTP API
    Api(ApiCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum UserCmd {
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    Show { user: String },
    Report { user: String },
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    Add(CardAdd),
    List {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        document: Option<String>,
        #[arg(long)]
        mastery: Option<String>,
        /// Exact tag, case-insensitive
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        query: Option<String>,
    },
    Show { card_id: String },
    Attempts { card_id: String },
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long)]
    pub user: String,
    #[arg(long)]
    pub document: String,
    #[arg(long, default_value = "question")]
    pub kind: String,
    #[arg(long)]
    pub front: String,
    #[arg(long)]
    pub back: String,
    #[arg(long)]
    pub difficulty: Option<String>,
    #[arg(long)]
    pub subject: Option<String>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Debug, Args, Clone)]
#[command(group(ArgGroup::new("outcome").required(true).args(["correct", "incorrect"])))]
pub struct AttemptCmd {
    pub card_id: String,
    #[arg(long)]
    pub correct: bool,
    #[arg(long)]
    pub incorrect: bool,
    #[arg(long, default_value_t = 0)]
    pub response_ms: u64,
}

#[derive(Debug, Args, Clone)]
pub struct SessionCmd {
    pub user: String,
    #[arg(long, allow_negative_numbers = true)]
    pub cards: i64,
    #[arg(long, allow_negative_numbers = true)]
    pub correct: i64,
    #[arg(long, allow_negative_numbers = true)]
    pub minutes: i64,
}

#[derive(Debug, Args, Clone)]
pub struct DueCmd {
    pub user: String,
    #[arg(long, default_value_t = 50)]
    pub max: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ApiCmd {
    /// Bind address (host:port)
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: String,
}
