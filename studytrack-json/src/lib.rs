use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use studytrack_core::{
    apply_flashcards_created,
    repo::{CardQuery, Repository},
    Attempt, Card, CardId, CardProgress, CoreError, StudyStats, User, UserId,
};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tokio::task;
use tracing::{debug, warn};

pub mod paths;

const FILE_VERSION: u32 = 1;
pub const DEFAULT_MAX_BACKUPS: usize = 10;

#[derive(Clone, Serialize, Deserialize)]
struct FileImage {
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    users: Vec<User>,
    cards: Vec<Card>,
    attempts: Vec<Attempt>,
}

#[derive(Clone)]
struct State {
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    users: HashMap<UserId, User>,
    cards: HashMap<CardId, Card>,
    attempts: HashMap<CardId, Vec<Attempt>>,
}

impl State {
    fn new_empty() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            users: HashMap::new(),
            cards: HashMap::new(),
            attempts: HashMap::new(),
        }
    }

    fn to_image(&self) -> FileImage {
        let mut attempts: Vec<Attempt> = self.attempts.values().flatten().cloned().collect();
        attempts.sort_by_key(|a| a.attempted_at);
        FileImage {
            version: FILE_VERSION,
            created_at: self.created_at,
            updated_at: self.updated_at,
            users: self.users.values().cloned().collect(),
            cards: self.cards.values().cloned().collect(),
            attempts,
        }
    }

    fn from_image(img: FileImage) -> Self {
        let users = img.users.into_iter().map(|u| (u.id, u)).collect();
        let cards = img.cards.into_iter().map(|c| (c.id, c)).collect();
        let mut attempts: HashMap<CardId, Vec<Attempt>> = HashMap::new();
        for a in img.attempts {
            attempts.entry(a.card_id).or_default().push(a);
        }
        Self {
            created_at: img.created_at,
            updated_at: img.updated_at,
            users,
            cards,
            attempts,
        }
    }
}

/// Whole-store JSON file. Every mutation rewrites the file through a temp
/// file and keeps the newest `max_backups` copies next to it.
///
/// Mutations are serialized by `write_lock`: each one builds the next state,
/// writes it, and only then publishes it to readers. A failed write leaves
/// both the file and the in-memory state as they were.
pub struct JsonStore {
    path: PathBuf,
    backups_dir: PathBuf,
    max_backups: usize,
    state: RwLock<State>,
    write_lock: Mutex<()>,
}

impl JsonStore {
    pub async fn open_default(max_backups: usize) -> Result<Self, CoreError> {
        let (file, backups) = paths::default_store_file();
        Self::open_with(file, backups, max_backups).await
    }

    pub async fn open_with(path: PathBuf, backups_dir: PathBuf, max_backups: usize) -> Result<Self, CoreError> {
        ensure_parent_dirs(&path)?;
        ensure_dir(&backups_dir)?;
        let max_backups = max_backups.max(1);
        let state = load_or_init(&path, &backups_dir, max_backups).await?;
        debug!(path = %path.display(), users = state.users.len(), cards = state.cards.len(), "json store opened");
        Ok(Self {
            path,
            backups_dir,
            max_backups,
            state: RwLock::new(state),
            write_lock: Mutex::new(()),
        })
    }

    /// Applies `f` to a copy of the state, persists the copy, then swaps it in.
    async fn commit<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut State) -> Result<T, CoreError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut next = self.state.read().clone();
        let out = f(&mut next)?;
        next.updated_at = Utc::now();
        self.save(next.to_image()).await?;
        *self.state.write() = next;
        Ok(out)
    }

    async fn save(&self, snapshot: FileImage) -> Result<(), CoreError> {
        let path = self.path.clone();
        let backups = self.backups_dir.clone();
        let keep = self.max_backups;

        task::spawn_blocking(move || write_with_backup(&path, &backups, keep, &snapshot))
            .await
            .map_err(|_| CoreError::Storage("io"))?
            .map_err(|e| {
                warn!(error = %e, "json store write failed");
                CoreError::Storage("io")
            })?;
        Ok(())
    }
}

fn ensure_parent_dirs(path: &Path) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    Ok(())
}

fn ensure_dir(path: &Path) -> Result<(), CoreError> {
    fs::create_dir_all(path).map_err(|_| CoreError::Storage("io"))
}

async fn load_or_init(path: &Path, backups_dir: &Path, keep: usize) -> Result<State, CoreError> {
    if path.exists() {
        let p = path.to_path_buf();
        let img: FileImage = task::spawn_blocking(move || {
            let mut f = fs::File::open(&p)?;
            let mut buf = String::new();
            f.read_to_string(&mut buf)?;
            let v = serde_json::from_str::<FileImage>(&buf)?;
            Ok::<FileImage, std::io::Error>(v)
        })
        .await
        .map_err(|_| CoreError::Storage("io"))
        .and_then(|r| r.map_err(|_| CoreError::Storage("corrupt store file")))?;
        if img.version > FILE_VERSION {
            return Err(CoreError::Storage("store file is from a newer version"));
        }
        Ok(State::from_image(img))
    } else {
        let st = State::new_empty();
        let img = st.to_image();
        write_with_backup(path, backups_dir, keep, &img).map_err(|_| CoreError::Storage("io"))?;
        Ok(st)
    }
}

fn write_with_backup(path: &Path, backups_dir: &Path, max_backups: usize, img: &FileImage) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(backups_dir)?;

    let json = serde_json::to_vec_pretty(img)?;
    let mut tmp = NamedTempFile::new_in(path.parent().unwrap_or_else(|| Path::new(".")))?;
    tmp.write_all(&json)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;

    // Backup rotation
    let ts = Utc::now().format("%Y%m%d-%H%M%S%.3f");
    let backup_path = backups_dir.join(format!("studytrack-{ts}.json"));
    let mut btmp = NamedTempFile::new_in(backups_dir)?;
    btmp.write_all(&json)?;
    btmp.flush()?;
    btmp.persist(&backup_path).map_err(|e| e.error)?;

    rotate_backups(backups_dir, max_backups)
}

fn rotate_backups(dir: &Path, keep: usize) -> Result<(), std::io::Error> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    // names embed the timestamp, so lexical order is age order
    entries.sort();
    if entries.len() > keep {
        for p in &entries[0..entries.len() - keep] {
            if let Err(e) = fs::remove_file(p) {
                warn!(path = %p.display(), error = %e, "failed to prune backup");
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Repository for JsonStore {
    async fn create_user(&self, email: &str, name: &str) -> Result<User, CoreError> {
        let user = User::new(email, name)?;
        self.commit(|s| {
            if s.users.values().any(|u| u.email == user.email) {
                return Err(CoreError::Conflict("email already registered"));
            }
            s.users.insert(user.id, user.clone());
            Ok(user)
        })
        .await
    }

    async fn get_user(&self, id: UserId) -> Result<User, CoreError> {
        let s = self.state.read();
        s.users.get(&id).cloned().ok_or(CoreError::NotFound("user"))
    }

    async fn update_user_stats(
        &self,
        id: UserId,
        expected_version: u64,
        stats: &StudyStats,
    ) -> Result<User, CoreError> {
        self.commit(|s| {
            let Some(u) = s.users.get_mut(&id) else {
                return Err(CoreError::NotFound("user"));
            };
            if u.version != expected_version {
                return Err(CoreError::Conflict("user stats changed concurrently"));
            }
            u.stats = stats.clone();
            u.version += 1;
            u.updated_at = Utc::now();
            Ok(u.clone())
        })
        .await
    }

    async fn add_card(&self, card: &Card) -> Result<Card, CoreError> {
        self.commit(|s| {
            if s.cards.contains_key(&card.id) {
                return Err(CoreError::Conflict("card id already exists"));
            }
            let Some(owner) = s.users.get_mut(&card.user_id) else {
                return Err(CoreError::NotFound("user"));
            };
            owner.stats = apply_flashcards_created(owner.stats.clone(), 1);
            owner.version += 1;
            owner.updated_at = Utc::now();
            s.cards.insert(card.id, card.clone());
            Ok(card.clone())
        })
        .await
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        let s = self.state.read();
        s.cards.get(&id).cloned().ok_or(CoreError::NotFound("card"))
    }

    async fn list_cards(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError> {
        let s = self.state.read();
        let mut v: Vec<Card> = s.cards.values().filter(|c| query.matches(c)).cloned().collect();
        v.sort_by_key(|c| c.created_at);
        Ok(v)
    }

    async fn commit_attempt(
        &self,
        id: CardId,
        expected_version: u64,
        progress: &CardProgress,
        attempt: &Attempt,
    ) -> Result<Card, CoreError> {
        self.commit(|s| {
            let Some(c) = s.cards.get_mut(&id) else {
                return Err(CoreError::NotFound("card"));
            };
            if c.version != expected_version {
                return Err(CoreError::Conflict("card progress changed concurrently"));
            }
            c.progress = progress.clone();
            c.version += 1;
            c.updated_at = Utc::now();
            let card = c.clone();
            s.attempts.entry(id).or_default().push(attempt.clone());
            Ok(card)
        })
        .await
    }

    async fn list_attempts_for_card(&self, card_id: CardId) -> Result<Vec<Attempt>, CoreError> {
        let s = self.state.read();
        Ok(s.attempts.get(&card_id).cloned().unwrap_or_default())
    }

    async fn list_attempts_for_user(&self, user_id: UserId) -> Result<Vec<Attempt>, CoreError> {
        let s = self.state.read();
        let mut v: Vec<Attempt> = s
            .attempts
            .values()
            .flatten()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        v.sort_by_key(|a| a.attempted_at);
        Ok(v)
    }
}
