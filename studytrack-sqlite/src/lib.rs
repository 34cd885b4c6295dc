use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Executor, Row, Sqlite, SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use studytrack_core::{
    repo::{CardQuery, Repository},
    Attempt, Card, CardId, CardKind, CardProgress, CardSource, CoreError, Difficulty, MasteryLevel, StudyStats, User,
    UserId,
};
use tracing::debug;

pub struct SqliteRepo {
    pool: SqlitePool,
}

const CARD_COLUMNS: &str = "id,user_id,document_id,kind,front,back,difficulty,subject,tags,source,\
     times_studied,times_correct,last_studied,mastery_level,next_review,ease_factor,interval_days,\
     version,created_at,updated_at";

const USER_COLUMNS: &str = "id,email,name,total_study_time_minutes,total_cards_studied,total_correct_answers,\
     current_streak,longest_streak,last_study_date,documents_uploaded,flashcards_created,\
     version,created_at,updated_at";

const ATTEMPT_COLUMNS: &str =
    "id,card_id,user_id,is_correct,response_time_ms,attempted_at,interval_applied,ease_after,mastery_after";

impl SqliteRepo {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        debug!(path = %path.as_ref().display(), "sqlite store opened");
        Ok(repo)
    }

    pub async fn open_memory() -> Result<Self, CoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|_| CoreError::Storage("sqlite connect"))?
            .foreign_keys(true);
        // each connection would see its own empty database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None::<std::time::Duration>)
            .max_lifetime(None::<std::time::Duration>)
            .connect_with(opts)
            .await
            .map_err(|_| CoreError::Storage("sqlite connect"))?;
        let repo = Self { pool };
        repo.ensure_schema().await?;
        Ok(repo)
    }

    async fn ensure_schema(&self) -> Result<(), CoreError> {
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS users (
          id                        TEXT PRIMARY KEY,
          email                     TEXT NOT NULL UNIQUE,
          name                      TEXT NOT NULL,
          total_study_time_minutes  INTEGER NOT NULL DEFAULT 0,
          total_cards_studied       INTEGER NOT NULL DEFAULT 0,
          total_correct_answers     INTEGER NOT NULL DEFAULT 0,
          current_streak            INTEGER NOT NULL DEFAULT 0,
          longest_streak            INTEGER NOT NULL DEFAULT 0,
          last_study_date           TEXT,
          documents_uploaded        INTEGER NOT NULL DEFAULT 0,
          flashcards_created        INTEGER NOT NULL DEFAULT 0,
          version                   INTEGER NOT NULL DEFAULT 0,
          created_at                TEXT NOT NULL,
          updated_at                TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
          id             TEXT PRIMARY KEY,
          user_id        TEXT NOT NULL,
          document_id    TEXT NOT NULL,
          kind           TEXT NOT NULL,
          front          TEXT NOT NULL,
          back           TEXT NOT NULL,
          difficulty     TEXT NOT NULL,
          subject        TEXT NOT NULL,
          tags           TEXT NOT NULL,
          source         TEXT NOT NULL,
          times_studied  INTEGER NOT NULL DEFAULT 0,
          times_correct  INTEGER NOT NULL DEFAULT 0,
          last_studied   TEXT,
          mastery_level  TEXT NOT NULL DEFAULT 'new',
          next_review    TEXT,
          ease_factor    REAL    NOT NULL DEFAULT 2.5,
          interval_days  INTEGER NOT NULL DEFAULT 1,
          version        INTEGER NOT NULL DEFAULT 0,
          created_at     TEXT NOT NULL,
          updated_at     TEXT NOT NULL,
          FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS attempts (
          id                TEXT PRIMARY KEY,
          card_id           TEXT NOT NULL,
          user_id           TEXT NOT NULL,
          is_correct        INTEGER NOT NULL,
          response_time_ms  INTEGER NOT NULL,
          attempted_at      TEXT NOT NULL,
          interval_applied  INTEGER NOT NULL,
          ease_after        REAL NOT NULL,
          mastery_after     TEXT NOT NULL,
          FOREIGN KEY(card_id) REFERENCES cards(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_cards_user_review ON cards (user_id, next_review);
        CREATE INDEX IF NOT EXISTS idx_cards_user_mastery ON cards (user_id, mastery_level);
        CREATE INDEX IF NOT EXISTS idx_cards_user_document ON cards (user_id, document_id);
        CREATE INDEX IF NOT EXISTS idx_attempts_card_time ON attempts (card_id, attempted_at);
        CREATE INDEX IF NOT EXISTS idx_attempts_user_time ON attempts (user_id, attempted_at);
        "#;

        // Execute statements one by one for compatibility.
        for chunk in STMT.split(';') {
            let sql = chunk.trim();
            if sql.is_empty() {
                continue;
            }
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|_| CoreError::Storage("sqlite schema"))?;
        }
        Ok(())
    }
}

async fn exists<'e, E>(ex: E, table: &'static str, id: &str) -> Result<bool, CoreError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT 1 FROM {table} WHERE id=? LIMIT 1");
    Ok(sqlx::query(&sql)
        .bind(id)
        .fetch_optional(ex)
        .await
        .map_err(|_| CoreError::Storage("read"))?
        .is_some())
}

#[async_trait::async_trait]
impl Repository for SqliteRepo {
    // ===== Users =====
    async fn create_user(&self, email: &str, name: &str) -> Result<User, CoreError> {
        let user = User::new(email, name)?;
        let taken = sqlx::query("SELECT 1 FROM users WHERE lower(email)=lower(?) LIMIT 1")
            .bind(&user.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read user"))?
            .is_some();
        if taken {
            return Err(CoreError::Conflict("email already registered"));
        }

        let sql = format!("INSERT INTO users ({USER_COLUMNS}) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?)");
        let s = &user.stats;
        sqlx::query(&sql)
            .bind(user.id.to_string())
            .bind(&user.email)
            .bind(&user.name)
            .bind(to_i64(s.total_study_time_minutes)?)
            .bind(to_i64(s.total_cards_studied)?)
            .bind(to_i64(s.total_correct_answers)?)
            .bind(i64::from(s.current_streak))
            .bind(i64::from(s.longest_streak))
            .bind(s.last_study_date.map(dt_to_str))
            .bind(to_i64(s.documents_uploaded)?)
            .bind(to_i64(s.flashcards_created)?)
            .bind(to_i64(user.version)?)
            .bind(dt_to_str(user.created_at))
            .bind(dt_to_str(user.updated_at))
            .execute(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("insert user"))?;
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<User, CoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id=?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read user"))?;
        row_into_user(row.ok_or(CoreError::NotFound("user"))?)
    }

    async fn update_user_stats(
        &self,
        id: UserId,
        expected_version: u64,
        stats: &StudyStats,
    ) -> Result<User, CoreError> {
        let res = sqlx::query(
            r#"
            UPDATE users SET
              total_study_time_minutes=?, total_cards_studied=?, total_correct_answers=?,
              current_streak=?, longest_streak=?, last_study_date=?,
              documents_uploaded=?, flashcards_created=?,
              version=version+1, updated_at=?
            WHERE id=? AND version=?
            "#,
        )
        .bind(to_i64(stats.total_study_time_minutes)?)
        .bind(to_i64(stats.total_cards_studied)?)
        .bind(to_i64(stats.total_correct_answers)?)
        .bind(i64::from(stats.current_streak))
        .bind(i64::from(stats.longest_streak))
        .bind(stats.last_study_date.map(dt_to_str))
        .bind(to_i64(stats.documents_uploaded)?)
        .bind(to_i64(stats.flashcards_created)?)
        .bind(dt_to_str(Utc::now()))
        .bind(id.to_string())
        .bind(to_i64(expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(|_| CoreError::Storage("update user"))?;
        if res.rows_affected() == 0 {
            return if exists(&self.pool, "users", &id.to_string()).await? {
                Err(CoreError::Conflict("user stats changed concurrently"))
            } else {
                Err(CoreError::NotFound("user"))
            };
        }
        self.get_user(id).await
    }

    // ===== Cards =====
    async fn add_card(&self, card: &Card) -> Result<Card, CoreError> {
        let tags = serde_json::to_string(&card.tags).map_err(|_| CoreError::Invalid("tags"))?;
        let p = &card.progress;
        let now = dt_to_str(Utc::now());

        let mut tx = self.pool.begin().await.map_err(|_| CoreError::Storage("begin"))?;
        // Write first so the transaction holds the write lock from the start.
        let owner = sqlx::query(
            r#"
            UPDATE users SET
              flashcards_created = CASE WHEN flashcards_created < ?1 THEN flashcards_created + 1
                                        ELSE flashcards_created END,
              version=version+1, updated_at=?2
            WHERE id=?3
            "#,
        )
        .bind(i64::MAX)
        .bind(&now)
        .bind(card.user_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|_| CoreError::Storage("update user"))?;
        if owner.rows_affected() == 0 {
            return Err(CoreError::NotFound("user"));
        }
        if exists(&mut *tx, "cards", &card.id.to_string()).await? {
            return Err(CoreError::Conflict("card id already exists"));
        }

        let sql = format!("INSERT INTO cards ({CARD_COLUMNS}) VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)");
        sqlx::query(&sql)
            .bind(card.id.to_string())
            .bind(card.user_id.to_string())
            .bind(card.document_id.to_string())
            .bind(card.kind.as_str())
            .bind(&card.front)
            .bind(&card.back)
            .bind(card.difficulty.as_str())
            .bind(&card.subject)
            .bind(tags)
            .bind(card.source.as_str())
            .bind(i64::from(p.times_studied))
            .bind(i64::from(p.times_correct))
            .bind(p.last_studied.map(dt_to_str))
            .bind(p.mastery_level.as_str())
            .bind(p.next_review.map(dt_to_str))
            .bind(p.ease_factor)
            .bind(i64::from(p.interval_days))
            .bind(to_i64(card.version)?)
            .bind(dt_to_str(card.created_at))
            .bind(dt_to_str(card.updated_at))
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("insert card"))?;

        tx.commit().await.map_err(|_| CoreError::Storage("commit"))?;
        Ok(card.clone())
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM cards WHERE id=?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("read card"))?;
        row_into_card(row.ok_or(CoreError::NotFound("card"))?)
    }

    async fn list_cards(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM cards \
             WHERE (?1 IS NULL OR user_id=?1) AND (?2 IS NULL OR document_id=?2) \
             ORDER BY created_at ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(query.user_id.map(|u| u.to_string()))
            .bind(query.document_id.map(|d| d.to_string()))
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list cards"))?;
        rows.into_iter().map(row_into_card).collect()
    }

    async fn commit_attempt(
        &self,
        id: CardId,
        expected_version: u64,
        progress: &CardProgress,
        attempt: &Attempt,
    ) -> Result<Card, CoreError> {
        let mut tx = self.pool.begin().await.map_err(|_| CoreError::Storage("begin"))?;
        let res = sqlx::query(
            r#"
            UPDATE cards SET
              times_studied=?, times_correct=?, last_studied=?, mastery_level=?,
              next_review=?, ease_factor=?, interval_days=?,
              version=version+1, updated_at=?
            WHERE id=? AND version=?
            "#,
        )
        .bind(i64::from(progress.times_studied))
        .bind(i64::from(progress.times_correct))
        .bind(progress.last_studied.map(dt_to_str))
        .bind(progress.mastery_level.as_str())
        .bind(progress.next_review.map(dt_to_str))
        .bind(progress.ease_factor)
        .bind(i64::from(progress.interval_days))
        .bind(dt_to_str(Utc::now()))
        .bind(id.to_string())
        .bind(to_i64(expected_version)?)
        .execute(&mut *tx)
        .await
        .map_err(|_| CoreError::Storage("update card"))?;
        if res.rows_affected() == 0 {
            return if exists(&mut *tx, "cards", &id.to_string()).await? {
                Err(CoreError::Conflict("card progress changed concurrently"))
            } else {
                Err(CoreError::NotFound("card"))
            };
        }

        let sql = format!("INSERT INTO attempts ({ATTEMPT_COLUMNS}) VALUES (?,?,?,?,?,?,?,?,?)");
        sqlx::query(&sql)
            .bind(attempt.id.to_string())
            .bind(attempt.card_id.to_string())
            .bind(attempt.user_id.to_string())
            .bind(bool_to_i(attempt.is_correct))
            .bind(to_i64(attempt.response_time_ms)?)
            .bind(dt_to_str(attempt.attempted_at))
            .bind(i64::from(attempt.interval_applied))
            .bind(attempt.ease_after)
            .bind(attempt.mastery_after.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|_| CoreError::Storage("insert attempt"))?;

        tx.commit().await.map_err(|_| CoreError::Storage("commit"))?;
        self.get_card(id).await
    }

    // ===== Attempts =====
    async fn list_attempts_for_card(&self, card_id: CardId) -> Result<Vec<Attempt>, CoreError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE card_id=? ORDER BY attempted_at ASC");
        let rows = sqlx::query(&sql)
            .bind(card_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list attempts"))?;
        rows.into_iter().map(row_into_attempt).collect()
    }

    async fn list_attempts_for_user(&self, user_id: UserId) -> Result<Vec<Attempt>, CoreError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id=? ORDER BY attempted_at ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|_| CoreError::Storage("list attempts"))?;
        rows.into_iter().map(row_into_attempt).collect()
    }
}

// ===== Helpers =====
fn uuid_from_str(s: String) -> Result<uuid::Uuid, CoreError> {
    uuid::Uuid::parse_str(&s).map_err(|_| CoreError::Invalid("uuid"))
}

/// Fixed-width UTC form so lexical order in SQL matches time order.
fn dt_to_str(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn dt_from_str(s: String) -> Result<DateTime<Utc>, CoreError> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map_err(|_| CoreError::Invalid("datetime"))
        .map(|dt| dt.with_timezone(&Utc))
}

fn opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>, CoreError> {
    s.map(dt_from_str).transpose()
}

fn bool_to_i(b: bool) -> i64 {
    if b {
        1
    } else {
        0
    }
}

/// SQLite integers are signed; totals above `i64::MAX` are refused, not wrapped.
fn to_i64(v: u64) -> Result<i64, CoreError> {
    i64::try_from(v).map_err(|_| CoreError::Storage("value out of range for sqlite"))
}

fn count<T: TryFrom<i64>>(row: &SqliteRow, col: &str) -> Result<T, CoreError> {
    T::try_from(row.get::<i64, _>(col)).map_err(|_| CoreError::Storage("stored count out of range"))
}

fn mastery_from_str(s: String) -> Result<MasteryLevel, CoreError> {
    MasteryLevel::parse(&s).ok_or(CoreError::Invalid("mastery level"))
}

fn row_into_user(row: SqliteRow) -> Result<User, CoreError> {
    Ok(User {
        id: uuid_from_str(row.get("id"))?,
        email: row.get("email"),
        name: row.get("name"),
        stats: StudyStats {
            total_study_time_minutes: count(&row, "total_study_time_minutes")?,
            total_cards_studied: count(&row, "total_cards_studied")?,
            total_correct_answers: count(&row, "total_correct_answers")?,
            current_streak: count(&row, "current_streak")?,
            longest_streak: count(&row, "longest_streak")?,
            last_study_date: opt_dt(row.get("last_study_date"))?,
            documents_uploaded: count(&row, "documents_uploaded")?,
            flashcards_created: count(&row, "flashcards_created")?,
        },
        version: count(&row, "version")?,
        created_at: dt_from_str(row.get("created_at"))?,
        updated_at: dt_from_str(row.get("updated_at"))?,
    })
}

fn row_into_card(row: SqliteRow) -> Result<Card, CoreError> {
    let tags_json: String = row.get("tags");
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();

    Ok(Card {
        id: uuid_from_str(row.get("id"))?,
        user_id: uuid_from_str(row.get("user_id"))?,
        document_id: uuid_from_str(row.get("document_id"))?,
        kind: CardKind::parse(row.get::<&str, _>("kind")).ok_or(CoreError::Invalid("card kind"))?,
        front: row.get("front"),
        back: row.get("back"),
        difficulty: Difficulty::parse(row.get::<&str, _>("difficulty")).ok_or(CoreError::Invalid("difficulty"))?,
        subject: row.get("subject"),
        tags,
        source: CardSource::parse(row.get::<&str, _>("source")).ok_or(CoreError::Invalid("card source"))?,
        progress: CardProgress {
            times_studied: count(&row, "times_studied")?,
            times_correct: count(&row, "times_correct")?,
            last_studied: opt_dt(row.get("last_studied"))?,
            mastery_level: mastery_from_str(row.get("mastery_level"))?,
            next_review: opt_dt(row.get("next_review"))?,
            ease_factor: row.get::<f64, _>("ease_factor"),
            interval_days: count(&row, "interval_days")?,
        },
        version: count(&row, "version")?,
        created_at: dt_from_str(row.get("created_at"))?,
        updated_at: dt_from_str(row.get("updated_at"))?,
    })
}

fn row_into_attempt(row: SqliteRow) -> Result<Attempt, CoreError> {
    Ok(Attempt {
        id: uuid_from_str(row.get("id"))?,
        card_id: uuid_from_str(row.get("card_id"))?,
        user_id: uuid_from_str(row.get("user_id"))?,
        is_correct: row.get::<i64, _>("is_correct") != 0,
        response_time_ms: count(&row, "response_time_ms")?,
        attempted_at: dt_from_str(row.get("attempted_at"))?,
        interval_applied: count(&row, "interval_applied")?,
        ease_after: row.get::<f64, _>("ease_after"),
        mastery_after: mastery_from_str(row.get("mastery_after"))?,
    })
}
