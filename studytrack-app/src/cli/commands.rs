use crate::api::server as api_server;
use crate::cli::opts::*;
use crate::config::AppConfig;

use anyhow::{anyhow, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use studytrack_core::{
    filters::{filter_by_mastery, filter_by_tag, filter_by_text},
    Card, CardKind, CardQuery, CardSource, Difficulty, MasteryLevel, NewCard, Repository, SessionInput, StudyService,
};
use studytrack_json::paths::data_root;
use studytrack_json::JsonStore;
use studytrack_sqlite::SqliteRepo;
use tracing::info;
use uuid::Uuid;

pub async fn run_cli(args: Cli, cfg: AppConfig) -> Result<()> {
    let repo = open_repo(&args.store, args.db_path.clone(), &cfg).await?;
    let svc = StudyService::new(repo, cfg.study()).with_max_write_retries(cfg.service.max_write_retries);
    match args.cmd {
        Command::Api(api) => {
            let addr: std::net::SocketAddr = api.addr.parse()?;
            info!(%addr, "starting api");
            api_server::run(svc, addr).await
        }
        Command::User(cmd) => user_cmd(&svc, cmd).await,
        Command::Card(cmd) => card_cmd(&svc, cmd).await,
        Command::Attempt(cmd) => attempt_cmd(&svc, cmd).await,
        Command::Session(cmd) => session_cmd(&svc, cmd).await,
        Command::Upload { user } => {
            let stats = svc.record_document_upload(parse_uuid(&user)?).await?;
            println!("documents_uploaded={}", stats.documents_uploaded);
            Ok(())
        }
        Command::Due(cmd) => due_cmd(&svc, cmd).await,
    }
}

pub async fn open_repo(store: &StoreKind, db_path: Option<PathBuf>, cfg: &AppConfig) -> Result<Arc<dyn Repository>> {
    match store {
        StoreKind::Json => {
            let s = JsonStore::open_default(cfg.store.max_backups).await?;
            Ok(Arc::new(s))
        }
        StoreKind::Sqlite => {
            let p = db_path.unwrap_or_else(|| data_root().join("studytrack.sqlite3"));
            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let s = SqliteRepo::open_file(&p).await?;
            Ok(Arc::new(s))
        }
    }
}

async fn user_cmd(svc: &StudyService, cmd: UserCmd) -> Result<()> {
    match cmd {
        UserCmd::Add { email, name } => {
            let u = svc.create_user(&email, &name).await?;
            println!("{}", u.id);
        }
        UserCmd::Show { user } => {
            let u = svc.get_user(parse_uuid(&user)?).await?;
            let s = &u.stats;
            println!("{}\t{}\t{}", u.id, u.email, u.name);
            println!(
                "studied={} correct={} accuracy={:.1}% minutes={} streak={} longest={} last={}",
                s.total_cards_studied,
                s.total_correct_answers,
                s.overall_accuracy(),
                s.total_study_time_minutes,
                s.current_streak,
                s.longest_streak,
                s.last_study_date.map(|d| d.to_rfc3339()).unwrap_or_else(|| "-".into()),
            );
        }
        UserCmd::Report { user } => {
            let report = svc.user_report(parse_uuid(&user)?, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

async fn card_cmd(svc: &StudyService, cmd: CardCmd) -> Result<()> {
    match cmd {
        CardCmd::Add(a) => {
            let new_card = NewCard {
                user_id: parse_uuid(&a.user)?,
                document_id: parse_uuid(&a.document)?,
                kind: CardKind::parse(&a.kind).ok_or_else(|| anyhow!("unknown card kind: {}", a.kind))?,
                front: a.front,
                back: a.back,
                difficulty: match a.difficulty {
                    Some(d) => Difficulty::parse(&d).ok_or_else(|| anyhow!("unknown difficulty: {d}"))?,
                    None => Difficulty::default(),
                },
                subject: a.subject,
                tags: a.tags,
                source: match a.source {
                    Some(s) => CardSource::parse(&s).ok_or_else(|| anyhow!("unknown source: {s}"))?,
                    None => CardSource::UserCreated,
                },
            };
            let c = svc.add_card(new_card).await?;
            println!("{}", c.id);
        }
        CardCmd::List {
            user,
            document,
            mastery,
            tag,
            query,
        } => {
            let q = CardQuery {
                user_id: user.as_deref().map(parse_uuid).transpose()?,
                document_id: document.as_deref().map(parse_uuid).transpose()?,
            };
            let cards = svc.list_cards(&q).await?;
            let cards = narrow_cards(cards, mastery.as_deref(), tag.as_deref(), query.as_deref())?;
            for c in cards {
                print_card_line(&c);
            }
        }
        CardCmd::Show { card_id } => {
            let c = svc.get_card(parse_uuid(&card_id)?).await?;
            println!("{}", serde_json::to_string_pretty(&c)?);
        }
        CardCmd::Attempts { card_id } => {
            for a in svc.card_attempts(parse_uuid(&card_id)?).await? {
                println!(
                    "{}\t{}\t{}ms\tinterval={}\tease={:.2}\t{}",
                    a.attempted_at.to_rfc3339(),
                    if a.is_correct { "correct" } else { "incorrect" },
                    a.response_time_ms,
                    a.interval_applied,
                    a.ease_after,
                    a.mastery_after.as_str(),
                );
            }
        }
    }
    Ok(())
}

async fn attempt_cmd(svc: &StudyService, cmd: AttemptCmd) -> Result<()> {
    let is_correct = cmd.correct && !cmd.incorrect;
    let c = svc
        .record_card_attempt(parse_uuid(&cmd.card_id)?, is_correct, cmd.response_ms)
        .await?;
    let p = &c.progress;
    println!(
        "→ {} · next review in {} day(s) · ease {:.2} · accuracy {:.0}%",
        p.mastery_level.as_str(),
        p.interval_days,
        p.ease_factor,
        p.accuracy_rate(),
    );
    Ok(())
}

async fn session_cmd(svc: &StudyService, cmd: SessionCmd) -> Result<()> {
    let input = SessionInput {
        cards_studied: cmd.cards,
        correct_answers: cmd.correct,
        study_time_minutes: cmd.minutes,
    };
    let s = svc.record_study_session(parse_uuid(&cmd.user)?, input).await?;
    println!("streak={} longest={} studied={}", s.current_streak, s.longest_streak, s.total_cards_studied);
    Ok(())
}

async fn due_cmd(svc: &StudyService, cmd: DueCmd) -> Result<()> {
    let cards = svc.due_cards(parse_uuid(&cmd.user)?, Utc::now(), Some(cmd.max)).await?;
    if cards.is_empty() {
        println!("no cards due");
        return Ok(());
    }
    for c in cards {
        print_card_line(&c);
    }
    Ok(())
}

// ===== Helpers =====
fn narrow_cards(
    mut cards: Vec<Card>,
    mastery: Option<&str>,
    tag: Option<&str>,
    query: Option<&str>,
) -> Result<Vec<Card>> {
    if let Some(m) = mastery {
        let level = MasteryLevel::parse(m).ok_or_else(|| anyhow!("unknown mastery level: {m}"))?;
        cards = filter_by_mastery(&cards, level);
    }
    if let Some(t) = tag {
        cards = filter_by_tag(&cards, t);
    }
    if let Some(text) = query {
        cards = filter_by_text(&cards, text);
    }
    Ok(cards)
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim()).map_err(|_| anyhow!("invalid uuid: {s}"))
}

fn print_card_line(c: &Card) {
    let tags = if c.tags.is_empty() { "-".to_string() } else { c.tags.join(";") };
    let next = c
        .progress
        .next_review
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "new".into());
    println!(
        "{}\t{}\t{}\t{}\tnext={}\ttags={}",
        c.id,
        c.front,
        c.back,
        c.progress.mastery_level.as_str(),
        next,
        tags
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use studytrack_core::CardKind;

    #[test]
    fn list_filters_stack() {
        let user = Uuid::new_v4();
        let mut a = Card::new(user, Uuid::new_v4(), CardKind::Definition, "hola", "hello");
        a.tags = vec!["Spanish".into()];
        let mut b = Card::new(user, Uuid::new_v4(), CardKind::Definition, "adios", "goodbye");
        b.tags = vec!["spanish".into(), "farewell".into()];
        let c = Card::new(user, Uuid::new_v4(), CardKind::Question, "bonjour", "hello");
        let all = vec![a, b, c];

        assert_eq!(narrow_cards(all.clone(), None, Some("SPANISH"), None).unwrap().len(), 2);
        let hello = narrow_cards(all.clone(), Some("new"), Some("spanish"), Some("hello")).unwrap();
        assert_eq!(hello.len(), 1);
        assert_eq!(hello[0].front, "hola");
        assert_eq!(narrow_cards(all.clone(), None, None, None).unwrap().len(), 3);
        assert!(narrow_cards(all, Some("expert"), None, None).is_err());
    }
}
