use chrono::Utc;
use std::sync::Arc;
use studytrack_core::{CardKind, CoreError, NewCard, Repository, SessionInput, StudyConfig, StudyService};
use studytrack_json::JsonStore;
use uuid::Uuid;

#[tokio::test]
async fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("store.json");
    let backups = dir.path().join("backups");

    let (user_id, card_id) = {
        let store = JsonStore::open_with(file.clone(), backups.clone(), 3).await.unwrap();
        let svc = StudyService::new(Arc::new(store), StudyConfig::default());
        let user = svc.create_user("ann@example.com", "Ann").await.unwrap();
        let card = svc
            .add_card(NewCard {
                user_id: user.id,
                document_id: Uuid::new_v4(),
                kind: CardKind::Question,
                front: "capital of France?".into(),
                back: "Paris".into(),
                difficulty: Default::default(),
                subject: None,
                tags: vec![],
                source: Default::default(),
            })
            .await
            .unwrap();
        svc.record_card_attempt(card.id, true, 800).await.unwrap();
        svc.record_study_session(
            user.id,
            SessionInput {
                cards_studied: 1,
                correct_answers: 1,
                study_time_minutes: 2,
            },
        )
        .await
        .unwrap();
        (user.id, card.id)
    };

    let store = JsonStore::open_with(file, backups.clone(), 3).await.unwrap();
    let card = store.get_card(card_id).await.unwrap();
    assert_eq!(card.progress.times_studied, 1);
    assert_eq!(card.progress.interval_days, 3);
    assert_eq!(card.version, 1);
    assert_eq!(card.subject, "General");

    let user = store.get_user(user_id).await.unwrap();
    assert_eq!(user.stats.current_streak, 1);
    assert_eq!(user.stats.flashcards_created, 1);
    assert!(user.stats.last_study_date.unwrap() <= Utc::now());

    assert_eq!(store.list_attempts_for_user(user_id).await.unwrap().len(), 1);

    let kept = std::fs::read_dir(&backups).unwrap().count();
    assert!(kept <= 3);
}

#[tokio::test]
async fn duplicate_email_and_stale_writes_conflict() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::open_with(dir.path().join("s.json"), dir.path().join("b"), 2)
        .await
        .unwrap();
    let user = store.create_user("kim@example.com", "Kim").await.unwrap();
    let r = store.create_user("KIM@example.com", "Kim again").await;
    assert!(matches!(r, Err(CoreError::Conflict(_))));

    let r = store.update_user_stats(user.id, 1, &user.stats).await;
    assert!(matches!(r, Err(CoreError::Conflict(_))));
    let r = store.update_user_stats(Uuid::new_v4(), 0, &user.stats).await;
    assert!(matches!(r, Err(CoreError::NotFound("user"))));
}

fn card_for(user_id: Uuid, front: &str) -> NewCard {
    NewCard {
        user_id,
        document_id: Uuid::new_v4(),
        kind: CardKind::Definition,
        front: front.into(),
        back: "answer".into(),
        difficulty: Default::default(),
        subject: None,
        tags: vec![],
        source: Default::default(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attempts_all_reach_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("store.json");
    let backups = dir.path().join("backups");

    let store = JsonStore::open_with(file.clone(), backups.clone(), 2).await.unwrap();
    let svc = Arc::new(StudyService::new(Arc::new(store), StudyConfig::default()).with_max_write_retries(64));
    let user = svc.create_user("lee@example.com", "Lee").await.unwrap();
    let mut card_ids = Vec::new();
    for i in 0..4 {
        card_ids.push(svc.add_card(card_for(user.id, &format!("term {i}"))).await.unwrap().id);
    }

    let mut handles = Vec::new();
    for &card_id in &card_ids {
        for _ in 0..4 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.record_card_attempt(card_id, true, 500).await.unwrap();
            }));
        }
    }
    for h in handles {
        h.await.unwrap();
    }
    drop(svc);

    let store = JsonStore::open_with(file, backups, 2).await.unwrap();
    for card_id in card_ids {
        let card = store.get_card(card_id).await.unwrap();
        assert_eq!(card.progress.times_studied, 4);
        assert_eq!(card.version, 4);
        assert_eq!(store.list_attempts_for_card(card_id).await.unwrap().len(), 4);
    }
    let user = store.get_user(user.id).await.unwrap();
    assert_eq!(user.stats.flashcards_created, 4);
    assert_eq!(user.version, 4);
}

#[tokio::test]
async fn adding_a_card_for_an_unknown_user_stores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("store.json");
    let backups = dir.path().join("backups");
    let store = JsonStore::open_with(file.clone(), backups.clone(), 2).await.unwrap();
    let svc = StudyService::new(Arc::new(store), StudyConfig::default());

    let r = svc.add_card(card_for(Uuid::new_v4(), "orphan")).await;
    assert!(matches!(r, Err(CoreError::NotFound("user"))));

    let store = JsonStore::open_with(file, backups, 2).await.unwrap();
    let all = store.list_cards(&Default::default()).await.unwrap();
    assert!(all.is_empty());
}
