use chrono::{Duration, Utc};
use studytrack_core::{
    apply_attempt, filter_by_mastery, filter_by_tag, filter_by_text, filter_due,
    mastery_breakdown, summarize, Card, CardKind, DueStatus, MasteryLevel, StudyConfig,
};
use uuid::Uuid;

#[test]
fn filters_text_and_tag() {
    let user = Uuid::new_v4();
    let doc = Uuid::new_v4();
    let mut c1 = Card::new(user, doc, CardKind::Definition, "hola", "hello");
    c1.tags = vec!["greeting".into(), "spanish".into()];
    c1.subject = "Languages".into();
    let c2 = Card::new(user, Uuid::new_v4(), CardKind::Question, "adios", "goodbye");

    let v = vec![c1.clone(), c2.clone()];

    let by_text = filter_by_text(&v, "HOL");
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].front, "hola");
    assert_eq!(filter_by_text(&v, "languages").len(), 1);
    assert_eq!(filter_by_text(&v, "  ").len(), 2);

    let by_tag = filter_by_tag(&v, "Spanish");
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].id, c1.id);
    assert!(filter_by_tag(&v, "span").is_empty());
}

#[test]
fn due_status_and_mastery_filters() {
    let cfg = StudyConfig::default();
    let user = Uuid::new_v4();
    let doc = Uuid::new_v4();
    let now = Utc::now();

    let fresh = Card::new(user, doc, CardKind::Concept, "a", "b");
    let studied = apply_attempt(Card::new(user, doc, CardKind::Concept, "c", "d"), true, 100, now, &cfg).updated_card;
    let missed = apply_attempt(
        Card::new(user, doc, CardKind::Concept, "e", "f"),
        false,
        100,
        now - Duration::days(2),
        &cfg,
    )
    .updated_card;

    assert_eq!(fresh.due_status(now), DueStatus::New);
    assert_eq!(studied.due_status(now), DueStatus::Future);
    assert_eq!(missed.due_status(now), DueStatus::Due);

    let v = vec![studied.clone(), missed.clone(), fresh.clone()];
    let due = filter_due(&v, now);
    assert_eq!(due.len(), 2);
    assert_eq!(due[0].id, fresh.id);
    assert_eq!(due[1].id, missed.id);

    assert_eq!(filter_by_mastery(&v, MasteryLevel::Reviewing).len(), 1);
    let counts = mastery_breakdown(&v);
    assert_eq!(counts[&MasteryLevel::New], 2);
    assert_eq!(counts[&MasteryLevel::Mastered], 0);
}

#[test]
fn attempt_summary_per_day() {
    let cfg = StudyConfig::default();
    let card = Card::new(Uuid::new_v4(), Uuid::new_v4(), CardKind::Question, "q", "a");
    let now = Utc::now();

    let o1 = apply_attempt(card, true, 1_000, now - Duration::days(1), &cfg);
    let o2 = apply_attempt(o1.updated_card, false, 3_000, now, &cfg);
    let o3 = apply_attempt(o2.updated_card, true, 2_000, now, &cfg);

    let s = summarize(&[o1.attempt, o2.attempt, o3.attempt]);
    assert_eq!(s.totals.attempts, 3);
    assert_eq!(s.totals.correct, 2);
    assert_eq!(s.totals.avg_response_ms(), 2_000);
    assert_eq!(s.per_day.len(), 2);
    assert_eq!(s.per_day[&now.date_naive()].attempts, 2);
    assert!((s.per_day[&now.date_naive()].accuracy() - 0.5).abs() < 1e-9);
}
