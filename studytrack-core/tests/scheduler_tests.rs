use chrono::{Duration, TimeZone, Utc};
use studytrack_core::{
    apply, apply_attempt, Card, CardKind, CardProgress, MasteryLevel, SchedulerConfig, StudyConfig, MIN_EASE,
};
use uuid::Uuid;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn three_correct_answers_grow_ease_and_interval() {
    let cfg = StudyConfig::default();
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let mut p = CardProgress::default();

    p = apply(p, true, now, &cfg);
    assert!(approx(p.ease_factor, 2.6));
    assert_eq!(p.interval_days, 3);

    p = apply(p, true, now, &cfg);
    assert!(approx(p.ease_factor, 2.7));
    assert_eq!(p.interval_days, 8);

    p = apply(p, true, now, &cfg);
    assert!(approx(p.ease_factor, 2.8));
    assert_eq!(p.interval_days, 22);

    assert_eq!(p.times_studied, 3);
    assert_eq!(p.times_correct, 3);
    assert_eq!(p.mastery_level, MasteryLevel::Mastered);
    assert_eq!(p.next_review, Some(now + Duration::days(22)));
}

#[test]
fn miss_resets_interval_and_cuts_ease() {
    let cfg = StudyConfig::default();
    let now = Utc::now();
    let p = CardProgress {
        interval_days: 40,
        ease_factor: 2.5,
        times_studied: 5,
        times_correct: 5,
        ..CardProgress::default()
    };

    let p = apply(p, false, now, &cfg);
    assert_eq!(p.interval_days, 1);
    assert!(approx(p.ease_factor, 2.3));
    assert_eq!(p.times_studied, 6);
    assert_eq!(p.times_correct, 5);
    assert_eq!(p.last_studied, Some(now));
    assert_eq!(p.next_review, Some(now + Duration::days(1)));
}

#[test]
fn ease_never_drops_below_floor() {
    let cfg = StudyConfig::default();
    let now = Utc::now();
    let mut p = CardProgress::default();
    for _ in 0..20 {
        p = apply(p, false, now, &cfg);
        assert!(p.ease_factor >= MIN_EASE - 1e-9);
        assert_eq!(p.interval_days, 1);
    }
    assert!(approx(p.ease_factor, MIN_EASE));

    // recovery starts from the floor, not from the unclamped value
    p = apply(p, true, now, &cfg);
    assert!(approx(p.ease_factor, MIN_EASE + 0.1));
}

#[test]
fn configured_ceiling_caps_ease() {
    let cfg = StudyConfig {
        scheduler: SchedulerConfig {
            max_ease: Some(2.5),
            ..SchedulerConfig::default()
        },
        ..StudyConfig::default()
    };
    let now = Utc::now();
    let mut p = CardProgress::default();
    for _ in 0..10 {
        p = if p.times_studied % 3 == 2 {
            apply(p, false, now, &cfg)
        } else {
            apply(p, true, now, &cfg)
        };
        assert!(p.ease_factor >= MIN_EASE - 1e-9 && p.ease_factor <= 2.5 + 1e-9);
    }
}

#[test]
fn capped_ease_flattens_growth() {
    let capped = StudyConfig {
        scheduler: SchedulerConfig {
            max_ease: Some(2.5),
            ..SchedulerConfig::default()
        },
        ..StudyConfig::default()
    };
    let now = Utc::now();
    let mut p = CardProgress::default();
    let mut intervals = Vec::new();
    for _ in 0..3 {
        p = apply(p, true, now, &capped);
        intervals.push(p.interval_days);
        assert!((p.ease_factor - 2.5).abs() < 1e-9);
    }
    assert_eq!(intervals, vec![3, 8, 20]);
    assert_eq!(StudyConfig::default().scheduler.max_ease, None);
}

#[test]
fn interval_is_capped() {
    let cfg = StudyConfig {
        scheduler: SchedulerConfig {
            max_interval_days: 30,
            ..SchedulerConfig::default()
        },
        ..StudyConfig::default()
    };
    let mut p = CardProgress::default();
    for _ in 0..6 {
        p = apply(p, true, Utc::now(), &cfg);
    }
    assert_eq!(p.interval_days, 30);
}

#[test]
fn mastered_card_regresses_after_a_miss() {
    let cfg = StudyConfig::default();
    let now = Utc::now();
    let mut p = CardProgress::default();
    for _ in 0..3 {
        p = apply(p, true, now, &cfg);
    }
    assert_eq!(p.mastery_level, MasteryLevel::Mastered);

    let p = apply(p, false, now, &cfg);
    assert_eq!(p.times_studied, 4);
    assert_eq!(p.times_correct, 3);
    assert_eq!(p.mastery_level, MasteryLevel::Reviewing);
}

#[test]
fn first_miss_stays_new() {
    let cfg = StudyConfig::default();
    let p = apply(CardProgress::default(), false, Utc::now(), &cfg);
    assert_eq!(p.mastery_level, MasteryLevel::New);
    assert_eq!(p.accuracy(), 0.0);
}

#[test]
fn attempt_records_response_time_and_outcome() {
    let cfg = StudyConfig::default();
    let card = Card::new(Uuid::new_v4(), Uuid::new_v4(), CardKind::Question, "2+2?", "4");
    let now = Utc::now();

    let out = apply_attempt(card.clone(), true, 1_250, now, &cfg);
    assert_eq!(out.attempt.card_id, card.id);
    assert_eq!(out.attempt.user_id, card.user_id);
    assert!(out.attempt.is_correct);
    assert_eq!(out.attempt.response_time_ms, 1_250);
    assert_eq!(out.attempt.interval_applied, out.updated_card.progress.interval_days);
    assert_eq!(out.updated_card.updated_at, now);
    assert_eq!(out.updated_card.version, card.version);
}
