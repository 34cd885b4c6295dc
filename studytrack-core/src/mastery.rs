use crate::config::MasteryThresholds;
use crate::MasteryLevel;

/// Re-derives the mastery label from cumulative counts.
///
/// Stateless on purpose: a mastered card drops back down as soon as a miss
/// pulls its accuracy under the thresholds.
pub fn classify(times_correct: u32, times_studied: u32, t: &MasteryThresholds) -> MasteryLevel {
    let accuracy = if times_studied == 0 {
        0.0
    } else {
        times_correct as f64 / times_studied as f64
    };

    if accuracy >= t.mastered_accuracy && times_studied >= t.mastered_min_attempts {
        MasteryLevel::Mastered
    } else if accuracy >= t.reviewing_accuracy {
        MasteryLevel::Reviewing
    } else if accuracy >= t.learning_accuracy {
        MasteryLevel::Learning
    } else {
        MasteryLevel::New
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_attempts_is_new() {
        assert_eq!(classify(0, 0, &MasteryThresholds::default()), MasteryLevel::New);
    }

    #[test]
    fn perfect_but_too_few_attempts_is_reviewing() {
        let t = MasteryThresholds::default();
        assert_eq!(classify(2, 2, &t), MasteryLevel::Reviewing);
        assert_eq!(classify(3, 3, &t), MasteryLevel::Mastered);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let t = MasteryThresholds::default();
        assert_eq!(classify(9, 10, &t), MasteryLevel::Mastered);
        assert_eq!(classify(7, 10, &t), MasteryLevel::Reviewing);
        assert_eq!(classify(5, 10, &t), MasteryLevel::Learning);
        assert_eq!(classify(4, 10, &t), MasteryLevel::New);
    }
}
