//! Free-text duration parsing.
//!
//! The primary service sometimes reports travel time as prose such as
//! `"1 saat 5 dəq"`, `"12 min 30 sec"` or `"1 ч 20 мин"`. Each number is read
//! together with the unit word that follows it; unrecognised words are
//! skipped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Hour,
    Minute,
    Second,
}

impl Unit {
    const fn seconds(self) -> f64 {
        match self {
            Self::Hour => 3_600.0,
            Self::Minute => 60.0,
            Self::Second => 1.0,
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        let word = word.to_lowercase();
        let starts = |prefixes: &[&str]| prefixes.iter().any(|prefix| word.starts_with(prefix));
        if word == "h" || starts(&["saat", "hour", "hr", "ч"]) {
            Some(Self::Hour)
        } else if word == "m" || starts(&["dəq", "deq", "min", "мин"]) {
            Some(Self::Minute)
        } else if word == "s" || word == "с" || starts(&["san", "sec", "сек"]) {
            Some(Self::Second)
        } else {
            None
        }
    }
}

/// Total seconds described by `text`, or `None` when no number carries a
/// recognised unit.
pub(crate) fn parse_duration_text(text: &str) -> Option<u64> {
    let mut chars = text.chars().peekable();
    let mut total = 0.0_f64;
    let mut matched = false;

    while let Some(&ch) = chars.peek() {
        if !ch.is_ascii_digit() {
            chars.next();
            continue;
        }

        let mut number = String::new();
        while let Some(&digit) = chars.peek() {
            if digit.is_ascii_digit() {
                number.push(digit);
            } else if digit == '.' || digit == ',' {
                number.push('.');
            } else {
                break;
            }
            chars.next();
        }
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let mut word = String::new();
        while let Some(&letter) = chars.peek() {
            if !letter.is_alphabetic() {
                break;
            }
            word.push(letter);
            chars.next();
        }

        let value = number.trim_end_matches('.').parse::<f64>().ok();
        if let (Some(value), Some(unit)) = (value, Unit::from_word(&word)) {
            total += value * unit.seconds();
            matched = true;
        }
    }

    if !matched {
        return None;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "Sum of non-negative unit values rounded to whole seconds"
    )]
    let seconds = total.round() as u64;
    Some(seconds.max(1))
}
