//! Column-name heuristics mapping CSV headers to channel roles.
//!
//! Roles are resolved once per table into a [`Classification`]. The time column
//! is chosen first; among the remaining columns Ignored beats EEG, which beats
//! ECG, which beats CommonMode. The numeric fallback only runs when no header
//! matched an EEG electrode label.

use crate::table::Table;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// 10-20 electrode labels plus the A1/A2 ear references, in matching order.
pub const EEG_LABELS: [&str; 21] = [
    "Fz", "Cz", "P3", "C3", "F3", "F4", "C4", "P4", "Fp1", "Fp2", "T3", "T4", "T5", "T6", "O1",
    "O2", "F7", "F8", "A1", "A2", "Pz",
];

pub const ECG_WORDS: &[&str] = &["x1", "x2", "leog", "reog"];

pub const COMMON_MODE_WORDS: &[&str] = &["cm"];

pub const COMMON_MODE_PHRASES: &[&str] = &["common mode", "common_mode", "commonmode"];

pub const IGNORE_WORDS: &[&str] = &[
    "x3",
    "trigger",
    "time_offset",
    "timeoffset",
    "adc_status",
    "adcstatus",
    "adc_sequence",
    "adcsequence",
    "event",
    "comments",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    Time,
    Eeg,
    Ecg,
    CommonMode,
    Ignored,
    Unclassified,
}

impl ChannelRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChannelRole::Time => "Time",
            ChannelRole::Eeg => "EEG",
            ChannelRole::Ecg => "ECG",
            ChannelRole::CommonMode => "CM",
            ChannelRole::Ignored => "Ignored",
            ChannelRole::Unclassified => "Unclassified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Letter,
    Digit,
}

fn char_class(ch: char) -> Option<CharClass> {
    if ch.is_alphabetic() {
        Some(CharClass::Letter)
    } else if ch.is_numeric() {
        Some(CharClass::Digit)
    } else {
        None
    }
}

/// Whether `neighbor` would extend a token ending with `edge`.
fn continues(neighbor: Option<char>, edge: Option<char>) -> bool {
    match (neighbor.and_then(char_class), edge.and_then(char_class)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Case-insensitive whole-word search. A hit is rejected when any letter or
/// digit precedes it, or when the character after has the same class
/// (letter/digit) as the word's last character. So `cm` matches `CM1` and
/// `cm ref` but not `comments` or `10cm`, and `x1` matches neither `X12` nor `2x1`.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    let hay = haystack.to_lowercase();
    let needle = word.to_lowercase();
    if needle.is_empty() {
        return false;
    }
    let last = needle.chars().next_back();
    hay.char_indices().any(|(start, _)| {
        if !hay[start..].starts_with(&needle) {
            return false;
        }
        let before = hay[..start].chars().next_back();
        let after = hay[start + needle.len()..].chars().next();
        before.and_then(char_class).is_none() && !continues(after, last)
    })
}

/// Case-insensitive plain substring search.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.to_lowercase().contains(&phrase.to_lowercase())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pattern {
    Word(String),
    Phrase(String),
}

impl Pattern {
    pub fn word(text: impl Into<String>) -> Self {
        Pattern::Word(text.into())
    }

    pub fn phrase(text: impl Into<String>) -> Self {
        Pattern::Phrase(text.into())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            Pattern::Word(word) => contains_word(name, word),
            Pattern::Phrase(phrase) => contains_phrase(name, phrase),
        }
    }
}

fn words(list: &[&str]) -> Vec<Pattern> {
    list.iter().map(|w| Pattern::word(*w)).collect()
}

/// Pattern lists for each role. `Default` yields the built-in heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    pub eeg: Vec<Pattern>,
    pub ecg: Vec<Pattern>,
    pub common_mode: Vec<Pattern>,
    pub ignore: Vec<Pattern>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let mut common_mode = words(COMMON_MODE_WORDS);
        common_mode.extend(COMMON_MODE_PHRASES.iter().map(|p| Pattern::phrase(*p)));
        Self {
            eeg: words(&EEG_LABELS),
            ecg: words(ECG_WORDS),
            common_mode,
            ignore: words(IGNORE_WORDS),
        }
    }
}

impl RuleSet {
    /// Append extra whole-word patterns after the built-in ones.
    pub fn extended(
        mut self,
        eeg: &[String],
        ecg: &[String],
        common_mode: &[String],
        ignore: &[String],
    ) -> Self {
        self.eeg.extend(eeg.iter().map(Pattern::word));
        self.ecg.extend(ecg.iter().map(Pattern::word));
        self.common_mode.extend(common_mode.iter().map(Pattern::word));
        self.ignore.extend(ignore.iter().map(Pattern::word));
        self
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|p| p.matches(name))
    }

    /// Pattern-major scan: for each pattern in order, every matching column in
    /// table order. Duplicates keep their first position.
    fn scan<'a>(patterns: &[Pattern], names: &[&'a str]) -> Vec<&'a str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for pattern in patterns {
            for name in names {
                if pattern.matches(name) && seen.insert(*name) {
                    out.push(*name);
                }
            }
        }
        out
    }

    /// Column-major scan: columns in table order matching any pattern.
    fn filter<'a>(patterns: &[Pattern], names: &[&'a str]) -> Vec<&'a str> {
        names
            .iter()
            .copied()
            .filter(|name| patterns.iter().any(|p| p.matches(name)))
            .collect()
    }
}

/// First column whose name contains "time" (any case), else the first column.
pub fn find_time_column<'a>(names: &[&'a str]) -> Option<&'a str> {
    names
        .iter()
        .copied()
        .find(|name| name.to_lowercase().contains("time"))
        .or_else(|| names.first().copied())
}

/// Roles resolved for every column of a table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub time: Option<String>,
    pub eeg: Vec<String>,
    pub ecg: Vec<String>,
    pub common_mode: Vec<String>,
    pub ignored: Vec<String>,
    pub unclassified: Vec<String>,
    /// True when EEG came from the numeric fallback rather than label matches.
    pub eeg_fallback: bool,
}

impl Classification {
    pub fn role_of(&self, name: &str) -> ChannelRole {
        let has = |group: &[String]| group.iter().any(|c| c == name);
        if self.time.as_deref() == Some(name) {
            ChannelRole::Time
        } else if has(&self.ignored) {
            ChannelRole::Ignored
        } else if has(&self.eeg) {
            ChannelRole::Eeg
        } else if has(&self.ecg) {
            ChannelRole::Ecg
        } else if has(&self.common_mode) {
            ChannelRole::CommonMode
        } else {
            ChannelRole::Unclassified
        }
    }

    pub fn plottable_count(&self) -> usize {
        self.eeg.len() + self.ecg.len() + self.common_mode.len()
    }
}

/// Classify column names only. `is_numeric` answers the fallback's type question
/// for a column name.
pub fn classify_names(
    names: &[&str],
    rules: &RuleSet,
    is_numeric: impl Fn(&str) -> bool,
) -> Classification {
    let time = find_time_column(names);
    let ignored: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| rules.is_ignored(name))
        .collect();
    let is_ignored = |name: &str| ignored.contains(&name);
    let is_time = |name: &str| time == Some(name);

    let mut eeg: Vec<&str> = RuleSet::scan(&rules.eeg, names)
        .into_iter()
        .filter(|n| !is_ignored(*n) && !is_time(*n))
        .collect();
    let ecg: Vec<&str> = RuleSet::filter(&rules.ecg, names)
        .into_iter()
        .filter(|n| !is_ignored(*n) && !is_time(*n) && !eeg.contains(n))
        .collect();
    let common_mode: Vec<&str> = RuleSet::filter(&rules.common_mode, names)
        .into_iter()
        .filter(|n| !is_ignored(*n) && !is_time(*n) && !eeg.contains(n) && !ecg.contains(n))
        .collect();

    let mut eeg_fallback = false;
    if eeg.is_empty() {
        eeg = names
            .iter()
            .copied()
            .filter(|n| {
                !is_time(*n)
                    && !is_ignored(*n)
                    && !ecg.contains(n)
                    && !common_mode.contains(n)
                    && is_numeric(*n)
            })
            .collect();
        eeg_fallback = !eeg.is_empty();
        if eeg_fallback {
            info!("no EEG labels matched; using {} numeric column(s)", eeg.len());
        }
    }

    let unclassified: Vec<&str> = names
        .iter()
        .copied()
        .filter(|n| {
            !is_time(*n)
                && !is_ignored(*n)
                && !eeg.contains(n)
                && !ecg.contains(n)
                && !common_mode.contains(n)
        })
        .collect();
    for name in &unclassified {
        debug!("column '{}' left unclassified", name);
    }

    Classification {
        time: time.map(str::to_string),
        eeg: owned(eeg),
        ecg: owned(ecg),
        common_mode: owned(common_mode),
        ignored: owned(ignored),
        unclassified: owned(unclassified),
        eeg_fallback,
    }
}

fn owned(list: Vec<&str>) -> Vec<String> {
    list.into_iter().map(str::to_string).collect()
}

/// Classify the columns of a loaded table.
pub fn classify_table(table: &Table, rules: &RuleSet) -> Classification {
    let names = table.column_names();
    classify_names(&names, rules, |name| {
        table.column(name).map(|c| c.is_numeric()).unwrap_or(false)
    })
}
