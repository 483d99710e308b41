//! Keyword heuristics over DPR text, shared by the local text extractor
//! and the free-text analyzer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BUDGET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)budget|cost|finance").unwrap());
static TIMELINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)timeline|duration|month").unwrap());
static MANPOWER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)manpower|team|staff").unwrap());

/// Word count above which a report counts as detailed.
pub const DETAILED_WORD_THRESHOLD: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthClass {
    Brief,
    Detailed,
}

impl LengthClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthClass::Brief => "Brief",
            LengthClass::Detailed => "Detailed",
        }
    }
}

/// Which of the expected DPR sections the text mentions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionCoverage {
    pub budget: bool,
    pub timeline: bool,
    pub manpower: bool,
}

impl SectionCoverage {
    pub fn detect(text: &str) -> Self {
        Self {
            budget: BUDGET_RE.is_match(text),
            timeline: TIMELINE_RE.is_match(text),
            manpower: MANPOWER_RE.is_match(text),
        }
    }

    pub fn present(&self) -> usize {
        [self.budget, self.timeline, self.manpower]
            .iter()
            .filter(|p| **p)
            .count()
    }

    /// Fraction of the three sections present.
    pub fn ratio(&self) -> f64 {
        self.present() as f64 / 3.0
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn length_class(words: usize) -> LengthClass {
    if words > DETAILED_WORD_THRESHOLD {
        LengthClass::Detailed
    } else {
        LengthClass::Brief
    }
}
