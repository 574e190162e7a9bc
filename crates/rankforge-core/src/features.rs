//! Deterministic quality features for short profile text.
//!
//! Maps a text snippet plus its section type ("headline", "summary",
//! "readme", ...) to six named scores in [0, 1]. The extraction is a pure
//! function: same input, same output, no I/O, never fails. Degenerate input
//! (empty or whitespace-only text) resolves to [`FeatureVector::floor`].

use std::sync::LazyLock;

use regex::Regex;

/// Individual feature names. [`FEATURE_NAMES`] is built from these so that
/// consumers can reference a single name without restating the string.
pub mod feature {
    pub const CLARITY: &str = "clarity";
    pub const IMPACT: &str = "impact";
    pub const RELEVANCE: &str = "relevance";
    pub const READABILITY: &str = "readability";
    pub const KEYWORD_DENSITY: &str = "keyword_density";
    pub const COMPLETENESS: &str = "completeness";
}

/// Canonical feature names in canonical order.
///
/// Single source of truth for the feature vocabulary: the dataset export,
/// the model input layout, and metric validation all read from here.
pub const FEATURE_NAMES: [&str; 6] = [
    feature::CLARITY,
    feature::IMPACT,
    feature::RELEVANCE,
    feature::READABILITY,
    feature::KEYWORD_DENSITY,
    feature::COMPLETENESS,
];

/// Relevance never drops below this, regardless of content.
///
/// Smoothing choice inherited from the scoring design: off-domain text
/// still reads as mostly relevant so that downstream weighted sums never
/// zero out on the relevance term.
pub const RELEVANCE_FLOOR: f32 = 0.7;

// Sentence-length window for clarity: 0 at or below LOW words per
// sentence, 1 at or above HIGH.
const CLARITY_LEN_LOW: f32 = 4.0;
const CLARITY_LEN_HIGH: f32 = 11.0;

// Readability sentence-length window: 1 at or below SHORT words per
// sentence, 0 at or beyond LONG.
const READABLE_SENT_SHORT: f32 = 8.0;
const READABLE_SENT_LONG: f32 = 30.0;

// Target average word length for readability, with full credit at the
// target and zero credit 4 characters away.
const READABLE_WORD_TARGET: f32 = 5.0;
const READABLE_WORD_SPAN: f32 = 4.0;

// Optimal repeated-word ratio for keyword density.
const OPTIMAL_REPEAT_RATIO: f32 = 0.10;

const ACTION_VERB_STEMS: &[&str] = &[
    "built", "build", "creat", "design", "develop", "implement", "launch",
    "deliver", "migrat", "led", "lead", "ship", "architect", "automat",
    "engineer", "wrote", "writ", "refactor",
];

const IMPACT_VERB_STEMS: &[&str] = &[
    "increas", "reduc", "improv", "optimi", "sav", "grew", "grow",
    "accelerat", "streamlin", "boost", "cut", "scal", "doubl", "tripl",
];

const LEADERSHIP_VERB_STEMS: &[&str] = &[
    "led", "lead", "manag", "mentor", "direct", "coordinat", "supervis",
    "found", "head", "drove", "driv", "own",
];

const TECH_KEYWORDS: &[&str] = &[
    "rust", "python", "typescript", "javascript", "java", "go", "kotlin",
    "kubernetes", "docker", "aws", "gcp", "azure", "terraform", "api",
    "sql", "database", "microservice", "pipeline", "ci/cd", "cloud",
    "react", "node", "linux", "backend", "frontend", "distributed", "grpc",
    "graphql", "redis", "kafka", "ml", "llm", "data",
];

const CTA_PHRASES: &[&str] = &[
    "contact", "reach out", "let's connect", "get in touch", "connect with me",
];

static PASSIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:was|were|is|are|been|being|be)\s+\w+(?:ed|en)\b")
        .expect("passive-voice pattern")
});

static MAGNITUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\d+(?:\.\d+)?\s*%|\$\s*\d|\b\d+(?:\.\d+)?\s*(?:k|m|x|million|billion)\b|\b\d{4,}\b",
    )
    .expect("magnitude pattern")
});

static CONTACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\w.+-]+@[\w-]+\.\w+|https?://|\b\+?\d[\d\s().-]{7,}\d\b")
        .expect("contact pattern")
});

/// Bundled reference sample that scores high on every feature.
/// Paired with [`LOW_QUALITY_SAMPLE`] in the monotonicity self-check.
pub const HIGH_QUALITY_SAMPLE: &str = "Led migration of a legacy platform \
to Kubernetes, reducing deploy time by 75% and saving $2M annually. Built \
CI/CD pipelines in Rust and Python for 40+ microservices. Mentored 12 \
engineers across three teams. Contact: jane@example.com.";

/// Bundled reference sample that scores low on every feature.
pub const LOW_QUALITY_SAMPLE: &str = "i do work stuff and i do work tasks \
and i do work things. it was given to me and it was being handled by me.";

/// The six canonical features for one text snippet, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub clarity: f32,
    pub impact: f32,
    pub relevance: f32,
    pub readability: f32,
    pub keyword_density: f32,
    pub completeness: f32,
}

impl FeatureVector {
    /// Values in [`FEATURE_NAMES`] order.
    pub fn ordered(&self) -> [f32; FEATURE_NAMES.len()] {
        [
            self.clarity,
            self.impact,
            self.relevance,
            self.readability,
            self.keyword_density,
            self.completeness,
        ]
    }

    /// The pinned floor vector returned for empty or whitespace-only text.
    pub fn floor() -> Self {
        Self {
            clarity: 0.0,
            impact: 0.0,
            relevance: RELEVANCE_FLOOR,
            readability: 0.0,
            keyword_density: 0.0,
            completeness: 0.0,
        }
    }
}

/// Extract the canonical feature vector from `text` for the given section
/// type. Pure and infallible.
pub fn extract(text: &str, section: &str) -> FeatureVector {
    let words = tokenize(text);
    if words.is_empty() {
        return FeatureVector::floor();
    }

    let lower = text.to_lowercase();
    let sentence_count = count_sentences(text);
    let avg_sentence_len = words.len() as f32 / sentence_count as f32;
    let avg_word_len =
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f32 / words.len() as f32;

    FeatureVector {
        clarity: clarity(&words, text, avg_sentence_len),
        impact: impact(&words, text),
        relevance: relevance(&words),
        readability: readability(text, avg_word_len, avg_sentence_len),
        keyword_density: keyword_density(&words),
        completeness: completeness(text, &lower, section),
    }
}

// ── Individual features ──

fn clarity(words: &[String], text: &str, avg_sentence_len: f32) -> f32 {
    let len_score = ramp(avg_sentence_len, CLARITY_LEN_LOW, CLARITY_LEN_HIGH);
    let action = presence(words.iter().any(|w| stem_match(w, ACTION_VERB_STEMS)));
    let numeral = presence(text.chars().any(|c| c.is_ascii_digit()));
    0.5 * len_score + 0.3 * action + 0.2 * numeral
}

fn impact(words: &[String], text: &str) -> f32 {
    let impact_verbs = words
        .iter()
        .filter(|w| stem_match(w, IMPACT_VERB_STEMS))
        .count()
        .min(3) as f32;
    let leadership = words
        .iter()
        .filter(|w| stem_match(w, LEADERSHIP_VERB_STEMS))
        .count()
        .min(2) as f32;
    let magnitude = presence(MAGNITUDE_RE.is_match(text));
    (0.15 * impact_verbs + 0.3 * magnitude + 0.125 * leadership).min(1.0)
}

fn relevance(words: &[String]) -> f32 {
    let hits = words
        .iter()
        .filter(|w| TECH_KEYWORDS.iter().any(|k| w.starts_with(k)))
        .count() as f32;
    let density = hits / words.len() as f32;
    RELEVANCE_FLOOR + (2.0 * density).min(1.0 - RELEVANCE_FLOOR)
}

fn readability(text: &str, avg_word_len: f32, avg_sentence_len: f32) -> f32 {
    let word_score =
        (1.0 - (avg_word_len - READABLE_WORD_TARGET).abs() / READABLE_WORD_SPAN).clamp(0.0, 1.0);
    let sent_score = 1.0 - ramp(avg_sentence_len, READABLE_SENT_SHORT, READABLE_SENT_LONG);
    let passive = PASSIVE_RE.find_iter(text).count().min(3) as f32;
    (0.4 * word_score + 0.4 * sent_score + 0.2 - 0.1 * passive).clamp(0.0, 1.0)
}

fn keyword_density(words: &[String]) -> f32 {
    let mut unique: Vec<&str> = words.iter().map(String::as_str).collect();
    unique.sort_unstable();
    unique.dedup();
    let unique_ratio = unique.len() as f32 / words.len() as f32;
    let repeat_ratio = 1.0 - unique_ratio;
    // Linear penalty for deviating from the optimal repetition target.
    let closeness = 1.0
        - ((repeat_ratio - OPTIMAL_REPEAT_RATIO).abs() / (1.0 - OPTIMAL_REPEAT_RATIO))
            .clamp(0.0, 1.0);
    0.5 * unique_ratio + 0.5 * closeness
}

fn completeness(text: &str, lower: &str, section: &str) -> f32 {
    let (min_len, optimal_len) = section_thresholds(section);
    let len = text.trim().chars().count() as f32;

    let length_score = if len < min_len {
        0.5 * len / min_len
    } else if len < optimal_len {
        0.5 + 0.5 * (len - min_len) / (optimal_len - min_len)
    } else {
        1.0
    };

    let mut score = 0.8 * length_score;
    if CONTACT_RE.is_match(text) {
        score += 0.1;
    }
    if has_structure(text) {
        score += 0.05;
    }
    if CTA_PHRASES.iter().any(|p| lower.contains(p)) {
        score += 0.05;
    }
    score.min(1.0)
}

/// Per-section (min, optimal) character-length thresholds.
fn section_thresholds(section: &str) -> (f32, f32) {
    match section.to_ascii_lowercase().as_str() {
        "headline" | "title" => (40.0, 120.0),
        "summary" | "bio" | "about" => (120.0, 500.0),
        "readme" => (200.0, 1200.0),
        "experience" => (100.0, 400.0),
        _ => (80.0, 400.0),
    }
}

// ── Text helpers ──

/// Lowercased tokens with leading/trailing punctuation stripped.
fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

fn count_sentences(text: &str) -> usize {
    let n = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    n.max(1)
}

fn stem_match(word: &str, stems: &[&str]) -> bool {
    stems.iter().any(|s| word.starts_with(s))
}

fn has_structure(text: &str) -> bool {
    text.lines()
        .any(|l| matches!(l.trim_start().chars().next(), Some('-' | '*' | '#' | '•')))
}

/// Linear ramp: 0 at or below `low`, 1 at or above `high`.
fn ramp(value: f32, low: f32, high: f32) -> f32 {
    ((value - low) / (high - low)).clamp(0.0, 1.0)
}

fn presence(found: bool) -> f32 {
    if found { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_in_range(fv: &FeatureVector) {
        for (name, value) in FEATURE_NAMES.iter().zip(fv.ordered()) {
            assert!(
                (0.0..=1.0).contains(&value),
                "{name} out of range: {value}"
            );
        }
    }

    #[test]
    fn empty_text_yields_floor_vector() {
        let fv = extract("", "summary");
        assert_eq!(fv, FeatureVector::floor());
        assert_eq!(fv.ordered(), [0.0, 0.0, RELEVANCE_FLOOR, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn whitespace_text_yields_floor_vector() {
        assert_eq!(extract("   \n\t  ", "readme"), FeatureVector::floor());
    }

    #[test]
    fn punctuation_only_text_yields_floor_vector() {
        assert_eq!(extract("... !!! ???", "headline"), FeatureVector::floor());
    }

    #[test]
    fn all_features_in_range_for_varied_inputs() {
        let inputs = [
            ("x", "headline"),
            ("Short headline about Rust tooling", "headline"),
            (HIGH_QUALITY_SAMPLE, "summary"),
            (LOW_QUALITY_SAMPLE, "summary"),
            ("a a a a a a a a a a a a a a a a", "bio"),
            ("# Project\n- bullet one\n- bullet two\nhttps://example.com", "readme"),
            ("Numbers 1234567 $99 50% everywhere 10x", "experience"),
        ];
        for (text, section) in inputs {
            all_in_range(&extract(text, section));
        }
    }

    /// Built-in monotonicity property: the bundled high-quality sample must
    /// strictly dominate the bundled low-quality sample on every feature.
    #[test]
    fn high_quality_sample_dominates_low_on_every_feature() {
        let high = extract(HIGH_QUALITY_SAMPLE, "summary");
        let low = extract(LOW_QUALITY_SAMPLE, "summary");
        for ((name, h), l) in FEATURE_NAMES.iter().zip(high.ordered()).zip(low.ordered()) {
            assert!(
                h > l,
                "{name}: expected high ({h:.3}) > low ({l:.3})"
            );
        }
    }

    #[test]
    fn relevance_floor_holds_for_off_domain_text() {
        let fv = extract("the quick brown fox jumps over the lazy dog", "summary");
        assert_eq!(fv.relevance, RELEVANCE_FLOOR);
    }

    #[test]
    fn relevance_bonus_is_capped() {
        let fv = extract("rust python kubernetes docker aws sql", "summary");
        assert!(fv.relevance <= 1.0);
        assert!(fv.relevance > RELEVANCE_FLOOR);
    }

    #[test]
    fn impact_detects_magnitude_patterns() {
        let with = extract("Reduced costs by 40% this year", "experience");
        let without = extract("Worked on several projects this year", "experience");
        assert!(with.impact > without.impact);
    }

    #[test]
    fn passive_voice_lowers_readability() {
        let active = extract("We shipped the feature and users loved it.", "summary");
        let passive = extract(
            "The feature was shipped by the team and it was taken by users.",
            "summary",
        );
        assert!(active.readability > passive.readability);
    }

    #[test]
    fn completeness_rewards_section_appropriate_length() {
        let short = extract("Engineer", "headline");
        let full = extract(
            "Senior platform engineer building Rust services at scale",
            "headline",
        );
        assert!(full.completeness > short.completeness);
    }

    #[test]
    fn completeness_contact_bonus() {
        let base = "A summary of reasonable length that talks about building \
                    software systems and shipping features to production users.";
        let with_contact = format!("{base} Email me at dev@example.com.");
        let a = extract(base, "summary");
        let b = extract(&with_contact, "summary");
        assert!(b.completeness > a.completeness);
    }

    #[test]
    fn ordered_matches_feature_names() {
        let fv = extract(HIGH_QUALITY_SAMPLE, "summary");
        assert_eq!(fv.ordered().len(), FEATURE_NAMES.len());
        assert_eq!(fv.ordered()[0], fv.clarity);
        assert_eq!(fv.ordered()[5], fv.completeness);
    }

    #[test]
    fn extraction_is_deterministic() {
        let a = extract(HIGH_QUALITY_SAMPLE, "summary");
        let b = extract(HIGH_QUALITY_SAMPLE, "summary");
        assert_eq!(a, b);
    }
}
