//! Relevance scorer (C5): turns a URL, its fetched text, its incoming
//! links, and its frontier depth into a score in `[0, 1]`.

use crate::config::VocabularyConfig;
use crate::state::Utema;
use regex::Regex;
use std::sync::OnceLock;

/// Non-document extensions the URL score zeroes out immediately: media,
/// archives, fonts, office docs, PDFs, feeds, and common script/style
/// assets.
const NON_DOCUMENT_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "mp3", "mp4", "wav", "avi", "mov",
    "mkv", "webm", "zip", "tar", "gz", "rar", "7z", "woff", "woff2", "ttf", "eot", "otf", "doc",
    "docx", "xls", "xlsx", "ppt", "pptx", "pdf", "xml", "rss", "atom", "js", "css", "json",
];

/// Path substrings treated as API/admin surfaces, never worth crawling
/// for relevance.
const SKIP_PATH_PATTERNS: &[&str] = &[
    "/api/", "/wp-admin/", "/wp-json/", "/admin/", "/cgi-bin/", "/_next/", "/graphql",
];

const URL_KEYWORDS: &[&str] = &["tuebingen", "tübingen", "uni-tuebingen", "tue"];

/// Computes the on-URL-only priority used for frontier admission and
/// re-scheduling. Independent of fetched content, so it's cheap enough to
/// run for every discovered link.
///
/// Returns `0.0` immediately for non-document extensions or API/admin-like
/// paths — callers treat a zero url-score as a short-circuit to a zero
/// final score.
pub fn url_score(url: &str, parent_score: Option<f64>) -> f64 {
    let lower = url.to_lowercase();

    if has_non_document_extension(&lower) || has_skip_pattern(&lower) {
        return 0.0;
    }

    let mut score = 0.0;

    if URL_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        score += 0.05;
    }

    if lower.contains("/en/") || lower.ends_with("/en") {
        score += 0.02;
    }

    if let Some(parent) = parent_score {
        score += 0.2 * parent;
    }

    let path = url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();
    let slash_count = path.matches('/').count();
    if slash_count > 6 {
        score -= 0.05 * (slash_count as f64 - 6.0);
    }

    score.clamp(0.0, 1.0)
}

fn has_non_document_extension(lower_url: &str) -> bool {
    let path = lower_url.split(['?', '#']).next().unwrap_or(lower_url);
    match path.rsplit('.').next() {
        Some(ext) if ext != path => NON_DOCUMENT_EXTENSIONS.contains(&ext),
        _ => false,
    }
}

fn has_skip_pattern(lower_url: &str) -> bool {
    SKIP_PATH_PATTERNS.iter().any(|p| lower_url.contains(p))
}

/// Whether `url` matches the frontier's skip list: a non-document
/// extension or an API/admin-like path. Shared between the scorer's
/// early-zero return (§4.5) and the scheduler's admission contract (§4.7),
/// which reject on this independently of whatever score a passing URL
/// would otherwise get.
pub fn matches_skip_list(url: &str) -> bool {
    let lower = url.to_lowercase();
    has_non_document_extension(&lower) || has_skip_pattern(&lower)
}

/// German function words checked against English ones for the
/// English-likelihood heuristic. Short, high-frequency words so the
/// counts are meaningful even over a small sample.
const ENGLISH_FUNCTION_WORDS: &[&str] = &[
    "the", "and", "of", "to", "in", "is", "that", "for", "it", "with", "as", "was", "on",
];
const GERMAN_FUNCTION_WORDS: &[&str] = &[
    "der", "die", "das", "und", "ist", "nicht", "mit", "ein", "eine", "den", "dem", "von", "zu",
];

/// Sample window for the English-likelihood heuristic.
const LANGUAGE_SAMPLE_CHARS: usize = 1000;

/// Computes the text score: vocabulary term hits plus an English-likelihood
/// penalty plus a length/structure quality term, clamped to `[0, 1]`.
pub fn text_score(text: &str, vocabulary: &VocabularyConfig) -> f64 {
    let mut score = 0.0;

    // Per-category bonus, capped at one match per category rather than
    // per term, for each of the two non-institute categories. Faculty
    // terms fold into the university check rather than scoring their own
    // tier: on their own they're generic academic vocabulary ("professor",
    // "dean", "department") with no Tübingen qualifier, so a bare
    // faculty-term hit shouldn't independently move the score.
    let university_hit = category_hit(text, &vocabulary.university_terms)
        || category_hit(text, &vocabulary.faculty_terms);
    for hit in [category_hit(text, &vocabulary.city_terms), university_hit] {
        if hit {
            score += 0.20;
        }
    }
    if category_hit(text, &vocabulary.institute_terms) {
        score += 0.15;
    }

    if !looks_english(text) {
        score -= 0.3;
    }

    score += quality_term(text);

    score.clamp(0.0, 1.0)
}

fn category_hit(text: &str, terms: &[String]) -> bool {
    terms.iter().any(|term| term_regex(term).is_match(text))
}

/// Builds (and caches) a case-insensitive word-boundary regex for a
/// vocabulary term. Terms are short, static, and re-used across every page
/// scored in a run, so a tiny per-term cache avoids recompiling the same
/// pattern thousands of times.
fn term_regex(term: &str) -> &'static Regex {
    static CACHE: OnceLock<std::sync::Mutex<std::collections::HashMap<String, &'static Regex>>> =
        OnceLock::new();
    let cache = CACHE.get_or_init(|| std::sync::Mutex::new(std::collections::HashMap::new()));
    let mut guard = cache.lock().unwrap();
    if let Some(re) = guard.get(term) {
        return re;
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
    let compiled: &'static Regex = Box::leak(Box::new(Regex::new(&pattern).unwrap()));
    guard.insert(term.to_string(), compiled);
    compiled
}

/// Fast English-vs-German heuristic over a bounded sample: counts common
/// English function words against common German ones and calls it English
/// when the English count is not lower.
fn looks_english(text: &str) -> bool {
    let sample: String = text.chars().take(LANGUAGE_SAMPLE_CHARS).collect();
    let lower = sample.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    if words.is_empty() {
        return true;
    }

    let english_hits = words
        .iter()
        .filter(|w| ENGLISH_FUNCTION_WORDS.contains(w))
        .count();
    let german_hits = words
        .iter()
        .filter(|w| GERMAN_FUNCTION_WORDS.contains(w))
        .count();

    if english_hits == 0 && german_hits == 0 {
        // No evidence either way: don't penalize short or word-list-free
        // pages (titles, short snippets) just for lacking function words.
        return true;
    }

    english_hits >= german_hits
}

/// Targets for the length/structure quality term.
const TARGET_WORD_COUNT: f64 = 300.0;
const MIN_WORD_COUNT: f64 = 50.0;
const TARGET_WORDS_PER_SENTENCE: f64 = 20.0;

/// Rewards pages with a plausible amount of substantive prose and
/// penalizes ones that are implausibly short, implausibly long, or read
/// like navigation boilerplate (very short "sentences").
fn quality_term(text: &str) -> f64 {
    let word_count = text.split_whitespace().count() as f64;
    if word_count == 0.0 {
        return -2.0;
    }

    let sentence_count = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1) as f64;
    let words_per_sentence = word_count / sentence_count;

    let length_term = if word_count < MIN_WORD_COUNT {
        -2.0 * (1.0 - word_count / MIN_WORD_COUNT)
    } else {
        let ratio = (word_count / TARGET_WORD_COUNT).min(2.0);
        0.1 * (1.0 - (ratio - 1.0).abs()).max(0.0)
    };

    let structure_term = if words_per_sentence < 3.0 {
        -0.2
    } else {
        0.05 * (1.0 - (words_per_sentence - TARGET_WORDS_PER_SENTENCE).abs() / TARGET_WORDS_PER_SENTENCE)
            .max(-1.0)
    };

    (length_term + structure_term).clamp(-2.0, 0.1)
}

/// Computes the incoming-links score: the proportion of incoming parents
/// whose score exceeds the mean of the incoming set, clamped to `[0, 1]`.
pub fn incoming_score(incoming: &[(String, f64)]) -> f64 {
    if incoming.is_empty() {
        return 0.0;
    }

    let mean = incoming.iter().map(|(_, s)| s).sum::<f64>() / incoming.len() as f64;
    let above_mean = incoming.iter().filter(|(_, s)| *s > mean).count();

    (above_mean as f64 / incoming.len() as f64).clamp(0.0, 1.0)
}

/// Depth penalty: `max(0, 1 - 0.1 * linking_depth)`, with a hard cutoff of
/// `0.0` once `linking_depth > 7`.
pub fn depth_penalty(linking_depth: u32) -> f64 {
    if linking_depth > 7 {
        return 0.0;
    }
    (1.0 - 0.1 * linking_depth as f64).max(0.0)
}

/// Inputs to the final weighted score.
pub struct ScoreInputs<'a> {
    pub url: &'a str,
    pub parent_score: Option<f64>,
    pub text: &'a str,
    pub incoming: &'a [(String, f64)],
    pub linking_depth: u32,
}

/// Computes the unsmoothed final score: the weighted sum of URL, text,
/// incoming-link, and depth-penalty components. A zero URL score
/// short-circuits the whole thing to zero, per the URL score's role as an
/// admissibility gate.
pub fn final_score(inputs: &ScoreInputs, vocabulary: &VocabularyConfig) -> f64 {
    let url = url_score(inputs.url, inputs.parent_score);
    if url == 0.0 {
        return 0.0;
    }

    let text = text_score(inputs.text, vocabulary);
    let incoming = incoming_score(inputs.incoming);
    let depth = depth_penalty(inputs.linking_depth);

    (0.2 * url + 0.5 * text + 0.2 * incoming + 0.07 * depth).clamp(0.0, 1.0)
}

/// Smooths a domain's raw final scores through its own UTEMA, separate
/// from the classifier's distress UTEMA for that same host.
pub struct Scorer {
    beta: f64,
}

impl Scorer {
    pub fn new(beta: f64) -> Self {
        Scorer { beta }
    }

    /// Scores one page and folds the result into `domain_utema`, returning
    /// the smoothed value that gets persisted.
    pub fn score(
        &self,
        inputs: &ScoreInputs,
        vocabulary: &VocabularyConfig,
        domain_utema: &mut Utema,
    ) -> f64 {
        let raw = final_score(inputs, vocabulary);
        domain_utema.update(raw);
        domain_utema.average()
    }

    pub fn new_domain_utema(&self) -> Utema {
        Utema::new(self.beta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> VocabularyConfig {
        VocabularyConfig {
            city_terms: vec!["tübingen".to_string(), "neckar".to_string()],
            university_terms: vec!["university".to_string()],
            faculty_terms: vec!["faculty of science".to_string()],
            institute_terms: vec!["max planck institute".to_string()],
            priority_domains: vec![],
            excluded_domains: vec![],
        }
    }

    #[test]
    fn url_score_rewards_keyword() {
        let score = url_score("https://example.com/tuebingen/info", None);
        assert!(score > 0.0);
    }

    #[test]
    fn url_score_zero_for_pdf() {
        assert_eq!(url_score("https://example.com/file.pdf", None), 0.0);
    }

    #[test]
    fn url_score_zero_for_admin_path() {
        assert_eq!(url_score("https://example.com/wp-admin/edit", None), 0.0);
    }

    #[test]
    fn matches_skip_list_catches_extension_and_path() {
        assert!(matches_skip_list("https://example.com/file.pdf"));
        assert!(matches_skip_list("https://example.com/api/v1/users"));
        assert!(!matches_skip_list("https://example.com/tuebingen/info"));
    }

    #[test]
    fn url_score_inherits_parent() {
        let with_parent = url_score("https://example.com/page", Some(0.8));
        let without_parent = url_score("https://example.com/page", None);
        assert!(with_parent > without_parent);
    }

    #[test]
    fn url_score_penalizes_deep_paths() {
        let shallow = url_score("https://example.com/a/b", None);
        let deep = url_score("https://example.com/a/b/c/d/e/f/g/h/i", None);
        assert!(deep <= shallow);
    }

    #[test]
    fn text_score_rewards_city_term() {
        let text = "Welcome to Tübingen, a historic university town.";
        let score = text_score(text, &vocab());
        assert!(score > 0.5);
    }

    #[test]
    fn text_score_penalizes_german_text() {
        let english = "The university in Tübingen welcomes students and researchers from around the world every single year.";
        let german = "Die Universität in Tübingen begrüßt Studenten und Forscher aus der ganzen Welt jedes einzelne Jahr und das ist schön.";
        assert!(text_score(english, &vocab()) > text_score(german, &vocab()));
    }

    #[test]
    fn incoming_score_empty_is_zero() {
        assert_eq!(incoming_score(&[]), 0.0);
    }

    #[test]
    fn incoming_score_above_mean_proportion() {
        let incoming = vec![
            ("a".to_string(), 0.1),
            ("b".to_string(), 0.9),
            ("c".to_string(), 0.9),
        ];
        let score = incoming_score(&incoming);
        assert!((score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn depth_penalty_decreases_with_depth() {
        assert!(depth_penalty(0) > depth_penalty(5));
        assert_eq!(depth_penalty(8), 0.0);
        assert_eq!(depth_penalty(20), 0.0);
    }

    #[test]
    fn final_score_zero_when_url_score_zero() {
        let inputs = ScoreInputs {
            url: "https://example.com/file.pdf",
            parent_score: None,
            text: "Tübingen university",
            incoming: &[],
            linking_depth: 0,
        };
        assert_eq!(final_score(&inputs, &vocab()), 0.0);
    }

    #[test]
    fn final_score_positive_for_relevant_page() {
        let inputs = ScoreInputs {
            url: "https://example.com/tuebingen/campus",
            parent_score: Some(0.5),
            text: "The university in Tübingen is located on the Neckar river.",
            incoming: &[("https://example.com/".to_string(), 0.6)],
            linking_depth: 1,
        };
        assert!(final_score(&inputs, &vocab()) > 0.0);
    }

    #[test]
    fn scorer_smooths_across_calls() {
        let scorer = Scorer::new(0.3);
        let mut utema = scorer.new_domain_utema();
        let inputs = ScoreInputs {
            url: "https://example.com/tuebingen",
            parent_score: None,
            text: "Tübingen university campus life.",
            incoming: &[],
            linking_depth: 0,
        };
        let first = scorer.score(&inputs, &vocab(), &mut utema);
        let second = scorer.score(&inputs, &vocab(), &mut utema);
        assert!(first > 0.0);
        assert!((second - first).abs() < 1.0);
    }
}
