use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::{
    content::{ContentEntry, EntryKind},
    content_index::{ContentRepository, IndexSnapshot, IndexedEntry},
    error::Result,
    filter::SearchFilter,
    history::SearchHistory,
    text_util::{fuzzy_ratio, tokenize_query},
};

/// Points for a query term found in the title.
const TITLE_WEIGHT: f32 = 10.0;
/// Points for a query term found in the category.
const CATEGORY_WEIGHT: f32 = 5.0;
/// Points for a query term found in the description.
const DESCRIPTION_WEIGHT: f32 = 3.0;
/// Points for a query term found anywhere in the searchable text.
const TEXT_WEIGHT: f32 = 1.0;
/// Multiplier on the fuzzy subsequence ratio.
const FUZZY_WEIGHT: f32 = 2.0;
/// Raw score that maps to a relevance of 1.0.
const SCORE_NORMALIZER: f32 = 20.0;
const RECENT_BOOST: f32 = 1.5;
const FAVORITE_BOOST: f32 = 1.3;
const RECENT_WINDOW_DAYS: i64 = 7;

/// Ids shown for an empty query, in display order.
pub const DEFAULT_POPULAR_IDS: &[&str] = &[
    "math-adventure",
    "alphabet-adventure",
    "counting-train",
    "color-match",
    "shape-explorer",
    "animal-safari",
    "music-maker",
    "art-studio",
    "science-lab",
    "story-sequencing",
];

/// Tunables for a single search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Results must score strictly above this relevance.
    pub fuzzy_threshold: f32,
    pub max_results: usize,
    pub boost_recent: bool,
    pub boost_favorites: bool,
    pub include_kinds: BTreeSet<EntryKind>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.3,
            max_results: 50,
            boost_recent: true,
            boost_favorites: true,
            include_kinds: EntryKind::ALL.into_iter().collect(),
        }
    }
}

/// A ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub rank: usize,
    pub id: String,
    pub kind: EntryKind,
    pub title: String,
    pub category: String,
    pub relevance_score: f32,
    /// Query terms found verbatim somewhere in the entry.
    pub matched_terms: Vec<String>,
}

impl SearchResult {
    fn from_indexed(
        indexed: &IndexedEntry,
        relevance_score: f32,
        matched_terms: Vec<String>,
    ) -> Self {
        Self {
            rank: 0,
            id: indexed.entry.id.clone(),
            kind: indexed.entry.kind(),
            title: indexed.entry.title.clone(),
            category: indexed.entry.category.clone(),
            relevance_score,
            matched_terms,
        }
    }
}

/// Keyword search over a [`ContentRepository`], plus query history and
/// type-ahead suggestions.
pub struct SearchEngine {
    repository: Arc<dyn ContentRepository>,
    history: RwLock<SearchHistory>,
    popular_ids: Vec<String>,
}

impl SearchEngine {
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        Self {
            repository,
            history: RwLock::new(SearchHistory::new()),
            popular_ids: DEFAULT_POPULAR_IDS
                .iter()
                .map(|id| id.to_string())
                .collect(),
        }
    }

    /// Replace the curated list shown for blank queries.
    pub fn with_popular_ids(mut self, ids: Vec<String>) -> Self {
        self.popular_ids = ids;
        self
    }

    pub fn popular_ids(&self) -> &[String] {
        &self.popular_ids
    }

    /// Throw away the current index and build a new one from `catalog`.
    pub fn initialize_index(&self, catalog: &[ContentEntry]) {
        self.repository.rebuild(catalog);
    }

    /// Run a query against the index as of now.
    ///
    /// Never fails: malformed filters simply match nothing. Use
    /// [`try_search`](Self::try_search) to have them rejected instead.
    pub fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        options: &SearchOptions,
    ) -> Vec<SearchResult> {
        self.search_at(query, filter, options, Utc::now())
    }

    /// Validate `filter`, then search.
    pub fn try_search(
        &self,
        query: &str,
        filter: &SearchFilter,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        filter.validate()?;
        Ok(self.search(query, filter, options))
    }

    /// Search with an explicit clock, used for the recency boost.
    pub fn search_at(
        &self,
        query: &str,
        filter: &SearchFilter,
        options: &SearchOptions,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        let snapshot = self.repository.snapshot();

        if query.trim().is_empty() {
            return self.popular_results(&snapshot, filter, options);
        }

        let terms = tokenize_query(query);
        if terms.is_empty() {
            return vec![];
        }

        let mut results: Vec<SearchResult> = snapshot
            .iter()
            .filter(|e| options.include_kinds.contains(&e.entry.kind()))
            .filter(|e| filter.passes(&e.entry))
            .filter_map(|e| {
                let (score, matched) = score_entry(e, &terms, options, now);
                (score > options.fuzzy_threshold)
                    .then(|| SearchResult::from_indexed(e, score, matched))
            })
            .collect();

        results.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(options.max_results);
        assign_ranks(&mut results);

        tracing::debug!(
            query,
            terms = terms.len(),
            results = results.len(),
            "search complete"
        );
        results
    }

    fn popular_results(
        &self,
        snapshot: &IndexSnapshot,
        filter: &SearchFilter,
        options: &SearchOptions,
    ) -> Vec<SearchResult> {
        let mut results: Vec<SearchResult> = self
            .popular_ids
            .iter()
            .filter_map(|id| snapshot.get(id))
            .filter(|e| filter.passes(&e.entry))
            .map(|e| SearchResult::from_indexed(e, 1.0, vec![]))
            .take(options.max_results)
            .collect();
        assign_ranks(&mut results);
        results
    }

    /// Type-ahead completions for `partial`.
    ///
    /// Titles, categories and tags containing `partial` come first, in
    /// index order, followed by matching past queries. Inputs shorter than
    /// two characters yield nothing.
    pub fn suggestions(&self, partial: &str, limit: usize) -> Vec<String> {
        let needle = partial.trim().to_lowercase();
        if needle.chars().count() < 2 || limit == 0 {
            return vec![];
        }

        let cap = limit.saturating_mul(2);
        let mut seen = std::collections::HashSet::new();
        let mut collected = Vec::new();
        let mut push = |candidate: &str| {
            if collected.len() < cap && seen.insert(candidate.to_string()) {
                collected.push(candidate.to_string());
            }
        };

        let snapshot = self.repository.snapshot();
        for indexed in snapshot.iter() {
            if indexed.title_lower.contains(&needle) {
                push(&indexed.entry.title);
            }
            if indexed.category_lower.contains(&needle) {
                push(&indexed.entry.category);
            }
            for tag in &indexed.entry.tags {
                if tag.to_lowercase().contains(&needle) {
                    push(tag);
                }
            }
        }

        for past in self.history.read().iter() {
            if past.to_lowercase().contains(&needle) {
                push(past);
            }
        }

        collected.truncate(limit);
        collected
    }

    pub fn add_to_history(&self, query: &str) {
        self.history.write().add(query);
    }

    /// Past queries, most recent first.
    pub fn history(&self) -> Vec<String> {
        self.history.read().to_vec()
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }

    /// Replace the history with a previously saved list.
    pub fn restore_history(&self, queries: Vec<String>) {
        *self.history.write() = SearchHistory::from_queries(queries);
    }
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("entries", &self.repository.len())
            .field("popular_ids", &self.popular_ids)
            .finish_non_exhaustive()
    }
}

/// Relevance of one entry for the given lowercase terms, in `[0, 1]`,
/// together with the terms that matched as substrings.
fn score_entry(
    indexed: &IndexedEntry,
    terms: &[String],
    options: &SearchOptions,
    now: DateTime<Utc>,
) -> (f32, Vec<String>) {
    let mut raw = 0.0;
    let mut matched = Vec::new();

    for term in terms {
        let term = term.as_str();
        if indexed.title_lower.contains(term) {
            raw += TITLE_WEIGHT;
        }
        if indexed.category_lower.contains(term) {
            raw += CATEGORY_WEIGHT;
        }
        if indexed.description_lower.contains(term) {
            raw += DESCRIPTION_WEIGHT;
        }
        if indexed.searchable_text.contains(term) {
            raw += TEXT_WEIGHT;
            matched.push(term.to_string());
        }
        raw += FUZZY_WEIGHT * fuzzy_ratio(term, &indexed.searchable_text);
    }

    raw *= indexed.entry.relevance_boost();

    if let Some(activity) = indexed.entry.activity() {
        if options.boost_recent
            && activity.last_accessed.is_some_and(|at| {
                now.signed_duration_since(at)
                    <= Duration::days(RECENT_WINDOW_DAYS)
            })
        {
            raw *= RECENT_BOOST;
        }
        if options.boost_favorites && activity.is_favorite {
            raw *= FAVORITE_BOOST;
        }
    }

    ((raw / SCORE_NORMALIZER).min(1.0), matched)
}

fn assign_ranks(results: &mut [SearchResult]) {
    for (i, r) in results.iter_mut().enumerate() {
        r.rank = i + 1;
    }
}

/// Format results for human-readable terminal output.
pub fn format_human(results: &[SearchResult]) {
    if results.is_empty() {
        println!("No results found.");
        return;
    }

    for r in results {
        println!(
            "{:>3}. [{:.3}] {} ({}, {})",
            r.rank, r.relevance_score, r.title, r.kind, r.category
        );
        println!("     #{}", r.id);
    }
    println!("\n{} result(s)", results.len());
}

#[derive(Serialize)]
struct SearchResponse<'a> {
    query: &'a str,
    result_count: usize,
    results: &'a [SearchResult],
}

/// Format results as JSON output.
pub fn format_json(results: &[SearchResult], query: &str) -> Result<()> {
    let response = SearchResponse {
        query,
        result_count: results.len(),
        results,
    };
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        content::{
            ContentKind,
            tests::{activity, feature},
        },
        content_index::ContentIndex,
        filter::Bounds,
    };

    fn engine_with(catalog: &[ContentEntry]) -> SearchEngine {
        SearchEngine::new(Arc::new(ContentIndex::from_catalog(catalog)))
    }

    fn sample_catalog() -> Vec<ContentEntry> {
        let mut safari =
            activity("counting-safari", "Counting Safari", "math", 2, 10);
        safari.description = "Count the animals on a jungle trip".to_string();
        safari.tags = ["animals".to_string(), "numbers".to_string()].into();

        let mut paint = activity("art-studio", "Art Studio", "art", 1, 15);
        paint.description = "Paint with colors and shapes".to_string();
        paint.tags = ["creative".to_string()].into();

        let mut lab = activity("science-lab", "Science Lab", "science", 4, 20);
        lab.description = "Mix colors and watch reactions".to_string();

        let mut dashboard =
            feature("progress-dashboard", "Progress Dashboard", "tools");
        dashboard.description = "See how many animals you counted".to_string();

        vec![safari, paint, lab, dashboard]
    }

    #[test]
    fn single_activity_math_query() {
        let mut a1 = activity("a1", "Number Fun", "math", 3, 10);
        if let ContentKind::Activity(details) = &mut a1.content {
            details.min_age = 4;
            details.max_age = 7;
        }
        let engine = engine_with(&[a1]);

        let results = engine.search(
            "math",
            &SearchFilter::default(),
            &SearchOptions::default(),
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, "math");
        assert!(results[0].relevance_score > 0.0);
        assert_eq!(results[0].rank, 1);
    }

    #[test]
    fn substring_and_fuzzy_queries_both_find_title() {
        let engine = engine_with(&sample_catalog());
        let opts = SearchOptions::default();
        let filter = SearchFilter::default();

        for query in ["count", "countin"] {
            let results = engine.search(query, &filter, &opts);
            assert!(
                results.iter().any(|r| r.id == "counting-safari"),
                "{query} should match Counting Safari"
            );
        }
    }

    #[test]
    fn fuzzy_only_match_has_no_matched_terms() {
        let engine = engine_with(&sample_catalog());
        let results = engine.search(
            "cuntng",
            &SearchFilter::default(),
            &SearchOptions {
                fuzzy_threshold: 0.0,
                ..Default::default()
            },
        );
        let safari =
            results.iter().find(|r| r.id == "counting-safari").unwrap();
        assert!(safari.matched_terms.is_empty());
    }

    #[test]
    fn title_match_outranks_description_match() {
        let engine = engine_with(&sample_catalog());
        let results = engine.search(
            "animals",
            &SearchFilter::default(),
            &SearchOptions {
                fuzzy_threshold: 0.0,
                ..Default::default()
            },
        );
        // Safari has "animals" in description and tags, dashboard only in
        // its description and is a feature (0.8 boost).
        assert_eq!(results[0].id, "counting-safari");
        assert!(results.iter().any(|r| r.id == "progress-dashboard"));
    }

    #[test]
    fn scores_descending_and_bounded() {
        let engine = engine_with(&sample_catalog());
        let opts = SearchOptions::default();
        let results =
            engine.search("colors shapes", &SearchFilter::default(), &opts);

        assert!(!results.is_empty());
        for r in &results {
            assert!(r.relevance_score > opts.fuzzy_threshold);
            assert!(r.relevance_score <= 1.0);
        }
        for window in results.windows(2) {
            assert!(window[0].relevance_score >= window[1].relevance_score);
        }
    }

    #[test]
    fn recent_and_favorite_boosts_multiply() {
        let now = Utc::now();
        let plain = activity("plain", "Puzzle Time", "logic", 2, 10);
        let mut boosted = activity("boosted", "Puzzle Time", "logic", 2, 10);
        if let ContentKind::Activity(details) = &mut boosted.content {
            details.is_favorite = true;
            details.last_accessed = Some(now - Duration::days(2));
        }
        let engine = engine_with(&[plain, boosted]);
        let opts = SearchOptions {
            fuzzy_threshold: 0.0,
            ..Default::default()
        };

        let results =
            engine.search_at("puz", &SearchFilter::default(), &opts, now);
        let score = |id: &str| {
            results.iter().find(|r| r.id == id).unwrap().relevance_score
        };
        // "puz": title 10 + text 1 + fuzzy 2 = 13 -> 0.65 plain.
        assert!((score("plain") - 0.65).abs() < 1e-5);
        // 13 * 1.5 * 1.3 = 25.35 -> capped at 1.0.
        assert_eq!(score("boosted"), 1.0);

        let no_boost = SearchOptions {
            boost_recent: false,
            boost_favorites: false,
            ..opts
        };
        let results =
            engine.search_at("puz", &SearchFilter::default(), &no_boost, now);
        assert!(
            results
                .iter()
                .all(|r| (r.relevance_score - 0.65).abs() < 1e-5)
        );
    }

    #[test]
    fn stale_access_gets_no_recency_boost() {
        let now = Utc::now();
        let mut entry = activity("old", "Puzzle Time", "logic", 2, 10);
        if let ContentKind::Activity(details) = &mut entry.content {
            details.last_accessed = Some(now - Duration::days(30));
        }
        let engine = engine_with(&[entry]);
        let results = engine.search_at(
            "puz",
            &SearchFilter::default(),
            &SearchOptions::default(),
            now,
        );
        assert!((results[0].relevance_score - 0.65).abs() < 1e-5);
    }

    #[test]
    fn include_kinds_excludes_features() {
        let engine = engine_with(&sample_catalog());
        let opts = SearchOptions {
            fuzzy_threshold: 0.0,
            include_kinds: [EntryKind::Feature].into(),
            ..Default::default()
        };
        let results =
            engine.search("animals", &SearchFilter::default(), &opts);
        assert!(results.iter().all(|r| r.kind == EntryKind::Feature));
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn filters_apply_to_queries() {
        let engine = engine_with(&sample_catalog());
        let filter = SearchFilter {
            categories: ["art".to_string()].into(),
            ..Default::default()
        };
        let results =
            engine.search("paint colors", &filter, &SearchOptions::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "art-studio");
    }

    #[test]
    fn max_results_truncates() {
        let catalog: Vec<_> = (0..10)
            .map(|i| activity(&format!("m{i}"), "Math Game", "math", 2, 10))
            .collect();
        let engine = engine_with(&catalog);
        let results = engine.search(
            "math",
            &SearchFilter::default(),
            &SearchOptions {
                max_results: 3,
                ..Default::default()
            },
        );
        assert_eq!(results.len(), 3);
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn blank_query_returns_popular_ids() {
        let catalog = vec![
            activity("art-studio", "Art Studio", "art", 1, 15),
            activity("math-adventure", "Math Adventure", "math", 2, 10),
            activity("unlisted", "Unlisted", "math", 2, 10),
        ];
        let engine = engine_with(&catalog);

        let results = engine.search(
            "  ",
            &SearchFilter::default(),
            &SearchOptions::default(),
        );
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        // Curated order, not catalog order.
        assert_eq!(ids, vec!["math-adventure", "art-studio"]);
        assert!(results.iter().all(|r| r.relevance_score == 1.0));

        let art_only = SearchFilter {
            categories: ["art".to_string()].into(),
            ..Default::default()
        };
        let results =
            engine.search("", &art_only, &SearchOptions::default());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "art-studio");
    }

    #[test]
    fn custom_popular_ids() {
        let engine = engine_with(&sample_catalog())
            .with_popular_ids(vec!["science-lab".to_string()]);
        let results = engine.search(
            "",
            &SearchFilter::default(),
            &SearchOptions::default(),
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "science-lab");
    }

    #[test]
    fn only_short_terms_yield_nothing() {
        let engine = engine_with(&sample_catalog());
        let results = engine.search(
            "a b",
            &SearchFilter::default(),
            &SearchOptions::default(),
        );
        assert!(results.is_empty());
    }

    #[test]
    fn empty_index_returns_empty() {
        let engine = engine_with(&[]);
        let opts = SearchOptions::default();
        let filter = SearchFilter::default();
        assert!(engine.search("math", &filter, &opts).is_empty());
        assert!(engine.search("", &filter, &opts).is_empty());
    }

    #[test]
    fn try_search_rejects_inverted_range() {
        let engine = engine_with(&sample_catalog());
        let filter = SearchFilter {
            duration_range: Some(Bounds::new(30, 5)),
            ..Default::default()
        };
        let opts = SearchOptions::default();

        assert!(engine.try_search("math", &filter, &opts).is_err());
        assert!(engine.search("math", &filter, &opts).is_empty());
    }

    #[test]
    fn reinitializing_replaces_results() {
        let engine = engine_with(&sample_catalog());
        engine.initialize_index(&[activity(
            "new",
            "Rhyme Time",
            "language",
            1,
            5,
        )]);
        let opts = SearchOptions::default();
        let filter = SearchFilter::default();

        assert!(engine.search("safari", &filter, &opts).is_empty());
        assert_eq!(engine.search("rhyme", &filter, &opts)[0].id, "new");
    }

    #[test]
    fn suggestions_need_two_characters() {
        let engine = engine_with(&sample_catalog());
        assert!(engine.suggestions("c", 5).is_empty());
        assert!(!engine.suggestions("co", 5).is_empty());
    }

    #[test]
    fn suggestions_titles_categories_tags_then_history() {
        let engine = engine_with(&sample_catalog());
        engine.add_to_history("animal puzzles");

        let suggestions = engine.suggestions("ani", 10);
        assert_eq!(suggestions, vec!["animals", "animal puzzles"]);

        let suggestions = engine.suggestions("SCI", 10);
        assert_eq!(suggestions, vec!["Science Lab", "science"]);
    }

    #[test]
    fn suggestions_respect_limit_and_dedupe() {
        let catalog: Vec<_> = (0..5)
            .map(|i| activity(&format!("m{i}"), "Math Game", "math", 2, 10))
            .collect();
        let engine = engine_with(&catalog);
        assert_eq!(engine.suggestions("ma", 1), vec!["Math Game"]);
        assert_eq!(engine.suggestions("ma", 5), vec!["Math Game", "math"]);
    }

    #[test]
    fn history_roundtrip() {
        let engine = engine_with(&[]);
        engine.add_to_history("math");
        engine.add_to_history("art");
        assert_eq!(engine.history(), vec!["art", "math"]);

        engine.restore_history(vec!["saved".to_string()]);
        assert_eq!(engine.history(), vec!["saved"]);

        engine.clear_history();
        assert!(engine.history().is_empty());
    }
}
