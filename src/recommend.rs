use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    content::ContentEntry,
    content_index::IndexSnapshot,
    context::{ContextBuilder, PersonalizationContext},
    profile::{ProfileStore, UserPreferenceProfile},
};

const BASE_SCORE: f64 = 0.5;
const FAVORITE_CATEGORY_BONUS: f64 = 0.4;
/// Category bonus while the learner has no favorites yet.
const EXPLORATION_BONUS: f64 = 0.2;
const DIFFICULTY_FIT_MAX: f64 = 0.25;
const DIFFICULTY_FIT_STEP: f64 = 0.05;
const LEARNING_STYLE_BONUS: f64 = 0.15;
const INTEREST_BONUS: f64 = 0.1;
const RECENT_PENALTY: f64 = -0.3;
const MONTH_PENALTY: f64 = -0.1;
const TIME_OF_DAY_BONUS: f64 = 0.05;
const SESSION_FIT_BONUS: f64 = 0.05;
const SESSION_FIT_TOLERANCE_MINUTES: f64 = 5.0;
const STRUGGLING_SUPPORT_BONUS: f64 = 0.1;

/// Recommendations must score strictly above this.
pub const MIN_RECOMMENDATION_SCORE: f64 = 0.3;
pub const MAX_RECOMMENDATIONS: usize = 20;

const QUICK_ACCESS_ACTIVITIES: usize = 3;
const QUICK_ACCESS_CATEGORIES: usize = 2;
const ACTIVITY_PRIORITIES: [u8; QUICK_ACCESS_ACTIVITIES] = [10, 9, 8];
const CATEGORY_PRIORITIES: [u8; QUICK_ACCESS_CATEGORIES] = [7, 6];

const MAX_RELATED: usize = 3;
const MAX_NEXT_LEVEL: usize = 2;

/// A scored activity with the reasons behind its score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationScore {
    pub activity_id: String,
    /// In `[0, 1]`.
    pub score: f64,
    pub reasons: Vec<String>,
    pub category: String,
    /// How much preference data backs the score, in `[0, 1]`.
    pub confidence: f64,
}

/// The rule a [`Contribution`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Base,
    CategoryAffinity,
    DifficultyFit,
    LearningStyle,
    Interest,
    Recency,
    TimeOfDay,
    SessionFit,
    StrugglingSupport,
}

/// One rule's share of a recommendation score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contribution {
    pub factor: Factor,
    pub weight: f64,
    pub reason: String,
}

impl Contribution {
    fn new(factor: Factor, weight: f64, reason: impl Into<String>) -> Self {
        Self {
            factor,
            weight,
            reason: reason.into(),
        }
    }
}

fn contains_any(haystacks: &[&str], keywords: &[&str]) -> bool {
    haystacks
        .iter()
        .any(|h| keywords.iter().any(|k| h.contains(k)))
}

/// Every rule that fired for `activity`, in evaluation order.
///
/// Rules that need activity attributes (difficulty, duration) are skipped
/// for entries that carry none.
pub fn score_contributions(
    activity: &ContentEntry,
    profile: &UserPreferenceProfile,
    context: &PersonalizationContext,
) -> Vec<Contribution> {
    let category = activity.category.to_lowercase();
    let description = activity.description.to_lowercase();
    let title = activity.title.to_lowercase();
    let subcategory = activity
        .subcategory
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_default();
    let details = activity.activity();

    let mut out = vec![Contribution::new(
        Factor::Base,
        BASE_SCORE,
        "Available activity",
    )];

    if profile.favorite_categories.contains(&activity.category) {
        out.push(Contribution::new(
            Factor::CategoryAffinity,
            FAVORITE_CATEGORY_BONUS,
            format!("You enjoy {} activities", activity.category),
        ));
    } else if profile.favorite_categories.is_empty() {
        out.push(Contribution::new(
            Factor::CategoryAffinity,
            EXPLORATION_BONUS,
            "Something new to explore",
        ));
    }

    if let Some(details) = details {
        let gap =
            (f64::from(details.difficulty) - profile.preferred_difficulty).abs();
        let fit = (DIFFICULTY_FIT_MAX - DIFFICULTY_FIT_STEP * gap).max(0.0);
        if fit > 0.0 {
            out.push(Contribution::new(
                Factor::DifficultyFit,
                fit,
                "Matches your skill level",
            ));
        }
    }

    let style_fits = match profile.learning_style.keywords() {
        Some(keywords) => {
            contains_any(&[category.as_str(), description.as_str()], keywords)
        }
        None => true,
    };
    if style_fits {
        out.push(Contribution::new(
            Factor::LearningStyle,
            LEARNING_STYLE_BONUS,
            "Suits how you like to learn",
        ));
    }

    let interest = profile.interests.iter().find(|interest| {
        let interest = interest.to_lowercase();
        !interest.is_empty()
            && [&title, &description, &subcategory]
                .iter()
                .any(|field| field.contains(&interest))
    });
    if let Some(interest) = interest {
        out.push(Contribution::new(
            Factor::Interest,
            INTEREST_BONUS,
            format!("Connects to your interest in {interest}"),
        ));
    }

    if profile.has_completed(&activity.id)
        && let Some(completed_at) = profile.last_completed_at(&activity.id)
    {
        let penalty = recency_penalty(completed_at, context.current_time);
        if penalty < 0.0 {
            let reason = if penalty == RECENT_PENALTY {
                "Played this week"
            } else {
                "Played this month"
            };
            out.push(Contribution::new(Factor::Recency, penalty, reason));
        }
    }

    if contains_any(&[category.as_str()], context.time_of_day.keywords()) {
        out.push(Contribution::new(
            Factor::TimeOfDay,
            TIME_OF_DAY_BONUS,
            format!("Good for the {}", context.time_of_day),
        ));
    }

    if let Some(details) = details {
        let minutes = f64::from(details.duration_minutes);
        if (minutes - profile.avg_session_time_minutes).abs()
            <= SESSION_FIT_TOLERANCE_MINUTES
        {
            out.push(Contribution::new(
                Factor::SessionFit,
                SESSION_FIT_BONUS,
                "Fits your usual session length",
            ));
        }
    }

    let supports = profile.struggling_areas.iter().any(|area| {
        let area = area.to_lowercase();
        !area.is_empty()
            && (category.contains(&area) || subcategory.contains(&area))
    });
    if supports {
        out.push(Contribution::new(
            Factor::StrugglingSupport,
            STRUGGLING_SUPPORT_BONUS,
            "Extra practice where it helps",
        ));
    }

    out
}

/// Penalty for replaying an activity completed at `completed_at`.
fn recency_penalty(completed_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let elapsed = now.signed_duration_since(completed_at);
    if elapsed <= Duration::days(7) {
        RECENT_PENALTY
    } else if elapsed <= Duration::days(30) {
        MONTH_PENALTY
    } else {
        0.0
    }
}

fn confidence(profile: &UserPreferenceProfile) -> f64 {
    (profile.completed_activity_ids.len() as f64 / 20.0
        + profile.favorite_categories.len() as f64 / 5.0
        + 0.3)
        .clamp(0.0, 1.0)
}

/// Score a single activity for one learner in one context.
pub fn calculate_activity_score(
    activity: &ContentEntry,
    profile: &UserPreferenceProfile,
    context: &PersonalizationContext,
) -> RecommendationScore {
    let contributions = score_contributions(activity, profile, context);
    let total: f64 = contributions.iter().map(|c| c.weight).sum();

    RecommendationScore {
        activity_id: activity.id.clone(),
        score: total.clamp(0.0, 1.0),
        reasons: contributions
            .into_iter()
            .filter(|c| c.factor != Factor::Base)
            .map(|c| c.reason)
            .collect(),
        category: activity.category.clone(),
        confidence: confidence(profile),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickAccessKind {
    Activity,
    Category,
}

/// A shortcut on the learner's home screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickAccessItem {
    pub id: String,
    pub title: String,
    pub kind: QuickAccessKind,
    pub path: String,
    pub priority: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// Same category as the activity being viewed.
    Related,
    /// One step harder than the latest completion.
    NextLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationItem {
    pub activity_id: String,
    pub title: String,
    pub kind: NavigationKind,
    pub path: String,
}

pub fn activity_path(id: &str) -> String {
    format!("/activities/{id}")
}

pub fn category_path(category: &str) -> String {
    format!("/categories/{category}")
}

/// The activity id in a detail-view path such as `/activities/<id>`.
pub fn activity_id_from_path(path: &str) -> Option<&str> {
    let path = path.trim().trim_end_matches('/');
    let id = path
        .strip_prefix("/activities/")
        .or_else(|| path.strip_prefix("/activity/"))?;
    (!id.is_empty() && !id.contains('/')).then_some(id)
}

/// Recommendations plus the catalog snapshot they were ranked against.
#[derive(Debug, Clone)]
struct CachedRecommendations {
    catalog: Arc<IndexSnapshot>,
    scores: Vec<RecommendationScore>,
}

/// Turns profiles and a catalog into ranked recommendations and the
/// shortcut lists derived from them.
#[derive(Debug)]
pub struct RecommendationScorer {
    profiles: Arc<ProfileStore>,
    cache: RwLock<HashMap<String, CachedRecommendations>>,
}

impl RecommendationScorer {
    pub fn new(profiles: Arc<ProfileStore>) -> Self {
        Self {
            profiles,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Rank every activity in `catalog` for `child_id` and cache the
    /// result. Unknown learners get an empty list.
    pub fn generate_recommendations(
        &self,
        child_id: &str,
        catalog: &Arc<IndexSnapshot>,
        context: &PersonalizationContext,
    ) -> Vec<RecommendationScore> {
        let Some(profile) = self.profiles.get(child_id) else {
            tracing::debug!(child = child_id, "no profile; no recommendations");
            return Vec::new();
        };

        let mut scores: Vec<RecommendationScore> = catalog
            .as_slice()
            .par_iter()
            .filter(|indexed| indexed.entry.activity().is_some())
            .map(|indexed| {
                calculate_activity_score(&indexed.entry, &profile, context)
            })
            .filter(|s| s.score > MIN_RECOMMENDATION_SCORE)
            .collect();

        scores.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.activity_id.cmp(&b.activity_id))
        });
        scores.truncate(MAX_RECOMMENDATIONS);

        tracing::debug!(
            child = child_id,
            count = scores.len(),
            "cached recommendations"
        );
        self.cache.write().insert(
            child_id.to_string(),
            CachedRecommendations {
                catalog: catalog.clone(),
                scores: scores.clone(),
            },
        );
        scores
    }

    /// The last recommendations generated for `child_id`, whatever
    /// catalog they were ranked against.
    pub fn cached_recommendations(
        &self,
        child_id: &str,
    ) -> Option<Vec<RecommendationScore>> {
        self.cache.read().get(child_id).map(|c| c.scores.clone())
    }

    /// Cached recommendations, but only if they were ranked against
    /// exactly this `catalog` snapshot.
    fn cached_for(
        &self,
        child_id: &str,
        catalog: &Arc<IndexSnapshot>,
    ) -> Option<Vec<RecommendationScore>> {
        self.cache
            .read()
            .get(child_id)
            .filter(|c| Arc::ptr_eq(&c.catalog, catalog))
            .map(|c| c.scores.clone())
    }

    /// Forget cached recommendations, e.g. after the profile changed.
    pub fn invalidate(&self, child_id: &str) {
        self.cache.write().remove(child_id);
    }

    /// Forget every learner's cached recommendations.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn generate_quick_access(
        &self,
        child_id: &str,
        catalog: &Arc<IndexSnapshot>,
    ) -> Vec<QuickAccessItem> {
        self.generate_quick_access_at(child_id, catalog, Utc::now())
    }

    /// Top recommendations and favorite categories as shortcuts, highest
    /// priority first. Recommendations cached against this same snapshot
    /// are reused; otherwise they are generated for a session starting at
    /// `now`.
    pub fn generate_quick_access_at(
        &self,
        child_id: &str,
        catalog: &Arc<IndexSnapshot>,
        now: DateTime<Utc>,
    ) -> Vec<QuickAccessItem> {
        let Some(profile) = self.profiles.get(child_id) else {
            return Vec::new();
        };
        let recommendations = match self.cached_for(child_id, catalog) {
            Some(cached) => cached,
            None => {
                let context = ContextBuilder::new(now).build_at(now);
                self.generate_recommendations(child_id, catalog, &context)
            }
        };

        let activities = recommendations
            .iter()
            .filter_map(|rec| Some((rec, catalog.get(&rec.activity_id)?)))
            .zip(ACTIVITY_PRIORITIES)
            .map(|((rec, indexed), priority)| QuickAccessItem {
                id: rec.activity_id.clone(),
                title: indexed.entry.title.clone(),
                kind: QuickAccessKind::Activity,
                path: activity_path(&rec.activity_id),
                priority,
            });
        let categories = profile
            .favorite_categories
            .iter()
            .zip(CATEGORY_PRIORITIES)
            .map(|(category, priority)| QuickAccessItem {
                id: category.clone(),
                title: category.clone(),
                kind: QuickAccessKind::Category,
                path: category_path(category),
                priority,
            });

        let mut items: Vec<QuickAccessItem> =
            activities.chain(categories).collect();
        items.sort_by(|a, b| b.priority.cmp(&a.priority));
        items
    }

    /// Related and next-level activities for a learner at `current_path`.
    pub fn generate_navigation_suggestions(
        &self,
        child_id: &str,
        current_path: &str,
        catalog: &IndexSnapshot,
    ) -> Vec<NavigationItem> {
        let Some(profile) = self.profiles.get(child_id) else {
            return Vec::new();
        };
        let mut items: Vec<NavigationItem> = Vec::new();

        let current_id = activity_id_from_path(current_path);
        let current = current_id
            .and_then(|id| catalog.get(id))
            .filter(|e| e.entry.activity().is_some());
        if let Some(current) = current {
            items.extend(
                catalog
                    .iter()
                    .map(|e| &e.entry)
                    .filter(|e| e.activity().is_some())
                    .filter(|e| e.id != current.entry.id)
                    .filter(|e| e.category == current.entry.category)
                    .filter(|e| !profile.has_completed(&e.id))
                    .take(MAX_RELATED)
                    .map(|e| navigation_item(e, NavigationKind::Related)),
            );
        }

        let last = profile
            .latest_completion()
            .and_then(|record| catalog.get(&record.activity_id))
            .and_then(|e| Some((&e.entry, e.entry.activity()?)));
        if let Some((last, details)) = last {
            let floor = details.difficulty;
            let next: Vec<NavigationItem> = catalog
                .iter()
                .map(|e| &e.entry)
                .filter(|e| e.category == last.category)
                .filter(|e| {
                    e.activity().is_some_and(|d| {
                        d.difficulty > floor
                            && d.difficulty <= floor.saturating_add(1)
                    })
                })
                .filter(|e| !profile.has_completed(&e.id))
                .filter(|e| Some(e.id.as_str()) != current_id)
                .filter(|e| !items.iter().any(|i| i.activity_id == e.id))
                .take(MAX_NEXT_LEVEL)
                .map(|e| navigation_item(e, NavigationKind::NextLevel))
                .collect();
            items.extend(next);
        }

        items
    }
}

fn navigation_item(entry: &ContentEntry, kind: NavigationKind) -> NavigationItem {
    NavigationItem {
        activity_id: entry.id.clone(),
        title: entry.title.clone(),
        kind,
        path: activity_path(&entry.id),
    }
}

/// Print recommendations as a ranked list.
pub fn format_human(recommendations: &[RecommendationScore]) {
    if recommendations.is_empty() {
        println!("No recommendations.");
        return;
    }
    for (i, rec) in recommendations.iter().enumerate() {
        println!(
            "{:>2}. {:.3}  {} [{}] (confidence {:.2})",
            i + 1,
            rec.score,
            rec.activity_id,
            rec.category,
            rec.confidence,
        );
        for reason in &rec.reasons {
            println!("      - {reason}");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{
        content::tests::{activity, feature},
        profile::{ChildInfo, LearningStyle, Performance},
    };

    fn evening() -> PersonalizationContext {
        let at = Utc.with_ymd_and_hms(2024, 3, 4, 19, 0, 0).unwrap();
        ContextBuilder::new(at).build_at(at)
    }

    fn profile(
        preferred_difficulty: f64,
        style: LearningStyle,
    ) -> UserPreferenceProfile {
        UserPreferenceProfile::new(&ChildInfo {
            id: "kid".to_string(),
            preferred_difficulty: Some(preferred_difficulty),
            learning_style: Some(style),
            ..Default::default()
        })
    }

    fn complete(
        profile: &mut UserPreferenceProfile,
        id: &str,
        at: DateTime<Utc>,
    ) {
        profile.apply(
            id,
            &Performance {
                completed: true,
                time_spent_minutes: 20.0,
                difficulty: 3,
                completed_at: Some(at),
                ..Default::default()
            },
            at,
        );
    }

    fn weight_of(contributions: &[Contribution], factor: Factor) -> f64 {
        contributions
            .iter()
            .filter(|c| c.factor == factor)
            .map(|c| c.weight)
            .sum()
    }

    #[test]
    fn favorite_category_adds_affinity() {
        let puzzle = activity("p1", "Puzzle Time", "puzzles", 1, 40);
        let ctx = evening();

        let mut fan = profile(5.0, LearningStyle::Auditory);
        fan.add_favorite_category("puzzles");
        let mut other = profile(5.0, LearningStyle::Auditory);
        other.add_favorite_category("art");
        let newcomer = profile(5.0, LearningStyle::Auditory);

        let fan_score = calculate_activity_score(&puzzle, &fan, &ctx);
        let other_score = calculate_activity_score(&puzzle, &other, &ctx);
        let new_score = calculate_activity_score(&puzzle, &newcomer, &ctx);

        assert!((fan_score.score - 0.95).abs() < 1e-9);
        assert!((other_score.score - 0.55).abs() < 1e-9);
        assert!((new_score.score - 0.75).abs() < 1e-9);
        assert!((fan_score.score - other_score.score - 0.4).abs() < 1e-9);
    }

    #[test]
    fn recency_penalty_tiers() {
        let game = activity("g1", "Shape Sorter", "shapes", 3, 10);
        let ctx = evening();

        for (days, expected) in [(2, -0.3), (7, -0.3), (20, -0.1), (45, 0.0)] {
            let mut p = profile(3.0, LearningStyle::Mixed);
            complete(&mut p, "g1", ctx.current_time - Duration::days(days));
            let contributions = score_contributions(&game, &p, &ctx);
            assert_eq!(
                weight_of(&contributions, Factor::Recency),
                expected,
                "{days} days ago"
            );
        }
    }

    #[test]
    fn completion_without_record_has_no_penalty() {
        let game = activity("g1", "Shape Sorter", "shapes", 3, 10);
        let mut p = profile(3.0, LearningStyle::Mixed);
        p.completed_activity_ids.insert("g1".to_string());

        let contributions = score_contributions(&game, &p, &evening());
        assert_eq!(weight_of(&contributions, Factor::Recency), 0.0);
    }

    #[test]
    fn score_is_clamped() {
        let mut art = activity("a1", "Calm Painting", "art", 3, 20);
        art.description = "Draw and paint with colors".to_string();
        art.subcategory = Some("drawing".to_string());

        let mut p = profile(3.0, LearningStyle::Visual);
        p.add_favorite_category("art");
        p.interests.insert("paint".to_string());
        p.struggling_areas.insert("drawing".to_string());

        let score = calculate_activity_score(&art, &p, &evening());
        assert_eq!(score.score, 1.0);
        assert_eq!(score.reasons.len(), 7);
    }

    #[test]
    fn each_rule_fires_independently() {
        let mut art = activity("a1", "Calm Painting", "art", 3, 20);
        art.subcategory = Some("Drawing".to_string());
        let mut p = profile(3.0, LearningStyle::Visual);
        p.add_favorite_category("art");
        p.interests.insert("Painting".to_string());
        p.struggling_areas.insert("drawing".to_string());

        let c = score_contributions(&art, &p, &evening());
        assert_eq!(weight_of(&c, Factor::Base), 0.5);
        assert_eq!(weight_of(&c, Factor::CategoryAffinity), 0.4);
        assert_eq!(weight_of(&c, Factor::DifficultyFit), 0.25);
        assert_eq!(weight_of(&c, Factor::LearningStyle), 0.15);
        assert_eq!(weight_of(&c, Factor::Interest), 0.1);
        assert_eq!(weight_of(&c, Factor::TimeOfDay), 0.05);
        assert_eq!(weight_of(&c, Factor::SessionFit), 0.05);
        assert_eq!(weight_of(&c, Factor::StrugglingSupport), 0.1);
        assert_eq!(weight_of(&c, Factor::Recency), 0.0);
    }

    #[test]
    fn confidence_grows_with_data() {
        let game = activity("g1", "Shape Sorter", "shapes", 3, 10);
        let ctx = evening();
        let mut p = profile(3.0, LearningStyle::Mixed);
        assert!(
            (calculate_activity_score(&game, &p, &ctx).confidence - 0.3).abs()
                < 1e-9
        );

        p.add_favorite_category("shapes");
        complete(&mut p, "x", ctx.current_time);
        let expected = 1.0 / 20.0 + 1.0 / 5.0 + 0.3;
        assert!(
            (calculate_activity_score(&game, &p, &ctx).confidence - expected)
                .abs()
                < 1e-9
        );

        for cat in ["a", "b", "c", "d"] {
            p.add_favorite_category(cat);
        }
        assert_eq!(calculate_activity_score(&game, &p, &ctx).confidence, 1.0);
    }

    fn catalog() -> Arc<IndexSnapshot> {
        Arc::new(IndexSnapshot::build(&[
            activity("m1", "Counting Train", "math", 1, 20),
            activity("s1", "Sound Garden", "music", 2, 45),
            activity("l1", "Logic Tower", "logic", 5, 60),
            feature("f1", "Parent Dashboard", "tools"),
        ]))
    }

    fn scorer_with_learner() -> RecommendationScorer {
        let mut p = profile(1.0, LearningStyle::Auditory);
        p.add_favorite_category("math");
        let yesterday =
            Utc.with_ymd_and_hms(2024, 3, 3, 19, 0, 0).unwrap();
        complete(&mut p, "l1", yesterday);
        p.avg_session_time_minutes = 20.0;

        let store = Arc::new(ProfileStore::new());
        store.restore(p);
        RecommendationScorer::new(store)
    }

    #[test]
    fn recommendations_ranked_and_filtered() {
        let scorer = scorer_with_learner();
        let recs =
            scorer.generate_recommendations("kid", &catalog(), &evening());

        let ids: Vec<&str> =
            recs.iter().map(|r| r.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "s1"]);
        assert_eq!(recs[0].score, 1.0);
        assert!((recs[1].score - 0.85).abs() < 1e-9);
        assert_eq!(scorer.cached_recommendations("kid"), Some(recs));
    }

    #[test]
    fn unknown_learner_gets_nothing() {
        let scorer = RecommendationScorer::new(Arc::new(ProfileStore::new()));
        let catalog = catalog();
        assert!(
            scorer
                .generate_recommendations("ghost", &catalog, &evening())
                .is_empty()
        );
        assert!(scorer.generate_quick_access("ghost", &catalog).is_empty());
        let nav = scorer.generate_navigation_suggestions(
            "ghost",
            "/activities/m1",
            &catalog,
        );
        assert!(nav.is_empty());
        assert!(scorer.cached_recommendations("ghost").is_none());
    }

    #[test]
    fn quick_access_uses_cache() {
        let scorer = scorer_with_learner();
        let catalog = catalog();
        scorer.generate_recommendations("kid", &catalog, &evening());

        let items = scorer.generate_quick_access("kid", &catalog);
        let priorities: Vec<u8> = items.iter().map(|i| i.priority).collect();
        assert_eq!(priorities, vec![10, 9, 7]);
        assert_eq!(items[0].title, "Counting Train");
        assert_eq!(items[0].path, "/activities/m1");
        assert_eq!(items[2].kind, QuickAccessKind::Category);
        assert_eq!(items[2].path, "/categories/math");
    }

    #[test]
    fn quick_access_generates_when_uncached() {
        let scorer = scorer_with_learner();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

        let items = scorer.generate_quick_access_at("kid", &catalog(), now);
        let priorities: Vec<u8> = items.iter().map(|i| i.priority).collect();
        // Three months on, the logic puzzle is no longer penalized.
        assert_eq!(priorities, vec![10, 9, 8, 7]);
        assert!(scorer.cached_recommendations("kid").is_some());
    }

    #[test]
    fn quick_access_ignores_cache_from_another_catalog() {
        let scorer = scorer_with_learner();
        scorer.generate_recommendations("kid", &catalog(), &evening());

        let rebuilt = Arc::new(IndexSnapshot::build(&[activity(
            "n1",
            "Number Line",
            "math",
            1,
            20,
        )]));
        let items = scorer.generate_quick_access("kid", &rebuilt);

        let activities: Vec<&str> = items
            .iter()
            .filter(|i| i.kind == QuickAccessKind::Activity)
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(activities, vec!["n1"]);
        assert_eq!(items[0].title, "Number Line");
        assert_eq!(
            scorer.cached_recommendations("kid").map(|r| r.len()),
            Some(1)
        );
    }

    #[test]
    fn clear_drops_every_learner() {
        let scorer = scorer_with_learner();
        scorer.generate_recommendations("kid", &catalog(), &evening());
        scorer.clear();
        assert!(scorer.cached_recommendations("kid").is_none());
    }

    #[test]
    fn detail_paths() {
        assert_eq!(activity_id_from_path("/activities/m1"), Some("m1"));
        assert_eq!(activity_id_from_path("/activity/m1/"), Some("m1"));
        assert_eq!(activity_id_from_path("/activities/"), None);
        assert_eq!(activity_id_from_path("/activities/m1/play"), None);
        assert_eq!(activity_id_from_path("/home"), None);
    }

    fn math_catalog() -> IndexSnapshot {
        IndexSnapshot::build(&[
            activity("m1", "One", "math", 1, 10),
            activity("m2", "Two", "math", 2, 10),
            activity("m3", "Three", "math", 2, 10),
            activity("m4", "Four", "math", 3, 10),
            activity("m5", "Five", "math", 1, 10),
            activity("m6", "Six", "math", 2, 10),
            activity("a1", "Paint", "art", 2, 10),
        ])
    }

    fn navigator() -> RecommendationScorer {
        let ctx = evening();
        let mut p = profile(2.0, LearningStyle::Mixed);
        complete(&mut p, "m5", ctx.current_time - Duration::days(2));
        complete(&mut p, "m1", ctx.current_time - Duration::days(1));
        let store = Arc::new(ProfileStore::new());
        store.restore(p);
        RecommendationScorer::new(store)
    }

    #[test]
    fn related_on_detail_view() {
        let scorer = navigator();
        let items = scorer.generate_navigation_suggestions(
            "kid",
            "/activities/m2",
            &math_catalog(),
        );

        let related: Vec<&str> = items
            .iter()
            .filter(|i| i.kind == NavigationKind::Related)
            .map(|i| i.activity_id.as_str())
            .collect();
        assert_eq!(related, vec!["m3", "m4", "m6"]);

        // The other difficulty-2 activities are on screen or already listed.
        assert!(items.iter().all(|i| i.kind != NavigationKind::NextLevel));
    }

    #[test]
    fn next_level_off_detail_view() {
        let scorer = navigator();
        let items =
            scorer.generate_navigation_suggestions("kid", "/home", &math_catalog());

        assert!(items.iter().all(|i| i.kind == NavigationKind::NextLevel));
        let ids: Vec<&str> =
            items.iter().map(|i| i.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
    }

    #[test]
    fn next_level_follows_latest_completion_time() {
        let ctx = evening();
        let mut p = profile(2.0, LearningStyle::Mixed);
        complete(&mut p, "m1", ctx.current_time);
        // Logged afterwards, but it happened ten days earlier.
        complete(&mut p, "a1", ctx.current_time - Duration::days(10));
        let store = Arc::new(ProfileStore::new());
        store.restore(p);
        let scorer = RecommendationScorer::new(store);

        let items =
            scorer.generate_navigation_suggestions("kid", "/home", &math_catalog());
        let ids: Vec<&str> =
            items.iter().map(|i| i.activity_id.as_str()).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
    }

    #[test]
    fn no_next_level_without_completions() {
        let store = Arc::new(ProfileStore::new());
        store.restore(profile(2.0, LearningStyle::Mixed));
        let scorer = RecommendationScorer::new(store);

        assert!(
            scorer
                .generate_navigation_suggestions("kid", "/home", &math_catalog())
                .is_empty()
        );
    }
}
