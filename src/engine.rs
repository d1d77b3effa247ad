use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    content::ContentEntry,
    content_index::{ContentIndex, ContentRepository, IndexSnapshot},
    context::PersonalizationContext,
    error::Result,
    filter::SearchFilter,
    profile::{ChildInfo, Performance, ProfileStore, UserPreferenceProfile},
    recommend::{
        NavigationItem,
        QuickAccessItem,
        RecommendationScore,
        RecommendationScorer,
    },
    search::{SearchEngine, SearchOptions, SearchResult},
    store::EngineStore,
};

/// Owns one instance of every discovery component and wires them to a
/// shared catalog.
#[derive(Debug)]
pub struct DiscoveryEngine {
    index: Arc<ContentIndex>,
    search: SearchEngine,
    profiles: Arc<ProfileStore>,
    scorer: RecommendationScorer,
}

impl Default for DiscoveryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscoveryEngine {
    pub fn new() -> Self {
        let index = Arc::new(ContentIndex::new());
        let profiles = Arc::new(ProfileStore::new());
        Self {
            search: SearchEngine::new(index.clone()),
            scorer: RecommendationScorer::new(profiles.clone()),
            index,
            profiles,
        }
    }

    pub fn with_catalog(catalog: &[ContentEntry]) -> Self {
        let engine = Self::new();
        engine.load_catalog(catalog);
        engine
    }

    /// Replace the ids shown for a blank query.
    pub fn with_popular_ids(mut self, ids: Vec<String>) -> Self {
        self.search = self.search.with_popular_ids(ids);
        self
    }

    /// Replace the catalog and drop every cached recommendation ranked
    /// against the old one.
    pub fn load_catalog(&self, catalog: &[ContentEntry]) {
        self.search.initialize_index(catalog);
        self.scorer.clear();
    }

    pub fn catalog(&self) -> Arc<IndexSnapshot> {
        self.index.snapshot()
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    /// A copy of the learner's profile. Changes go through the engine so
    /// cached recommendations stay in step.
    pub fn profile(&self, child_id: &str) -> Option<UserPreferenceProfile> {
        self.profiles.get(child_id)
    }

    pub fn has_profile(&self, child_id: &str) -> bool {
        self.profiles.contains(child_id)
    }

    pub fn scorer(&self) -> &RecommendationScorer {
        &self.scorer
    }

    // -- Search --

    pub fn search(
        &self,
        query: &str,
        filter: &SearchFilter,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>> {
        self.search.try_search(query, filter, options)
    }

    pub fn suggestions(&self, partial: &str, limit: usize) -> Vec<String> {
        self.search.suggestions(partial, limit)
    }

    // -- Profiles --

    pub fn initialize_profile(&self, child: &ChildInfo) -> UserPreferenceProfile {
        self.profiles.initialize_profile(child)
    }

    pub fn record_completion(
        &self,
        child_id: &str,
        activity_id: &str,
        performance: &Performance,
    ) -> Option<UserPreferenceProfile> {
        self.record_completion_at(child_id, activity_id, performance, Utc::now())
    }

    /// Update the learner's profile and drop their cached
    /// recommendations.
    pub fn record_completion_at(
        &self,
        child_id: &str,
        activity_id: &str,
        performance: &Performance,
        now: DateTime<Utc>,
    ) -> Option<UserPreferenceProfile> {
        let updated = self.profiles.update_profile_at(
            child_id,
            activity_id,
            performance,
            now,
        )?;
        self.scorer.invalidate(child_id);
        Some(updated)
    }

    pub fn add_favorite_category(
        &self,
        child_id: &str,
        category: &str,
    ) -> Option<UserPreferenceProfile> {
        let updated =
            self.profiles.update_favorite_categories(child_id, category)?;
        self.scorer.invalidate(child_id);
        Some(updated)
    }

    // -- Recommendations --

    pub fn recommendations(
        &self,
        child_id: &str,
        context: &PersonalizationContext,
    ) -> Vec<RecommendationScore> {
        self.scorer
            .generate_recommendations(child_id, &self.catalog(), context)
    }

    pub fn quick_access(&self, child_id: &str) -> Vec<QuickAccessItem> {
        self.scorer.generate_quick_access(child_id, &self.catalog())
    }

    pub fn navigation_suggestions(
        &self,
        child_id: &str,
        current_path: &str,
    ) -> Vec<NavigationItem> {
        self.scorer.generate_navigation_suggestions(
            child_id,
            current_path,
            &self.catalog(),
        )
    }

    // -- Persistence --

    /// Load profiles and search history saved by a previous run.
    pub fn restore_from(&self, store: &EngineStore) -> Result<()> {
        let profiles = store.load_profiles()?;
        let count = profiles.len();
        for profile in profiles {
            self.scorer.invalidate(&profile.child_id);
            self.profiles.restore(profile);
        }
        self.search.restore_history(store.load_history()?);
        tracing::debug!(profiles = count, "restored engine state");
        Ok(())
    }

    /// Write every profile and the search history back to `store`.
    pub fn persist_to(&self, store: &EngineStore) -> Result<()> {
        store.save_profiles(&self.profiles.profiles())?;
        store.save_history(&self.search.history())?;
        Ok(())
    }
}
