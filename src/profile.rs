use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub const MAX_FAVORITE_CATEGORIES: usize = 5;
pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 5.0;
pub const DEFAULT_DIFFICULTY: f64 = 3.0;
pub const DEFAULT_SESSION_MINUTES: f64 = 20.0;
/// Weight of the newest observation in the session-time moving average.
const SESSION_EMA_ALPHA: f64 = 0.2;
const DIFFICULTY_STEP_UP: f64 = 0.1;
const DIFFICULTY_STEP_DOWN: f64 = 0.2;
/// Enjoyment rating at or above which a completion nudges difficulty up.
const ENJOYMENT_THRESHOLD: u8 = 4;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LearningStyle {
    Visual,
    Auditory,
    Kinesthetic,
    #[default]
    Mixed,
}

impl LearningStyle {
    /// Keywords suggesting an activity suits this style. `None` means the
    /// style suits everything.
    pub fn keywords(self) -> Option<&'static [&'static str]> {
        match self {
            LearningStyle::Visual => {
                Some(&["art", "visual", "colors", "shapes", "reading"])
            }
            LearningStyle::Auditory => {
                Some(&["music", "sounds", "language", "phonics"])
            }
            LearningStyle::Kinesthetic => {
                Some(&["physical", "movement", "hands-on", "building"])
            }
            LearningStyle::Mixed => None,
        }
    }
}

impl std::fmt::Display for LearningStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LearningStyle::Visual => "visual",
            LearningStyle::Auditory => "auditory",
            LearningStyle::Kinesthetic => "kinesthetic",
            LearningStyle::Mixed => "mixed",
        })
    }
}

/// What a learner declared about themselves at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildInfo {
    pub id: String,
    /// Out-of-range values are clamped; non-finite ones are ignored.
    #[serde(default)]
    pub preferred_difficulty: Option<f64>,
    #[serde(default)]
    pub learning_style: Option<LearningStyle>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Outcome of one attempt at an activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub completed: bool,
    pub time_spent_minutes: f64,
    pub difficulty: u8,
    /// 1 to 5.
    #[serde(default)]
    pub enjoyment_rating: Option<u8>,
    #[serde(default)]
    pub struggled_with: Vec<String>,
    #[serde(default)]
    pub excelled: Vec<String>,
    /// When the attempt finished. Defaults to the time it is recorded.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub activity_id: String,
    pub completed_at: DateTime<Utc>,
    pub difficulty: u8,
}

/// Everything the recommender knows about one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferenceProfile {
    pub child_id: String,
    /// Oldest first, at most [`MAX_FAVORITE_CATEGORIES`].
    pub favorite_categories: Vec<String>,
    pub preferred_difficulty: f64,
    pub avg_session_time_minutes: f64,
    pub learning_style: LearningStyle,
    pub interests: BTreeSet<String>,
    pub completed_activity_ids: BTreeSet<String>,
    pub struggling_areas: BTreeSet<String>,
    pub strengths: BTreeSet<String>,
    /// Latest completion per activity, in the order they were recorded.
    #[serde(default)]
    pub completions: Vec<CompletionRecord>,
}

impl UserPreferenceProfile {
    pub fn new(child: &ChildInfo) -> Self {
        Self {
            child_id: child.id.clone(),
            favorite_categories: Vec::new(),
            preferred_difficulty: child
                .preferred_difficulty
                .filter(|d| d.is_finite())
                .unwrap_or(DEFAULT_DIFFICULTY)
                .clamp(MIN_DIFFICULTY, MAX_DIFFICULTY),
            avg_session_time_minutes: DEFAULT_SESSION_MINUTES,
            learning_style: child.learning_style.unwrap_or_default(),
            interests: child.interests.iter().cloned().collect(),
            completed_activity_ids: BTreeSet::new(),
            struggling_areas: BTreeSet::new(),
            strengths: BTreeSet::new(),
            completions: Vec::new(),
        }
    }

    /// Fold one completion event into the profile.
    ///
    /// `now` stamps the event when `performance.completed_at` is absent.
    pub fn apply(
        &mut self,
        activity_id: &str,
        performance: &Performance,
        now: DateTime<Utc>,
    ) {
        if performance.completed {
            self.completed_activity_ids.insert(activity_id.to_string());
            self.record_completion(CompletionRecord {
                activity_id: activity_id.to_string(),
                completed_at: performance.completed_at.unwrap_or(now),
                difficulty: performance.difficulty,
            });
        }

        self.avg_session_time_minutes = (1.0 - SESSION_EMA_ALPHA)
            * self.avg_session_time_minutes
            + SESSION_EMA_ALPHA * performance.time_spent_minutes.max(0.0);

        if performance.completed {
            if performance
                .enjoyment_rating
                .is_some_and(|r| r >= ENJOYMENT_THRESHOLD)
            {
                self.preferred_difficulty = (self.preferred_difficulty
                    + DIFFICULTY_STEP_UP)
                    .min(MAX_DIFFICULTY);
            }
        } else {
            self.preferred_difficulty = (self.preferred_difficulty
                - DIFFICULTY_STEP_DOWN)
                .max(MIN_DIFFICULTY);
        }

        self.struggling_areas
            .extend(performance.struggled_with.iter().cloned());
        self.strengths.extend(performance.excelled.iter().cloned());
    }

    /// Keep `record` unless the activity already has a later one.
    fn record_completion(&mut self, record: CompletionRecord) {
        let previous = self
            .completions
            .iter()
            .position(|c| c.activity_id == record.activity_id);
        if let Some(i) = previous {
            if self.completions[i].completed_at > record.completed_at {
                return;
            }
            self.completions.remove(i);
        }
        self.completions.push(record);
    }

    /// Append `category` unless present, evicting the oldest favorite when
    /// the list grows past [`MAX_FAVORITE_CATEGORIES`].
    pub fn add_favorite_category(&mut self, category: &str) {
        if self.favorite_categories.iter().any(|c| c == category) {
            return;
        }
        self.favorite_categories.push(category.to_string());
        if self.favorite_categories.len() > MAX_FAVORITE_CATEGORIES {
            self.favorite_categories.remove(0);
        }
    }

    /// Latest recorded completion time for `activity_id`.
    pub fn last_completed_at(&self, activity_id: &str) -> Option<DateTime<Utc>> {
        self.completions
            .iter()
            .filter(|c| c.activity_id == activity_id)
            .map(|c| c.completed_at)
            .max()
    }

    /// The completion with the latest timestamp. Ties go to the one
    /// recorded last.
    pub fn latest_completion(&self) -> Option<&CompletionRecord> {
        self.completions.iter().max_by_key(|c| c.completed_at)
    }

    pub fn has_completed(&self, activity_id: &str) -> bool {
        self.completed_activity_ids.contains(activity_id)
    }
}

type SharedProfile = Arc<RwLock<UserPreferenceProfile>>;

/// One profile per learner, each behind its own lock so updates for
/// different learners never wait on each other.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: RwLock<HashMap<String, SharedProfile>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shared(&self, child_id: &str) -> Option<SharedProfile> {
        self.profiles.read().get(child_id).cloned()
    }

    /// Create the learner's profile on first contact. Later calls return
    /// the existing profile untouched.
    pub fn initialize_profile(&self, child: &ChildInfo) -> UserPreferenceProfile {
        let mut profiles = self.profiles.write();
        let shared = profiles.entry(child.id.clone()).or_insert_with(|| {
            tracing::debug!(child = %child.id, "creating preference profile");
            Arc::new(RwLock::new(UserPreferenceProfile::new(child)))
        });
        shared.read().clone()
    }

    pub fn get(&self, child_id: &str) -> Option<UserPreferenceProfile> {
        self.shared(child_id).map(|p| p.read().clone())
    }

    pub fn contains(&self, child_id: &str) -> bool {
        self.profiles.read().contains_key(child_id)
    }

    /// Record a completion event as of now. See
    /// [`update_profile_at`](Self::update_profile_at).
    pub fn update_profile(
        &self,
        child_id: &str,
        activity_id: &str,
        performance: &Performance,
    ) -> Option<UserPreferenceProfile> {
        self.update_profile_at(child_id, activity_id, performance, Utc::now())
    }

    /// Fold a completion event into the learner's profile and return the
    /// updated copy. Unknown learners are ignored.
    pub fn update_profile_at(
        &self,
        child_id: &str,
        activity_id: &str,
        performance: &Performance,
        now: DateTime<Utc>,
    ) -> Option<UserPreferenceProfile> {
        let Some(shared) = self.shared(child_id) else {
            tracing::debug!(child = child_id, "no profile; update ignored");
            return None;
        };
        let mut profile = shared.write();
        profile.apply(activity_id, performance, now);
        tracing::debug!(
            child = child_id,
            activity = activity_id,
            completed = performance.completed,
            difficulty = profile.preferred_difficulty,
            "profile updated"
        );
        Some(profile.clone())
    }

    pub fn update_favorite_categories(
        &self,
        child_id: &str,
        category: &str,
    ) -> Option<UserPreferenceProfile> {
        let shared = self.shared(child_id)?;
        let mut profile = shared.write();
        profile.add_favorite_category(category);
        Some(profile.clone())
    }

    /// Insert or replace a profile read back from storage.
    pub fn restore(&self, profile: UserPreferenceProfile) {
        self.profiles.write().insert(
            profile.child_id.clone(),
            Arc::new(RwLock::new(profile)),
        );
    }

    /// Copies of every profile, ordered by child id.
    pub fn profiles(&self) -> Vec<UserPreferenceProfile> {
        let mut all: Vec<UserPreferenceProfile> = self
            .profiles
            .read()
            .values()
            .map(|p| p.read().clone())
            .collect();
        all.sort_by(|a, b| a.child_id.cmp(&b.child_id));
        all
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}
