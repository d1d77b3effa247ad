use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use crate::{
    content::EntryKind,
    context::Mood,
    error::Result,
    filter::{Bounds, SearchFilter},
    profile::{ChildInfo, LearningStyle, Performance},
    search::SearchOptions,
};

#[derive(Debug, Parser)]
#[command(
    name = "discovery",
    about = "Search a learning catalog and recommend activities to learners"
)]
pub struct Cli {
    /// Override the XDG data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Catalog file (defaults to <data-dir>/catalog.json)
    #[arg(long, global = true, env = "DISCOVERY_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Increase log verbosity (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search the catalog
    Search(SearchArgs),
    /// Type-ahead suggestions for a partial query
    Suggest(SuggestArgs),
    /// Ranked activity recommendations for a learner
    Recommend(RecommendArgs),
    /// Home-screen shortcuts for a learner
    QuickAccess(ChildArgs),
    /// Related and next-level activities for the current screen
    Navigate(NavigateArgs),
    /// Manage learner profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Record that a learner finished (or abandoned) an activity
    Complete(CompleteArgs),
    /// Show or clear the search history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Show or set the ids listed for an empty query
    Popular {
        #[command(subcommand)]
        action: PopularAction,
    },
    /// Show system status and statistics
    Status(StatusArgs),
    /// Generate shell completions
    #[command(hide = true)]
    Completions(CompletionsArgs),
}

// -- Search --

#[derive(Debug, Parser)]
pub struct SearchArgs {
    /// The search query (empty for popular picks)
    pub query: String,

    /// Number of results to return
    #[arg(short = 'n', long, default_value = "10")]
    pub count: usize,

    /// Only these categories (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Only entries with one of these tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Only activities at these difficulty levels (repeatable)
    #[arg(long = "difficulty", value_parser = clap::value_parser!(u8).range(1..=5))]
    pub difficulties: Vec<u8>,

    /// Youngest age the activity must suit
    #[arg(long, requires = "max_age")]
    pub min_age: Option<u32>,

    /// Oldest age the activity must suit
    #[arg(long, requires = "min_age")]
    pub max_age: Option<u32>,

    /// Shortest acceptable duration in minutes
    #[arg(long, requires = "max_duration")]
    pub min_duration: Option<u32>,

    /// Longest acceptable duration in minutes
    #[arg(long, requires = "min_duration")]
    pub max_duration: Option<u32>,

    #[arg(long)]
    pub language: Option<String>,

    #[arg(long)]
    pub status: Option<String>,

    /// Restrict to these entry kinds (repeatable)
    #[arg(long = "kind", value_enum)]
    pub kinds: Vec<EntryKind>,

    /// Minimum relevance a result must exceed
    #[arg(long, default_value = "0.3")]
    pub threshold: f32,

    /// Do not boost recently accessed activities
    #[arg(long)]
    pub no_recent_boost: bool,

    /// Do not boost favorite activities
    #[arg(long)]
    pub no_favorite_boost: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub fn filter(&self) -> SearchFilter {
        SearchFilter {
            categories: self.categories.iter().cloned().collect(),
            age_range: self.min_age.zip(self.max_age).map(|(lo, hi)| {
                Bounds::new(lo, hi)
            }),
            difficulty: self.difficulties.iter().copied().collect(),
            duration_range: self
                .min_duration
                .zip(self.max_duration)
                .map(|(lo, hi)| Bounds::new(lo, hi)),
            tags: self.tags.iter().cloned().collect(),
            status: self.status.clone(),
            language: self.language.clone(),
        }
    }

    pub fn options(&self) -> SearchOptions {
        let mut options = SearchOptions {
            fuzzy_threshold: self.threshold,
            max_results: self.count,
            boost_recent: !self.no_recent_boost,
            boost_favorites: !self.no_favorite_boost,
            ..Default::default()
        };
        if !self.kinds.is_empty() {
            options.include_kinds = self.kinds.iter().copied().collect();
        }
        options
    }
}

// -- Suggest --

#[derive(Debug, Parser)]
pub struct SuggestArgs {
    /// What the user has typed so far
    pub partial: String,

    /// Number of suggestions to return
    #[arg(short = 'n', long, default_value = "5")]
    pub count: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Recommendations --

#[derive(Debug, Parser)]
pub struct RecommendArgs {
    /// Learner id
    #[arg(long)]
    pub child: String,

    /// Minutes the current session has been running
    #[arg(long, default_value = "0")]
    pub session_minutes: u32,

    #[arg(long, value_enum)]
    pub mood: Option<Mood>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct ChildArgs {
    /// Learner id
    #[arg(long)]
    pub child: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Parser)]
pub struct NavigateArgs {
    /// Learner id
    #[arg(long)]
    pub child: String,

    /// Path of the screen being viewed, e.g. /activities/counting-train
    #[arg(long)]
    pub path: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Profile subcommands --

#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// Create a learner profile (no-op if it exists)
    Init(ProfileInitArgs),
    /// Print a learner profile
    Show {
        /// Learner id
        child: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a favorite category
    Favorite {
        /// Learner id
        child: String,
        category: String,
    },
    /// List learner ids
    List,
}

#[derive(Debug, Parser)]
pub struct ProfileInitArgs {
    /// Learner id
    pub child: String,

    /// Starting difficulty, 1 to 5
    #[arg(long, value_parser = parse_difficulty)]
    pub difficulty: Option<f64>,

    #[arg(long, value_enum)]
    pub learning_style: Option<LearningStyle>,

    /// Declared interests (repeatable)
    #[arg(long = "interest")]
    pub interests: Vec<String>,
}

impl ProfileInitArgs {
    pub fn child_info(&self) -> ChildInfo {
        ChildInfo {
            id: self.child.clone(),
            preferred_difficulty: self.difficulty,
            learning_style: self.learning_style,
            interests: self.interests.clone(),
        }
    }
}

fn parse_difficulty(raw: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (1.0..=5.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{raw} is not a difficulty between 1 and 5"))
    }
}

// -- Complete --

#[derive(Debug, Parser)]
pub struct CompleteArgs {
    /// Learner id
    #[arg(long)]
    pub child: String,

    /// Activity id
    #[arg(long)]
    pub activity: String,

    /// Minutes spent on the activity
    #[arg(long)]
    pub minutes: f64,

    /// The learner gave up before finishing
    #[arg(long)]
    pub abandoned: bool,

    /// Enjoyment rating, 1 to 5
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub enjoyment: Option<u8>,

    /// Skills the learner struggled with (repeatable)
    #[arg(long = "struggled")]
    pub struggled_with: Vec<String>,

    /// Skills the learner excelled at (repeatable)
    #[arg(long = "excelled")]
    pub excelled: Vec<String>,
}

impl CompleteArgs {
    /// `difficulty` is the activity's catalog difficulty.
    pub fn performance(&self, difficulty: u8) -> Performance {
        Performance {
            completed: !self.abandoned,
            time_spent_minutes: self.minutes,
            difficulty,
            enjoyment_rating: self.enjoyment,
            struggled_with: self.struggled_with.clone(),
            excelled: self.excelled.clone(),
            completed_at: None,
        }
    }
}

// -- History --

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// Print past queries, most recent first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget all past queries
    Clear,
}

// -- Popular --

#[derive(Debug, Subcommand)]
pub enum PopularAction {
    /// Print the popular ids in display order
    Show,
    /// Replace the popular ids
    Set {
        /// Entry ids, most popular first
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

// -- Status --

#[derive(Debug, Parser)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// -- Completions --

#[derive(Debug, Parser)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

impl CompletionsArgs {
    /// Generate shell completions and print to stdout.
    pub fn generate(&self) -> Result<()> {
        let mut cmd = Cli::command();
        clap_complete::generate(
            self.shell,
            &mut cmd,
            "discovery",
            &mut std::io::stdout(),
        );
        Ok(())
    }
}
