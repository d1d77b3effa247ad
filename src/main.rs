use std::path::Path;

use chrono::{Duration, Utc};
use clap::Parser;
use discovery::{
    catalog,
    cli::{self, Cli, Command, HistoryAction, PopularAction, ProfileAction},
    context::ContextBuilder,
    data_dir::DataDir,
    engine::DiscoveryEngine,
    error::{self, Error},
    recommend,
    search,
    store::EngineStore,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DISCOVERY_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        return args.generate();
    }

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let store = EngineStore::open(&data_dir.store_db())?;
    let catalog_path = cli
        .catalog
        .clone()
        .unwrap_or_else(|| data_dir.catalog_file());

    match cli.command {
        Command::Search(args) => {
            let engine = open_engine(&store, Some(catalog_path.as_path()))?;
            cmd_search(&engine, &store, &args)?;
        }
        Command::Suggest(args) => {
            let engine = open_engine(&store, Some(catalog_path.as_path()))?;
            let suggestions = engine.suggestions(&args.partial, args.count);
            if args.json {
                println!("{}", serde_json::to_string(&suggestions)?);
            } else {
                for s in &suggestions {
                    println!("{s}");
                }
            }
        }
        Command::Recommend(args) => {
            let engine = open_engine(&store, Some(catalog_path.as_path()))?;
            cmd_recommend(&engine, &args)?;
        }
        Command::QuickAccess(args) => {
            let engine = open_engine(&store, Some(catalog_path.as_path()))?;
            require_profile(&engine, &args.child)?;
            let items = engine.quick_access(&args.child);
            if args.json {
                println!("{}", serde_json::to_string(&items)?);
            } else if items.is_empty() {
                println!("No shortcuts.");
            } else {
                for item in &items {
                    println!(
                        "{:>2}\t{}\t{}",
                        item.priority, item.title, item.path
                    );
                }
            }
        }
        Command::Navigate(args) => {
            let engine = open_engine(&store, Some(catalog_path.as_path()))?;
            require_profile(&engine, &args.child)?;
            let items = engine.navigation_suggestions(&args.child, &args.path);
            if args.json {
                println!("{}", serde_json::to_string(&items)?);
            } else if items.is_empty() {
                println!("No suggestions.");
            } else {
                for item in &items {
                    let kind = match item.kind {
                        recommend::NavigationKind::Related => "related",
                        recommend::NavigationKind::NextLevel => "next",
                    };
                    println!("{kind}\t{}\t{}", item.title, item.path);
                }
            }
        }
        Command::Profile { action } => match action {
            ProfileAction::Init(args) => {
                let engine = open_engine(&store, None)?;
                let existed = engine.has_profile(&args.child);
                let profile = engine.initialize_profile(&args.child_info());
                store.save_profile(&profile)?;
                if existed {
                    println!("Profile '{}' already exists", args.child);
                } else {
                    println!("Created profile '{}'", args.child);
                }
            }
            ProfileAction::Show { child, json } => {
                cmd_profile_show(&store, &child, json)?;
            }
            ProfileAction::Favorite { child, category } => {
                let engine = open_engine(&store, None)?;
                let profile = engine
                    .add_favorite_category(&child, &category)
                    .ok_or_else(|| profile_not_found(&child))?;
                store.save_profile(&profile)?;
                println!(
                    "Favorites for '{child}': {}",
                    profile.favorite_categories.join(", ")
                );
            }
            ProfileAction::List => {
                for id in store.list_profile_ids()? {
                    println!("{id}");
                }
            }
        },
        Command::Complete(args) => {
            let engine = open_engine(&store, Some(catalog_path.as_path()))?;
            cmd_complete(&engine, &store, &args)?;
        }
        Command::History { action } => match action {
            HistoryAction::List { json } => {
                let history = store.load_history()?;
                if json {
                    println!("{}", serde_json::to_string(&history)?);
                } else {
                    for query in &history {
                        println!("{query}");
                    }
                }
            }
            HistoryAction::Clear => {
                store.save_history(&[])?;
                println!("Search history cleared");
            }
        },
        Command::Popular { action } => match action {
            PopularAction::Show => {
                let engine = open_engine(&store, None)?;
                for id in engine.search_engine().popular_ids() {
                    println!("{id}");
                }
            }
            PopularAction::Set { ids } => {
                store.save_popular_ids(&ids)?;
                println!("Saved {} popular ids", ids.len());
            }
        },
        Command::Status(args) => {
            cmd_status(&store, &data_dir, &catalog_path, args.json)?;
        }
        Command::Completions(args) => args.generate()?,
    }

    Ok(())
}

/// Build an engine from persisted state, loading the catalog when a path
/// is given.
fn open_engine(
    store: &EngineStore,
    catalog_path: Option<&Path>,
) -> error::Result<DiscoveryEngine> {
    let mut engine = DiscoveryEngine::new();
    if let Some(ids) = store.load_popular_ids()? {
        engine = engine.with_popular_ids(ids);
    }
    if let Some(path) = catalog_path {
        engine.load_catalog(&catalog::load_catalog(path)?);
    }
    engine.restore_from(store)?;
    Ok(engine)
}

fn profile_not_found(child: &str) -> Error {
    Error::NotFound {
        kind: "profile",
        name: child.to_string(),
    }
}

fn require_profile(engine: &DiscoveryEngine, child: &str) -> error::Result<()> {
    if engine.has_profile(child) {
        Ok(())
    } else {
        Err(profile_not_found(child))
    }
}

fn cmd_search(
    engine: &DiscoveryEngine,
    store: &EngineStore,
    args: &cli::SearchArgs,
) -> error::Result<()> {
    let results = engine.search(&args.query, &args.filter(), &args.options())?;

    engine.search_engine().add_to_history(&args.query);
    store.save_history(&engine.search_engine().history())?;

    if args.json {
        search::format_json(&results, &args.query)?;
    } else {
        search::format_human(&results);
    }
    Ok(())
}

fn cmd_recommend(
    engine: &DiscoveryEngine,
    args: &cli::RecommendArgs,
) -> error::Result<()> {
    require_profile(engine, &args.child)?;

    let now = Utc::now();
    let started = now - Duration::minutes(i64::from(args.session_minutes));
    let context = ContextBuilder::local(started)
        .with_mood(args.mood)
        .build_at(now);
    tracing::debug!(
        time_of_day = %context.time_of_day,
        session_minutes = context.session_length_minutes,
        "built personalization context"
    );

    let recommendations = engine.recommendations(&args.child, &context);
    if args.json {
        println!("{}", serde_json::to_string(&recommendations)?);
    } else {
        recommend::format_human(&recommendations);
    }
    Ok(())
}

fn cmd_complete(
    engine: &DiscoveryEngine,
    store: &EngineStore,
    args: &cli::CompleteArgs,
) -> error::Result<()> {
    let catalog = engine.catalog();
    let activity = catalog
        .get(&args.activity)
        .and_then(|e| e.entry.activity())
        .ok_or_else(|| Error::NotFound {
            kind: "activity",
            name: args.activity.clone(),
        })?;

    let profile = engine
        .record_completion(
            &args.child,
            &args.activity,
            &args.performance(activity.difficulty),
        )
        .ok_or_else(|| profile_not_found(&args.child))?;
    store.save_profile(&profile)?;

    println!(
        "Recorded '{}' for '{}' (difficulty now {:.1})",
        args.activity, args.child, profile.preferred_difficulty
    );
    Ok(())
}

fn cmd_profile_show(
    store: &EngineStore,
    child: &str,
    json: bool,
) -> error::Result<()> {
    let profile = store
        .load_profile(child)?
        .ok_or_else(|| profile_not_found(child))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        return Ok(());
    }

    let join = |set: &std::collections::BTreeSet<String>| {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    println!("Learner: {}", profile.child_id);
    println!("Preferred difficulty: {:.1}", profile.preferred_difficulty);
    println!(
        "Average session: {:.1} min",
        profile.avg_session_time_minutes
    );
    println!("Learning style: {}", profile.learning_style);
    println!("Favorites: {}", profile.favorite_categories.join(", "));
    println!("Interests: {}", join(&profile.interests));
    println!("Completed: {}", profile.completed_activity_ids.len());
    println!("Struggling with: {}", join(&profile.struggling_areas));
    println!("Strengths: {}", join(&profile.strengths));
    Ok(())
}

fn cmd_status(
    store: &EngineStore,
    data_dir: &DataDir,
    catalog_path: &Path,
    json: bool,
) -> error::Result<()> {
    let entries = match catalog::load_catalog(catalog_path) {
        Ok(entries) => Some(entries.len()),
        Err(Error::NotFound { .. }) => None,
        Err(e) => return Err(e),
    };
    let profiles = store.list_profile_ids()?.len();
    let history = store.load_history()?.len();

    if json {
        let status = serde_json::json!({
            "data_dir": data_dir.root(),
            "catalog": catalog_path,
            "entries": entries,
            "profiles": profiles,
            "history": history,
        });
        println!("{status}");
    } else {
        println!("Data directory: {}", data_dir.root().display());
        match entries {
            Some(n) => {
                println!("Catalog: {} ({n} entries)", catalog_path.display())
            }
            None => println!("Catalog: {} (missing)", catalog_path.display()),
        }
        println!("Profiles: {profiles}");
        println!("Search history: {history}");
    }
    Ok(())
}
