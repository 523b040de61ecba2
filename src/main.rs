use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use feedboard::config::Config;
use feedboard::feed::{Aggregator, Article, Discoverer, FeedFetcher};
use feedboard::storage::{Favorite, JsonFileStore, UserStore};
use feedboard::util::strip_control_chars;

const DEFAULT_USER: &str = "Default User";

/// Get the config directory path (~/.config/feedboard/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("feedboard"))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedboard",
    about = "Read RSS/Atom feeds by category and find feeds on any website"
)]
struct Args {
    /// User whose feeds and categories to use
    #[arg(long, global = true, default_value = DEFAULT_USER)]
    user: String,

    /// Config file (default: ~/.config/feedboard/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every feed in a category and list articles, newest first
    Read {
        category: String,
        /// Print articles as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look for RSS/Atom feed links on a website
    Discover {
        url: String,
        /// Print candidates as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a feed source to a category
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        #[arg(long)]
        category: String,
    },
    /// Remove a feed by id, every feed in a category, or all feeds
    Remove {
        #[arg(required_unless_present_any = ["category", "all"])]
        id: Option<String>,
        #[arg(long, conflicts_with_all = ["id", "all"])]
        category: Option<String>,
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// List feed sources
    Feeds {
        #[arg(long)]
        category: Option<String>,
    },
    /// List categories
    Categories,
    /// Create a category
    AddCategory { name: String },
    /// Delete a category name (its feeds are kept)
    RemoveCategory { name: String },
    /// Saved articles and their categories
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
    /// List, create or delete users
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FavoritesCommand {
    /// List saved articles, newest first
    List {
        #[arg(long)]
        category: Option<String>,
        /// Print favorites as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save an article (no-op if its link is already saved)
    Save {
        #[arg(long)]
        title: String,
        #[arg(long)]
        link: String,
        #[arg(long, default_value = "")]
        thumbnail: String,
        #[arg(long, default_value = "")]
        source: String,
        #[arg(long, default_value = "Read Later")]
        category: String,
    },
    /// Delete a saved article by link
    Remove { link: String },
    /// List favorites categories
    Categories,
    /// Create a favorites category
    AddCategory { name: String },
    /// Delete a favorites category and every article saved under it
    RemoveCategory { name: String },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    List,
    Create { name: String },
    /// Delete a user and all of their data
    Delete { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let data_dir = config.data_dir.clone().unwrap_or(config_dir);
    let store = JsonFileStore::in_dir(&data_dir);

    let client = reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .context("Failed to build HTTP client")?;

    match args.command {
        Command::Read { category, json } => {
            let user_config = store.load(&args.user)?;
            let sources = user_config.feeds_in_category(&category);
            if sources.is_empty() {
                eprintln!("No feeds in category '{category}'.");
                return Ok(());
            }

            let aggregator = Aggregator::new(FeedFetcher::from_config(client, &config))
                .with_max_concurrent(config.max_concurrent_fetches);
            let result = aggregator.aggregate_detailed(&sources).await;

            for failed in result.failures() {
                if let Some(e) = &failed.error {
                    eprintln!("warning: {} could not be loaded: {e}", failed.source_name);
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&result.articles)?);
            } else {
                println!(
                    "{} ({} articles from {} feeds)\n",
                    category,
                    result.articles.len(),
                    sources.len()
                );
                for article in &result.articles {
                    print_article(article);
                }
            }
        }
        Command::Discover { url, json } => {
            let discovery = Discoverer::from_config(client, &config)
                .discover(&url)
                .await;

            if json {
                println!("{}", serde_json::to_string_pretty(&discovery.candidates)?);
            } else {
                println!("Searched {}\n", discovery.url);
                for candidate in &discovery.candidates {
                    println!("  {}\n    {}", strip_control_chars(&candidate.title), candidate.url);
                }
            }
            if let Some(error) = discovery.error {
                eprintln!("{error}");
            }
        }
        Command::Add {
            name,
            url,
            category,
        } => {
            let mut user_config = store.load(&args.user)?;
            let added = user_config.add_feed(&name, &url, &category)?.clone();
            store.save(&args.user, &user_config)?;
            println!("Saved {} [{}] to {}", added.name, added.id, added.category);
        }
        Command::Remove { id, category, all } => {
            let mut user_config = store.load(&args.user)?;
            if all {
                let removed = user_config.remove_all_feeds();
                println!("Removed all {removed} feeds");
            } else if let Some(category) = category {
                let removed = user_config.remove_category_feeds(&category);
                println!("Removed {removed} feeds from {category}");
            } else if let Some(id) = id {
                if !user_config.remove_feed(&id) {
                    anyhow::bail!("No feed with id '{id}'");
                }
                println!("Removed feed {id}");
            }
            store.save(&args.user, &user_config)?;
        }
        Command::Feeds { category } => {
            let user_config = store.load(&args.user)?;
            let feeds = match &category {
                Some(c) => user_config.feeds_in_category(c),
                None => user_config.feeds.clone(),
            };
            for feed in feeds {
                println!("{:<14} {:<14} {:<20} {}", feed.id, feed.category, feed.name, feed.url);
            }
        }
        Command::Categories => {
            let user_config = store.load(&args.user)?;
            for category in &user_config.categories {
                let count = user_config.feeds_in_category(category).len();
                println!("{category} ({count})");
            }
        }
        Command::AddCategory { name } => {
            let mut user_config = store.load(&args.user)?;
            user_config.add_category(&name)?;
            store.save(&args.user, &user_config)?;
            println!("Added category {}", name.trim());
        }
        Command::RemoveCategory { name } => {
            let mut user_config = store.load(&args.user)?;
            if !user_config.remove_category(&name) {
                anyhow::bail!("No category named '{name}'");
            }
            store.save(&args.user, &user_config)?;
            println!("Removed category {name}");
        }
        Command::Favorites { action } => run_favorites(&store, &args.user, action)?,
        Command::Users { action } => run_users(&store, &args.user, action)?,
    }

    Ok(())
}

fn run_favorites(store: &impl UserStore, user: &str, action: FavoritesCommand) -> Result<()> {
    let mut user_config = store.load(user)?;

    match action {
        FavoritesCommand::List { category, json } => {
            let favorites: Vec<&Favorite> = match &category {
                Some(c) => user_config.favorites_in(c).collect(),
                None => user_config.favorites.iter().collect(),
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&favorites)?);
            } else {
                for favorite in favorites {
                    println!(
                        "[{}] {}\n    {} | {}\n",
                        favorite.fav_category,
                        strip_control_chars(&favorite.title),
                        favorite.source,
                        favorite.link
                    );
                }
            }
            return Ok(());
        }
        FavoritesCommand::Categories => {
            for category in &user_config.fav_categories {
                let count = user_config.favorites_in(category).count();
                println!("{category} ({count})");
            }
            return Ok(());
        }
        FavoritesCommand::Save {
            title,
            link,
            thumbnail,
            source,
            category,
        } => {
            let favorite = Favorite::new(&title, &link, &thumbnail, &source, &category);
            if !user_config.save_favorite(favorite) {
                println!("Already saved: {link}");
                return Ok(());
            }
            println!("Saved {} to {}", title.trim(), category.trim());
        }
        FavoritesCommand::Remove { link } => {
            if !user_config.remove_favorite(&link) {
                anyhow::bail!("No saved article with link '{link}'");
            }
            println!("Removed {link}");
        }
        FavoritesCommand::AddCategory { name } => {
            user_config.add_fav_category(&name)?;
            println!("Added favorites category {}", name.trim());
        }
        FavoritesCommand::RemoveCategory { name } => {
            let Some(dropped) = user_config.remove_fav_category(&name) else {
                anyhow::bail!("No favorites category named '{name}'");
            };
            println!("Removed favorites category {name} and {dropped} saved articles");
        }
    }

    store.save(user, &user_config)?;
    Ok(())
}

fn run_users(store: &impl UserStore, current: &str, action: UsersCommand) -> Result<()> {
    match action {
        UsersCommand::List => {
            for name in store.users()? {
                let marker = if name == current { "*" } else { " " };
                println!("{marker} {name}");
            }
        }
        UsersCommand::Create { name } => {
            store.create_user(&name)?;
            println!("Created user {}", name.trim());
        }
        UsersCommand::Delete { name } => {
            if !store.delete_user(&name)? {
                anyhow::bail!("No user named '{name}'");
            }
            println!("Deleted user {name}");
        }
    }
    Ok(())
}

fn print_article(article: &Article) {
    println!("[{}] {}", article.source, strip_control_chars(&article.title));
    println!("    {} | {}", article.published, article.link);
    if !article.summary.is_empty() {
        println!("    {}", article.summary);
    }
    println!();
}
