//! Command-line interface for contentkit.
//!
//! Provides commands for fetching single items, listing collections,
//! linting frontmatter and inspecting the resolved configuration.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::Value;

use crate::config;
use crate::content::service::{ItemResult, ListResult};
use crate::content::{ContentRecord, ContentResult, ContentService, ContentType};
use crate::schema::Frontmatter;

/// contentkit - markdown content loading, validation and caching
#[derive(Parser, Debug)]
#[command(name = "contentkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a single content item
    Fetch {
        /// Content type
        #[arg(value_enum)]
        content_type: TypeArg,

        /// Item slug (empty for the index document)
        slug: String,

        /// Language (defaults to the configured default)
        #[arg(short, long)]
        lang: Option<String>,

        /// Directory for pages
        #[arg(short, long, default_value = "pages")]
        path: String,

        /// Print the full record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List all items of a type
    List {
        #[arg(value_enum)]
        content_type: TypeArg,

        #[arg(short, long)]
        lang: Option<String>,

        #[arg(short, long, default_value = "pages")]
        path: String,
    },

    /// List items without fetching bodies
    Metadata {
        #[arg(value_enum)]
        content_type: TypeArg,

        #[arg(short, long)]
        lang: Option<String>,

        /// Directory to list (defaults to the type's storage path)
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Validate every item of a type, reporting unknown frontmatter fields
    Lint {
        #[arg(value_enum)]
        content_type: TypeArg,

        #[arg(short, long)]
        lang: Option<String>,

        #[arg(short, long, default_value = "pages")]
        path: String,
    },

    /// Show resolved configuration
    Config,
}

/// Content type for CLI (maps to ContentType)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TypeArg {
    Story,
    Blogpost,
    Page,
    Offer,
}

impl From<TypeArg> for ContentType {
    fn from(t: TypeArg) -> Self {
        match t {
            TypeArg::Story => ContentType::Story,
            TypeArg::Blogpost => ContentType::Blogpost,
            TypeArg::Page => ContentType::Page,
            TypeArg::Offer => ContentType::Offer,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Fetch {
                content_type,
                slug,
                lang,
                path,
                json,
            } => fetch_item(content_type.into(), &slug, lang.as_deref(), &path, json).await,
            Commands::List {
                content_type,
                lang,
                path,
            } => list_items(content_type.into(), lang.as_deref(), &path, false).await,
            Commands::Metadata {
                content_type,
                lang,
                path,
            } => list_metadata(content_type.into(), lang.as_deref(), path.as_deref()).await,
            Commands::Lint {
                content_type,
                lang,
                path,
            } => list_items(content_type.into(), lang.as_deref(), &path, true).await,
            Commands::Config => show_config(),
        }
    }
}

fn service(lint: bool) -> Result<ContentService> {
    let cfg = config::config()?;
    let service = ContentService::from_config(cfg).context("Failed to set up content source")?;
    Ok(service.with_lint(lint || cfg.lint_unknown_fields))
}

/// Print the status line and exit non-zero unless the fetch succeeded
fn finish<T>(result: &ContentResult<T>) {
    eprintln!("[{} {}]", result.status_code(), result.state());
    match result {
        ContentResult::Success(_) => {}
        ContentResult::ValidationError(issues) => {
            for issue in issues {
                eprintln!("  - {}", issue);
            }
            std::process::exit(1);
        }
        ContentResult::SourceError(e) => {
            eprintln!("  {}", e);
            std::process::exit(1);
        }
        ContentResult::NotFound | ContentResult::Ignored => std::process::exit(1),
    }
}

async fn fetch_item(
    content_type: ContentType,
    slug: &str,
    lang: Option<&str>,
    path: &str,
    json: bool,
) -> Result<()> {
    let service = service(false)?;

    match content_type {
        ContentType::Story => print_item(service.story(slug, lang).await, json),
        ContentType::Blogpost => print_item(service.blog_post(slug, lang).await, json),
        ContentType::Offer => print_item(service.offer(slug, lang).await, json),
        ContentType::Page => print_item(service.page(path, slug).await, json),
    }
}

fn print_item<T: Frontmatter>(result: ItemResult<T>, json: bool) -> Result<()> {
    if let ContentResult::Success(record) = &result {
        if json {
            println!("{}", serde_json::to_string_pretty(record.as_ref())?);
        } else {
            println!("Slug: {}", display_slug(&record.slug));
            print!("{}", serde_yaml::to_string(&record.frontmatter)?);
            println!("Body text: {} chars", record.content.text().chars().count());
        }
    }
    finish(&result);
    Ok(())
}

async fn list_items(
    content_type: ContentType,
    lang: Option<&str>,
    path: &str,
    lint: bool,
) -> Result<()> {
    let service = service(lint)?;

    match content_type {
        ContentType::Story => print_list(service.stories(lang).await),
        ContentType::Blogpost => print_list(service.blog_posts(lang).await),
        ContentType::Offer => print_list(service.offers(lang).await),
        ContentType::Page => print_list(service.pages(path).await),
    }
}

fn print_list<T: Frontmatter>(result: ListResult<T>) -> Result<()> {
    if let ContentResult::Success(records) = &result {
        if records.is_empty() {
            println!("No items found");
        } else {
            println!("{:<32} {:<50}", "SLUG", "TITLE");
            println!("{}", "-".repeat(82));
            for record in records.iter() {
                println!("{:<32} {:<50}", display_slug(&record.slug), title_of(record)?);
            }
            println!("\nTotal: {} items", records.len());
        }
    }
    finish(&result);
    Ok(())
}

async fn list_metadata(
    content_type: ContentType,
    lang: Option<&str>,
    path: Option<&str>,
) -> Result<()> {
    let service = service(false)?;
    let result = service.metadata(content_type, lang, path).await;

    if let ContentResult::Success(items) = &result {
        println!("{:<32} {:<40} {:>10}", "SLUG", "PATH", "SIZE");
        println!("{}", "-".repeat(84));
        for item in items.iter() {
            println!("{:<32} {:<40} {:>10}", display_slug(&item.slug), item.path, item.size);
        }
        println!("\nTotal: {} items", items.len());
    }
    finish(&result);
    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("Config file: {}", cfg.config_file.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "(none - using defaults)".to_string()));
    println!();
    println!("Source:");
    println!("{}", serde_json::to_string_pretty(&cfg.source.describe())?);
    println!();
    println!("Cache:");
    println!("  TTL:          {}s", cfg.cache.ttl.as_secs());
    println!("  Max entries:  {}", cfg.cache.max_entries);
    println!("  Max size:     {} bytes", cfg.cache.max_size_bytes);
    println!("  Cleanup:      every {}s", cfg.cache.cleanup_interval.as_secs());
    println!();
    println!("Languages: {} (default: {})", cfg.languages.join(", "), cfg.default_language);
    println!("Lint unknown fields: {}", cfg.lint_unknown_fields);

    Ok(())
}

fn display_slug(slug: &str) -> &str {
    if slug.is_empty() {
        "(index)"
    } else {
        slug
    }
}

fn title_of<T: Serialize>(record: &ContentRecord<T>) -> Result<String> {
    let frontmatter = serde_json::to_value(&record.frontmatter)?;
    Ok(frontmatter
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}
