mod content;
mod markdown;
mod render;

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use folio_core::{
    all_tags, http_client, spawn_refresher, ArticleFeed, FeedEvent, FeedPhase, FeedSnapshot,
    FileStore, FolioConfig, LanguageFilter, ListingState, LocalArticle, LocalCache, QiitaClient,
    RefreshConfig, RemoteArticle,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::content::{find_post, load_posts, ContentError, Post};
use crate::markdown::render_markdown;

#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Blog posts and Qiita articles in one listing")]
struct Cli {
    /// Directory holding the markdown posts.
    #[arg(long, global = true, default_value = "content/blog")]
    content: PathBuf,
    /// Where the Qiita cache lives (defaults to the user cache directory).
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Never contact Qiita; use whatever the cache still holds.
    #[arg(long, global = true)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one page of the merged listing.
    List(ListArgs),
    /// Print every tag used by either source.
    Tags,
    /// Render a local post to HTML on stdout.
    Show { slug: String },
    /// Open an article in the browser.
    Open { slug: String },
    /// Keep the Qiita feed fresh and report each refresh until Ctrl-C.
    Watch,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long, value_enum, default_value_t = LanguageArg::Both)]
    language: LanguageArg,
    #[arg(long, default_value = "")]
    search: String,
    /// Required tag; repeat for several (all must match).
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, value_enum, default_value_t = ViewArg::Index)]
    view: ViewArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LanguageArg {
    English,
    Japanese,
    Both,
}

impl From<LanguageArg> for LanguageFilter {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::English => LanguageFilter::English,
            LanguageArg::Japanese => LanguageFilter::Japanese,
            LanguageArg::Both => LanguageFilter::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ViewArg {
    Home,
    Index,
    Compact,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FolioConfig::load_from(path)?,
        None => FolioConfig::load(),
    };
    let posts = load_posts(&cli.content)?;
    let local: Vec<LocalArticle> = posts.iter().map(|post| post.article.clone()).collect();

    let cache = open_cache(cli.cache_dir.as_deref(), &config);
    let client = QiitaClient::new(http_client(&config.qiita)?, config.qiita.items_url()?);
    let feed = ArticleFeed::new(client, cache.clone());

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::List(args) => {
            let snapshot = load_remote(&feed, &cache, cli.offline).await;
            let page_size = match args.view {
                ViewArg::Home => config.listing.home_page_size,
                ViewArg::Index => config.listing.index_page_size,
                ViewArg::Compact => config.listing.compact_page_size,
            };
            let mut state = ListingState::new(page_size);
            state.set_language(args.language.into());
            state.set_search(args.search);
            for tag in &args.tags {
                state.toggle_tag(tag);
            }
            let total = state.view(&local, &snapshot.articles).total_pages;
            state.go_to(args.page, total);

            render::write_banner(&mut stdout, &snapshot)?;
            render::write_page(&mut stdout, &state.view(&local, &snapshot.articles))?;
        }
        Command::Tags => {
            let snapshot = load_remote(&feed, &cache, cli.offline).await;
            render::write_tags(&mut stdout, &all_tags(&local, &snapshot.articles))?;
        }
        Command::Show { slug } => {
            let post = find_post(&posts, &slug)?;
            writeln!(stdout, "{}", render_markdown(&post.body)?)?;
        }
        Command::Open { slug } => match find_post(&posts, &slug) {
            Ok(post) => open_local_post(post)?,
            Err(_) => {
                let snapshot = load_remote(&feed, &cache, cli.offline).await;
                let article = find_remote(&snapshot.articles, &slug)?;
                webbrowser::open(&article.url)?;
            }
        },
        Command::Watch => {
            drop(stdout);
            watch(feed, &config).await?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn open_cache(dir: Option<&Path>, config: &FolioConfig) -> LocalCache {
    let dir = dir
        .map(Path::to_path_buf)
        .or_else(|| dirs::cache_dir().map(|dir| dir.join("folio")));
    match dir {
        Some(dir) => LocalCache::new(Arc::new(FileStore::new(dir))).with_ttl(config.cache.ttl()),
        None => {
            warn!("no cache directory available; Qiita responses will not be cached");
            LocalCache::unavailable()
        }
    }
}

async fn load_remote(feed: &ArticleFeed, cache: &LocalCache, offline: bool) -> FeedSnapshot {
    if !offline {
        return feed.refresh().await;
    }
    FeedSnapshot {
        phase: FeedPhase::Loaded,
        articles: cache.read().map(|entry| entry.articles).unwrap_or_default(),
        from_cache: true,
        ..FeedSnapshot::default()
    }
}

fn find_remote<'a>(
    articles: &'a [RemoteArticle],
    id: &str,
) -> Result<&'a RemoteArticle, ContentError> {
    articles
        .iter()
        .find(|article| article.id == id)
        .ok_or_else(|| ContentError::NotFound(id.to_string()))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn local_document(post: &Post) -> Result<String, Box<dyn Error>> {
    let html = render_markdown(&post.body)?;
    Ok(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{}</title></head><body>{}</body></html>",
        escape_html(&post.article.frontmatter.title),
        html
    ))
}

/// Renders the post to a temporary HTML file and hands it to the browser.
fn open_local_post(post: &Post) -> Result<(), Box<dyn Error>> {
    let mut path = std::env::temp_dir();
    path.push(format!("folio_{}.html", post.article.slug));
    std::fs::write(&path, local_document(post)?)?;
    webbrowser::open(&path.to_string_lossy())?;
    Ok(())
}

async fn watch(feed: ArticleFeed, config: &FolioConfig) -> Result<(), Box<dyn Error>> {
    let (update_tx, mut update_rx) = mpsc::channel(16);
    let handle = spawn_refresher(
        feed,
        RefreshConfig {
            check_interval: config.cache.rate_limit_check_interval(),
        },
        update_tx,
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            event = update_rx.recv() => match event {
                Some(FeedEvent::Updated(snapshot)) => {
                    let mut stdout = std::io::stdout().lock();
                    render::write_banner(&mut stdout, &snapshot)?;
                    writeln!(
                        stdout,
                        "{:?}: {} Qiita articles{}",
                        snapshot.phase,
                        snapshot.articles.len(),
                        if snapshot.from_cache { " (cached)" } else { "" }
                    )?;
                }
                None => break,
            },
        }
    }

    handle.stop().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{Frontmatter, LocalArticle};

    fn post(slug: &str, title: &str) -> Post {
        Post {
            article: LocalArticle {
                slug: slug.into(),
                frontmatter: Frontmatter {
                    title: title.into(),
                    ..Default::default()
                },
            },
            body: "Body".into(),
        }
    }

    #[test]
    fn title_is_escaped_in_local_document() {
        let doc = local_document(&post("tags", "<script>alert(1)</script> & more")).unwrap();
        assert!(
            doc.contains("<title>&lt;script&gt;alert(1)&lt;/script&gt; &amp; more</title>"),
            "{doc}"
        );
        assert!(!doc.contains("<script>"), "{doc}");
    }

    #[test]
    fn remote_lookup_matches_on_item_id() {
        let articles = vec![
            RemoteArticle {
                id: "c0ffee".into(),
                url: "https://qiita.com/Pitta/items/c0ffee".into(),
                ..Default::default()
            },
            RemoteArticle {
                id: "whales".into(),
                url: "https://qiita.com/Pitta/items/whales".into(),
                ..Default::default()
            },
        ];
        assert_eq!(
            find_remote(&articles, "whales").unwrap().url,
            "https://qiita.com/Pitta/items/whales"
        );
        assert!(matches!(
            find_remote(&articles, "frogs"),
            Err(ContentError::NotFound(_))
        ));
    }

    #[test]
    fn local_post_is_found_before_any_remote_lookup() {
        let posts = vec![post("whales", "Listening to whales")];
        let found = find_post(&posts, "whales").unwrap();
        assert_eq!(found.article.frontmatter.title, "Listening to whales");
    }
}
