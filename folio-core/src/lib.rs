pub mod aggregate;
pub mod article;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod filter;
pub mod listing;
pub mod refresher;
pub mod store;

pub use aggregate::{aggregate, all_tags, LanguageFilter};
pub use article::{
    Article, ArticleKind, Frontmatter, Language, LocalArticle, RemoteArticle, RemoteTag,
    RemoteUser, UnifiedArticle,
};
pub use cache::{CacheEntry, LocalCache, CACHE_KEY};
pub use config::{CacheConfig, ConfigError, FolioConfig, ListingConfig, QiitaConfig};
pub use error::{FeedError, FetchError, StoreError};
pub use feed::{ArticleFeed, FeedPhase, FeedSnapshot};
pub use fetcher::{http_client, FetchOutcome, QiitaClient, RATE_RESET_HEADER};
pub use filter::{filter, paginate, total_pages, Page};
pub use listing::ListingState;
pub use refresher::{spawn_refresher, FeedEvent, RefreshConfig, RefresherHandle};
pub use store::{FileStore, KeyValueStore, MemoryStore};
