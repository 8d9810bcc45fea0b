use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteTag {
    pub name: String,
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteUser {
    pub id: String,
    pub name: String,
    pub profile_image_url: String,
}

/// One item of the Qiita `users/<user>/items` listing, kept as received.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RemoteArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: String,
    pub updated_at: String,
    pub likes_count: u64,
    pub comments_count: u64,
    pub tags: Vec<RemoteTag>,
    pub user: RemoteUser,
}

impl RemoteArticle {
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|tag| tag.name.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Frontmatter {
    pub title: String,
    pub date: String,
    pub excerpt: String,
    pub cover_image: Option<String>,
    pub read_time: String,
    pub tags: Vec<String>,
}

/// A locally authored post, already parsed by the content pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalArticle {
    pub slug: String,
    pub frontmatter: Frontmatter,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ArticleKind {
    Local,
    Remote,
}

impl ArticleKind {
    pub fn language(self) -> Language {
        match self {
            ArticleKind::Local => Language::English,
            ArticleKind::Remote => Language::Japanese,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Japanese,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Article {
    Local(LocalArticle),
    Remote(RemoteArticle),
}

impl Article {
    pub fn kind(&self) -> ArticleKind {
        match self {
            Article::Local(_) => ArticleKind::Local,
            Article::Remote(_) => ArticleKind::Remote,
        }
    }

    pub fn to_unified(&self) -> UnifiedArticle {
        match self {
            Article::Local(post) => UnifiedArticle::from_local(post),
            Article::Remote(item) => UnifiedArticle::from_remote(item),
        }
    }
}

/// Common display shape for both sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnifiedArticle {
    pub kind: ArticleKind,
    pub title: String,
    /// Date as shown to the reader.
    pub date: String,
    /// Parsed instant used for ordering; `None` when the date is unreadable.
    pub published: Option<DateTime<Utc>>,
    pub excerpt: String,
    pub read_time: String,
    pub tags: Vec<String>,
    pub slug: String,
    pub language: Language,
    pub url: String,
    pub likes: Option<u64>,
    pub cover_image: Option<String>,
}

impl UnifiedArticle {
    pub fn from_local(post: &LocalArticle) -> Self {
        let fm = &post.frontmatter;
        Self {
            kind: ArticleKind::Local,
            title: fm.title.clone(),
            date: fm.date.clone(),
            published: parse_date(&fm.date),
            excerpt: fm.excerpt.clone(),
            read_time: fm.read_time.clone(),
            tags: fm.tags.clone(),
            slug: post.slug.clone(),
            language: ArticleKind::Local.language(),
            url: format!("/blog/{}", post.slug),
            likes: None,
            cover_image: fm.cover_image.clone(),
        }
    }

    pub fn from_remote(item: &RemoteArticle) -> Self {
        // Qiita sends no summary; the excerpt is built from the like count.
        let date = DateTime::parse_from_rfc3339(&item.created_at)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| item.created_at.clone());
        Self {
            kind: ArticleKind::Remote,
            title: item.title.clone(),
            date,
            published: parse_date(&item.created_at),
            excerpt: format!("Qiita article - {} likes", item.likes_count),
            read_time: String::new(),
            tags: item.tag_names().map(str::to_owned).collect(),
            slug: item.id.clone(),
            language: ArticleKind::Remote.language(),
            url: item.url.clone(),
            likes: Some(item.likes_count),
            cover_image: None,
        }
    }

    /// Render key; unique per source.
    pub fn key(&self) -> (ArticleKind, &str) {
        (self.kind, &self.slug)
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
