//! Loads locally authored posts: markdown files with a `---` frontmatter block.
use std::path::{Path, PathBuf};

use folio_core::{Frontmatter, LocalArticle};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no frontmatter block in {0}")]
    MissingFrontmatter(PathBuf),
    #[error("invalid frontmatter in {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("post not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub article: LocalArticle,
    pub body: String,
}

/// Splits `---\n<yaml>\n---\n<body>` into its yaml and body parts.
pub fn split_frontmatter(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix("---")?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

pub fn parse_post(path: &Path, source: &str) -> Result<Post, ContentError> {
    let (yaml, body) =
        split_frontmatter(source).ok_or_else(|| ContentError::MissingFrontmatter(path.into()))?;
    let frontmatter: Frontmatter =
        serde_yaml::from_str(yaml).map_err(|source| ContentError::Frontmatter {
            path: path.into(),
            source,
        })?;
    let slug = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Post {
        article: LocalArticle { slug, frontmatter },
        body: body.trim_start().to_string(),
    })
}

/// Every `*.md` post in `dir`, in file-name order. A missing directory yields
/// no posts; files with broken frontmatter are skipped.
pub fn load_posts(dir: &Path) -> Result<Vec<Post>, ContentError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "content directory not found; no local posts");
        return Ok(Vec::new());
    }
    let io_err = |source| ContentError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort();

    let mut posts = Vec::with_capacity(paths.len());
    for path in paths {
        let source = std::fs::read_to_string(&path).map_err(|source| ContentError::Io {
            path: path.clone(),
            source,
        })?;
        match parse_post(&path, &source) {
            Ok(post) => posts.push(post),
            Err(err) => warn!(error = %err, "skipping post"),
        }
    }
    debug!(count = posts.len(), "loaded local posts");
    Ok(posts)
}

pub fn find_post<'a>(posts: &'a [Post], slug: &str) -> Result<&'a Post, ContentError> {
    posts
        .iter()
        .find(|post| post.article.slug == slug)
        .ok_or_else(|| ContentError::NotFound(slug.to_string()))
}
