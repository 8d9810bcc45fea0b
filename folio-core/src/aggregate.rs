use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::article::{Language, LocalArticle, RemoteArticle, UnifiedArticle};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LanguageFilter {
    English,
    Japanese,
    #[default]
    Both,
}

impl LanguageFilter {
    pub fn includes(self, language: Language) -> bool {
        match (self, language) {
            (LanguageFilter::Both, _) => true,
            (LanguageFilter::English, Language::English) => true,
            (LanguageFilter::Japanese, Language::Japanese) => true,
            _ => false,
        }
    }
}

/// Merges both sources into one list, newest first.
///
/// Local posts come before remote ones in the input order, and the sort is
/// stable, so equal dates keep that order. Undated articles go last.
pub fn aggregate(
    local: &[LocalArticle],
    remote: &[RemoteArticle],
    filter: LanguageFilter,
) -> Vec<UnifiedArticle> {
    let mut all = Vec::new();
    if filter.includes(Language::English) {
        all.extend(local.iter().map(UnifiedArticle::from_local));
    }
    if filter.includes(Language::Japanese) {
        all.extend(remote.iter().map(UnifiedArticle::from_remote));
    }
    // Option orders None first, so reversing the comparison puts it last.
    all.sort_by(|a, b| b.published.cmp(&a.published));
    all
}

/// Sorted, de-duplicated tag names across both sources.
pub fn all_tags(local: &[LocalArticle], remote: &[RemoteArticle]) -> Vec<String> {
    let mut tags = BTreeSet::new();
    for post in local {
        tags.extend(post.frontmatter.tags.iter().cloned());
    }
    for item in remote {
        tags.extend(item.tag_names().map(str::to_owned));
    }
    tags.into_iter().collect()
}
