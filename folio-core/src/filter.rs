use serde::Serialize;

use crate::article::UnifiedArticle;

/// Keeps articles matching `search` (case-insensitive, on title, excerpt or
/// any tag) that also carry every tag in `selected_tags` (case-insensitive).
pub fn filter(
    items: &[UnifiedArticle],
    search: &str,
    selected_tags: &[String],
) -> Vec<UnifiedArticle> {
    let needle = search.to_lowercase();
    let wanted: Vec<String> = selected_tags.iter().map(|tag| tag.to_lowercase()).collect();

    items
        .iter()
        .filter(|article| matches_search(article, &needle) && has_all_tags(article, &wanted))
        .cloned()
        .collect()
}

fn matches_search(article: &UnifiedArticle, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    article.title.to_lowercase().contains(needle)
        || article.excerpt.to_lowercase().contains(needle)
        || article
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(needle))
}

fn has_all_tags(article: &UnifiedArticle, wanted: &[String]) -> bool {
    wanted.iter().all(|wanted| {
        article
            .tags
            .iter()
            .any(|tag| tag.to_lowercase() == *wanted)
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub items: Vec<UnifiedArticle>,
    /// 1-indexed.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Never less than one, so an empty list still renders one (empty) page.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    count.div_ceil(page_size.max(1)).max(1)
}

/// Slices page `page` (1-indexed). Pages outside `1..=total_pages` are empty;
/// clamping is up to the caller.
pub fn paginate(items: &[UnifiedArticle], page: usize, page_size: usize) -> Page {
    let page_size = page_size.max(1);
    let total_pages = total_pages(items.len(), page_size);
    let slice: &[UnifiedArticle] = match page.checked_sub(1) {
        Some(index) => {
            let start = index.saturating_mul(page_size).min(items.len());
            let end = start.saturating_add(page_size).min(items.len());
            &items[start..end]
        }
        None => &[],
    };
    Page {
        items: slice.to_vec(),
        page,
        total_pages,
        total_items: items.len(),
    }
}
