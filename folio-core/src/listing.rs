use crate::aggregate::{aggregate, LanguageFilter};
use crate::article::{LocalArticle, RemoteArticle};
use crate::filter::{filter, paginate, Page};

/// View state of one article listing. Any change to the language, the
/// search text or the tag selection sends the reader back to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingState {
    language: LanguageFilter,
    search: String,
    selected_tags: Vec<String>,
    page: usize,
    page_size: usize,
}

impl ListingState {
    pub fn new(page_size: usize) -> Self {
        Self {
            language: LanguageFilter::Both,
            search: String::new(),
            selected_tags: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn language(&self) -> LanguageFilter {
        self.language
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_language(&mut self, language: LanguageFilter) {
        self.language = language;
        self.page = 1;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    /// Adds the tag, or removes it when already selected.
    pub fn toggle_tag(&mut self, tag: &str) {
        let before = self.selected_tags.len();
        let lowered = tag.to_lowercase();
        self.selected_tags
            .retain(|selected| selected.to_lowercase() != lowered);
        if self.selected_tags.len() == before {
            self.selected_tags.push(tag.to_owned());
        }
        self.page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.search.clear();
        self.selected_tags.clear();
        self.page = 1;
    }

    /// Moves to `page`, clamped into `1..=total_pages`.
    pub fn go_to(&mut self, page: usize, total_pages: usize) {
        self.page = page.clamp(1, total_pages.max(1));
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.go_to(self.page.saturating_add(1), total_pages);
    }

    pub fn prev_page(&mut self, total_pages: usize) {
        self.go_to(self.page.saturating_sub(1), total_pages);
    }

    /// aggregate, then filter, then paginate.
    pub fn view(&self, local: &[LocalArticle], remote: &[RemoteArticle]) -> Page {
        let unified = aggregate(local, remote, self.language);
        let filtered = filter(&unified, &self.search, &self.selected_tags);
        paginate(&filtered, self.page, self.page_size)
    }
}
