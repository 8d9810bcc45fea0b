use std::io::{self, Write};

use folio_core::{FeedPhase, FeedSnapshot, Language, Page, UnifiedArticle};

fn language_label(language: Language) -> &'static str {
    match language {
        Language::English => "EN",
        Language::Japanese => "JA",
    }
}

/// Error banner shown above a listing whose remote half is unavailable.
pub fn write_banner(out: &mut impl Write, snapshot: &FeedSnapshot) -> io::Result<()> {
    if snapshot.phase == FeedPhase::Initializing {
        writeln!(out, "Loading articles...")?;
    }
    if let Some(error) = &snapshot.error {
        writeln!(out, "! {error}")?;
        writeln!(out, "! Showing local articles only")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_article(out: &mut impl Write, article: &UnifiedArticle) -> io::Result<()> {
    write!(
        out,
        "[{}] {}  {}",
        language_label(article.language),
        article.date,
        article.title
    )?;
    if let Some(likes) = article.likes {
        write!(out, "  ({likes} likes)")?;
    }
    writeln!(out)?;
    if !article.excerpt.is_empty() {
        writeln!(out, "     {}", article.excerpt)?;
    }
    let mut meta = Vec::new();
    if !article.read_time.is_empty() {
        meta.push(article.read_time.clone());
    }
    if !article.tags.is_empty() {
        meta.push(format!("#{}", article.tags.join(" #")));
    }
    if !meta.is_empty() {
        writeln!(out, "     {}", meta.join("  "))?;
    }
    writeln!(out, "     {}", article.url)
}

pub fn write_page(out: &mut impl Write, page: &Page) -> io::Result<()> {
    if page.items.is_empty() {
        writeln!(out, "No articles found.")?;
    }
    for article in &page.items {
        write_article(out, article)?;
    }
    writeln!(
        out,
        "\npage {}/{} ({} articles)",
        page.page, page.total_pages, page.total_items
    )
}

pub fn write_tags(out: &mut impl Write, tags: &[String]) -> io::Result<()> {
    for tag in tags {
        writeln!(out, "{tag}")?;
    }
    Ok(())
}
