use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::{format_html, parse_document, Arena, Options};
use lol_html::errors::RewritingError;
use lol_html::{element, rewrite_str, RewriteStrSettings};
use once_cell::sync::Lazy;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;
use tracing::warn;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);

const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hljs-" };

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to format markdown: {0}")]
    Format(#[from] std::fmt::Error),
    #[error("failed to rewrite rendered HTML: {0}")]
    Rewrite(#[from] RewritingError),
}

fn options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;
    // Posts may embed raw HTML (figures, iframes).
    options.render.r#unsafe = true;
    options
}

/// GFM markdown to HTML, with fenced code highlighted and images marked for
/// lazy, low-priority loading.
pub fn render_markdown(markdown: &str) -> Result<String, RenderError> {
    let options = options();
    let arena = Arena::new();
    let root = parse_document(&arena, markdown, &options);
    highlight_code_blocks(root);

    let mut html = String::new();
    format_html(root, &options, &mut html)?;
    lazy_images(&html)
}

fn highlight_code_blocks<'a>(root: &'a AstNode<'a>) {
    for node in root.descendants() {
        let (info, literal) = {
            let data = node.data.borrow();
            match &data.value {
                NodeValue::CodeBlock(block) => {
                    (block.info.trim().to_string(), block.literal.clone())
                }
                _ => continue,
            }
        };
        let language = info.split_whitespace().next().unwrap_or("text");
        match highlight_code(language, &literal) {
            Ok(highlighted) => {
                node.data.borrow_mut().value = NodeValue::HtmlBlock(NodeHtmlBlock {
                    block_type: 0,
                    literal: highlighted,
                });
            }
            // Left as a plain code block.
            Err(err) => warn!(language, error = %err, "failed to highlight code block"),
        }
    }
}

fn highlight_code(language: &str, code: &str) -> Result<String, syntect::Error> {
    let syntax_set = &*SYNTAX_SET;
    let syntax =
        find_syntax(syntax_set, language).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code = code.to_string();
    if !code.ends_with('\n') {
        code.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, CLASS_STYLE);
    for line in LinesWithEndings::from(code.as_str()) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }

    let language = language.to_ascii_lowercase();
    Ok(format!(
        "<pre><code class=\"hljs language-{language}\">{}</code></pre>\n",
        generator.finalize()
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn lazy_images(html: &str) -> Result<String, RenderError> {
    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img", |el| {
                if el.get_attribute("loading").is_none() {
                    el.set_attribute("loading", "lazy")?;
                }
                if el.get_attribute("decoding").is_none() {
                    el.set_attribute("decoding", "async")?;
                }
                if el.get_attribute("fetchpriority").is_none() {
                    el.set_attribute("fetchpriority", "low")?;
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;
    Ok(rewritten)
}
