//! Chapter conversion into the output format
//!
//! Chapters are downloaded as raw HTML fragments. The converter turns a
//! downloaded chapter into the representation the book writer expects for
//! the configured extension.

use crate::model::Chapter;
use scraper::{Html, Node};

/// Converts a freshly downloaded chapter for the given output extension
pub trait ChapterConverter: Send + Sync {
    fn convert(&self, chapter: Chapter, ext_name: &str) -> Chapter;
}

/// Converter for the formats the book writer supports
///
/// - `txt`: paragraphs become plain-text lines
/// - anything else: the HTML fragment is kept as-is
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatConverter;

impl ChapterConverter for FormatConverter {
    fn convert(&self, mut chapter: Chapter, ext_name: &str) -> Chapter {
        if ext_name.eq_ignore_ascii_case("txt") {
            chapter.content = chapter.content.map(|html| html_to_text(&html));
        }
        chapter
    }
}

/// Flattens an HTML fragment into text, one line per paragraph or line break
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut text = String::new();

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if matches!(e.name(), "br" | "p" | "div") => text.push('\n'),
            _ => {}
        }
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_to_lines() {
        let text = html_to_text("<p>第一段</p><p>第二段</p>");
        assert_eq!(text, "第一段\n第二段");
    }

    #[test]
    fn test_line_breaks_and_indent() {
        let text = html_to_text("&nbsp;&nbsp;第一行<br/>\n<br>　　第二行");
        assert_eq!(text, "第一行\n第二行");
    }

    #[test]
    fn test_txt_conversion() {
        let mut chapter = Chapter::new("第一章", "https://example.com/1.html", 1);
        chapter.content = Some("<p>a</p><p>b</p>".to_string());

        let converted = FormatConverter.convert(chapter, "txt");
        assert_eq!(converted.content.as_deref(), Some("a\nb"));
    }

    #[test]
    fn test_html_kept_for_other_formats() {
        let mut chapter = Chapter::new("第一章", "https://example.com/1.html", 1);
        chapter.content = Some("<p>a</p>".to_string());

        let converted = FormatConverter.convert(chapter, "html");
        assert_eq!(converted.content.as_deref(), Some("<p>a</p>"));
    }
}
