//! Plain-text rendering of extracted article HTML.
//!
//! Blocks are separated by a blank line, `br`/`li`/`tr` start a new line and
//! table cells on the same row are joined with ` | `. Runs of whitespace
//! collapse to one space. Images and embedded media contribute nothing.
//!
//! # Example
//!
//! ```rust
//! use stash_core::html_to_text;
//!
//! let text = html_to_text("<h1>Title</h1><p>First   line<br>second line</p><ul><li>a</li><li>b</li></ul>");
//! assert_eq!(text, "Title\n\nFirst line\nsecond line\n\na\nb");
//! ```

use scraper::{ElementRef, Html, Node};

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "details", "div", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "summary", "table", "tbody", "tfoot", "thead", "ul",
];

const SKIPPED_TAGS: &[&str] = &[
    "img", "picture", "svg", "canvas", "video", "audio", "iframe", "object", "embed", "script", "style", "noscript",
    "template", "head",
];

/// Separator waiting to be written before the next piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Pending {
    None,
    Space,
    Cell,
    Line,
    Paragraph,
}

enum Frame<'a> {
    Enter(ElementRef<'a>),
    Text(&'a str),
    Exit(&'a str),
}

struct TextWriter {
    out: String,
    pending: Pending,
}

impl TextWriter {
    fn new() -> Self {
        Self { out: String::new(), pending: Pending::None }
    }

    fn request(&mut self, separator: Pending) {
        self.pending = self.pending.max(separator);
    }

    fn push_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.request(Pending::Space);
                continue;
            }

            if !self.out.is_empty() {
                match self.pending {
                    Pending::None => {}
                    Pending::Space => self.out.push(' '),
                    Pending::Cell => self.out.push_str(" | "),
                    Pending::Line => self.out.push('\n'),
                    Pending::Paragraph => self.out.push_str("\n\n"),
                }
            }
            self.pending = Pending::None;
            self.out.push(ch);
        }
    }

    /// Depth-first walk over an explicit stack so nesting depth never
    /// reaches the call stack.
    fn walk(&mut self, root: ElementRef<'_>) {
        let mut stack = vec![Frame::Enter(root)];

        while let Some(frame) = stack.pop() {
            let element = match frame {
                Frame::Enter(element) => element,
                Frame::Text(text) => {
                    self.push_text(text);
                    continue;
                }
                Frame::Exit(tag) => {
                    self.close(tag);
                    continue;
                }
            };

            let tag = element.value().name();
            if SKIPPED_TAGS.contains(&tag) {
                continue;
            }

            match tag {
                "br" => {
                    self.request(Pending::Line);
                    continue;
                }
                "li" | "tr" => self.request(Pending::Line),
                "td" | "th" => self.request(Pending::Cell),
                _ if BLOCK_TAGS.contains(&tag) => self.request(Pending::Paragraph),
                _ => {}
            }

            stack.push(Frame::Exit(tag));
            for child in element.children().rev() {
                match child.value() {
                    Node::Text(text) => stack.push(Frame::Text(&**text)),
                    Node::Element(_) => stack.extend(ElementRef::wrap(child).map(Frame::Enter)),
                    _ => {}
                }
            }
        }
    }

    fn close(&mut self, tag: &str) {
        match tag {
            "li" | "tr" => self.request(Pending::Line),
            _ if BLOCK_TAGS.contains(&tag) => self.request(Pending::Paragraph),
            _ => {}
        }
    }
}

/// Converts an HTML fragment to plain text.
///
/// Returns an empty string when the fragment has no visible text.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut writer = TextWriter::new();
    writer.walk(fragment.root_element());
    writer.out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs_separated_by_blank_line() {
        let text = html_to_text("<div><p>One.</p><p>Two.</p></div><p>Three.</p>");
        assert_eq!(text, "One.\n\nTwo.\n\nThree.");
    }

    #[test]
    fn test_inline_elements_flow() {
        let text = html_to_text("<p>Some <strong>bold</strong> and <a href=\"/x\">linked</a>   text.</p>");
        assert_eq!(text, "Some bold and linked text.");
    }

    #[test]
    fn test_text_not_duplicated_for_nested_blocks() {
        let text = html_to_text("<article><div><p>Only once</p></div></article>");
        assert_eq!(text, "Only once");
    }

    #[test]
    fn test_line_breaks() {
        let text = html_to_text("<p>Line one<br>Line two<br/>Line three</p>");
        assert_eq!(text, "Line one\nLine two\nLine three");
    }

    #[test]
    fn test_lists() {
        let text = html_to_text("<p>Intro</p><ul><li>First</li><li>Second</li></ul><p>Outro</p>");
        assert_eq!(text, "Intro\n\nFirst\nSecond\n\nOutro");
    }

    #[test]
    fn test_tables_rendered_as_rows() {
        let text = html_to_text(
            "<table><tr><th>Name</th><th>Qty</th></tr><tr><td>Apples</td><td>3</td></tr></table>",
        );
        assert_eq!(text, "Name | Qty\nApples | 3");
    }

    #[test]
    fn test_images_excluded() {
        let text = html_to_text(r#"<p>Before <img src="a.jpg" alt="An image"> after</p>"#);
        assert_eq!(text, "Before after");
    }

    #[test]
    fn test_deeply_nested_input() {
        let depth = 20_000;
        let html = format!("{}<p>Deep text</p>{}", "<div>".repeat(depth), "</div>".repeat(depth));
        assert_eq!(html_to_text(&html), "Deep text");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(html_to_text(""), "");
        assert_eq!(html_to_text("<div>   </div><img src=\"x.png\">"), "");
    }
}
