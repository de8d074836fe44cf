//! Fallback conversion by walking the parsed DOM.
//!
//! Non-content elements are dropped, headings become `#`-prefixed lines at
//! their level, paragraphs become blank-line-delimited blocks and list items
//! become `* ` lines. Whitespace inside a line collapses to single spaces,
//! runs of blank lines collapse to one, and the result is trimmed.

use scraper::{ElementRef, Html, Node};

use super::{ConversionError, Converter};

const SKIPPED: [&str; 6] = ["script", "style", "svg", "iframe", "noscript", "template"];

/// Converts HTML to text with scraper, no external tools involved.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeConverter;

impl Converter for TreeConverter {
    fn name(&self) -> &'static str {
        "tree"
    }

    fn convert(&self, markup: &str) -> Result<String, ConversionError> {
        let document = Html::parse_document(markup);
        let mut lines = Lines::default();
        walk(document.root_element(), &mut lines);

        let text = lines.finish();
        if text.is_empty() { Err(ConversionError::Empty) } else { Ok(text) }
    }
}

const INLINE: [&str; 18] = [
    "a", "abbr", "b", "cite", "code", "em", "font", "i", "kbd", "label", "mark", "q", "s", "small", "span", "strong",
    "sub", "sup",
];

#[derive(Default)]
struct Lines {
    lines: Vec<String>,
    inline: String,
}

impl Lines {
    /// Ends the current run of inline text, emitting it as one line.
    fn flush(&mut self) {
        let collapsed = collapse_whitespace(&self.inline);
        self.inline.clear();
        if !collapsed.is_empty() {
            self.lines.push(collapsed);
        }
    }

    fn line(&mut self, line: &str) {
        self.flush();
        let collapsed = collapse_whitespace(line);
        if !collapsed.is_empty() {
            self.lines.push(collapsed);
        }
    }

    fn block(&mut self, line: &str) {
        self.flush();
        let collapsed = collapse_whitespace(line);
        if collapsed.is_empty() {
            return;
        }
        self.blank();
        self.lines.push(collapsed);
        self.blank();
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| !l.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        while self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        self.lines.join("\n")
    }
}

fn walk(element: ElementRef<'_>, out: &mut Lines) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.inline.push_str(text),
            Node::Element(el) => {
                let Some(child_el) = ElementRef::wrap(child) else { continue };
                let name = el.name();

                if SKIPPED.contains(&name) {
                    continue;
                }

                if let Some(level) = heading_level(name) {
                    let heading = visible_text(child_el);
                    if collapse_whitespace(&heading).is_empty() {
                        out.flush();
                    } else {
                        out.block(&format!("{} {}", "#".repeat(level), heading));
                    }
                } else if name == "p" {
                    out.block(&visible_text(child_el));
                } else if name == "li" {
                    let item = visible_text(child_el);
                    if collapse_whitespace(&item).is_empty() {
                        out.flush();
                    } else {
                        out.line(&format!("* {}", item));
                    }
                } else if name == "br" {
                    out.flush();
                } else if INLINE.contains(&name) {
                    walk(child_el, out);
                } else {
                    out.flush();
                    walk(child_el, out);
                    out.flush();
                }
            }
            _ => {}
        }
    }
}

/// Text of an element and its descendants, skipping non-content subtrees.
/// Inline children join without extra spacing; block children are separated.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_text(element, &mut text);
    text
}

fn collect_text(element: ElementRef<'_>, text: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(el) if !SKIPPED.contains(&el.name()) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    let inline = INLINE.contains(&el.name());
                    if !inline {
                        text.push(' ');
                    }
                    collect_text(child_el, text);
                    if !inline {
                        text.push(' ');
                    }
                }
            }
            _ => {}
        }
    }
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
