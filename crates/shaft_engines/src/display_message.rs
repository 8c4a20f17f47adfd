#![forbid(unsafe_code)]

//! Line-based formatting of matcher guidance messages.
//!
//! Backend text is never trusted as markup: line-break markers are recognised
//! and every fragment is escaped before it is placed in HTML.

use serde::Serialize;

const BULLET: char = '•';

const LINE_BREAKS: &[&str] = &[
    "&lt;br /&gt;",
    "&lt;br/&gt;",
    "&lt;br&gt;",
    "<br />",
    "<br/>",
    "<br>",
    "\r\n",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayMessage {
    Empty,
    Paragraphs { lines: Vec<String> },
    Bulleted { heading: String, items: Vec<String> },
}

impl DisplayMessage {
    pub fn parse(raw: &str) -> Self {
        let mut text = raw.to_string();
        for marker in LINE_BREAKS {
            text = replace_ignore_ascii_case(&text, marker, "\n");
        }
        let lines: Vec<String> = text
            .split('\n')
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        if lines.is_empty() {
            return Self::Empty;
        }
        if !lines.iter().any(|l| l.starts_with(BULLET)) {
            return Self::Paragraphs { lines };
        }
        let mut iter = lines.into_iter();
        let heading = iter.next().map(|l| strip_bullet(&l)).unwrap_or_default();
        Self::Bulleted {
            heading,
            items: iter.map(|l| strip_bullet(&l)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn to_html(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Paragraphs { lines } => lines
                .iter()
                .map(|l| format!("<p>{}</p>", html_escape::encode_text(l)))
                .collect(),
            Self::Bulleted { heading, items } => {
                let mut out = format!(
                    "<p class=\"msg-heading\"><strong>{}</strong></p>",
                    html_escape::encode_text(heading)
                );
                if !items.is_empty() {
                    out.push_str("<ul>");
                    for item in items {
                        out.push_str("<li>");
                        out.push_str(&html_escape::encode_text(item));
                        out.push_str("</li>");
                    }
                    out.push_str("</ul>");
                }
                out
            }
        }
    }

    /// Terminal rendering used by the CLI.
    pub fn to_plain(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Paragraphs { lines } => lines.join("\n"),
            Self::Bulleted { heading, items } => std::iter::once(heading.clone())
                .chain(items.iter().map(|i| format!("  {BULLET} {i}")))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

fn strip_bullet(line: &str) -> String {
    line.trim_start_matches(BULLET).trim().to_string()
}

fn replace_ignore_ascii_case(haystack: &str, needle: &str, with: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(found) = lower[cursor..].find(needle) {
        let start = cursor + found;
        out.push_str(&haystack[cursor..start]);
        out.push_str(with);
        cursor = start + needle.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_msg_01_bulleted_message_has_heading_and_items() {
        let m = DisplayMessage::parse(
            "Подходящих позиций нет.<br>• Проверьте диаметр<br/>• Уберите корону",
        );
        assert_eq!(
            m,
            DisplayMessage::Bulleted {
                heading: "Подходящих позиций нет.".to_string(),
                items: vec![
                    "Проверьте диаметр".to_string(),
                    "Уберите корону".to_string()
                ],
            }
        );
    }

    #[test]
    fn at_msg_02_plain_lines_become_paragraphs() {
        let m = DisplayMessage::parse("first\n\n  second  \r\nthird");
        assert_eq!(
            m,
            DisplayMessage::Paragraphs {
                lines: vec!["first".into(), "second".into(), "third".into()]
            }
        );
    }

    #[test]
    fn at_msg_03_escaped_and_uppercase_breaks_split() {
        let m = DisplayMessage::parse("a&lt;br&gt;b<BR />c");
        assert_eq!(
            m,
            DisplayMessage::Paragraphs {
                lines: vec!["a".into(), "b".into(), "c".into()]
            }
        );
    }

    #[test]
    fn at_msg_04_html_output_escapes_backend_text() {
        let m = DisplayMessage::parse("<script>alert(1)</script>\n• <b>x</b>");
        let html = m.to_html();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<li>&lt;b&gt;x&lt;/b&gt;</li>"));
    }

    #[test]
    fn at_msg_05_blank_message_is_empty() {
        let m = DisplayMessage::parse(" <br> \n ");
        assert!(m.is_empty());
        assert_eq!(m.to_html(), "");
    }

    #[test]
    fn at_msg_06_plain_rendering_keeps_bullets() {
        let m = DisplayMessage::parse("Нет совпадений\n• a\n• b");
        assert_eq!(m.to_plain(), "Нет совпадений\n  • a\n  • b");
    }
}
