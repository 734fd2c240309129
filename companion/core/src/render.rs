//! Message Rendering Engine
//!
//! Pure transform from raw assistant text to a structured view, with one
//! hard safety invariant: code content is literal. Nothing inside a fenced
//! or inline code span is ever re-interpreted as markup, a link, or a
//! citation.
//!
//! # Pass Order (normative)
//!
//! 1. Fenced code spans are lifted out first and replaced with unique
//!    placeholder tokens; the `{language, code}` pairs go into an ordered
//!    side table.
//! 2. Inline code spans, same technique, second table.
//! 3. Markdown links `[label](href)`.
//! 4. Bracketed integers `[n]` become citation nodes. This must run after
//!    link parsing so a link whose label is a bare number is not read as a
//!    citation.
//! 5. Line breaks become explicit break nodes.
//! 6. Placeholders are substituted back from the side tables.
//!
//! Placeholder tokens are built from Unicode private-use sentinels, so no
//! assistant-producible text can collide with them.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Language label used when a fence carries no tag.
const DEFAULT_LANGUAGE: &str = "plaintext";

/// Opens a placeholder token. Private-use codepoint: unreachable from text.
const TOKEN_OPEN: char = '\u{E000}';
/// Closes a placeholder token.
const TOKEN_CLOSE: char = '\u{E001}';

static FENCED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)`{3,}([A-Za-z0-9_+#.-]*)[ \t]*\r?\n(.*?)`{3,}")
        .expect("fenced code pattern is valid")
});

static INLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("inline code pattern is valid"));

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern is valid"));

static CITATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("citation pattern is valid"));

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("\u{E000}([bi])([0-9]+)\u{E001}").expect("placeholder pattern is valid")
});

/// One node of a rendered message view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewNode {
    /// Plain prose text (escaped at presentation time).
    Text(String),
    /// Inline code span; content is literal.
    InlineCode(String),
    /// Fenced code block; `code` is the exact literal content.
    CodeBlock {
        /// Language tag from the fence, or `"plaintext"`.
        language: String,
        /// Literal code content. Always recoverable unmodified, regardless
        /// of highlighting (copy-to-clipboard reads this).
        code: String,
        /// Optional highlighted HTML rendering (requires the `highlight`
        /// feature and a known language).
        highlighted: Option<String>,
    },
    /// Navigable link; `href` is rendered as a reference, never executed.
    Link {
        /// Link text, taken verbatim.
        label: String,
        /// Link target, taken verbatim.
        href: String,
    },
    /// Citation referencing the search-result card at this 1-based position.
    Citation {
        /// 1-based position of the cited source.
        index: usize,
    },
    /// Explicit line break.
    LineBreak,
}

impl ViewNode {
    /// The literal code carried by this node, if it is a code node.
    #[must_use]
    pub fn literal_code(&self) -> Option<&str> {
        match self {
            Self::InlineCode(code) | Self::CodeBlock { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// A lifted-out fenced code span awaiting substitution.
struct CodeSpan {
    language: String,
    code: String,
}

/// Intermediate piece of the token stream: unresolved text or a final node.
enum Segment {
    Str(String),
    Node(ViewNode),
}

/// Render raw assistant text into a structured view.
///
/// Pure function: no I/O, deterministic, never fails. Unparseable markup
/// degrades to plain text nodes.
#[must_use]
pub fn render(raw: &str) -> Vec<ViewNode> {
    let mut blocks: Vec<CodeSpan> = Vec::new();
    let mut inlines: Vec<String> = Vec::new();

    // Pass 1: fenced code out of the way before anything else looks at the
    // text. Literal backticks, brackets, or asterisks inside the span must
    // survive untouched.
    let text = FENCED_RE.replace_all(raw, |caps: &Captures| {
        let language = caps
            .get(1)
            .map(|m| m.as_str())
            .filter(|tag| !tag.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();
        let token = format!("{TOKEN_OPEN}b{}{TOKEN_CLOSE}", blocks.len());
        blocks.push(CodeSpan {
            language,
            code: caps[2].trim().to_string(),
        });
        token
    });

    // Pass 2: inline code, second table.
    let text = INLINE_RE.replace_all(&text, |caps: &Captures| {
        let token = format!("{TOKEN_OPEN}i{}{TOKEN_CLOSE}", inlines.len());
        inlines.push(caps[1].to_string());
        token
    });

    // Passes 3-4: links, then citations on whatever text remains.
    let mut segments = vec![Segment::Str(text.into_owned())];
    segments = split_matches(segments, &LINK_RE, |caps| ViewNode::Link {
        label: caps[1].to_string(),
        href: caps[2].to_string(),
    });
    segments = split_matches(segments, &CITATION_RE, |caps| ViewNode::Citation {
        index: caps[1].parse().unwrap_or(0),
    });

    // Pass 5: explicit break nodes.
    segments = split_line_breaks(segments);

    // Pass 6: substitute placeholders back from the side tables.
    let mut nodes = Vec::new();
    for segment in segments {
        match segment {
            Segment::Node(node) => nodes.push(node),
            Segment::Str(text) => restore_tokens(&text, &blocks, &inlines, &mut nodes),
        }
    }
    nodes
}

/// Split every unresolved segment on a pattern, converting matches to nodes.
fn split_matches<F>(segments: Vec<Segment>, re: &Regex, mut to_node: F) -> Vec<Segment>
where
    F: FnMut(&Captures) -> ViewNode,
{
    let mut out = Vec::new();
    for segment in segments {
        let text = match segment {
            Segment::Node(node) => {
                out.push(Segment::Node(node));
                continue;
            }
            Segment::Str(text) => text,
        };

        let mut cursor = 0;
        for caps in re.captures_iter(&text) {
            let matched = caps.get(0).expect("capture 0 always present");
            if matched.start() > cursor {
                out.push(Segment::Str(text[cursor..matched.start()].to_string()));
            }
            out.push(Segment::Node(to_node(&caps)));
            cursor = matched.end();
        }
        if cursor < text.len() {
            out.push(Segment::Str(text[cursor..].to_string()));
        }
    }
    out
}

/// Convert newlines in unresolved segments into break nodes.
fn split_line_breaks(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out = Vec::new();
    for segment in segments {
        let text = match segment {
            Segment::Node(node) => {
                out.push(Segment::Node(node));
                continue;
            }
            Segment::Str(text) => text,
        };

        let mut first = true;
        for line in text.split('\n') {
            if !first {
                out.push(Segment::Node(ViewNode::LineBreak));
            }
            first = false;
            let line = line.strip_suffix('\r').unwrap_or(line);
            if !line.is_empty() {
                out.push(Segment::Str(line.to_string()));
            }
        }
    }
    out
}

/// Walk one leftover text segment, emitting text and substituted code nodes.
fn restore_tokens(text: &str, blocks: &[CodeSpan], inlines: &[String], out: &mut Vec<ViewNode>) {
    let mut cursor = 0;
    for caps in TOKEN_RE.captures_iter(text) {
        let matched = caps.get(0).expect("capture 0 always present");
        if matched.start() > cursor {
            out.push(ViewNode::Text(text[cursor..matched.start()].to_string()));
        }

        let index: usize = caps[2].parse().unwrap_or(usize::MAX);
        match (&caps[1], index) {
            ("b", i) if i < blocks.len() => {
                let span = &blocks[i];
                out.push(ViewNode::CodeBlock {
                    language: span.language.clone(),
                    code: span.code.clone(),
                    highlighted: highlight_code(&span.language, &span.code),
                });
            }
            ("i", i) if i < inlines.len() => {
                out.push(ViewNode::InlineCode(inlines[i].clone()));
            }
            // A token with no table entry cannot be produced by render();
            // keep it visible rather than dropping content.
            _ => out.push(ViewNode::Text(matched.as_str().to_string())),
        }
        cursor = matched.end();
    }
    if cursor < text.len() {
        out.push(ViewNode::Text(text[cursor..].to_string()));
    }
}

/// Entity-escape text for HTML presentation.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Render a view to HTML.
///
/// Every text and code payload is entity-escaped; the only raw HTML that can
/// appear is a highlighted code rendering produced by this crate itself.
#[must_use]
pub fn to_html(nodes: &[ViewNode]) -> String {
    let mut html = String::new();
    for node in nodes {
        match node {
            ViewNode::Text(text) => html.push_str(&escape_html(text)),
            ViewNode::InlineCode(code) => {
                html.push_str("<code class=\"inline-code\">");
                html.push_str(&escape_html(code));
                html.push_str("</code>");
            }
            ViewNode::CodeBlock {
                language,
                code,
                highlighted,
            } => {
                if let Some(rendered) = highlighted {
                    html.push_str(rendered);
                } else {
                    html.push_str(&format!(
                        "<pre><code class=\"language-{}\">{}</code></pre>",
                        escape_html(language),
                        escape_html(code)
                    ));
                }
            }
            ViewNode::Link { label, href } => {
                html.push_str(&format!(
                    "<a href=\"{}\" target=\"_blank\">{}</a>",
                    escape_html(href),
                    escape_html(label)
                ));
            }
            ViewNode::Citation { index } => {
                html.push_str(&format!("<span class=\"citation-link\">{index}</span>"));
            }
            ViewNode::LineBreak => html.push_str("<br>"),
        }
    }
    html
}

/// Highlight code when the optional capability is available.
#[allow(unused_variables)]
fn highlight_code(language: &str, code: &str) -> Option<String> {
    #[cfg(feature = "highlight")]
    {
        highlight::highlight(language, code)
    }
    #[cfg(not(feature = "highlight"))]
    {
        None
    }
}

#[cfg(feature = "highlight")]
mod highlight {
    //! Syntect-backed code highlighting.

    use once_cell::sync::Lazy;
    use syntect::highlighting::ThemeSet;
    use syntect::html::highlighted_html_for_string;
    use syntect::parsing::SyntaxSet;

    static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
    static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

    /// Highlight to HTML; None when the language is unknown.
    pub(super) fn highlight(language: &str, code: &str) -> Option<String> {
        let syntax = SYNTAXES.find_syntax_by_token(language)?;
        let theme = THEMES.themes.get("InspiredGitHub")?;
        highlighted_html_for_string(code, &SYNTAXES, syntax, theme).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn citations(nodes: &[ViewNode]) -> Vec<usize> {
        nodes
            .iter()
            .filter_map(|n| match n {
                ViewNode::Citation { index } => Some(*index),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_fenced_code_is_literal() {
        let nodes = render("```js\nconst x = [1];\n```");
        assert_eq!(
            nodes,
            vec![ViewNode::CodeBlock {
                language: "js".into(),
                code: "const x = [1];".into(),
                highlighted: highlight_code("js", "const x = [1];"),
            }]
        );
        assert!(citations(&nodes).is_empty());
    }

    #[test]
    fn test_fence_without_language_defaults_to_plaintext() {
        let nodes = render("```\nhello\n```");
        match &nodes[0] {
            ViewNode::CodeBlock { language, code, .. } => {
                assert_eq!(language, "plaintext");
                assert_eq!(code, "hello");
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn test_backticks_and_links_inside_fence_survive() {
        let raw = "```md\nuse `tick` and [a link](http://x) and [3]\n```";
        let nodes = render(raw);
        assert_eq!(nodes.len(), 1);
        assert_eq!(
            nodes[0].literal_code(),
            Some("use `tick` and [a link](http://x) and [3]")
        );
    }

    #[test]
    fn test_inline_code_protects_brackets() {
        let nodes = render("index with `[1]` syntax");
        assert_eq!(
            nodes,
            vec![
                ViewNode::Text("index with ".into()),
                ViewNode::InlineCode("[1]".into()),
                ViewNode::Text(" syntax".into()),
            ]
        );
    }

    #[test]
    fn test_links_parse_before_citations() {
        let nodes = render("[2](http://two) and [3]");
        assert_eq!(
            nodes,
            vec![
                ViewNode::Link {
                    label: "2".into(),
                    href: "http://two".into(),
                },
                ViewNode::Text(" and ".into()),
                ViewNode::Citation { index: 3 },
            ]
        );
    }

    #[test]
    fn test_citations_in_prose() {
        let nodes = render("See [1] and [2]");
        assert_eq!(citations(&nodes), vec![1, 2]);
    }

    #[test]
    fn test_line_breaks_become_nodes() {
        let nodes = render("one\ntwo");
        assert_eq!(
            nodes,
            vec![
                ViewNode::Text("one".into()),
                ViewNode::LineBreak,
                ViewNode::Text("two".into()),
            ]
        );
    }

    #[test]
    fn test_multiple_fences_keep_first_seen_order() {
        let nodes = render("```a\nfirst\n```\nmid\n```b\nsecond\n```");
        let codes: Vec<_> = nodes.iter().filter_map(ViewNode::literal_code).collect();
        assert_eq!(codes, vec!["first", "second"]);
    }

    #[test]
    fn test_long_fence_matches() {
        let nodes = render("````rust\nlet a = 1;\n````");
        assert_eq!(nodes[0].literal_code(), Some("let a = 1;"));
    }

    #[test]
    fn test_mixed_message() {
        let raw = "Try `cargo run`:\n```sh\ncargo run -- [1]\n```\nDocs at [the book](https://doc.rust-lang.org) [1]";
        let nodes = render(raw);

        // Exactly one citation: the [1] in prose, not the one in the fence.
        assert_eq!(citations(&nodes), vec![1]);
        assert!(nodes
            .iter()
            .any(|n| n.literal_code() == Some("cargo run -- [1]")));
        assert!(nodes.iter().any(|n| matches!(
            n,
            ViewNode::Link { label, .. } if label == "the book"
        )));
    }

    #[test]
    fn test_to_html_escapes_code() {
        let nodes = render("```html\n<script>alert(1)</script>\n```");
        let html = to_html(&nodes);
        if cfg!(not(feature = "highlight")) {
            assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
            assert!(!html.contains("<script>"));
        }
        // The literal content is always recoverable for copy-to-clipboard.
        assert_eq!(nodes[0].literal_code(), Some("<script>alert(1)</script>"));
    }

    #[test]
    fn test_to_html_escapes_prose_and_links() {
        let html = to_html(&render("a < b, see [x](http://e/?a=1&b=2)"));
        assert!(html.contains("a &lt; b"));
        assert!(html.contains("href=\"http://e/?a=1&amp;b=2\""));
    }

    #[test]
    fn test_empty_input() {
        assert!(render("").is_empty());
    }
}
