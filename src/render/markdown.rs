//! Preview-grade Markdown to HTML conversion.
//!
//! This is deliberately *not* a Markdown parser. Rendering is an ordered chain of independent,
//! line-anchored regex rewrites, each one stateless and blind to the others. The practical upshot
//! is that nothing nests: a list broken up by a blank line becomes two lists, a quote spanning
//! several lines becomes several quotes, and emphasis markers inside code spans are still
//! rewritten. Malformed markers (like an unclosed `**`) simply fail to match and show up literally.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::prelude::*;

/// Matches strings that begin with a URL scheme, e.g. `https:`.
static URL_SCHEMA: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z\-+.]+:").unwrap());

/// Schemes that links and images are allowed to use. Scheme-less URLs are always allowed.
const SAFE_SCHEMES: &[&str] = &["http:", "https:", "mailto:"];

enum Rewrite {
    /// A replacement string in [`regex`] expansion syntax (`$1`, `${name}`).
    Template(&'static str),
    /// A replacement computed from the match.
    With(fn(&Captures) -> String),
}

struct Rule {
    name: &'static str,
    pattern: Regex,
    rewrite: Rewrite,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, rewrite: Rewrite) -> Self {
        // Unwrap justification: every pattern is a hardcoded literal covered by the tests below.
        let pattern = Regex::new(pattern).unwrap();
        Self {
            name,
            pattern,
            rewrite,
        }
    }

    fn apply(&self, text: String) -> String {
        if !self.pattern.is_match(&text) {
            return text;
        }

        trace!("Applying Markdown rule '{}'", self.name);

        match self.rewrite {
            Rewrite::Template(template) => self.pattern.replace_all(&text, template).into_owned(),
            Rewrite::With(rewrite) => self
                .pattern
                .replace_all(&text, |caps: &Captures| rewrite(caps))
                .into_owned(),
        }
    }
}

/// The rewrite chain, in execution order.
///
/// Warning: order matters here! Escaping has to come before anything emits markup, fences
/// have to be matched before inline code (or a fence gets split into inline spans), images
/// before links (or `[alt](url)` gets eaten out of `![alt](url)`), and bold before italic.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Rewrite::*;

    vec![
        Rule::new("line-endings", r"\r\n?", Template("\n")),
        Rule::new("escape-ampersand", r"&", Template("&amp;")),
        Rule::new("escape-angle", r"<", Template("&lt;")),
        Rule::new("escape-quote", r#"""#, Template("&quot;")),
        Rule::new("header", r"(?m)^(#{1,6})[ \t]+(.+)$", With(header)),
        Rule::new("bold", r"\*\*([^\n]+?)\*\*", Template("<strong>$1</strong>")),
        Rule::new("italic", r"\*([^*\n]+)\*", Template("<em>$1</em>")),
        Rule::new("fenced-code", r"(?s)```([\w+#-]*)\n(.*?)```", With(fenced_code)),
        Rule::new("inline-code", r"`([^`\n]+)`", Template("<code>$1</code>")),
        Rule::new("image", r"!\[([^\]\n]*)\]\(([^)\s]+)\)", With(image)),
        Rule::new("link", r"\[([^\]\n]+)\]\(([^)\s]+)\)", With(link)),
        Rule::new("bullet-item", r"(?m)^- (.+)$", Template("<li>$1</li>")),
        Rule::new("numbered-item", r"(?m)^\d+\. (.+)$", Template("<li>$1</li>")),
        Rule::new("list", r"(?m)^<li>.*</li>(?:\n<li>.*</li>)*", With(list)),
        Rule::new("blockquote", r"(?m)^> (.+)$", Template("<blockquote>$1</blockquote>")),
        Rule::new("horizontal-rule", r"(?m)^-{3,}$", Template("<hr>")),
        Rule::new("paragraph-break", r"\n\n", Template("</p><p>")),
        Rule::new("line-break", r"\n", Template("<br>")),
        Rule::new("outer-paragraph", r"(?s)\A(.*)\z", Template("<p>$1</p>")),
        Rule::new("empty-paragraph", r"<p>\s*</p>", Template("")),
    ]
});

/// Renders a Markdown subset into HTML for previewing. Pure and infallible.
pub fn render(markdown: &str) -> String {
    RULES
        .iter()
        .fold(markdown.to_owned(), |html, rule| rule.apply(html))
}

fn header(caps: &Captures) -> String {
    let level = caps[1].len();
    format!("<h{level}>{}</h{level}>", caps[2].trim_end())
}

fn fenced_code(caps: &Captures) -> String {
    let code = caps[2].strip_suffix('\n').unwrap_or(&caps[2]);

    match &caps[1] {
        "" => format!("<pre><code>{code}</code></pre>"),
        lang => format!("<pre><code class=\"language-{lang}\">{code}</code></pre>"),
    }
}

fn image(caps: &Captures) -> String {
    let (alt, src) = (&caps[1], &caps[2]);

    if !is_safe_url(src) {
        return caps[0].to_owned();
    }

    format!("<img src=\"{src}\" alt=\"{alt}\" style=\"max-width: 100%;\">")
}

fn link(caps: &Captures) -> String {
    let (text, href) = (&caps[1], &caps[2]);

    if !is_safe_url(href) {
        return caps[0].to_owned();
    }

    format!("<a href=\"{href}\" target=\"_blank\" rel=\"noopener noreferrer\">{text}</a>")
}

/// Collapses a contiguous run of `<li>` lines into a single `<ul>`.
fn list(caps: &Captures) -> String {
    format!("<ul>{}</ul>", caps[0].replace('\n', ""))
}

fn is_safe_url(url: &str) -> bool {
    match URL_SCHEMA.find(url) {
        Some(scheme) => SAFE_SCHEMES
            .iter()
            .any(|safe| scheme.as_str().eq_ignore_ascii_case(safe)),
        None => true,
    }
}
