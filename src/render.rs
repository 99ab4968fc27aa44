use pulldown_cmark::{html, Options, Parser};

pub trait Sanitizer {
    fn sanitize(&self, html: &str) -> String;
}

/// Whitelist-based cleaning: scripts, event handlers and `javascript:` URLs are dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct AmmoniaSanitizer;

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, html: &str) -> String {
        ammonia::clean(html)
    }
}

/// Passes model output through untouched. Only for hosts that already trust the endpoint.
#[derive(Clone, Copy, Debug, Default)]
pub struct TrustedHtml;

impl Sanitizer for TrustedHtml {
    fn sanitize(&self, html: &str) -> String {
        html.to_string()
    }
}

pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

pub fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, markdown_options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn escape_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

pub struct Renderer {
    sanitizer: Box<dyn Sanitizer + Send + Sync>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(AmmoniaSanitizer)
    }
}

impl Renderer {
    pub fn new(sanitizer: impl Sanitizer + Send + Sync + 'static) -> Self {
        Self {
            sanitizer: Box::new(sanitizer),
        }
    }

    pub fn assistant_html(&self, markdown: &str) -> String {
        self.sanitizer.sanitize(&markdown_to_html(markdown))
    }

    pub fn user_html(&self, text: &str) -> String {
        format!("<p>{}</p>", escape_text(text))
    }
}
