use pulldown_cmark::{html, Parser};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiEntry {
    pub title: String,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Render a markdown entry body to HTML.
pub fn render_markdown(body: &str) -> String {
    let parser = Parser::new(body);
    let mut rendered = String::with_capacity(body.len() * 2);
    html::push_html(&mut rendered, parser);
    rendered
}
