//! Relevance scoring for prompt templates.
//!
//! Bonuses are additive: an exact name match also earns the starts-with and
//! contains bonuses. All comparisons are on lowercased text.

use core_config::Template;

pub const NAME_EXACT: u32 = 1000;
pub const CONTENT_EXACT: u32 = 500;
pub const NAME_PREFIX: u32 = 100;
pub const CONTENT_PREFIX: u32 = 50;
pub const NAME_WORD_PREFIX: u32 = 25;
pub const CONTENT_WORD_PREFIX: u32 = 15;
pub const NAME_CONTAINS: u32 = 10;
pub const CONTENT_CONTAINS: u32 = 5;

fn field_score(hay: &str, query: &str, exact: u32, prefix: u32, word: u32, contains: u32) -> u32 {
    let mut s = 0;
    if hay == query {
        s += exact;
    }
    if hay.starts_with(query) {
        s += prefix;
    }
    if hay.contains(query) {
        s += contains;
    }
    if hay.split_whitespace().any(|w| w.starts_with(query)) {
        s += word;
    }
    s
}

/// Score `template` against `query`. Zero means no match. An empty query
/// scores zero; `rank` handles that case separately.
pub fn score(query: &str, template: &Template) -> u32 {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return 0;
    }
    let name = template.name.to_lowercase();
    let content = template.content.to_lowercase();
    field_score(&name, &q, NAME_EXACT, NAME_PREFIX, NAME_WORD_PREFIX, NAME_CONTAINS)
        + field_score(
            &content,
            &q,
            CONTENT_EXACT,
            CONTENT_PREFIX,
            CONTENT_WORD_PREFIX,
            CONTENT_CONTAINS,
        )
}

/// Order templates by relevance. An empty query keeps the library order;
/// otherwise non-matching templates are dropped and ties keep input order.
pub fn rank<'a>(query: &str, templates: &'a [Template]) -> Vec<&'a Template> {
    if query.trim().is_empty() {
        return templates.iter().collect();
    }
    let mut scored: Vec<(u32, &Template)> = templates
        .iter()
        .map(|t| (score(query, t), t))
        .filter(|(s, _)| *s > 0)
        .collect();
    // sort_by is stable.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, t)| t).collect()
}
