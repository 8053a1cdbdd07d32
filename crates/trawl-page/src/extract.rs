//! Candidate discovery and post parsing.
//!
//! Discovery runs an ordered list of strategies and uses the first one that
//! yields anything. Results from different strategies are never merged.

use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

use trawl_core::{now_millis, Diagnostics, KeywordSet, Post, MIN_POST_TEXT_CHARS, NO_URL};

use crate::dom::{body_text, collapse_ws, first_in, inner_text, select_doc, select_in};
use crate::score::score;

static POSTS_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/posts/(\d+)").unwrap());
static PERMALINK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/permalink/(\d+)").unwrap());
static GROUP_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"groups/([^/?#]+)").unwrap());

const FALLBACK_ORIGIN: &str = "https://www.facebook.com";

type Strategy = for<'a> fn(&'a Html) -> Vec<ElementRef<'a>>;

/// Discovery strategies, most specific first.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("feed_children", feed_children),
    ("role_article", role_articles),
    ("feed_wrapper", feed_wrappers),
    ("message_preview", message_preview_posts),
];

/// Posts found on one page plus the counts that explain how.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub posts: Vec<Post>,
    pub diagnostics: Diagnostics,
}

fn feed_children(doc: &Html) -> Vec<ElementRef<'_>> {
    select_doc(doc, r#"div[role="feed"]"#)
        .into_iter()
        .next()
        .map(|feed| feed.children().filter_map(ElementRef::wrap).collect())
        .unwrap_or_default()
}

fn role_articles(doc: &Html) -> Vec<ElementRef<'_>> {
    select_doc(doc, r#"div[role="article"]"#)
}

fn feed_wrappers(doc: &Html) -> Vec<ElementRef<'_>> {
    select_doc(doc, "div.x1yztbdb")
}

/// Walk each message preview up to its enclosing article, or its
/// grandparent when no article wraps it.
fn message_preview_posts(doc: &Html) -> Vec<ElementRef<'_>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for preview in select_doc(doc, r#"div[data-ad-preview="message"]"#) {
        let article = preview
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().name() == "div" && a.value().attr("role") == Some("article"));
        let candidate = article.or_else(|| {
            preview
                .parent()
                .and_then(|p| p.parent())
                .and_then(ElementRef::wrap)
        });
        if let Some(c) = candidate {
            if seen.insert(c.id()) {
                out.push(c);
            }
        }
    }
    out
}

/// Find post candidates, parse and score them, dedupe by id, and sort by
/// score descending (stable, so ties keep discovery order).
pub fn extract(html: &str, page_url: &str, keywords: &KeywordSet) -> Extraction {
    let doc = Html::parse_document(html);

    let mut strategy = None;
    let mut candidates = Vec::new();
    for (name, find) in STRATEGIES {
        candidates = find(&doc);
        if !candidates.is_empty() {
            strategy = Some(name.to_string());
            break;
        }
    }

    let now = now_millis();
    let mut seen: HashSet<String> = HashSet::new();
    let mut posts = Vec::new();
    for node in &candidates {
        let Some(mut post) = parse_candidate(*node, page_url, now) else {
            continue;
        };
        if !seen.insert(post.id.clone()) {
            continue;
        }
        let relevance = score(&post.text, keywords);
        post.score = relevance.score;
        post.matched_keywords = relevance.matched_keywords;
        posts.push(post);
    }
    posts.sort_by(|a, b| b.score.cmp(&a.score));

    let diagnostics = Diagnostics {
        url: page_url.to_string(),
        body_len: collapse_ws(&body_text(&doc)).chars().count(),
        strategy,
        candidates: candidates.len(),
        feed_found: !select_doc(&doc, r#"div[role="feed"]"#).is_empty(),
        article_count: role_articles(&doc).len(),
    };

    if posts.is_empty() {
        tracing::warn!(
            url = page_url,
            body_len = diagnostics.body_len,
            candidates = diagnostics.candidates,
            feed_found = diagnostics.feed_found,
            articles = diagnostics.article_count,
            "zero posts extracted"
        );
    } else {
        tracing::info!(
            url = page_url,
            candidates = diagnostics.candidates,
            posts = posts.len(),
            strategy = diagnostics.strategy.as_deref().unwrap_or("-"),
            "extracted posts"
        );
    }

    Extraction { posts, diagnostics }
}

/// Parse one candidate. `None` when it has no id or too little text.
fn parse_candidate(node: ElementRef<'_>, page_url: &str, now: i64) -> Option<Post> {
    let base = Url::parse(page_url).ok();

    let mut permalink = None;
    for link in select_in(node, "a[href]") {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let resolved = match &base {
            Some(b) => b.join(href).ok(),
            None => Url::parse(href).ok(),
        };
        let Some(u) = resolved else { continue };
        if u.as_str().contains("/posts/") || u.as_str().contains("/permalink/") {
            permalink = Some(format!("{}{}", u.origin().ascii_serialization(), u.path()));
            break;
        }
    }

    let mut id = permalink.as_deref().and_then(|p| {
        POSTS_ID
            .captures(p)
            .or_else(|| PERMALINK_ID.captures(p))
            .map(|c| c[1].to_string())
    });

    if id.is_none() {
        id = first_in(node, "[data-ft]")
            .and_then(|el| el.value().attr("data-ft"))
            .and_then(structured_post_id);
    }

    let id = id?;

    if permalink.is_none() {
        permalink = GROUP_SLUG.captures(page_url).map(|c| {
            let origin = base
                .as_ref()
                .map(|b| b.origin().ascii_serialization())
                .filter(|o| o != "null")
                .unwrap_or_else(|| FALLBACK_ORIGIN.to_string());
            format!("{origin}/groups/{}/posts/{id}/", &c[1])
        });
    }

    let content = first_in(node, r#"[data-ad-preview="message"]"#)
        .or_else(|| first_in(node, r#"div[dir="auto"]"#))
        .unwrap_or(node);
    let text = collapse_ws(&inner_text(content));
    if text.chars().count() < MIN_POST_TEXT_CHARS {
        return None;
    }

    let author = first_in(node, "strong, h2, h3")
        .and_then(|el| {
            inner_text(el)
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(String::from)
        })
        .unwrap_or_else(|| "Unknown".to_string());

    Some(Post {
        id,
        text,
        author,
        url: permalink.unwrap_or_else(|| NO_URL.to_string()),
        timestamp: now,
        score: 0,
        matched_keywords: Vec::new(),
    })
}

/// Pull `top_level_post_id` out of a `data-ft` JSON blob (string or number).
fn structured_post_id(raw: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    match value.get("top_level_post_id")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trawl_core::keywords::split_list;

    const GROUP: &str = "https://www.facebook.com/groups/reactjobs/";

    fn keywords() -> KeywordSet {
        KeywordSet {
            tech: split_list("react, node, typescript"),
            hiring: split_list("hiring"),
            money: split_list("$"),
        }
    }

    fn article(id: &str, author: &str, text: &str) -> String {
        format!(
            r#"<div role="article"><h3><a href="/user/1">{author}</a></h3>
               <a href="https://www.facebook.com/groups/reactjobs/posts/{id}/?comment_id=9#x">2h</a>
               <div data-ad-preview="message">{text}</div></div>"#
        )
    }

    #[test]
    fn feed_children_strategy_wins() {
        let html = format!(
            r#"<body><div role="feed">{}{}</div></body>"#,
            article("111", "Ana", "We are hiring a React dev, $4k"),
            article("222", "Ben", "Selling a used bicycle, good condition"),
        );
        let ex = extract(&html, GROUP, &keywords());
        assert_eq!(ex.diagnostics.strategy.as_deref(), Some("feed_children"));
        assert_eq!(ex.posts.len(), 2);
        assert_eq!(ex.posts[0].id, "111");
        assert_eq!(ex.posts[0].author, "Ana");
        assert_eq!(
            ex.posts[0].url,
            "https://www.facebook.com/groups/reactjobs/posts/111/"
        );
        assert_eq!(ex.posts[0].score, 5);
        assert_eq!(ex.posts[0].matched_keywords, vec!["react"]);
    }

    #[test]
    fn falls_back_to_articles_without_feed() {
        let html = format!("<body>{}</body>", article("333", "Cy", "Need a Node engineer now"));
        let ex = extract(&html, GROUP, &keywords());
        assert_eq!(ex.diagnostics.strategy.as_deref(), Some("role_article"));
        assert!(!ex.diagnostics.feed_found);
        assert_eq!(ex.posts.len(), 1);
    }

    #[test]
    fn hashed_wrapper_strategy() {
        let html = r#"<body><div class="x1yztbdb other">
            <a href="/groups/reactjobs/permalink/444/">link</a>
            <div dir="auto">Contract TypeScript work available</div></div></body>"#;
        let ex = extract(html, GROUP, &keywords());
        assert_eq!(ex.diagnostics.strategy.as_deref(), Some("feed_wrapper"));
        assert_eq!(ex.posts[0].id, "444");
        assert_eq!(ex.posts[0].text, "Contract TypeScript work available");
        assert_eq!(ex.posts[0].author, "Unknown");
    }

    #[test]
    fn message_preview_walks_to_grandparent() {
        let html = r#"<body><section><div class="outer"><div class="inner">
            <div data-ad-preview="message">Hiring remote node developers</div>
            </div><span data-ft='{"top_level_post_id": 555}'></span></div></section></body>"#;
        let ex = extract(html, GROUP, &keywords());
        assert_eq!(ex.diagnostics.strategy.as_deref(), Some("message_preview"));
        assert_eq!(ex.posts.len(), 1);
        assert_eq!(ex.posts[0].id, "555");
        assert_eq!(
            ex.posts[0].url,
            "https://www.facebook.com/groups/reactjobs/posts/555/"
        );
    }

    #[test]
    fn candidate_without_id_is_dropped() {
        let html = r#"<body><div role="article"><div dir="auto">Long enough text but no id</div></div></body>"#;
        let ex = extract(html, GROUP, &keywords());
        assert!(ex.posts.is_empty());
        assert_eq!(ex.diagnostics.candidates, 1);
    }

    #[test]
    fn short_text_is_noise() {
        let html = format!("<body>{}</body>", article("666", "Dee", "Sponsored"));
        assert!(extract(&html, GROUP, &keywords()).posts.is_empty());
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let html = format!(
            "<body>{}{}</body>",
            article("777", "First", "first copy of this post"),
            article("777", "Second", "second copy of this post"),
        );
        let ex = extract(&html, GROUP, &keywords());
        assert_eq!(ex.posts.len(), 1);
        assert_eq!(ex.posts[0].author, "First");
    }

    #[test]
    fn sorted_by_score_with_stable_ties() {
        let html = format!(
            "<body>{}{}{}</body>",
            article("1", "A", "nothing relevant here at all"),
            article("2", "B", "hiring react node typescript $$$"),
            article("3", "C", "also nothing relevant here"),
        );
        let ids: Vec<String> = extract(&html, GROUP, &keywords())
            .posts
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["2", "1", "3"]);
    }

    #[test]
    fn whitespace_is_collapsed() {
        let html = format!(
            "<body>{}</body>",
            article("8", "E", "  multi\n\n   line \t post   body  ")
        );
        assert_eq!(
            extract(&html, GROUP, &keywords()).posts[0].text,
            "multi line post body"
        );
    }

    #[test]
    fn empty_page_reports_diagnostics() {
        let ex = extract("<body><p>nothing to see</p></body>", GROUP, &keywords());
        assert!(ex.posts.is_empty());
        assert_eq!(ex.diagnostics.candidates, 0);
        assert_eq!(ex.diagnostics.strategy, None);
        assert_eq!(ex.diagnostics.body_len, "nothing to see".len());
        assert_eq!(ex.diagnostics.url, GROUP);
    }

    #[test]
    fn structured_id_accepts_string_and_number() {
        assert_eq!(
            structured_post_id(r#"{"top_level_post_id":"42"}"#),
            Some("42".into())
        );
        assert_eq!(
            structured_post_id(r#"{"top_level_post_id":42}"#),
            Some("42".into())
        );
        assert_eq!(structured_post_id("not json"), None);
    }
}
