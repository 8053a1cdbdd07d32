//! Keyword relevance scoring.
//!
//! Matching is case-insensitive substring search, not word-boundary search:
//! "react" also matches "reactive". Recall over precision.

use trawl_core::KeywordSet;

pub const HIRING_POINTS: u32 = 2;
pub const TECH_POINTS: u32 = 2;
/// Tech matches beyond this many do not add points.
pub const MAX_TECH_MATCHES: usize = 3;
pub const MONEY_POINTS: u32 = 1;
pub const LENGTH_POINTS: u32 = 1;
/// Word count a post must exceed to earn the length point.
pub const SUBSTANTIVE_WORDS: usize = 20;

pub const MAX_SCORE: u32 =
    HIRING_POINTS + TECH_POINTS * MAX_TECH_MATCHES as u32 + MONEY_POINTS + LENGTH_POINTS;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relevance {
    pub score: u32,
    /// Every tech keyword found, each once, in keyword-list order.
    pub matched_keywords: Vec<String>,
}

pub fn score(text: &str, keywords: &KeywordSet) -> Relevance {
    let lower = text.to_lowercase();
    let mut score = 0;

    if keywords.hiring.iter().any(|k| lower.contains(k.as_str())) {
        score += HIRING_POINTS;
    }

    let mut matched: Vec<String> = Vec::new();
    for k in &keywords.tech {
        if lower.contains(k.as_str()) && !matched.contains(k) {
            matched.push(k.clone());
        }
    }
    score += TECH_POINTS * matched.len().min(MAX_TECH_MATCHES) as u32;

    if keywords.money.iter().any(|k| lower.contains(k.as_str())) {
        score += MONEY_POINTS;
    }

    if text.split_whitespace().count() > SUBSTANTIVE_WORDS {
        score += LENGTH_POINTS;
    }

    Relevance {
        score,
        matched_keywords: matched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trawl_core::keywords::split_list;

    fn kw(tech: &str, hiring: &str, money: &str) -> KeywordSet {
        KeywordSet {
            tech: split_list(tech),
            hiring: split_list(hiring),
            money: split_list(money),
        }
    }

    #[test]
    fn hiring_react_money_scores_five() {
        let set = kw("react, vue, angular", "hiring, remote", "$, salary");
        let r = score("We are hiring a React developer, $5k/month, remote", &set);
        assert_eq!(r.score, 5);
        assert_eq!(r.matched_keywords, vec!["react"]);
    }

    #[test]
    fn tech_points_saturate_at_three_matches() {
        let set = kw("rust, go, java, kotlin, swift", "", "");
        let mut last = 0;
        let langs = ["rust", "go", "java", "kotlin", "swift"];
        for n in 0..=langs.len() {
            let text = langs[..n].join(" ");
            let r = score(&text, &set);
            assert!(r.score >= last, "score dropped at {n} matches");
            assert_eq!(r.score, TECH_POINTS * n.min(MAX_TECH_MATCHES) as u32);
            assert_eq!(r.matched_keywords.len(), n);
            last = r.score;
        }
    }

    #[test]
    fn substring_matching_is_case_insensitive() {
        let set = kw("react", "", "");
        let r = score("Experience with REACTIVE systems", &set);
        assert_eq!(r.score, 2);
    }

    #[test]
    fn long_posts_earn_length_point() {
        let set = kw("", "", "");
        let words = vec!["word"; 21].join(" ");
        assert_eq!(score(&words, &set).score, 1);
        let words = vec!["word"; 20].join(" ");
        assert_eq!(score(&words, &set).score, 0);
    }

    #[test]
    fn maximum_score_is_ten() {
        let set = kw("a1, b2, c3, d4", "hiring", "salary");
        let text = format!("hiring a1 b2 c3 d4 salary {}", vec!["filler"; 20].join(" "));
        let r = score(&text, &set);
        assert_eq!(r.score, MAX_SCORE);
        assert_eq!(MAX_SCORE, 10);
    }
}
