use serde::{Deserialize, Serialize};

pub const DEFAULT_TECH: &str = "react, reactjs, next, nextjs, node, nodejs, mern, mongodb, express, \
javascript, typescript, frontend, front-end, full stack, fullstack, web developer, \
software engineer, ui developer, html, css, tailwind, redux, api, graphql, developer, programmer";

pub const DEFAULT_HIRING: &str = "hiring, looking for, we need, urgent, immediately, asap, vacancy, \
opportunity, remote, work from home, wfh, worldwide, apply now, send cv, send resume, dm me, \
recruiter, join our team, position available, job opening";

pub const DEFAULT_MONEY: &str = "$, usd, k/month, per month, monthly, salary, budget, package, \
hourly, rate, compensation, paid, negotiable, competitive";

/// Raw keyword configuration: three comma-separated strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeywordConfig {
    pub tech: String,
    pub hiring: String,
    pub money: String,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            tech: DEFAULT_TECH.into(),
            hiring: DEFAULT_HIRING.into(),
            money: DEFAULT_MONEY.into(),
        }
    }
}

/// Parsed keyword lists used by one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    pub tech: Vec<String>,
    pub hiring: Vec<String>,
    pub money: Vec<String>,
}

impl KeywordSet {
    /// Split each list on commas. A blank list falls back to its default.
    pub fn from_config(cfg: &KeywordConfig) -> Self {
        Self {
            tech: split_list(or_default(&cfg.tech, DEFAULT_TECH)),
            hiring: split_list(or_default(&cfg.hiring, DEFAULT_HIRING)),
            money: split_list(or_default(&cfg.money, DEFAULT_MONEY)),
        }
    }

    pub fn len(&self) -> usize {
        self.tech.len() + self.hiring.len() + self.money.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

/// Lowercase, trim, drop empties, keep first occurrence of duplicates.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let token = token.trim().to_lowercase();
        if !token.is_empty() && !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

/// Supplies the keyword set at the start of each extraction run.
pub trait KeywordSource: Send + Sync {
    fn keywords(&self) -> KeywordSet;
}

impl KeywordSource for KeywordSet {
    fn keywords(&self) -> KeywordSet {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_trims_and_lowercases() {
        assert_eq!(
            split_list(" React,  NODE ,,vue "),
            vec!["react", "node", "vue"]
        );
    }

    #[test]
    fn split_drops_duplicates() {
        assert_eq!(split_list("react, React, node"), vec!["react", "node"]);
    }

    #[test]
    fn blank_list_uses_default() {
        let cfg = KeywordConfig {
            tech: "  ".into(),
            hiring: "hiring".into(),
            money: String::new(),
        };
        let set = KeywordSet::from_config(&cfg);
        assert!(set.tech.contains(&"react".to_string()));
        assert_eq!(set.hiring, vec!["hiring"]);
        assert!(set.money.contains(&"$".to_string()));
    }

    #[test]
    fn default_config_parses_every_list() {
        let set = KeywordSet::from_config(&KeywordConfig::default());
        assert!(set.tech.contains(&"full stack".to_string()));
        assert!(set.hiring.contains(&"work from home".to_string()));
        assert!(set.money.contains(&"k/month".to_string()));
        assert!(set.tech.iter().all(|k| k == &k.trim().to_lowercase()));
    }
}
