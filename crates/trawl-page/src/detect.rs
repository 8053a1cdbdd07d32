//! Security-challenge detection.
//!
//! Detection must never take the pipeline down: any internal failure maps to
//! [`DetectionKind::Unknown`], which callers treat like a positive hit.

use scraper::Html;
use trawl_core::{Detection, DetectionKind};

use crate::dom::{body_text, collapse_ws, select_doc};
use crate::page::Page;

/// Pages with less visible text than this are considered blank.
pub const MIN_BODY_CHARS: usize = 50;

/// Lowercase phrases that indicate a challenge page.
pub const CHALLENGE_PHRASES: &[&str] = &[
    "security check",
    "confirm it's you",
    "confirm it\u{2019}s you",
    "captcha",
    "challenge",
    "access denied",
    "suspicious activity",
    "checkpoint",
    "log in to continue",
];

/// Structural markers of a challenge, independent of the text scan.
const CHALLENGE_SELECTORS: &[&str] = &[
    "form#checkpoint_recovery_form",
    "div[role='dialog'] img[alt*='captcha']",
];

/// Classify visible page text.
pub fn detect_text(text: Option<&str>) -> Option<Detection> {
    let text = collapse_ws(text.unwrap_or_default()).to_lowercase();
    if text.chars().count() < MIN_BODY_CHARS {
        return Some(Detection::new(DetectionKind::Blank));
    }
    if CHALLENGE_PHRASES.iter().any(|p| text.contains(p)) {
        return Some(Detection::new(DetectionKind::Interstitial));
    }
    None
}

/// Classify a full HTML document: text scan plus structural checks.
pub fn detect_html(html: &str) -> Option<Detection> {
    let doc = Html::parse_document(html);
    if let Some(hit) = detect_text(Some(body_text(&doc).as_str())) {
        return Some(hit);
    }
    if CHALLENGE_SELECTORS
        .iter()
        .any(|css| !select_doc(&doc, css).is_empty())
    {
        return Some(Detection::new(DetectionKind::Interstitial));
    }
    None
}

/// Inspect the page's current content.
pub async fn detect(page: &dyn Page) -> Option<Detection> {
    match page.content().await {
        Ok(html) => detect_html(&html),
        Err(e) => {
            tracing::warn!(url = page.url(), error = %format!("{e:#}"), "detector could not read page");
            Some(Detection::new(DetectionKind::Unknown))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::StaticPage;

    fn filler() -> String {
        "Lots of ordinary group discussion about frontend roles and projects. ".repeat(3)
    }

    #[test]
    fn empty_text_is_blank() {
        assert_eq!(
            detect_text(None).unwrap().kind,
            DetectionKind::Blank
        );
        assert_eq!(
            detect_text(Some("   short   ")).unwrap().kind,
            DetectionKind::Blank
        );
    }

    #[test]
    fn ordinary_text_passes() {
        assert!(detect_text(Some(&filler())).is_none());
    }

    #[test]
    fn challenge_phrase_is_interstitial() {
        let text = format!("{} Please complete the Security Check to continue.", filler());
        assert_eq!(
            detect_text(Some(&text)).unwrap().kind,
            DetectionKind::Interstitial
        );
    }

    #[test]
    fn checkpoint_form_is_interstitial() {
        let html = format!(
            "<body><p>{}</p><form id=\"checkpoint_recovery_form\"></form></body>",
            filler()
        );
        assert_eq!(
            detect_html(&html).unwrap().kind,
            DetectionKind::Interstitial
        );
    }

    #[test]
    fn captcha_image_in_dialog_is_interstitial() {
        let html = format!(
            "<body><p>{}</p><div role=\"dialog\"><img alt=\"enter captcha text\"></div></body>",
            filler()
        );
        assert_eq!(
            detect_html(&html).unwrap().kind,
            DetectionKind::Interstitial
        );
    }

    #[test]
    fn script_text_does_not_count_as_visible() {
        let html = "<body><script>captcha captcha captcha captcha captcha captcha captcha</script></body>";
        assert_eq!(detect_html(html).unwrap().kind, DetectionKind::Blank);
    }

    #[tokio::test]
    async fn unreadable_page_is_unknown() {
        struct Broken;
        #[async_trait::async_trait]
        impl Page for Broken {
            fn url(&self) -> &str {
                "https://broken"
            }
            async fn content(&self) -> anyhow::Result<String> {
                anyhow::bail!("tab crashed")
            }
            async fn scroll_by(&self, _dy: i64) -> anyhow::Result<()> {
                Ok(())
            }
        }
        assert_eq!(detect(&Broken).await.unwrap().kind, DetectionKind::Unknown);
    }

    #[tokio::test]
    async fn normal_page_has_no_detection() {
        let page = StaticPage::new("https://x", format!("<body><p>{}</p></body>", filler()));
        assert!(detect(&page).await.is_none());
    }
}
