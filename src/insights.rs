//! Best-effort mining of free-text recommendation output. The text comes
//! from an external report generator and has no grammar; extraction is
//! first-match pattern search and silently omits whatever is absent.

use crate::models::{Insight, InsightKind};
use regex::Regex;
use std::sync::OnceLock;

const MAX_INSIGHTS: usize = 3;

fn savings_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$[\d,]+").expect("hard-coded pattern"))
}

fn resources_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s+(instance|resource|service)").expect("hard-coded pattern"))
}

/// Extracts up to three insight chips from recommendation text: the first
/// dollar-shaped token as a savings figure, and the first "N instance/
/// resource/service" mention as a resource count. Never fails; text with
/// no matches yields an empty list.
pub fn extract_key_insights(text: &str) -> Vec<Insight> {
    if text.is_empty() {
        return Vec::new();
    }
    let text = text.to_lowercase();

    let mut insights = Vec::new();
    if let Some(found) = savings_pattern().find(&text) {
        insights.push(Insight {
            kind: InsightKind::Savings,
            value: found.as_str().to_string(),
            label: "Potential Monthly Savings",
        });
    }
    if let Some(caps) = resources_pattern().captures(&text) {
        insights.push(Insight {
            kind: InsightKind::Resources,
            value: caps[1].to_string(),
            label: "Resources Identified",
        });
    }
    insights.truncate(MAX_INSIGHTS);
    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_savings_then_resources_in_order() {
        let insights = extract_key_insights(
            "We recommend downsizing 3 instances, saving approximately $450/month.",
        );
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].kind, InsightKind::Savings);
        assert_eq!(insights[0].value, "$450");
        assert_eq!(insights[0].label, "Potential Monthly Savings");
        assert_eq!(insights[1].kind, InsightKind::Resources);
        assert_eq!(insights[1].value, "3");
        assert_eq!(insights[1].label, "Resources Identified");
    }

    #[test]
    fn takes_only_the_first_match_of_each_kind() {
        let insights =
            extract_key_insights("Savings of $1,200 now and $9,999 later across 4 services and 7 resources.");
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].value, "$1,200");
        assert_eq!(insights[1].value, "4");
    }

    #[test]
    fn matching_is_case_insensitive() {
        let insights = extract_key_insights("Review 2 INSTANCES before scale-down.");
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].kind, InsightKind::Resources);
        assert_eq!(insights[0].value, "2");
    }

    #[test]
    fn empty_or_unmatched_text_yields_no_insights() {
        assert!(extract_key_insights("").is_empty());
        assert!(extract_key_insights("Costs look healthy this period.").is_empty());
    }

    #[test]
    fn bare_dollar_sign_without_digits_is_not_a_savings_insight() {
        assert!(extract_key_insights("spend in $ terms is stable").is_empty());
    }
}
