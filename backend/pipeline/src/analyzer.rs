//! Keyword-based free-text review used by `POST /api/dpr/analyze`.

use async_trait::async_trait;
use serde_json::Value;

use dprscope_core::content::{self, SectionCoverage};
use dprscope_core::{DprError, DprResult, TextAnalysis, TextAnalyzer};

const FEASIBILITY_NOTES: [&str; 2] = [
    "Technical feasibility appears reasonable based on available details.",
    "No major structural inconsistencies detected in report.",
];

const SUGGESTIONS: [&str; 3] = [
    "Add risk assessment and mitigation section.",
    "Include sustainability or scalability projections.",
    "Cross-verify cost distribution against industry norms.",
];

#[derive(Debug, Default, Clone)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

fn is_empty_field(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

#[async_trait]
impl TextAnalyzer for KeywordAnalyzer {
    async fn analyze(&self, text: &str, structured_fields: Option<&Value>) -> DprResult<TextAnalysis> {
        if text.trim().is_empty() {
            return Err(DprError::MissingInput("Missing DPR text".into()));
        }

        let coverage = SectionCoverage::detect(text);
        let mut issues = Vec::new();
        if !coverage.budget {
            issues.push("Missing cost or financial details.".to_string());
        }
        if !coverage.timeline {
            issues.push("Project duration/timeline not defined.".to_string());
        }
        if !coverage.manpower {
            issues.push("Manpower distribution section missing.".to_string());
        }
        if let Some(Value::Object(fields)) = structured_fields {
            issues.extend(
                fields
                    .iter()
                    .filter(|(_, v)| is_empty_field(v))
                    .map(|(name, _)| format!("Structured field '{name}' is empty.")),
            );
        }

        let class = content::length_class(content::word_count(text));
        let mut feasibility_insights = vec![format!("DPR length classified as: {}", class.as_str())];
        feasibility_insights.extend(FEASIBILITY_NOTES.iter().map(|s| s.to_string()));

        Ok(TextAnalysis {
            issues,
            feasibility_insights,
            suggestions: SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_report_has_no_section_issues() {
        let text = "Total project cost is 4 crore over a timeline of 18 months with a staff of 40.";
        let analysis = KeywordAnalyzer::new().analyze(text, None).await.unwrap();
        assert!(analysis.issues.is_empty());
        assert_eq!(analysis.feasibility_insights[0], "DPR length classified as: Brief");
        assert_eq!(analysis.feasibility_insights.len(), 3);
        assert_eq!(analysis.suggestions.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_sections_reported_in_order() {
        let analysis = KeywordAnalyzer::new()
            .analyze("Road widening near the river bridge.", None)
            .await
            .unwrap();
        assert_eq!(
            analysis.issues,
            vec![
                "Missing cost or financial details.",
                "Project duration/timeline not defined.",
                "Manpower distribution section missing.",
            ]
        );
    }

    #[tokio::test]
    async fn test_detailed_length_class() {
        let text = "budget ".repeat(301);
        let analysis = KeywordAnalyzer::new().analyze(&text, None).await.unwrap();
        assert_eq!(analysis.feasibility_insights[0], "DPR length classified as: Detailed");
    }

    #[tokio::test]
    async fn test_empty_structured_fields() {
        let fields = json!({"district": "Kamrup", "funding": "", "milestones": [], "agency": null});
        let analysis = KeywordAnalyzer::new()
            .analyze("budget timeline team", Some(&fields))
            .await
            .unwrap();
        assert_eq!(
            analysis.issues,
            vec![
                "Structured field 'agency' is empty.",
                "Structured field 'funding' is empty.",
                "Structured field 'milestones' is empty.",
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_text_rejected() {
        let err = KeywordAnalyzer::new().analyze("   ", None).await.unwrap_err();
        assert!(matches!(err, DprError::MissingInput(ref m) if m == "Missing DPR text"));
    }
}
