use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Analysis fields the model is asked to return
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub latest_value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub absolute_change: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub percentage_change: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub historical_average: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub trend: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub analysis: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub significance: String,
}

/// Diagnostic record for a model response that could not be used
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseError {
    pub error: String,
    pub raw_result: Option<String>,
    pub cleaned_result: Option<String>,
    pub reason: Option<String>,
}

pub const NON_STRING_RESULT: &str = "non-string result";
pub const JSON_PARSE_FAILED: &str = "failed to parse JSON";

/// Parse the model's reply into an [`AnalysisPayload`].
///
/// Accepts bare JSON or JSON wrapped in a Markdown code fence. Never panics;
/// anything unusable comes back as a [`ResponseError`].
pub fn parse_analysis_response(raw: Option<&str>) -> Result<AnalysisPayload, ResponseError> {
    let Some(raw) = raw else {
        return Err(ResponseError {
            error: NON_STRING_RESULT.to_string(),
            raw_result: None,
            cleaned_result: None,
            reason: None,
        });
    };

    let cleaned = strip_code_fence(raw);

    serde_json::from_str::<AnalysisPayload>(cleaned).map_err(|e| ResponseError {
        error: JSON_PARSE_FAILED.to_string(),
        raw_result: Some(raw.to_string()),
        cleaned_result: Some(cleaned.to_string()),
        reason: Some(e.to_string()),
    })
}

/// Strip an optional leading ```` ```json ```` (or bare ```` ``` ````) fence,
/// an optional trailing fence and surrounding whitespace.
pub fn strip_code_fence(text: &str) -> &str {
    let mut s = text.trim();

    if let Some(rest) = s.strip_prefix("```") {
        s = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }

    s.trim()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "latestValue": "1.2M",
        "absoluteChange": "+120K",
        "percentageChange": "+11.11%",
        "historicalAverage": "1.08M",
        "trend": "Steady growth",
        "analysis": "Volume rose on the back of new listings.",
        "significance": "LOW"
    }"#;

    #[test]
    fn test_parse_bare_json() {
        let payload = parse_analysis_response(Some(BODY)).unwrap();
        assert_eq!(payload.latest_value, "1.2M");
        assert_eq!(payload.percentage_change, "+11.11%");
        assert_eq!(payload.significance, "LOW");
    }

    #[test]
    fn test_fenced_json_matches_bare_json() {
        let bare = parse_analysis_response(Some(BODY)).unwrap();

        for fenced in [
            format!("```json\n{}\n```", BODY),
            format!("```\n{}\n```", BODY),
            format!("  \n```json{}```\n\n", BODY),
            format!("```json\n{}", BODY),
        ] {
            assert_eq!(parse_analysis_response(Some(&fenced)).unwrap(), bare);
        }
    }

    #[test]
    fn test_none_is_non_string_result() {
        let err = parse_analysis_response(None).unwrap_err();
        assert_eq!(
            err,
            ResponseError {
                error: NON_STRING_RESULT.to_string(),
                raw_result: None,
                cleaned_result: None,
                reason: None,
            }
        );
    }

    #[test]
    fn test_invalid_json_keeps_diagnostics() {
        let raw = "```json\nnot json at all\n```";
        let err = parse_analysis_response(Some(raw)).unwrap_err();
        assert_eq!(err.error, JSON_PARSE_FAILED);
        assert_eq!(err.raw_result.as_deref(), Some(raw));
        assert_eq!(err.cleaned_result.as_deref(), Some("not json at all"));
        assert!(err.reason.is_some());
    }

    #[test]
    fn test_non_object_json_is_error() {
        assert!(parse_analysis_response(Some("[1, 2, 3]")).is_err());
        assert!(parse_analysis_response(Some("\"text\"")).is_err());
        assert!(parse_analysis_response(Some("")).is_err());
    }

    #[test]
    fn test_numbers_and_missing_fields_are_tolerated() {
        let payload =
            parse_analysis_response(Some(r#"{"latestValue": 1200, "trend": null}"#)).unwrap();
        assert_eq!(payload.latest_value, "1200");
        assert_eq!(payload.trend, "");
        assert_eq!(payload.analysis, "");
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        for raw in ["```", "``````", "   ", "{", "```json", "}```", "\u{0}"] {
            let _ = parse_analysis_response(Some(raw));
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {} "), "{}");
        assert_eq!(strip_code_fence("{}\n```"), "{}");
    }
}
