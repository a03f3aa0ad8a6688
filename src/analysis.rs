use crate::ai::response::{AnalysisPayload, ResponseError};
use crate::config::MetricDescriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// How large a recent change is relative to the historical average
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Significance {
    Low,
    Medium,
    High,
    Critical,
}

impl Significance {
    /// Classify `|absolute_change|` against `|historical_average|`.
    ///
    /// Bounds are inclusive on the lower tier: exactly 0.5x is LOW, exactly
    /// 1x is MEDIUM, exactly 2x is HIGH.
    pub fn classify(absolute_change: f64, historical_average: f64) -> Self {
        let change = absolute_change.abs();
        let average = historical_average.abs();

        if change.is_nan() || average.is_nan() {
            return Significance::Low;
        }

        if change <= 0.5 * average {
            Significance::Low
        } else if change <= average {
            Significance::Medium
        } else if change <= 2.0 * average {
            Significance::High
        } else {
            Significance::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Significance::Low => "LOW",
            Significance::Medium => "MEDIUM",
            Significance::High => "HIGH",
            Significance::Critical => "CRITICAL",
        }
    }

    /// Slack emoji shortcode used in the digest
    pub fn emoji(&self) -> &'static str {
        match self {
            Significance::Low => ":large_green_circle:",
            Significance::Medium => ":large_yellow_circle:",
            Significance::High => ":large_orange_circle:",
            Significance::Critical => ":red_circle:",
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Significance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Significance::Low),
            "MEDIUM" => Ok(Significance::Medium),
            "HIGH" => Ok(Significance::High),
            "CRITICAL" => Ok(Significance::Critical),
            other => Err(format!("unknown significance: {}", other)),
        }
    }
}

/// Analysis of one metric for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAnalysis {
    pub metric: String,
    pub url: String,
    pub frequency: String,
    pub period: String,
    pub latest_value: String,
    pub absolute_change: String,
    pub percentage_change: String,
    pub historical_average: String,
    pub trend: String,
    pub analysis: String,
    pub significance: Significance,
}

impl MetricAnalysis {
    /// Combine a parsed model response with the metric it describes.
    ///
    /// The tier is recomputed from the reported change and average whenever
    /// both read back as numbers; the model's own tier is only a fallback.
    pub fn from_payload(metric: &MetricDescriptor, period: &str, payload: AnalysisPayload) -> Self {
        let stated = payload.significance.parse::<Significance>().ok();
        let computed = match (
            parse_display_number(&payload.absolute_change),
            parse_display_number(&payload.historical_average),
        ) {
            (Some(change), Some(average)) => Some(Significance::classify(change, average)),
            _ => None,
        };

        let significance = match (computed, stated) {
            (Some(computed), Some(stated)) if computed != stated => {
                tracing::warn!(
                    metric = %metric.name,
                    stated = %stated,
                    computed = %computed,
                    "Model significance disagrees with reported numbers, using computed tier"
                );
                computed
            }
            (Some(computed), _) => computed,
            (None, Some(stated)) => stated,
            (None, None) => Significance::Low,
        };

        Self {
            metric: metric.name.clone(),
            url: metric.url.clone(),
            frequency: metric.frequency.clone(),
            period: period.to_string(),
            latest_value: payload.latest_value,
            absolute_change: payload.absolute_change,
            percentage_change: payload.percentage_change,
            historical_average: payload.historical_average,
            trend: payload.trend,
            analysis: payload.analysis,
            significance,
        }
    }
}

/// Error record kept in the digest in place of an analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricFailure {
    pub metric: String,
    pub url: String,
    pub error: String,
    pub raw_result: Option<String>,
    pub cleaned_result: Option<String>,
    pub reason: Option<String>,
}

impl MetricFailure {
    pub fn from_response_error(metric: &MetricDescriptor, error: ResponseError) -> Self {
        Self {
            metric: metric.name.clone(),
            url: metric.url.clone(),
            error: error.error,
            raw_result: error.raw_result,
            cleaned_result: error.cleaned_result,
            reason: error.reason,
        }
    }

    pub fn processing(metric: &MetricDescriptor, reason: impl fmt::Display) -> Self {
        Self {
            metric: metric.name.clone(),
            url: metric.url.clone(),
            error: "processing failed".to_string(),
            raw_result: None,
            cleaned_result: None,
            reason: Some(reason.to_string()),
        }
    }
}

/// Result of processing a single metric
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricOutcome {
    Analyzed(MetricAnalysis),
    Failed(MetricFailure),
}

impl MetricOutcome {
    pub fn metric(&self) -> &str {
        match self {
            MetricOutcome::Analyzed(analysis) => &analysis.metric,
            MetricOutcome::Failed(failure) => &failure.metric,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, MetricOutcome::Failed(_))
    }
}

fn display_number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([+\-−])?\s*[$€£]?\s*(\d[\d,]*(?:\.\d+)?|\.\d+)\s*([A-Za-z]*)")
            .expect("display number regex is valid")
    })
}

/// Read back a number written in digest style, e.g. `+1.2M`, `-$3,400`,
/// `850K users` or `42`. A K/M/B suffix (either case) only counts when it stands alone,
/// so `5 mins` reads as 5.
pub fn parse_display_number(text: &str) -> Option<f64> {
    let caps = display_number_regex().captures(text.trim())?;

    let digits: String = caps[2].chars().filter(|c| *c != ',').collect();
    let mut value: f64 = digits.parse().ok()?;

    value *= match caps.get(3).map(|m| m.as_str()) {
        Some("K") | Some("k") => 1_000.0,
        Some("M") | Some("m") => 1_000_000.0,
        Some("B") | Some("b") => 1_000_000_000.0,
        _ => 1.0,
    };

    if matches!(caps.get(1).map(|m| m.as_str()), Some("-") | Some("−")) {
        value = -value;
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{HistoricalPeriod, PeriodUnit};

    fn metric() -> MetricDescriptor {
        MetricDescriptor {
            name: "Daily Active Users".to_string(),
            query_id: 42,
            url: "https://dune.com/queries/42".to_string(),
            frequency: "daily".to_string(),
            period: HistoricalPeriod::Relative { count: 7, unit: PeriodUnit::Day },
            limit: 30,
            instruction: None,
        }
    }

    fn payload(change: &str, average: &str, significance: &str) -> AnalysisPayload {
        AnalysisPayload {
            latest_value: "1,200 users".to_string(),
            absolute_change: change.to_string(),
            percentage_change: "+10.00%".to_string(),
            historical_average: average.to_string(),
            trend: "Upward".to_string(),
            analysis: "Usage grew.".to_string(),
            significance: significance.to_string(),
        }
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(Significance::classify(0.0, 100.0), Significance::Low);
        assert_eq!(Significance::classify(50.0, 100.0), Significance::Low);
        assert_eq!(Significance::classify(50.01, 100.0), Significance::Medium);
        assert_eq!(Significance::classify(100.0, 100.0), Significance::Medium);
        assert_eq!(Significance::classify(150.0, 100.0), Significance::High);
        assert_eq!(Significance::classify(200.0, 100.0), Significance::High);
        assert_eq!(Significance::classify(200.5, 100.0), Significance::Critical);
    }

    #[test]
    fn test_classify_uses_magnitude() {
        assert_eq!(Significance::classify(-150.0, 100.0), Significance::High);
        assert_eq!(Significance::classify(30.0, -100.0), Significance::Low);
    }

    #[test]
    fn test_classify_zero_average() {
        assert_eq!(Significance::classify(0.0, 0.0), Significance::Low);
        assert_eq!(Significance::classify(1.0, 0.0), Significance::Critical);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let average = 1_000.0;
        let mut previous = Significance::Low;
        for step in 0..=400 {
            let change = step as f64 * 10.0;
            let tier = Significance::classify(change, average);
            assert!(tier >= previous, "tier dropped at change {}", change);
            previous = tier;
        }
        assert_eq!(previous, Significance::Critical);
    }

    #[test]
    fn test_significance_from_str() {
        assert_eq!("high".parse::<Significance>(), Ok(Significance::High));
        assert_eq!(" CRITICAL ".parse::<Significance>(), Ok(Significance::Critical));
        assert!("severe".parse::<Significance>().is_err());
    }

    #[test]
    fn test_parse_display_number() {
        assert_eq!(parse_display_number("42"), Some(42.0));
        assert_eq!(parse_display_number("+1.2M"), Some(1_200_000.0));
        assert_eq!(parse_display_number("-$3,400"), Some(-3_400.0));
        assert_eq!(parse_display_number("850K users"), Some(850_000.0));
        assert_eq!(parse_display_number("$2.5B"), Some(2_500_000_000.0));
        assert_eq!(parse_display_number("5 mins"), Some(5.0));
        assert_eq!(parse_display_number("1,234 txns"), Some(1_234.0));
        assert_eq!(parse_display_number("1.08m"), Some(1_080_000.0));
        assert_eq!(parse_display_number("3b"), Some(3_000_000_000.0));
        assert_eq!(parse_display_number("N/A"), None);
        assert_eq!(parse_display_number(""), None);
    }

    #[test]
    fn test_from_payload_keeps_consistent_tier() {
        let analysis = MetricAnalysis::from_payload(
            &metric(),
            "for dates 2024-03-08 to 2024-03-14",
            payload("+100", "1,000", "LOW"),
        );
        assert_eq!(analysis.significance, Significance::Low);
        assert_eq!(analysis.metric, "Daily Active Users");
        assert_eq!(analysis.url, "https://dune.com/queries/42");
        assert_eq!(analysis.period, "for dates 2024-03-08 to 2024-03-14");
    }

    #[test]
    fn test_from_payload_overrides_inconsistent_tier() {
        let analysis = MetricAnalysis::from_payload(
            &metric(),
            "for month February",
            payload("+2.5K", "1K", "LOW"),
        );
        assert_eq!(analysis.significance, Significance::Critical);
    }

    #[test]
    fn test_from_payload_mixed_suffix_case() {
        let analysis = MetricAnalysis::from_payload(
            &metric(),
            "for month February",
            payload("+120K", "1.08m", "LOW"),
        );
        assert_eq!(analysis.significance, Significance::Low);
    }

    #[test]
    fn test_from_payload_falls_back_to_stated_tier() {
        let analysis = MetricAnalysis::from_payload(
            &metric(),
            "for month February",
            payload("unchanged", "n/a", "medium"),
        );
        assert_eq!(analysis.significance, Significance::Medium);

        let analysis =
            MetricAnalysis::from_payload(&metric(), "for month February", payload("", "", ""));
        assert_eq!(analysis.significance, Significance::Low);
    }

    #[test]
    fn test_failure_from_response_error() {
        let failure = MetricFailure::from_response_error(
            &metric(),
            ResponseError {
                error: "non-string result".to_string(),
                raw_result: None,
                cleaned_result: None,
                reason: None,
            },
        );
        assert_eq!(failure.metric, "Daily Active Users");
        assert_eq!(failure.error, "non-string result");
        assert!(failure.raw_result.is_none());

        let outcome = MetricOutcome::Failed(failure);
        assert!(outcome.is_failure());
        assert_eq!(outcome.metric(), "Daily Active Users");
    }
}
