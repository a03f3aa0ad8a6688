use crate::config::MetricDescriptor;

/// System instruction sent with every analysis request
pub const SYSTEM_INSTRUCTION: &str = "You are a data analyst reviewing time-series metrics for a \
    team digest. You compare the most recent value of a metric against its historical trend, \
    report the numbers exactly as instructed and answer with a single JSON object only.";

/// Marker embedded when the data source returned nothing
const NO_DATA: &str = "(no data available)";

/// Generate the analysis prompt for one metric
pub fn generate_analysis_prompt(
    metric: &MetricDescriptor,
    data: Option<&str>,
    period: &str,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("Metric: {}\n", metric.name));
    prompt.push_str(&format!("Update frequency: {}\n", metric.frequency));
    prompt.push_str(&format!(
        "Task: compare the latest value of this metric with its historical average {}.\n",
        period
    ));

    // Formatting rules
    prompt.push_str("\nFormatting rules:\n");
    prompt.push_str("- Round every number to the nearest integer, except percentages.\n");
    prompt.push_str(
        "- Keep the unit of the metric as a suffix (e.g. \"1,234 users\", \"$5,000\").\n",
    );
    prompt.push_str("- Group thousands with commas (e.g. 12,345).\n");
    prompt.push_str("- Abbreviate large numbers with K, M or B (e.g. 1.2K, 3.4M, 5.6B).\n");
    prompt.push_str(
        "- Write percentages with 2 decimals and an explicit sign (e.g. +12.34%, -5.00%).\n",
    );
    prompt.push_str("- Give absolute changes an explicit sign (e.g. +1,200 or -3.4K).\n");

    // Significance thresholds
    prompt.push_str("\nSignificance, using |absoluteChange| compared with historicalAverage:\n");
    prompt.push_str("- LOW: at most 0.5x the historical average\n");
    prompt.push_str("- MEDIUM: more than 0.5x and at most 1x\n");
    prompt.push_str("- HIGH: more than 1x and at most 2x\n");
    prompt.push_str("- CRITICAL: more than 2x\n");

    if let Some(ref instruction) = metric.instruction {
        let instruction = instruction.trim();
        if !instruction.is_empty() {
            prompt.push_str(&format!("\nAdditional instructions: {}\n", instruction));
        }
    }

    // Response shape
    prompt.push_str("\nRespond with JSON only, in exactly this shape:\n");
    prompt.push_str("{\n");
    prompt.push_str("  \"latestValue\": \"<most recent value>\",\n");
    prompt.push_str("  \"absoluteChange\": \"<latest value minus historical average>\",\n");
    prompt.push_str("  \"percentageChange\": \"<change relative to the historical average>\",\n");
    prompt.push_str("  \"historicalAverage\": \"<average over the historical period>\",\n");
    prompt.push_str("  \"trend\": \"<one sentence describing the trend>\",\n");
    prompt.push_str("  \"analysis\": \"<2-3 sentences explaining the change>\",\n");
    prompt.push_str("  \"significance\": \"LOW | MEDIUM | HIGH | CRITICAL\"\n");
    prompt.push_str("}\n");

    // Data
    prompt.push_str("\nData:\n");
    match data.map(str::trim).filter(|d| !d.is_empty()) {
        Some(data) => prompt.push_str(data),
        None => prompt.push_str(NO_DATA),
    }
    prompt.push('\n');

    prompt
}
