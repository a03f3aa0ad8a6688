use crate::analysis::{MetricAnalysis, MetricFailure, MetricOutcome};
use crate::slack::blocks::{escape, truncate, Block, MAX_BLOCKS, MAX_SECTION_TEXT};
use chrono::NaiveDate;

/// A rendered digest message
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    /// Notification text shown where blocks cannot be rendered
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

impl Digest {
    /// True when the message would only contain layout blocks
    pub fn is_empty(&self) -> bool {
        !self.blocks.iter().any(Block::has_content)
    }
}

/// Render outcomes, in the order given, into a digest message
pub fn render_digest(outcomes: &[MetricOutcome], date: NaiveDate) -> Digest {
    let failed = outcomes.iter().filter(|o| o.is_failure()).count();
    let analyzed = outcomes.len() - failed;

    let mut blocks = header_blocks(date, analyzed, failed);
    for outcome in outcomes {
        match outcome {
            MetricOutcome::Analyzed(analysis) => push_analysis(&mut blocks, analysis),
            MetricOutcome::Failed(failure) => push_failure(&mut blocks, failure),
        }
    }

    if blocks.len() > MAX_BLOCKS {
        tracing::warn!(
            blocks = blocks.len(),
            metrics = outcomes.len(),
            "Detailed digest exceeds Slack block limit, using compact layout"
        );
        blocks = header_blocks(date, analyzed, failed);
        blocks.extend(compact_sections(outcomes));
    }

    if blocks.len() > MAX_BLOCKS {
        let omitted = blocks.len() - (MAX_BLOCKS - 1);
        tracing::error!(
            blocks = blocks.len(),
            omitted,
            "Compact digest still exceeds Slack block limit"
        );
        blocks.truncate(MAX_BLOCKS - 1);
        blocks.push(Block::context(&format!(
            "{} more sections omitted (Slack allows {} blocks per message)",
            omitted, MAX_BLOCKS
        )));
    }

    Digest {
        fallback_text: format!(
            "Metrics digest for {}: {} analyzed, {} failed",
            date.format("%Y-%m-%d"),
            analyzed,
            failed
        ),
        blocks,
    }
}

fn header_blocks(date: NaiveDate, analyzed: usize, failed: usize) -> Vec<Block> {
    vec![
        Block::header(&format!("Metrics digest · {}", date.format("%Y-%m-%d"))),
        Block::context(&format!("{} analyzed · {} failed", analyzed, failed)),
        Block::Divider,
    ]
}

/// One line per outcome, packed into as few sections as the text limit allows
fn compact_sections(outcomes: &[MetricOutcome]) -> Vec<Block> {
    let mut sections = Vec::new();
    let mut current = String::new();

    for outcome in outcomes {
        let line = truncate(&compact_line(outcome), MAX_SECTION_TEXT);
        let len = current.chars().count() + 1 + line.chars().count();
        if !current.is_empty() && len > MAX_SECTION_TEXT {
            sections.push(Block::section(&current));
            current.clear();
        }
        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(&line);
    }

    if !current.is_empty() {
        sections.push(Block::section(&current));
    }
    sections
}

fn compact_line(outcome: &MetricOutcome) -> String {
    match outcome {
        MetricOutcome::Analyzed(analysis) => format!(
            "{} *{}*  `{}`  {}",
            analysis.significance.emoji(),
            link(&analysis.url, &analysis.metric),
            analysis.significance,
            change_text(analysis)
        ),
        MetricOutcome::Failed(failure) => format!(
            ":warning: *{}*: analysis unavailable ({})",
            link(&failure.url, &failure.metric),
            escape(failure.reason.as_deref().unwrap_or(&failure.error))
        ),
    }
}

fn change_text(analysis: &MetricAnalysis) -> String {
    if analysis.percentage_change.is_empty() {
        escape(&analysis.absolute_change)
    } else {
        format!(
            "{} ({})",
            escape(&analysis.absolute_change),
            escape(&analysis.percentage_change)
        )
    }
}

fn push_analysis(blocks: &mut Vec<Block>, analysis: &MetricAnalysis) {
    blocks.push(Block::section(&format!(
        "{} *{}*  `{}`",
        analysis.significance.emoji(),
        link(&analysis.url, &analysis.metric),
        analysis.significance
    )));

    blocks.push(Block::fields([
        format!("*Latest*\n{}", escape(&analysis.latest_value)),
        format!("*Change*\n{}", change_text(analysis)),
        format!("*Historical average*\n{}", escape(&analysis.historical_average)),
        format!("*Period*\n{}", escape(&analysis.period)),
    ]));

    if !analysis.analysis.trim().is_empty() {
        blocks.push(Block::section(&escape(analysis.analysis.trim())));
    }

    let mut context = format!("Frequency: {}", escape(&analysis.frequency));
    if !analysis.trend.trim().is_empty() {
        context.push_str(&format!(" · Trend: {}", escape(analysis.trend.trim())));
    }
    blocks.push(Block::context(&context));
    blocks.push(Block::Divider);
}

fn push_failure(blocks: &mut Vec<Block>, failure: &MetricFailure) {
    blocks.push(Block::section(&format!(
        ":warning: *{}*: analysis unavailable ({})",
        link(&failure.url, &failure.metric),
        escape(&failure.error)
    )));
    if let Some(ref reason) = failure.reason {
        blocks.push(Block::context(&escape(reason)));
    }
    blocks.push(Block::Divider);
}

fn link(url: &str, label: &str) -> String {
    if url.is_empty() {
        escape(label)
    } else {
        format!("<{}|{}>", url, escape(label))
    }
}
