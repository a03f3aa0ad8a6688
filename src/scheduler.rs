use crate::error::{DigestError, Result};
use crate::orchestrator::Orchestrator;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// Cron recurrence evaluated in a fixed timezone
#[derive(Debug, Clone)]
pub struct Schedule {
    expression: String,
    cron: cron::Schedule,
    timezone: Tz,
}

impl Schedule {
    /// Parse a cron expression and IANA timezone.
    ///
    /// Five-field expressions (minute precision) get a leading seconds field
    /// of `0`; six and seven field expressions are used as written.
    pub fn parse(expression: &str, timezone: &str) -> Result<Self> {
        let expression = normalize_expression(expression);
        let cron = cron::Schedule::from_str(&expression).map_err(|e| {
            DigestError::schedule(format!("invalid cron expression '{}': {}", expression, e))
        })?;

        Ok(Self {
            expression,
            cron,
            timezone: parse_timezone(timezone)?,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// First occurrence strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local_now = now.with_timezone(&self.timezone);
        self.cron
            .after(&local_now)
            .next()
            .map(|next| next.with_timezone(&Utc))
    }
}

pub fn parse_timezone(timezone: &str) -> Result<Tz> {
    Tz::from_str(timezone.trim())
        .map_err(|e| DigestError::schedule(format!("invalid timezone '{}': {}", timezone, e)))
}

fn normalize_expression(expression: &str) -> String {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

/// Run once immediately, then at every occurrence of `schedule`.
///
/// Runs are not guarded against overlap; the schedule interval is expected
/// to be far longer than a run. Returns only when the schedule has no
/// further occurrences, or on the first failed run when `fail_fast` is set.
pub async fn run_scheduled(
    orchestrator: &Orchestrator,
    schedule: &Schedule,
    fail_fast: bool,
) -> Result<()> {
    run_scheduled_with(orchestrator, schedule, fail_fast, Utc::now).await
}

async fn run_scheduled_with<C>(
    orchestrator: &Orchestrator,
    schedule: &Schedule,
    fail_fast: bool,
    clock: C,
) -> Result<()>
where
    C: Fn() -> DateTime<Utc>,
{
    tracing::info!(
        cron = schedule.expression(),
        timezone = %schedule.timezone(),
        "Schedule configured, running initial digest"
    );

    run_logged(orchestrator, fail_fast).await?;

    loop {
        let now = clock();
        let Some(next) = schedule.next_after(now) else {
            tracing::warn!(
                cron = schedule.expression(),
                "Schedule has no further occurrences, stopping"
            );
            return Ok(());
        };

        tracing::info!(
            next_run = %next.with_timezone(&schedule.timezone()),
            "Waiting for next scheduled run"
        );

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        run_logged(orchestrator, fail_fast).await?;
    }
}

async fn run_logged(orchestrator: &Orchestrator, fail_fast: bool) -> Result<()> {
    match orchestrator.run_once().await {
        Ok(_) => Ok(()),
        Err(e) if fail_fast => Err(e),
        Err(e) => {
            tracing::error!(error = %e, "Digest run failed, waiting for next scheduled run");
            Ok(())
        }
    }
}
