use crate::ai::gemini::GeminiClient;
use crate::ai::prompt::{generate_analysis_prompt, SYSTEM_INSTRUCTION};
use crate::ai::response::parse_analysis_response;
use crate::ai::{AiModel, GenerationRequest};
use crate::analysis::{MetricAnalysis, MetricFailure, MetricOutcome};
use crate::config::{Config, MetricDescriptor, ModelConfig};
use crate::error::Result;
use crate::slack::digest::render_digest;
use crate::slack::webhook::SlackWebhook;
use crate::slack::MessageSink;
use crate::source::dune::DuneClient;
use crate::source::DataSource;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// Runs fetch, prompt, model call and parse for a single metric
pub struct MetricProcessor {
    source: Arc<dyn DataSource>,
    model: Arc<dyn AiModel>,
    model_config: ModelConfig,
}

impl MetricProcessor {
    pub fn new(
        source: Arc<dyn DataSource>,
        model: Arc<dyn AiModel>,
        model_config: ModelConfig,
    ) -> Self {
        Self {
            source,
            model,
            model_config,
        }
    }

    /// Fetch the metric's data and build its prompt; returns the period
    /// phrase and the prompt
    pub async fn prepare(
        &self,
        metric: &MetricDescriptor,
        today: NaiveDate,
    ) -> Result<(String, String)> {
        let period = metric.period.describe(today);

        let data = self.source.fetch(metric.query_id, metric.limit).await?;
        if data.is_none() {
            tracing::warn!(
                metric = %metric.name,
                query_id = metric.query_id,
                "No data returned, analyzing without data"
            );
        }

        let prompt = generate_analysis_prompt(metric, data.as_deref(), &period);
        Ok((period, prompt))
    }

    /// Process one metric. Errors from the data source or the model are
    /// returned; unusable model output becomes a failure outcome.
    pub async fn process(
        &self,
        metric: &MetricDescriptor,
        today: NaiveDate,
    ) -> Result<MetricOutcome> {
        let (period, prompt) = self.prepare(metric, today).await?;

        let request = GenerationRequest {
            model: self.model_config.name.clone(),
            prompt,
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            temperature: self.model_config.temperature,
            max_output_tokens: self.model_config.max_output_tokens,
        };
        let raw = self.model.generate(&request).await?;

        match parse_analysis_response(raw.as_deref()) {
            Ok(payload) => {
                let analysis = MetricAnalysis::from_payload(metric, &period, payload);
                tracing::info!(
                    metric = %metric.name,
                    significance = %analysis.significance,
                    "Metric analyzed"
                );
                Ok(MetricOutcome::Analyzed(analysis))
            }
            Err(e) => {
                tracing::warn!(
                    metric = %metric.name,
                    error = %e.error,
                    reason = e.reason.as_deref().unwrap_or(""),
                    "Model response unusable"
                );
                Ok(MetricOutcome::Failed(MetricFailure::from_response_error(metric, e)))
            }
        }
    }
}

/// Result of one digest run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcomes: Vec<MetricOutcome>,
    pub delivered: bool,
}

/// Orchestrator for coordinating digest runs
pub struct Orchestrator {
    metrics: Vec<MetricDescriptor>,
    processor: Arc<MetricProcessor>,
    sink: Arc<dyn MessageSink>,
}

impl Orchestrator {
    /// Create an orchestrator with HTTP clients built from `config`
    pub fn new(config: &Config) -> Result<Self> {
        let mut dune = DuneClient::new(config.dune_api_key.clone())?;
        if let Some(ref base_url) = config.endpoints.dune {
            dune = dune.with_base_url(base_url.clone());
        }

        let mut gemini = GeminiClient::new(config.gemini_api_key.clone())?;
        if let Some(ref base_url) = config.endpoints.gemini {
            gemini = gemini.with_base_url(base_url.clone());
        }

        let slack = SlackWebhook::new(config.slack_webhook_url.clone())?;

        Ok(Self::with_collaborators(
            config.metrics.clone(),
            Arc::new(dune),
            Arc::new(gemini),
            Arc::new(slack),
            config.model.clone(),
        ))
    }

    pub fn with_collaborators(
        metrics: Vec<MetricDescriptor>,
        source: Arc<dyn DataSource>,
        model: Arc<dyn AiModel>,
        sink: Arc<dyn MessageSink>,
        model_config: ModelConfig,
    ) -> Self {
        Self {
            metrics,
            processor: Arc::new(MetricProcessor::new(source, model, model_config)),
            sink,
        }
    }

    /// Process every metric concurrently and return outcomes in
    /// configuration order. A failing or panicking metric yields a failure
    /// outcome and never affects the others.
    pub async fn analyze_all(&self, today: NaiveDate) -> Vec<MetricOutcome> {
        let handles: Vec<_> = self
            .metrics
            .iter()
            .cloned()
            .map(|metric| {
                let processor = Arc::clone(&self.processor);
                let task_metric = metric.clone();
                let handle =
                    tokio::spawn(async move { processor.process(&task_metric, today).await });
                (metric, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (metric, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    tracing::error!(metric = %metric.name, error = %e, "Metric processing failed");
                    MetricOutcome::Failed(MetricFailure::processing(&metric, e))
                }
                Err(e) => {
                    tracing::error!(metric = %metric.name, error = %e, "Metric task aborted");
                    MetricOutcome::Failed(MetricFailure::processing(&metric, e))
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Run one digest: analyze all metrics and deliver the result.
    ///
    /// Delivery errors are returned; nothing is sent when the digest has no
    /// content.
    pub async fn run_once(&self) -> Result<RunReport> {
        let today = Utc::now().date_naive();
        tracing::info!(metrics = self.metrics.len(), %today, "Starting digest run");

        let outcomes = self.analyze_all(today).await;
        let digest = render_digest(&outcomes, today);

        if digest.is_empty() {
            tracing::info!("Digest is empty, nothing to send");
            return Ok(RunReport {
                outcomes,
                delivered: false,
            });
        }

        self.sink.send(&digest).await?;

        let failed = outcomes.iter().filter(|o| o.is_failure()).count();
        tracing::info!(analyzed = outcomes.len() - failed, failed, "Digest run complete");

        Ok(RunReport {
            outcomes,
            delivered: true,
        })
    }

    /// Fetch data and build prompts without calling the model or Slack
    pub async fn preview_prompts(&self, today: NaiveDate) -> Vec<(String, Result<String>)> {
        let mut prompts = Vec::with_capacity(self.metrics.len());
        for metric in &self.metrics {
            let prompt = self
                .processor
                .prepare(metric, today)
                .await
                .map(|(_, prompt)| prompt);
            prompts.push((metric.name.clone(), prompt));
        }
        prompts
    }
}
