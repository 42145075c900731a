use std::sync::Arc;

use serde::Serialize;
use tablechat_core::config::AppConfig;
use tablechat_core::{
    render_tsv, ApplicationError, ColumnLayout, FilterOutcome, Intent, IntentClassifier, Query,
    RangeSpec, RowFilter, Table, TableProfile,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::llm::{client_from_config, LlmClient, LlmError};
use crate::prompts::{
    final_answer_prompt, text_to_query_prompt, ANSWER_TEMPERATURE, DESCRIPTION_TEMPERATURE,
};
use crate::source::{CsvWorkbook, TableSource};

/// What a question produced. Errors from the source or the model are not
/// answers; they come back as [`ApplicationError`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Answer {
    /// The sheet returned no rows at all.
    NoData { correlation_id: String },
    /// Only the header survived the filter; the model is not asked again.
    NoMatch { correlation_id: String, description: String, intent: Intent },
    Answered {
        correlation_id: String,
        description: String,
        intent: Intent,
        outcome: FilterOutcome,
        data: String,
        text: String,
    },
}

impl Answer {
    pub fn correlation_id(&self) -> &str {
        match self {
            Self::NoData { correlation_id }
            | Self::NoMatch { correlation_id, .. }
            | Self::Answered { correlation_id, .. } => correlation_id,
        }
    }

    /// The line shown to the person who asked.
    pub fn message(&self) -> &str {
        match self {
            Self::NoData { .. } => "I couldn't find any data in the sheet.",
            Self::NoMatch { .. } => "I couldn't find any data for that query.",
            Self::Answered { text, .. } => text,
        }
    }
}

/// Classification and filtering without the model, for `classify` and tests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub intent: Intent,
    pub outcome: FilterOutcome,
    pub rows: Table,
}

pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    source: Arc<dyn TableSource>,
    classifier: IntentClassifier,
    filter: RowFilter,
    range: RangeSpec,
}

impl AgentRuntime {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        source: Arc<dyn TableSource>,
        classifier: IntentClassifier,
        range: RangeSpec,
    ) -> Self {
        Self { llm, source, classifier, filter: RowFilter::new(ColumnLayout::default()), range }
    }

    /// Wires the configured model client and a CSV workbook rooted at the
    /// configured data directory.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApplicationError> {
        let range = config.sheet.query_range()?;
        let llm = client_from_config(&config.llm)
            .map_err(|error| ApplicationError::Configuration(format!("{error:#}")))?;
        let source = CsvWorkbook::new(config.sheet.data_dir.clone());
        let classifier = IntentClassifier::new(config.query.classifier_config());

        Ok(Self::new(Arc::from(llm), Arc::new(source), classifier, range))
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn range(&self) -> &RangeSpec {
        &self.range
    }

    pub fn source(&self) -> &Arc<dyn TableSource> {
        &self.source
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub async fn ask(&self, question: &str) -> Result<Answer, ApplicationError> {
        self.ask_with_correlation(question, &Uuid::new_v4().to_string()).await
    }

    pub async fn ask_with_correlation(
        &self,
        question: &str,
        correlation_id: &str,
    ) -> Result<Answer, ApplicationError> {
        info!(
            event_name = "query.received",
            correlation_id,
            question_chars = question.chars().count(),
            "question received"
        );

        let table = self.source.fetch(&self.range).await?;
        if table.is_empty() {
            info!(event_name = "query.filtered", correlation_id, outcome = "no_data", "sheet is empty");
            return Ok(Answer::NoData { correlation_id: correlation_id.to_string() });
        }

        let schema = self.schema_for(&table);
        let prompt = text_to_query_prompt(&schema, question).map_err(prompt_error)?;
        let description = self
            .llm
            .complete(&prompt, DESCRIPTION_TEMPERATURE)
            .await
            .map_err(|error| model_error(error, correlation_id))?
            .trim()
            .to_string();
        info!(
            event_name = "query.described",
            correlation_id,
            description_chars = description.chars().count(),
            "query description received"
        );

        let classification = self.classify_table(&table, question, &description);
        info!(
            event_name = "query.classified",
            correlation_id,
            intent = classification.intent.kind().label(),
            filter = %classification.intent.summary(),
            "question classified"
        );
        info!(
            event_name = "query.filtered",
            correlation_id,
            outcome = ?classification.outcome,
            "rows filtered"
        );

        let Classification { intent, outcome, rows } = classification;
        if !matches!(outcome, FilterOutcome::Matched(_)) {
            return Ok(Answer::NoMatch {
                correlation_id: correlation_id.to_string(),
                description,
                intent,
            });
        }

        let data = render_tsv(&rows);
        let prompt = final_answer_prompt(question, &data).map_err(prompt_error)?;
        let text = self
            .llm
            .complete(&prompt, ANSWER_TEMPERATURE)
            .await
            .map_err(|error| model_error(error, correlation_id))?
            .trim()
            .to_string();
        info!(
            event_name = "query.answered",
            correlation_id,
            rows = rows.data_row_count(),
            "answer generated"
        );

        Ok(Answer::Answered {
            correlation_id: correlation_id.to_string(),
            description,
            intent,
            outcome,
            data,
            text,
        })
    }

    /// The schema block the model is shown, computed from the sheet as it is
    /// now.
    pub async fn schema(&self) -> Result<String, ApplicationError> {
        let table = self.source.fetch(&self.range).await?;
        Ok(self.schema_for(&table))
    }

    fn schema_for(&self, table: &Table) -> String {
        TableProfile::from_table(table, self.filter.layout()).schema_description(&self.range.sheet)
    }

    /// Fetches the configured range and runs classification and filtering
    /// with a caller-supplied description.
    pub async fn classify_only(
        &self,
        question: &str,
        description: &str,
    ) -> Result<Classification, ApplicationError> {
        let table = self.source.fetch(&self.range).await?;
        Ok(self.classify_table(&table, question, description))
    }

    fn classify_table(&self, table: &Table, question: &str, description: &str) -> Classification {
        let intent = self.classifier.classify(&Query::new(question, description));
        let rows = self.filter.apply(table, &intent);
        let outcome = FilterOutcome::of(&rows);
        Classification { intent, outcome, rows }
    }
}

fn prompt_error(error: tera::Error) -> ApplicationError {
    ApplicationError::Configuration(format!("failed to render prompt: {error}"))
}

fn model_error(error: anyhow::Error, correlation_id: &str) -> ApplicationError {
    warn!(
        event_name = "query.model.failed",
        correlation_id,
        error = %format!("{error:#}"),
        "language model call failed"
    );
    match error.downcast_ref::<LlmError>() {
        Some(LlmError::Unauthorized(_)) => ApplicationError::Authentication(format!("{error:#}")),
        _ => ApplicationError::Model(format!("{error:#}")),
    }
}
