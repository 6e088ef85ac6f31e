//! SonarQube project report source.
//!
//! ## Endpoints
//!
//! | Purpose | Request | Shape used |
//! |---|---|---|
//! | probe | `GET /api/authentication/validate` | `{"valid": bool}` |
//! | listing | `GET /api/projects/search?p=&ps=` | `paging.total`, `components[]` |
//! | measures | `GET /api/measures/component?component=&metricKeys=` | `component.measures[]` |
//! | last analysis | `GET /api/project_analyses/search?project=&ps=1` | `analyses[0].date` |
//!
//! `projects/search` needs the "Administer" permission. A project that was
//! never analysed has no measures and an empty `analyses` list; both surface as
//! absent metrics, not failures.

use async_trait::async_trait;
use reportgate_core::{ColumnKind, MetricMap, MetricValue, ReportLayout, SourceItem};
use serde::{Deserialize, Serialize};

use crate::client::{SourceHttp, NO_QUERY};
use crate::error::SourceError;
use crate::pagination::{Page, PageRequest};
use crate::source::ReportSource;

/// Measures requested per project, in column order.
pub const MEASURE_KEYS: [&str; 5] = ["ncloc", "bugs", "vulnerabilities", "code_smells", "coverage"];

/// Column key holding the most recent analysis date.
pub const LAST_ANALYSIS: &str = "last_analysis";

pub struct SonarQubeSource {
    http: SourceHttp,
    identity: String,
}

impl SonarQubeSource {
    #[must_use]
    pub fn new(http: SourceHttp) -> Self {
        let identity = http.base_url().as_str().trim_end_matches('/').to_owned();
        Self { http, identity }
    }
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    valid: bool,
}

#[derive(Debug, Serialize)]
struct ProjectSearchParams {
    p: u32,
    ps: u32,
}

#[derive(Debug, Deserialize)]
struct ProjectSearchResponse {
    paging: Paging,
    components: Vec<Component>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    total: u64,
}

#[derive(Debug, Deserialize)]
struct Component {
    key: String,
    name: String,
    #[serde(default)]
    visibility: Option<String>,
}

#[derive(Debug, Serialize)]
struct MeasuresParams<'a> {
    component: &'a str,
    #[serde(rename = "metricKeys")]
    metric_keys: String,
}

#[derive(Debug, Deserialize)]
struct MeasuresResponse {
    component: MeasuredComponent,
}

#[derive(Debug, Deserialize)]
struct MeasuredComponent {
    #[serde(default)]
    measures: Vec<Measure>,
}

#[derive(Debug, Deserialize)]
struct Measure {
    metric: String,
    /// Absent for measures that only carry a leak-period value.
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalysesParams<'a> {
    project: &'a str,
    ps: u32,
}

#[derive(Debug, Deserialize)]
struct AnalysesResponse {
    #[serde(default)]
    analyses: Vec<Analysis>,
}

#[derive(Debug, Deserialize)]
struct Analysis {
    date: String,
}

#[async_trait]
impl ReportSource for SonarQubeSource {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn layout(&self) -> ReportLayout {
        ReportLayout::new("SonarQube Projects Report", "Project")
            .column("ncloc", "Lines of Code", ColumnKind::Numeric)
            .column("bugs", "Bugs", ColumnKind::Numeric)
            .column("vulnerabilities", "Vulnerabilities", ColumnKind::Numeric)
            .column("code_smells", "Code Smells", ColumnKind::Numeric)
            .column("coverage", "Coverage (%)", ColumnKind::Text)
            .column(LAST_ANALYSIS, "Last Analysis", ColumnKind::Timestamp)
            .recent_label("Analysed")
    }

    async fn probe(&self) -> Result<(), SourceError> {
        let response: ValidateResponse = self
            .http
            .get_json("api/authentication/validate", NO_QUERY)
            .await?;
        if response.valid {
            Ok(())
        } else {
            Err(SourceError::Authentication {
                url: self.identity.clone(),
                reason: "token was not accepted (validate returned false)".to_owned(),
            })
        }
    }

    async fn fetch_page(&self, page: PageRequest) -> Result<Page, SourceError> {
        let params = ProjectSearchParams {
            p: page.number,
            ps: page.size,
        };
        let response: ProjectSearchResponse =
            self.http.get_json("api/projects/search", &params).await?;

        let items = response
            .components
            .into_iter()
            .map(|c| {
                let restricted = c.visibility.as_deref() == Some("private");
                SourceItem::new(c.key, c.name).restricted(restricted)
            })
            .collect();
        Ok(Page::with_total(items, response.paging.total))
    }

    async fn fetch_detail(&self, item: &SourceItem) -> Result<MetricMap, SourceError> {
        let params = MeasuresParams {
            component: &item.key,
            metric_keys: MEASURE_KEYS.join(","),
        };
        let measures: MeasuresResponse = self
            .http
            .get_json("api/measures/component", &params)
            .await?;

        let mut metrics = MetricMap::new();
        for measure in measures.component.measures {
            if MEASURE_KEYS.contains(&measure.metric.as_str()) {
                metrics.insert(measure.metric, MetricValue::from_option(measure.value));
            }
        }

        let params = AnalysesParams {
            project: &item.key,
            ps: 1,
        };
        let analyses: AnalysesResponse = self
            .http
            .get_json("api/project_analyses/search", &params)
            .await?;
        let last = analyses.analyses.into_iter().next().map(|a| a.date);
        metrics.insert(LAST_ANALYSIS.to_owned(), MetricValue::from_option(last));

        Ok(metrics)
    }
}
