//! Azure DevOps project report source.
//!
//! The base URL is the organization URL, e.g. `https://dev.azure.com/contoso`.
//! Authentication uses a personal access token sent as basic-auth password.
//!
//! The projects listing is offset based (`$top` / `$skip`) and reports no
//! total, so pagination relies on the short-page rule alone.

use async_trait::async_trait;
use reportgate_core::{ColumnKind, MetricMap, MetricValue, ReportLayout, SourceItem};
use serde::{Deserialize, Serialize};

use crate::client::SourceHttp;
use crate::error::SourceError;
use crate::pagination::{Page, PageRequest};
use crate::source::ReportSource;

pub const API_VERSION: &str = "7.1";

/// Upper bound on teams listed per project.
const MAX_TEAMS: u32 = 1000;

pub struct AzureDevOpsSource {
    http: SourceHttp,
    identity: String,
}

impl AzureDevOpsSource {
    #[must_use]
    pub fn new(http: SourceHttp) -> Self {
        let identity = http.base_url().as_str().trim_end_matches('/').to_owned();
        Self { http, identity }
    }
}

#[derive(Debug, Serialize)]
struct ApiVersionParams {
    #[serde(rename = "api-version")]
    api_version: &'static str,
}

impl Default for ApiVersionParams {
    fn default() -> Self {
        Self {
            api_version: API_VERSION,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionData {
    #[serde(default)]
    authenticated_user: Option<Identity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Identity {
    #[serde(default)]
    id: String,
    #[serde(default)]
    provider_display_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProjectsListParams {
    #[serde(rename = "$top")]
    top: u32,
    #[serde(rename = "$skip")]
    skip: u64,
    #[serde(rename = "api-version")]
    api_version: &'static str,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRef {
    id: String,
    name: String,
    #[serde(default)]
    visibility: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProjectDetailParams {
    #[serde(rename = "includeCapabilities")]
    include_capabilities: bool,
    #[serde(rename = "api-version")]
    api_version: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDetail {
    #[serde(default)]
    last_update_time: Option<String>,
    #[serde(default)]
    capabilities: Option<Capabilities>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Capabilities {
    #[serde(default)]
    process_template: Option<ProcessTemplate>,
    #[serde(default)]
    versioncontrol: Option<VersionControl>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessTemplate {
    #[serde(default)]
    template_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionControl {
    #[serde(default)]
    source_control_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct TeamsParams {
    #[serde(rename = "$top")]
    top: u32,
    #[serde(rename = "api-version")]
    api_version: &'static str,
}

#[async_trait]
impl ReportSource for AzureDevOpsSource {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn layout(&self) -> ReportLayout {
        ReportLayout::new("Azure DevOps Projects Report", "Project")
            .column("teams", "Teams", ColumnKind::Numeric)
            .column("process", "Process", ColumnKind::Text)
            .column("source_control", "Source Control", ColumnKind::Text)
            .column("last_update", "Last Updated", ColumnKind::Timestamp)
            .recent_label("Updated")
    }

    async fn probe(&self) -> Result<(), SourceError> {
        let data: ConnectionData = self
            .http
            .get_json("_apis/connectionData", &ApiVersionParams::default())
            .await?;

        match data.authenticated_user {
            Some(user) if !user.id.is_empty() => {
                tracing::debug!(
                    user = user.provider_display_name.as_deref().unwrap_or("unknown"),
                    "Azure DevOps session authenticated"
                );
                Ok(())
            }
            _ => Err(SourceError::Authentication {
                url: self.identity.clone(),
                reason: "connectionData reported no authenticated user".to_owned(),
            }),
        }
    }

    async fn fetch_page(&self, page: PageRequest) -> Result<Page, SourceError> {
        let params = ProjectsListParams {
            top: page.size,
            skip: page.offset(),
            api_version: API_VERSION,
        };
        let response: ListResponse<ProjectRef> =
            self.http.get_json("_apis/projects", &params).await?;

        let items = response
            .value
            .into_iter()
            .map(|p| {
                let restricted = p.visibility.as_deref() == Some("private");
                SourceItem::new(p.id, p.name).restricted(restricted)
            })
            .collect();
        Ok(Page::new(items))
    }

    async fn fetch_detail(&self, item: &SourceItem) -> Result<MetricMap, SourceError> {
        let detail_params = ProjectDetailParams {
            include_capabilities: true,
            api_version: API_VERSION,
        };
        let detail: ProjectDetail = self
            .http
            .get_json(&format!("_apis/projects/{}", item.key), &detail_params)
            .await?;

        let teams_params = TeamsParams {
            top: MAX_TEAMS,
            api_version: API_VERSION,
        };
        let teams: ListResponse<serde_json::Value> = self
            .http
            .get_json(&format!("_apis/projects/{}/teams", item.key), &teams_params)
            .await?;

        let capabilities = detail.capabilities;
        let process = capabilities
            .as_ref()
            .and_then(|c| c.process_template.as_ref())
            .and_then(|p| p.template_name.clone());
        let source_control = capabilities
            .as_ref()
            .and_then(|c| c.versioncontrol.as_ref())
            .and_then(|v| v.source_control_type.clone());

        let mut metrics = MetricMap::new();
        metrics.insert(
            "teams".to_owned(),
            MetricValue::present(teams.value.len().to_string()),
        );
        metrics.insert("process".to_owned(), MetricValue::from_option(process));
        metrics.insert(
            "source_control".to_owned(),
            MetricValue::from_option(source_control),
        );
        metrics.insert(
            "last_update".to_owned(),
            MetricValue::from_option(detail.last_update_time),
        );
        Ok(metrics)
    }
}
