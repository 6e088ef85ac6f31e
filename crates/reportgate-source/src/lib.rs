pub mod azure_devops;
pub mod client;
pub mod credential;
pub mod error;
pub mod pagination;
pub mod sonarqube;
pub mod source;

pub use azure_devops::AzureDevOpsSource;
pub use client::SourceHttp;
pub use credential::Credential;
pub use error::{SourceError, SourceErrorKind};
pub use pagination::{fetch_collection, Page, PageRequest, Pagination};
pub use sonarqube::SonarQubeSource;
pub use source::ReportSource;
