use anyhow::{Context, Result, anyhow};
use std::fmt;

use crate::client::{Auth, Transport};
use crate::metadata::{AttributeValue, Metadata, Variable};
use crate::query::Query;
use crate::util::urljoin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Tabledap,
    Griddap,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Tabledap => "tabledap",
            ResourceType::Griddap => "griddap",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One remote dataset: its identity, the query being assembled for it and
/// its metadata once fetched.
#[derive(Debug)]
pub struct Dataset {
    server_url: String,
    dataset_id: String,
    resource_type: ResourceType,
    auth: Option<Auth>,
    query: Query,
    metadata: Option<Metadata>,
    transport: Box<dyn Transport>,
}

impl Dataset {
    pub fn new(
        server_url: impl Into<String>,
        dataset_id: impl Into<String>,
        resource_type: ResourceType,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            dataset_id: dataset_id.into(),
            resource_type,
            auth: None,
            query: Query::new(),
            metadata: None,
            transport: Box::new(transport),
        }
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// `{server}/{resourceType}/{datasetID}.{fileType}`
    pub fn base_url(&self, file_type: &str) -> String {
        urljoin(
            &self.server_url,
            &format!("{}/{}.{}", self.resource_type, self.dataset_id, file_type),
        )
    }

    /// `{server}/info/{datasetID}/index.{fileType}`
    pub fn metadata_url(&self, file_type: &str) -> String {
        urljoin(
            &self.server_url,
            &format!("info/{}/index.{}", self.dataset_id, file_type),
        )
    }

    pub fn data_request_url(&self, file_type: &str, escape: bool) -> String {
        let base = self.base_url(file_type);
        let query = self.query.to_query_string(escape);
        if query.is_empty() {
            base
        } else {
            format!("{}?{}", base, query)
        }
    }

    /// Issues one GET with this dataset's credentials.
    pub fn fetch(&self, url: &str) -> Result<String> {
        self.transport.get_text(url, self.auth.as_ref())
    }

    /// Fetches metadata from the server, replacing anything cached.
    pub fn load_metadata(&mut self) -> Result<&Metadata> {
        let url = self.metadata_url("json");
        let text = self
            .fetch(&url)
            .with_context(|| format!("failed to fetch metadata of {}", self.dataset_id))?;
        let metadata = Metadata::from_info_json(&text)
            .with_context(|| format!("invalid metadata document from {}", url))?;

        log::info!(
            "loaded metadata of {} ({} variables)",
            self.dataset_id,
            metadata.variables().len()
        );
        Ok(self.metadata.insert(metadata))
    }

    /// Cached metadata, fetched on first use.
    pub fn metadata(&mut self) -> Result<&Metadata> {
        if self.metadata.is_none() {
            self.load_metadata()?;
        }
        self.metadata
            .as_ref()
            .ok_or_else(|| anyhow!("metadata of {} is not loaded", self.dataset_id))
    }

    pub fn cached_metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn invalidate_metadata(&mut self) {
        self.metadata = None;
    }
}

/// Behaviour shared by every ERDDAP resource type.
///
/// Builder methods mutate the query in place and return the handle so calls
/// can be chained.
pub trait ErddapDataset {
    /// File type requested when the caller does not name one.
    const DEFAULT_FILE_TYPE: &'static str;

    fn dataset(&self) -> &Dataset;

    fn dataset_mut(&mut self) -> &mut Dataset;

    /// Replaces the result variables. Empty means all variables.
    fn set_result_variables<I, S>(&mut self, variables: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dataset_mut().query_mut().set_result_variables(variables);
        self
    }

    /// Appends a constraint (e.g. `time>=2020-12-24T00:00:00Z`) verbatim.
    fn add_constraint(&mut self, constraint: impl Into<String>) -> &mut Self {
        self.dataset_mut().query_mut().add_constraint(constraint);
        self
    }

    fn clear_query(&mut self) -> &mut Self {
        self.dataset_mut().query_mut().clear();
        self
    }

    fn base_url(&self, file_type: &str) -> String {
        self.dataset().base_url(file_type)
    }

    fn metadata_url(&self, file_type: &str) -> String {
        self.dataset().metadata_url(file_type)
    }

    /// Escaped request URL for the default file type.
    fn data_request_url(&self) -> String {
        self.dataset().data_request_url(Self::DEFAULT_FILE_TYPE, true)
    }

    fn data_request_url_with(&self, file_type: &str, escape: bool) -> String {
        self.dataset().data_request_url(file_type, escape)
    }

    /// Requests the current query as `file_type` and returns the body.
    fn fetch_data(&self, file_type: &str) -> Result<String> {
        let url = self.data_request_url_with(file_type, true);
        self.dataset()
            .fetch(&url)
            .with_context(|| format!("failed to fetch data of {}", self.dataset().dataset_id()))
    }

    fn load_metadata(&mut self) -> Result<&Metadata> {
        self.dataset_mut().load_metadata()
    }

    fn metadata(&mut self) -> Result<&Metadata> {
        self.dataset_mut().metadata()
    }

    /// Global attribute `name`, or the attribute of `variable` when given.
    fn attribute(&mut self, name: &str, variable: Option<&str>) -> Result<Option<&AttributeValue>> {
        Ok(self.metadata()?.attribute(name, variable))
    }

    fn variables(&mut self) -> Result<&[Variable]> {
        Ok(self.metadata()?.variables())
    }
}
