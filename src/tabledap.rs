use anyhow::{Context, Result};
use std::fmt;

use crate::client::{Auth, Client, ClientConfig, Transport};
use crate::dataset::{Dataset, ErddapDataset, ResourceType};
use crate::query::ArgumentList;
use crate::table::{ReadOptions, Table};

/// A tabledap dataset: rows and columns queried with constraints and
/// server-side functions.
///
/// ```no_run
/// use erddap::{ErddapDataset, Tabledap};
///
/// # fn main() -> anyhow::Result<()> {
/// let mut remote = Tabledap::new("https://coastwatch.pfeg.noaa.gov/erddap", "cwwcNDBCMet")?;
/// remote
///     .set_result_variables(["station", "time", "atmp"])
///     .add_constraint("time>=2020-12-24T00:00:00Z")
///     .order_by(["station"]);
/// let table = remote.fetch_table(&Default::default())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Tabledap {
    dataset: Dataset,
}

impl Tabledap {
    /// Creates a handle with a default HTTP client. Metadata is fetched on first use.
    pub fn new(server_url: impl Into<String>, dataset_id: impl Into<String>) -> Result<Self> {
        Ok(Self::with_transport(
            server_url,
            dataset_id,
            Client::new(ClientConfig::default())?,
        ))
    }

    /// Like [`Tabledap::new`], with client settings from the environment / `.erddaprc`.
    pub fn from_env(server_url: impl Into<String>, dataset_id: impl Into<String>) -> Result<Self> {
        Ok(Self::with_transport(server_url, dataset_id, Client::from_env()?))
    }

    /// Creates a handle and fetches its metadata immediately.
    pub fn connect(server_url: impl Into<String>, dataset_id: impl Into<String>) -> Result<Self> {
        Self::new(server_url, dataset_id)?.eager()
    }

    pub fn with_transport(
        server_url: impl Into<String>,
        dataset_id: impl Into<String>,
        transport: impl Transport + 'static,
    ) -> Self {
        Self {
            dataset: Dataset::new(server_url, dataset_id, ResourceType::Tabledap, transport),
        }
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.dataset = self.dataset.with_auth(auth);
        self
    }

    /// Loads metadata now instead of on first access.
    pub fn eager(mut self) -> Result<Self> {
        self.dataset.load_metadata()?;
        Ok(self)
    }

    /// Requests the current query in the default file type and decodes it.
    pub fn fetch_table(&self, options: &ReadOptions) -> Result<Table> {
        let body = self.fetch_data(Self::DEFAULT_FILE_TYPE)?;
        Table::from_csv(&body, options).with_context(|| {
            format!(
                "failed to decode {} response of {}",
                Self::DEFAULT_FILE_TYPE,
                self.dataset.dataset_id()
            )
        })
    }

    // https://coastwatch.pfeg.noaa.gov/erddap/tabledap/documentation.html#addVariablesWhere
    pub fn add_variables_where(&mut self, attribute_name: &str, attribute_value: &str) -> &mut Self {
        self.dataset.query_mut().push_function(format!(
            "addVariablesWhere(\"{}\",\"{}\")",
            attribute_name, attribute_value
        ));
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.dataset.query_mut().push_function("distinct()");
        self
    }

    /// Appends `units(value)`; `value` is inserted verbatim, e.g. `"\"UCUM\""`.
    pub fn units(&mut self, value: &str) -> &mut Self {
        self.dataset
            .query_mut()
            .push_function(format!("units({})", value));
        self
    }

    pub fn order_by<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderBy", variables)
    }

    pub fn order_by_closest<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderByClosest", variables)
    }

    pub fn order_by_count<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderByCount", variables)
    }

    pub fn order_by_limit<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderByLimit", variables)
    }

    pub fn order_by_max<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderByMax", variables)
    }

    pub fn order_by_min<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderByMin", variables)
    }

    pub fn order_by_min_max<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderByMinMax", variables)
    }

    pub fn order_by_mean<A: ArgumentList>(&mut self, variables: A) -> &mut Self {
        self.add_server_side_function("orderByMean", variables)
    }

    /// Appends `name("args")` for functions without a dedicated wrapper.
    pub fn add_server_side_function<A: ArgumentList>(&mut self, name: &str, arguments: A) -> &mut Self {
        self.dataset
            .query_mut()
            .add_server_side_function(name, arguments);
        self
    }
}

impl ErddapDataset for Tabledap {
    const DEFAULT_FILE_TYPE: &'static str = "csvp";

    fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    fn dataset_mut(&mut self) -> &mut Dataset {
        &mut self.dataset
    }
}

impl fmt::Display for Tabledap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ds = &self.dataset;
        writeln!(f, "<erddap::Tabledap>")?;
        if let Some(title) = ds
            .cached_metadata()
            .and_then(|md| md.attribute("title", None))
        {
            writeln!(f, "Title:       {}", title)?;
        }
        writeln!(f, "Server URL:  {}", ds.server_url())?;
        writeln!(f, "Dataset ID:  {}", ds.dataset_id())?;

        match ds.cached_metadata() {
            Some(md) => {
                writeln!(f, "Variables:")?;
                for var in md.variables() {
                    write!(f, "  - {} ({})", var.name, var.data_type)?;
                    if let Some(units) = var.attributes.get("units") {
                        write!(f, " [{}]", units)?;
                    }
                    if let Some(range) = var.attributes.get("actual_range") {
                        write!(f, " range: {}", range)?;
                    }
                    writeln!(f)?;
                }
            }
            None => writeln!(f, "(metadata not loaded)")?,
        }
        Ok(())
    }
}
