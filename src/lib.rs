//! A small Rust client for ERDDAP servers.
//!
//! This crate implements the tabledap side of the ERDDAP API:
//! assemble a query on a dataset handle, turn it into a request URL,
//! fetch the response and decode it into a [`Table`].
//!
//! ## Quick start
//! - Create a [`Tabledap`] handle for a server URL and dataset ID.
//! - Chain result variables, constraints and server-side functions on it.
//! - Call [`Tabledap::fetch_table`], or [`ErddapDataset::data_request_url`] to get the URL only.
//!
//! ```no_run
//! use anyhow::Result;
//! use erddap::{ErddapDataset, ReadOptions, Tabledap};
//!
//! fn main() -> Result<()> {
//!     let mut remote = Tabledap::new("https://coastwatch.pfeg.noaa.gov/erddap", "cwwcNDBCMet")?;
//!     println!("{:?}", remote.attribute("title", None)?);
//!
//!     remote
//!         .set_result_variables(["station", "time", "atmp"])
//!         .add_constraint("time>=2020-12-24T00:00:00Z")
//!         .add_constraint("time<=2020-12-31T01:15:00Z")
//!         .order_by_closest(["station", "time/1day"]);
//!
//!     let table = remote.fetch_table(&ReadOptions::default())?;
//!     println!("{} rows", table.len());
//!     Ok(())
//! }
//! ```
//!
//! Credentials for protected servers can be configured via `ERDDAP_USERNAME` /
//! `ERDDAP_PASSWORD` or a `.erddaprc` file, see [`Client::from_env`].

#![forbid(unsafe_code)]

mod client;
mod config;
mod dataset;
mod error;
mod metadata;
mod query;
mod table;
mod tabledap;
mod time;
mod util;

pub use client::{Auth, Client, ClientConfig, Transport};
pub use dataset::{Dataset, ErddapDataset, ResourceType};
pub use metadata::{AttributeValue, Attributes, GLOBAL, Metadata, Variable};
pub use query::{ArgumentList, Query};
pub use table::{ReadOptions, Table};
pub use tabledap::Tabledap;
pub use time::TimeUnits;
