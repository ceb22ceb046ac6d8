use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::time::TimeUnits;

/// Pseudo-variable under which ERDDAP lists dataset level attributes.
pub const GLOBAL: &str = "NC_GLOBAL";

const TIME_AXIS_ATTRIBUTE: &str = "_CoordinateAxisType";
const ACTUAL_RANGE: &str = "actual_range";
const UNITS: &str = "units";

pub type Attributes = BTreeMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Numbers(Vec<f64>),
    /// `actual_range` of a time axis after conversion from its numeric encoding.
    TimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            AttributeValue::Numbers(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            AttributeValue::TimeRange { start, end } => Some((*start, *end)),
            _ => None,
        }
    }

    fn parse(data_type: &str, raw: &str) -> Self {
        match data_type {
            "byte" | "ubyte" | "short" | "ushort" | "int" | "uint" | "long" | "ulong" => {
                match split_list::<i64>(raw) {
                    Some(v) if v.len() == 1 => AttributeValue::Integer(v[0]),
                    Some(v) => AttributeValue::Numbers(v.into_iter().map(|i| i as f64).collect()),
                    // ulong values above i64::MAX
                    None => Self::parse_floats(data_type, raw),
                }
            }
            "float" | "double" => Self::parse_floats(data_type, raw),
            _ => AttributeValue::Text(raw.to_string()),
        }
    }

    fn parse_floats(data_type: &str, raw: &str) -> Self {
        match split_list::<f64>(raw) {
            Some(v) if v.len() == 1 => AttributeValue::Number(v[0]),
            Some(v) => AttributeValue::Numbers(v),
            None => {
                log::warn!("unparseable {} attribute value {:?}, kept as text", data_type, raw);
                AttributeValue::Text(raw.to_string())
            }
        }
    }
}

fn split_list<T: std::str::FromStr>(raw: &str) -> Option<Vec<T>> {
    if raw.trim().is_empty() {
        return None;
    }
    raw.split(',').map(|s| s.trim().parse::<T>().ok()).collect()
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Text(s) => f.write_str(s),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Numbers(v) => {
                let parts: Vec<String> = v.iter().map(|n| n.to_string()).collect();
                f.write_str(&parts.join(", "))
            }
            AttributeValue::TimeRange { start, end } => write!(
                f,
                "{}, {}",
                start.format("%Y-%m-%dT%H:%M:%SZ"),
                end.format("%Y-%m-%dT%H:%M:%SZ")
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub data_type: String,
    pub attributes: Attributes,
}

impl Variable {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: String::new(),
            attributes: Attributes::new(),
        }
    }

    pub fn is_time_axis(&self) -> bool {
        self.attributes
            .get(TIME_AXIS_ATTRIBUTE)
            .and_then(AttributeValue::as_str)
            == Some("Time")
    }

    /// Time encoding of this variable, when its `units` attribute is one.
    pub fn time_units(&self) -> Option<TimeUnits> {
        self.attributes
            .get(UNITS)
            .and_then(AttributeValue::as_str)
            .and_then(|u| TimeUnits::parse(u).ok())
    }
}

/// Global and per-variable attributes of a dataset, in server order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    global: Attributes,
    variables: Vec<Variable>,
}

#[derive(Debug, serde::Deserialize)]
struct InfoDocument {
    table: InfoTable,
}

#[derive(Debug, serde::Deserialize)]
struct InfoTable {
    #[serde(rename = "columnNames")]
    column_names: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl InfoTable {
    fn column(&self, name: &str) -> Result<usize> {
        self.column_names
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| anyhow!("metadata table has no {:?} column", name))
    }
}

fn cell(row: &[Value], idx: usize) -> &str {
    row.get(idx).and_then(Value::as_str).unwrap_or("")
}

impl Metadata {
    /// Parses the body of `info/{datasetID}/index.json` and recasts time axes.
    pub fn from_info_json(text: &str) -> Result<Self> {
        let doc: InfoDocument =
            serde_json::from_str(text).context("failed to parse ERDDAP metadata JSON")?;
        let table = doc.table;

        let row_type = table.column("Row Type")?;
        let var_name = table.column("Variable Name")?;
        let attr_name = table.column("Attribute Name")?;
        let data_type = table.column("Data Type")?;
        let value = table.column("Value")?;

        let mut metadata = Metadata::default();
        for row in &table.rows {
            let name = cell(row, var_name);
            match cell(row, row_type) {
                "variable" => {
                    metadata.variable_entry(name).data_type = cell(row, data_type).to_string();
                }
                "attribute" => {
                    let attr = AttributeValue::parse(cell(row, data_type), cell(row, value));
                    let target = if name == GLOBAL {
                        &mut metadata.global
                    } else {
                        &mut metadata.variable_entry(name).attributes
                    };
                    target.insert(cell(row, attr_name).to_string(), attr);
                }
                // "dimension" rows only appear for griddap.
                _ => {}
            }
        }

        metadata.cast_time_variables();
        Ok(metadata)
    }

    fn variable_entry(&mut self, name: &str) -> &mut Variable {
        let idx = match self.variables.iter().position(|v| v.name == name) {
            Some(idx) => idx,
            None => {
                self.variables.push(Variable::new(name));
                self.variables.len() - 1
            }
        };
        &mut self.variables[idx]
    }

    /// Replaces the numeric `actual_range` of every time axis with a
    /// [`AttributeValue::TimeRange`]. Already converted ranges are left alone.
    pub fn cast_time_variables(&mut self) {
        for var in self.variables.iter_mut().filter(|v| v.is_time_axis()) {
            let Some(AttributeValue::Numbers(range)) = var.attributes.get(ACTUAL_RANGE) else {
                continue;
            };
            if range.len() != 2 {
                log::warn!("{}: actual_range does not hold two values, left as is", var.name);
                continue;
            }
            let Some(units) = var.time_units() else {
                log::warn!("{}: time axis without usable units, actual_range left as is", var.name);
                continue;
            };
            match (units.to_datetime(range[0]), units.to_datetime(range[1])) {
                (Ok(start), Ok(end)) => {
                    var.attributes
                        .insert(ACTUAL_RANGE.to_string(), AttributeValue::TimeRange { start, end });
                }
                (Err(e), _) | (_, Err(e)) => {
                    log::warn!("{}: cannot convert actual_range: {:#}", var.name, e);
                }
            }
        }
    }

    pub fn global(&self) -> &Attributes {
        &self.global
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    /// Looks up a global attribute, or a variable's attribute when `variable` is given.
    pub fn attribute(&self, name: &str, variable: Option<&str>) -> Option<&AttributeValue> {
        match variable {
            None | Some(GLOBAL) => self.global.get(name),
            Some(var) => self.variable(var)?.attributes.get(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const INFO: &str = r#"{
      "table": {
        "columnNames": ["Row Type", "Variable Name", "Attribute Name", "Data Type", "Value"],
        "columnTypes": ["String", "String", "String", "String", "String"],
        "rows": [
          ["attribute", "NC_GLOBAL", "title", "String", "NDBC Standard Meteorological Buoy Data, 1970-present"],
          ["attribute", "NC_GLOBAL", "Westernmost_Easting", "double", "-177.75"],
          ["variable", "station", "", "String", ""],
          ["attribute", "station", "cf_role", "String", "timeseries_id"],
          ["variable", "time", "", "double", ""],
          ["attribute", "time", "_CoordinateAxisType", "String", "Time"],
          ["attribute", "time", "actual_range", "double", "4.3254E7, 1.6093773E9"],
          ["attribute", "time", "units", "String", "seconds since 1970-01-01T00:00:00Z"],
          ["variable", "wd", "", "short", ""],
          ["attribute", "wd", "_FillValue", "short", "32767"],
          ["attribute", "wd", "actual_range", "short", "0, 359"],
          ["variable", "wspd", "", "float", ""],
          ["attribute", "wspd", "comment", "String", "Average wind speed (m/s)."]
        ]
      }
    }"#;

    #[test]
    fn parses_global_and_variable_attributes() {
        let md = Metadata::from_info_json(INFO).unwrap();
        assert_eq!(
            md.attribute("title", None).and_then(AttributeValue::as_str),
            Some("NDBC Standard Meteorological Buoy Data, 1970-present")
        );
        assert_eq!(
            md.attribute("comment", Some("wspd")).and_then(AttributeValue::as_str),
            Some("Average wind speed (m/s).")
        );
        assert_eq!(
            md.attribute("Westernmost_Easting", None),
            Some(&AttributeValue::Number(-177.75))
        );
        assert_eq!(md.attribute("_FillValue", Some("wd")), Some(&AttributeValue::Integer(32767)));
        assert_eq!(
            md.attribute("actual_range", Some("wd")),
            Some(&AttributeValue::Numbers(vec![0.0, 359.0]))
        );
        assert_eq!(md.attribute("missing", None), None);
        assert_eq!(md.attribute("comment", Some("nope")), None);
    }

    #[test]
    fn oversized_unsigned_values_become_numbers() {
        assert_eq!(
            AttributeValue::parse("ulong", "18446744073709551615"),
            AttributeValue::Number(18446744073709551615.0)
        );
        assert_eq!(
            AttributeValue::parse("ulong", "0, 18446744073709551615"),
            AttributeValue::Numbers(vec![0.0, 18446744073709551615.0])
        );
        assert_eq!(
            AttributeValue::parse("int", "n/a"),
            AttributeValue::Text("n/a".to_string())
        );
    }

    #[test]
    fn keeps_variable_order_and_types() {
        let md = Metadata::from_info_json(INFO).unwrap();
        let names: Vec<_> = md.variable_names().collect();
        assert_eq!(names, ["station", "time", "wd", "wspd"]);
        assert_eq!(md.variable("wd").unwrap().data_type, "short");
    }

    #[test]
    fn time_axis_range_is_recast() {
        let md = Metadata::from_info_json(INFO).unwrap();
        let (start, end) = md
            .attribute("actual_range", Some("time"))
            .and_then(AttributeValue::as_time_range)
            .unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(1971, 5, 16, 15, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2020, 12, 31, 1, 15, 0).unwrap());

        let units = md.variable("time").unwrap().time_units().unwrap();
        assert_eq!(units.to_number(start).unwrap(), 4.3254e7);
        assert_eq!(units.to_number(end).unwrap(), 1.6093773e9);
    }

    #[test]
    fn casting_twice_is_a_no_op() {
        let mut md = Metadata::from_info_json(INFO).unwrap();
        let before = md.clone();
        md.cast_time_variables();
        assert_eq!(md, before);
    }

    #[test]
    fn time_axis_with_bad_units_is_left_alone() {
        let doc = INFO.replace("seconds since 1970-01-01T00:00:00Z", "UTC");
        let md = Metadata::from_info_json(&doc).unwrap();
        assert_eq!(
            md.attribute("actual_range", Some("time")),
            Some(&AttributeValue::Numbers(vec![4.3254e7, 1.6093773e9]))
        );
    }

    #[test]
    fn time_range_displays_as_iso8601() {
        let md = Metadata::from_info_json(INFO).unwrap();
        assert_eq!(
            md.attribute("actual_range", Some("time")).unwrap().to_string(),
            "1971-05-16T15:00:00Z, 2020-12-31T01:15:00Z"
        );
    }

    #[test]
    fn rejects_documents_without_expected_columns() {
        let doc = r#"{"table": {"columnNames": ["a"], "rows": []}}"#;
        assert!(Metadata::from_info_json(doc).is_err());
        assert!(Metadata::from_info_json("<html>").is_err());
    }
}
