use anyhow::{Context, Result, anyhow};
use std::str::FromStr;

/// Parsing configuration handed to the CSV decoder.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub delimiter: u8,
    pub has_headers: bool,
    pub comment: Option<u8>,
    pub trim: bool,
    /// Allow rows with a different number of fields than the header.
    pub flexible: bool,
    /// Split `name (units)` header cells, as written by the `csvp` file type.
    pub split_units: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
            comment: None,
            trim: false,
            flexible: false,
            split_units: true,
        }
    }
}

impl ReadOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_comment(mut self, comment: Option<u8>) -> Self {
        self.comment = comment;
        self
    }

    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub fn with_flexible(mut self, flexible: bool) -> Self {
        self.flexible = flexible;
        self
    }

    pub fn with_split_units(mut self, split_units: bool) -> Self {
        self.split_units = split_units;
        self
    }
}

/// Rows and columns decoded from a tabular response, cells kept as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    units: Vec<Option<String>>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn from_csv(text: &str, options: &ReadOptions) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_headers)
            .comment(options.comment)
            .trim(if options.trim { csv::Trim::All } else { csv::Trim::None })
            .flexible(options.flexible)
            .from_reader(text.as_bytes());

        let mut columns = Vec::new();
        let mut units = Vec::new();
        if options.has_headers {
            for header in reader.headers().context("failed to read CSV header")?.iter() {
                let (name, unit) = if options.split_units {
                    split_header(header)
                } else {
                    (header, None)
                };
                columns.push(name.to_string());
                units.push(unit.map(str::to_string));
            }
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("failed to read CSV row {}", idx + 1))?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if !options.has_headers {
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            columns = (0..width).map(|i| format!("column_{}", i)).collect();
            units = vec![None; width];
        }

        Ok(Self {
            columns,
            units,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Units parsed from the header of column `name`, if any.
    pub fn units(&self, name: &str) -> Option<&str> {
        self.units.get(self.column_index(name)?)?.as_deref()
    }

    /// Cells of column `name`; short rows contribute an empty string.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Parses column `name` into `T`. Empty cells and `NaN` become `None`.
    pub fn column_as<T>(&self, name: &str) -> Result<Vec<Option<T>>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let cells = self
            .column(name)
            .ok_or_else(|| anyhow!("no column named {:?}", name))?;
        cells
            .into_iter()
            .enumerate()
            .map(|(row, cell)| {
                if cell.is_empty() || cell == "NaN" {
                    Ok(None)
                } else {
                    cell.parse::<T>()
                        .map(Some)
                        .with_context(|| format!("column {:?}, row {}: bad value {:?}", name, row, cell))
                }
            })
            .collect()
    }
}

fn split_header(header: &str) -> (&str, Option<&str>) {
    if let Some(inner) = header.strip_suffix(')') {
        if let Some((name, unit)) = inner.rsplit_once(" (") {
            return (name, Some(unit));
        }
    }
    (header, None)
}
