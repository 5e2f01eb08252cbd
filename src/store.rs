//! In-memory transaction table, loaded once per source file.
//!
//! Loading validates the schema, coerces `sector_code` to numeric, derives
//! `year` / `year_month` from the ISO transaction date and annotates the
//! `macro_sector` column from the taxonomy registry. Rows are immutable
//! afterwards; filtering and aggregation always produce new frames.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::error::DatakitError;
use crate::schema::{derived, tx};
use crate::taxonomy::{self, TaxonomyRegistry};

pub struct TransactionStore {
    frame: DataFrame,
}

impl TransactionStore {
    /// Load a parquet dataset. A missing or unreadable file is a hard load
    /// failure; the caller must surface it instead of rendering partially.
    pub fn from_parquet(path: &Path, registry: &TaxonomyRegistry) -> Result<Self, DatakitError> {
        let file = std::fs::File::open(path).map_err(|e| {
            DatakitError::NotLoaded(format!("{}: {}", path.display(), e))
        })?;
        let raw = ParquetReader::new(file).finish()?;
        tracing::info!(path = %path.display(), rows = raw.height(), "loaded parquet dataset");
        Self::from_frame(raw, registry)
    }

    /// Load a CSV dataset with all columns read as strings; numeric columns
    /// are coerced during preparation.
    pub fn from_csv(path: &Path, registry: &TaxonomyRegistry) -> Result<Self, DatakitError> {
        if !path.exists() {
            return Err(DatakitError::NotLoaded(format!(
                "{}: file not found",
                path.display()
            )));
        }
        let mut raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        // Trim whitespace from column names
        let trimmed: Vec<String> = raw
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        raw.set_column_names(trimmed.as_slice())?;

        tracing::info!(path = %path.display(), rows = raw.height(), "loaded csv dataset");
        Self::from_frame(raw, registry)
    }

    /// Prepare an already-loaded frame: validate, coerce, derive, annotate.
    pub fn from_frame(raw: DataFrame, registry: &TaxonomyRegistry) -> Result<Self, DatakitError> {
        let frame = Self::prepare(raw, registry)?;
        Ok(Self { frame })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Schema-drift check: a filter dimension whose column is absent is
    /// simply unavailable, never an error.
    pub fn has_column(&self, name: &str) -> bool {
        self.frame.schema().contains(name)
    }

    /// Sorted distinct non-null values of a column, the candidate universe
    /// for that filter dimension.
    pub fn unique_values(&self, column: &str) -> Result<Vec<String>, DatakitError> {
        let series = self
            .frame
            .column(column)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let values: BTreeSet<String> = series
            .str()?
            .into_iter()
            .filter_map(|v| v.map(|s| s.to_string()))
            .collect();
        Ok(values.into_iter().collect())
    }

    /// Inclusive (min, max) of the derived year column; None when no row has
    /// a parseable date.
    pub fn year_bounds(&self) -> Result<Option<(i32, i32)>, DatakitError> {
        let years = self.frame.column(derived::YEAR)?.as_materialized_series().i32()?.clone();
        Ok(years.min().zip(years.max()))
    }

    /// Inclusive (min, max) of `value_usd`; None for an empty table.
    pub fn value_bounds(&self) -> Result<Option<(f64, f64)>, DatakitError> {
        let values = self.frame.column(tx::VALUE_USD)?.as_materialized_series().f64()?.clone();
        Ok(values.min().zip(values.max()))
    }

    fn prepare(mut df: DataFrame, registry: &TaxonomyRegistry) -> Result<DataFrame, DatakitError> {
        Self::require_columns(&df, &tx::REQUIRED)?;

        // value_usd arrives as text from all-string CSV ingestion
        if !matches!(df.column(tx::VALUE_USD)?.dtype(), DataType::Float64) {
            let values = df
                .column(tx::VALUE_USD)?
                .as_materialized_series()
                .cast(&DataType::Float64)?;
            df.with_column(values)?;
        }

        // sector_code: numeric taxonomy code that may arrive as text;
        // unparseable entries become null rather than failing the load
        if df.schema().contains(tx::SECTOR_CODE) {
            let codes = df
                .column(tx::SECTOR_CODE)?
                .as_materialized_series()
                .cast(&DataType::String)?;
            let parsed: Vec<Option<i64>> = codes
                .str()?
                .into_iter()
                .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok().map(|f| f as i64)))
                .collect();
            df.with_column(Series::new(tx::SECTOR_CODE.into(), parsed))?;
        }

        // year / year_month, derived once from the ISO date
        let dates = df
            .column(tx::TRANSACTION_DATE)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let mut years: Vec<Option<i32>> = Vec::with_capacity(df.height());
        let mut year_months: Vec<Option<String>> = Vec::with_capacity(df.height());
        for value in dates.str()?.into_iter() {
            match value.and_then(parse_iso_date) {
                Some(date) => {
                    years.push(Some(date.year()));
                    year_months.push(Some(format!("{:04}-{:02}", date.year(), date.month())));
                }
                None => {
                    years.push(None);
                    year_months.push(None);
                }
            }
        }
        df.with_column(Series::new(derived::YEAR.into(), years))?;
        df.with_column(Series::new(derived::YEAR_MONTH.into(), year_months))?;

        // macro_sector annotation; recomputed on every load, never cached
        // beyond it, so a registry change always takes effect
        let sectors = df
            .column(tx::SECTOR_NAME)?
            .as_materialized_series()
            .cast(&DataType::String)?;
        let mut unclassified = 0usize;
        let macro_sectors: Vec<&str> = sectors
            .str()?
            .into_iter()
            .map(|raw| {
                let label = taxonomy::unassigned_override(raw, registry.classify(raw));
                if label == crate::schema::sentinel::UNCLASSIFIED {
                    unclassified += 1;
                }
                label
            })
            .collect();
        if unclassified > 0 {
            tracing::warn!(rows = unclassified, "sector labels without macro-sector mapping");
        }
        df.with_column(Series::new(derived::MACRO_SECTOR.into(), macro_sectors))?;

        Ok(df)
    }

    fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), DatakitError> {
        for &name in required {
            if df.column(name).is_err() {
                return Err(DatakitError::MissingColumn(name.to_string()));
            }
        }
        Ok(())
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    // Tolerate datetime suffixes; the calendar date is the first 10 chars.
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// At-most-once load per distinct source file. The prepared store is shared
/// read-only across all subsequent filter/aggregation calls.
#[derive(Default)]
pub struct StoreCache {
    loaded: HashMap<PathBuf, Arc<TransactionStore>>,
}

impl StoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        path: &Path,
        registry: &TaxonomyRegistry,
    ) -> Result<Arc<TransactionStore>, DatakitError> {
        if let Some(store) = self.loaded.get(path) {
            tracing::debug!(path = %path.display(), "store cache hit");
            return Ok(Arc::clone(store));
        }
        let store = match path.extension().and_then(|e| e.to_str()) {
            Some("parquet") => TransactionStore::from_parquet(path, registry)?,
            _ => TransactionStore::from_csv(path, registry)?,
        };
        let store = Arc::new(store);
        self.loaded.insert(path.to_path_buf(), Arc::clone(&store));
        Ok(store)
    }
}
