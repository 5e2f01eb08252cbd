//! Grouped reductions over a filtered transaction view.
//!
//! Two aggregation modes exist and must never be conflated: flow-style
//! reports (commitments, disbursements) sum values per group, stock-style
//! reports (outstanding balances) keep the maximum among rows sharing the
//! group key. All division guards zero denominators.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use polars::prelude::*;

use crate::error::DatakitError;
use crate::schema::{agg, derived, tx};

/// How duplicate rows within one group combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggMode {
    /// Sum values per group (commitments/disbursements).
    Flow,
    /// Take the maximum value among rows sharing the key (balances reported
    /// by overlapping sources).
    Stock,
}

/// Total value, operation count and ticket size per group, ordered
/// descending by value with a stable ascending-key tie-break.
///
/// An empty input yields an empty frame, not an error.
pub fn grouped_totals(
    df: &DataFrame,
    group_cols: &[&str],
    mode: AggMode,
) -> Result<DataFrame, DatakitError> {
    struct GroupRow {
        keys: Vec<AnyValue<'static>>,
        key_order: String,
        value: f64,
        ops: i64,
    }

    let mut rows: Vec<GroupRow> = Vec::new();
    if df.height() > 0 {
        let names: Vec<String> = group_cols.iter().map(|c| c.to_string()).collect();
        for partition in df.partition_by(names, true)? {
            let mut keys = Vec::with_capacity(group_cols.len());
            for &gc in group_cols {
                keys.push(partition.column(gc)?.get(0)?.into_static());
            }
            let key_order = keys
                .iter()
                .map(|k| format!("{k}"))
                .collect::<Vec<_>>()
                .join("\u{1f}");
            let series = partition.column(tx::VALUE_USD)?.as_materialized_series();
            let scalar = match mode {
                AggMode::Flow => series.sum_reduce()?,
                AggMode::Stock => series.max_reduce()?,
            };
            let value = scalar.value().try_extract::<f64>().unwrap_or(0.0);
            rows.push(GroupRow {
                keys,
                key_order,
                value,
                ops: partition.height() as i64,
            });
        }
    }

    rows.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.key_order.cmp(&b.key_order))
    });

    let mut key_columns: Vec<Vec<AnyValue>> = vec![Vec::new(); group_cols.len()];
    let mut values = Vec::with_capacity(rows.len());
    let mut ops = Vec::with_capacity(rows.len());
    let mut tickets = Vec::with_capacity(rows.len());
    for row in rows {
        for (i, key) in row.keys.into_iter().enumerate() {
            key_columns[i].push(key);
        }
        values.push(row.value);
        ops.push(row.ops);
        tickets.push(if row.ops > 0 {
            row.value / row.ops as f64
        } else {
            0.0
        });
    }

    let mut columns: Vec<Column> = Vec::new();
    for (i, &gc) in group_cols.iter().enumerate() {
        let series = Series::from_any_values(gc.into(), &key_columns[i], true)?;
        columns.push(series.into());
    }
    columns.push(Column::new(agg::VALUE_USD.into(), &values));
    columns.push(Column::new(agg::OPERATIONS.into(), &ops));
    columns.push(Column::new(agg::TICKET.into(), &tickets));

    Ok(DataFrame::new(columns)?)
}

/// First `n` rows of an already-ordered aggregate.
pub fn top_n(df: &DataFrame, n: usize) -> DataFrame {
    df.head(Some(n))
}

/// Per-group share of the partition total, in percent.
///
/// With a partition column (e.g. year), shares are computed within each
/// partition; without one, against the grand total. Shares are clamped to
/// [0, 100] and rounded to 2 decimals to keep floating-point drift out of
/// stacked charts. A zero partition total yields 0.0 shares.
pub fn percentage_of_total(
    df: &DataFrame,
    group_col: &str,
    partition_col: Option<&str>,
) -> Result<DataFrame, DatakitError> {
    struct ShareRow {
        partition: Option<AnyValue<'static>>,
        partition_order: String,
        group: AnyValue<'static>,
        value: f64,
    }

    let mut rows: Vec<ShareRow> = Vec::new();
    if df.height() > 0 {
        let mut names: Vec<String> = Vec::new();
        if let Some(pc) = partition_col {
            names.push(pc.to_string());
        }
        names.push(group_col.to_string());
        for partition in df.partition_by(names, true)? {
            let partition_key = match partition_col {
                Some(pc) => Some(partition.column(pc)?.get(0)?.into_static()),
                None => None,
            };
            let group = partition.column(group_col)?.get(0)?.into_static();
            let scalar = partition
                .column(tx::VALUE_USD)?
                .as_materialized_series()
                .sum_reduce()?;
            let value = scalar.value().try_extract::<f64>().unwrap_or(0.0);
            let partition_order = partition_key
                .as_ref()
                .map(|k| format!("{k}"))
                .unwrap_or_default();
            rows.push(ShareRow {
                partition: partition_key,
                partition_order,
                group,
                value,
            });
        }
    }

    let mut totals: HashMap<String, f64> = HashMap::new();
    for row in &rows {
        *totals.entry(row.partition_order.clone()).or_insert(0.0) += row.value;
    }

    rows.sort_by(|a, b| {
        a.partition_order
            .cmp(&b.partition_order)
            .then_with(|| b.value.total_cmp(&a.value))
    });

    let mut partition_keys: Vec<AnyValue> = Vec::new();
    let mut groups: Vec<AnyValue> = Vec::new();
    let mut values = Vec::with_capacity(rows.len());
    let mut shares = Vec::with_capacity(rows.len());
    for row in rows {
        let total = totals.get(&row.partition_order).copied().unwrap_or(0.0);
        let share = if total > 0.0 {
            round2((row.value / total * 100.0).clamp(0.0, 100.0))
        } else {
            0.0
        };
        if let Some(key) = row.partition {
            partition_keys.push(key);
        }
        groups.push(row.group);
        values.push(row.value);
        shares.push(share);
    }

    let mut columns: Vec<Column> = Vec::new();
    if let Some(pc) = partition_col {
        let series = Series::from_any_values(pc.into(), &partition_keys, true)?;
        columns.push(series.into());
    }
    columns.push(Series::from_any_values(group_col.into(), &groups, true)?.into());
    columns.push(Column::new(agg::VALUE_USD.into(), &values));
    columns.push(Column::new(agg::SHARE_PCT.into(), &shares));

    Ok(DataFrame::new(columns)?)
}

/// Distributional statistics of `value_usd` per group: count, mean, median,
/// sample std, min, max and quartiles, rounded to 2 decimals for display.
///
/// Groups whose values are all null are omitted; a single-element group has
/// no sample std and reports null there.
pub fn group_distribution(df: &DataFrame, group_col: &str) -> Result<DataFrame, DatakitError> {
    struct StatsRow {
        group: AnyValue<'static>,
        group_order: String,
        ops: i64,
        mean: f64,
        median: f64,
        std_dev: Option<f64>,
        min: f64,
        max: f64,
        q1: f64,
        q3: f64,
    }

    let mut rows: Vec<StatsRow> = Vec::new();
    if df.height() > 0 {
        for partition in df.partition_by([group_col.to_string()], true)? {
            let mut values: Vec<f64> = partition
                .column(tx::VALUE_USD)?
                .as_materialized_series()
                .f64()?
                .into_iter()
                .flatten()
                .collect();
            if values.is_empty() {
                continue;
            }
            values.sort_by(|a, b| a.total_cmp(b));

            let n = values.len();
            let mean = values.iter().sum::<f64>() / n as f64;
            let std_dev = if n > 1 {
                let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
                Some(round2((ss / (n - 1) as f64).sqrt()))
            } else {
                None
            };
            let group = partition.column(group_col)?.get(0)?.into_static();
            rows.push(StatsRow {
                group_order: format!("{group}"),
                group,
                ops: n as i64,
                mean: round2(mean),
                median: round2(quantile_linear(&values, 0.5)),
                std_dev,
                min: round2(values[0]),
                max: round2(values[n - 1]),
                q1: round2(quantile_linear(&values, 0.25)),
                q3: round2(quantile_linear(&values, 0.75)),
            });
        }
    }

    rows.sort_by(|a, b| a.group_order.cmp(&b.group_order));

    let mut groups: Vec<AnyValue> = Vec::new();
    let mut ops = Vec::new();
    let mut means = Vec::new();
    let mut medians = Vec::new();
    let mut stds: Vec<Option<f64>> = Vec::new();
    let mut mins = Vec::new();
    let mut maxs = Vec::new();
    let mut q1s = Vec::new();
    let mut q3s = Vec::new();
    for row in rows {
        groups.push(row.group);
        ops.push(row.ops);
        means.push(row.mean);
        medians.push(row.median);
        stds.push(row.std_dev);
        mins.push(row.min);
        maxs.push(row.max);
        q1s.push(row.q1);
        q3s.push(row.q3);
    }

    let columns: Vec<Column> = vec![
        Series::from_any_values(group_col.into(), &groups, true)?.into(),
        Column::new(agg::OPERATIONS.into(), &ops),
        Column::new(agg::MEAN.into(), &means),
        Column::new(agg::MEDIAN.into(), &medians),
        Column::new(agg::STD_DEV.into(), stds),
        Column::new(agg::MIN.into(), &mins),
        Column::new(agg::MAX.into(), &maxs),
        Column::new(agg::Q1.into(), &q1s),
        Column::new(agg::Q3.into(), &q3s),
    ];

    Ok(DataFrame::new(columns)?)
}

/// The headline figures shown above every report tab.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiSummary {
    pub total_usd: f64,
    pub operations: usize,
    pub average_ticket: f64,
    pub median_ticket: Option<f64>,
    pub countries: usize,
    pub sectors: usize,
    /// Leading sector by total value, with its share of the total in percent.
    pub leading_sector: Option<(String, f64)>,
}

pub fn kpi_summary(df: &DataFrame) -> Result<KpiSummary, DatakitError> {
    let operations = df.height();
    let series = df.column(tx::VALUE_USD)?.as_materialized_series();
    let values = series.f64()?;
    let total_usd = values.sum().unwrap_or(0.0);
    let average_ticket = if operations > 0 {
        total_usd / operations as f64
    } else {
        0.0
    };
    let mut sorted: Vec<f64> = values.into_iter().flatten().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median_ticket = if sorted.is_empty() {
        None
    } else {
        Some(quantile_linear(&sorted, 0.5))
    };

    let countries = distinct_count(df, tx::COUNTRY_NAME)?;
    let sectors = distinct_count(df, tx::SECTOR_NAME)?;

    let leading_sector = if operations > 0 && total_usd > 0.0 {
        let totals = grouped_totals(df, &[tx::SECTOR_NAME], AggMode::Flow)?;
        if totals.height() > 0 {
            let name = match totals.column(tx::SECTOR_NAME)?.get(0)? {
                AnyValue::String(s) => s.to_string(),
                AnyValue::StringOwned(s) => s.to_string(),
                other => format!("{other}"),
            };
            let leader_value = totals
                .column(agg::VALUE_USD)?
                .as_materialized_series()
                .f64()?
                .get(0)
                .unwrap_or(0.0);
            Some((name, round2(leader_value / total_usd * 100.0)))
        } else {
            None
        }
    } else {
        None
    };

    Ok(KpiSummary {
        total_usd,
        operations,
        average_ticket,
        median_ticket,
        countries,
        sectors,
        leading_sector,
    })
}

/// Year × category sum matrix with zero fill, heatmap-shaped: one `year`
/// column plus one column per category, both ascending.
pub fn year_matrix(df: &DataFrame, category_col: &str) -> Result<DataFrame, DatakitError> {
    let years_col = df
        .column(derived::YEAR)?
        .as_materialized_series()
        .clone();
    let years_ca = years_col.i32()?;
    let cats_col = df
        .column(category_col)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let cats_ca = cats_col.str()?;
    let vals_ca = df.column(tx::VALUE_USD)?.as_materialized_series().f64()?.clone();

    let mut cells: BTreeMap<(i32, String), f64> = BTreeMap::new();
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut categories: BTreeSet<String> = BTreeSet::new();
    for i in 0..df.height() {
        let (Some(year), Some(cat)) = (years_ca.get(i), cats_ca.get(i)) else {
            continue;
        };
        let value = vals_ca.get(i).unwrap_or(0.0);
        years.insert(year);
        categories.insert(cat.to_string());
        *cells.entry((year, cat.to_string())).or_insert(0.0) += value;
    }

    let year_list: Vec<i32> = years.into_iter().collect();
    let mut columns: Vec<Column> = vec![Column::new(derived::YEAR.into(), &year_list)];
    for cat in categories {
        let col_values: Vec<f64> = year_list
            .iter()
            .map(|y| cells.get(&(*y, cat.clone())).copied().unwrap_or(0.0))
            .collect();
        columns.push(Column::new(cat.as_str().into(), &col_values));
    }

    Ok(DataFrame::new(columns)?)
}

fn distinct_count(df: &DataFrame, column: &str) -> Result<usize, DatakitError> {
    if !df.schema().contains(column) {
        return Ok(0);
    }
    let series = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let distinct: HashSet<String> = series
        .str()?
        .into_iter()
        .filter_map(|v| v.map(|s| s.to_string()))
        .collect();
    Ok(distinct.len())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Linear-interpolation quantile over an ascending-sorted non-empty slice.
fn quantile_linear(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::sentinel;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn frame(years: &[i32], cats: &[&str], values: &[f64]) -> DataFrame {
        let cats = strings(cats);
        DataFrame::new(vec![
            Column::new(derived::YEAR.into(), years),
            Column::new("category".into(), &cats),
            Column::new(tx::VALUE_USD.into(), values),
        ])
        .unwrap()
    }

    #[test]
    fn flow_sums_and_stock_takes_max() {
        let df = frame(&[2020, 2020], &["X", "X"], &[5.0, 9.0]);
        let flow = grouped_totals(&df, &["category"], AggMode::Flow).unwrap();
        assert_eq!(
            flow.column(agg::VALUE_USD).unwrap().as_materialized_series().f64().unwrap().get(0),
            Some(14.0)
        );
        let stock = grouped_totals(&df, &[derived::YEAR, "category"], AggMode::Stock).unwrap();
        assert_eq!(stock.height(), 1);
        assert_eq!(
            stock.column(agg::VALUE_USD).unwrap().as_materialized_series().f64().unwrap().get(0),
            Some(9.0)
        );
    }

    #[test]
    fn sum_is_invariant_under_permutation_and_split_merge() {
        let df = frame(&[2020, 2021, 2020, 2021], &["A", "B", "A", "A"], &[1.0, 2.0, 3.0, 4.0]);
        let permuted =
            frame(&[2021, 2020, 2021, 2020], &["A", "B", "A", "A"], &[4.0, 2.0, 1.0, 3.0]);
        let a = grouped_totals(&df, &["category"], AggMode::Flow).unwrap();
        let b = grouped_totals(&permuted, &["category"], AggMode::Flow).unwrap();
        assert!(a.equals(&b));

        let merged = df.slice(0, 2).vstack(&df.slice(2, 2)).unwrap();
        let c = grouped_totals(&merged, &["category"], AggMode::Flow).unwrap();
        assert!(a.equals(&c));
    }

    #[test]
    fn totals_are_ordered_descending_with_ticket() {
        let df = frame(&[2020, 2020, 2020], &["A", "B", "B"], &[10.0, 30.0, 20.0]);
        let totals = grouped_totals(&df, &["category"], AggMode::Flow).unwrap();
        let cats = totals.column("category").unwrap().as_materialized_series().str().unwrap().clone();
        assert_eq!(cats.get(0), Some("B"));
        let tickets = totals.column(agg::TICKET).unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(tickets.get(0), Some(25.0));
        assert_eq!(tickets.get(1), Some(10.0));
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let df = frame(&[], &[], &[]);
        let totals = grouped_totals(&df, &["category"], AggMode::Flow).unwrap();
        assert_eq!(totals.height(), 0);
        let stats = group_distribution(&df, "category").unwrap();
        assert_eq!(stats.height(), 0);
    }

    #[test]
    fn shares_stay_within_bounds_and_sum_to_hundred() {
        let df = frame(
            &[2020, 2020, 2020, 2021, 2021],
            &["A", "B", "C", "A", "B"],
            &[1.0, 2.0, 3.0, 10.0, 30.0],
        );
        let shares = percentage_of_total(&df, "category", Some(derived::YEAR)).unwrap();
        let pct = shares.column(agg::SHARE_PCT).unwrap().as_materialized_series().f64().unwrap().clone();
        let years = shares.column(derived::YEAR).unwrap().as_materialized_series().i32().unwrap().clone();
        let mut by_year: HashMap<i32, f64> = HashMap::new();
        for i in 0..shares.height() {
            let p = pct.get(i).unwrap();
            assert!((0.0..=100.0).contains(&p));
            *by_year.entry(years.get(i).unwrap()).or_insert(0.0) += p;
        }
        for total in by_year.values() {
            assert!(*total <= 100.01, "partition shares exceed 100: {total}");
            assert!(*total >= 99.99);
        }
    }

    #[test]
    fn zero_partition_total_yields_zero_shares() {
        let df = frame(&[2020, 2020], &["A", "B"], &[0.0, 0.0]);
        let shares = percentage_of_total(&df, "category", Some(derived::YEAR)).unwrap();
        let pct = shares.column(agg::SHARE_PCT).unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(pct.get(0), Some(0.0));
        assert_eq!(pct.get(1), Some(0.0));
    }

    #[test]
    fn distribution_statistics_match_known_values() {
        let df = frame(&[2020; 4], &["A"; 4], &[1.0, 2.0, 3.0, 4.0]);
        let stats = group_distribution(&df, "category").unwrap();
        let get = |name: &str| {
            stats.column(name).unwrap().as_materialized_series().f64().unwrap().get(0).unwrap()
        };
        assert_eq!(get(agg::MEAN), 2.5);
        assert_eq!(get(agg::MEDIAN), 2.5);
        assert_eq!(get(agg::Q1), 1.75);
        assert_eq!(get(agg::Q3), 3.25);
        assert_eq!(get(agg::MIN), 1.0);
        assert_eq!(get(agg::MAX), 4.0);
        assert_eq!(get(agg::STD_DEV), 1.29);
    }

    #[test]
    fn single_element_group_has_no_sample_std() {
        let df = frame(&[2020], &["A"], &[7.0]);
        let stats = group_distribution(&df, "category").unwrap();
        let std = stats.column(agg::STD_DEV).unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(std.get(0), None);
        let median = stats.column(agg::MEDIAN).unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(median.get(0), Some(7.0));
    }

    #[test]
    fn kpi_summary_guards_empty_input() {
        let df = frame(&[], &[], &[]);
        let kpis = kpi_summary(&df).unwrap();
        assert_eq!(kpis.operations, 0);
        assert_eq!(kpis.average_ticket, 0.0);
        assert_eq!(kpis.median_ticket, None);
        assert_eq!(kpis.leading_sector, None);
    }

    #[test]
    fn kpi_summary_reports_leader_share() {
        let sectors = strings(&["Health", "Health", "Rail transport"]);
        let countries = strings(&["Peru", "Brazil", "Peru"]);
        let df = DataFrame::new(vec![
            Column::new(derived::YEAR.into(), &[2020, 2020, 2021]),
            Column::new(tx::SECTOR_NAME.into(), &sectors),
            Column::new(tx::COUNTRY_NAME.into(), &countries),
            Column::new(tx::VALUE_USD.into(), &[60.0, 20.0, 20.0]),
        ])
        .unwrap();
        let kpis = kpi_summary(&df).unwrap();
        assert_eq!(kpis.total_usd, 100.0);
        assert_eq!(kpis.countries, 2);
        assert_eq!(kpis.sectors, 2);
        assert_eq!(kpis.leading_sector, Some(("Health".to_string(), 80.0)));
    }

    #[test]
    fn year_matrix_fills_missing_cells_with_zero() {
        let df = frame(&[2020, 2021, 2021], &["A", "A", "B"], &[5.0, 7.0, 3.0]);
        let matrix = year_matrix(&df, "category").unwrap();
        assert_eq!(matrix.height(), 2);
        let b = matrix.column("B").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(b.get(0), Some(0.0));
        assert_eq!(b.get(1), Some(3.0));
    }

    #[test]
    fn unclassified_groups_are_listable_but_excludable() {
        // Breakdown callers drop the sentinel row themselves; the engine
        // reports whatever groups exist.
        let cats = strings(&["Social", sentinel::UNCLASSIFIED]);
        let df = DataFrame::new(vec![
            Column::new(derived::YEAR.into(), &[2020, 2020]),
            Column::new(derived::MACRO_SECTOR.into(), &cats),
            Column::new(tx::VALUE_USD.into(), &[10.0, 5.0]),
        ])
        .unwrap();
        let totals = grouped_totals(&df, &[derived::MACRO_SECTOR], AggMode::Flow).unwrap();
        assert_eq!(totals.height(), 2);
    }
}
