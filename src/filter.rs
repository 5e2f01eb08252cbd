//! Filter criteria resolution.
//!
//! The UI layer builds a [`FilterCriteria`] value object per render and
//! passes it in; nothing here reads ambient state. Resolution is a pure
//! function of the criteria and the store's schema, producing one conjunctive
//! polars predicate.

use polars::prelude::*;

use crate::error::DatakitError;
use crate::schema::{derived, sentinel, tx};
use crate::store::TransactionStore;

/// Result of resolving a multi-select against its "All" token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No restriction on this dimension.
    All,
    /// Exactly these individually chosen items.
    Subset(Vec<String>),
}

impl Selection {
    /// The effective item list: the full candidate universe for `All`,
    /// the chosen items otherwise.
    pub fn expand(&self, universe: &[String]) -> Vec<String> {
        match self {
            Selection::All => universe.to_vec(),
            Selection::Subset(items) => items.clone(),
        }
    }
}

/// Resolve a raw multi-select. Deterministic and side-effect-free:
/// an empty selection or one containing only the "All" token means no
/// restriction; once any specific item is chosen, the "All" token is
/// dropped and exactly the specific items count.
pub fn resolve_selection(selected: &[String], all_token: &str) -> Selection {
    let specifics: Vec<String> = selected
        .iter()
        .filter(|item| item.as_str() != all_token)
        .cloned()
        .collect();
    if specifics.is_empty() {
        Selection::All
    } else {
        Selection::Subset(specifics)
    }
}

/// Standing exclusion for the modality dimension: entries containing the
/// case-insensitive token "other" are removed from the candidate universe
/// before any select-all expansion, so "All" never silently includes them.
pub fn modality_universe(values: &[String]) -> Vec<String> {
    values
        .iter()
        .filter(|v| !v.to_lowercase().contains("other"))
        .cloned()
        .collect()
}

/// One render's worth of filter selections. Every dimension is
/// independently optional; absent dimensions impose no restriction.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    /// Inclusive year range.
    pub year_range: Option<(i32, i32)>,
    pub countries: Vec<String>,
    pub sources: Vec<String>,
    pub modalities: Vec<String>,
    pub macro_sectors: Vec<String>,
    pub sectors: Vec<String>,
    /// Inclusive value_usd range.
    pub value_range: Option<(f64, f64)>,
    /// Remove corrections/reversals (value_usd <= 0).
    pub exclude_negative: bool,
    /// Keep only "Outgoing Commitment" rows.
    pub commitments_only: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            year_range: None,
            countries: Vec::new(),
            sources: Vec::new(),
            modalities: Vec::new(),
            macro_sectors: Vec::new(),
            sectors: Vec::new(),
            value_range: None,
            exclude_negative: true,
            commitments_only: true,
        }
    }
}

impl FilterCriteria {
    /// Resolve against a store's schema. Dimensions whose column is absent
    /// (schema drift) are silently unavailable rather than an error.
    pub fn resolve(&self, store: &TransactionStore) -> ResolvedFilter {
        let mut predicates: Vec<Expr> = Vec::new();

        if self.commitments_only && store.has_column(tx::TRANSACTION_TYPE) {
            predicates
                .push(col(tx::TRANSACTION_TYPE).eq(lit(sentinel::OUTGOING_COMMITMENT)));
        }

        if let Some((y0, y1)) = self.year_range {
            if store.has_column(derived::YEAR) {
                predicates.push(
                    col(derived::YEAR)
                        .gt_eq(lit(y0))
                        .and(col(derived::YEAR).lt_eq(lit(y1))),
                );
            }
        }

        if store.has_column(tx::COUNTRY_NAME) {
            if let Selection::Subset(items) = resolve_selection(&self.countries, sentinel::ALL_TOKEN)
            {
                predicates.push(member_of(tx::COUNTRY_NAME, &items));
            }
        }

        if store.has_column(tx::SOURCE) {
            if let Selection::Subset(items) = resolve_selection(&self.sources, sentinel::ALL_TOKEN) {
                predicates.push(member_of(tx::SOURCE, &items));
            }
        }

        if store.has_column(tx::MODALITY) {
            match resolve_selection(&self.modalities, sentinel::ALL_TOKEN) {
                // "All" still excludes "Other*" modalities; rows with no
                // modality at all are retained.
                Selection::All => predicates.push(
                    col(tx::MODALITY).is_null().or(col(tx::MODALITY)
                        .str()
                        .to_lowercase()
                        .str()
                        .contains_literal(lit("other"))
                        .not()),
                ),
                Selection::Subset(items) => predicates.push(member_of(tx::MODALITY, &items)),
            }
        }

        if store.has_column(derived::MACRO_SECTOR) {
            if let Selection::Subset(items) =
                resolve_selection(&self.macro_sectors, sentinel::ALL_TOKEN)
            {
                predicates.push(member_of(derived::MACRO_SECTOR, &items));
            }
        }

        if store.has_column(tx::SECTOR_NAME) {
            if let Selection::Subset(items) = resolve_selection(&self.sectors, sentinel::ALL_TOKEN)
            {
                predicates.push(member_of(tx::SECTOR_NAME, &items));
            }
        }

        if let Some((lo, hi)) = self.value_range {
            predicates.push(
                col(tx::VALUE_USD)
                    .gt_eq(lit(lo))
                    .and(col(tx::VALUE_USD).lt_eq(lit(hi))),
            );
        }

        if self.exclude_negative {
            predicates.push(col(tx::VALUE_USD).gt(lit(0.0)));
        }

        tracing::debug!(dimensions = predicates.len(), "resolved filter criteria");
        ResolvedFilter { predicates }
    }

    /// Resolve and apply in one step.
    pub fn apply(&self, store: &TransactionStore) -> Result<DataFrame, DatakitError> {
        self.resolve(store).apply(store.frame())
    }
}

/// A concrete row predicate. Applying it twice with the same criteria is a
/// no-op on an already-filtered set, and applying two resolved filters in
/// sequence equals the conjunction of their criteria.
pub struct ResolvedFilter {
    predicates: Vec<Expr>,
}

impl ResolvedFilter {
    pub fn predicate(&self) -> Expr {
        self.predicates
            .iter()
            .cloned()
            .reduce(|acc, next| acc.and(next))
            .unwrap_or_else(|| lit(true))
    }

    pub fn apply(&self, frame: &DataFrame) -> Result<DataFrame, DatakitError> {
        let filtered = frame.clone().lazy().filter(self.predicate()).collect()?;
        Ok(filtered)
    }
}

fn member_of(column: &str, items: &[String]) -> Expr {
    let candidates = Series::new("selection".into(), items.to_vec());
    col(column).is_in(lit(candidates), false)
}
