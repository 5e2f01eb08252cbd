/// Column-name constants for the aid-datakit schema.
/// Single source of truth for every component that touches the frame.

// ── Transaction columns (stored) ────────────────────────────────────────────
pub mod tx {
    pub const IATI_IDENTIFIER: &str = "iatiidentifier";
    pub const TRANSACTION_TYPE: &str = "transactiontype_codename";
    pub const TRANSACTION_DATE: &str = "transactiondate_isodate";
    pub const VALUE_USD: &str = "value_usd";
    pub const COUNTRY_CODE: &str = "recipientcountry_code";
    pub const COUNTRY_NAME: &str = "recipientcountry_codename";
    pub const SOURCE: &str = "source";
    pub const MODALITY: &str = "modality";
    pub const SECTOR_CODE: &str = "sector_code";
    pub const SECTOR_NAME: &str = "sector_codename";

    pub const REQUIRED: [&str; 5] = [
        IATI_IDENTIFIER,
        TRANSACTION_TYPE,
        TRANSACTION_DATE,
        VALUE_USD,
        SECTOR_NAME,
    ];
}

// ── Derived columns (computed once at load) ─────────────────────────────────
pub mod derived {
    pub const YEAR: &str = "year";
    pub const YEAR_MONTH: &str = "year_month";
    pub const MACRO_SECTOR: &str = "macro_sector";
}

// ── Aggregation output columns ──────────────────────────────────────────────
pub mod agg {
    pub const VALUE_USD: &str = "value_usd";
    pub const OPERATIONS: &str = "operations";
    pub const TICKET: &str = "ticket";
    pub const SHARE_PCT: &str = "share_pct";
    pub const MEAN: &str = "mean";
    pub const MEDIAN: &str = "median";
    pub const STD_DEV: &str = "std_dev";
    pub const MIN: &str = "min";
    pub const MAX: &str = "max";
    pub const Q1: &str = "q1";
    pub const Q3: &str = "q3";
}

// ── Sentinel values ─────────────────────────────────────────────────────────
pub mod sentinel {
    /// Transaction type that participates in reporting.
    pub const OUTGOING_COMMITMENT: &str = "Outgoing Commitment";
    /// Classification result for unknown or missing sector names.
    pub const UNCLASSIFIED: &str = "No clasificado";
    /// Bucket for the force-mapped "Sectors not specified" label.
    pub const UNASSIGNED: &str = "Administrativo / No asignado";
    /// Raw sector label that overrides the generic classification.
    pub const SECTORS_NOT_SPECIFIED: &str = "Sectors not specified";
    /// Multi-select token meaning "the whole candidate list".
    pub const ALL_TOKEN: &str = "Todos";
}
