//! Core engine for development-finance transaction analytics: a sector
//! taxonomy classifier, a columnar transaction store, a composable filter
//! resolver, grouped aggregation and KPI reports, a flow-graph builder and
//! a download surface. Rendering and transport live elsewhere; everything
//! here takes and returns plain data.

pub mod aggregate;
pub mod error;
pub mod export;
pub mod filter;
pub mod flow_graph;
pub mod regions;
pub mod schema;
pub mod store;
pub mod taxonomy;

pub use aggregate::{AggMode, KpiSummary};
pub use error::DatakitError;
pub use filter::{FilterCriteria, ResolvedFilter, Selection};
pub use flow_graph::{FlowGraph, FlowGraphBuilder, FlowLink};
pub use regions::RegionRegistry;
pub use store::{StoreCache, TransactionStore};
pub use taxonomy::{TaxonomyRegistry, TaxonomyVersion};
