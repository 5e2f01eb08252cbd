//! Institution → macro-sector → country flow graph.
//!
//! Builds a petgraph DiGraph from an annotated transaction frame and flattens
//! it into positional node/link lists ready for a Sankey-style renderer.
//! Node identity is the positional index in tier order: institutions first,
//! then macro-sectors, then countries, each in first-seen order.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use polars::prelude::*;

use crate::error::DatakitError;
use crate::schema::{derived, tx};

/// One weighted link between two positional node indices.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// Flattened graph: labels in tier order plus index-pair links.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowGraph {
    pub nodes: Vec<String>,
    pub links: Vec<FlowLink>,
}

/// Aggregated (institution, macro-sector, country) triple.
struct FlowTriple {
    institution: String,
    macro_sector: String,
    country: String,
    value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FlowGraphBuilder {
    value_range: Option<(f64, f64)>,
}

impl FlowGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only triples whose summed value falls inside `[min, max]`.
    /// Applied to edges before nodes are collected, so a fully filtered
    /// institution disappears from the node list too.
    pub fn with_value_range(mut self, min: f64, max: f64) -> Self {
        self.value_range = Some((min, max));
        self
    }

    /// Build the graph from an annotated, already-filtered frame.
    ///
    /// Required columns: source, macro_sector, recipientcountry_codename and
    /// value_usd. Rows with a null label in any tier are skipped. Sign
    /// handling belongs to the filter layer, not here.
    pub fn build(&self, df: &DataFrame) -> Result<FlowGraph, DatakitError> {
        let institutions = df.column(tx::SOURCE)?.str()?;
        let macro_sectors = df.column(derived::MACRO_SECTOR)?.str()?;
        let countries = df.column(tx::COUNTRY_NAME)?.str()?;
        let values = df.column(tx::VALUE_USD)?.f64()?;

        // Sum per triple, preserving first-seen order.
        let mut triples: Vec<FlowTriple> = Vec::new();
        let mut triple_map: HashMap<(String, String, String), usize> = HashMap::new();
        for i in 0..df.height() {
            let (Some(inst), Some(ms), Some(country)) = (
                institutions.get(i),
                macro_sectors.get(i),
                countries.get(i),
            ) else {
                continue;
            };
            let value = values.get(i).unwrap_or(0.0);
            let key = (inst.to_string(), ms.to_string(), country.to_string());
            match triple_map.get(&key) {
                Some(&idx) => triples[idx].value += value,
                None => {
                    triple_map.insert(key, triples.len());
                    triples.push(FlowTriple {
                        institution: inst.to_string(),
                        macro_sector: ms.to_string(),
                        country: country.to_string(),
                        value,
                    });
                }
            }
        }

        if let Some((min, max)) = self.value_range {
            triples.retain(|t| t.value >= min && t.value <= max);
        }

        let mut graph: DiGraph<String, f64> = DiGraph::new();
        let mut node_map: HashMap<String, NodeIndex> = HashMap::new();

        let get_or_insert = |map: &mut HashMap<String, NodeIndex>,
                             g: &mut DiGraph<String, f64>,
                             label: &str|
         -> NodeIndex {
            *map.entry(label.to_string())
                .or_insert_with(|| g.add_node(label.to_string()))
        };

        // Tier passes fix positional identity: institutions, macro-sectors,
        // countries.
        for t in &triples {
            get_or_insert(&mut node_map, &mut graph, &t.institution);
        }
        for t in &triples {
            get_or_insert(&mut node_map, &mut graph, &t.macro_sector);
        }
        for t in &triples {
            get_or_insert(&mut node_map, &mut graph, &t.country);
        }

        // Two edge layers: institution → macro, then macro → country.
        for t in &triples {
            let src = node_map[&t.institution];
            let dst = node_map[&t.macro_sector];
            graph.add_edge(src, dst, t.value);
        }
        for t in &triples {
            let src = node_map[&t.macro_sector];
            let dst = node_map[&t.country];
            graph.add_edge(src, dst, t.value);
        }

        let nodes: Vec<String> = graph.node_weights().cloned().collect();
        let links: Vec<FlowLink> = graph
            .edge_references()
            .map(|e| FlowLink {
                source: e.source().index(),
                target: e.target().index(),
                value: *e.weight(),
            })
            .collect();

        Ok(FlowGraph { nodes, links })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: &[(&str, &str, &str, f64)]) -> DataFrame {
        let insts: Vec<String> = rows.iter().map(|r| r.0.to_string()).collect();
        let macros: Vec<String> = rows.iter().map(|r| r.1.to_string()).collect();
        let countries: Vec<String> = rows.iter().map(|r| r.2.to_string()).collect();
        let values: Vec<f64> = rows.iter().map(|r| r.3).collect();
        DataFrame::new(vec![
            Column::new(tx::SOURCE.into(), &insts),
            Column::new(derived::MACRO_SECTOR.into(), &macros),
            Column::new(tx::COUNTRY_NAME.into(), &countries),
            Column::new(tx::VALUE_USD.into(), &values),
        ])
        .unwrap()
    }

    #[test]
    fn repeated_triple_sums_into_single_edges() {
        let df = frame(&[
            ("InstA", "MacroX", "Brazil", 50.0),
            ("InstA", "MacroX", "Brazil", 30.0),
        ]);
        let graph = FlowGraphBuilder::new().build(&df).unwrap();
        assert_eq!(graph.nodes, vec!["InstA", "MacroX", "Brazil"]);
        assert_eq!(
            graph.links,
            vec![
                FlowLink { source: 0, target: 1, value: 80.0 },
                FlowLink { source: 1, target: 2, value: 80.0 },
            ]
        );
    }

    #[test]
    fn nodes_come_out_in_tier_order() {
        let df = frame(&[
            ("InstB", "MacroY", "Peru", 10.0),
            ("InstA", "MacroX", "Brazil", 20.0),
            ("InstB", "MacroX", "Peru", 5.0),
        ]);
        let graph = FlowGraphBuilder::new().build(&df).unwrap();
        assert_eq!(
            graph.nodes,
            vec!["InstB", "InstA", "MacroY", "MacroX", "Peru", "Brazil"]
        );
        // First layer targets are all macro-sector indices.
        for link in &graph.links[..3] {
            assert!(link.source < 2);
            assert!((2..4).contains(&link.target));
        }
        for link in &graph.links[3..] {
            assert!((2..4).contains(&link.source));
            assert!(link.target >= 4);
        }
    }

    #[test]
    fn value_range_drops_edges_and_their_orphaned_nodes() {
        let df = frame(&[
            ("InstA", "MacroX", "Brazil", 100.0),
            ("InstB", "MacroY", "Peru", 1.0),
        ]);
        let graph = FlowGraphBuilder::new()
            .with_value_range(50.0, 1000.0)
            .build(&df)
            .unwrap();
        assert_eq!(graph.nodes, vec!["InstA", "MacroX", "Brazil"]);
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn null_labels_are_skipped() {
        let insts = vec![Some("InstA"), None];
        let macros = vec![Some("MacroX"), Some("MacroY")];
        let countries = vec![Some("Brazil"), Some("Peru")];
        let df = DataFrame::new(vec![
            Column::new(tx::SOURCE.into(), &insts),
            Column::new(derived::MACRO_SECTOR.into(), &macros),
            Column::new(tx::COUNTRY_NAME.into(), &countries),
            Column::new(tx::VALUE_USD.into(), &[10.0, 20.0]),
        ])
        .unwrap();
        let graph = FlowGraphBuilder::new().build(&df).unwrap();
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 2);
    }

    #[test]
    fn empty_frame_yields_empty_graph() {
        let df = frame(&[]);
        let graph = FlowGraphBuilder::new().build(&df).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.links.is_empty());
    }
}
