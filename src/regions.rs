//! Static region → country grouping.
//!
//! Only used to narrow the candidate list of the country multi-select;
//! aggregation semantics never depend on regions.

static REGION_GROUPS: &[(&str, &[&str])] = &[
    (
        "Caribe",
        &[
            "Antigua and Barbuda",
            "Bahamas (the)",
            "Barbados",
            "Dominica",
            "Dominican Republic (the)",
            "Grenada",
            "Haiti",
            "Jamaica",
            "Saint Lucia",
            "Trinidad and Tobago",
        ],
    ),
    (
        "Centroamérica",
        &[
            "Belize",
            "Costa Rica",
            "El Salvador",
            "Guatemala",
            "Honduras",
            "Nicaragua",
            "Panama",
            "Mexico",
        ],
    ),
    (
        "Sudamérica",
        &[
            "Argentina",
            "Bolivia (Plurinational State of)",
            "Brazil",
            "Chile",
            "Colombia",
            "Ecuador",
            "Guyana",
            "Paraguay",
            "Peru",
            "Suriname",
            "Uruguay",
            "Venezuela (Bolivarian Republic of)",
        ],
    ),
];

pub struct RegionRegistry;

impl RegionRegistry {
    /// Region names in registration order.
    pub fn regions() -> Vec<&'static str> {
        REGION_GROUPS.iter().map(|(name, _)| *name).collect()
    }

    /// Ordered country display names of one region.
    pub fn countries_of(region: &str) -> Option<&'static [&'static str]> {
        REGION_GROUPS
            .iter()
            .find(|(name, _)| *name == region)
            .map(|(_, countries)| *countries)
    }

    /// Narrow a country candidate universe by region.
    ///
    /// The region dimension is resolved first; the country candidate list is
    /// then the sorted subset of `universe` that belongs to the region.
    /// `None` (or an unknown region) leaves the universe unrestricted.
    pub fn narrow_candidates(region: Option<&str>, universe: &[String]) -> Vec<String> {
        let mut candidates: Vec<String> = match region.and_then(Self::countries_of) {
            Some(members) => universe
                .iter()
                .filter(|country| members.contains(&country.as_str()))
                .cloned()
                .collect(),
            None => universe.to_vec(),
        };
        candidates.sort();
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_listing() {
        assert_eq!(RegionRegistry::regions(), vec!["Caribe", "Centroamérica", "Sudamérica"]);
        assert!(RegionRegistry::countries_of("Sudamérica")
            .unwrap()
            .contains(&"Paraguay"));
        assert!(RegionRegistry::countries_of("Atlantis").is_none());
    }

    #[test]
    fn region_resolves_before_country_candidates() {
        let universe = vec![
            "Peru".to_string(),
            "Jamaica".to_string(),
            "Brazil".to_string(),
            "Mexico".to_string(),
        ];
        assert_eq!(
            RegionRegistry::narrow_candidates(Some("Sudamérica"), &universe),
            vec!["Brazil", "Peru"]
        );
        // No region keeps the full universe, sorted.
        assert_eq!(
            RegionRegistry::narrow_candidates(None, &universe),
            vec!["Brazil", "Jamaica", "Mexico", "Peru"]
        );
    }
}
