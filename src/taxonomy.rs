//! Macro-sector taxonomy registry.
//!
//! Maps free-text sector labels onto a fixed macro-sector taxonomy. Two
//! hand-maintained generations of the table exist in the source data
//! ([`TaxonomyVersion`]); both are carried here verbatim so the caller picks
//! one explicitly instead of the mapping being an accident of which page was
//! rendered last.

use std::collections::HashMap;

use crate::schema::sentinel;

/// Normalize a sector label for robust matching: case-fold, trim, treat
/// `-` and `/` as spaces, collapse internal whitespace.
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let replaced: String = lowered
        .chars()
        .map(|c| if c == '-' || c == '/' { ' ' } else { c })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Which generation of the curated sector → macro-sector table to use.
///
/// The two tables disagree on the bucket for a handful of labels (e.g.
/// "Privatisation" is Gobernanza/Público in the legacy table and Productivo
/// in the revised one). That disagreement is a data-ownership question; the
/// registry refuses to merge them silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxonomyVersion {
    /// Six-bucket table (Social, Productivo, Infraestructura, Ambiental,
    /// Gobernanza/Público, Multisectorial/Otros) plus the 44 additions
    /// detected as missing from the database.
    Legacy,
    /// Reworked table with dedicated Financiero, Ambiente y Clima,
    /// Institucional y Gobernanza, Emergencia, Programático y Deuda and
    /// Administrativo / No asignado buckets.
    Revised,
}

/// Canonical macro-sector → sector-name mapping with a normalized reverse
/// index built once at construction. Read-only afterwards.
pub struct TaxonomyRegistry {
    /// Macro-sectors in registration order, each with its ordered,
    /// deduplicated sector list.
    groups: Vec<(String, Vec<String>)>,
    /// normalized(sector_name) → macro_sector. Last registration wins.
    index: HashMap<String, String>,
}

impl TaxonomyRegistry {
    pub fn new(version: TaxonomyVersion) -> Self {
        match version {
            TaxonomyVersion::Legacy => Self::legacy(),
            TaxonomyVersion::Revised => Self::revised(),
        }
    }

    /// The six-bucket table plus its supplementary additions.
    pub fn legacy() -> Self {
        let mut registry = Self::empty();
        for (macro_sector, sectors) in LEGACY_GROUPS {
            for sector in *sectors {
                registry.register(macro_sector, sector);
            }
        }
        registry.extend(LEGACY_ADDITIONS.iter().copied());
        tracing::debug!(
            macro_sectors = registry.groups.len(),
            sectors = registry.index.len(),
            "built legacy taxonomy registry"
        );
        registry
    }

    /// The reworked per-sector table.
    pub fn revised() -> Self {
        let mut registry = Self::empty();
        registry.extend(REVISED_PAIRS.iter().copied());
        tracing::debug!(
            macro_sectors = registry.groups.len(),
            sectors = registry.index.len(),
            "built revised taxonomy registry"
        );
        registry
    }

    /// Build a registry from explicit (macro_sector, sector_name) pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut registry = Self::empty();
        registry.extend(pairs);
        registry
    }

    fn empty() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register additional (macro_sector, sector_name) pairs, e.g. a
    /// supplementary table of detected-but-unmapped sectors. Duplicate
    /// sector names update the reverse index (last wins) without
    /// duplicating group entries.
    pub fn extend<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) {
        for (macro_sector, sector) in pairs {
            self.register(macro_sector, sector);
        }
    }

    fn register(&mut self, macro_sector: &str, sector: &str) {
        let pos = match self
            .groups
            .iter()
            .position(|(name, _)| name == macro_sector)
        {
            Some(pos) => pos,
            None => {
                self.groups.push((macro_sector.to_string(), Vec::new()));
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[pos].1;
        if !group.iter().any(|s| s == sector) {
            group.push(sector.to_string());
        }
        self.index
            .insert(normalize(sector), macro_sector.to_string());
    }

    /// Resolve a raw sector label to its macro-sector.
    ///
    /// Never fails: missing input or an unknown label resolves to the
    /// `"No clasificado"` sentinel.
    pub fn classify(&self, raw: Option<&str>) -> &str {
        let Some(raw) = raw else {
            return sentinel::UNCLASSIFIED;
        };
        self.index
            .get(&normalize(raw))
            .map(String::as_str)
            .unwrap_or(sentinel::UNCLASSIFIED)
    }

    /// Macro-sector names in registration order.
    pub fn macro_sectors(&self) -> Vec<&str> {
        self.groups.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Ordered, deduplicated sector list of one macro-sector.
    pub fn sectors_of(&self, macro_sector: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(name, _)| name == macro_sector)
            .map(|(_, sectors)| sectors.as_slice())
    }
}

/// Policy override applied after classification, not a registry rule: the
/// literal "Sectors not specified" label lands in its own administrative
/// bucket regardless of what the registry says.
pub fn unassigned_override<'a>(raw: Option<&str>, classified: &'a str) -> &'a str {
    if raw == Some(sentinel::SECTORS_NOT_SPECIFIED) {
        sentinel::UNASSIGNED
    } else {
        classified
    }
}

// ── Legacy table ────────────────────────────────────────────────────────────

static LEGACY_GROUPS: &[(&str, &[&str])] = &[
    (
        "Social",
        &[
            "Health",
            "Health education",
            "Health personnel development",
            "Health policy and administrative management",
            "Basic health care",
            "Basic health infrastructure",
            "Medical services",
            "Medical education/training",
            "Reproductive health care",
            "STD control including HIV/AIDS",
            "Malaria control",
            "Tuberculosis control",
            "Basic nutrition",
            "Family planning",
            "Education",
            "Education facilities and training",
            "Education policy and administrative management",
            "Early childhood education",
            "Higher education",
            "Lower secondary education",
            "Upper Secondary Education (modified and includes data from 11322)",
            "Teacher training",
            "Trade education/training",
            "Vocational training",
            "Educational research",
            "Basic life skills for youth",
            "Recreation and sport",
            "Social protection",
            "Social protection and welfare services policy, planning and administration",
            "Social services (incl youth development and women+ children)",
            "Civil service pensions",
            "General pensions",
        ],
    ),
    (
        "Productivo",
        &[
            "Agriculture, forestry and fishing",
            "Agricultural development",
            "Agricultural co-operatives",
            "Agricultural extension",
            "Agricultural education/training",
            "Agricultural inputs",
            "Agricultural land resources",
            "Agricultural alternative development",
            "Agricultural policy and administrative management",
            "Agricultural financial services",
            "Agricultural research",
            "Agricultural services",
            "Agricultural water resources",
            "Agro-industries",
            "Livestock",
            "Fishery development",
            "Fishery services",
            "Fishing policy and administrative management",
            "Forestry development",
            "Forestry policy and administrative management",
            "Industry, mining, construction",
            "Industrial development",
            "Industrial policy and administrative management",
            "Technological research and development",
            "Business policy and administration",
            "Small and medium-sized enterprises (SME) development",
            "Tourism policy and administrative management",
            "Responsible business conduct",
            "Banking and financial services",
            "Formal sector financial intermediaries",
            "Informal/semi-formal financial intermediaries",
            "Monetary institutions",
            "Financial policy and administrative management",
            "Retail gas distribution",
        ],
    ),
    (
        "Infraestructura",
        &[
            "Transport and storage",
            "Transport policy, planning and administration",
            "Transport regulation",
            "Feeder road construction",
            "National road construction",
            "Rail transport",
            "Water transport",
            "Air transport",
            "Public transport services",
            "Water supply and sanitation",
            "Water supply and sanitation - large systems",
            "Basic drinking water supply",
            "Basic drinking water supply and basic sanitation",
            "Basic sanitation",
            "Sanitation - large systems",
            "Waste management/disposal",
            "Water supply - large systems",
            "Electric power transmission and distribution (centralised grids)",
            "Energy generation and supply",
            "Energy generation, renewable sources - multiple technologies",
            "Energy sector policy, planning and administration",
            "Energy conservation and demand-side efficiency",
            "Hydro-electric power plants",
            "Geothermal energy",
            "Oil and gas (upstream)",
            "Solar energy for centralised grids",
            "Construction policy and administrative management",
            "Information and communication technology (ICT)",
            "Telecommunications",
            "Communications policy, planning and administration",
            "Urban development",
            "Urban land policy and management",
            "Rural development",
            "Rural land policy and management",
            "Low-cost housing",
            "Housing policy and administrative management",
            "Transport policy and administrative management",
            "Transport & Storage",
        ],
    ),
    (
        "Ambiental",
        &[
            "Environmental policy and administrative management",
            "Environmental research",
            "Biodiversity",
            "Biosphere protection",
            "Flood prevention/control",
            "Disaster Risk Reduction",
            "Disaster prevention and preparedness",
            "Multi-hazard response preparedness",
            "Water resources conservation (including data collection)",
            "River basins development",
            "Site preservation",
        ],
    ),
    (
        "Gobernanza/Público",
        &[
            "Public sector policy and administrative management",
            "Budget planning",
            "General budget support-related aid",
            "Macroeconomic policy",
            "Debt and aid management",
            "Other general public services",
            "Other central transfers to institutions",
            "National monitoring and evaluation",
            "Justice, law and order policy, planning and administration",
            "Civilian peace-building, conflict prevention and resolution",
            "Security system management and reform",
            "Immigration",
            "Human rights",
            "Democratic participation and civil society",
            "Anti-corruption organisations and institutions",
            "Ending violence against women and girls",
            "Women's rights organisations and movements, and government institutions",
            "Foreign affairs",
            "Tax collection",
            "Tax policy and administration support",
            "Local government administration",
            "Local government finance",
            "Privatisation",
        ],
    ),
    (
        "Multisectorial/Otros",
        &[
            "Other multisector",
            "Sectors not specified",
            "Multisector aid for basic social services",
            "Immediate post-emergency reconstruction and rehabilitation",
            "Material relief assistance and services",
            "Relief co-ordination and support services",
        ],
    ),
];

/// Additions detected as missing from the database, appended to the legacy
/// table without duplicating existing entries.
static LEGACY_ADDITIONS: &[(&str, &str)] = &[
    ("Gobernanza/Público", "Government & Civil Society-general"),
    ("Gobernanza/Público", "Water sector policy and administrative management"),
    ("Infraestructura", "Biofuel-fired power plants"),
    ("Infraestructura", "Communications"),
    ("Infraestructura", "Education and training in water supply and sanitation"),
    ("Infraestructura", "Electrical transmission/ distribution"),
    ("Infraestructura", "Employment creation"),
    ("Infraestructura", "Energy generation, non-renewable sources, unspecified"),
    ("Infraestructura", "Information services"),
    ("Infraestructura", "Power generation/non-renewable sources"),
    ("Infraestructura", "Power generation/renewable sources"),
    ("Infraestructura", "Public Procurement"),
    ("Infraestructura", "Public finance management (PFM)"),
    ("Infraestructura", "Road transport"),
    ("Infraestructura", "Trade facilitation"),
    ("Infraestructura", "Trade policy and administrative management"),
    ("Infraestructura", "Urban development and management"),
    ("Multisectorial/Otros", "Decentralisation and support to subnational government"),
    ("Multisectorial/Otros", "Education, Level Unspecified"),
    ("Multisectorial/Otros", "Multisector aid"),
    ("Multisectorial/Otros", "Other Social Infrastructure & Services"),
    ("Multisectorial/Otros", "Plant and post-harvest protection and pest control"),
    ("Productivo", "Agriculture"),
    ("Productivo", "Domestic revenue mobilisation"),
    ("Productivo", "Energy policy and administrative management"),
    ("Productivo", "Fishery research"),
    ("Productivo", "Forestry research"),
    ("Productivo", "Forestry services"),
    ("Productivo", "Industry"),
    ("Productivo", "Legal and judicial development"),
    ("Productivo", "Livestock/veterinary services"),
    ("Productivo", "Mineral/mining policy and administrative management"),
    ("Social", "Advanced technical and managerial training"),
    ("Social", "Coal"),
    ("Social", "Communications policy and administrative management"),
    ("Social", "Food crop production"),
    ("Social", "Health, General"),
    ("Social", "Infectious disease control"),
    ("Social", "Mineral prospection and exploration"),
    ("Social", "Narcotics control"),
    ("Social", "Population policy and administrative management"),
    ("Social", "Primary education"),
    ("Social", "Social mitigation of HIV/AIDS"),
    ("Social", "Statistical capacity building"),
];

// ── Revised table ───────────────────────────────────────────────────────────

static REVISED_PAIRS: &[(&str, &str)] = &[
    // Social
    ("Social", "Advanced technical and managerial training"),
    ("Social", "Basic health care"),
    ("Social", "Basic health infrastructure"),
    ("Social", "Basic life skills for youth"),
    ("Social", "Basic nutrition"),
    ("Social", "Civil service pensions"),
    ("Social", "Early childhood education"),
    ("Social", "Education facilities and training"),
    ("Social", "Education policy and administrative management"),
    ("Social", "Educational research"),
    ("Social", "Employment creation"),
    ("Social", "Family planning"),
    ("Social", "General pensions"),
    ("Social", "Health education"),
    ("Social", "Health personnel development"),
    ("Social", "Health policy and administrative management"),
    ("Social", "Higher education"),
    ("Social", "Housing policy and administrative management"),
    ("Social", "Infectious disease control"),
    ("Social", "Low-cost housing"),
    ("Social", "Lower secondary education"),
    ("Social", "Malaria control"),
    ("Social", "Medical education/training"),
    ("Social", "Medical services"),
    ("Social", "Multisector aid for basic social services"),
    ("Social", "Narcotics control"),
    ("Social", "Population policy and administrative management"),
    ("Social", "Primary education"),
    ("Social", "Recreation and sport"),
    ("Social", "Reproductive health care"),
    ("Social", "STD control including HIV/AIDS"),
    ("Social", "Social Protection"),
    ("Social", "Social mitigation of HIV/AIDS"),
    (
        "Social",
        "Social protection and welfare services policy, planning and administration",
    ),
    ("Social", "Social services (incl youth development and women+ children)"),
    ("Social", "Statistical capacity building"),
    ("Social", "Teacher training"),
    ("Social", "Tuberculosis control"),
    (
        "Social",
        "Upper Secondary Education (modified and includes data from 11322)",
    ),
    ("Social", "Vocational training"),
    // Infraestructura
    ("Infraestructura", "Air transport"),
    ("Infraestructura", "Basic drinking water supply"),
    ("Infraestructura", "Basic drinking water supply and basic sanitation"),
    ("Infraestructura", "Basic sanitation"),
    ("Infraestructura", "Biofuel-fired power plants"),
    ("Infraestructura", "Communications policy and administrative management"),
    ("Infraestructura", "Communications policy, planning and administration"),
    ("Infraestructura", "Education and training in water supply and sanitation"),
    (
        "Infraestructura",
        "Electric power transmission and distribution (centralised grids)",
    ),
    ("Infraestructura", "Electrical transmission/ distribution"),
    ("Infraestructura", "Energy conservation and demand-side efficiency"),
    ("Infraestructura", "Energy generation, non-renewable sources, unspecified"),
    (
        "Infraestructura",
        "Energy generation, renewable sources - multiple technologies",
    ),
    ("Infraestructura", "Energy policy and administrative management"),
    ("Infraestructura", "Energy sector policy, planning and administration"),
    ("Infraestructura", "Feeder road construction"),
    ("Infraestructura", "Geothermal energy"),
    ("Infraestructura", "Hydro-electric power plants"),
    ("Infraestructura", "Information and communication technology (ICT)"),
    ("Infraestructura", "Information services"),
    ("Infraestructura", "National road construction"),
    ("Infraestructura", "Power generation/non-renewable sources"),
    ("Infraestructura", "Power generation/renewable sources"),
    ("Infraestructura", "Public transport services"),
    ("Infraestructura", "Rail transport"),
    ("Infraestructura", "Retail gas distribution"),
    ("Infraestructura", "River basins development"),
    ("Infraestructura", "Road transport"),
    ("Infraestructura", "Sanitation - large systems"),
    ("Infraestructura", "Solar energy for centralised grids"),
    ("Infraestructura", "Telecommunications"),
    ("Infraestructura", "Transport policy and administrative management"),
    ("Infraestructura", "Transport policy, planning and administration"),
    ("Infraestructura", "Transport regulation"),
    ("Infraestructura", "Waste management/disposal"),
    ("Infraestructura", "Water resources conservation (including data collection)"),
    ("Infraestructura", "Water sector policy and administrative management"),
    ("Infraestructura", "Water supply - large systems"),
    ("Infraestructura", "Water supply and sanitation - large systems"),
    ("Infraestructura", "Water transport"),
    // Productivo
    ("Productivo", "Agricultural alternative development"),
    ("Productivo", "Agricultural co-operatives"),
    ("Productivo", "Agricultural development"),
    ("Productivo", "Agricultural education/training"),
    ("Productivo", "Agricultural extension"),
    ("Productivo", "Agricultural financial services"),
    ("Productivo", "Agricultural inputs"),
    ("Productivo", "Agricultural land resources"),
    ("Productivo", "Agricultural policy and administrative management"),
    ("Productivo", "Agricultural research"),
    ("Productivo", "Agricultural services"),
    ("Productivo", "Agricultural water resources"),
    ("Productivo", "Agro-industries"),
    ("Productivo", "Business policy and administration"),
    ("Productivo", "Coal"),
    ("Productivo", "Construction policy and administrative management"),
    ("Productivo", "Fishery development"),
    ("Productivo", "Fishery research"),
    ("Productivo", "Fishery services"),
    ("Productivo", "Fishing policy and administrative management"),
    ("Productivo", "Food crop production"),
    ("Productivo", "Forestry development"),
    ("Productivo", "Forestry policy and administrative management"),
    ("Productivo", "Forestry research"),
    ("Productivo", "Forestry services"),
    ("Productivo", "Industrial development"),
    ("Productivo", "Industrial policy and administrative management"),
    ("Productivo", "Livestock"),
    ("Productivo", "Livestock/veterinary services"),
    ("Productivo", "Mineral prospection and exploration"),
    ("Productivo", "Mineral/mining policy and administrative management"),
    ("Productivo", "Oil and gas (upstream)"),
    ("Productivo", "Plant and post-harvest protection and pest control"),
    ("Productivo", "Privatisation"),
    ("Productivo", "Responsible business conduct"),
    ("Productivo", "Small and medium-sized enterprises (SME) development"),
    ("Productivo", "Technological research and development"),
    ("Productivo", "Tourism policy and administrative management"),
    ("Productivo", "Trade education/training"),
    ("Productivo", "Trade facilitation"),
    ("Productivo", "Trade policy and administrative management"),
    // Financiero
    ("Financiero", "Financial policy and administrative management"),
    ("Financiero", "Formal sector financial intermediaries"),
    ("Financiero", "Informal/semi-formal financial intermediaries"),
    ("Financiero", "Monetary institutions"),
    // Ambiente y Clima
    ("Ambiente y Clima", "Biodiversity"),
    ("Ambiente y Clima", "Biosphere protection"),
    ("Ambiente y Clima", "Environmental policy and administrative management"),
    ("Ambiente y Clima", "Environmental research"),
    ("Ambiente y Clima", "Flood prevention/control"),
    ("Ambiente y Clima", "Site preservation"),
    // Multisector
    ("Multisector", "Disaster Risk Reduction"),
    ("Multisector", "Multisector aid"),
    ("Multisector", "Rural development"),
    ("Multisector", "Rural land policy and management"),
    ("Multisector", "Urban development"),
    ("Multisector", "Urban development and management"),
    ("Multisector", "Urban land policy and management"),
    // Programático y Deuda
    ("Programático y Deuda", "General budget support-related aid"),
    // Institucional y Gobernanza
    ("Institucional y Gobernanza", "Anti-corruption organisations and institutions"),
    ("Institucional y Gobernanza", "Budget planning"),
    (
        "Institucional y Gobernanza",
        "Civilian peace-building, conflict prevention and resolution",
    ),
    ("Institucional y Gobernanza", "Debt and aid management"),
    (
        "Institucional y Gobernanza",
        "Decentralisation and support to subnational government",
    ),
    ("Institucional y Gobernanza", "Democratic participation and civil society"),
    ("Institucional y Gobernanza", "Domestic revenue mobilisation"),
    ("Institucional y Gobernanza", "Ending violence against women and girls"),
    ("Institucional y Gobernanza", "Foreign affairs"),
    ("Institucional y Gobernanza", "Human rights"),
    ("Institucional y Gobernanza", "Immigration"),
    (
        "Institucional y Gobernanza",
        "Justice, law and order policy, planning and administration",
    ),
    ("Institucional y Gobernanza", "Legal and judicial development"),
    ("Institucional y Gobernanza", "Local government administration"),
    ("Institucional y Gobernanza", "Local government finance"),
    ("Institucional y Gobernanza", "Macroeconomic policy"),
    ("Institucional y Gobernanza", "National monitoring and evaluation"),
    ("Institucional y Gobernanza", "Other central transfers to institutions"),
    ("Institucional y Gobernanza", "Other general public services"),
    ("Institucional y Gobernanza", "Public Procurement"),
    ("Institucional y Gobernanza", "Public finance management (PFM)"),
    (
        "Institucional y Gobernanza",
        "Public sector policy and administrative management",
    ),
    ("Institucional y Gobernanza", "Security system management and reform"),
    ("Institucional y Gobernanza", "Tax collection"),
    ("Institucional y Gobernanza", "Tax policy and administration support"),
    (
        "Institucional y Gobernanza",
        "Women's rights organisations and movements, and government institutions",
    ),
    // Emergencia
    ("Emergencia", "Disaster prevention and preparedness"),
    ("Emergencia", "Immediate post-emergency reconstruction and rehabilitation"),
    ("Emergencia", "Material relief assistance and services"),
    ("Emergencia", "Multi-hazard response preparedness"),
    ("Emergencia", "Relief co-ordination and support services"),
    // Administrativo / No asignado
    ("Administrativo / No asignado", "Sectors not specified"),
    // Explicitly unclassified legacy labels
    ("No clasificado", "Agriculture"),
    ("No clasificado", "Banking & Financial Services"),
    ("No clasificado", "Communications"),
    ("No clasificado", "ENERGY GENERATION AND SUPPLY"),
    ("No clasificado", "Education, Level Unspecified"),
    ("No clasificado", "Government & Civil Society-general"),
    ("No clasificado", "Health, General"),
    ("No clasificado", "Industry"),
    ("No clasificado", "Other Multisector"),
    ("No clasificado", "Other Social Infrastructure & Services"),
    ("No clasificado", "Transport & Storage"),
    ("No clasificado", "Water Supply & Sanitation"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_formatting() {
        assert_eq!(normalize("  Agro-industries "), "agro industries");
        assert_eq!(normalize("Medical education/training"), "medical education training");
        assert_eq!(normalize("BASIC   nutrition"), "basic nutrition");
    }

    #[test]
    fn classify_matches_canonical_form() {
        let registry = TaxonomyRegistry::legacy();
        assert_eq!(registry.classify(Some("Basic nutrition")), "Social");
        assert_eq!(registry.classify(Some("Rail transport")), "Infraestructura");
    }

    #[test]
    fn classify_is_robust_to_case_whitespace_and_separators() {
        let registry = TaxonomyRegistry::legacy();
        let canonical = registry.classify(Some("Agro-industries"));
        assert_eq!(registry.classify(Some("agro industries")), canonical);
        assert_eq!(registry.classify(Some("  AGRO-INDUSTRIES  ")), canonical);
        assert_eq!(registry.classify(Some("agro/industries")), canonical);
    }

    #[test]
    fn unknown_and_missing_labels_resolve_to_sentinel() {
        let registry = TaxonomyRegistry::legacy();
        assert_eq!(registry.classify(Some("Quantum basket weaving")), sentinel::UNCLASSIFIED);
        assert_eq!(registry.classify(None), sentinel::UNCLASSIFIED);
    }

    #[test]
    fn extension_table_needs_no_code_change() {
        let mut registry = TaxonomyRegistry::from_pairs([("Social", "Health")]);
        assert_eq!(registry.classify(Some("School meals")), sentinel::UNCLASSIFIED);
        registry.extend([("Social", "School meals")]);
        assert_eq!(registry.classify(Some("School meals")), "Social");
    }

    #[test]
    fn last_registration_wins_on_duplicates() {
        let registry =
            TaxonomyRegistry::from_pairs([("Social", "Health"), ("Productivo", "Health")]);
        assert_eq!(registry.classify(Some("Health")), "Productivo");
    }

    #[test]
    fn revised_table_has_dedicated_buckets() {
        let registry = TaxonomyRegistry::revised();
        assert_eq!(registry.classify(Some("Monetary institutions")), "Financiero");
        assert_eq!(registry.classify(Some("Biodiversity")), "Ambiente y Clima");
        assert_eq!(
            registry.classify(Some("Disaster prevention and preparedness")),
            "Emergencia"
        );
    }

    #[test]
    fn sectors_not_specified_override_is_caller_policy() {
        let registry = TaxonomyRegistry::legacy();
        // The legacy table itself buckets the label under Multisectorial/Otros.
        let classified = registry.classify(Some(sentinel::SECTORS_NOT_SPECIFIED));
        assert_eq!(classified, "Multisectorial/Otros");
        assert_eq!(
            unassigned_override(Some(sentinel::SECTORS_NOT_SPECIFIED), classified),
            sentinel::UNASSIGNED
        );
        assert_eq!(unassigned_override(Some("Health"), "Social"), "Social");
    }

    #[test]
    fn group_listing_is_ordered_and_deduplicated() {
        let registry = TaxonomyRegistry::legacy();
        let socials = registry.sectors_of("Social").unwrap();
        assert_eq!(socials[0], "Health");
        let unique: std::collections::HashSet<_> = socials.iter().collect();
        assert_eq!(unique.len(), socials.len());
    }
}
