
use serde::Serialize;
use strum::IntoEnumIterator;

/// Cell values that classifiers emit for "no assignment"; compared case-insensitively
pub const MISSING_SENTINELS: [&str; 4] = ["unidentified", "unid.", "na", "n/a"];

/// The seven canonical taxonomic levels, in hierarchical order
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
    strum_macros::AsRefStr, strum_macros::Display, strum_macros::EnumIter, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TaxonomyLevel {
    Kingdom=0,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species
}

impl TaxonomyLevel {
    /// Number of levels, also the length of a `Taxonomy`
    pub const COUNT: usize = 7;

    /// Returns all the levels from kingdom to species.
    pub fn all() -> impl DoubleEndedIterator<Item = TaxonomyLevel> {
        TaxonomyLevel::iter()
    }

    /// The prefix used in UNITE-style lineage strings, e.g. `k__` for kingdom.
    pub fn prefix(&self) -> &'static str {
        match self {
            TaxonomyLevel::Kingdom => "k__",
            TaxonomyLevel::Phylum => "p__",
            TaxonomyLevel::Class => "c__",
            TaxonomyLevel::Order => "o__",
            TaxonomyLevel::Family => "f__",
            TaxonomyLevel::Genus => "g__",
            TaxonomyLevel::Species => "s__",
        }
    }

    /// Capitalized label used in the similarity-search export columns, e.g. "Kingdom"
    pub fn label(&self) -> &'static str {
        match self {
            TaxonomyLevel::Kingdom => "Kingdom",
            TaxonomyLevel::Phylum => "Phylum",
            TaxonomyLevel::Class => "Class",
            TaxonomyLevel::Order => "Order",
            TaxonomyLevel::Family => "Family",
            TaxonomyLevel::Genus => "Genus",
            TaxonomyLevel::Species => "Species",
        }
    }

    /// Finds the level whose prefix starts `token`, if any.
    pub fn from_prefixed(token: &str) -> Option<(TaxonomyLevel, &str)> {
        TaxonomyLevel::all()
            .find_map(|level| token.strip_prefix(level.prefix()).map(|value| (level, value)))
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Returns true if the value is one of the "no assignment" sentinels.
pub fn is_missing_sentinel(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    MISSING_SENTINELS.contains(&lowered.as_str())
}

/// A fixed kingdom-to-species lineage; unassigned levels are empty strings
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Taxonomy {
    values: [String; TaxonomyLevel::COUNT]
}

impl Taxonomy {
    /// Parses a `k__Fungi;p__Ascomycota;...` lineage string.
    /// Tokens without a known prefix are ignored, and a repeated prefix overwrites the earlier value.
    pub fn from_lineage(lineage: &str) -> Self {
        let mut taxonomy = Self::default();
        taxonomy.apply_lineage(lineage);
        taxonomy
    }

    /// Writes every prefixed token in `lineage` into this taxonomy, leaving other levels alone.
    pub fn apply_lineage(&mut self, lineage: &str) {
        for token in lineage.split(';') {
            if let Some((level, value)) = TaxonomyLevel::from_prefixed(token.trim()) {
                self.set(level, value.trim().to_string());
            }
        }
    }

    pub fn get(&self, level: TaxonomyLevel) -> &str {
        &self.values[level.index()]
    }

    pub fn set(&mut self, level: TaxonomyLevel, value: String) {
        self.values[level.index()] = value;
    }

    /// True if no level carries a value
    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|v| v.is_empty())
    }

    /// Replaces every sentinel value ("unidentified", "N/A", ...) with the empty string.
    pub fn clear_sentinels(&mut self) {
        for value in self.values.iter_mut() {
            if is_missing_sentinel(value) {
                value.clear();
            }
        }
    }
}
