use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalizer::fold_text;

/// Alias tables used to canonicalize places and nationality claims.
///
/// Keys and values are folded when the table is handed to a
/// `RecordNormalizer`, so callers may write them in any casing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleTable {
    #[serde(default)]
    pub place_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub nationality_aliases: BTreeMap<String, String>,
}

const PLACE_ALIASES: &[(&str, &str)] = &[
    ("s paulo", "sao paulo"),
    ("sampa", "sao paulo"),
    ("sp", "sao paulo"),
    ("rio", "rio de janeiro"),
    ("bh", "belo horizonte"),
    ("poa", "porto alegre"),
    ("bs as", "buenos aires"),
    ("caba", "buenos aires"),
    ("capital federal", "buenos aires"),
    ("ciudad autonoma de buenos aires", "buenos aires"),
    ("roma", "rome"),
    ("milano", "milan"),
    ("napoli", "naples"),
    ("torino", "turin"),
    ("firenze", "florence"),
    ("genova", "genoa"),
    ("venezia", "venice"),
    ("citta di san marino", "san marino"),
];

const NATIONALITY_ALIASES: &[(&str, &str)] = &[
    ("italian", "italy"),
    ("italiana", "italy"),
    ("italiano", "italy"),
    ("italia", "italy"),
    ("ita", "italy"),
    ("brazilian", "brazil"),
    ("brasileiro", "brazil"),
    ("brasileira", "brazil"),
    ("brasil", "brazil"),
    ("bra", "brazil"),
    ("argentine", "argentina"),
    ("argentinian", "argentina"),
    ("argentino", "argentina"),
    ("arg", "argentina"),
    ("sammarinese", "san marino"),
    ("smr", "san marino"),
    ("uruguayan", "uruguay"),
    ("uruguayo", "uruguay"),
    ("uru", "uruguay"),
    ("spanish", "spain"),
    ("espanol", "spain"),
    ("espana", "spain"),
    ("portuguese", "portugal"),
    ("portugues", "portugal"),
    ("german", "germany"),
    ("deutschland", "germany"),
    ("french", "france"),
    ("francais", "france"),
];

impl Default for LocaleTable {
    fn default() -> Self {
        let collect = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(alias, canonical)| (alias.to_string(), canonical.to_string()))
                .collect()
        };
        Self {
            place_aliases: collect(PLACE_ALIASES),
            nationality_aliases: collect(NATIONALITY_ALIASES),
        }
    }
}

impl LocaleTable {
    /// A table with no aliases: places and claims are only folded
    pub fn empty() -> Self {
        Self {
            place_aliases: BTreeMap::new(),
            nationality_aliases: BTreeMap::new(),
        }
    }

    pub fn with_place_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.place_aliases.insert(alias.to_string(), canonical.to_string());
        self
    }

    pub fn with_nationality_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.nationality_aliases.insert(alias.to_string(), canonical.to_string());
        self
    }

    pub(crate) fn into_folded(self) -> Self {
        let fold_map = |map: BTreeMap<String, String>| {
            map.into_iter()
                .map(|(alias, canonical)| (fold_text(&alias), fold_text(&canonical)))
                .filter(|(alias, canonical)| !alias.is_empty() && !canonical.is_empty())
                .collect()
        };
        Self {
            place_aliases: fold_map(self.place_aliases),
            nationality_aliases: fold_map(self.nationality_aliases),
        }
    }

    /// Expects an already-folded token
    pub fn canonical_place(&self, folded: &str) -> String {
        self.place_aliases
            .get(folded)
            .cloned()
            .unwrap_or_else(|| folded.to_string())
    }

    /// Expects an already-folded token
    pub fn canonical_nationality(&self, folded: &str) -> String {
        self.nationality_aliases
            .get(folded)
            .cloned()
            .unwrap_or_else(|| folded.to_string())
    }
}
