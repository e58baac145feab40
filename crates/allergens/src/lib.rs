//! Allergen reference table.
//!
//! Maps a canonical allergy label (`"milk"`) to the lexical variants that also
//! indicate its presence (`"cheese"`, `"whey"`, ...). The built-in table covers
//! the 14 common allergen categories; a replacement can be loaded from versioned
//! JSON and is validated before use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// Version of the JSON table format understood by [`AllergenVariantTable::from_json`].
pub const TABLE_FORMAT_VERSION: u32 = 1;

/// Built-in categories. Variant order is significant: the matcher reports the
/// first variant that hits.
const BUILTIN_ALLERGENS: &[(&str, &[&str])] = &[
    ("peanuts", &["peanut", "peanuts", "groundnut", "groundnuts"]),
    (
        "tree-nuts",
        &[
            "almond",
            "almonds",
            "walnut",
            "walnuts",
            "cashew",
            "cashews",
            "pecan",
            "pecans",
            "pistachio",
            "pistachios",
            "hazelnut",
            "hazelnuts",
            "brazil nut",
            "brazil nuts",
            "macadamia nut",
            "macadamia nuts",
        ],
    ),
    (
        "milk",
        &[
            "milk", "dairy", "cheese", "cheeses", "butter", "cream", "yogurt", "yoghurt",
            "casein", "whey", "lactose",
        ],
    ),
    ("eggs", &["egg", "eggs", "albumin"]),
    (
        "fish",
        &[
            "fish", "fishes", "salmon", "tuna", "cod", "trout", "bass", "anchovy", "herring",
            "mackerel", "sardine",
        ],
    ),
    (
        "shellfish",
        &[
            "shrimp", "prawn", "crab", "lobster", "scallops", "mussels", "oysters", "clams",
            "squid", "octopus",
        ],
    ),
    (
        "soy",
        &[
            "soy", "soya", "soybean", "soybeans", "tofu", "tempeh", "edamame", "miso", "natto",
        ],
    ),
    (
        "wheat",
        &[
            "wheat", "gluten", "flour", "bread", "pasta", "noodles", "semolina", "bulgur",
            "couscous",
        ],
    ),
    ("sesame", &["sesame", "tahini", "halvah", "gingelly"]),
    ("mustard", &["mustard", "mustard seed", "mustard greens"]),
    ("celery", &["celery", "celeriac", "celery root"]),
    (
        "sulfites",
        &[
            "sulfite",
            "sulfur dioxide",
            "sodium bisulfite",
            "potassium bisulfite",
        ],
    ),
    ("lupin", &["lupin", "lupini beans"]),
    (
        "mollusks",
        &["mollusk", "mollusks", "snail", "snails", "slug", "slugs"],
    ),
];

static BUILTIN: LazyLock<AllergenVariantTable> = LazyLock::new(|| {
    let entries = BUILTIN_ALLERGENS
        .iter()
        .map(|(label, variants)| AllergenEntry {
            label: (*label).to_string(),
            variants: variants.iter().map(|v| (*v).to_string()).collect(),
        })
        .collect();
    AllergenVariantTable::index(entries)
});

/// Errors from building or loading an allergen table.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("Unsupported table version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Allergen entry {0} has an empty label")]
    EmptyLabel(usize),

    #[error("Duplicate allergen label: {0}")]
    DuplicateLabel(String),

    #[error("Allergen '{0}' has no variants")]
    EmptyVariants(String),

    #[error("Allergen '{0}' has an empty variant")]
    EmptyVariant(String),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read table: {0}")]
    Io(#[from] std::io::Error),
}

/// One canonical allergen and its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllergenEntry {
    /// Canonical label, lowercase
    pub label: String,
    /// Variants in scan order, lowercase
    pub variants: Vec<String>,
}

impl AllergenEntry {
    pub fn new<I, S>(label: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label: label.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }
}

/// On-disk shape of a table.
#[derive(Debug, Serialize, Deserialize)]
struct TableFile {
    version: u32,
    allergens: Vec<AllergenEntry>,
}

/// Immutable lookup from allergy label to variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllergenVariantTable {
    entries: Vec<AllergenEntry>,
    by_label: HashMap<String, usize>,
}

impl AllergenVariantTable {
    /// The built-in 14-category table, constructed on first use.
    pub fn builtin() -> &'static AllergenVariantTable {
        &BUILTIN
    }

    /// Build a table from entries, normalizing and validating them.
    ///
    /// Labels and variants are trimmed and lowercased. Fails on empty labels,
    /// duplicate labels, empty variant lists, or empty variants.
    pub fn from_entries(entries: Vec<AllergenEntry>) -> Result<Self, TableError> {
        let mut normalized = Vec::with_capacity(entries.len());
        let mut seen = std::collections::HashSet::new();

        for (position, entry) in entries.into_iter().enumerate() {
            let label = normalize_key(&entry.label);
            if label.is_empty() {
                return Err(TableError::EmptyLabel(position));
            }
            if !seen.insert(label.clone()) {
                return Err(TableError::DuplicateLabel(label));
            }
            if entry.variants.is_empty() {
                return Err(TableError::EmptyVariants(label));
            }

            let mut variants = Vec::with_capacity(entry.variants.len());
            for variant in &entry.variants {
                let variant = normalize_key(variant);
                if variant.is_empty() {
                    return Err(TableError::EmptyVariant(label));
                }
                variants.push(variant);
            }

            normalized.push(AllergenEntry { label, variants });
        }

        Ok(Self::index(normalized))
    }

    /// Parse and validate a versioned JSON table.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        let file: TableFile = serde_json::from_str(json)?;
        if file.version != TABLE_FORMAT_VERSION {
            return Err(TableError::UnsupportedVersion {
                found: file.version,
                expected: TABLE_FORMAT_VERSION,
            });
        }
        let table = Self::from_entries(file.allergens)?;
        tracing::debug!(allergens = table.len(), "Loaded allergen table");
        Ok(table)
    }

    /// Read a versioned JSON table from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Serialize in the format accepted by [`Self::from_json`].
    pub fn to_json(&self) -> Result<String, TableError> {
        let file = TableFile {
            version: TABLE_FORMAT_VERSION,
            allergens: self.entries.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Variants for an allergy label, if the label is a known allergen.
    ///
    /// The label is trimmed and compared case-insensitively.
    pub fn lookup_variants(&self, label: &str) -> Option<&[String]> {
        self.by_label
            .get(&normalize_key(label))
            .map(|&i| self.entries[i].variants.as_slice())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.by_label.contains_key(&normalize_key(label))
    }

    /// Canonical labels in declared order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AllergenEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index(entries: Vec<AllergenEntry>) -> Self {
        let by_label = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.label.clone(), i))
            .collect();
        Self { entries, by_label }
    }
}

impl Default for AllergenVariantTable {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

fn normalize_key(text: &str) -> String {
    text.trim().to_lowercase()
}
