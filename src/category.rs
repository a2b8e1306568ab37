/// Extension-to-category classification.
///
/// This module builds the reverse lookup used by the sorter: the user
/// configures categories as `name -> [extensions]`, and the index flips that
/// into `extension -> category name` for O(1) lookups per file.
///
/// # Examples
///
/// ```
/// use droptidy::category::{CategoryRule, ExtensionIndex};
///
/// let index = ExtensionIndex::build(&[CategoryRule::new("Images", &[".jpg", ".png"])]);
/// assert_eq!(index.category_for("jpg"), Some("Images"));
/// assert_eq!(index.category_for(".PNG"), Some("Images"));
/// assert_eq!(index.category_for("pdf"), None);
/// ```
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single configured category: a folder name and the extensions it claims.
///
/// Rules are kept in a `Vec` rather than a map so that the order the user
/// wrote them in is preserved; see [`ExtensionIndex::build`] for why order
/// matters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Subfolder name files of this category are moved into (e.g. "Images").
    pub name: String,
    /// Extensions belonging to this category, with or without a leading dot.
    pub extensions: Vec<String>,
}

impl CategoryRule {
    pub fn new(name: &str, extensions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Reverse lookup from a lowercase file extension to a category name.
///
/// Built once from the configured rules and immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct ExtensionIndex {
    map: HashMap<String, String>,
}

impl ExtensionIndex {
    /// Builds the index from category rules in order.
    ///
    /// Extensions are normalized (one leading dot stripped, lowercased)
    /// before insertion. If the same extension appears under more than one
    /// category, the rule listed last wins — this is the documented
    /// conflict-resolution policy, not an accident of iteration order.
    ///
    /// Pure and deterministic: an empty rule list yields an empty index, and
    /// building twice from the same rules yields identical results.
    pub fn build(rules: &[CategoryRule]) -> Self {
        let mut map = HashMap::new();
        for rule in rules {
            for ext in &rule.extensions {
                map.insert(normalize_extension(ext), rule.name.clone());
            }
        }
        Self { map }
    }

    /// Looks up the category for a file extension, case-insensitively.
    ///
    /// The extension may be given with or without its leading dot. Returns
    /// `None` for unconfigured extensions; the sorter maps that to its fixed
    /// "Other" bucket.
    pub fn category_for(&self, ext: &str) -> Option<&str> {
        self.map.get(&normalize_extension(ext)).map(String::as_str)
    }

    /// Number of distinct extensions in the index.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Strips one leading dot and lowercases, so ".PDF", "PDF" and "pdf" all
/// index the same entry.
fn normalize_extension(ext: &str) -> String {
    ext.strip_prefix('.').unwrap_or(ext).to_lowercase()
}
