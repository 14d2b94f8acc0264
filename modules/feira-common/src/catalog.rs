/// Product categories the marketplace knows, in match-priority order.
pub const DEFAULT_CATEGORIES: [&str; 5] = ["Artesanato", "Alimentos", "Vestuário", "Doces", "Decoração"];

/// Ordered, closed set of category names.
///
/// Order matters: when a text mentions several categories the earliest entry
/// in the catalog wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCatalog {
    names: Vec<String>,
}

impl CategoryCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .map(|n: String| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First catalog entry whose lowercase name occurs in `lowercase_text`.
    pub fn first_mentioned_in(&self, lowercase_text: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|name| lowercase_text.contains(&name.to_lowercase()))
            .map(String::as_str)
    }

    /// Canonical spelling of a category name, matched case-insensitively.
    pub fn canonical(&self, name: &str) -> Option<&str> {
        let wanted = name.trim().to_lowercase();
        self.names
            .iter()
            .find(|n| n.to_lowercase() == wanted)
            .map(String::as_str)
    }
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES)
    }
}
