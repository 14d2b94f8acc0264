use feira_common::{SearchFilters, SIMPLE_TEXT_SEARCH};

/// Human-readable summary of a filter set.
///
/// Clauses appear in a fixed order (category, max price, min price, keywords,
/// organization) joined by `"; "`. An empty filter set reads as a simple text
/// search.
pub fn describe(filters: &SearchFilters) -> String {
    let mut parts = Vec::new();

    if let Some(ref category) = filters.category {
        parts.push(format!("Category: {category}"));
    }
    if let Some(max) = filters.price_max {
        parts.push(format!("Max price: R$ {max}"));
    }
    if let Some(min) = filters.price_min {
        parts.push(format!("Min price: R$ {min}"));
    }
    if !filters.keywords.is_empty() {
        parts.push(format!("Keywords: {}", filters.keywords.join(", ")));
    }
    if let Some(ref organization) = filters.organization {
        parts.push(format!("Organization: {organization}"));
    }

    if parts.is_empty() {
        SIMPLE_TEXT_SEARCH.to_string()
    } else {
        parts.join("; ")
    }
}
