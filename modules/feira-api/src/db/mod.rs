pub mod logs;
pub mod products;

pub use logs::{LogActivitySink, LogQuery, LogRepository, LogStats, PgLogStore};
pub use products::{Pagination, PgProductStore, Product, ProductCatalog, ProductFilter};

/// `ILIKE` pattern matching `text` anywhere, with wildcards in `text` escaped.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcards_are_escaped() {
        assert_eq!(contains_pattern("doces"), "%doces%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }
}
