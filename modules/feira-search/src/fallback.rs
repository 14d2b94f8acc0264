use std::sync::LazyLock;

use regex::{Captures, Regex};

use feira_common::{CategoryCatalog, Interpretation, SearchFilters};

use crate::summary::describe;

/// "até 50", "máximo de R$ 30,50", "< 20"
static RE_PRICE_MAX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:até|ate|máximo|maximo|max|menor que)|<=|<)\s*(?:de\s*)?r?\$?\s*([0-9]+(?:[.,][0-9]{1,2})?)")
        .expect("valid regex")
});

/// "a partir de 19,90", "mínimo 10", "> 5"
static RE_PRICE_MIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:a partir de|de|mínimo|minimo|min|maior que)|>=|>)\s*r?\$?\s*([0-9]+(?:[.,][0-9]{1,2})?)")
        .expect("valid regex")
});

/// Filler words never kept as keywords. Shorter tokens are dropped by length.
const STOP_WORDS: &[&str] = &[
    "ate", "até", "reais", "real", "por", "para", "com", "sem", "que", "uma", "uns", "das", "dos",
    "nas", "nos",
];

/// Rule-based query interpretation used whenever the interpreter is unavailable.
///
/// Pure and total: the same query always yields the same filters and
/// interpretation, and no input makes it fail.
#[derive(Debug, Clone, Default)]
pub struct FallbackParser {
    catalog: CategoryCatalog,
}

impl FallbackParser {
    pub fn new(catalog: CategoryCatalog) -> Self {
        Self { catalog }
    }

    pub fn parse(&self, query: &str) -> Interpretation {
        let lowercase = query.to_lowercase();

        let category = self
            .catalog
            .first_mentioned_in(&lowercase)
            .map(str::to_string);

        let max_match = RE_PRICE_MAX.captures(&lowercase);
        let price_max = max_match.as_ref().and_then(price_from);

        // A min-phrase inside the max phrase ("máximo de 50") is not a lower bound.
        let max_span = max_match.as_ref().and_then(|c| c.get(0)).map(|m| m.range());
        let price_min = RE_PRICE_MIN
            .captures_iter(&lowercase)
            .find(|c| match (&max_span, c.get(0)) {
                (Some(span), Some(m)) => !span.contains(&m.start()),
                _ => true,
            })
            .as_ref()
            .and_then(price_from);

        let filters = SearchFilters {
            category,
            price_min,
            price_max,
            keywords: keywords(&lowercase),
            organization: None,
        };

        Interpretation {
            interpretation: describe(&filters),
            filters,
        }
    }
}

fn price_from(captures: &Captures<'_>) -> Option<f64> {
    let raw = captures.get(1)?.as_str().replace(',', ".");
    raw.parse::<f64>().ok().filter(|p| p.is_finite() && *p >= 0.0)
}

/// Lowercase word tokens longer than two characters, stop words removed.
///
/// Punctuation becomes whitespace; order and duplicates are preserved.
pub fn keywords(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> Interpretation {
        FallbackParser::default().parse(query)
    }

    #[test]
    fn category_and_max_price() {
        let result = parse("doces até 50 reais");
        assert_eq!(result.filters.category.as_deref(), Some("Doces"));
        assert_eq!(result.filters.price_max, Some(50.0));
        assert_eq!(result.filters.price_min, None);
        assert!(result.interpretation.contains("Category: Doces"));
        assert!(result.interpretation.contains("Max price: R$ 50"));
    }

    #[test]
    fn first_category_in_catalog_order_wins() {
        let result = parse("doces e artesanato até 50 reais");
        assert_eq!(result.filters.category.as_deref(), Some("Artesanato"));
    }

    #[test]
    fn decimal_comma_is_normalized() {
        let result = parse("produtos a partir de 19,90");
        assert_eq!(result.filters.price_min, Some(19.9));
        assert_eq!(result.filters.price_max, None);
    }

    #[test]
    fn currency_marker_is_optional() {
        assert_eq!(parse("camisetas até R$ 35.5").filters.price_max, Some(35.5));
        assert_eq!(parse("camisetas até r$35").filters.price_max, Some(35.0));
        assert_eq!(parse("bolsas <= 80").filters.price_max, Some(80.0));
        assert_eq!(parse("bolsas >= 80").filters.price_min, Some(80.0));
    }

    #[test]
    fn both_bounds_populate_independently() {
        let result = parse("vestuário de 20 até 60");
        assert_eq!(result.filters.category.as_deref(), Some("Vestuário"));
        assert_eq!(result.filters.price_min, Some(20.0));
        assert_eq!(result.filters.price_max, Some(60.0));
        assert_eq!(
            result.interpretation,
            "Category: Vestuário; Max price: R$ 60; Min price: R$ 20; Keywords: vestuário"
        );
    }

    #[test]
    fn inverted_range_is_kept() {
        let result = parse("a partir de 100 até 10");
        assert_eq!(result.filters.price_min, Some(100.0));
        assert_eq!(result.filters.price_max, Some(10.0));
    }

    #[test]
    fn min_phrase_inside_max_phrase_is_ignored() {
        let result = parse("máximo de 50");
        assert_eq!(result.filters.price_max, Some(50.0));
        assert_eq!(result.filters.price_min, None);
    }

    #[test]
    fn de_inside_a_word_is_not_a_price_phrase() {
        let result = parse("vende 30 bolos");
        assert_eq!(result.filters.price_min, None);
    }

    #[test]
    fn stop_words_and_short_tokens_are_dropped() {
        let result = parse("bolsa para o mar");
        assert_eq!(result.filters.keywords, vec!["bolsa", "mar"]);
    }

    #[test]
    fn only_filler_words_reads_as_simple_text_search() {
        let result = parse("de um e com");
        assert!(result.filters.keywords.is_empty());
        assert!(result.filters.is_empty());
        assert_eq!(result.interpretation, "simple text search");
    }

    #[test]
    fn punctuation_splits_tokens_and_duplicates_stay() {
        assert_eq!(
            keywords("Caneca, caneca! (azul)"),
            vec!["caneca", "caneca", "azul"]
        );
    }

    #[test]
    fn accented_words_survive_tokenization() {
        assert_eq!(keywords("Decoração rústica"), vec!["decoração", "rústica"]);
    }

    #[test]
    fn unstructured_input_still_parses() {
        let result = parse("xyz123!!");
        assert_eq!(result.filters.keywords, vec!["xyz123"]);
        assert_eq!(result.filters.category, None);
        assert_eq!(result.interpretation, "Keywords: xyz123");
    }

    #[test]
    fn repeated_calls_are_identical() {
        let parser = FallbackParser::default();
        let query = "Artesanato de 10,5 até 99,99 para presente!";
        assert_eq!(parser.parse(query), parser.parse(query));
    }
}
