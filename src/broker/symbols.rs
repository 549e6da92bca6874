use std::collections::HashMap;

/// Maps a company name to the exchange trading symbol used for orders.
///
/// Lookup order: explicit mapping table, the symbol the market-data source
/// reported for the IPO, then the first word of the company name uppercased.
#[derive(Debug, Clone, Default)]
pub struct SymbolResolver {
    overrides: HashMap<String, String>,
}

impl SymbolResolver {
    pub fn new(overrides: HashMap<String, String>) -> Self {
        let overrides = overrides
            .into_iter()
            .map(|(company, symbol)| (Self::key(&company), symbol.trim().to_uppercase()))
            .collect();
        Self { overrides }
    }

    fn key(company: &str) -> String {
        company.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
    }

    /// First whitespace-separated word, uppercased
    pub fn default_symbol(company: &str) -> Option<String> {
        company
            .split_whitespace()
            .next()
            .map(|word| word.to_uppercase())
    }

    pub fn resolve(&self, company: &str, listed_symbol: Option<&str>) -> Option<String> {
        if let Some(symbol) = self.overrides.get(&Self::key(company)) {
            return Some(symbol.clone());
        }

        if let Some(symbol) = listed_symbol.map(str::trim).filter(|s| !s.is_empty()) {
            return Some(symbol.to_uppercase());
        }

        Self::default_symbol(company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_heuristic_uses_first_word() {
        let resolver = SymbolResolver::default();
        assert_eq!(resolver.resolve("Alpha Co", None).as_deref(), Some("ALPHA"));
        assert_eq!(
            resolver.resolve("  tata   Technologies Ltd", None).as_deref(),
            Some("TATA")
        );
        assert_eq!(resolver.resolve("   ", None), None);
    }

    #[test]
    fn test_mapping_table_wins() {
        let mut table = HashMap::new();
        table.insert("Alpha  Co".to_string(), "alphaco".to_string());
        let resolver = SymbolResolver::new(table);

        assert_eq!(
            resolver.resolve("alpha co", Some("ALPHA")).as_deref(),
            Some("ALPHACO")
        );
    }

    #[test]
    fn test_listed_symbol_before_heuristic() {
        let resolver = SymbolResolver::default();
        assert_eq!(
            resolver.resolve("Alpha Co", Some("alphaco")).as_deref(),
            Some("ALPHACO")
        );
        assert_eq!(resolver.resolve("Alpha Co", Some("")).as_deref(), Some("ALPHA"));
    }
}
