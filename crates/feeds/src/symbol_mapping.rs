//! Bidirectional mapping between canonical and exchange wire symbols.
//!
//! Canonical symbols use the `BASE_QUOTE` form (e.g. "TSLAX_USDT").
//! Exchanges that drop the separator ("TSLAXUSDT") get a stable mapping so
//! emitted samples always carry the canonical symbol.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct SymbolMap {
    to_wire: HashMap<String, String>,
    to_canonical: HashMap<String, String>,
    /// Canonical symbols in subscription order
    order: Vec<String>,
}

impl SymbolMap {
    /// Build a mapping using `translate` to derive each wire symbol.
    ///
    /// Duplicates are ignored; the first canonical symbol that produces a
    /// given wire symbol keeps it.
    pub fn new<F>(canonical: &[String], translate: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        let mut map = Self::default();
        for symbol in canonical {
            let symbol = symbol.trim().to_uppercase();
            if symbol.is_empty() || map.to_wire.contains_key(&symbol) {
                continue;
            }
            let wire = translate(&symbol);
            if map.to_canonical.contains_key(&wire) {
                continue;
            }
            map.to_canonical.insert(wire.clone(), symbol.clone());
            map.to_wire.insert(symbol.clone(), wire);
            map.order.push(symbol);
        }
        map
    }

    pub fn wire(&self, canonical: &str) -> Option<&str> {
        self.to_wire.get(canonical).map(String::as_str)
    }

    pub fn canonical(&self, wire: &str) -> Option<&str> {
        self.to_canonical.get(wire).map(String::as_str)
    }

    /// Wire symbols in subscription order.
    pub fn wire_symbols(&self) -> Vec<String> {
        self.order
            .iter()
            .filter_map(|s| self.to_wire.get(s).cloned())
            .collect()
    }

    pub fn canonical_symbols(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
