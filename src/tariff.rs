// Static tariff table and complex name resolution.
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// BRL per MWh, keyed by canonical complex name.
pub static TARIFFS: Lazy<HashMap<&'static str, f64>> =
    Lazy::new(|| HashMap::from([("Morgado", 770.14), ("Papagaios", 345.93)]));

/// Short codes used in the "COMPLEXO" column.
pub static ABBREVIATIONS: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| HashMap::from([("MOR", "Morgado"), ("PAP", "Papagaios")]));

/// Resolve a complex code or name to its canonical name.
///
/// Matching is case-insensitive on both abbreviations and canonical names.
/// Unknown codes are passed through trimmed.
pub fn canonical_complex(code: &str) -> String {
    let code = code.trim();
    let upper = code.to_uppercase();
    if let Some(name) = ABBREVIATIONS.get(upper.as_str()) {
        return (*name).to_string();
    }
    TARIFFS
        .keys()
        .find(|name| name.to_uppercase() == upper)
        .map(|name| (*name).to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Tariff for a complex; abbreviations are resolved first. Unknown -> 0.
pub fn tariff_for(complex: &str) -> f64 {
    let name = canonical_complex(complex);
    TARIFFS.get(name.as_str()).copied().unwrap_or(0.0)
}
