//! Singular/plural mapping between type names and collection keys.
//!
//! A foreign-key attribute like `body_id` names a singular type; the global
//! store keys collections by the plural form (`bodies`). The mapping is a
//! small irregular table with a default suffix rule. Purely textual.

/// Irregular plural forms; anything absent follows the `+"s"` rule.
const IRREGULAR: &[(&str, &str)] = &[("body", "bodies"), ("category", "categories")];

/// Return the collection key for a singular type name ("body" -> "bodies").
pub fn to_plural(singular: &str) -> String {
    for (s, p) in IRREGULAR {
        if *s == singular {
            return (*p).to_string();
        }
    }
    format!("{singular}s")
}

/// Return the singular type name for a collection key ("bodies" -> "body").
pub fn to_singular(plural: &str) -> String {
    for (s, p) in IRREGULAR {
        if *p == plural {
            return (*s).to_string();
        }
    }
    plural.strip_suffix('s').unwrap_or(plural).to_string()
}
