//! Identifier casing for storage names: schema names are CamelCase, table
//! names are snake_case and pluralized.

/// Convert CamelCase (or mixedCase) to snake_case.
/// e.g. "BlogPost" -> "blog_post", "APIKey" -> "api_key"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let chars: Vec<char> = s.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_lowercase();
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if i > 0 && (prev_lower || next_lower) && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

/// Naive pluralization: append 's' unless the name already ends with one.
pub fn pluralize(s: &str) -> String {
    if s.ends_with('s') {
        s.to_string()
    } else {
        format!("{}s", s)
    }
}

/// Derive a table name from a schema name: snake_case then pluralize.
/// e.g. "Task" -> "tasks", "OrderItem" -> "order_items"
pub fn derive_table_name(schema_name: &str) -> String {
    pluralize(&to_snake_case(schema_name))
}
