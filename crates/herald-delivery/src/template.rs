//! `{{name}}` placeholder substitution for subjects and bodies.

use std::collections::HashMap;

/// Replace every `{{name}}` (whitespace inside the braces is ignored) with
/// `vars[name]`. Unknown placeholders are left untouched.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    if vars.is_empty() || !template.contains("{{") {
        return template.to_string();
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[start..start + 2 + end + 2]),
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
