//! Naming helpers: resource names → path-safe plural collection names.

/// Convert an identifier to kebab-case.
/// e.g. "TodoItem" -> "todo-item", "user_profile" -> "user-profile"
pub fn to_kebab_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if c == '_' || c == ' ' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            prev_lower_or_digit = false;
        } else if c.is_uppercase() {
            if prev_lower_or_digit && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(c.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out.trim_end_matches('-').to_string()
}

/// English pluralization good enough for resource names.
/// e.g. "task" -> "tasks", "category" -> "categories", "box" -> "boxes"
pub fn pluralize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        return format!("{}es", word);
    }
    if lower.ends_with('y') {
        let before = lower.chars().rev().nth(1);
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{}s", word)
}

/// Collection name for a resource name: kebab-case, last word pluralized.
pub fn collection_name(resource_name: &str) -> String {
    pluralize(&to_kebab_case(resource_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kebab_case() {
        assert_eq!(to_kebab_case("TodoItem"), "todo-item");
        assert_eq!(to_kebab_case("user_profile"), "user-profile");
        assert_eq!(to_kebab_case("Task"), "task");
        assert_eq!(to_kebab_case("HTTPLog"), "httplog");
    }

    #[test]
    fn plurals() {
        assert_eq!(pluralize("task"), "tasks");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("match"), "matches");
    }

    #[test]
    fn collections_from_names() {
        assert_eq!(collection_name("Task"), "tasks");
        assert_eq!(collection_name("TodoItem"), "todo-items");
        assert_eq!(collection_name("Category"), "categories");
    }
}
