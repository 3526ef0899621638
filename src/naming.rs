//! Identifier normalization.
//!
//! Commands and flags are displayed in dashed form (`do-stuff`), while
//! argument and field identifiers are stored in snake_case (`do_stuff`).
//! Both conversions split on case changes, dashes, underscores, dots and
//! whitespace, so `doStuff`, `DoStuff`, `do_stuff` and `do-stuff` all agree.

/// Split an identifier into lowercase words.
fn words(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = ident.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            // "doStuff" -> do|Stuff, "HTTPServer" -> HTTP|Server
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `doStuff` → `do_stuff`
pub fn to_snake_case(ident: &str) -> String {
    words(ident).join("_")
}

/// `doStuff` → `do-stuff`
pub fn to_dashed(ident: &str) -> String {
    words(ident).join("-")
}

/// `sub.nested` → `SUB_NESTED`
pub fn to_env_name(ident: &str) -> String {
    words(ident).join("_").to_uppercase()
}

/// True if `name` is usable as a config key or argument id.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_to_dashed() {
        assert_eq!(to_dashed("doStuff"), "do-stuff");
        assert_eq!(to_dashed("DumpConfig"), "dump-config");
    }

    #[test]
    fn snake_case_to_dashed() {
        assert_eq!(to_dashed("use_config"), "use-config");
    }

    #[test]
    fn dashed_is_stable() {
        assert_eq!(to_dashed("dump-config"), "dump-config");
        assert_eq!(to_snake_case("dump-config"), "dump_config");
    }

    #[test]
    fn acronyms_split_before_next_word() {
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("parseJSON"), "parse_json");
    }

    #[test]
    fn digits_stay_in_word() {
        assert_eq!(to_snake_case("utf8Name"), "utf8_name");
    }

    #[test]
    fn mixed_separators() {
        assert_eq!(to_snake_case("configName"), "config_name");
        assert_eq!(to_snake_case("--bar-baz"), "bar_baz");
    }

    #[test]
    fn env_name_from_dotted_path() {
        assert_eq!(to_env_name("sub.nested"), "SUB_NESTED");
        assert_eq!(to_env_name("config_int"), "CONFIG_INT");
    }

    #[test]
    fn identifier_validation() {
        assert!(is_valid_identifier("config_int"));
        assert!(is_valid_identifier("log-level"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a.b"));
        assert!(!is_valid_identifier("has space"));
    }
}
