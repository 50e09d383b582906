//! Extension marker stored in the container's environment.
//!
//! The marker holds the sorted, comma-joined list of extensions the container
//! was built with. The same list is what later runs compare against.

pub const MARKER_ENV: &str = "ROCKERC_EXTENSIONS";

/// Names must match `[A-Za-z0-9_.=/~+-]+` so the marker parses back unambiguously.
pub fn is_valid_extension_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_.=/~+-".contains(c))
}

/// `NAME=value` entry to record, or `None` when nothing can be recorded.
pub fn marker_value(extensions: &[String]) -> Option<String> {
    if let Some(bad) = extensions.iter().find(|e| !is_valid_extension_name(e)) {
        tracing::warn!(
            extension = %bad,
            "extension name cannot be stored in the container marker; the container will be rebuilt next run"
        );
        return None;
    }
    let mut sorted: Vec<&str> = extensions.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    Some(format!("{MARKER_ENV}={}", sorted.join(",")))
}

/// Find the marker in a container's `KEY=value` environment list.
pub fn parse_marker(env: &[String]) -> Option<Vec<String>> {
    let prefix = format!("{MARKER_ENV}=");
    let raw = env.iter().find_map(|e| e.strip_prefix(&prefix))?;
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Order-insensitive comparison; a missing marker always counts as changed.
pub fn extensions_changed(desired: &[String], stored: Option<&[String]>) -> bool {
    let Some(stored) = stored else {
        return true;
    };
    let mut a: Vec<&String> = desired.iter().collect();
    let mut b: Vec<&String> = stored.iter().collect();
    a.sort_unstable();
    b.sort_unstable();
    a != b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn test_marker_value_sorted() {
        assert_eq!(
            marker_value(&s(&["x11", "git", "user"])).as_deref(),
            Some("ROCKERC_EXTENSIONS=git,user,x11")
        );
        assert_eq!(marker_value(&[]).as_deref(), Some("ROCKERC_EXTENSIONS="));
    }

    #[test]
    fn test_marker_value_rejects_invalid_names() {
        assert!(marker_value(&s(&["git", "bad,name"])).is_none());
        assert!(marker_value(&s(&["has space"])).is_none());
        assert!(is_valid_extension_name("cuda=12.1"));
        assert!(is_valid_extension_name("ssh~/key+x"));
    }

    #[test]
    fn test_parse_marker_trims_and_drops_empties() {
        let env = s(&["PATH=/usr/bin", "ROCKERC_EXTENSIONS= git, ,user ,"]);
        assert_eq!(parse_marker(&env), Some(s(&["git", "user"])));
        assert_eq!(parse_marker(&s(&["PATH=/bin"])), None);
        assert_eq!(
            parse_marker(&s(&["ROCKERC_EXTENSIONS="])),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_changed_is_order_insensitive() {
        let stored = s(&["user", "git"]);
        assert!(!extensions_changed(&s(&["git", "user"]), Some(&stored)));
        assert!(extensions_changed(&s(&["git"]), Some(&stored)));
        assert!(extensions_changed(&s(&["git", "user"]), None));
    }
}
