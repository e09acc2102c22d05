/// Checks if a host matches an allowed-domain pattern
///
/// `example.org` matches only that host; `*.example.org` matches the bare
/// domain and any subdomain below it.
///
/// # Examples
///
/// ```
/// use repro_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("worldbank.org", "worldbank.org"));
/// assert!(!matches_wildcard("worldbank.org", "reproducibility.worldbank.org"));
/// assert!(matches_wildcard("*.worldbank.org", "reproducibility.worldbank.org"));
/// assert!(!matches_wildcard("*.worldbank.org", "notworldbank.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => {
            candidate == base
                || candidate
                    .strip_suffix(base)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        }
        None => candidate == pattern,
    }
}
