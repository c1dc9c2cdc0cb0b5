/// Domain normalization and matching for blocking decisions
use url::Url;

/// Extract the lowercased hostname from a URL or bare domain.
///
/// Inputs without a scheme are treated as `https://`. Anything the URL parser
/// rejects (or that has no host) yields an empty string, which never matches
/// a rule.
///
/// Examples:
/// - `https://www.Example.com/path` → `www.example.com`
/// - `mail.example.com` → `mail.example.com`
/// - `localhost:3000` → `localhost`
pub fn normalize(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let full = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    Url::parse(&full)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .unwrap_or_default()
}

/// Whether `input` opens with `scheme://`. A `://` further in, say inside a
/// query string, does not count.
fn has_scheme(input: &str) -> bool {
    let Some(end) = input.find("://") else {
        return false;
    };
    let scheme = &input[..end];
    scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Normalized hostname with a leading `www.` removed. This is the form stored
/// in the block registry and the unblock ledger.
pub fn canonical(url: &str) -> String {
    strip_www(&normalize(url)).to_string()
}

fn strip_www(domain: &str) -> &str {
    domain.strip_prefix("www.").unwrap_or(domain)
}

/// Subdomain-inclusive match of `candidate` against `rule`.
///
/// After removing `www.` from both sides, matches when the two are equal or
/// when `candidate` is a subdomain of `rule`. The relation is asymmetric: a
/// rule for `example.com` covers `mail.example.com`, not the other way round.
/// An empty rule matches nothing.
pub fn matches(candidate: &str, rule: &str) -> bool {
    let rule = strip_www(rule);
    if rule.is_empty() {
        return false;
    }
    let candidate = strip_www(candidate);
    if candidate.is_empty() {
        return false;
    }

    candidate == rule
        || (candidate.len() > rule.len()
            && candidate.ends_with(rule)
            && candidate.as_bytes()[candidate.len() - rule.len() - 1] == b'.')
}

/// Display name for a site: the first label of its canonical domain, capitalized.
///
/// `https://www.reddit.com/r/rust` → `Reddit`
pub fn site_name(url: &str) -> String {
    let domain = canonical(url);
    let first = domain.split('.').next().unwrap_or_default();

    let mut chars = first.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("https://www.google.com"), "www.google.com");
        assert_eq!(normalize("http://Google.COM/search?q=rust"), "google.com");
        assert_eq!(normalize("google.com"), "google.com");
        assert_eq!(normalize("  mail.google.com/inbox "), "mail.google.com");
    }

    #[test]
    fn test_normalize_scheme_only_counts_at_the_start() {
        assert_eq!(
            normalize("example.com/login?next=https://other.com"),
            "example.com"
        );
        assert_eq!(normalize("example.com#https://other.com"), "example.com");
        assert_eq!(normalize("chrome-extension://abc/page.html"), "abc");
        assert_eq!(normalize("https://a.com/?r=http://b.com"), "a.com");
    }

    #[test]
    fn test_normalize_ports_and_ips() {
        assert_eq!(normalize("localhost:3000"), "localhost");
        assert_eq!(normalize("http://127.0.0.1:8080/admin"), "127.0.0.1");
    }

    #[test]
    fn test_normalize_malformed() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("https://"), "");
        assert_eq!(normalize("not a url"), "");
    }

    #[test]
    fn test_canonical_strips_www() {
        assert_eq!(canonical("https://www.example.com/path"), "example.com");
        assert_eq!(canonical("www.example.com"), "example.com");
        assert_eq!(canonical("wwwexample.com"), "wwwexample.com");
    }

    #[test]
    fn test_matches_exact_and_subdomains() {
        assert!(matches("example.com", "example.com"));
        assert!(matches("www.example.com", "example.com"));
        assert!(matches("example.com", "www.example.com"));
        assert!(matches("a.example.com", "example.com"));
        assert!(matches("deep.a.example.com", "example.com"));
    }

    #[test]
    fn test_matches_is_asymmetric() {
        assert!(matches("a.example.com", "example.com"));
        assert!(!matches("example.com", "a.example.com"));
    }

    #[test]
    fn test_matches_requires_label_boundary() {
        assert!(!matches("notexample.com", "example.com"));
        assert!(!matches("example.com.evil.io", "example.com"));
    }

    #[test]
    fn test_empty_rule_never_matches() {
        assert!(!matches("example.com", ""));
        assert!(!matches("example.com", "www."));
        assert!(!matches("", ""));
    }

    #[test]
    fn test_site_name() {
        assert_eq!(site_name("https://www.reddit.com/r/rust"), "Reddit");
        assert_eq!(site_name("youtube.com"), "Youtube");
        assert_eq!(site_name("https://"), "");
    }
}
