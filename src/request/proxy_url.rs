//! Same-origin proxy URL rewrite.

use url::Url;

/// Rewrite an absolute URL to `{prefix}/{path}?base={host}`.
///
/// The original query string, if any, follows `base`. Input that is not an
/// absolute URL with a host is already same-origin and is returned as is.
pub fn proxy_url(original: &str, prefix: &str) -> String {
    let Ok(parsed) = Url::parse(original) else {
        return original.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return original.to_string();
    };

    let path = parsed.path().trim_start_matches('/');
    let mut rewritten = format!("{prefix}/{path}?base={host}");
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        rewritten.push('&');
        rewritten.push_str(query);
    }
    rewritten
}
