//! Path matching against `:param` patterns.

use super::table::Route;
use axum::http::Method;
use percent_encoding::percent_decode_str;

pub type PathParams = Vec<(String, String)>;

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Literal segments compare case-insensitively and trailing slashes are ignored.
/// Parameters keep the request's original case and are percent-decoded.
pub fn match_route(pattern: &str, path: &str) -> Option<PathParams> {
    let pattern: Vec<&str> = segments(pattern).collect();
    let path: Vec<&str> = segments(path).collect();
    if pattern.len() != path.len() {
        return None;
    }
    let mut params = Vec::new();
    for (p, s) in pattern.iter().zip(path.iter()) {
        if let Some(name) = p.strip_prefix(':') {
            params.push((
                name.to_string(),
                percent_decode_str(s).decode_utf8_lossy().into_owned(),
            ));
        } else if !p.eq_ignore_ascii_case(s) {
            return None;
        }
    }
    Some(params)
}

/// First route in table order whose method and pattern both match.
pub fn find_route<'a>(routes: &'a [Route], method: &Method, path: &str) -> Option<(&'a Route, PathParams)> {
    routes
        .iter()
        .filter(|r| r.method == *method)
        .find_map(|r| match_route(&r.pattern, path).map(|params| (r, params)))
}

/// Decoded segments after `prefix`, or `None` when the path is outside it.
pub fn segments_after_prefix(prefix: &str, path: &str) -> Option<Vec<String>> {
    let mut rest = segments(path);
    for p in segments(prefix) {
        if !rest.next()?.eq_ignore_ascii_case(p) {
            return None;
        }
    }
    Some(
        rest.map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned())
            .collect(),
    )
}

pub fn param<'a>(params: &'a PathParams, name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_case_and_trailing_slash_are_normalized() {
        let params = match_route("/api/tasks/:id", "/API/Tasks/AbC-1/").unwrap();
        assert_eq!(params, vec![("id".to_string(), "AbC-1".to_string())]);
    }

    #[test]
    fn segment_counts_must_agree() {
        assert!(match_route("/tasks/:id", "/tasks").is_none());
        assert!(match_route("/tasks/:id", "/tasks/1/extra").is_none());
        assert!(match_route("/tasks/bulk", "/tasks/other").is_none());
    }

    #[test]
    fn params_are_percent_decoded() {
        let params = match_route("/tasks/:id/tags/:relationId", "/tasks/a%20b/tags/x%2Fy").unwrap();
        assert_eq!(param(&params, "id"), Some("a b"));
        assert_eq!(param(&params, "relationId"), Some("x/y"));
    }

    #[test]
    fn prefix_stripping() {
        assert_eq!(
            segments_after_prefix("/api", "/Api/tasks/1/"),
            Some(vec!["tasks".to_string(), "1".to_string()])
        );
        assert_eq!(segments_after_prefix("/api", "/other/tasks"), None);
        assert_eq!(segments_after_prefix("", "/tasks"), Some(vec!["tasks".to_string()]));
    }

    #[test]
    fn root_pattern_matches_only_root() {
        assert_eq!(match_route("/", "/"), Some(vec![]));
        assert!(match_route("/", "/tasks").is_none());
    }
}
