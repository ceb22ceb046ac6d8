use anyhow::anyhow;
use reqwest::StatusCode;

/// The plain-text error block ERDDAP sends with non-2xx responses:
///
/// ```text
/// Error {
///     code=404;
///     message="Not Found: Your query produced no matching results. (nRows = 0)";
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ErddapErrorResponse {
    pub(crate) code: Option<u16>,
    pub(crate) message: Option<String>,
}

pub(crate) fn parse_erddap_error(body: &str) -> Option<ErddapErrorResponse> {
    let body = body.trim();
    let inner = body
        .strip_prefix("Error")?
        .trim_start()
        .strip_prefix('{')?
        .trim_end()
        .strip_suffix('}')?;

    let mut resp = ErddapErrorResponse {
        code: None,
        message: None,
    };
    for line in inner.lines() {
        let line = line.trim().trim_end_matches(';');
        if let Some((k, v)) = line.split_once('=') {
            match k.trim() {
                "code" => resp.code = v.trim().parse().ok(),
                "message" => resp.message = Some(unquote(v.trim()).to_string()),
                _ => {}
            }
        }
    }

    if resp.code.is_none() && resp.message.is_none() {
        return None;
    }
    Some(resp)
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}

pub(crate) fn format_erddap_error(
    status: StatusCode,
    url: &str,
    e: &ErddapErrorResponse,
) -> anyhow::Error {
    let message = e.message.as_deref().unwrap_or("");
    let code = e.code.unwrap_or(status.as_u16());

    // ERDDAP answers an empty result set with 404 instead of an empty table.
    if status == StatusCode::NOT_FOUND && message.contains("nRows = 0") {
        return anyhow!(
            "ERDDAP returned no rows for this query (HTTP 404).\n- Relax the constraints or check the variable names\n\nServer message: {}\nrequest: {}",
            message,
            url
        );
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "ERDDAP authentication/authorization failed (HTTP {}).\n- Check the username and password configured for this server\n- Private datasets are only visible to logged in users\n\nServer message: {}\nrequest: {}",
            code,
            message,
            url
        );
    }

    if status == StatusCode::NOT_FOUND {
        return anyhow!(
            "ERDDAP resource not found (HTTP 404).\n- Check the server URL and dataset ID\n\nServer message: {}\nrequest: {}",
            message,
            url
        );
    }

    if status == StatusCode::BAD_REQUEST {
        return anyhow!(
            "ERDDAP rejected the query (HTTP 400).\n\nServer message: {}\nrequest: {}",
            message,
            url
        );
    }

    anyhow!(
        "ERDDAP request failed: HTTP {} for url ({})\n{}",
        code,
        url,
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ROWS: &str = "Error {\n    code=404;\n    message=\"Not Found: Your query produced no matching results. (nRows = 0)\";\n}\n";

    #[test]
    fn parses_error_block() {
        let e = parse_erddap_error(NO_ROWS).unwrap();
        assert_eq!(e.code, Some(404));
        assert_eq!(
            e.message.as_deref(),
            Some("Not Found: Your query produced no matching results. (nRows = 0)")
        );
    }

    #[test]
    fn ignores_other_bodies() {
        assert_eq!(parse_erddap_error("<html>Bad Gateway</html>"), None);
        assert_eq!(parse_erddap_error("Error {\n}"), None);
    }

    #[test]
    fn empty_result_gets_its_own_message() {
        let e = parse_erddap_error(NO_ROWS).unwrap();
        let err = format_erddap_error(StatusCode::NOT_FOUND, "http://x/tabledap/a.csvp", &e);
        let text = err.to_string();
        assert!(text.contains("no rows"));
        assert!(text.contains("http://x/tabledap/a.csvp"));
    }

    #[test]
    fn bad_query_mentions_server_message() {
        let body = "Error {\n    code=400;\n    message=\"Bad Request: Query error: Unrecognized variable=\\\"foo\\\".\";\n}";
        let e = parse_erddap_error(body).unwrap();
        let err = format_erddap_error(StatusCode::BAD_REQUEST, "u", &e);
        assert!(err.to_string().contains("Unrecognized variable"));
        assert!(err.to_string().contains("HTTP 400"));
    }
}
