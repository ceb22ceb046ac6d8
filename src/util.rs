pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Percent-encodes `s` for use in a query string.
///
/// Unreserved characters (`A-Z a-z 0-9 - . _ ~`) and anything in `safe` pass
/// through untouched, a space becomes `+`, everything else is `%XX` encoded
/// byte by byte.
pub(crate) fn quote_plus(s: &str, safe: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '~') || safe.contains(ch)
        {
            out.push(ch);
        } else if ch == ' ' {
            out.push('+');
        } else {
            out.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    out
}

pub(crate) fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urljoin_handles_slashes() {
        assert_eq!(urljoin("https://host/erddap/", "/info"), "https://host/erddap/info");
        assert_eq!(urljoin("https://host/erddap", "info"), "https://host/erddap/info");
        assert_eq!(urljoin("https://host/erddap", "https://other/x"), "https://other/x");
    }

    #[test]
    fn quote_plus_keeps_safe_set() {
        assert_eq!(
            quote_plus("time>=2020-12-24T00:00:00Z", "=!()/"),
            "time%3E=2020-12-24T00%3A00%3A00Z"
        );
        assert_eq!(quote_plus("station,time", ""), "station%2Ctime");
        assert_eq!(quote_plus("a b/c", ""), "a+b%2Fc");
        assert_eq!(quote_plus("units(\"UCUM\")", "=!()/"), "units(%22UCUM%22)");
    }

    #[test]
    fn quote_plus_encodes_multibyte_characters() {
        assert_eq!(quote_plus("°C", ""), "%C2%B0C");
    }

    #[test]
    fn strip_quotes_removes_matching_pairs() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("\"abc"), "\"abc");
    }
}
