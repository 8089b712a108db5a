//! Cookie and `Content-Disposition` helpers.

use chrono::DateTime;
use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, InvalidHeaderValue};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use s3dir_core::SortOption;

/// Name of the cookie remembering the listing sort.
pub const SORT_COOKIE: &str = "sort";

/// Largest expiry a 32-bit cookie implementation understands (2038-01-19T03:14:07Z).
const MAX_COOKIE_EXPIRY: i64 = 2_147_483_647;

/// RFC 5987 `attr-char` minus the alphanumerics.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Return the value of the first cookie named `name`.
#[must_use]
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().trim_matches('"'))
        })
}

/// Build the `Set-Cookie` value persisting a sort selection.
#[must_use]
pub fn sort_cookie(option: SortOption) -> HeaderValue {
    let expires = DateTime::from_timestamp(MAX_COOKIE_EXPIRY, 0)
        .map(|at| at.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_default();
    let cookie = format!(
        "{SORT_COOKIE}={}; Path=/; Expires={expires}; HttpOnly",
        option.as_str()
    );
    // Sort values and the date are plain ASCII.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("sort=; Path=/"))
}

/// Build a `Content-Disposition` value such as `attachment; filename="a.zip"`.
///
/// The quoted `filename` is restricted to printable ASCII, with quotes and
/// backslashes escaped. Names outside that range also get an RFC 5987
/// `filename*` parameter carrying the exact UTF-8 name.
#[must_use]
pub fn content_disposition(kind: &str, filename: &str) -> String {
    let mut fallback = String::with_capacity(filename.len());
    let mut exact = true;
    for ch in filename.chars() {
        match ch {
            '"' | '\\' => {
                fallback.push('\\');
                fallback.push(ch);
            }
            ' '..='~' => fallback.push(ch),
            _ => {
                exact = false;
                fallback.push('_');
            }
        }
    }

    if exact {
        format!("{kind}; filename=\"{fallback}\"")
    } else {
        format!(
            "{kind}; filename=\"{fallback}\"; filename*=UTF-8''{}",
            utf8_percent_encode(filename, ATTR_CHAR)
        )
    }
}

/// [`content_disposition`] as a header value.
pub fn content_disposition_header(
    kind: &str,
    filename: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&content_disposition(kind, filename))
}
