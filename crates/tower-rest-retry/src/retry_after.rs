use http::HeaderMap;
use std::time::{Duration, SystemTime};
use tower_rest_core::Error;

/// Parses a `Retry-After` header value into a wait duration.
///
/// Two forms are accepted:
///
/// - delay-seconds: a non-negative integer, e.g. `"120"`
/// - an HTTP-date (IMF-fixdate, RFC 850, or asctime), taken as a deadline.
///   The wait is `deadline - now`, where `now` is the supplied reference or
///   the wall clock. Deadlines in the past yield a zero wait.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime, UNIX_EPOCH};
/// use tower_rest_retry::parse_retry_after;
///
/// assert_eq!(parse_retry_after("2", None).unwrap(), Duration::from_secs(2));
///
/// let now = UNIX_EPOCH + Duration::from_secs(784_111_775);
/// let wait = parse_retry_after("Sun, 06 Nov 1994 08:49:37 GMT", Some(now)).unwrap();
/// assert_eq!(wait, Duration::from_secs(2));
///
/// let err = parse_retry_after("soon", None).unwrap_err();
/// assert!(err.to_string().contains("invalid Retry-After header"));
/// ```
pub fn parse_retry_after(value: &str, now: Option<SystemTime>) -> Result<Duration, Error> {
    let trimmed = value.trim();
    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let deadline = httpdate::parse_http_date(trimmed)
        .map_err(|_| Error::InvalidRetryAfter(value.to_string()))?;
    let now = now.unwrap_or_else(SystemTime::now);
    Ok(deadline.duration_since(now).unwrap_or(Duration::ZERO))
}

/// Reads and parses the `Retry-After` header of a response, if present.
///
/// Returns `None` when the header is missing, not valid UTF-8, or not
/// parseable.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, None).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::UNIX_EPOCH;

    // Sun, 06 Nov 1994 08:49:37 GMT
    const DATE_SECS: u64 = 784_111_777;

    #[test]
    fn seconds() {
        assert_eq!(parse_retry_after("0", None).unwrap(), Duration::ZERO);
        assert_eq!(
            parse_retry_after(" 30 ", None).unwrap(),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn all_date_formats() {
        let now = UNIX_EPOCH + Duration::from_secs(DATE_SECS - 5);
        for value in [
            "Sun, 06 Nov 1994 08:49:37 GMT",
            "Sunday, 06-Nov-94 08:49:37 GMT",
            "Sun Nov  6 08:49:37 1994",
        ] {
            assert_eq!(
                parse_retry_after(value, Some(now)).unwrap(),
                Duration::from_secs(5),
                "{value}"
            );
        }
    }

    #[test]
    fn past_date_is_zero() {
        let now = UNIX_EPOCH + Duration::from_secs(DATE_SECS + 60);
        assert_eq!(
            parse_retry_after("Sun, 06 Nov 1994 08:49:37 GMT", Some(now)).unwrap(),
            Duration::ZERO
        );
    }

    #[test]
    fn rejects_garbage() {
        for value in ["invalid", "-1", "1.5", ""] {
            let err = parse_retry_after(value, None).unwrap_err();
            assert!(matches!(err, Error::InvalidRetryAfter(ref v) if v == value));
            assert!(err.to_string().contains("invalid Retry-After header"));
        }
    }

    #[test]
    fn header_lookup() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);
        headers.insert(http::header::RETRY_AFTER, "3".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(3)));
        headers.insert(http::header::RETRY_AFTER, "later".parse().unwrap());
        assert_eq!(retry_after(&headers), None);
    }
}
