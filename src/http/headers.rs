use http::HeaderMap;
use http::header::{AsHeaderName, CONTENT_TYPE, DATE, HeaderName, HeaderValue, LINK};

/// Correlation ID assigned by the server to every request it observes.
pub const OKTA_REQUEST_ID: HeaderName = HeaderName::from_static("x-okta-request-id");
/// Echoes the correlation ID of the first failed exchange on every retry.
pub const OKTA_RETRY_FOR: HeaderName = HeaderName::from_static("x-okta-retry-for");
/// Attempt number, written from the second attempt onward.
pub const OKTA_RETRY_COUNT: HeaderName = HeaderName::from_static("x-okta-retry-count");
/// Epoch seconds at which a throttled caller may retry.
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-rate-limit-reset");

/// Case-insensitive multi-valued header map with the typed accessors the SDK
/// layers above rely on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Headers {
    inner: HeaderMap,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every value stored under `name` with `value`.
    pub fn set(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.insert(name, value);
    }

    /// Appends `value` under `name`, keeping any existing values.
    pub fn add(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.append(name, value);
    }

    pub fn contains(&self, name: impl AsHeaderName) -> bool {
        self.inner.contains_key(name)
    }

    /// First value stored under `name`, when it is valid UTF-8.
    pub fn get_first(&self, name: impl AsHeaderName) -> Option<&str> {
        self.inner.get(name).and_then(|value| value.to_str().ok())
    }

    /// Every value stored under `name`, in insertion order.
    pub fn get_all(&self, name: impl AsHeaderName) -> Vec<&str> {
        self.inner
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.inner.iter()
    }

    /// The `Date` header as milliseconds since the Unix epoch.
    pub fn date_millis(&self) -> Option<i64> {
        let raw_date = self.get_first(DATE)?;
        let date = httpdate::parse_http_date(raw_date).ok()?;
        let since_epoch = date.duration_since(std::time::UNIX_EPOCH).ok()?;
        i64::try_from(since_epoch.as_millis()).ok()
    }

    /// The `Content-Type` header as a media type string.
    pub fn content_type(&self) -> Option<&str> {
        self.get_first(CONTENT_TYPE)
    }

    /// All `Link` headers as one logical list.
    pub fn link(&self) -> Vec<&str> {
        self.get_all(LINK)
    }

    /// The first `X-Okta-Request-Id` value.
    pub fn request_id(&self) -> Option<&str> {
        self.get_first(OKTA_REQUEST_ID)
    }

    pub(crate) fn request_id_value(&self) -> Option<&HeaderValue> {
        self.inner.get(OKTA_REQUEST_ID)
    }
}
