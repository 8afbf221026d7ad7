//! # Request Descriptor
//!
//! Framework-independent view of an inbound HTTP request. The HTTP layer
//! builds one per request; validators only ever borrow it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP methods an OpenAPI path item can declare operations for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    /// All methods, in the order OpenAPI lists them on a path item.
    pub const ALL: [HttpMethod; 8] = [
        Self::Get,
        Self::Put,
        Self::Post,
        Self::Delete,
        Self::Options,
        Self::Head,
        Self::Patch,
        Self::Trace,
    ];

    /// Uppercase wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }

    /// Lowercase key used in OpenAPI path items.
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unsupported HTTP method: {s}"))
    }
}

/// One inbound request, as seen by the gateway.
///
/// Header names are stored lowercased so lookups are case-insensitive.
/// Query pairs keep their arrival order and may repeat a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    method: HttpMethod,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Vec<u8>,
    content_type: Option<String>,
}

impl RequestDescriptor {
    /// Create a descriptor with no headers, query, or body.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: Vec::new(),
            content_type: None,
        }
    }

    /// Add a header. A `content-type` header also sets the declared content type.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        let value = value.into();
        if name == "content-type" {
            self.content_type = Some(value.clone());
        }
        self.headers.push((name, value));
        self
    }

    /// Add one query pair.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Add every pair of a raw (undecoded) query string such as `page=1&per_page=10`.
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query.extend(
            url::form_urlencoded::parse(raw.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
        self
    }

    /// Attach a raw body and its declared content type.
    pub fn with_body(mut self, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body.into();
        self
    }

    /// Attach a raw body, leaving the content type as the headers declared it.
    pub fn with_raw_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a JSON body with `application/json` content type.
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        let bytes = serde_json::to_vec(value).unwrap_or_default();
        self.with_body("application/json", bytes)
    }

    /// Request method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Request path, without query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// All headers, names lowercased.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All query pairs in arrival order.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// All values of a query key, in arrival order.
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Value of a cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k == "cookie")
            .flat_map(|(_, v)| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }

    /// Raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Declared content type, including any parameters.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Declared media type with parameters stripped and lowercased,
    /// e.g. `application/json` for `application/json; charset=utf-8`.
    pub fn media_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|mt| !mt.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("CONNECT".parse::<HttpMethod>().is_err());
    }

    #[test]
    fn headers_are_case_insensitive() {
        let req = RequestDescriptor::new(HttpMethod::Get, "/")
            .with_header("Authorization", "Bearer abc")
            .with_header("X-Request-Id", "r1");
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
        assert_eq!(req.header("x-request-id"), Some("r1"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn content_type_header_sets_media_type() {
        let req = RequestDescriptor::new(HttpMethod::Post, "/profiles")
            .with_header("Content-Type", "Application/JSON; charset=utf-8");
        assert_eq!(req.content_type(), Some("Application/JSON; charset=utf-8"));
        assert_eq!(req.media_type().as_deref(), Some("application/json"));
    }

    #[test]
    fn query_string_is_decoded_and_keeps_repeats() {
        let req = RequestDescriptor::new(HttpMethod::Get, "/profiles")
            .with_query_string("page=1&tag=a%20b&tag=c");
        assert_eq!(req.query_values("page"), vec!["1"]);
        assert_eq!(req.query_values("tag"), vec!["a b", "c"]);
        assert!(req.query_values("per_page").is_empty());
    }

    #[test]
    fn cookie_lookup() {
        let req = RequestDescriptor::new(HttpMethod::Get, "/")
            .with_header("Cookie", "session=s1; theme=dark");
        assert_eq!(req.cookie("session"), Some("s1"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("other"), None);
    }

    #[test]
    fn json_body_sets_content_type() {
        let req = RequestDescriptor::new(HttpMethod::Post, "/profiles")
            .with_json(&serde_json::json!({"first_name": "Ada"}));
        assert_eq!(req.media_type().as_deref(), Some("application/json"));
        let parsed: serde_json::Value = serde_json::from_slice(req.body()).unwrap();
        assert_eq!(parsed["first_name"], "Ada");
    }

    #[test]
    fn raw_body_keeps_header_content_type() {
        let req = RequestDescriptor::new(HttpMethod::Put, "/profiles/1")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_raw_body(b"first_name=Ada".to_vec());
        assert_eq!(req.media_type().as_deref(), Some("application/x-www-form-urlencoded"));
        assert_eq!(req.body(), b"first_name=Ada");

        let untyped = RequestDescriptor::new(HttpMethod::Post, "/").with_raw_body(b"x".to_vec());
        assert_eq!(untyped.content_type(), None);
    }

    proptest::proptest! {
        #[test]
        fn encoded_query_values_decode_verbatim(values in proptest::collection::vec(".{0,16}", 1..5)) {
            let raw: String = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(values.iter().map(|v| ("k", v.as_str())))
                .finish();
            let req = RequestDescriptor::new(HttpMethod::Get, "/").with_query_string(&raw);
            let expected: Vec<&str> = values.iter().map(String::as_str).collect();
            proptest::prop_assert_eq!(req.query_values("k"), expected);
        }

        #[test]
        fn media_type_ignores_case_and_parameters(subtype in "[a-zA-Z]{1,10}", charset in "[a-z0-9-]{1,10}") {
            let req = RequestDescriptor::new(HttpMethod::Post, "/")
                .with_header("Content-Type", format!("Application/{subtype}; charset={charset}"));
            let expected = format!("application/{}", subtype.to_ascii_lowercase());
            proptest::prop_assert_eq!(req.media_type(), Some(expected));
        }
    }
}
