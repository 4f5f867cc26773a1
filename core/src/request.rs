use std::fmt::{Debug, Formatter};
use std::str::FromStr;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::uri::PathAndQuery;
use http::HeaderValue;
use http::Method;
use http::Uri;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::utils::Redact;
use crate::{Error, Result};

/// AsciiSet for RFC 3986 percent-encoding used by query signing.
///
/// - Encode every byte except the unreserved characters: 'A'-'Z', 'a'-'z', '0'-'9', '-', '.', '_', and '~'.
/// - Space is encoded as `%20`, never `+`.
pub static QUERY_ENCODE_SET: AsciiSet = NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode input with [`QUERY_ENCODE_SET`].
pub fn percent_encode(input: &str) -> String {
    utf8_percent_encode(input, &QUERY_ENCODE_SET).to_string()
}

/// Parameters that must never be printed verbatim.
const SENSITIVE_PARAMS: &[&str] = &["SecurityToken"];

/// An API call before signing.
///
/// Parameters keep their insertion order; keys must be unique within a
/// request, which is checked at signing time.
#[derive(Clone, PartialEq, Eq)]
pub struct UnsignedRequest {
    method: Method,
    endpoint: Uri,
    params: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl UnsignedRequest {
    /// Create a new request against the endpoint base URI.
    pub fn new(method: Method, endpoint: Uri) -> Self {
        Self {
            method,
            endpoint,
            params: Vec::new(),
            body: None,
        }
    }

    /// Create a new request, parsing the endpoint.
    pub fn try_new(method: Method, endpoint: &str) -> Result<Self> {
        Ok(Self::new(method, Uri::from_str(endpoint)?))
    }

    /// Append a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Append a batch of parameters.
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a raw body.
    ///
    /// Form-style requests carry the signed parameters in the body, so a raw
    /// body is only accepted by signers that sign headers instead.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Endpoint base URI.
    pub fn endpoint(&self) -> &Uri {
        &self.endpoint
    }

    /// Parameters in insertion order.
    pub fn params_ref(&self) -> &[(String, String)] {
        &self.params
    }

    /// Get a parameter by key.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Raw body, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Split into method, endpoint, parameters and body.
    pub fn into_parts(self) -> (Method, Uri, Vec<(String, String)>, Option<Bytes>) {
        (self.method, self.endpoint, self.params, self.body)
    }
}

impl Debug for UnsignedRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnsignedRequest")
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .field("params", &DebugParams(&self.params))
            .field("body", &self.body.as_ref().map(|b| b.len()))
            .finish()
    }
}

/// An API call with its signature, ready for transmission.
///
/// `params` holds every parameter (caller supplied, protocol injected and the
/// signature) unencoded, in canonical order with `Signature` last.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// HTTP method.
    pub method: Method,
    /// Endpoint base URI.
    pub endpoint: Uri,
    /// Flat parameter list.
    pub params: Vec<(String, String)>,
    /// Timestamp embedded in the request.
    pub timestamp: String,
    /// Nonce embedded in the request.
    pub nonce: String,
    /// Signature version identifier.
    pub signature_version: String,
    /// Base64 encoded signature, before percent-encoding.
    pub signature: String,
}

impl SignedRequest {
    /// Get a parameter by key.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Render parameters as `k=v&k=v` with keys and values percent-encoded.
    ///
    /// The same string is used as GET query or as form body.
    pub fn query_string(&self) -> String {
        let mut s = String::with_capacity(self.query_size());
        for (idx, (k, v)) in self.params.iter().enumerate() {
            if idx != 0 {
                s.push('&');
            }
            s.push_str(&percent_encode(k));
            s.push('=');
            s.push_str(&percent_encode(v));
        }
        s
    }

    #[inline]
    fn query_size(&self) -> usize {
        self.params
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum::<usize>()
    }

    /// Build the http request to hand to the transport.
    ///
    /// - `GET` and other methods: parameters go to the query string.
    /// - `POST`: parameters go to an `application/x-www-form-urlencoded` body.
    pub fn into_http_request(self) -> Result<http::Request<Bytes>> {
        let query = self.query_string();

        if self.method == Method::POST {
            let mut req = http::Request::builder()
                .method(self.method)
                .uri(self.endpoint)
                .body(Bytes::from(query))?;
            req.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            );
            return Ok(req);
        }

        let mut parts = self.endpoint.into_parts();
        let path = parts
            .path_and_query
            .as_ref()
            .map(|paq| paq.path().to_string())
            .unwrap_or_else(|| "/".to_string());
        parts.path_and_query = Some(PathAndQuery::from_str(&format!("{path}?{query}"))?);
        let uri = Uri::from_parts(parts)?;

        Ok(http::Request::builder()
            .method(self.method)
            .uri(uri)
            .body(Bytes::new())?)
    }
}

impl Debug for SignedRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedRequest")
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .field("params", &DebugParams(&self.params))
            .field("timestamp", &self.timestamp)
            .field("nonce", &self.nonce)
            .field("signature_version", &self.signature_version)
            .field("signature", &self.signature)
            .finish()
    }
}

struct DebugParams<'a>(&'a [(String, String)]);

impl Debug for DebugParams<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut m = f.debug_map();
        for (k, v) in self.0 {
            if SENSITIVE_PARAMS.contains(&k.as_str()) {
                m.entry(k, &Redact::from(v));
            } else {
                m.entry(k, v);
            }
        }
        m.finish()
    }
}

/// Reject requests whose parameter keys are not unique.
pub fn ensure_unique_keys(params: &[(String, String)]) -> Result<()> {
    let mut keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
    keys.sort_unstable();
    if let Some(w) = keys.windows(2).find(|w| w[0] == w[1]) {
        return Err(Error::malformed_request(format!(
            "parameter {} is supplied more than once",
            w[0]
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signed(method: Method) -> SignedRequest {
        SignedRequest {
            method,
            endpoint: Uri::from_static("https://ecs.aliyuncs.com/"),
            params: vec![
                ("Action".to_string(), "DescribeRegions".to_string()),
                ("Name".to_string(), "a b~c".to_string()),
                ("Signature".to_string(), "ab+/=".to_string()),
            ],
            timestamp: "2012-06-01T12:00:00Z".to_string(),
            nonce: "123".to_string(),
            signature_version: "1.0".to_string(),
            signature: "ab+/=".to_string(),
        }
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("a b"), "a%20b");
        assert_eq!(percent_encode("-_.~"), "-_.~");
        assert_eq!(percent_encode("*"), "%2A");
        assert_eq!(percent_encode("/"), "%2F");
        assert_eq!(percent_encode("中"), "%E4%B8%AD");
    }

    #[test]
    fn test_query_string_encodes_signature_again() {
        assert_eq!(
            signed(Method::GET).query_string(),
            "Action=DescribeRegions&Name=a%20b~c&Signature=ab%2B%2F%3D"
        );
    }

    #[test]
    fn test_into_http_request_get() {
        let req = signed(Method::GET).into_http_request().unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(
            req.uri().to_string(),
            "https://ecs.aliyuncs.com/?Action=DescribeRegions&Name=a%20b~c&Signature=ab%2B%2F%3D"
        );
        assert!(req.body().is_empty());
    }

    #[test]
    fn test_into_http_request_post_uses_form_body() {
        let req = signed(Method::POST).into_http_request().unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.uri().to_string(), "https://ecs.aliyuncs.com/");
        assert_eq!(
            req.headers()[CONTENT_TYPE],
            "application/x-www-form-urlencoded"
        );
        assert_eq!(
            req.body().as_ref(),
            b"Action=DescribeRegions&Name=a%20b~c&Signature=ab%2B%2F%3D"
        );
    }

    #[test]
    fn test_ensure_unique_keys() {
        let ok = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
        ];
        assert!(ensure_unique_keys(&ok).is_ok());

        let dup = vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "3".to_string()),
        ];
        let err = ensure_unique_keys(&dup).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::MalformedRequest);
    }

    #[test]
    fn test_debug_redacts_security_token() {
        let req = UnsignedRequest::new(Method::GET, Uri::from_static("https://ecs.aliyuncs.com/"))
            .param("SecurityToken", "a-very-long-security-token");
        let s = format!("{req:?}");
        assert!(!s.contains("a-very-long-security-token"));
        assert!(s.contains("a-v***ken"));
    }
}
