//! Rebuilds an engine-facing request from a relayed call.

use std::collections::{BTreeMap, HashMap};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use tokio_stream::Stream;

use super::types::CorrelatedCall;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// A body that yields its bytes exactly once, then end-of-data.
#[derive(Debug, Default)]
pub struct OnceBody {
    data: Option<Bytes>,
}

impl OnceBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    /// Take the bytes. Every later call returns `None`.
    pub fn take(&mut self) -> Option<Bytes> {
        self.data.take()
    }

    pub const fn is_consumed(&self) -> bool {
        self.data.is_none()
    }
}

impl Stream for OnceBody {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        Poll::Ready(self.get_mut().data.take())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = usize::from(self.data.is_some());
        (n, Some(n))
    }
}

/// Request handed to a protocol engine.
#[derive(Debug)]
pub struct SyntheticRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: OnceBody,
}

impl SyntheticRequest {
    /// Validate and assemble a request. `target` is a path with optional query.
    pub fn build(
        method: &str,
        target: &str,
        headers: &BTreeMap<String, String>,
        body: impl Into<Bytes>,
    ) -> Result<Self, BuildError> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| BuildError::InvalidMethod(method.to_string()))?;
        let uri: Uri = target
            .parse()
            .map_err(|e| BuildError::InvalidTarget(format!("{target}: {e}")))?;
        if !target.starts_with('/') {
            return Err(BuildError::InvalidTarget(format!("{target}: not an origin-form path")));
        }

        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| BuildError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| BuildError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            map.append(header_name, header_value);
        }

        Ok(Self {
            method,
            uri,
            headers: map,
            body: OnceBody::new(body),
        })
    }

    pub fn from_call(call: &CorrelatedCall) -> Result<Self, BuildError> {
        Self::build(&call.method, &call.url, &call.headers, call.body.clone())
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Percent-decoded query parameter, parsed the way the HTTP routes parse
    /// theirs. A query string that fails to parse yields `None`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(&self.uri).ok()?;
        params.remove(name)
    }

    /// Header value as text, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    pub const fn body_mut(&mut self) -> &mut OnceBody {
        &mut self.body
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    fn headers() -> BTreeMap<String, String> {
        BTreeMap::from([("content-type".to_string(), "application/json".to_string())])
    }

    #[test]
    fn exposes_method_path_query_and_headers() {
        let req = SyntheticRequest::build("POST", "/message?sessionId=abc&x=1", &headers(), "{}")
            .unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/message");
        assert_eq!(req.query_param("sessionId").as_deref(), Some("abc"));
        assert_eq!(req.query_param("x").as_deref(), Some("1"));
        assert_eq!(req.query_param("missing"), None);
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn query_params_are_percent_decoded() {
        let req = SyntheticRequest::build("POST", "/message?sessionId=a%2Db&q=x+y", &headers(), "")
            .unwrap();
        assert_eq!(req.query_param("sessionId").as_deref(), Some("a-b"));
        assert_eq!(req.query_param("q").as_deref(), Some("x y"));
    }

    #[test]
    fn body_is_single_shot() {
        let mut req = SyntheticRequest::build("POST", "/m", &headers(), "payload").unwrap();
        assert_eq!(req.body_mut().take().as_deref(), Some(b"payload".as_slice()));
        assert!(req.body_mut().is_consumed());
        assert!(req.body_mut().take().is_none());
    }

    #[tokio::test]
    async fn body_streams_once_then_ends() {
        let mut body = OnceBody::new("chunk");
        assert_eq!(body.size_hint(), (1, Some(1)));
        assert_eq!(body.next().await.as_deref(), Some(b"chunk".as_slice()));
        assert!(body.next().await.is_none());
        assert!(body.next().await.is_none());
    }

    #[test]
    fn rejects_bad_method_target_and_header() {
        assert!(matches!(
            SyntheticRequest::build("GE T", "/m", &headers(), ""),
            Err(BuildError::InvalidMethod(_))
        ));
        assert!(matches!(
            SyntheticRequest::build("POST", "message", &headers(), ""),
            Err(BuildError::InvalidTarget(_))
        ));
        let bad = BTreeMap::from([("bad header".to_string(), "v".to_string())]);
        assert!(matches!(
            SyntheticRequest::build("POST", "/m", &bad, ""),
            Err(BuildError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn from_call_copies_fields() {
        let call = CorrelatedCall {
            request_id: "r".into(),
            session_id: "s".into(),
            method: "POST".into(),
            url: "/message?sessionId=s".into(),
            headers: headers(),
            body: "{\"a\":1}".into(),
        };
        let mut req = SyntheticRequest::from_call(&call).unwrap();
        assert_eq!(req.query_param("sessionId").as_deref(), Some("s"));
        assert_eq!(req.body_mut().take().as_deref(), Some(b"{\"a\":1}".as_slice()));
    }
}
