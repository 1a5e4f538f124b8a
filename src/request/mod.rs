//! Request construction and parameter encoding.
//!
//! Building a request never touches the network: [`build`] parses and
//! percent-encodes the URL and assembles the header set, and
//! [`encode_parameters`] folds a parameter map into either a JSON body
//! (POST) or the URL query string (GET).

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::errors::{NetworkError, NetworkResult};

/// HTTP methods supported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET request; parameters are folded into the query string.
    Get,
    /// POST request; parameters are serialized as a JSON body.
    Post,
    /// DELETE request; parameters are not encoded.
    Delete,
}

impl HttpMethod {
    /// The method name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Request authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Bearer-token authorization. A `None` token means the `Authorization`
    /// header is omitted entirely.
    BearerToken(Option<String>),
}

/// A set of request parameters.
///
/// Values are optional: `None` serializes as JSON `null` in a POST body and
/// renders as the empty string in a GET query item. The map is ordered so
/// query item order is deterministic.
pub type Parameters = BTreeMap<String, Option<Value>>;

/// A fully described request, immutable once dispatch begins.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    /// The encoded target URL.
    pub url: Url,
    /// HTTP method.
    pub method: HttpMethod,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Builds a request descriptor from a raw URL string.
///
/// The URL is parsed and percent-encoded; an unparseable string fails with
/// [`NetworkError::BadUrl`]. The descriptor always carries
/// `Content-Type: application/json` and `Cache-Control: no-cache` (local
/// caches are always bypassed). A present, non-null bearer token adds an
/// `Authorization: Bearer <token>` header.
pub fn build(
    url: &str,
    method: HttpMethod,
    timeout: Duration,
    authorization: Option<&Authorization>,
) -> NetworkResult<RequestDescriptor> {
    let parsed = Url::parse(url).map_err(|_| NetworkError::bad_url(url))?;

    let mut headers = HashMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Cache-Control".to_string(), "no-cache".to_string());

    if let Some(Authorization::BearerToken(Some(token))) = authorization {
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    }

    Ok(RequestDescriptor {
        url: parsed,
        method,
        headers,
        body: None,
        timeout,
    })
}

/// Encodes a parameter set into the request.
///
/// - POST: the map is serialized as a JSON object into the request body;
///   serialization failure resolves to [`NetworkError::BadRequest`] carrying
///   the parameter set.
/// - GET: the URL query is replaced with one item per parameter. A `None`
///   value renders as the empty string. The final query represents space as
///   `%20` and a literal `+` as `%2B`, so servers that decode `+` as a space
///   cannot misread parameter values.
/// - DELETE: parameters are ignored; only POST bodies and GET queries carry
///   them.
///
/// Synchronous, no network side effects.
pub fn encode_parameters(
    descriptor: &mut RequestDescriptor,
    parameters: &Parameters,
) -> NetworkResult<()> {
    match descriptor.method {
        HttpMethod::Post => {
            let body = serde_json::to_vec(parameters).map_err(|_| NetworkError::BadRequest {
                parameters: parameters.clone(),
            })?;
            descriptor.body = Some(body);
        }
        HttpMethod::Get => {
            {
                let mut pairs = descriptor.url.query_pairs_mut();
                pairs.clear();
                for (key, value) in parameters {
                    pairs.append_pair(key, &render_query_value(value.as_ref()));
                }
            }
            // The form serializer writes space as '+' and a literal '+' as
            // "%2B"; rewriting the leftover '+' bytes gives space -> %20.
            let rewritten = descriptor.url.query().map(|q| q.replace('+', "%20"));
            descriptor.url.set_query(rewritten.as_deref());
        }
        HttpMethod::Delete => {}
    }
    Ok(())
}

/// Renders a parameter value for a GET query item.
///
/// `None` becomes the empty string, never the literal "null". String values
/// render unquoted; other JSON values render in their compact JSON form.
fn render_query_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
