use serde::Serialize;

use crate::{
    error::{Result, WalletError},
    pass::PassType,
};

/// Boundary used by the batch demos.
pub const DEFAULT_BOUNDARY: &str = "batch_createobjectbatch";

const PART_CONTENT_TYPE: &str = "Content-Type: application/json";
const API_PATH_PREFIX: &str = "/walletobjects/v1";

/// One API call carried by a batch body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    pub method: String,
    pub path: String,
    pub json_body: String,
}

impl BatchRequest {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        json_body: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            json_body: json_body.into(),
        }
    }

    /// `POST /walletobjects/v1/<type>Object` creating `object`.
    pub fn insert_object<T: Serialize + ?Sized>(pass_type: PassType, object: &T) -> Result<Self> {
        let json_body = serde_json::to_string(object)?;
        Ok(Self::new(
            "POST",
            format!("{API_PATH_PREFIX}/{}", pass_type.object_resource()),
            json_body,
        ))
    }

    /// `POST /walletobjects/v1/<type>Class` creating `class`.
    pub fn insert_class<T: Serialize + ?Sized>(pass_type: PassType, class: &T) -> Result<Self> {
        let json_body = serde_json::to_string(class)?;
        Ok(Self::new(
            "POST",
            format!("{API_PATH_PREFIX}/{}", pass_type.class_resource()),
            json_body,
        ))
    }
}

/// `Content-Type` header value announcing `boundary`.
pub fn multipart_content_type(boundary: &str) -> String {
    format!("multipart/mixed; boundary={boundary}")
}

fn is_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "'()+_,-./:=? ".contains(c)
}

fn validate_boundary(boundary: &str) -> Result<()> {
    if boundary.is_empty() || boundary.len() > 70 {
        return Err(WalletError::validation(
            "boundary must be between 1 and 70 characters",
        ));
    }
    if !boundary.chars().all(is_boundary_char) || boundary.ends_with(' ') {
        return Err(WalletError::validation(format!(
            "boundary '{boundary}' contains characters not allowed in a multipart boundary"
        )));
    }
    Ok(())
}

fn validate_request(index: usize, request: &BatchRequest, delimiter: &str) -> Result<()> {
    let BatchRequest {
        method,
        path,
        json_body,
    } = request;

    if method.is_empty() || path.is_empty() {
        return Err(WalletError::validation(format!(
            "request {index} must have a method and a path"
        )));
    }
    if [method, path].iter().any(|s| s.contains(['\r', '\n'])) {
        return Err(WalletError::validation(format!(
            "request {index} has a line break in its request line"
        )));
    }
    if [method, path, json_body].iter().any(|s| s.contains(delimiter)) {
        return Err(WalletError::validation(format!(
            "request {index} contains the boundary delimiter '{delimiter}'"
        )));
    }
    Ok(())
}

/// Serializes `requests` into a `multipart/mixed` body delimited by `boundary`.
///
/// Any occurrence of `--<boundary>` inside a request is rejected, even mid-line
/// or as a prefix of a longer token, which is stricter than multipart parsing requires.
///
/// # Arguments
/// * `boundary` - Delimiter announced in the `Content-Type` header
/// * `requests` - Calls to embed, emitted in input order
///
/// # Returns
/// * `Result<String>` - The batch body, or a validation error if the batch is empty or
///   the boundary occurs inside any request
pub fn build_batch_body(boundary: &str, requests: &[BatchRequest]) -> Result<String> {
    validate_boundary(boundary)?;
    if requests.is_empty() {
        return Err(WalletError::validation(
            "batch must contain at least one request",
        ));
    }

    let delimiter = format!("--{boundary}");
    for (index, request) in requests.iter().enumerate() {
        validate_request(index, request, &delimiter)?;
    }

    let mut body = String::new();
    for request in requests {
        body.push_str(&delimiter);
        body.push('\n');
        body.push_str(PART_CONTENT_TYPE);
        body.push_str("\n\n");
        body.push_str(&request.method);
        body.push(' ');
        body.push_str(&request.path);
        body.push_str("\n\n");
        body.push_str(&request.json_body);
        body.push_str("\n\n");
    }
    body.push_str(&delimiter);
    body.push_str("--");

    log::debug!(
        "Built batch body with {} requests ({} bytes)",
        requests.len(),
        body.len()
    );

    Ok(body)
}

/// Splits a body produced by [`build_batch_body`] back into its requests.
pub fn parse_batch_body(boundary: &str, body: &str) -> Result<Vec<BatchRequest>> {
    let delimiter = format!("--{boundary}");
    let closing = format!("{delimiter}--");

    let parts = body
        .trim_end_matches(['\r', '\n'])
        .strip_suffix(closing.as_str())
        .ok_or_else(|| WalletError::validation("batch body is missing its closing delimiter"))?;

    let opening = format!("{delimiter}\n");
    let mut requests = Vec::new();
    for part in parts.split(opening.as_str()).skip(1) {
        let part = part
            .strip_prefix(PART_CONTENT_TYPE)
            .and_then(|p| p.strip_prefix("\n\n"))
            .ok_or_else(|| WalletError::validation("batch part is missing its content type"))?;

        let (request_line, rest) = part
            .split_once("\n\n")
            .ok_or_else(|| WalletError::validation("batch part is missing its request line"))?;
        let (method, path) = request_line
            .split_once(' ')
            .ok_or_else(|| WalletError::validation("malformed request line"))?;
        let json_body = rest.strip_suffix("\n\n").unwrap_or(rest);

        requests.push(BatchRequest::new(method, path, json_body));
    }

    if requests.is_empty() {
        return Err(WalletError::validation("batch body contains no parts"));
    }

    Ok(requests)
}
