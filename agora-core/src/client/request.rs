//! Owned request descriptors.
//!
//! A request is kept as plain data rather than a transport request so it can
//! be dispatched again after a refresh, multipart bodies included.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<MultipartPart>),
}

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    name: String,
    bytes: Vec<u8>,
    file_name: Option<String>,
    mime_type: Option<String>,
}

impl MultipartPart {
    /// A part holding `value` serialized as JSON, typed `application/json`.
    pub fn json<T: Serialize>(name: impl Into<String>, value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            name: name.into(),
            bytes: serde_json::to_vec(value)?,
            file_name: None,
            mime_type: Some("application/json".to_string()),
        })
    }

    /// A binary file part.
    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            bytes,
            file_name: Some(file_name.into()),
            mime_type: Some(mime_type.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn to_part(&self) -> Result<Part, reqwest::Error> {
        let mut part = Part::bytes(self.bytes.clone());
        if let Some(file_name) = &self.file_name {
            part = part.file_name(file_name.clone());
        }
        if let Some(mime) = &self.mime_type {
            part = part.mime_str(mime)?;
        }
        Ok(part)
    }
}

/// Build a fresh transport form; forms are consumed by sending.
pub(crate) fn build_form(parts: &[MultipartPart]) -> Result<Form, reqwest::Error> {
    parts.iter().try_fold(Form::new(), |form, part| {
        Ok(form.part(part.name.clone(), part.to_part()?))
    })
}

/// A request against the board API, relative to the configured API root.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Use `body` serialized as JSON.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, serde_json::Error> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<MultipartPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Whether this request has already been replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_query_and_body() {
        let request = ApiRequest::get("/boards")
            .query("page", 0)
            .query("size", 10);

        assert_eq!(*request.method(), Method::GET);
        assert_eq!(
            request.query_pairs(),
            &[
                ("page".to_string(), "0".to_string()),
                ("size".to_string(), "10".to_string())
            ]
        );
        assert!(matches!(request.body(), RequestBody::Empty));
        assert!(!request.is_retried());
    }

    #[test]
    fn test_clone_keeps_retry_marker() {
        let mut request = ApiRequest::delete("/boards/1");
        request.mark_retried();
        assert!(request.clone().is_retried());
    }

    #[test]
    fn test_json_part_is_typed() {
        let part = MultipartPart::json("request", &serde_json::json!({"title": "t"})).unwrap();
        assert_eq!(part.name(), "request");
        assert_eq!(part.mime_type(), Some("application/json"));
        assert_eq!(part.bytes(), br#"{"title":"t"}"#);
        assert!(part.file_name().is_none());
    }

    #[test]
    fn test_build_form_accepts_parts() {
        let parts = vec![
            MultipartPart::json("request", &serde_json::json!({})).unwrap(),
            MultipartPart::file("file", "a.png", "image/png", vec![1, 2, 3]),
        ];
        assert!(build_form(&parts).is_ok());
    }

    #[test]
    fn test_build_form_rejects_bad_mime() {
        let parts = vec![MultipartPart::file("file", "a.bin", "not a mime", vec![])];
        assert!(build_form(&parts).is_err());
    }
}
