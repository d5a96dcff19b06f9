//! Request body builder.
//!
//! # Design
//! A request holds two namespaces, `params` and `store_params`, each split
//! into flat string pairs and structured JSON pairs. `serialize` merges the
//! two halves of each namespace into one JSON object without mutating the
//! request, so repeated calls produce the same bytes. Sorted maps keep the
//! key order stable.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Flat string parameters, as handed to a `RequestInit` hook.
pub type Params = BTreeMap<String, String>;

/// Populates fixed parameters when a request is created, e.g. device or
/// session identifiers.
pub trait RequestInit: Send + Sync {
    fn on_create(&self, params: &mut Params);
}

impl<F> RequestInit for F
where
    F: Fn(&mut Params) + Send + Sync,
{
    fn on_create(&self, params: &mut Params) {
        self(params)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Namespace {
    flat: Params,
    json: BTreeMap<String, Value>,
}

impl Namespace {
    fn is_empty(&self) -> bool {
        self.flat.is_empty() && self.json.is_empty()
    }

    /// Structured values first, then flat strings; a key present in both
    /// ends up holding the flat string.
    fn merged(&self) -> Map<String, Value> {
        let mut out = self.json.clone();
        for (key, value) in &self.flat {
            out.insert(key.clone(), Value::String(value.clone()));
        }
        out.into_iter().collect()
    }
}

/// JSON request body with `params` and `store_params` namespaces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    params: Namespace,
    store_params: Namespace,
}

impl ApiRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request whose flat params are pre-populated by `init`.
    pub fn with_init(init: &dyn RequestInit) -> Self {
        let mut request = Self::new();
        init.on_create(&mut request.params.flat);
        request
    }

    /// Insert or overwrite a flat string in `params`.
    pub fn add_to_params(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.flat.insert(key.into(), value.into());
        self
    }

    /// Insert or overwrite a flat string in `store_params`.
    pub fn add_to_store_params(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.store_params.flat.insert(key.into(), value.into());
        self
    }

    /// Insert a structured value into `params`.
    ///
    /// A value that cannot be represented as JSON is skipped and the key
    /// stays absent.
    pub fn add_to_json_params<V: Serialize>(mut self, key: impl Into<String>, value: V) -> Self {
        insert_json(&mut self.params.json, key.into(), &value);
        self
    }

    /// Insert a structured value into `store_params`. Unrepresentable values
    /// are skipped.
    pub fn add_to_json_store_params<V: Serialize>(
        mut self,
        key: impl Into<String>,
        value: V,
    ) -> Self {
        insert_json(&mut self.store_params.json, key.into(), &value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.store_params.is_empty()
    }

    /// Build the body value. Empty namespaces are left out.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        if !self.params.is_empty() {
            body.insert("params".to_string(), Value::Object(self.params.merged()));
        }
        if !self.store_params.is_empty() {
            body.insert(
                "store_params".to_string(),
                Value::Object(self.store_params.merged()),
            );
        }
        Value::Object(body)
    }

    /// Encode the body as a JSON string.
    pub fn serialize(&self) -> String {
        self.to_json().to_string()
    }
}

impl std::fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize())
    }
}

fn insert_json<V: Serialize>(target: &mut BTreeMap<String, Value>, key: String, value: &V) {
    match serde_json::to_value(value) {
        Ok(json) => {
            target.insert(key, json);
        }
        Err(e) => {
            tracing::debug!(target: "apiworker", key = %key, error = %e, "dropping unrepresentable json param");
        }
    }
}
