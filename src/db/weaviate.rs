use async_trait::async_trait;
use reqwest::{ Client, Method, Response };
use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE };
use serde::Deserialize;
use serde_json::{ json, Map, Value };
use std::sync::{ PoisonError, RwLock };
use log::{ info, error, warn, debug };

use super::{ CollectionBrowser, ConnectionConfig, DatabaseObject, DEFAULT_OBJECT_LIMIT };
use crate::error::{ BrowserError, Result };
use crate::schema::{ summarize_classes, CollectionSchema, CollectionSummary };

/// Key under which GraphQL responses carry id, vector and timestamps.
const ADDITIONAL_FIELD: &str = "_additional";

#[derive(Debug, Deserialize)]
struct SchemaListing {
    #[serde(default)]
    classes: Option<Vec<ClassEntry>>,
}

#[derive(Debug, Deserialize)]
struct ClassEntry {
    class: String,
}

#[derive(Debug, Clone)]
struct Session {
    base_url: String,
    headers: HeaderMap,
}

impl Session {
    fn from_config(config: &ConnectionConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = config.bearer_token() {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_|
                BrowserError::InvalidConfig("API key contains invalid header characters".into())
            )?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(Self {
            base_url: config.base_url(),
            headers,
        })
    }
}

/// HTTP client for a single Weaviate endpoint.
///
/// The client starts disconnected. `connect` probes `/v1/meta` and, on
/// success, keeps the base URL and headers for every later call. Failed data
/// calls never tear the session down; only `disconnect` or a failed
/// `connect` does.
pub struct WeaviateClient {
    client: Client,
    session: RwLock<Option<Session>>,
}

impl Default for WeaviateClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeaviateClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            session: RwLock::new(None),
        }
    }

    /// Opens a session. Never fails: an unreachable endpoint, a non-success
    /// status or an unusable config all yield `false` and leave the client
    /// disconnected.
    pub async fn connect(&self, config: &ConnectionConfig) -> bool {
        if config.host.trim().is_empty() {
            error!("Failed to connect to Weaviate: host is empty");
            self.set_session(None);
            return false;
        }

        let session = match Session::from_config(config) {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to connect to Weaviate: {}", e);
                self.set_session(None);
                return false;
            }
        };

        let meta_url = format!("{}/meta", session.base_url);
        info!("Connecting to Weaviate at {}", session.base_url);

        match self.client.get(&meta_url).headers(session.headers.clone()).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Connected to Weaviate at {}", session.base_url);
                self.set_session(Some(session));
                true
            }
            Ok(resp) => {
                error!("Failed to connect to Weaviate (Status: {})", resp.status());
                self.set_session(None);
                false
            }
            Err(e) => {
                error!("Failed to connect to Weaviate: {}", e);
                self.set_session(None);
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Drops the session. Safe to call when already disconnected.
    pub fn disconnect(&self) {
        if self.session.read().unwrap_or_else(PoisonError::into_inner).is_some() {
            info!("Disconnecting from Weaviate.");
        }
        self.set_session(None);
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn current_session(&self) -> Result<Session> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(BrowserError::NotConnected)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        let session = self.current_session()?;
        let url = format!("{}{}", session.base_url, path);
        debug!("Weaviate request: {} {}", method, url);

        let mut request = self.client.request(method.clone(), &url).headers(session.headers);
        if let Some(b) = body {
            request = request.json(b);
        }

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!("Weaviate request {} {} failed: {}", method, url, e);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!("Weaviate request {} {} failed (Status: {}): {}", method, url, status, text);
            return Err(BrowserError::from_status(status));
        }
        Ok(response)
    }

    async fn send_for_json(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let text = self.send(method, path, body).await?.text().await?;
        debug!("Weaviate response for {}: {} bytes", path, text.len());
        match serde_json::from_str(&text) {
            Ok(v) => Ok(v),
            Err(e) => {
                error!("Failed to parse Weaviate response for {}: {}. Text: {}", path, e, text);
                Err(e.into())
            }
        }
    }

    /// Like `get_objects`, but also selects the given top-level properties so
    /// the server returns user data next to the metadata.
    pub async fn get_objects_with_properties(
        &self,
        collection_name: &str,
        limit: usize,
        properties: &[String]
    ) -> Result<Vec<DatabaseObject>> {
        self.current_session()?;
        let query = build_get_query(collection_name, limit, properties)?;
        debug!("Fetching up to {} objects from '{}'", limit, collection_name);

        let mut result = self.send_for_json(
            Method::POST,
            "/graphql",
            Some(&json!({ "query": query }))
        ).await?;

        if let Err(e) = check_graphql_errors(&result) {
            error!("GraphQL query on '{}' failed: {}", collection_name, e);
            return Err(e);
        }

        let records = result
            .get_mut("data")
            .and_then(|d| d.get_mut("Get"))
            .and_then(|g| g.get_mut(collection_name))
            .map(Value::take);
        let records = match records {
            None | Some(Value::Null) => {
                return Ok(Vec::new());
            }
            Some(Value::Array(records)) => records,
            Some(other) => {
                error!("Unexpected Get payload for '{}': {}", collection_name, other);
                return Err(
                    BrowserError::MalformedResponse(
                        format!("expected a list of objects for '{}'", collection_name)
                    )
                );
            }
        };

        let objects = records
            .into_iter()
            .map(|record| record_to_object(record, collection_name))
            .collect::<Result<Vec<_>>>()?;
        debug!("Parsed {} objects from '{}'.", objects.len(), collection_name);
        Ok(objects)
    }

    /// `get_objects` with the default page size.
    pub async fn get_objects_default(&self, collection_name: &str) -> Result<Vec<DatabaseObject>> {
        self.get_objects(collection_name, DEFAULT_OBJECT_LIMIT).await
    }

    /// Collection names together with their vectorizer and property count.
    pub async fn list_collection_summaries(&self) -> Result<Vec<CollectionSummary>> {
        let listing = self.send_for_json(Method::GET, "/schema", None).await?;
        Ok(summarize_classes(&listing))
    }

    pub async fn describe_collection(&self, collection_name: &str) -> Result<CollectionSchema> {
        let raw = self.get_collection_schema(collection_name).await?;
        CollectionSchema::from_value(&raw)
    }
}

#[async_trait]
impl CollectionBrowser for WeaviateClient {
    async fn list_collections(&self) -> Result<Vec<String>> {
        let listing: SchemaListing = serde_json::from_value(
            self.send_for_json(Method::GET, "/schema", None).await?
        )?;
        let names: Vec<String> = listing.classes
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.class)
            .collect();
        info!("Found {} collections in Weaviate.", names.len());
        Ok(names)
    }

    async fn get_objects(
        &self,
        collection_name: &str,
        limit: usize
    ) -> Result<Vec<DatabaseObject>> {
        self.get_objects_with_properties(collection_name, limit, &[]).await
    }

    async fn get_collection_schema(&self, collection_name: &str) -> Result<Value> {
        self.current_session()?;
        validate_name(collection_name)?;
        self.send_for_json(Method::GET, &format!("/schema/{}", collection_name), None).await
    }

    async fn delete_collection(&self, collection_name: &str) -> Result<bool> {
        self.current_session()?;
        validate_name(collection_name)?;
        self.send(Method::DELETE, &format!("/schema/{}", collection_name), None).await?;
        info!("Deleted collection '{}'.", collection_name);
        Ok(true)
    }
}

/// GraphQL names: `[_A-Za-z][_0-9A-Za-z]*`. Anything else could alter the
/// query or the request path, so it is rejected before any request.
fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        warn!("Rejected invalid name '{}'", name);
        Err(BrowserError::InvalidName(name.to_string()))
    }
}

pub fn build_get_query(
    collection_name: &str,
    limit: usize,
    properties: &[String]
) -> Result<String> {
    validate_name(collection_name)?;
    let mut selection = String::new();
    for property in properties {
        validate_name(property)?;
        if property == ADDITIONAL_FIELD {
            continue;
        }
        selection.push_str(property);
        selection.push(' ');
    }
    Ok(
        format!(
            "{{ Get {{ {}(limit: {}) {{ {}{} {{ id vector creationTimeUnix lastUpdateTimeUnix }} }} }} }}",
            collection_name,
            limit,
            selection,
            ADDITIONAL_FIELD
        )
    )
}

fn error_message(error: &Value) -> Option<String> {
    error.get("message").and_then(Value::as_str).map(String::from)
}

/// An `errors` list that is present but empty counts as no error. Any other
/// non-null `errors` value fails the query.
fn check_graphql_errors(result: &Value) -> Result<()> {
    match result.get("errors") {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(errors)) =>
            match errors.first() {
                None => Ok(()),
                Some(first) =>
                    Err(
                        BrowserError::Query(
                            error_message(first).unwrap_or_else(|| "unknown GraphQL error".to_string())
                        )
                    ),
            }
        Some(other) =>
            match error_message(other) {
                Some(message) => Err(BrowserError::Query(message)),
                None =>
                    Err(BrowserError::MalformedResponse(format!("unexpected errors payload: {}", other))),
            }
    }
}

fn record_to_object(record: Value, collection_name: &str) -> Result<DatabaseObject> {
    let Value::Object(mut fields) = record else {
        return Err(
            BrowserError::MalformedResponse(format!("object in '{}' is not a map", collection_name))
        );
    };

    let additional = match fields.shift_remove(ADDITIONAL_FIELD) {
        Some(Value::Object(map)) => map,
        _ => {
            return Err(
                BrowserError::MalformedResponse(
                    format!("object in '{}' has no {} block", collection_name, ADDITIONAL_FIELD)
                )
            );
        }
    };

    let id = additional
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(||
            BrowserError::MalformedResponse(format!("object in '{}' has no id", collection_name))
        )?
        .to_string();

    let vector: Option<Vec<f64>> = match additional.get("vector") {
        None | Some(Value::Null) => None,
        Some(v) => Some(serde_json::from_value(v.clone())?),
    };

    Ok(DatabaseObject {
        id,
        class: collection_name.to_string(),
        properties: fields,
        vector,
        creation_time_unix: parse_unix_time(&additional, "creationTimeUnix"),
        last_update_time_unix: parse_unix_time(&additional, "lastUpdateTimeUnix"),
    })
}

/// GraphQL returns these as strings of digits; REST returns integers.
fn parse_unix_time(additional: &Map<String, Value>, key: &str) -> Option<i64> {
    match additional.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
