//! Firebase Realtime Database store over the REST API

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::config::StoreConfig;
use crate::io::{HttpClient, LineReader};
use crate::record::{parse_snapshot, BinCollection, BinRecord};
use crate::store::{BinStore, Subscription};

/// Bin collection stored under a path of a Firebase Realtime Database
pub struct FirebaseStore {
    base_url: String,
    collection_path: String,
    auth_key: Option<String>,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for FirebaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseStore")
            .field("base_url", &self.base_url)
            .field("collection_path", &self.collection_path)
            .finish()
    }
}

impl FirebaseStore {
    /// Build a store from a firebase store config.
    ///
    /// Returns a configuration error for any other store type.
    pub fn new(config: &StoreConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let StoreConfig::Firebase {
            database_url,
            collection_path,
            auth_key,
            ..
        } = config
        else {
            return Err(crate::BinwatchError::Config(format!(
                "Expected a firebase store, got '{}'",
                config.type_name()
            )));
        };

        let base_url = database_url.trim_end_matches('/').to_string();
        let collection_path = collection_path.trim_matches('/').to_string();

        tracing::debug!(
            "Created FirebaseStore for '{}' at {}",
            collection_path,
            base_url
        );

        Ok(Self {
            base_url,
            collection_path,
            auth_key: auth_key.clone(),
            http,
        })
    }

    fn url(&self, child: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.base_url, self.collection_path);
        if let Some(child) = child {
            url.push('/');
            url.push_str(child);
        }
        url.push_str(".json");
        if let Some(auth) = &self.auth_key {
            url.push_str("?auth=");
            url.push_str(auth);
        }
        url
    }

    fn check_status(&self, action: &str, status: u16, body: &str) -> crate::Result<()> {
        if status != 200 {
            return Err(crate::BinwatchError::Store(format!(
                "Firebase {} returned status {}: {}",
                action, status, body
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BinStore for FirebaseStore {
    fn type_name(&self) -> &str {
        "firebase"
    }

    async fn fetch(&self) -> crate::Result<BinCollection> {
        let response = self.http.get(&self.url(None)).await?;
        self.check_status("fetch", response.status, &response.body)?;
        let value: serde_json::Value = serde_json::from_str(&response.body)?;
        parse_snapshot(value)
    }

    async fn set(&self, bin_id: &str, record: &BinRecord) -> crate::Result<()> {
        let body = serde_json::to_value(record)?;
        let response = self.http.put_json(&self.url(Some(bin_id)), &body).await?;
        self.check_status("set", response.status, &response.body)
    }

    async fn remove_all(&self) -> crate::Result<()> {
        let response = self.http.delete(&self.url(None)).await?;
        self.check_status("remove", response.status, &response.body)
    }

    async fn subscribe(&self) -> crate::Result<Box<dyn Subscription>> {
        let lines = self
            .http
            .get_lines(&self.url(None), "text/event-stream")
            .await?;
        tracing::debug!(
            "Streaming Firebase collection '{}'",
            self.collection_path
        );
        Ok(Box::new(FirebaseSubscription::new(lines)))
    }
}

/// Body of a `put` or `patch` stream event
#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    #[serde(default)]
    data: Value,
}

/// Server-sent event stream of a Firebase location.
///
/// Keeps a local copy of the raw collection, applies every `put` and
/// `patch` to it and yields the parsed collection after each one.
struct FirebaseSubscription {
    lines: Box<dyn LineReader>,
    tree: Value,
    event: String,
    data: String,
}

impl FirebaseSubscription {
    fn new(lines: Box<dyn LineReader>) -> Self {
        Self {
            lines,
            tree: Value::Null,
            event: String::new(),
            data: String::new(),
        }
    }

    fn read_field(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => self.event = value.to_string(),
            "data" => {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value);
            }
            _ => {}
        }
    }

    /// Apply a complete event. Returns whether the collection changed.
    fn dispatch(&mut self, event: &str, data: &str) -> crate::Result<bool> {
        match event {
            "put" | "patch" => {
                let payload: StreamPayload = match serde_json::from_str(data) {
                    Ok(payload) => payload,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable Firebase {} event: {}", event, e);
                        return Ok(false);
                    }
                };
                let path = segments(&payload.path);
                let tree = std::mem::take(&mut self.tree);
                if event == "put" {
                    self.tree = put_at(tree, &path, payload.data);
                    return Ok(true);
                }
                let Value::Object(children) = payload.data else {
                    tracing::warn!("Skipping Firebase patch without an object body");
                    self.tree = tree;
                    return Ok(false);
                };
                self.tree = children.into_iter().fold(tree, |tree, (key, value)| {
                    let mut child_path = path.clone();
                    child_path.extend(segments(&key));
                    put_at(tree, &child_path, value)
                });
                Ok(true)
            }
            "keep-alive" | "" => Ok(false),
            "cancel" => Err(crate::BinwatchError::Store(format!(
                "Firebase cancelled the stream: {}",
                data
            ))),
            "auth_revoked" => Err(crate::BinwatchError::Store(
                "Firebase revoked the stream credential".to_string(),
            )),
            other => {
                tracing::debug!("Ignoring Firebase '{}' event", other);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl Subscription for FirebaseSubscription {
    async fn next(&mut self) -> Option<crate::Result<BinCollection>> {
        loop {
            let line = match self.lines.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            if !line.is_empty() {
                self.read_field(&line);
                continue;
            }

            let event = std::mem::take(&mut self.event);
            let data = std::mem::take(&mut self.data);
            match self.dispatch(&event, &data) {
                Ok(true) => match parse_snapshot(self.tree.clone()) {
                    Ok(collection) => return Some(Ok(collection)),
                    Err(e) => tracing::warn!("Skipping unreadable collection: {}", e),
                },
                Ok(false) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Replace the value at `path` below `node`, the way the database does:
/// writing `null` deletes, and parents left without children disappear.
fn put_at(node: Value, path: &[String], data: Value) -> Value {
    let Some((first, rest)) = path.split_first() else {
        return data;
    };

    let mut children = match node {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Map::new(),
    };

    let child = children.remove(first).unwrap_or(Value::Null);
    let updated = put_at(child, rest, data);
    if !is_empty(&updated) {
        children.insert(first.clone(), updated);
    }

    if children.is_empty() {
        Value::Null
    } else {
        Value::Object(children)
    }
}
