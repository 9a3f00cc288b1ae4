use std::sync::Arc;

use futures::FutureExt as _;
use futures::future::BoxFuture;
use log::debug;
use reqwest::Client;
use serde_json::{Map, Value, json};

use crate::backend::ensure_success;
use crate::error::TransportError;
use crate::payload::NodeId;

/// Asks the host pipeline to recompute some output nodes
pub trait ReloadTrigger: Send + Sync {
    fn queue_output_nodes(
        &self,
        node_ids: &[NodeId],
    ) -> BoxFuture<'static, Result<(), TransportError>>;
}

/// Supplies the host's full prompt graph: node id to `{class_type, inputs}`
pub trait PromptSource: Send + Sync {
    fn prompt(&self) -> BoxFuture<'static, Result<Map<String, Value>, TransportError>>;
}

/// Keeps the requested nodes plus everything they depend on.
///
/// An input that is a `[node_id, slot]` array links to an upstream node.
/// Ids missing from the prompt are skipped.
pub fn restrict_prompt(full: &Map<String, Value>, targets: &[NodeId]) -> Map<String, Value> {
    let mut subset = Map::new();
    let mut stack: Vec<String> = targets.iter().map(|id| id.as_str().to_owned()).collect();
    while let Some(id) = stack.pop() {
        if subset.contains_key(&id) {
            continue;
        }
        let Some(node) = full.get(&id) else {
            continue;
        };
        subset.insert(id, node.clone());
        let Some(inputs) = node.get("inputs").and_then(Value::as_object) else {
            continue;
        };
        for input in inputs.values() {
            if let Some(upstream) = input.as_array().and_then(|link| link.first()) {
                match upstream {
                    Value::String(text) => stack.push(text.clone()),
                    Value::Number(number) => stack.push(number.to_string()),
                    _ => {}
                }
            }
        }
    }
    subset
}

/// Queues only the part of the prompt that feeds the requested nodes
pub struct PromptSubsetTrigger {
    client: Client,
    base_url: String,
    source: Arc<dyn PromptSource>,
    client_id: Option<String>,
}

impl PromptSubsetTrigger {
    pub fn new(base_url: &str, source: Arc<dyn PromptSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            source,
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn prompt_url(&self) -> String {
        format!("{}/prompt", self.base_url)
    }
}

impl ReloadTrigger for PromptSubsetTrigger {
    fn queue_output_nodes(
        &self,
        node_ids: &[NodeId],
    ) -> BoxFuture<'static, Result<(), TransportError>> {
        let prompt = self.source.prompt();
        let targets = node_ids.to_vec();
        let client = self.client.clone();
        let url = self.prompt_url();
        let client_id = self.client_id.clone();
        async move {
            let full = prompt.await?;
            let subset = restrict_prompt(&full, &targets);
            if subset.is_empty() {
                return Err(TransportError::Rejected(format!(
                    "none of {targets:?} are part of the prompt"
                )));
            }
            debug!("queueing {} of {} prompt nodes for {targets:?}", subset.len(), full.len());

            let mut body = json!({ "prompt": subset });
            if let Some(client_id) = client_id {
                body["client_id"] = Value::String(client_id);
            }
            let response = client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|source| TransportError::Request {
                    url: url.clone(),
                    source,
                })?;
            ensure_success(response, &url).map(|_| ())
        }
        .boxed()
    }
}
