//! Scripted query service for unit tests.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{PartchainError, Result};
use crate::query::ResultFormat;
use crate::service::QueryService;

/// Answers each query with the body of the first rule whose needle the
/// query text contains, and records every query it receives.
#[derive(Default)]
pub struct ScriptedService {
    rules: Vec<(String, String)>,
    seen: Mutex<Vec<(String, ResultFormat)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, needle: &str, body: &str) -> Self {
        self.rules.push((needle.to_string(), body.to_string()));
        self
    }

    pub fn seen(&self) -> Vec<(String, ResultFormat)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryService for ScriptedService {
    async fn tuples(&self, query: &str, format: ResultFormat) -> Result<String> {
        self.seen.lock().unwrap().push((query.to_string(), format));
        self.rules
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| PartchainError::Transport(format!("no scripted answer for {}", query)))
    }
}

/// Simple-format body binding `label` to each pid.
pub fn simple_rows(label: &str, pids: &[&str]) -> String {
    pids.iter()
        .map(|p| format!("{} : <info:fedora/{}>\n", label, p))
        .collect()
}

/// CSV body of `(successor, predecessor)` pairs.
pub fn edge_rows(pairs: &[(&str, &str)]) -> String {
    let mut body = String::from("\"object\",\"previous\"\n");
    for (next, prev) in pairs {
        body.push_str(&format!("info:fedora/{},info:fedora/{}\n", next, prev));
    }
    body
}
