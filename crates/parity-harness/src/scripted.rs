//! Scripted in-memory transport for harness tests.
//!
//! Responses are queued per method; when a method's queue is down to its
//! last entry that entry repeats, which is what polling loops (`tx`,
//! `account_objects`) need. Every call is recorded so tests can assert on
//! retry counts and request rewrites.

use std::collections::{HashMap, VecDeque};

use anyhow::{bail, Result};
use parking_lot::Mutex;
use serde_json::Value;

use xrpl_parity_transport::Rpc;

#[derive(Default)]
pub struct ScriptedRpc {
    responses: Mutex<HashMap<String, VecDeque<Value>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `method`. Builder-style for test setup.
    pub fn respond(self, method: &str, response: Value) -> Self {
        self.push(method, response);
        self
    }

    /// Queue a response on an already-shared instance.
    pub fn push(&self, method: &str, response: Value) {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    /// How many times `method` was called.
    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }
}

impl Rpc for ScriptedRpc {
    fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.calls.lock().push((method.to_string(), params));
        let mut responses = self.responses.lock();
        let Some(queue) = responses.get_mut(method) else {
            bail!("no scripted response for method '{method}'");
        };
        match queue.len() {
            0 => bail!("scripted responses for '{method}' exhausted"),
            // Last response repeats so polling loops converge.
            1 => Ok(queue.front().cloned().unwrap_or(Value::Null)),
            _ => Ok(queue.pop_front().unwrap_or(Value::Null)),
        }
    }
}
