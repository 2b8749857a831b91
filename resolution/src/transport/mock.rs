//! Scripted in-memory provider.
//!
//! Replies are registered up front and matched against incoming requests:
//!
//! - `eth_call` by target address and calldata prefix (longest prefix wins,
//!   so a selector-wide default can coexist with argument-specific replies)
//! - `eth_getLogs` by contract address and topic0
//! - anything else by method name
//!
//! Every request is recorded, which is how tests assert that a probe was
//! issued once and only once.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use super::Provider;
use crate::abi::Word;
use crate::error::{ResolutionError, Result};
use crate::types::Address;

#[derive(Debug, Clone)]
enum Matcher {
    Call { to: Address, data_prefix: Vec<u8> },
    Logs { address: Address, topic0: Word },
    Method(String),
}

#[derive(Debug, Clone)]
struct Rule {
    matcher: Matcher,
    reply: Result<Value>,
}

/// A [`Provider`] answering from registered rules.
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    url: Option<String>,
    rules: Mutex<Vec<Rule>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            rules: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reports `url` from [`Provider::url`], for location lookups.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    fn push(&self, matcher: Matcher, reply: Result<Value>) {
        self.rules.lock().push(Rule { matcher, reply });
    }

    /// Answers `eth_call` to `to` whose calldata starts with `data_prefix`.
    pub fn on_call(&self, to: Address, data_prefix: impl AsRef<[u8]>, reply: impl AsRef<[u8]>) {
        self.push(
            Matcher::Call {
                to,
                data_prefix: data_prefix.as_ref().to_vec(),
            },
            Ok(json!(format!("0x{}", hex::encode(reply.as_ref())))),
        );
    }

    /// Fails `eth_call` to `to` whose calldata starts with `data_prefix`.
    pub fn on_call_error(&self, to: Address, data_prefix: impl AsRef<[u8]>, error: ResolutionError) {
        self.push(
            Matcher::Call {
                to,
                data_prefix: data_prefix.as_ref().to_vec(),
            },
            Err(error),
        );
    }

    /// Answers `eth_getLogs` on `address` filtered by `topic0`.
    pub fn on_logs(&self, address: Address, topic0: Word, logs: Vec<Value>) {
        self.push(Matcher::Logs { address, topic0 }, Ok(Value::Array(logs)));
    }

    /// Fails `eth_getLogs` on `address` filtered by `topic0`.
    pub fn on_logs_error(&self, address: Address, topic0: Word, error: ResolutionError) {
        self.push(Matcher::Logs { address, topic0 }, Err(error));
    }

    /// Answers any request for `method` not matched by a more specific rule.
    pub fn on_method(&self, method: &str, reply: Result<Value>) {
        self.push(Matcher::Method(method.to_string()), reply);
    }

    /// Builds an `eth_getLogs` entry the way nodes return it.
    pub fn log_entry(block_number: u64, log_index: u64, topics: &[Word], data: &[u8]) -> Value {
        json!({
            "blockNumber": format!("0x{:x}", block_number),
            "logIndex": format!("0x{:x}", log_index),
            "transactionHash": format!("0x{:064x}", block_number * 1000 + log_index),
            "topics": topics.iter().map(|t| format!("0x{}", hex::encode(t))).collect::<Vec<_>>(),
            "data": format!("0x{}", hex::encode(data)),
        })
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().clone()
    }

    /// Number of requests for `method`.
    pub fn request_count(&self, method: &str) -> usize {
        self.requests.lock().iter().filter(|(m, _)| m == method).count()
    }

    /// Number of `eth_call`s to `to` whose calldata starts with `selector`.
    pub fn call_count(&self, to: Address, selector: [u8; 4]) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(m, _)| m == "eth_call")
            .filter_map(|(_, params)| call_target(params))
            .filter(|(addr, data)| *addr == to && data.starts_with(&selector))
            .count()
    }

    fn no_rule(&self, method: &str) -> ResolutionError {
        ResolutionError::ServiceProviderError {
            provider: self.name.clone(),
            code: None,
            message: format!("no scripted reply for {}", method),
        }
    }
}

fn parse_hex(s: &str) -> Option<Vec<u8>> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).ok()
}

fn call_target(params: &Value) -> Option<(Address, Vec<u8>)> {
    let call = params.get(0)?;
    let to = call.get("to")?.as_str()?.parse().ok()?;
    let data = parse_hex(call.get("data")?.as_str()?)?;
    Some((to, data))
}

fn logs_target(params: &Value) -> Option<(Address, Word)> {
    let filter = params.get(0)?;
    let address = filter.get("address")?.as_str()?.parse().ok()?;
    let topic = parse_hex(filter.get("topics")?.get(0)?.as_str()?)?;
    let topic: Word = topic.try_into().ok()?;
    Some((address, topic))
}

#[async_trait]
impl Provider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        self.requests.lock().push((method.to_string(), params.clone()));
        let rules = self.rules.lock();

        let specific = match method {
            "eth_call" => call_target(&params).and_then(|(to, data)| {
                rules
                    .iter()
                    .filter_map(|rule| match &rule.matcher {
                        Matcher::Call { to: t, data_prefix }
                            if *t == to && data.starts_with(data_prefix) =>
                        {
                            Some((data_prefix.len(), rule))
                        }
                        _ => None,
                    })
                    // max_by_key keeps the last of equal keys, so later
                    // registrations override earlier ones.
                    .max_by_key(|(len, _)| *len)
                    .map(|(_, rule)| rule.reply.clone())
            }),
            "eth_getLogs" => logs_target(&params).and_then(|(address, topic0)| {
                rules
                    .iter()
                    .rev()
                    .find(|rule| {
                        matches!(&rule.matcher, Matcher::Logs { address: a, topic0: t }
                            if *a == address && *t == topic0)
                    })
                    .map(|rule| rule.reply.clone())
            }),
            _ => None,
        };

        if let Some(reply) = specific {
            return reply;
        }

        rules
            .iter()
            .rev()
            .find(|rule| matches!(&rule.matcher, Matcher::Method(m) if m == method))
            .map(|rule| rule.reply.clone())
            .unwrap_or_else(|| Err(self.no_rule(method)))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = last;
        Address(bytes)
    }

    fn call_params(to: Address, data: &[u8]) -> Value {
        json!([{ "to": to.to_lower_hex(), "data": format!("0x{}", hex::encode(data)) }, "latest"])
    }

    #[tokio::test]
    async fn test_longest_prefix_wins() {
        let mock = MockProvider::new("mock");
        mock.on_call(addr(1), [0xaa, 0xbb, 0xcc, 0xdd], [0x01]);
        mock.on_call(addr(1), [0xaa, 0xbb, 0xcc, 0xdd, 0x07], [0x02]);

        let generic = mock
            .request("eth_call", call_params(addr(1), &[0xaa, 0xbb, 0xcc, 0xdd, 0x08]))
            .await
            .unwrap();
        let specific = mock
            .request("eth_call", call_params(addr(1), &[0xaa, 0xbb, 0xcc, 0xdd, 0x07]))
            .await
            .unwrap();
        assert_eq!(generic, json!("0x01"));
        assert_eq!(specific, json!("0x02"));
    }

    #[tokio::test]
    async fn test_address_must_match() {
        let mock = MockProvider::new("mock");
        mock.on_call(addr(1), [0xaa], [0x01]);
        assert!(mock
            .request("eth_call", call_params(addr(2), &[0xaa]))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_records_requests_and_counts_calls() {
        let mock = MockProvider::new("mock");
        mock.on_call(addr(1), [0x01, 0x02, 0x03, 0x04], []);
        mock.on_method("net_version", Ok(json!("1")));

        mock.request("eth_call", call_params(addr(1), &[1, 2, 3, 4, 5]))
            .await
            .unwrap();
        mock.request("eth_call", call_params(addr(1), &[1, 2, 3, 4]))
            .await
            .unwrap();
        mock.request("net_version", json!([])).await.unwrap();

        assert_eq!(mock.call_count(addr(1), [1, 2, 3, 4]), 2);
        assert_eq!(mock.request_count("net_version"), 1);
        assert_eq!(mock.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_logs_match_on_topic0() {
        let mock = MockProvider::new("mock");
        let topic = [9u8; 32];
        mock.on_logs(addr(5), topic, vec![MockProvider::log_entry(10, 0, &[topic], &[])]);
        let params = json!([{
            "address": addr(5).to_lower_hex(),
            "fromBlock": "earliest",
            "toBlock": "latest",
            "topics": [format!("0x{}", hex::encode(topic))],
        }]);
        let logs = mock.request("eth_getLogs", params).await.unwrap();
        assert_eq!(logs.as_array().unwrap().len(), 1);
    }
}
