//! Bundled fixture set
//!
//! One JSON document per operation, mapping scenario names (or `default`)
//! to canned responses.

use contract_harness::{FixtureError, FixtureProvider, Operation};
use serde_json::Value;
use std::collections::HashMap;

/// Key used when a lookup names no scenario
pub const DEFAULT_SCENARIO: &str = "default";

fn source(operation: Operation) -> &'static str {
    match operation {
        Operation::CreateTags => include_str!("../fixtures/create_tags.json"),
        Operation::DescribeInstances => include_str!("../fixtures/describe_instances.json"),
        Operation::GetPasswordData => include_str!("../fixtures/get_password_data.json"),
        Operation::RunInstances => include_str!("../fixtures/run_instances.json"),
        Operation::StartInstances => include_str!("../fixtures/start_instances.json"),
        Operation::StopInstances => include_str!("../fixtures/stop_instances.json"),
        Operation::TerminateInstances => include_str!("../fixtures/terminate_instances.json"),
    }
}

/// Canned responses for every instance API operation
#[derive(Debug, Clone)]
pub struct Ec2Fixtures {
    documents: HashMap<Operation, Value>,
}

impl Ec2Fixtures {
    /// Parse the bundled documents
    ///
    /// # Panics
    /// If a bundled document is not valid JSON
    #[must_use]
    pub fn load() -> Self {
        let documents = Operation::ALL
            .into_iter()
            .map(|op| {
                let doc = serde_json::from_str(source(op))
                    .unwrap_or_else(|err| panic!("bundled fixture for {op} is invalid: {err}"));
                (op, doc)
            })
            .collect();
        Self { documents }
    }

    /// Replace the document for `operation`/`scenario`
    #[must_use]
    pub fn with_fixture(mut self, operation: Operation, scenario: Option<&str>, fixture: Value) -> Self {
        let key = scenario.unwrap_or(DEFAULT_SCENARIO).to_string();
        let entry = self
            .documents
            .entry(operation)
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        if let Some(map) = entry.as_object_mut() {
            map.insert(key, fixture);
        }
        self
    }
}

impl Default for Ec2Fixtures {
    fn default() -> Self {
        Self::load()
    }
}

impl FixtureProvider for Ec2Fixtures {
    fn fixture(&self, operation: Operation, scenario: Option<&str>) -> Result<Value, FixtureError> {
        tracing::debug!(%operation, scenario = scenario.unwrap_or(DEFAULT_SCENARIO), "fixture lookup");
        self.documents
            .get(&operation)
            .and_then(|doc| doc.get(scenario.unwrap_or(DEFAULT_SCENARIO)))
            .cloned()
            .ok_or_else(|| FixtureError::Missing {
                operation,
                scenario: scenario.map(str::to_string),
            })
    }
}
