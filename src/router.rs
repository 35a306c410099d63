//! Tool classification: which logical server owns which tool.
//!
//! Routing is a total function. Exact tool names are checked first, then
//! name prefixes in declaration order, then the table's default server.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const PLAYWRIGHT: &str = "playwright";
pub const SEQUENTIAL_THINKING: &str = "sequential_thinking";
pub const MEMORY: &str = "memory";
pub const TASK_ORCHESTRATOR: &str = "task_orchestrator";

/// One routing rule as written in configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRule {
    /// Logical server key the matched tools go to.
    pub server: String,
    /// Exact tool names.
    #[serde(default)]
    pub tools: Vec<String>,
    /// Tool name prefixes, e.g. `"task_"`.
    #[serde(default)]
    pub prefixes: Vec<String>,
}

/// Static tool name -> server key table with an explicit fallback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTable {
    /// Server key for tools no rule matches.
    pub default: String,
    #[serde(default)]
    pub rules: Vec<RouteRule>,
}

impl Default for ToolTable {
    fn default() -> Self {
        let rule = |server: &str, tools: &[&str]| RouteRule {
            server: server.to_string(),
            tools: tools.iter().map(ToString::to_string).collect(),
            prefixes: Vec::new(),
        };

        Self {
            default: TASK_ORCHESTRATOR.to_string(),
            rules: vec![
                rule(
                    PLAYWRIGHT,
                    &["goto", "click", "fill", "query_selector", "screenshot"],
                ),
                rule(SEQUENTIAL_THINKING, &["sequentialthinking"]),
                rule(
                    MEMORY,
                    &[
                        "add_observations",
                        "create_entities",
                        "create_relations",
                        "delete_entities",
                        "delete_observations",
                        "delete_relations",
                        "open_nodes",
                        "read_graph",
                        "search_nodes",
                    ],
                ),
            ],
        }
    }
}

/// Resolves tool names to server keys.
///
/// Built once from a [`ToolTable`]. If the same exact name appears in two
/// rules the first one wins, so every name maps to exactly one key.
#[derive(Clone, Debug)]
pub struct ToolRouter {
    exact: HashMap<String, String>,
    prefixes: Vec<(String, String)>,
    default: String,
    table: ToolTable,
}

impl ToolRouter {
    #[must_use]
    pub fn new(table: ToolTable) -> Self {
        let mut exact = HashMap::new();
        let mut prefixes = Vec::new();

        for rule in &table.rules {
            for tool in &rule.tools {
                if exact.contains_key(tool) {
                    log::warn!(
                        "tool {tool} listed for more than one server, keeping first rule"
                    );
                    continue;
                }
                exact.insert(tool.clone(), rule.server.clone());
            }
            for prefix in rule.prefixes.iter().filter(|p| !p.is_empty()) {
                prefixes.push((prefix.clone(), rule.server.clone()));
            }
        }

        Self {
            exact,
            prefixes,
            default: table.default.clone(),
            table,
        }
    }

    /// Server key responsible for `tool`. Unknown tools get the default key.
    #[must_use]
    pub fn route(&self, tool: &str) -> &str {
        if let Some(server) = self.exact.get(tool) {
            return server;
        }
        self.prefixes
            .iter()
            .find(|(prefix, _)| tool.starts_with(prefix.as_str()))
            .map_or(self.default.as_str(), |(_, server)| server.as_str())
    }

    #[must_use]
    pub fn default_server(&self) -> &str {
        &self.default
    }

    /// Every server key the table can produce, default included.
    #[must_use]
    pub fn server_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .table
            .rules
            .iter()
            .map(|r| r.server.as_str())
            .chain(std::iter::once(self.default.as_str()))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Exact tool names grouped by server, in declaration order.
    #[must_use]
    pub fn tool_names(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for rule in &self.table.rules {
            let names = grouped.entry(rule.server.as_str()).or_default();
            names.extend(rule.tools.iter().map(String::as_str));
            names.extend(rule.prefixes.iter().map(String::as_str));
        }
        grouped
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new(ToolTable::default())
    }
}
