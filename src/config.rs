//! Process configuration.
//!
//! Everything is read once at startup and then shared read-only:
//!
//! - [`ServerRegistry`]: logical server key -> JSON-RPC endpoint
//! - [`ToolTable`]: tool name -> logical server key
//! - [`AgentSettings`]: loop bounds and sampling parameters
//! - [`ModelSettings`]: where the completion backend lives
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file,
//! `TOOLLOOP_*` environment variables. The CLI applies its flags on top.
//!
//! ```toml
//! [agent]
//! max_steps = 8
//! malformed_action = "retry"
//!
//! [servers]
//! memory = "http://10.0.0.5:8082"
//!
//! [router]
//! default = "task_orchestrator"
//!
//! [[router.rules]]
//! server = "memory"
//! tools = ["read_graph", "search_nodes"]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::router::{MEMORY, PLAYWRIGHT, SEQUENTIAL_THINKING, TASK_ORCHESTRATOR, ToolTable};
use crate::rpc::transport::DEFAULT_TIMEOUT;

const ENV_PREFIX: &str = "TOOLLOOP_";
const ENV_SERVER_PREFIX: &str = "TOOLLOOP_SERVER_";

/// Immutable map of logical server keys to endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerRegistry {
    endpoints: BTreeMap<String, Url>,
}

impl ServerRegistry {
    /// Build a registry from `(key, url)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] if a URL does not parse or is
    /// not `http`/`https`.
    pub fn from_urls<I, K, U>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, U)>,
        K: Into<String>,
        U: AsRef<str>,
    {
        let mut endpoints = BTreeMap::new();
        for (key, raw) in entries {
            let key = key.into();
            let url = parse_endpoint(&key, raw.as_ref())?;
            endpoints.insert(key, url);
        }
        Ok(Self { endpoints })
    }

    #[must_use]
    pub fn endpoint(&self, server: &str) -> Option<&Url> {
        self.endpoints.get(server)
    }

    #[must_use]
    pub fn contains(&self, server: &str) -> bool {
        self.endpoints.contains_key(server)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        let endpoints = default_servers()
            .into_iter()
            .filter_map(|(key, raw)| Url::parse(&raw).ok().map(|url| (key, url)))
            .collect();
        Self { endpoints }
    }
}

/// Keep the environment entries that are valid UTF-8; others cannot carry
/// a `TOOLLOOP_*` setting and are skipped.
fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (Ok(name), Err(_)) => {
                if name.starts_with(ENV_PREFIX) {
                    log::warn!("ignoring {name}: value is not valid UTF-8");
                }
                None
            }
            (Err(name), _) => {
                log::debug!("ignoring environment variable {name:?}: name is not valid UTF-8");
                None
            }
        })
}

fn default_servers() -> BTreeMap<String, String> {
    [
        (PLAYWRIGHT, "http://localhost:8931"),
        (SEQUENTIAL_THINKING, "http://localhost:8081"),
        (MEMORY, "http://localhost:8082"),
        (TASK_ORCHESTRATOR, "http://localhost:8083"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn parse_endpoint(server: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidEndpoint {
        server: server.to_string(),
        reason: format!("{raw:?}: {e}"),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::InvalidEndpoint {
            server: server.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

/// What the loop does with a completion that starts with the action marker
/// but cannot be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedActionPolicy {
    /// Return the raw completion as the final answer.
    #[default]
    Respond,
    /// Record the decode error in the context and reason again.
    Retry,
}

impl std::str::FromStr for MalformedActionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "respond" => Ok(Self::Respond),
            "retry" => Ok(Self::Retry),
            other => Err(format!("expected \"respond\" or \"retry\", got {other:?}")),
        }
    }
}

/// Loop bounds and sampling parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum reasoning steps per query.
    pub max_steps: usize,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-call RPC timeout in seconds.
    pub rpc_timeout_secs: u64,
    pub malformed_action: MalformedActionPolicy,
    /// Replaces the built-in system instruction when set.
    pub system_prompt: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 10,
            max_tokens: 512,
            temperature: 0.7,
            rpc_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            malformed_action: MalformedActionPolicy::Respond,
            system_prompt: None,
        }
    }
}

impl AgentSettings {
    #[must_use]
    pub const fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

/// Completion backend location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible API, e.g. `http://localhost:8080/v1`.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key, if any.
    pub api_key_env: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/v1".to_string(),
            model: "SmolLM2-360M-Instruct".to_string(),
            api_key_env: None,
            timeout_secs: 300,
        }
    }
}

impl ModelSettings {
    /// Resolve the API key from the configured environment variable.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Whole-process configuration, as written in the TOML file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub agent: AgentSettings,
    pub model: ModelSettings,
    /// Logical server key -> base URL.
    pub servers: BTreeMap<String, String>,
    pub router: ToolTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agent: AgentSettings::default(),
            model: ModelSettings::default(),
            servers: default_servers(),
            router: ToolTable::default(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text. Missing sections keep defaults.
    ///
    /// Servers listed in the file are merged over the default servers.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid TOML for
    /// this schema.
    pub fn from_toml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            agent: AgentSettings,
            #[serde(default)]
            model: ModelSettings,
            #[serde(default)]
            servers: BTreeMap<String, String>,
            router: Option<ToolTable>,
        }

        let raw: Raw = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })?;

        let mut servers = default_servers();
        servers.extend(raw.servers);

        Ok(Self {
            agent: raw.agent,
            model: raw.model,
            servers,
            router: raw.router.unwrap_or_default(),
        })
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: origin.clone(),
            source,
        })?;
        Self::from_toml(&text, &origin)
    }

    /// Load from `path` if given, then apply the process environment.
    ///
    /// # Errors
    ///
    /// Propagates file and parse errors, and invalid environment values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(utf8_vars(std::env::vars_os()))?;
        Ok(config)
    }

    /// Apply `TOOLLOOP_*` overrides from `vars`.
    ///
    /// - `TOOLLOOP_SERVER_<KEY>`: endpoint for server `<key>` (lower-cased)
    /// - `TOOLLOOP_MODEL_URL`, `TOOLLOOP_MODEL`, `TOOLLOOP_API_KEY_ENV`
    /// - `TOOLLOOP_MAX_STEPS`, `TOOLLOOP_RPC_TIMEOUT_SECS`
    /// - `TOOLLOOP_MALFORMED_ACTION`: `respond` or `retry`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparsable numbers or
    /// policies.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            if let Some(server) = name.strip_prefix(ENV_SERVER_PREFIX) {
                if !server.is_empty() {
                    self.servers.insert(server.to_lowercase(), value);
                }
                continue;
            }
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "MODEL_URL" => self.model.base_url = value,
                "MODEL" => self.model.model = value,
                "API_KEY_ENV" => self.model.api_key_env = Some(value),
                "MAX_STEPS" => self.agent.max_steps = parse_env(&name, &value)?,
                "RPC_TIMEOUT_SECS" => self.agent.rpc_timeout_secs = parse_env(&name, &value)?,
                "MALFORMED_ACTION" => self.agent.malformed_action = parse_env(&name, &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// Build the server registry from `servers`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] for a bad URL.
    pub fn registry(&self) -> Result<ServerRegistry, ConfigError> {
        ServerRegistry::from_urls(self.servers.iter().map(|(k, v)| (k.clone(), v.as_str())))
    }

    /// Check cross-section consistency.
    ///
    /// Routing to a key with no endpoint is allowed (such calls fail with a
    /// configuration error at call time) but is logged.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an empty default route or a
    /// zero step bound, and [`ConfigError::InvalidEndpoint`] for bad URLs.
    pub fn validate(&self) -> Result<ServerRegistry, ConfigError> {
        if self.router.default.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "router.default".to_string(),
                reason: "must name a server".to_string(),
            });
        }
        if self.agent.max_steps == 0 {
            return Err(ConfigError::InvalidValue {
                key: "agent.max_steps".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let registry = self.registry()?;
        log::debug!(
            "registered servers: {}",
            registry.keys().collect::<Vec<_>>().join(", ")
        );
        for rule in &self.router.rules {
            if !registry.contains(&rule.server) {
                log::warn!(
                    "router sends {:?} to server {:?}, which has no endpoint",
                    rule.tools,
                    rule.server
                );
            }
        }
        if !registry.contains(&self.router.default) {
            log::warn!(
                "default route {:?} has no endpoint; unknown tools will fail",
                self.router.default
            );
        }
        Ok(registry)
    }
}

fn parse_env<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: name.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_registry_has_four_servers() {
        let registry = ServerRegistry::default();
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.keys().collect::<Vec<_>>(),
            vec![MEMORY, PLAYWRIGHT, SEQUENTIAL_THINKING, TASK_ORCHESTRATOR]
        );
        assert_eq!(
            registry.endpoint(PLAYWRIGHT).map(Url::as_str),
            Some("http://localhost:8931/")
        );
        assert!(registry.endpoint("unknown").is_none());
    }

    #[test]
    fn test_registry_rejects_bad_urls() {
        assert!(matches!(
            ServerRegistry::from_urls([("memory", "not a url")]),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            ServerRegistry::from_urls([("memory", "ftp://host/")]),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_from_toml_merges_servers_and_keeps_defaults() -> anyhow::Result<()> {
        let config = Config::from_toml(
            r#"
            [agent]
            max_steps = 3
            malformed_action = "retry"

            [servers]
            memory = "http://10.0.0.5:9000"
            search = "http://10.0.0.6:9000"
            "#,
            "inline",
        )?;

        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.agent.max_tokens, 512);
        assert_eq!(config.agent.malformed_action, MalformedActionPolicy::Retry);
        assert_eq!(config.servers["memory"], "http://10.0.0.5:9000");
        assert_eq!(config.servers["search"], "http://10.0.0.6:9000");
        assert_eq!(config.servers[PLAYWRIGHT], "http://localhost:8931");
        assert_eq!(config.router, ToolTable::default());
        Ok(())
    }

    #[test]
    fn test_from_toml_custom_router() -> anyhow::Result<()> {
        let config = Config::from_toml(
            r#"
            [router]
            default = "memory"

            [[router.rules]]
            server = "playwright"
            prefixes = ["browser_"]
            "#,
            "inline",
        )?;

        assert_eq!(config.router.default, "memory");
        assert_eq!(config.router.rules.len(), 1);
        assert_eq!(config.router.rules[0].prefixes, vec!["browser_"]);
        assert!(config.router.rules[0].tools.is_empty());
        Ok(())
    }

    #[test]
    fn test_from_toml_reports_parse_errors() {
        let err = Config::from_toml("[agent]\nmax_steps = \"many\"", "bad.toml")
            .expect_err("type mismatch");
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn test_from_file() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "[model]\nmodel = \"qwen2.5\"")?;

        let config = Config::from_file(file.path())?;
        assert_eq!(config.model.model, "qwen2.5");
        assert_eq!(config.model.base_url, ModelSettings::default().base_url);
        Ok(())
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::from_file(Path::new("/definitely/not/here.toml")).expect_err("missing");
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_env_overrides() -> anyhow::Result<()> {
        let mut config = Config::default();
        config.apply_env(vars(&[
            ("TOOLLOOP_SERVER_MEMORY", "http://mem:1"),
            ("TOOLLOOP_SERVER_NOTES", "http://notes:2"),
            ("TOOLLOOP_MAX_STEPS", "4"),
            ("TOOLLOOP_MODEL", "llama"),
            ("TOOLLOOP_MALFORMED_ACTION", "retry"),
            ("PATH", "/usr/bin"),
        ]))?;

        assert_eq!(config.servers["memory"], "http://mem:1");
        assert_eq!(config.servers["notes"], "http://notes:2");
        assert_eq!(config.agent.max_steps, 4);
        assert_eq!(config.model.model, "llama");
        assert_eq!(config.agent.malformed_action, MalformedActionPolicy::Retry);
        Ok(())
    }

    #[test]
    fn test_env_rejects_bad_numbers() {
        let mut config = Config::default();
        let err = config
            .apply_env(vars(&[("TOOLLOOP_MAX_STEPS", "lots")]))
            .expect_err("not a number");
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TOOLLOOP_MAX_STEPS"));
    }

    #[cfg(unix)]
    #[test]
    fn test_env_skips_non_utf8_entries() -> anyhow::Result<()> {
        use std::os::unix::ffi::OsStringExt;

        let invalid = || OsString::from_vec(vec![0xff, 0xfe]);
        let entries = vec![
            (OsString::from("UNRELATED_VAR"), invalid()),
            (invalid(), OsString::from("x")),
            (OsString::from("TOOLLOOP_MODEL"), invalid()),
            (OsString::from("TOOLLOOP_MAX_STEPS"), OsString::from("3")),
        ];

        let mut config = Config::default();
        config.apply_env(utf8_vars(entries))?;

        assert_eq!(config.agent.max_steps, 3);
        assert_eq!(config.model.model, ModelSettings::default().model);
        Ok(())
    }

    #[test]
    fn test_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.agent.max_steps = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.router.default = "  ".to_string();
        assert!(config.validate().is_err());

        // Unregistered route targets are allowed.
        let mut config = Config::default();
        config.router.default = "nowhere".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_example_config_matches_defaults() -> anyhow::Result<()> {
        let config = Config::from_toml(
            include_str!("../toolloop.example.toml"),
            "toolloop.example.toml",
        )?;
        let registry = config.validate()?;

        assert_eq!(registry, ServerRegistry::default());
        assert_eq!(config.agent, AgentSettings::default());
        assert_eq!(config.model, ModelSettings::default());
        Ok(())
    }
}
