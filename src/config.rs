//! Session configuration.
//!
//! Defaults suit interactive diagnosis. A JSON document can override any
//! field, and `HEAPREACH_*` environment variables override the document.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment override for [`SessionConfig::traversal`].
pub const ENV_TRAVERSAL: &str = "HEAPREACH_TRAVERSAL";
/// Environment override for [`SessionConfig::drain_jobs`].
pub const ENV_DRAIN_JOBS: &str = "HEAPREACH_DRAIN_JOBS";

/// Worklist discipline used by the graph builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalOrder {
    #[default]
    BreadthFirst,
    DepthFirst,
}

impl FromStr for TraversalOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bfs" | "breadth_first" => Ok(TraversalOrder::BreadthFirst),
            "dfs" | "depth_first" => Ok(TraversalOrder::DepthFirst),
            other => Err(Error::Config(format!("unknown traversal order '{other}'"))),
        }
    }
}

/// Knobs for one search session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub traversal: TraversalOrder,
    /// Emit an edge from an object to each symbol it uses as a property key.
    pub trace_symbol_keys: bool,
    /// Let the heap finish pending jobs before each build.
    pub drain_jobs: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            traversal: TraversalOrder::BreadthFirst,
            trace_symbol_keys: true,
            drain_jobs: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `HEAPREACH_*` variables from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source. Invalid values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_TRAVERSAL) {
            match raw.parse::<TraversalOrder>() {
                Ok(order) => self.traversal = order,
                Err(err) => tracing::warn!("invalid {ENV_TRAVERSAL}, ignoring: {err}"),
            }
        }
        if let Some(raw) = lookup(ENV_DRAIN_JOBS) {
            match raw.trim().parse::<bool>() {
                Ok(drain) => self.drain_jobs = drain,
                Err(err) => tracing::warn!("invalid {ENV_DRAIN_JOBS}, ignoring: {err}"),
            }
        }
        self
    }
}
