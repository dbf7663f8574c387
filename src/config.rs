//! Route topology loading from TOML.
//!
//! Describes which routes exist, how they chain, and the error-handling
//! setup of each. Bodies are left empty: configured routes only expose
//! their observation points, which is what fault plans act on.
//!
//! # TOML Example
//!
//! ```toml
//! [[route]]
//! id = "parent"
//! error_handler = "supervised"
//! exception_clause = { handled = false }
//! next = { route = "child" }
//!
//! [[route]]
//! id = "child"
//! catch = false
//! next = { sink = "mock:next" }
//! ```

use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::error_handler_policy::ErrorHandlerPolicy;
use crate::core::exception_clause::ExceptionClause;
use crate::core::route::{Next, Route};
use crate::core::router::Router;
use crate::core::router_error::RouterError;
use crate::supervision::sink::UnhandledSink;

/// Error type for configuration loading operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),

    /// The routes could not be registered.
    #[error(transparent)]
    Router(#[from] RouterError),
}

/// Exception clause settings of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClauseConfig {
    /// Clear the fault after the clause runs.
    #[serde(default)]
    pub handled: bool,
}

/// Successor of a configured route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextConfig {
    Route(String),
    Sink(String),
}

impl From<NextConfig> for Next {
    fn from(next: NextConfig) -> Self {
        match next {
            NextConfig::Route(id) => Next::Route(id),
            NextConfig::Sink(uri) => Next::Sink(uri),
        }
    }
}

fn default_catch() -> bool {
    true
}

/// One `[[route]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    /// Unique route identifier.
    pub id: String,

    /// Supervisory policy; `none` when omitted.
    #[serde(default)]
    pub error_handler: ErrorHandlerPolicy,

    /// Whether the route has a catch segment.
    #[serde(default = "default_catch")]
    pub catch: bool,

    /// Exception clause; the route has none when omitted.
    #[serde(default)]
    pub exception_clause: Option<ClauseConfig>,

    /// Successor of the route.
    pub next: NextConfig,
}

impl RouteConfig {
    /// Build the (body-less) route this table describes.
    pub fn to_route(&self) -> Route {
        let mut route = Route::new(self.id.clone(), self.next.clone().into())
            .with_error_handler(self.error_handler);
        if self.catch {
            route = route.with_catch();
        }
        if let Some(clause) = self.exception_clause {
            route = route.with_exception_clause(ExceptionClause::new(clause.handled));
        }
        route
    }
}

/// A whole route topology.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutesConfig {
    #[serde(default, rename = "route")]
    pub routes: Vec<RouteConfig>,
}

impl RoutesConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::Validation` if [`validate()`](Self::validate) fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if:
    /// - there are no routes
    /// - a route id is empty or repeated
    /// - a route chains to an id that is not configured
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routes.is_empty() {
            return Err(ConfigError::Validation("no routes configured".into()));
        }

        let mut ids = HashSet::new();
        for route in &self.routes {
            if route.id.is_empty() {
                return Err(ConfigError::Validation("route id must not be empty".into()));
            }
            if !ids.insert(route.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "route '{}' is configured twice",
                    route.id
                )));
            }
        }

        for route in &self.routes {
            if let NextConfig::Route(target) = &route.next
                && !ids.contains(target.as_str())
            {
                return Err(ConfigError::Validation(format!(
                    "route '{}' chains to unknown route '{}'",
                    route.id, target
                )));
            }
        }

        Ok(())
    }

    /// Register every route with a new router reporting to `sink`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Router` if the chain contains a cycle.
    pub fn into_router<S: UnhandledSink + 'static>(self, sink: S) -> Result<Router, ConfigError> {
        let mut router = Router::with_sink(sink);
        for route in &self.routes {
            router.define_route(route.to_route())?;
        }
        router.validate()?;
        Ok(router)
    }
}
