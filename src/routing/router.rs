//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store the route table in registration order
//! - Look up the route for a (host, path) pair
//! - Fall back to the default route when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan; route tables are a handful of entries per site
//! - Longest matching path prefix wins, registration order breaks ties
//! - Lookup is total: the default route always terminates the chain

use std::path::{Path, PathBuf};

use crate::config::EdgeConfig;
use crate::routing::matcher::{normalize_host, HostPattern, PathPrefix};

/// Terminal handlers a route can point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Liveness / readiness check, always `200 ok`.
    Health,
    /// Echo of the raw request.
    Env,
    /// Prometheus exposition.
    Metrics,
    /// Permanent redirect to a fixed location.
    Redirect { location: String },
    /// Files under `root`.
    Static { root: PathBuf },
    /// Quote backend proxy.
    Quote,
    /// Pops one item from the feed queue.
    FeedDrain,
    /// Default handler.
    Root,
}

/// A single routing rule.
#[derive(Debug, Clone)]
pub struct Route {
    /// Route identifier for logging/metrics.
    pub name: String,
    pub host: HostPattern,
    pub path_prefix: PathPrefix,
    pub handler: Handler,
}

impl Route {
    pub fn new(
        name: impl Into<String>,
        host: HostPattern,
        path_prefix: impl Into<String>,
        handler: Handler,
    ) -> Self {
        Self {
            name: name.into(),
            host,
            path_prefix: PathPrefix::new(path_prefix),
            handler,
        }
    }

    /// Route matching one path exactly.
    pub fn exact(
        name: impl Into<String>,
        host: HostPattern,
        path: impl Into<String>,
        handler: Handler,
    ) -> Self {
        Self {
            name: name.into(),
            host,
            path_prefix: PathPrefix::exact(path),
            handler,
        }
    }
}

/// Host + path router with a mandatory default.
#[derive(Debug, Clone)]
pub struct HostRouter {
    routes: Vec<Route>,
    default: Route,
}

impl HostRouter {
    /// Router that sends everything to `default_handler` until routes are added.
    pub fn new(default_handler: Handler) -> Self {
        Self {
            routes: Vec::new(),
            default: Route::new("root", HostPattern::Any, "", default_handler),
        }
    }

    /// Append a route. Earlier routes win ties.
    pub fn register(&mut self, route: Route) -> &mut Self {
        tracing::debug!(
            route = %route.name,
            host = %route.host,
            path_prefix = route.path_prefix.as_str(),
            exact = route.path_prefix.is_exact(),
            "Route registered"
        );
        self.routes.push(route);
        self
    }

    /// Build the standard route table for the configured sites.
    pub fn from_config(config: &EdgeConfig) -> Self {
        let mut router = Self::new(Handler::Root);

        router
            .register(Route::exact("healthz", HostPattern::Any, "/healthz", Handler::Health))
            .register(Route::exact("servez", HostPattern::Any, "/servez", Handler::Health))
            .register(Route::exact("env", HostPattern::Any, "/env", Handler::Env))
            .register(Route::exact("metrics", HostPattern::Any, "/metrics", Handler::Metrics));

        for site in &config.sites {
            let domain = normalize_host(&site.domain);
            router.register(Route::new(
                format!("{}_redirect", domain),
                HostPattern::exact(&domain),
                "/",
                Handler::Redirect {
                    location: format!("https://www.{}/", domain),
                },
            ));
            if config.feed.enabled && site.feed {
                router.register(Route::new(
                    format!("{}_feed", domain),
                    HostPattern::exact(format!("www.{}", domain)),
                    "/kafka",
                    Handler::FeedDrain,
                ));
            }
            if config.quote.enabled && site.quote {
                router.register(Route::new(
                    format!("{}_quote", domain),
                    HostPattern::wildcard(&domain),
                    "/quote",
                    Handler::Quote,
                ));
            }
            router.register(Route::new(
                domain.clone(),
                HostPattern::wildcard(&domain),
                "/",
                Handler::Static {
                    root: site_root(&config.data_dir, &domain),
                },
            ));
        }

        router
    }

    /// Resolve the route for a request. Never fails.
    pub fn dispatch(&self, host: &str, path: &str) -> &Route {
        let host = normalize_host(host);
        let mut best: Option<&Route> = None;

        for route in &self.routes {
            if !route.host.matches(&host) || !route.path_prefix.matches(path) {
                continue;
            }
            match best {
                Some(current) if current.path_prefix.len() >= route.path_prefix.len() => {}
                _ => best = Some(route),
            }
        }

        best.unwrap_or(&self.default)
    }

    /// Registered routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The fallback route.
    pub fn default_route(&self) -> &Route {
        &self.default
    }
}

fn site_root(data_dir: &Path, domain: &str) -> PathBuf {
    data_dir.join(domain)
}
