//! Strategy routing: classify a request and pick exactly one strategy.
//!
//! Rules are evaluated in a fixed priority order against the request URL;
//! evaluation has no side effects and the same URL always maps to the same
//! strategy for a given rule set. There is always a default, so no
//! intercepted request goes unhandled.

use offcache_client::InterceptScope;
use offcache_core::{AppConfig, Error};
use regex::Regex;

use crate::request::WorkerRequest;

/// Algorithm governing whether a request is served from cache, network,
/// or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    NetworkOnly,
}

/// Coarse request classification, used to pick the right offline fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Data/API endpoint; failures produce a structured JSON body.
    Data,
    /// Script/style/font asset.
    Asset,
    /// Static asset or media file.
    Static,
    /// Anything else on the default route.
    Other,
}

/// Routing outcome for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// The worker handles the request with the given strategy.
    Handle { strategy: Strategy, class: RequestClass },
    /// Pass straight to the network, no interception.
    Bypass,
}

/// Ordered predicate rules mapping URLs to strategies.
pub struct Router {
    scope: InterceptScope,
    custom: Vec<(Regex, Strategy)>,
    api_path: Regex,
    asset_path: Regex,
    static_path: Regex,
    media_path: Regex,
}

impl Router {
    /// Build the default rule set for an interception scope.
    pub fn new(scope: InterceptScope, api_path_prefix: &str, static_path_prefix: &str) -> Result<Self, Error> {
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| Error::InvalidInput(format!("route pattern '{pattern}': {e}")))
        };

        Ok(Self {
            scope,
            custom: Vec::new(),
            api_path: compile(format!("^{}", regex::escape(api_path_prefix)))?,
            asset_path: compile(r"\.(?:mjs|js|css|woff2?|ttf|otf|eot)$".to_string())?,
            static_path: compile(format!("^{}", regex::escape(static_path_prefix)))?,
            media_path: compile(r"\.(?:png|jpe?g|gif|svg|webp|ico|avif|mp4|webm)$".to_string())?,
        })
    }

    /// Build a router from loaded configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let scope = InterceptScope::from_config(config)?;
        Self::new(scope, &config.api_path_prefix, &config.static_path_prefix)
    }

    /// Add a custom path rule, evaluated before the built-in rules in
    /// registration order.
    pub fn push_rule(&mut self, pattern: &str, strategy: Strategy) -> Result<(), Error> {
        let re = Regex::new(pattern).map_err(|e| Error::InvalidInput(format!("route pattern '{pattern}': {e}")))?;
        self.custom.push((re, strategy));
        Ok(())
    }

    /// Classify a request. Deterministic and side-effect free.
    pub fn route(&self, req: &WorkerRequest) -> RouteDecision {
        if !self.scope.intercepts(&req.method, &req.url) {
            return RouteDecision::Bypass;
        }

        // Allow-listed cross-origin data hosts are always network-first.
        if !self.scope.is_same_origin(&req.url) {
            return RouteDecision::Handle { strategy: Strategy::NetworkFirst, class: RequestClass::Data };
        }

        let path = req.url.path();

        for (re, strategy) in &self.custom {
            if re.is_match(path) {
                return RouteDecision::Handle { strategy: *strategy, class: RequestClass::Other };
            }
        }

        if self.api_path.is_match(path) {
            return RouteDecision::Handle { strategy: Strategy::NetworkFirst, class: RequestClass::Data };
        }

        if self.asset_path.is_match(path) {
            return RouteDecision::Handle { strategy: Strategy::StaleWhileRevalidate, class: RequestClass::Asset };
        }

        if self.static_path.is_match(path) || self.media_path.is_match(path) {
            return RouteDecision::Handle { strategy: Strategy::CacheFirst, class: RequestClass::Static };
        }

        // Safe default for everything else we intercept.
        RouteDecision::Handle { strategy: Strategy::NetworkFirst, class: RequestClass::Other }
    }
}
