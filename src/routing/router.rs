//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Define the services fronted by the gateway and their URL prefixes
//! - Resolve an inbound path to a service and the path after its prefix
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest prefix checked first, so resolution is deterministic
//! - Explicit no-match rather than silent default

use crate::routing::matcher::PathPrefixMatcher;

/// A backend service and the URL prefix it is reached under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRoute {
    /// Registry key, e.g. "user".
    pub name: &'static str,
    /// Inbound and upstream path prefix, e.g. "/users".
    pub prefix: &'static str,
    /// Name used in fallback responses.
    pub display_name: &'static str,
    /// Health endpoint probed when the config does not override it.
    pub default_health_path: &'static str,
}

pub const USER: ServiceRoute = ServiceRoute {
    name: "user",
    prefix: "/users",
    display_name: "UserService",
    default_health_path: "/users",
};

pub const NOTIFICATION: ServiceRoute = ServiceRoute {
    name: "notification",
    prefix: "/notifications",
    display_name: "NotificationService",
    default_health_path: "/actuator/health",
};

/// Every service the gateway fronts.
pub const SERVICE_ROUTES: [ServiceRoute; 2] = [USER, NOTIFICATION];

/// A resolved route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: ServiceRoute,
    /// Path after the service prefix, possibly empty.
    pub path: &'a str,
}

/// Prefix router over the service table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<(PathPrefixMatcher, ServiceRoute)>,
}

impl Router {
    pub fn new(routes: &[ServiceRoute]) -> Self {
        let mut routes: Vec<_> = routes
            .iter()
            .map(|r| (PathPrefixMatcher::new(r.prefix), *r))
            .collect();
        routes.sort_by(|a, b| b.0.prefix().len().cmp(&a.0.prefix().len()));
        Self { routes }
    }

    /// Resolve a request path to its service.
    pub fn resolve<'a>(&self, path: &'a str) -> Option<RouteMatch<'a>> {
        self.routes.iter().find_map(|(matcher, route)| {
            matcher.strip(path).map(|rest| RouteMatch { route: *route, path: rest })
        })
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(&SERVICE_ROUTES)
    }
}
