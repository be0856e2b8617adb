//! Route-set generation: the six standard operations a registered schema
//! exposes, plus schema-scoped custom routes added after registration.

use crate::api::auth::{self, AuthRequirement, Operation};
use crate::schema::SchemaDefinition;
use crate::state::AppState;
use axum::http::Method;
use axum::routing::MethodRouter;
use serde_json::Value;
use std::collections::HashMap;

/// One generated endpoint: enough to mount it and to introspect it.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub operation: Operation,
    pub method: Method,
    pub path: String,
    pub auth: AuthRequirement,
}

/// A caller-supplied route mounted under the schema's base path. The handler
/// is opaque; its authorization is whatever the handler itself enforces, not
/// derived from the schema's auth config.
pub struct CustomRoute {
    pub method: Method,
    pub path: String,
    pub handler: MethodRouter<AppState>,
    pub metadata: Value,
}

pub struct RouteSet {
    pub base_path: String,
    pub routes: Vec<RouteSpec>,
    custom: HashMap<(Method, String), CustomRoute>,
}

impl RouteSet {
    /// Resolve the standard six routes for a schema. Paths are relative to
    /// the mounting router; `:id` is the axum capture for record ids.
    pub fn generate(schema: &SchemaDefinition) -> Self {
        let base_path = format!("/{}", schema.api_plural());
        let routes = Operation::ALL
            .iter()
            .map(|&op| {
                let (method, suffix) = match op {
                    Operation::Create => (Method::POST, ""),
                    Operation::List => (Method::GET, ""),
                    Operation::Count => (Method::GET, "/count"),
                    Operation::Get => (Method::GET, "/:id"),
                    Operation::Update => (Method::PUT, "/:id"),
                    Operation::Delete => (Method::DELETE, "/:id"),
                };
                RouteSpec {
                    operation: op,
                    method,
                    path: format!("{}{}", base_path, suffix),
                    auth: auth::resolve(&schema.auth, op),
                }
            })
            .collect();

        RouteSet {
            base_path,
            routes,
            custom: HashMap::new(),
        }
    }

    pub fn auth_for(&self, op: Operation) -> AuthRequirement {
        self.routes
            .iter()
            .find(|r| r.operation == op)
            .map(|r| r.auth)
            .unwrap_or(AuthRequirement::Required)
    }

    /// Add or replace a custom route. `path` is relative to the schema base
    /// path ("/summary" mounts at "/{plural}/summary").
    pub fn add_custom(&mut self, route: CustomRoute) {
        self.custom
            .insert((route.method.clone(), route.path.clone()), route);
    }

    pub fn custom_routes(&self) -> impl Iterator<Item = &CustomRoute> {
        self.custom.values()
    }

    pub fn custom_route_count(&self) -> usize {
        self.custom.len()
    }

    /// Endpoint paths for introspection, standard then custom.
    pub fn endpoint_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect();
        let mut custom: Vec<String> = self
            .custom
            .values()
            .map(|c| format!("{} {}{}", c.method, self.base_path, c.path))
            .collect();
        custom.sort();
        paths.extend(custom);
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, FieldType};

    fn schema() -> SchemaDefinition {
        SchemaDefinition::build(
            "Task",
            vec![FieldDefinition::new("title", FieldType::String).required()],
        )
        .unwrap()
    }

    #[test]
    fn generates_six_standard_routes() {
        let set = RouteSet::generate(&schema());
        assert_eq!(set.base_path, "/tasks");
        assert_eq!(set.routes.len(), 6);
        let get = set
            .routes
            .iter()
            .find(|r| r.operation == Operation::Get)
            .unwrap();
        assert_eq!(get.method, Method::GET);
        assert_eq!(get.path, "/tasks/:id");
        // Count must not be shadowed by the id capture.
        let count = set
            .routes
            .iter()
            .find(|r| r.operation == Operation::Count)
            .unwrap();
        assert_eq!(count.path, "/tasks/count");
    }

    #[test]
    fn custom_route_replaces_same_method_and_path() {
        let mut set = RouteSet::generate(&schema());
        for _ in 0..2 {
            set.add_custom(CustomRoute {
                method: Method::GET,
                path: "/summary".into(),
                handler: MethodRouter::new(),
                metadata: Value::Null,
            });
        }
        assert_eq!(set.custom_route_count(), 1);
        assert!(set
            .endpoint_paths()
            .contains(&"GET /tasks/summary".to_string()));
    }
}
