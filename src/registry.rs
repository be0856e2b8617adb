//! The registry owns every artifact derived from a registered schema: the
//! storage model, the CRUD service, the contract views, and the route set.
//! It is an explicit object injected through [`AppState`]; there is no
//! process-global state, and two registries in one process stay independent.

use crate::api::auth::{AuthRequirement, Operation};
use crate::api::{CustomRoute, RouteSet, RouteSpec, SchemaContracts};
use crate::error::AppError;
use crate::mapping::{StorageMapper, StorageModel};
use crate::schema::SchemaDefinition;
use crate::service::CrudService;
use crate::state::AppState;
use crate::storage::{Backend, Storage};
use axum::http::Method;
use axum::routing::MethodRouter;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

struct Registered {
    schema: Arc<SchemaDefinition>,
    model: Arc<StorageModel>,
    service: Arc<CrudService>,
    contracts: Arc<SchemaContracts>,
    routes: RouteSet,
}

#[derive(Default)]
struct Inner {
    mapper: StorageMapper,
    schemas: HashMap<String, Registered>,
    /// API path segment -> schema name, for request-time resolution.
    by_plural: HashMap<String, String>,
}

/// Everything a request handler needs about one schema, cloned out of the
/// registry so the lock is released before any await point.
#[derive(Clone)]
pub struct SchemaHandle {
    pub schema: Arc<SchemaDefinition>,
    pub model: Arc<StorageModel>,
    pub service: Arc<CrudService>,
    pub contracts: Arc<SchemaContracts>,
    route_specs: Arc<Vec<RouteSpec>>,
}

impl SchemaHandle {
    pub fn auth_for(&self, op: Operation) -> AuthRequirement {
        self.route_specs
            .iter()
            .find(|r| r.operation == op)
            .map(|r| r.auth)
            .unwrap_or(AuthRequirement::Required)
    }
}

#[derive(Debug, Serialize)]
pub struct SchemaSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub plural: String,
    pub field_count: usize,
}

#[derive(Serialize)]
pub struct SchemaInfo {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub table_name: String,
    pub field_count: usize,
    pub fields: Vec<Value>,
    pub features: crate::schema::SchemaFeatures,
    pub contracts: SchemaContracts,
    pub endpoints: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub total_schemas: usize,
    pub total_fields: usize,
    pub total_endpoints: usize,
    pub schemas: Vec<String>,
}

pub struct Registry {
    storage: Arc<dyn Storage>,
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new(backend: Backend) -> Self {
        Registry::with_storage(backend.into_storage())
    }

    pub fn with_storage(storage: Arc<dyn Storage>) -> Self {
        Registry {
            storage,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Register a schema: validate, map to storage, build the service,
    /// contracts and route set, then install. Fails atomically; on error the
    /// registry is exactly as it was. Returns the storage model so the caller
    /// can apply DDL against the live database.
    pub fn register(&self, schema: SchemaDefinition) -> Result<Arc<StorageModel>, AppError> {
        schema.validate()?;
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        if inner.schemas.contains_key(&schema.name) {
            return Err(AppError::BadRequest(format!(
                "schema '{}' is already registered",
                schema.name
            )));
        }
        let plural = schema.api_plural();
        if let Some(owner) = inner.by_plural.get(&plural) {
            return Err(AppError::BadRequest(format!(
                "path segment '{}' is already used by schema '{}'",
                plural, owner
            )));
        }

        // Relationship targets resolve against every schema the registry
        // knows, including the one being registered (self-references).
        let mut known_tables: HashMap<String, String> = inner
            .schemas
            .values()
            .map(|r| (r.schema.name.clone(), r.model.table_name.clone()))
            .collect();
        known_tables.insert(schema.name.clone(), schema.storage_name());

        let model = inner.mapper.map(&schema, &known_tables)?;
        let schema = Arc::new(schema);
        let service = Arc::new(CrudService::new(
            Arc::clone(&schema),
            Arc::clone(&model),
            Arc::clone(&self.storage),
        ));
        let contracts = Arc::new(SchemaContracts::build(&schema));
        let routes = RouteSet::generate(&schema);

        tracing::info!(schema = %schema.name, table = %model.table_name, "schema registered");
        inner.by_plural.insert(plural, schema.name.clone());
        inner.schemas.insert(
            schema.name.clone(),
            Registered {
                schema,
                model: Arc::clone(&model),
                service,
                contracts,
                routes,
            },
        );
        Ok(model)
    }

    /// Evict a schema and all derived artifacts, including its mapper cache
    /// entry and claimed index names. The stored table is left in place.
    pub fn remove(&self, name: &str) -> bool {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        match inner.schemas.remove(name) {
            Some(entry) => {
                inner.mapper.remove(name);
                let plural = entry.schema.api_plural();
                inner.by_plural.remove(&plural);
                tracing::info!(schema = %name, "schema removed");
                true
            }
            None => false,
        }
    }

    /// Replace a registered schema: full remove + register re-run. Every
    /// derived artifact is rebuilt from the new definition.
    pub fn update(&self, schema: SchemaDefinition) -> Result<Arc<StorageModel>, AppError> {
        if !self.remove(&schema.name) {
            return Err(AppError::NotFound(format!(
                "schema '{}' is not registered",
                schema.name
            )));
        }
        self.register(schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.schemas.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<SchemaHandle> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.schemas.get(name).map(handle)
    }

    /// Resolve an API path segment ("tasks") to its schema handle.
    pub fn resolve(&self, plural: &str) -> Option<SchemaHandle> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let name = inner.by_plural.get(plural)?;
        inner.schemas.get(name).map(handle)
    }

    /// Attach a custom route under a registered schema's base path. Replaces
    /// an existing custom route with the same method and path.
    pub fn register_custom_route(
        &self,
        schema_name: &str,
        method: Method,
        path: impl Into<String>,
        handler: MethodRouter<AppState>,
        metadata: Value,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let entry = inner.schemas.get_mut(schema_name).ok_or_else(|| {
            AppError::NotFound(format!("schema '{}' is not registered", schema_name))
        })?;
        entry.routes.add_custom(CustomRoute {
            method,
            path: path.into(),
            handler,
            metadata,
        });
        Ok(())
    }

    /// Router carrying every custom route, mounted at absolute paths. Merged
    /// into the application router after the generated entity routes.
    pub fn custom_router(&self) -> axum::Router<AppState> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut router = axum::Router::new();
        for entry in inner.schemas.values() {
            for custom in entry.routes.custom_routes() {
                let path = format!("{}{}", entry.routes.base_path, custom.path);
                router = router.route(&path, custom.handler.clone());
            }
        }
        router
    }

    pub fn list_schemas(&self) -> Vec<SchemaSummary> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut out: Vec<SchemaSummary> = inner
            .schemas
            .values()
            .map(|r| SchemaSummary {
                name: r.schema.name.clone(),
                title: r.schema.title.clone(),
                plural: r.schema.api_plural(),
                field_count: r.schema.fields.len(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn schema_info(&self, name: &str) -> Option<SchemaInfo> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.schemas.get(name).map(|r| SchemaInfo {
            name: r.schema.name.clone(),
            version: r.schema.version.clone(),
            title: r.schema.title.clone(),
            description: r.schema.description.clone(),
            table_name: r.model.table_name.clone(),
            field_count: r.schema.fields.len(),
            fields: r
                .schema
                .fields
                .iter()
                .map(|f| serde_json::to_value(f).unwrap_or(Value::Null))
                .collect(),
            features: r.schema.features,
            contracts: (*r.contracts).clone(),
            endpoints: r.routes.endpoint_paths(),
        })
    }

    /// Six generated endpoints per schema plus every custom route.
    pub fn stats(&self) -> SystemStats {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let custom: usize = inner
            .schemas
            .values()
            .map(|r| r.routes.custom_route_count())
            .sum();
        let mut names: Vec<String> = inner.schemas.keys().cloned().collect();
        names.sort();
        SystemStats {
            total_schemas: inner.schemas.len(),
            total_fields: inner.schemas.values().map(|r| r.schema.fields.len()).sum(),
            total_endpoints: inner.schemas.len() * Operation::ALL.len() + custom,
            schemas: names,
        }
    }

    /// Storage models of every registered schema, for applying DDL in bulk.
    pub fn storage_models(&self) -> Vec<Arc<StorageModel>> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .schemas
            .values()
            .map(|r| Arc::clone(&r.model))
            .collect()
    }
}

fn handle(entry: &Registered) -> SchemaHandle {
    SchemaHandle {
        schema: Arc::clone(&entry.schema),
        model: Arc::clone(&entry.model),
        service: Arc::clone(&entry.service),
        contracts: Arc::clone(&entry.contracts),
        route_specs: Arc::new(entry.routes.routes.clone()),
    }
}
