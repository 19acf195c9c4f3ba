//! Pluggable route sets
//!
//! A component turns its `apis.<name>` configuration section into a router.
//! The server looks each enabled API up by name in a [`ComponentRegistry`]
//! built at startup.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use common::ApiConfig;
use tracing::info;

use crate::components::{AuthComponent, Echo, Hello};
use crate::error::{ApiError, ApiResult};
use crate::state::Environment;

pub trait Component: Send + Sync {
    fn name(&self) -> &'static str;

    /// Routes relative to the component's mount point
    fn routes(&self, api: &ApiConfig, env: &Environment) -> ApiResult<Router>;
}

#[derive(Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the auth, echo and hello components
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AuthComponent).register(Echo).register(Hello);
        registry
    }

    /// Register a component, replacing any previous one with the same name
    pub fn register<C: Component + 'static>(&mut self, component: C) -> &mut Self {
        let name = component.name();
        if self
            .components
            .insert(name.to_string(), Arc::new(component))
            .is_some()
        {
            info!("Replaced component {}", name);
        }
        self
    }

    pub fn get(&self, name: &str) -> ApiResult<Arc<dyn Component>> {
        self.components
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::UnknownComponent(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
