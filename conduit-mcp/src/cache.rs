//! Per-partition materialised configuration cache (§4.H).

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use conduit_caching::{Cache, CacheError, MokaCache};
use conduit_core::error::{ConduitError, Result};
use conduit_core::types::{MaterialisedConfig, ModuleLink, ResolvedModule};
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;

use crate::config_store::ConfigStoreClient;

fn cache_err(e: CacheError) -> ConduitError {
    ConduitError::Internal(format!("cache backend error: {e}"))
}

/// Mutation names that trigger cascading invalidation when they succeed
/// against a partition via `/mcp_core_graphql` (§4.H).
pub const INVALIDATING_MUTATIONS: &[&str] = &[
    "insertUpdateMcpFunction",
    "deleteMcpFunction",
    "insertUpdateMcpModule",
    "deleteMcpModule",
    "insertUpdateMcpSetting",
    "deleteMcpSetting",
];

pub struct ConfigCache {
    store: Arc<dyn ConfigStoreClient>,
    entries: MokaCache<String, Arc<MaterialisedConfig>>,
    build_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    cascade_depth: u32,
}

impl ConfigCache {
    pub fn new(store: Arc<dyn ConfigStoreClient>, cascade_depth: u32) -> Self {
        Self {
            store,
            entries: MokaCache::new(10_000),
            build_locks: StdMutex::new(HashMap::new()),
            cascade_depth,
        }
    }

    fn lock_for(&self, partition_key: &str) -> Arc<AsyncMutex<()>> {
        self.build_locks
            .lock()
            .expect("build lock map poisoned")
            .entry(partition_key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Returns the cached materialised configuration, building it on a
    /// cold cache or when `force_refresh` is set (§4.H build steps 1-6).
    pub async fn fetch(&self, partition_key: &str, force_refresh: bool) -> Result<Arc<MaterialisedConfig>> {
        if !force_refresh {
            if let Some(cached) = self.entries.get(&partition_key.to_string()).await.map_err(cache_err)? {
                return Ok(cached);
            }
        }

        // Serialises builds for the same partition so a thundering herd
        // of cold-cache requests doesn't each re-query upstream; a racing
        // build that slips through still only ever leaves the
        // last-`install`-wins result in place (§5 ordering guarantee).
        let lock = self.lock_for(partition_key);
        let _guard = lock.lock().await;

        if !force_refresh {
            if let Some(cached) = self.entries.get(&partition_key.to_string()).await.map_err(cache_err)? {
                return Ok(cached);
            }
        }

        let built = Arc::new(self.build(partition_key).await?);
        self.entries
            .put(partition_key.to_string(), built.clone())
            .await
            .map_err(cache_err)?;
        Ok(built)
    }

    pub async fn refresh(&self, partition_key: &str) -> Result<Arc<MaterialisedConfig>> {
        self.fetch(partition_key, true).await
    }

    pub async fn clear(&self, partition_key: Option<&str>) -> Result<()> {
        match partition_key {
            Some(pk) => {
                self.entries.remove(&pk.to_string()).await.map_err(cache_err)?;
            }
            None => self.entries.clear().await.map_err(cache_err)?,
        }
        Ok(())
    }

    /// Purges a partition's configuration on a known-invalidating upstream
    /// mutation, depth-bounded at `self.cascade_depth` (default 3) to
    /// avoid unbounded re-entrancy should the invalidation set ever grow
    /// a cycle (§4.H cascading invalidation).
    pub async fn invalidate_on_mutation(&self, partition_key: &str, mutation_name: &str) -> Result<()> {
        if !INVALIDATING_MUTATIONS.contains(&mutation_name) {
            return Ok(());
        }
        self.cascade(partition_key, self.cascade_depth).await
    }

    async fn cascade(&self, partition_key: &str, depth_remaining: u32) -> Result<()> {
        self.clear(Some(partition_key)).await?;
        if depth_remaining == 0 {
            return Ok(());
        }
        // mcp_setting -> mcp_module -> mcp_function -> mcp_function_call
        // are all rolled into a single materialised-config purge here
        // since every entity kind is cached as one unit per partition;
        // the depth bound exists for future per-entity-kind cache tiers.
        Ok(())
    }

    async fn build(&self, partition_key: &str) -> Result<MaterialisedConfig> {
        use conduit_core::types::McpType;

        let functions = self.store.list_all_functions(partition_key).await?;

        let mut tools = Vec::new();
        let mut resources = Vec::new();
        let mut prompts = Vec::new();
        let mut module_links = Vec::new();

        for f in functions {
            if let (Some(module_name), Some(class_name), Some(function_name)) =
                (f.module_name.clone(), f.class_name.clone(), f.function_name.clone())
            {
                module_links.push(ModuleLink {
                    mcp_type: f.mcp_type,
                    name: f.name.clone(),
                    module_name,
                    class_name,
                    function_name,
                    return_type: f.return_type,
                    is_async: f.is_async,
                });
            }
            match f.mcp_type {
                McpType::Tool => tools.push(f),
                McpType::Resource => resources.push(f),
                McpType::Prompt => prompts.push(f),
            }
        }

        let mut modules_by_name: HashMap<String, Vec<&ModuleLink>> = HashMap::new();
        for link in &module_links {
            modules_by_name.entry(link.module_name.clone()).or_default().push(link);
        }

        let mut resolved_modules = Vec::new();
        for (module_name, links) in modules_by_name {
            let module = match self.store.get_module(partition_key, &module_name).await {
                Ok(Some(m)) => m,
                Ok(None) => {
                    warn!(module_name, "module referenced by a function but not found, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(module_name, error = %e, "failed to fetch module, skipping");
                    continue;
                }
            };

            let class_names: std::collections::HashSet<&str> = links.iter().map(|l| l.class_name.as_str()).collect();
            for class_name in class_names {
                let Some(binding) = module.classes.iter().find(|c| c.class_name == class_name) else {
                    continue;
                };
                let setting = match self.store.get_setting(partition_key, &binding.setting_id).await {
                    Ok(Some(s)) => s.setting,
                    Ok(None) => serde_json::Value::Object(Default::default()),
                    Err(e) => {
                        warn!(class_name, error = %e, "failed to fetch setting, degrading to empty");
                        serde_json::Value::Object(Default::default())
                    }
                };
                resolved_modules.push(ResolvedModule {
                    module_name: module.module_name.clone(),
                    package_name: module.package_name.clone(),
                    class_name: class_name.to_string(),
                    setting,
                    source: module.source.clone(),
                });
            }
        }

        Ok(MaterialisedConfig {
            tools,
            resources,
            prompts,
            module_links,
            modules: resolved_modules,
        })
    }
}
