//! On-demand module loader.
//!
//! Resolves `(package, module, class)` to a constructed [`Handler`]. Two
//! paths:
//!
//! - `source` absent: the module must already be registered in the
//!   process image (`StaticHandlerRegistry`), matching a daemon built
//!   with its tool/resource/prompt modules compiled in.
//! - `source` present: download `{package_name}.zip` from the blob store
//!   into the configured zip root (if not already present), extract it
//!   into `extract_root/{module_name}` (if not already extracted), then
//!   `dlopen` the cdylib it contains and call its `conduit_register`
//!   entry point to populate the static registry, using a
//!   temp-dir-then-rename extraction idiom and a factory-registration
//!   convention for populating the static registry.
//!
//! Extraction is idempotent and safe under concurrent callers for the
//! same package: a per-package `tokio::sync::Mutex` serialises the
//! download+extract+dlopen sequence; a second caller observes the
//! already-extracted directory and skips straight to construction.

use async_trait::async_trait;
use conduit_core::error::{ConduitError, Result};
use conduit_interfaces::blob::BlobStore;
use conduit_interfaces::registry::{Handler, ModuleLoader};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::static_registry::StaticHandlerRegistry;

#[derive(Debug, Clone)]
pub struct PackageLoaderConfig {
    pub zip_root: PathBuf,
    pub extract_root: PathBuf,
}

/// Entry point symbol name dynamically loaded modules must export.
pub const REGISTER_SYMBOL: &[u8] = b"conduit_register\0";

pub struct ConduitModuleLoader {
    registry: Arc<StaticHandlerRegistry>,
    blob_store: Option<Arc<dyn BlobStore>>,
    config: PackageLoaderConfig,
    package_locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ConduitModuleLoader {
    pub fn new(
        registry: Arc<StaticHandlerRegistry>,
        blob_store: Option<Arc<dyn BlobStore>>,
        config: PackageLoaderConfig,
    ) -> Self {
        Self {
            registry,
            blob_store,
            config,
            package_locks: StdMutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, package_name: &str) -> Arc<AsyncMutex<()>> {
        self.package_locks
            .lock()
            .expect("package lock map poisoned")
            .entry(package_name.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Ensures `extract_root/{module_name}` exists, downloading and
    /// extracting `{package_name}.zip` if it doesn't (§4.C).
    async fn ensure_extracted(&self, package_name: &str, module_name: &str) -> Result<PathBuf> {
        let dest = self.config.extract_root.join(module_name);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(module_name, "module already extracted, skipping download");
            return Ok(dest);
        }

        let lock = self.lock_for(package_name);
        let _guard = lock.lock().await;

        // Re-check: another caller may have finished extracting while we
        // waited on the lock.
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            return Ok(dest);
        }

        let blob_store = self
            .blob_store
            .as_ref()
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("no blob store configured for package {package_name}")))?;

        let zip_key = format!("{package_name}.zip");
        let zip_path = self.config.zip_root.join(&zip_key);
        if !tokio::fs::try_exists(&zip_path).await.unwrap_or(false) {
            info!(package_name, "downloading package archive");
            let bytes = blob_store
                .get(&zip_key)
                .await?
                .ok_or_else(|| ConduitError::ModuleUnavailable(format!("package {package_name} not found in blob store")))?;
            if let Some(parent) = zip_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&zip_path, bytes).await?;
        }

        let extract_root = self.config.extract_root.clone();
        let zip_path_owned = zip_path.clone();
        let module_name_owned = module_name.to_string();
        tokio::task::spawn_blocking(move || extract_zip(&zip_path_owned, &extract_root, &module_name_owned))
            .await
            .map_err(|e| ConduitError::Internal(format!("extraction task panicked: {e}")))??;

        tokio::fs::create_dir_all(self.config.extract_root.join(&module_name).parent().unwrap_or(&self.config.extract_root))
            .await
            .ok();

        Ok(dest)
    }

    /// Loads the cdylib at `dir` and invokes its `conduit_register` entry
    /// point so the handler constructors it ships become available
    /// through the same static registry static-linked handlers use.
    fn dlopen_and_register(&self, dir: &Path) -> Result<()> {
        let candidate = find_cdylib(dir)
            .ok_or_else(|| ConduitError::ModuleUnavailable(format!("no shared library found in {}", dir.display())))?;

        // SAFETY: the library path is resolved from a blob-store-extracted
        // directory controlled by the daemon operator's configured package
        // source, and `conduit_register` is called exactly once per
        // successfully extracted module under the per-package lock.
        unsafe {
            let lib = libloading::Library::new(&candidate)
                .map_err(|e| ConduitError::ModuleUnavailable(format!("dlopen {} failed: {e}", candidate.display())))?;
            let register: libloading::Symbol<unsafe extern "C" fn(&StaticHandlerRegistry)> = lib
                .get(REGISTER_SYMBOL)
                .map_err(|e| ConduitError::ModuleUnavailable(format!("missing conduit_register symbol: {e}")))?;
            register(&self.registry);
            // Intentionally leak the library handle: it must outlive every
            // handler constructed from it for the process lifetime.
            std::mem::forget(lib);
        }
        Ok(())
    }
}

#[async_trait]
impl ModuleLoader for ConduitModuleLoader {
    async fn load(
        &self,
        package_name: Option<&str>,
        module_name: &str,
        class_name: &str,
        source: Option<&str>,
        setting: Value,
    ) -> Result<Arc<dyn Handler>> {
        if source.is_some() {
            let package_name = package_name
                .ok_or_else(|| ConduitError::ModuleUnavailable("source set but package_name missing".to_string()))?;
            let dir = self.ensure_extracted(package_name, module_name).await?;
            if self.registry.get(module_name, class_name).is_none() {
                self.dlopen_and_register(&dir)?;
            }
        }

        let ctor = self.registry.get(module_name, class_name).ok_or_else(|| {
            ConduitError::ModuleUnavailable(format!("module {module_name} class {class_name} is not resolvable"))
        })?;

        (ctor)(setting).map_err(|e| ConduitError::HandlerConstructionFailed(e.to_string()))
    }
}

fn find_cdylib(dir: &Path) -> Option<PathBuf> {
    let ext = std::env::consts::DLL_EXTENSION;
    std::fs::read_dir(dir).ok()?.filter_map(|e| e.ok()).map(|e| e.path()).find(|p| {
        p.extension().and_then(|e| e.to_str()) == Some(ext)
    })
}

/// Extracts `zip_path` into a fresh temp directory under `extract_root`
/// and atomically renames it to `extract_root/{module_name}`, a stable,
/// idempotent destination rather than a process-lifetime temp dir.
/// Rejects entries with unsafe (absolute or `..`-containing) paths.
fn extract_zip(zip_path: &Path, extract_root: &Path, module_name: &str) -> Result<()> {
    std::fs::create_dir_all(extract_root)?;
    let staging = extract_root.join(format!(".{module_name}.tmp-{}", std::process::id()));
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    std::fs::create_dir_all(&staging)?;

    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ConduitError::Internal(format!("zip open failed: {e}")))?;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ConduitError::Internal(format!("zip entry read failed: {e}")))?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(index = i, "skipping zip entry with unsafe path");
            continue;
        };
        let out_path = staging.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out_file = std::fs::File::create(&out_path)?;
            std::io::copy(&mut entry, &mut out_file)?;
        }
    }

    let dest = extract_root.join(module_name);
    match std::fs::rename(&staging, &dest) {
        Ok(()) => Ok(()),
        Err(_) if dest.exists() => {
            // Another process/thread won the race; our staging copy is
            // redundant.
            let _ = std::fs::remove_dir_all(&staging);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_cdylib_picks_matching_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"hi").unwrap();
        let lib_name = format!("libfoo.{}", std::env::consts::DLL_EXTENSION);
        std::fs::write(dir.path().join(&lib_name), b"fake").unwrap();
        let found = find_cdylib(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap().to_str().unwrap(), lib_name);
    }

    #[tokio::test]
    async fn static_registry_resolves_without_source() {
        let registry = Arc::new(StaticHandlerRegistry::new());
        registry.register(
            "echo_module",
            "EchoHandler",
            Arc::new(|_setting| -> conduit_core::error::Result<Arc<dyn Handler>> {
                struct Echo;
                #[async_trait]
                impl Handler for Echo {
                    async fn call(&self, _function_name: &str, args: Value) -> conduit_core::error::Result<Value> {
                        Ok(args)
                    }
                }
                Ok(Arc::new(Echo))
            }),
        );
        let loader = ConduitModuleLoader::new(
            registry,
            None,
            PackageLoaderConfig {
                zip_root: PathBuf::from("/tmp/conduit-zip"),
                extract_root: PathBuf::from("/tmp/conduit-extract"),
            },
        );
        let handler = loader
            .load(None, "echo_module", "EchoHandler", None, serde_json::json!({}))
            .await
            .unwrap();
        let out = handler.call("echo", serde_json::json!({"msg": "hi"})).await.unwrap();
        assert_eq!(out, serde_json::json!({"msg": "hi"}));
    }

    #[tokio::test]
    async fn missing_module_without_source_is_module_unavailable() {
        let registry = Arc::new(StaticHandlerRegistry::new());
        let loader = ConduitModuleLoader::new(
            registry,
            None,
            PackageLoaderConfig {
                zip_root: PathBuf::from("/tmp/conduit-zip"),
                extract_root: PathBuf::from("/tmp/conduit-extract"),
            },
        );
        let err = loader.load(None, "missing", "Missing", None, serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ConduitError::ModuleUnavailable(_)));
    }
}
