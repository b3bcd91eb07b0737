//! Static in-process handler registry. If `source` is absent on a module
//! record, it must already be resolvable here in the process image.
//!
//! Handlers statically linked into the daemon binary register themselves
//! here at startup, keyed by `(module_name, class_name)`, via a
//! factory-registration pattern keyed by module/class rather than a
//! plain index/name lookup.

use conduit_interfaces::registry::HandlerConstructor;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
pub struct StaticHandlerRegistry {
    factories: RwLock<HashMap<(String, String), HandlerConstructor>>,
}

impl StaticHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module_name: impl Into<String>, class_name: impl Into<String>, ctor: HandlerConstructor) {
        self.factories
            .write()
            .expect("registry lock poisoned")
            .insert((module_name.into(), class_name.into()), ctor);
    }

    pub fn get(&self, module_name: &str, class_name: &str) -> Option<HandlerConstructor> {
        self.factories
            .read()
            .expect("registry lock poisoned")
            .get(&(module_name.to_string(), class_name.to_string()))
            .cloned()
    }
}
