use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use weir_core::template::Section;
use weir_core::types::Value;

/// Header key/values as carried through the engine. Keys are normalized to
/// lowercase at every decode boundary.
pub type HeaderMap = BTreeMap<String, String>;

/// Per-invocation typed state keyed by resource id.
///
/// A store is created at request entry and dropped after the response.
/// Concurrent readers and writers addressing distinct resources are safe;
/// the scheduler guarantees each node only ever writes its own resource.
/// Cloning is cheap and shares the same scope.
#[derive(Debug, Clone, Default)]
pub struct Store {
    scope: Arc<Scope>,
}

#[derive(Debug, Default)]
struct Scope {
    frames: RwLock<HashMap<String, Frame>>,
    parent: Option<Arc<Scope>>,
}

/// Resolved runtime values of a single resource: the header, body and error
/// sub-maps, each keyed by dotted path.
#[derive(Debug, Clone, Default)]
struct Frame {
    header: HeaderMap,
    body: HashMap<String, Value>,
    error: HashMap<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack-scoped child for nested repeated iterations. Reads of
    /// resources the child never wrote fall through to the parent; writes
    /// stay in the child and vanish when it is dropped.
    pub fn new_child(&self) -> Store {
        Store {
            scope: Arc::new(Scope {
                frames: RwLock::new(HashMap::new()),
                parent: Some(self.scope.clone()),
            }),
        }
    }

    /// Record header key/values under `resource.header`. Keys are lowercased.
    pub fn store_header(&self, resource: &str, header: HeaderMap) {
        let mut frames = self.scope.frames.write().expect("store lock poisoned");
        let frame = frames.entry(resource.to_string()).or_default();
        for (key, value) in header {
            frame.header.insert(key.to_lowercase(), value);
        }
    }

    /// Record a typed scalar at a dotted path in the resource's body.
    pub fn store_value(&self, resource: &str, path: &str, value: Value) {
        self.store_value_in(resource, Section::Body, path, value);
    }

    pub fn store_value_in(&self, resource: &str, section: Section, path: &str, value: Value) {
        let mut frames = self.scope.frames.write().expect("store lock poisoned");
        let frame = frames.entry(resource.to_string()).or_default();
        match section {
            Section::Body => {
                frame.body.insert(path.to_string(), value);
            }
            Section::Error => {
                frame.error.insert(path.to_string(), value);
            }
            Section::Header => {
                frame.header.insert(path.to_lowercase(), value.canonical_string());
            }
        }
    }

    /// Read a value from the resource's body. Missing paths return `None`;
    /// the resolver then falls back to the property default or typed zero.
    pub fn load(&self, resource: &str, path: &str) -> Option<Value> {
        self.load_in(resource, Section::Body, path)
    }

    pub fn load_in(&self, resource: &str, section: Section, path: &str) -> Option<Value> {
        let mut scope = Some(&self.scope);
        while let Some(current) = scope {
            let frames = current.frames.read().expect("store lock poisoned");
            if let Some(frame) = frames.get(resource) {
                return match section {
                    Section::Body => frame.body.get(path).cloned(),
                    Section::Error => frame.error.get(path).cloned(),
                    Section::Header => frame
                        .header
                        .get(&path.to_lowercase())
                        .cloned()
                        .map(Value::String),
                };
            }
            drop(frames);
            scope = current.parent.as_ref();
        }
        None
    }

    pub fn load_header(&self, resource: &str, key: &str) -> Option<String> {
        match self.load_in(resource, Section::Header, key) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        }
    }

    /// Snapshot of a resource's header map.
    pub fn header(&self, resource: &str) -> HeaderMap {
        let mut scope = Some(&self.scope);
        while let Some(current) = scope {
            let frames = current.frames.read().expect("store lock poisoned");
            if let Some(frame) = frames.get(resource) {
                return frame.header.clone();
            }
            drop(frames);
            scope = current.parent.as_ref();
        }
        HeaderMap::new()
    }

    /// Mark a resource as executed without recording any values.
    pub fn store_empty(&self, resource: &str) {
        let mut frames = self.scope.frames.write().expect("store lock poisoned");
        frames.entry(resource.to_string()).or_default();
    }

    /// Whether a frame exists for the resource in any reachable scope.
    pub fn has_frame(&self, resource: &str) -> bool {
        let mut scope = Some(&self.scope);
        while let Some(current) = scope {
            let frames = current.frames.read().expect("store lock poisoned");
            if frames.contains_key(resource) {
                return true;
            }
            drop(frames);
            scope = current.parent.as_ref();
        }
        false
    }
}
