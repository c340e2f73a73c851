use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::handlers::{ColumnTypeHandler, TextHandler, builtin_handlers};

const NUMBER_FAMILY: &[&str] = &["number", "integer", "float", "currency", "percentage"];
const TEXT_FAMILY: &[&str] = &["text", "textarea", "email", "url", "phone"];

/// Strip a module namespace prefix from a type id:
/// `"@store/phone:did"` → `"did"`.
pub fn base_type(type_id: &str) -> &str {
    match type_id.rsplit_once(':') {
        Some((_, base)) => base,
        None => type_id,
    }
}

/// Type-compatibility used by the planner's mapping bonus: identical base
/// types always match; the number and text families are mutually compatible
/// within themselves; boolean is only compatible with boolean.
pub fn compatible_types(left: &str, right: &str) -> bool {
    let left = base_type(left);
    let right = base_type(right);
    if left.eq_ignore_ascii_case(right) {
        return true;
    }
    let member = |family: &[&str], id: &str| family.iter().any(|f| f.eq_ignore_ascii_case(id));
    (member(NUMBER_FAMILY, left) && member(NUMBER_FAMILY, right))
        || (member(TEXT_FAMILY, left) && member(TEXT_FAMILY, right))
}

/// Process-wide column type registry.
///
/// Built-in handlers are installed at construction; modules may add more at
/// runtime under a namespaced id. Reads vastly outnumber writes, so the map
/// sits behind an `RwLock`; registration is expected to happen during
/// startup/module installation and callers serialize it.
pub struct TypeRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn ColumnTypeHandler>>>,
    fallback: Arc<dyn ColumnTypeHandler>,
}

impl TypeRegistry {
    /// Registry with no built-ins. Mostly useful in tests.
    pub fn empty() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            fallback: Arc::new(TextHandler),
        }
    }

    /// Registry pre-populated with every built-in column type.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        for handler in builtin_handlers() {
            registry.register(handler);
        }
        registry
    }

    /// Register a handler under its own type id, replacing any previous
    /// registration for that id.
    pub fn register(&self, handler: Arc<dyn ColumnTypeHandler>) {
        let id = handler.type_id().to_string();
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handler);
    }

    /// Register a module-contributed handler under `namespace:id`. The bare
    /// id is aliased too when no other handler claims it, so both the
    /// namespaced and stripped spellings resolve.
    pub fn register_module(&self, namespace: &str, handler: Arc<dyn ColumnTypeHandler>) {
        let id = handler.type_id().to_string();
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        handlers.insert(format!("{namespace}:{id}"), Arc::clone(&handler));
        handlers.entry(id).or_insert(handler);
    }

    /// Exact-id lookup, then a retry with the namespace prefix stripped.
    pub fn lookup(&self, type_id: &str) -> Option<Arc<dyn ColumnTypeHandler>> {
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        handlers
            .get(type_id)
            .or_else(|| handlers.get(base_type(type_id)))
            .cloned()
    }

    /// Like [`lookup`](Self::lookup) but unknown types resolve to the
    /// permissive text handler, preserving the open-world dispatch of the
    /// column model.
    pub fn resolve(&self, type_id: &str) -> Arc<dyn ColumnTypeHandler> {
        self.lookup(type_id)
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.lookup(type_id).is_some()
    }

    /// Registered type ids, sorted for stable listings.
    pub fn type_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyntable_core::CellValue;

    #[test]
    fn builtins_resolve_by_id() {
        let registry = TypeRegistry::with_builtins();
        assert!(registry.contains("percentage"));
        assert!(registry.contains("datetime"));
        assert_eq!(registry.resolve("email").type_id(), "email");
    }

    #[test]
    fn unknown_types_fall_back_to_text() {
        let registry = TypeRegistry::with_builtins();
        let handler = registry.resolve("hologram");
        assert_eq!(handler.type_id(), "text");
        assert!(handler.validate(&CellValue::from("anything"), None).valid);
    }

    #[test]
    fn namespaced_ids_strip_to_the_base_type() {
        assert_eq!(base_type("@store/phone:did"), "did");
        assert_eq!(base_type("phone"), "phone");
    }

    #[test]
    fn families_bound_compatibility() {
        assert!(compatible_types("integer", "currency"));
        assert!(compatible_types("email", "text"));
        assert!(compatible_types("boolean", "boolean"));
        assert!(!compatible_types("boolean", "integer"));
        assert!(!compatible_types("date", "text"));
    }
}
