use std::{collections::HashMap, sync::Arc};

/// Request-scoped metadata attached to every message.
///
/// A context is either [`Empty`](ExecutionContext::Empty), the sentinel for
/// deliberately detached calls (e.g. fire-and-forget background work that
/// must not inherit a caller's tracing span), or a [`Scope`]: an immutable
/// key→value map carrying tracing ids and propagated headers.
///
/// The scope map is never mutated in place. Crossing into a nested actor
/// call hands the callee a [`fork`](ExecutionContext::fork); deriving new
/// values goes through [`with_values`](ExecutionContext::with_values), which
/// replaces the map. Concurrent call branches therefore never observe each
/// other's changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Do not propagate caller scope.
    #[default]
    Empty,
    Scoped(Scope),
}

/// Immutable key→value scope shared behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    values: Arc<HashMap<String, String>>,
}

impl ExecutionContext {
    /// Build a scoped context from key/value pairs.
    pub fn scoped<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        ExecutionContext::Scoped(Scope {
            values: Arc::new(values.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        })
    }

    /// Value stored under `key`, if this context carries a scope at all.
    pub fn get(&self, key: &str) -> Option<&str> {
        match self {
            ExecutionContext::Empty => None,
            ExecutionContext::Scoped(scope) => scope.values.get(key).map(String::as_str),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, ExecutionContext::Empty)
    }

    /// The copy handed to a nested call. Since scopes are immutable this is
    /// a cheap clone; `Empty` forks to `Empty`.
    #[inline]
    pub fn fork(&self) -> Self {
        self.clone()
    }

    /// A new context with `entries` merged over the current scope. The
    /// original is untouched; an `Empty` context becomes a fresh scope.
    pub fn with_values<K, V>(&self, entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values: HashMap<String, String> = match self {
            ExecutionContext::Empty => HashMap::new(),
            ExecutionContext::Scoped(scope) => scope.values.as_ref().clone(),
        };
        values.extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
        ExecutionContext::Scoped(Scope {
            values: Arc::new(values),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_has_no_values() {
        let ctx = ExecutionContext::Empty;
        assert!(ctx.is_empty());
        assert_eq!(ctx.get("anything"), None);
        assert!(ctx.fork().is_empty());
    }

    #[test]
    fn scoped_context_reads_back_values() {
        let ctx = ExecutionContext::scoped([("trace", "t-1"), ("user", "u-7")]);
        assert!(!ctx.is_empty());
        assert_eq!(ctx.get("trace"), Some("t-1"));
        assert_eq!(ctx.get("user"), Some("u-7"));
        assert_eq!(ctx.get("missing"), None);
    }

    #[test]
    fn with_values_replaces_instead_of_mutating() {
        let original = ExecutionContext::scoped([("trace", "t-1")]);
        let derived = original.with_values([("span", "s-2")]);

        assert_eq!(original.get("span"), None);
        assert_eq!(derived.get("trace"), Some("t-1"));
        assert_eq!(derived.get("span"), Some("s-2"));
    }

    #[test]
    fn with_values_promotes_empty_to_scope() {
        let derived = ExecutionContext::Empty.with_values([("trace", "t-9")]);
        assert_eq!(derived.get("trace"), Some("t-9"));
    }
}
