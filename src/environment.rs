use crate::error::CrustError;
use crate::value::{Function, Value};
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

/// Closed scopes retained before the first collection.
const COLLECTION_THRESHOLD: usize = 64;

/// Handle to a scope inside an [`Environment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Held by every function closed over a scope. The scope stays allocated while
/// a function that can still be reached holds it.
#[derive(Debug)]
pub struct CapturedScope {
    scope: ScopeId,
}

impl CapturedScope {
    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, Value>,
    constants: HashSet<String>,
    parent: Option<ScopeId>,
    open: bool,
    /// Allocated scopes whose parent is this one.
    children: usize,
    capture: Weak<CapturedScope>,
}

/// Arena of lexical scopes.
///
/// Scopes refer to their parent by handle and functions refer to their defining
/// scope through a shared [`CapturedScope`]. A scope that is popped while nothing
/// captured it is freed at once. Captured scopes are kept until [`Environment::collect`]
/// finds that the only functions holding them live in other unreachable scopes,
/// which covers a function stored in the very scope it closes over.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Option<Scope>>,
    free: Vec<usize>,
    live: usize,
    open: usize,
    next_collection: usize,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A bare root scope, without even `true`/`false`/`null`.
    pub fn new() -> Self {
        Self {
            scopes: vec![Some(Scope {
                open: true,
                ..Scope::default()
            })],
            free: Vec::new(),
            live: 1,
            open: 1,
            next_collection: COLLECTION_THRESHOLD,
        }
    }

    /// Root scope seeded with the constants `true`, `false`, `null` followed by
    /// `bindings`, all declared constant.
    pub fn with_bindings<I>(bindings: I) -> Result<Self, CrustError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut environment = Self::new();
        let root = environment.root();
        environment.declare(root, "true", Value::Boolean(true), true)?;
        environment.declare(root, "false", Value::Boolean(false), true)?;
        environment.declare(root, "null", Value::Null, true)?;
        for (name, value) in bindings {
            environment.declare(root, &name, value, true)?;
        }
        Ok(environment)
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Open a child scope of `parent`. Every pushed scope must be popped with
    /// [`Environment::pop_scope`].
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        if let Some(Some(scope)) = self.scopes.get_mut(parent.0) {
            scope.children += 1;
        }

        let scope = Scope {
            parent: Some(parent),
            open: true,
            ..Scope::default()
        };
        let index = match self.free.pop() {
            Some(index) => {
                self.scopes[index] = Some(scope);
                index
            }
            None => {
                self.scopes.push(Some(scope));
                self.scopes.len() - 1
            }
        };

        self.live += 1;
        self.open += 1;
        ScopeId(index)
    }

    /// Close `scope`. It is freed right away unless a function captured it or
    /// one of its children is still allocated.
    pub fn pop_scope(&mut self, scope: ScopeId) {
        if let Some(Some(closed)) = self.scopes.get_mut(scope.0) {
            closed.open = false;
            self.open -= 1;
        }

        if self.is_freeable(scope) {
            self.free_chain(scope);
        } else if self.retained() >= self.next_collection {
            self.collect();
            self.next_collection = (self.retained() * 2).max(COLLECTION_THRESHOLD);
        }
    }

    /// Handle that keeps `scope` alive for as long as some function holds it.
    pub fn capture(&mut self, scope: ScopeId) -> Rc<CapturedScope> {
        let Some(Some(target)) = self.scopes.get_mut(scope.0) else {
            return Rc::new(CapturedScope { scope });
        };

        match target.capture.upgrade() {
            Some(handle) => handle,
            None => {
                let handle = Rc::new(CapturedScope { scope });
                target.capture = Rc::downgrade(&handle);
                handle
            }
        }
    }

    pub fn scope_count(&self) -> usize {
        self.live
    }

    /// Free every closed scope that no reachable function can get back to.
    ///
    /// Roots are the open scopes and the captured scopes held by a function that
    /// is not bound exclusively inside closed scopes (a function on the host
    /// stack, inside a container, or bound in an open scope). Everything reachable
    /// from a root through parent links, bindings, arrays and objects survives.
    pub fn collect(&mut self) {
        let mut bound: HashMap<*const Function, (usize, usize, ScopeId)> = HashMap::new();
        for scope in self.scopes.iter().flatten().filter(|scope| !scope.open) {
            for value in scope.values.values() {
                if let Value::Function(function) = value {
                    let entry = bound
                        .entry(Rc::as_ptr(function))
                        .or_insert((0, Rc::strong_count(function), function.scope()));
                    entry.0 += 1;
                }
            }
        }

        let mut internal: HashMap<usize, usize> = HashMap::new();
        for (bindings, holders, scope) in bound.into_values() {
            if bindings == holders {
                *internal.entry(scope.0).or_default() += 1;
            }
        }

        let mut pending: Vec<ScopeId> = Vec::new();
        for (index, scope) in self.scopes.iter().enumerate() {
            if let Some(scope) = scope {
                let held = scope.capture.strong_count();
                if scope.open || held > internal.get(&index).copied().unwrap_or(0) {
                    pending.push(ScopeId(index));
                }
            }
        }

        let mut reachable = vec![false; self.scopes.len()];
        let mut seen_containers: HashSet<*const ()> = HashSet::new();
        while let Some(id) = pending.pop() {
            let Some(Some(scope)) = self.scopes.get(id.0) else {
                continue;
            };
            if reachable[id.0] {
                continue;
            }
            reachable[id.0] = true;
            pending.extend(scope.parent);

            let mut values: Vec<Value> = scope.values.values().cloned().collect();
            while let Some(value) = values.pop() {
                match value {
                    Value::Function(function) => pending.push(function.scope()),
                    Value::Array(elements) => {
                        if seen_containers.insert(Rc::as_ptr(&elements) as *const ()) {
                            values.extend(elements.borrow().iter().cloned());
                        }
                    }
                    Value::Object(properties) => {
                        if seen_containers.insert(Rc::as_ptr(&properties) as *const ()) {
                            values.extend(properties.borrow().values().cloned());
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut freed = Vec::new();
        for (index, alive) in reachable.into_iter().enumerate() {
            if alive {
                continue;
            }
            if let Some(scope) = self.scopes[index].take() {
                self.free.push(index);
                self.live -= 1;
                freed.push(scope);
            }
        }
        for scope in &freed {
            if let Some(Some(parent)) = scope.parent.and_then(|parent| self.scopes.get_mut(parent.0)) {
                parent.children -= 1;
            }
        }

        if !freed.is_empty() {
            tracing::trace!(freed = freed.len(), live = self.live, "collected scopes");
        }
    }

    /// Closed scopes that are still allocated.
    fn retained(&self) -> usize {
        self.live - self.open
    }

    fn is_freeable(&self, scope: ScopeId) -> bool {
        match self.scopes.get(scope.0) {
            Some(Some(scope)) => !scope.open && scope.children == 0 && scope.capture.strong_count() == 0,
            _ => false,
        }
    }

    /// Free `scope`, then every ancestor that only stayed allocated for it.
    fn free_chain(&mut self, scope: ScopeId) {
        let mut next = Some(scope);

        while let Some(id) = next.take() {
            let Some(freed) = self.scopes[id.0].take() else {
                break;
            };
            self.free.push(id.0);
            self.live -= 1;

            if let Some(parent) = freed.parent {
                if let Some(Some(owner)) = self.scopes.get_mut(parent.0) {
                    owner.children -= 1;
                }
                if self.is_freeable(parent) {
                    next = Some(parent);
                }
            }
        }
    }

    fn scope(&self, id: ScopeId) -> Result<&Scope, CrustError> {
        match self.scopes.get(id.0) {
            Some(Some(scope)) => Ok(scope),
            _ => Err(freed_scope(id)),
        }
    }

    fn scope_mut(&mut self, id: ScopeId) -> Result<&mut Scope, CrustError> {
        match self.scopes.get_mut(id.0) {
            Some(Some(scope)) => Ok(scope),
            _ => Err(freed_scope(id)),
        }
    }

    /// Fails if `name` is already declared in this very scope; shadowing a
    /// parent's binding is fine.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        value: Value,
        constant: bool,
    ) -> Result<Value, CrustError> {
        let target = self.scope_mut(scope)?;
        if target.values.contains_key(name) {
            return Err(CrustError::runtime_error(format!(
                "Cannot redeclare variable '{}', it is already declared",
                name
            ))
            .with_help("Assign to it with '=' instead, or declare it in an inner block."));
        }

        target.values.insert(name.to_string(), value.clone());
        if constant {
            target.constants.insert(name.to_string());
        }
        Ok(value)
    }

    pub fn get(&self, scope: ScopeId, name: &str) -> Result<Value, CrustError> {
        let owner = self.resolve(scope, name)?;
        let value = self.scope(owner)?.values.get(name).cloned();
        Ok(value.unwrap_or(Value::Null))
    }

    pub fn assign(&mut self, scope: ScopeId, name: &str, value: Value) -> Result<Value, CrustError> {
        let owner = self.resolve(scope, name)?;
        let target = self.scope_mut(owner)?;

        if target.constants.contains(name) {
            return Err(CrustError::runtime_error(format!(
                "Cannot reassign constant variable '{}'",
                name
            ))
            .with_help("Declare it with 'set' instead of 'keep' if it needs to change."));
        }

        target.values.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Innermost scope, walking outwards from `scope`, that declares `name`.
    fn resolve(&self, scope: ScopeId, name: &str) -> Result<ScopeId, CrustError> {
        let mut current = Some(scope);

        while let Some(id) = current {
            let candidate = self.scope(id)?;
            if candidate.values.contains_key(name) {
                return Ok(id);
            }
            current = candidate.parent;
        }

        Err(CrustError::runtime_error(format!(
            "Variable '{}' is not declared",
            name
        ))
        .with_help(format!("Declare it first with 'set {} = ...'", name)))
    }
}

fn freed_scope(id: ScopeId) -> CrustError {
    CrustError::runtime_error(format!("Scope {} is no longer allocated", id.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn shadowing_is_scope_local() {
        let mut env = Environment::new();
        let root = env.root();
        env.declare(root, "x", Value::Number(1.0), false).unwrap();

        let inner = env.push_scope(root);
        env.declare(inner, "x", Value::Number(2.0), false).unwrap();
        assert_eq!(env.get(inner, "x").unwrap(), Value::Number(2.0));
        assert_eq!(env.get(root, "x").unwrap(), Value::Number(1.0));

        let err = env.declare(inner, "x", Value::Null, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::RuntimeError);
    }

    #[test]
    fn assign_updates_the_owning_scope() {
        let mut env = Environment::new();
        let root = env.root();
        env.declare(root, "x", Value::Number(1.0), false).unwrap();
        let inner = env.push_scope(root);

        env.assign(inner, "x", Value::Number(5.0)).unwrap();
        assert_eq!(env.get(root, "x").unwrap(), Value::Number(5.0));
        assert!(env.assign(inner, "missing", Value::Null).is_err());
        assert!(env.get(inner, "missing").is_err());
    }

    #[test]
    fn constants_cannot_be_reassigned() {
        let mut env = Environment::with_bindings(Vec::new()).unwrap();
        let root = env.root();
        env.declare(root, "k", Value::Number(1.0), true).unwrap();
        let inner = env.push_scope(root);

        assert!(env.assign(inner, "k", Value::Number(2.0)).is_err());
        assert!(env.assign(root, "true", Value::Boolean(false)).is_err());
        assert_eq!(env.get(inner, "null").unwrap(), Value::Null);
    }

    #[test]
    fn popped_scopes_are_freed_unless_captured() {
        let mut env = Environment::new();
        let root = env.root();

        let block = env.push_scope(root);
        let inner = env.push_scope(block);
        env.pop_scope(inner);
        env.pop_scope(block);
        assert_eq!(env.scope_count(), 1);

        let block = env.push_scope(root);
        let inner = env.push_scope(block);
        let captured = env.capture(inner);
        assert_eq!(captured.scope(), inner);
        env.pop_scope(inner);
        env.pop_scope(block);
        assert_eq!(env.scope_count(), 3);

        env.collect();
        assert_eq!(env.scope_count(), 3);

        drop(captured);
        env.collect();
        assert_eq!(env.scope_count(), 1);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut env = Environment::new();
        let root = env.root();

        let first = env.push_scope(root);
        env.pop_scope(first);
        let second = env.push_scope(root);
        assert_eq!(first, second);
        env.declare(second, "x", Value::Number(1.0), false).unwrap();
        assert_eq!(env.get(second, "x").unwrap(), Value::Number(1.0));
        env.pop_scope(second);
        assert_eq!(env.scope_count(), 1);
    }
}
