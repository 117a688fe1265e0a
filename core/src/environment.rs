//! Environment for variable bindings
//!
//! Frames live in an arena and point at their parent by index, so a chain of
//! scopes never owns itself. Every lookup can consult one shared, read-only
//! [`SystemEnvironment`] holding the builtins.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::interner::Symbol;
use crate::value::{Builtin, TypeObject, Value};

/// Names of every type descriptor bound in the system table
pub const BUILTIN_TYPE_NAMES: [&str; 11] = [
    "int", "int8", "int16", "int32", "int64", "float", "float32", "float64", "bool", "char",
    "list",
];

// ============================================================================
// System Environment
// ============================================================================

/// The process-wide builtin table. Built once by [`init_builtins`] and only
/// ever read afterwards.
#[derive(Debug)]
pub struct SystemEnvironment {
    bindings: FxHashMap<Symbol, Value>,
}

impl SystemEnvironment {
    pub fn get(&self, name: Symbol) -> Option<&Value> {
        self.bindings.get(&name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(&Symbol::intern(name))
    }
}

/// Build the builtin table: the functions `+ - * / if eval` and a type
/// descriptor for every builtin type name.
pub fn init_builtins() -> Rc<SystemEnvironment> {
    let mut bindings = FxHashMap::default();
    for op in Builtin::ALL {
        bindings.insert(Symbol::intern(op.name()), Value::builtin(op));
    }
    for name in BUILTIN_TYPE_NAMES {
        bindings.insert(Symbol::intern(name), Value::type_object(TypeObject::scalar(name)));
    }
    trace!(count = bindings.len(), "builtins initialised");
    Rc::new(SystemEnvironment { bindings })
}

// ============================================================================
// Frames
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

impl FrameId {
    pub const ROOT: FrameId = FrameId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvBinding {
    pub name: Symbol,
    pub value: Value,
}

#[derive(Debug, Default)]
struct Frame {
    bindings: Vec<EnvBinding>,
    parent: Option<FrameId>,
}

/// Where a name was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingRef {
    System(Symbol),
    Frame { frame: FrameId, index: usize },
}

// ============================================================================
// Environment
// ============================================================================

#[derive(Debug)]
pub struct Environment {
    frames: Vec<Frame>,
    system: Rc<SystemEnvironment>,
}

impl Environment {
    /// Create an environment holding only the root frame
    pub fn new(system: Rc<SystemEnvironment>) -> Self {
        Environment {
            frames: vec![Frame::default()],
            system,
        }
    }

    pub fn system(&self) -> &Rc<SystemEnvironment> {
        &self.system
    }

    /// Number of live frames, root included
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Push a fresh frame whose parent is `parent`
    pub fn push_frame(&mut self, parent: FrameId) -> FrameId {
        let id = FrameId(self.frames.len());
        self.frames.push(Frame {
            bindings: Vec::new(),
            parent: Some(parent),
        });
        trace!(frame = id.0, parent = parent.0, "frame pushed");
        id
    }

    /// Drop `frame` and every frame created after it. The root frame stays.
    pub fn pop_to(&mut self, frame: FrameId) {
        let keep = frame.0.max(1);
        if keep < self.frames.len() {
            trace!(frame = frame.0, dropped = self.frames.len() - keep, "frames popped");
            self.frames.truncate(keep);
        }
    }

    /// Follow parents until there are none
    pub fn outermost(&self, frame: FrameId) -> FrameId {
        let mut current = frame;
        while let Some(parent) = self.frames.get(current.0).and_then(|f| f.parent) {
            current = parent;
        }
        current
    }

    /// Find `name` starting at `frame`.
    ///
    /// With `check_system` the builtin table is consulted first, and only for
    /// this innermost call. Without `recurse` only `frame` itself is scanned.
    /// Absence is `None`, never an error.
    pub fn find_binding(
        &self,
        frame: FrameId,
        name: Symbol,
        recurse: bool,
        check_system: bool,
    ) -> Option<BindingRef> {
        if check_system && self.system.get(name).is_some() {
            return Some(BindingRef::System(name));
        }

        let mut current = Some(frame);
        while let Some(id) = current {
            let scope = self.frames.get(id.0)?;
            if let Some(index) = scope.bindings.iter().position(|b| b.name == name) {
                return Some(BindingRef::Frame { frame: id, index });
            }
            if !recurse {
                return None;
            }
            current = scope.parent;
        }
        None
    }

    /// Recursive lookup from `frame`, system table first
    pub fn lookup(&self, frame: FrameId, name: &str) -> Option<&Value> {
        self.find_binding(frame, Symbol::intern(name), true, true)
            .and_then(|found| self.value(&found))
    }

    pub fn value(&self, binding: &BindingRef) -> Option<&Value> {
        match *binding {
            BindingRef::System(name) => self.system.get(name),
            BindingRef::Frame { frame, index } => self
                .frames
                .get(frame.0)
                .and_then(|f| f.bindings.get(index))
                .map(|b| &b.value),
        }
    }

    /// Append an empty binding for `name` to `frame`, or to its outermost
    /// ancestor when `global`. The caller writes the value next.
    ///
    /// Panics if `frame` has already been popped.
    pub fn add_binding(&mut self, frame: FrameId, global: bool, name: Symbol) -> BindingRef {
        let target = if global { self.outermost(frame) } else { frame };
        let bindings = &mut self.frames[target.0].bindings;
        bindings.push(EnvBinding {
            name,
            value: Value::undecided(),
        });
        BindingRef::Frame {
            frame: target,
            index: bindings.len() - 1,
        }
    }

    /// Write into a slot found by [`find_binding`](Self::find_binding) or
    /// created by [`add_binding`](Self::add_binding). Returns `false` for
    /// system slots, which are read-only.
    pub fn write(&mut self, binding: &BindingRef, value: Value) -> bool {
        match *binding {
            BindingRef::System(_) => false,
            BindingRef::Frame { frame, index } => {
                match self.frames.get_mut(frame.0).and_then(|f| f.bindings.get_mut(index)) {
                    Some(slot) => {
                        slot.value = value;
                        true
                    }
                    None => false,
                }
            }
        }
    }

    /// Bind `name` in the root frame, replacing an existing root binding
    pub fn define_global(&mut self, name: &str, value: Value) {
        let name = Symbol::intern(name);
        let slot = match self.find_binding(FrameId::ROOT, name, false, false) {
            Some(found) => found,
            None => self.add_binding(FrameId::ROOT, true, name),
        };
        self.write(&slot, value);
    }

    /// The bindings of one frame, in insertion order. A popped frame has none.
    pub fn bindings(&self, frame: FrameId) -> &[EnvBinding] {
        self.frames.get(frame.0).map_or(&[][..], |f| f.bindings.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Number;
    use crate::value::Payload;

    fn env() -> Environment {
        Environment::new(init_builtins())
    }

    fn int(n: i64) -> Value {
        Value::number(Number::Int(n))
    }

    #[test]
    fn test_system_table_contents() {
        let system = init_builtins();
        for name in ["+", "-", "*", "/", "if", "eval", "int", "int16", "float64"] {
            assert!(system.contains(name), "missing {name}");
        }
        assert!(!system.contains("let"));
    }

    #[test]
    fn test_popped_frames_read_as_empty() {
        let mut env = env();
        let child = env.push_frame(FrameId::ROOT);
        let slot = env.add_binding(child, false, Symbol::intern("t"));
        env.write(&slot, int(1));
        env.pop_to(child);

        assert!(env.bindings(child).is_empty());
        assert_eq!(env.find_binding(child, Symbol::intern("t"), true, false), None);
        assert_eq!(env.outermost(child), child);
        assert_eq!(env.value(&slot), None);
        assert!(!env.write(&slot, int(2)));
    }

    #[test]
    fn test_missing_name_is_not_found() {
        let env = env();
        assert_eq!(
            env.find_binding(FrameId::ROOT, Symbol::intern("nope"), true, true),
            None
        );
    }

    #[test]
    fn test_add_then_write() {
        let mut env = env();
        let name = Symbol::intern("a");
        let slot = env.add_binding(FrameId::ROOT, false, name);
        assert!(env.write(&slot, int(1)));
        assert_eq!(env.lookup(FrameId::ROOT, "a"), Some(&int(1)));
    }

    #[test]
    fn test_inner_frame_shadows_outer() {
        let mut env = env();
        env.define_global("x", int(1));
        let child = env.push_frame(FrameId::ROOT);
        let slot = env.add_binding(child, false, Symbol::intern("x"));
        env.write(&slot, int(2));

        assert_eq!(env.lookup(child, "x"), Some(&int(2)));
        assert_eq!(env.lookup(FrameId::ROOT, "x"), Some(&int(1)));
    }

    #[test]
    fn test_non_recursive_lookup_stays_in_frame() {
        let mut env = env();
        env.define_global("x", int(1));
        let child = env.push_frame(FrameId::ROOT);
        let name = Symbol::intern("x");
        assert_eq!(env.find_binding(child, name, false, false), None);
        assert!(env.find_binding(child, name, true, false).is_some());
    }

    #[test]
    fn test_system_is_checked_first() {
        let mut env = env();
        env.define_global("+", int(5));
        let found = env.find_binding(FrameId::ROOT, Symbol::intern("+"), true, true);
        assert_eq!(found, Some(BindingRef::System(Symbol::intern("+"))));
        let found = env.find_binding(FrameId::ROOT, Symbol::intern("+"), true, false);
        assert!(matches!(found, Some(BindingRef::Frame { .. })));
    }

    #[test]
    fn test_system_slots_are_read_only() {
        let mut env = env();
        let slot = BindingRef::System(Symbol::intern("+"));
        assert!(!env.write(&slot, int(1)));
        assert!(matches!(
            env.lookup(FrameId::ROOT, "+").map(|v| &v.payload),
            Some(Payload::Function(_))
        ));
    }

    #[test]
    fn test_global_add_goes_to_outermost() {
        let mut env = env();
        let a = env.push_frame(FrameId::ROOT);
        let b = env.push_frame(a);
        assert_eq!(env.outermost(b), FrameId::ROOT);

        let slot = env.add_binding(b, true, Symbol::intern("g"));
        env.write(&slot, int(9));
        assert_eq!(env.bindings(FrameId::ROOT).len(), 1);
        assert!(env.bindings(b).is_empty());
    }

    #[test]
    fn test_pop_to_truncates_frames() {
        let mut env = env();
        let a = env.push_frame(FrameId::ROOT);
        env.push_frame(a);
        assert_eq!(env.depth(), 3);
        env.pop_to(a);
        assert_eq!(env.depth(), 1);
        env.pop_to(FrameId::ROOT);
        assert_eq!(env.depth(), 1);
    }

    #[test]
    fn test_define_global_replaces() {
        let mut env = env();
        env.define_global("x", int(1));
        env.define_global("x", int(2));
        assert_eq!(env.bindings(FrameId::ROOT).len(), 1);
        assert_eq!(env.lookup(FrameId::ROOT, "x"), Some(&int(2)));
    }
}
