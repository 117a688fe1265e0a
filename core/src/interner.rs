//! Interned identifier names.
//!
//! Binding names, type tags and system table keys are compared far more often
//! than they are printed, so they are stored as interned symbols.

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

type Names = StringInterner<DefaultBackend>;

static NAMES: Lazy<RwLock<Names>> = Lazy::new(|| RwLock::new(Names::default()));

// A panic while holding the lock cannot leave the table half-written, so a
// poisoned lock is still safe to use.
fn names() -> RwLockReadGuard<'static, Names> {
    NAMES.read().unwrap_or_else(PoisonError::into_inner)
}

fn names_mut() -> RwLockWriteGuard<'static, Names> {
    NAMES.write().unwrap_or_else(PoisonError::into_inner)
}

/// Identifier handle. Equal text always yields an equal `Symbol`, for the
/// life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(DefaultSymbol);

impl Symbol {
    pub fn intern(name: &str) -> Self {
        Symbol(names_mut().get_or_intern(name))
    }

    /// The name as an owned `String`.
    pub fn resolve(&self) -> String {
        self.with_str(str::to_string)
    }

    /// Borrow the name for the duration of `f`.
    pub fn with_str<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        // Only `intern` mints symbols, so the lookup always hits
        f(names().resolve(self.0).unwrap_or_default())
    }

    pub fn is(&self, name: &str) -> bool {
        self.with_str(|s| s == name)
    }
}

impl From<&str> for Symbol {
    fn from(name: &str) -> Self {
        Symbol::intern(name)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_str(|s| f.write_str(s))
    }
}
