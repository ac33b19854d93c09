//! Per-call configuration.

use std::sync::Arc;

use crate::methods::Methods;

static NO_METHODS: Methods = Methods::new();

/// Nesting depth a copy may reach before it fails.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Behavior switches, for building [`CopyOptions`] from a list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CopyFlag {
    /// Never fall back to a destination type's registered scanner.
    DisableScan,
}

/// Options for [`copy_with`](crate::copy_with).
///
/// ```
/// use copier::{CopyFlag, CopyOptions};
///
/// let a = CopyOptions::new().disable_scan(true);
/// let b: CopyOptions = [CopyFlag::DisableScan].into_iter().collect();
/// assert_eq!(a, b);
/// ```
///
/// Two options are equal if their flags are, and they share the same
/// [`Methods`] (or both have none).
#[derive(Clone, Debug)]
pub struct CopyOptions {
    disable_scan: bool,
    max_depth: usize,
    methods: Option<Arc<Methods>>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            disable_scan: false,
            max_depth: DEFAULT_MAX_DEPTH,
            methods: None,
        }
    }
}

impl PartialEq for CopyOptions {
    fn eq(&self, other: &Self) -> bool {
        let same_methods = match (&self.methods, &other.methods) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.disable_scan == other.disable_scan && self.max_depth == other.max_depth && same_methods
    }
}

impl Eq for CopyOptions {}

impl CopyOptions {
    /// Default options: scanning enabled, depth limited to
    /// [`DEFAULT_MAX_DEPTH`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds options from flags. Unlisted behaviors keep their default.
    pub fn from_flags(flags: &[CopyFlag]) -> Self {
        flags.iter().copied().collect()
    }

    /// Skip the scan fallback when a field can't be assigned or converted.
    pub fn disable_scan(mut self, disable: bool) -> Self {
        self.disable_scan = disable;
        self
    }

    /// Fail with [`CopyErrorKind::DepthLimitExceeded`](crate::CopyErrorKind)
    /// once nested structs go deeper than `depth`.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Getters, setters and scanners for copies to call.
    pub fn methods(mut self, methods: impl Into<Arc<Methods>>) -> Self {
        self.methods = Some(methods.into());
        self
    }

    /// Whether the scan fallback is off.
    pub fn scan_disabled(&self) -> bool {
        self.disable_scan
    }

    /// Deepest nesting allowed.
    pub fn depth_limit(&self) -> usize {
        self.max_depth
    }

    pub(crate) fn registered(&self) -> &Methods {
        self.methods.as_deref().unwrap_or(&NO_METHODS)
    }

    fn apply(&mut self, flag: CopyFlag) {
        match flag {
            CopyFlag::DisableScan => self.disable_scan = true,
        }
    }
}

impl FromIterator<CopyFlag> for CopyOptions {
    fn from_iter<I: IntoIterator<Item = CopyFlag>>(iter: I) -> Self {
        let mut options = Self::default();
        for flag in iter {
            options.apply(flag);
        }
        options
    }
}
