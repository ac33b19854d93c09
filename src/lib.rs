#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use std::{
    error::Error,
    fmt::{self, Display},
};

use facet_core::{Def, Facet, Shape, Type, UserType};
use facet_reflect::{Partial, ReflectError};

mod fields;
mod indirect;
mod methods;
mod options;
mod scalar;
mod set;

pub use facet_reflect::Peek;
pub use fields::{FieldDescriptor, deep_fields};
pub use indirect::{indirect, indirect_type};
pub use methods::{Methods, ScanError};
pub use options::{CopyFlag, CopyOptions, DEFAULT_MAX_DEPTH};
pub use set::try_set;

use fields::{field_at, find_field};
use indirect::{Slot, is_struct, pointee, slot};
use scalar::{is_nil, is_zero};
use set::{Write, begin_pointee, clone_into, fresh, keep};

/// Error type for copies.
#[derive(Debug, Clone)]
pub struct CopyError {
    kind: CopyErrorKind,
    path: Vec<&'static str>,
}

impl CopyError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &CopyErrorKind {
        &self.kind
    }

    /// Field names leading from the top-level destination to where the copy
    /// failed. Empty if it failed at the top level.
    pub fn path(&self) -> &[&'static str] {
        &self.path
    }

    fn at(mut self, field: &'static str) -> Self {
        self.path.insert(0, field);
        self
    }
}

impl Display for CopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")?;
        if !self.path.is_empty() {
            write!(f, " at `{}`", self.path.join("."))?;
        }
        Ok(())
    }
}

impl Error for CopyError {}

impl<K: Into<CopyErrorKind>> From<K> for CopyError {
    fn from(value: K) -> Self {
        let kind = value.into();
        CopyError {
            kind,
            path: Vec::new(),
        }
    }
}

/// Detailed classification of copy errors.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CopyErrorKind {
    /// The destination does not resolve to storage that can be written in
    /// place: a `None`, an existing `Rc`/`Arc`, or a reference.
    UnaddressableDestination,
    /// Nested structs went deeper than [`CopyOptions::max_depth`] allows.
    DepthLimitExceeded {
        /// The configured limit.
        limit: usize,
    },
    /// A value the copy leaves alone had to be carried into the rebuilt
    /// destination, but its type does not implement `Clone`.
    NotClone {
        /// Shape of the value.
        shape: &'static Shape,
    },
    /// A slot that didn't exist before (a new list element, a newly allocated
    /// pointee) has no `Default` to start from.
    MissingDefault {
        /// Shape of the slot.
        shape: &'static Shape,
    },
    /// Error from the reflection layer.
    Reflect(ReflectError),
}

impl Display for CopyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyErrorKind::UnaddressableDestination => {
                write!(f, "destination is not addressable")
            }
            CopyErrorKind::DepthLimitExceeded { limit } => {
                write!(f, "nested copy went deeper than {limit} levels")
            }
            CopyErrorKind::NotClone { shape } => write!(f, "{shape} does not implement Clone"),
            CopyErrorKind::MissingDefault { shape } => write!(f, "{shape} has no default value"),
            CopyErrorKind::Reflect(err) => write!(f, "{err}"),
        }
    }
}

impl From<ReflectError> for CopyErrorKind {
    fn from(value: ReflectError) -> Self {
        Self::Reflect(value)
    }
}

type Result<T> = std::result::Result<T, CopyError>;

struct Copier<'o> {
    options: &'o CopyOptions,
}

/// A planned write into a destination field.
struct Entry<'p> {
    /// Field indices from the struct the plan was made for.
    path: &'p [usize],
    name: &'static str,
    /// Whether the source was nil or zero. Such writes never allocate an
    /// embedded pointer.
    zero: bool,
    write: Write<'p>,
}

/// A planned setter call on the struct at `owner`.
struct SetterCall<'p> {
    owner: Vec<usize>,
    name: &'static str,
    arg: Peek<'p, 'static>,
}

impl Copier<'_> {
    /// Builds `partial` from its previous value `old` (`None` for a slot that
    /// didn't exist before) with `from` copied in.
    fn copy_value(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        from: Peek<'_, 'static>,
        depth: usize,
    ) -> Result<()> {
        let shape = partial.shape();
        log::trace!("Copying {} into {shape} at depth {depth}", from.shape());

        let limit = self.options.depth_limit();
        if depth > limit {
            return Err(CopyErrorKind::DepthLimitExceeded { limit }.into());
        }

        match (slot(shape), old) {
            (Slot::Value, _) => {}
            (Slot::Option(_) | Slot::Boxed(_), Some(current)) => {
                let Some(current) = pointee(current) else {
                    log::trace!("{shape} is None, there is nothing to write into");
                    return Err(CopyErrorKind::UnaddressableDestination.into());
                };
                begin_pointee(partial)?;
                self.copy_value(partial, Some(current), from, depth)?;
                partial.end()?;
                return Ok(());
            }
            (Slot::Option(_) | Slot::Boxed(_) | Slot::Shared(_), None) => {
                begin_pointee(partial)?;
                self.copy_value(partial, None, from, depth)?;
                partial.end()?;
                return Ok(());
            }
            (Slot::Shared(_) | Slot::ReadOnly, _) => {
                log::trace!("{shape} can't be written through");
                return Err(CopyErrorKind::UnaddressableDestination.into());
            }
        }

        let Some(from) = indirect(from) else {
            log::trace!("Source is nil, nothing to copy");
            return keep(partial, old);
        };

        if shape == from.shape() {
            log::trace!("Cloning {shape} whole");
            return clone_into(partial, from);
        }

        if !is_struct(indirect_type(shape)) || !is_struct(indirect_type(from.shape())) {
            log::trace!(
                "Skipping {} into {shape}: not a struct on both sides",
                from.shape()
            );
            return keep(partial, old);
        }

        if let Def::List(_) = shape.def {
            return self.copy_elements(partial, old, from, depth);
        }

        self.copy_struct(partial, old, from, depth)
    }

    /// Keeps the old elements and appends one mapped element per source
    /// element, or a single one for a non-list source.
    fn copy_elements(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        from: Peek<'_, 'static>,
        depth: usize,
    ) -> Result<()> {
        let sources: Vec<_> = match from.into_list() {
            Ok(list) => list.iter().map(indirect).collect(),
            Err(_) => vec![Some(from)],
        };
        log::trace!("Mapping {} element(s) from {}", sources.len(), from.shape());

        if let Some(old) = old {
            clone_into(partial, old)?;
        }
        partial.begin_list()?;
        for source in sources {
            partial.begin_list_item()?;
            match source {
                Some(source) => self.copy_value(partial, None, source, depth + 1)?,
                None => fresh(partial)?,
            }
            partial.end()?;
        }
        Ok(())
    }

    fn copy_struct(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        from: Peek<'_, 'static>,
        depth: usize,
    ) -> Result<()> {
        let shape = partial.shape();
        let to_fields = deep_fields(shape);
        let from_fields = deep_fields(from.shape());
        let methods = self.options.registered();

        let produced: Vec<_> = to_fields
            .iter()
            .filter_map(|field| Some((field, methods.call_getter(from, field.name)?)))
            .collect();

        let mut entries = Vec::new();
        let mut setters = Vec::new();

        // Source fields into destination fields, or same-named setters.
        for field in &from_fields {
            let Some(value) = field_at(from, &field.path) else {
                log::trace!("Source field {} is behind a nil embedding", field.name);
                continue;
            };

            let Some(target) = find_field(&to_fields, field.name) else {
                match methods.find_setter(shape, field.name, value.shape()) {
                    Some(owner) => setters.push(SetterCall {
                        owner,
                        name: field.name,
                        arg: value,
                    }),
                    None => log::trace!("No destination field or setter for {}", field.name),
                }
                continue;
            };

            match self.field_write(target.shape, value) {
                Some(write) => entries.push(Entry {
                    path: &target.path,
                    name: target.name,
                    zero: is_nil(value) || is_zero(value),
                    write,
                }),
                None => log::trace!(
                    "Field {} of type {} does not fit {}",
                    field.name,
                    value.shape(),
                    target.shape
                ),
            }
        }

        // Source getters into destination fields.
        for (field, value) in &produced {
            let value = value.peek();
            match self.assignment(field.shape, value) {
                Some(write) => entries.push(Entry {
                    path: &field.path,
                    name: field.name,
                    zero: is_nil(value) || is_zero(value),
                    write,
                }),
                None => log::trace!(
                    "Getter {} returned {}, which does not fit the field",
                    field.name,
                    value.shape()
                ),
            }
        }

        let entries: Vec<_> = entries
            .iter()
            .filter(|entry| !matches!(entry.write, Write::Keep))
            .collect();
        let setters: Vec<_> = setters.iter().collect();
        self.build(partial, old, &entries, &setters, 0, depth)
    }

    /// Builds the struct in `partial` from `old`, with `entries` written and
    /// then `setters` called. `level` counts the flattened members between
    /// this struct and the one the plan was made for.
    fn build(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        entries: &[&Entry<'_>],
        setters: &[&SetterCall<'_>],
        level: usize,
        depth: usize,
    ) -> Result<()> {
        let shape = partial.shape();
        let (own, below): (Vec<_>, Vec<_>) = setters
            .iter()
            .copied()
            .partition(|call| call.owner.len() == level);

        let methods = self.options.registered();
        let stage = match methods.stage(shape) {
            Some(stage) if !own.is_empty() => stage,
            _ => return self.build_fields(partial, old, entries, &below, level, depth),
        };

        let mut fill = |staged: &mut Partial<'static>| {
            self.build_fields(staged, old, entries, &below, level, depth)
        };
        let mut call_setters = |value: &mut dyn std::any::Any| {
            for call in &own {
                if methods.call_setter(shape, value, call.name, call.arg) {
                    log::trace!("Called setter {shape}::{} with {}", call.name, call.arg.shape());
                }
            }
        };
        stage(partial, &mut fill, &mut call_setters)
    }

    fn build_fields(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        entries: &[&Entry<'_>],
        setters: &[&SetterCall<'_>],
        level: usize,
        depth: usize,
    ) -> Result<()> {
        let Type::User(UserType::Struct(st)) = partial.shape().ty else {
            return keep(partial, old);
        };
        let old = old.and_then(|old| old.into_struct().ok());

        for index in 0..st.fields.len() {
            let old_field = old.as_ref().and_then(|old| old.field(index).ok());
            let under = |path: &[usize]| path.get(level) == Some(&index);

            partial.begin_nth_field(index)?;

            // The last write wins: getters come after fields.
            let direct = entries
                .iter()
                .rev()
                .find(|entry| entry.path.len() == level + 1 && under(entry.path));
            if let Some(entry) = direct {
                log::trace!("Writing field {}", entry.name);
                self.write(partial, old_field, &entry.write, depth)
                    .map_err(|err| err.at(entry.name))?;
            } else {
                let nested: Vec<_> = entries
                    .iter()
                    .copied()
                    .filter(|entry| entry.path.len() > level + 1 && under(entry.path))
                    .collect();
                let calls: Vec<_> = setters
                    .iter()
                    .copied()
                    .filter(|call| under(&call.owner))
                    .collect();

                let name = st.fields[index].name;
                if nested.is_empty() && calls.is_empty() {
                    keep(partial, old_field).map_err(|err| err.at(name))?;
                } else {
                    self.build_embedded(partial, old_field, &nested, &calls, level + 1, depth)?;
                }
            }

            partial.end()?;
        }
        Ok(())
    }

    /// Builds a flattened member. Its pointer is only allocated if some entry
    /// below it writes a value that isn't nil or zero.
    fn build_embedded(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        entries: &[&Entry<'_>],
        setters: &[&SetterCall<'_>],
        level: usize,
        depth: usize,
    ) -> Result<()> {
        let shape = partial.shape();
        match slot(shape) {
            Slot::Value => self.build(partial, old, entries, setters, level, depth),
            Slot::ReadOnly => keep(partial, old),
            Slot::Shared(_) if old.is_some() => {
                log::trace!("Embedded {shape} may be shared, leaving it alone");
                keep(partial, old)
            }
            Slot::Option(_) | Slot::Boxed(_) | Slot::Shared(_) => {
                let current = old.and_then(pointee);
                let entries: Vec<_> = match current {
                    Some(_) => entries.to_vec(),
                    None => entries.iter().copied().filter(|entry| !entry.zero).collect(),
                };
                if current.is_none() && entries.is_empty() {
                    log::trace!("Nothing to write into nil embedded {shape}");
                    return keep(partial, old);
                }

                begin_pointee(partial)?;
                self.build_embedded(partial, current, &entries, setters, level, depth)?;
                partial.end()?;
                Ok(())
            }
        }
    }
}

/// Rebuilds `to` with `build`, which gets a fresh frame and the old value.
/// `to` is only replaced if the build succeeds.
fn rebuild<T: Facet<'static>>(
    to: &mut T,
    build: impl FnOnce(&mut Partial<'static>, Peek<'_, 'static>) -> Result<()>,
) -> Result<()> {
    let mut staged = Partial::alloc::<T>()?;
    build(staged.inner_mut(), Peek::new(&*to))?;
    *to = *staged.build()?;
    Ok(())
}

/// Copies `from` into `to`, field by field, using default [`CopyOptions`].
///
/// Both sides are matched by field name, with `#[facet(flatten)]` fields
/// spliced into their parent. Same-typed values are cloned whole; scalars
/// convert numerically; nested structs are copied recursively; a `Vec`
/// destination receives one mapped element per source element. Fields with no
/// counterpart are left as they were.
///
/// `to` is rebuilt and replaced, so values the copy leaves alone must be
/// `Clone`. On error, `to` is left as it was.
///
/// # Errors
///
/// Fails with [`CopyErrorKind::UnaddressableDestination`] if `to` does not
/// resolve to writable storage, and with
/// [`CopyErrorKind::DepthLimitExceeded`] if nested structs go too deep.
/// Fields that simply don't fit are not errors.
///
/// # Example
/// ```
/// use facet::Facet;
///
/// #[derive(Facet)]
/// struct Row {
///     id: i64,
///     name: String,
/// }
///
/// #[derive(Facet, Clone, Default, Debug, PartialEq)]
/// struct Dto {
///     id: u32,
///     name: String,
///     note: Option<String>,
/// }
///
/// # fn main() -> Result<(), copier::CopyError> {
/// let mut dto = Dto::default();
/// copier::copy(&mut dto, &Row { id: 7, name: "ann".into() })?;
/// assert_eq!(dto, Dto { id: 7, name: "ann".into(), note: None });
/// # Ok(())
/// # }
/// ```
pub fn copy<T, S>(to: &mut T, from: &S) -> Result<()>
where
    T: Facet<'static>,
    S: Facet<'static> + ?Sized,
{
    copy_with(to, from, &CopyOptions::default())
}

/// Like [`copy`], with explicit options.
pub fn copy_with<T, S>(to: &mut T, from: &S, options: &CopyOptions) -> Result<()>
where
    T: Facet<'static>,
    S: Facet<'static> + ?Sized,
{
    log::trace!("Entering `copy_with` function");

    let copier = Copier { options };
    let from = Peek::new(from);
    rebuild(to, |partial, old| copier.copy_value(partial, Some(old), from, 0))
}
