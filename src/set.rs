//! Assigning one value into a slot of a possibly different type.
//!
//! Copies are planned before anything is written: `Copier::assignment`
//! decides what lands in a slot, and `Copier::write` builds the slot from
//! that decision.

use facet_core::{Characteristic, Facet, Shape, Type, UserType};
use facet_reflect::{Partial, Peek, ReflectError};

use crate::{
    Copier, CopyErrorKind, Entry, Result,
    fields::FieldDescriptor,
    indirect::{Slot, deref_once, indirect_type, is_struct, pointee, slot},
    options::CopyOptions,
    scalar::{Scalar, is_nil, is_zero},
};

/// What a source value does to a destination slot.
pub(crate) enum Write<'mem> {
    /// The slot keeps what it had.
    Keep,
    /// The slot gets a clone of a value of its own shape.
    Clone(Peek<'mem, 'static>),
    /// The slot gets a scalar, converted to its type.
    Convert(Scalar),
    /// The slot type's registered scanner decodes the value.
    Scan(Peek<'mem, 'static>),
    /// The slot is an `Option` or `Box`, and the write goes to its pointee.
    Through(Box<Write<'mem>>),
    /// The slot gets a field-by-field copy of a struct, or of a list of them.
    Nested(Peek<'mem, 'static>),
}

impl Copier<'_> {
    /// Runs the assignment ladder from `from` into a slot of shape `to`.
    ///
    /// A nil or zero source never clobbers a pointer slot. Otherwise the value
    /// is cloned if the shapes match, then converted, then scanned, and then
    /// retried with the pointee if the source is a pointer.
    ///
    /// `None` if there is no way to make `from` fit; a caller may then try a
    /// structural copy instead.
    pub(crate) fn assignment<'mem>(
        &self,
        to: &'static Shape,
        from: Peek<'mem, 'static>,
    ) -> Option<Write<'mem>> {
        match slot(to) {
            Slot::Value => {}
            Slot::Option(inner) | Slot::Boxed(inner) => {
                if is_nil(from) || is_zero(from) {
                    log::trace!("Leaving {to} alone for nil or zero {}", from.shape());
                    return Some(Write::Keep);
                }
                return match self.assignment(inner, from)? {
                    Write::Keep => Some(Write::Keep),
                    write => Some(Write::Through(Box::new(write))),
                };
            }
            Slot::Shared(_) | Slot::ReadOnly => {
                if is_nil(from) || is_zero(from) {
                    return Some(Write::Keep);
                }
                return (to == from.shape()).then_some(Write::Clone(from));
            }
        }

        if to == from.shape() {
            return Some(Write::Clone(from));
        }

        if let Some(scalar) = Scalar::read(from).filter(|scalar| scalar.converts_to(to)) {
            return Some(Write::Convert(scalar));
        }

        if !self.options.scan_disabled() && self.options.registered().scanner_of(to).is_some() {
            return Some(Write::Scan(from));
        }

        match deref_once(from)? {
            Some(pointee) => self.assignment(to, pointee),
            None => Some(Write::Keep),
        }
    }

    /// Like `assignment`, falling back to a nested copy when both
    /// sides are structs, or lists of them.
    pub(crate) fn field_write<'mem>(
        &self,
        to: &'static Shape,
        from: Peek<'mem, 'static>,
    ) -> Option<Write<'mem>> {
        if let Some(write) = self.assignment(to, from) {
            return Some(write);
        }
        if is_struct(indirect_type(to)) && is_struct(indirect_type(from.shape())) {
            return Some(nested(to, from));
        }
        None
    }

    /// Builds the slot in `partial` from its previous value `old` (`None` for a
    /// slot that didn't exist before) and `write`.
    pub(crate) fn write(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        write: &Write<'_>,
        depth: usize,
    ) -> Result<()> {
        match write {
            Write::Keep => keep(partial, old),
            Write::Clone(value) => clone_into(partial, *value),
            Write::Convert(scalar) => Ok(scalar.write(partial)?),
            Write::Scan(from) => self.scan(partial, old, *from),
            Write::Through(inner) => {
                begin_pointee(partial)?;
                self.write(partial, old.and_then(pointee), inner, depth)?;
                partial.end()?;
                Ok(())
            }
            Write::Nested(from) => self.copy_value(partial, old, *from, depth + 1),
        }
    }

    fn scan(
        &self,
        partial: &mut Partial<'static>,
        old: Option<Peek<'_, 'static>>,
        from: Peek<'_, 'static>,
    ) -> Result<()> {
        let shape = partial.shape();
        let methods = self.options.registered();
        let (Some(scan), Some(stage)) = (methods.scanner_of(shape), methods.stage(shape)) else {
            return keep(partial, old);
        };

        stage(partial, &mut |staged| keep(staged, old), &mut |value| {
            if let Err(err) = scan(value, from) {
                log::debug!("Scanning {} into {shape} failed: {err}", from.shape());
            }
        })
    }
}

/// A nested copy into `to`, allocating the pointee of every `Option` or `Box`
/// on the way.
fn nested<'mem>(to: &'static Shape, from: Peek<'mem, 'static>) -> Write<'mem> {
    match slot(to) {
        Slot::Option(inner) | Slot::Boxed(inner) => Write::Through(Box::new(nested(inner, from))),
        _ => Write::Nested(from),
    }
}

/// Moves `partial` into the pointee of the `Option` or smart pointer it is
/// building.
pub(crate) fn begin_pointee(
    partial: &mut Partial<'static>,
) -> std::result::Result<(), ReflectError> {
    match slot(partial.shape()) {
        Slot::Option(_) => partial.begin_some()?,
        _ => partial.begin_smart_ptr()?,
    };
    Ok(())
}

/// Builds the slot as it was, or as a fresh value if it didn't exist.
pub(crate) fn keep(partial: &mut Partial<'static>, old: Option<Peek<'_, 'static>>) -> Result<()> {
    match old {
        Some(old) => clone_into(partial, old),
        None => fresh(partial),
    }
}

pub(crate) fn clone_into(partial: &mut Partial<'static>, value: Peek<'_, 'static>) -> Result<()> {
    let shape = value.shape();
    if partial.shape() != shape {
        return Err(ReflectError::WrongShape {
            expected: partial.shape(),
            actual: shape,
        }
        .into());
    }
    let (Some(clone_fn), Some(src)) = (
        shape.vtable.sized().and_then(|v| (v.clone_into)()),
        value.data().thin(),
    ) else {
        return Err(CopyErrorKind::NotClone { shape }.into());
    };

    // SAFETY: `src` points at an initialized value of `shape`, the shape of
    // the frame, and `clone_fn` comes from that shape's vtable. It fully
    // initializes the frame.
    unsafe {
        partial.set_from_function(move |dst| {
            clone_fn(src, dst);
            Ok(())
        })?;
    }
    Ok(())
}

/// Builds a value for a slot that didn't exist before: the type's `Default`,
/// or for a struct without one, its fields' defaults.
pub(crate) fn fresh(partial: &mut Partial<'static>) -> Result<()> {
    let shape = partial.shape();
    if shape.is(Characteristic::Default) {
        partial.set_default()?;
        return Ok(());
    }

    let Type::User(UserType::Struct(st)) = shape.ty else {
        return Err(CopyErrorKind::MissingDefault { shape }.into());
    };
    for (index, field) in st.fields.iter().enumerate() {
        if field.vtable.default_fn.is_some() || field.shape().is(Characteristic::Default) {
            partial.begin_nth_field(index)?;
            match field.vtable.default_fn {
                Some(default_fn) => partial.set_field_default(default_fn)?,
                None => partial.set_default()?,
            };
            partial.end()?;
        } else {
            partial.begin_nth_field(index)?;
            fresh(partial)?;
            partial.end()?;
        }
    }
    Ok(())
}

/// Runs the assignment ladder from `value` into the field `field` of `to`.
///
/// Returns `Ok(false)` if `value` doesn't fit the field, and `Ok(true)` if it
/// was written or deliberately left alone (a nil or zero value never clobbers
/// an `Option` field). `to` is left as it was on error.
///
/// ```
/// use facet::Facet;
///
/// #[derive(Facet, Clone, Debug, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// # fn main() -> Result<(), copier::CopyError> {
/// let mut point = Point { x: 1, y: 2 };
/// let fields = copier::deep_fields(Point::SHAPE);
/// let options = copier::CopyOptions::new();
///
/// assert!(copier::try_set(&mut point, &fields[1], &9u8, &options)?);
/// assert!(!copier::try_set(&mut point, &fields[0], &"nine", &options)?);
/// assert_eq!(point, Point { x: 1, y: 9 });
/// # Ok(())
/// # }
/// ```
pub fn try_set<T, V>(
    to: &mut T,
    field: &FieldDescriptor,
    value: &V,
    options: &CopyOptions,
) -> Result<bool>
where
    T: Facet<'static>,
    V: Facet<'static> + ?Sized,
{
    log::trace!("Entering `try_set` function");

    let copier = Copier { options };
    let value = Peek::new(value);
    let Some(write) = copier.assignment(field.shape, value) else {
        return Ok(false);
    };
    if let Write::Keep = write {
        return Ok(true);
    }

    let entry = Entry {
        path: &field.path,
        name: field.name,
        zero: is_nil(value) || is_zero(value),
        write,
    };
    crate::rebuild(to, |partial, old| {
        copier.build(partial, Some(old), &[&entry], &[], 0, 0)
    })?;
    Ok(true)
}
