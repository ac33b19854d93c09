//! Getters, setters and scanners registered per type, promoted through
//! flattened members.

use std::{any::Any, error::Error, fmt};

use facet_core::{Facet, Shape, Type, UserType};
use facet_reflect::{Partial, Peek};

use crate::{Result, fields::embedded_struct, indirect::indirect};

/// Error a scanner reports. Scan errors are logged and otherwise ignored.
pub type ScanError = Box<dyn Error + Send + Sync>;

type GetterFn = dyn Fn(Peek<'_, 'static>) -> Option<Box<dyn Produced>> + Send + Sync;
type SetterFn = dyn Fn(&mut dyn Any, Peek<'_, 'static>) -> bool + Send + Sync;
pub(crate) type ScanFn =
    dyn Fn(&mut dyn Any, Peek<'_, 'static>) -> std::result::Result<(), ScanError> + Send + Sync;

/// Builds a value of one registered type into a frame: `fill` initializes a
/// staged value, `then` gets it as `&mut T`, and the result is set on the
/// frame.
pub(crate) type StageFn = fn(
    &mut Partial<'static>,
    &mut dyn FnMut(&mut Partial<'static>) -> Result<()>,
    &mut dyn FnMut(&mut dyn Any),
) -> Result<()>;

/// A getter's result, kept alive while a copy reads it.
pub(crate) trait Produced {
    fn peek(&self) -> Peek<'_, 'static>;
}

impl<T: Facet<'static>> Produced for T {
    fn peek(&self) -> Peek<'_, 'static> {
        Peek::new(self)
    }
}

/// Methods copies call besides reading and writing fields.
///
/// * A **getter** on a source type fills the destination field of the same
///   name, after all fields were copied.
/// * A **setter** on a destination type receives a source field that has no
///   destination field of the same name, if its argument type is exactly the
///   field's type.
/// * A **scanner** on a destination type decodes a source value that neither
///   clones nor converts into it.
///
/// Getters and setters registered on a type are also found through
/// `#[facet(flatten)]` fields that embed it, outermost first.
///
/// ```
/// use facet::Facet;
/// use copier::{CopyOptions, Methods};
///
/// #[derive(Facet, Clone)]
/// struct Person {
///     first: String,
///     last: String,
/// }
///
/// impl Person {
///     fn full_name(&self) -> String {
///         format!("{} {}", self.first, self.last)
///     }
/// }
///
/// #[derive(Facet, Clone, Default)]
/// struct Card {
///     full_name: String,
/// }
///
/// # fn main() -> Result<(), copier::CopyError> {
/// let methods = Methods::new().getter("full_name", Person::full_name);
/// let options = CopyOptions::new().methods(methods);
/// let person = Person {
///     first: "Ada".into(),
///     last: "Lovelace".into(),
/// };
///
/// let mut card = Card::default();
/// copier::copy_with(&mut card, &person, &options)?;
/// assert_eq!(card.full_name, "Ada Lovelace");
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Methods {
    types: Vec<TypeMethods>,
}

struct TypeMethods {
    shape: &'static Shape,
    stage: StageFn,
    getters: Vec<(&'static str, Box<GetterFn>)>,
    setters: Vec<Setter>,
    scanner: Option<Box<ScanFn>>,
}

struct Setter {
    name: &'static str,
    arg: &'static Shape,
    call: Box<SetterFn>,
}

impl Methods {
    /// No methods.
    pub const fn new() -> Self {
        Self { types: Vec::new() }
    }

    /// Registers `get` as the getter `name` of `T`.
    pub fn getter<T, R>(
        mut self,
        name: &'static str,
        get: impl Fn(&T) -> R + Send + Sync + 'static,
    ) -> Self
    where
        T: Facet<'static> + 'static,
        R: Facet<'static> + 'static,
    {
        let call = move |value: Peek<'_, 'static>| -> Option<Box<dyn Produced>> {
            let value = value.get::<T>().ok()?;
            Some(Box::new(get(value)))
        };
        self.entry::<T>().getters.push((name, Box::new(call)));
        self
    }

    /// Registers `set` as the setter `name` of `T`, taking a `V`.
    pub fn setter<T, V>(
        mut self,
        name: &'static str,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self
    where
        T: Facet<'static> + 'static,
        V: Facet<'static> + Clone,
    {
        let call = move |target: &mut dyn Any, arg: Peek<'_, 'static>| -> bool {
            match (target.downcast_mut::<T>(), arg.get::<V>()) {
                (Some(target), Ok(arg)) => {
                    set(target, arg.clone());
                    true
                }
                _ => false,
            }
        };
        self.entry::<T>().setters.push(Setter {
            name,
            arg: V::SHAPE,
            call: Box::new(call),
        });
        self
    }

    /// Registers `scan` as the scanner of `T`, replacing any earlier one.
    ///
    /// The scanner starts from the destination's previous value, or `T`'s
    /// default for a slot that didn't exist.
    pub fn scanner<T>(
        mut self,
        scan: impl Fn(&mut T, Peek<'_, 'static>) -> std::result::Result<(), ScanError>
        + Send
        + Sync
        + 'static,
    ) -> Self
    where
        T: Facet<'static> + 'static,
    {
        let call = move |target: &mut dyn Any, src: Peek<'_, 'static>| {
            match target.downcast_mut::<T>() {
                Some(target) => scan(target, src),
                None => Err("scanner called on a value of another type".into()),
            }
        };
        self.entry::<T>().scanner = Some(Box::new(call));
        self
    }

    fn entry<T: Facet<'static> + 'static>(&mut self) -> &mut TypeMethods {
        let index = match self.types.iter().position(|t| t.shape == T::SHAPE) {
            Some(index) => index,
            None => {
                self.types.push(TypeMethods {
                    shape: T::SHAPE,
                    stage: stage::<T>,
                    getters: Vec::new(),
                    setters: Vec::new(),
                    scanner: None,
                });
                self.types.len() - 1
            }
        };
        &mut self.types[index]
    }

    fn of(&self, shape: &'static Shape) -> Option<&TypeMethods> {
        self.types.iter().find(|t| t.shape == shape)
    }

    pub(crate) fn stage(&self, shape: &'static Shape) -> Option<StageFn> {
        self.of(shape).map(|t| t.stage)
    }

    pub(crate) fn scanner_of(&self, shape: &'static Shape) -> Option<&ScanFn> {
        self.of(shape)?.scanner.as_deref()
    }

    /// Calls the getter `name` on `value` or, failing that, on one of its
    /// flattened members, outermost first.
    pub(crate) fn call_getter(
        &self,
        value: Peek<'_, 'static>,
        name: &str,
    ) -> Option<Box<dyn Produced>> {
        let own = self
            .of(value.shape())
            .and_then(|t| t.getters.iter().find(|(getter, _)| *getter == name));
        if let Some(result) = own.and_then(|(_, get)| get(value)) {
            log::trace!("Called getter {}::{name}", value.shape());
            return Some(result);
        }

        let st = value.into_struct().ok()?;
        st.ty()
            .fields
            .iter()
            .enumerate()
            .filter(|(_, field)| embedded_struct(field).is_some())
            .find_map(|(index, _)| self.call_getter(indirect(st.field(index).ok()?)?, name))
    }

    /// Finds the setter `name` taking an `arg` on `shape` or, failing that, on
    /// one of its flattened members, outermost first. Returns the field path to
    /// the struct that has it.
    pub(crate) fn find_setter(
        &self,
        shape: &'static Shape,
        name: &str,
        arg: &'static Shape,
    ) -> Option<Vec<usize>> {
        if self.setter_of(shape, name, arg).is_some() {
            return Some(Vec::new());
        }
        let Type::User(UserType::Struct(st)) = shape.ty else {
            return None;
        };
        st.fields.iter().enumerate().find_map(|(index, field)| {
            let mut path = self.find_setter(embedded_struct(field)?, name, arg)?;
            path.insert(0, index);
            Some(path)
        })
    }

    /// Calls the setter `name` of `shape` on `target`, which must be a value of
    /// that shape. Returns whether a setter took the argument.
    pub(crate) fn call_setter(
        &self,
        shape: &'static Shape,
        target: &mut dyn Any,
        name: &str,
        arg: Peek<'_, 'static>,
    ) -> bool {
        self.setter_of(shape, name, arg.shape())
            .is_some_and(|setter| (setter.call)(target, arg))
    }

    fn setter_of(&self, shape: &'static Shape, name: &str, arg: &'static Shape) -> Option<&Setter> {
        self.of(shape)?
            .setters
            .iter()
            .find(|setter| setter.name == name && setter.arg == arg)
    }
}

impl fmt::Debug for Methods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for t in &self.types {
            list.entry(&format_args!(
                "{}: {} getter(s), {} setter(s){}",
                t.shape,
                t.getters.len(),
                t.setters.len(),
                if t.scanner.is_some() { ", scanner" } else { "" }
            ));
        }
        list.finish()
    }
}

fn stage<T: Facet<'static> + 'static>(
    partial: &mut Partial<'static>,
    fill: &mut dyn FnMut(&mut Partial<'static>) -> Result<()>,
    then: &mut dyn FnMut(&mut dyn Any),
) -> Result<()> {
    let mut staged = Partial::alloc::<T>()?;
    fill(staged.inner_mut())?;
    let mut value = *staged.build()?;
    then(&mut value);
    partial.set(value)?;
    Ok(())
}
