//! Stripping pointer and collection wrapping.

use facet_core::{Def, KnownPointer, Shape, Type, UserType};
use facet_reflect::Peek;

/// How a slot holds its value, as far as writing into it goes.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Slot {
    /// An `Option`, rebuilt around its pointee.
    Option(&'static Shape),
    /// A `Box`, rebuilt around its pointee.
    Boxed(&'static Shape),
    /// An `Rc` or `Arc`. A fresh one can be filled, an existing one may be
    /// shared and is never written through.
    Shared(&'static Shape),
    /// A reference or some other pointer that can't be written through.
    ReadOnly,
    /// The value is stored inline.
    Value,
}

pub(crate) fn slot(shape: &'static Shape) -> Slot {
    match shape.def {
        Def::Option(def) => Slot::Option(def.t),
        Def::Pointer(def) => match (def.known, def.pointee()) {
            (Some(KnownPointer::Box), Some(pointee)) => Slot::Boxed(pointee),
            (Some(KnownPointer::Rc | KnownPointer::Arc), Some(pointee)) => Slot::Shared(pointee),
            _ => Slot::ReadOnly,
        },
        _ if matches!(shape.ty, Type::Pointer(_)) => Slot::ReadOnly,
        _ => Slot::Value,
    }
}

/// Follows `Option`s and smart pointers until a plain value. `None` if the
/// chain ends at nil.
///
/// References are not followed.
pub fn indirect<'mem>(value: Peek<'mem, 'static>) -> Option<Peek<'mem, 'static>> {
    match deref_once(value) {
        Some(pointee) => indirect(pointee?),
        None => Some(value),
    }
}

/// One step of [`indirect`]: `Some(pointee)` if `value` is an `Option`, `Box`,
/// `Rc` or `Arc`, `None` if it holds its value inline.
pub(crate) fn deref_once<'mem>(value: Peek<'mem, 'static>) -> Option<Option<Peek<'mem, 'static>>> {
    match slot(value.shape()) {
        Slot::Option(_) => Some(value.into_option().ok().and_then(|option| option.value())),
        Slot::Boxed(_) | Slot::Shared(_) => {
            Some(value.into_pointer().ok().and_then(|ptr| ptr.borrow_inner()))
        }
        Slot::ReadOnly | Slot::Value => None,
    }
}

/// The pointee of a pointer that holds one.
pub(crate) fn pointee<'mem>(value: Peek<'mem, 'static>) -> Option<Peek<'mem, 'static>> {
    deref_once(value).flatten()
}

/// Strips pointer and list wrapping, down to the element shape.
pub fn indirect_type(mut shape: &'static Shape) -> &'static Shape {
    loop {
        shape = match shape.def {
            Def::List(def) => def.t(),
            _ => match deref_step(shape) {
                Some(inner) => inner,
                None => return shape,
            },
        };
    }
}

/// Strips pointer wrapping only.
pub(crate) fn deref_shape(mut shape: &'static Shape) -> &'static Shape {
    while let Some(inner) = deref_step(shape) {
        shape = inner;
    }
    shape
}

fn deref_step(shape: &'static Shape) -> Option<&'static Shape> {
    match slot(shape) {
        Slot::Option(inner) | Slot::Boxed(inner) | Slot::Shared(inner) => Some(inner),
        Slot::ReadOnly | Slot::Value => None,
    }
}

pub(crate) fn is_struct(shape: &'static Shape) -> bool {
    matches!(shape.ty, Type::User(UserType::Struct(_)))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use facet_core::Facet;

    use super::*;

    #[test]
    fn indirect_follows_nested_pointers() {
        let value: Option<Box<i32>> = Some(Box::new(5));
        let inner = indirect(Peek::new(&value)).unwrap();
        assert_eq!(inner.get::<i32>().unwrap(), &5);
    }

    #[test]
    fn indirect_stops_at_nil() {
        let value: Option<Box<i32>> = None;
        assert!(indirect(Peek::new(&value)).is_none());
        let value: Box<Option<i32>> = Box::new(None);
        assert!(indirect(Peek::new(&value)).is_none());
    }

    #[test]
    fn slots() {
        assert!(matches!(slot(<Option<i32>>::SHAPE), Slot::Option(_)));
        assert!(matches!(slot(<Box<i32>>::SHAPE), Slot::Boxed(_)));
        assert!(matches!(slot(<Rc<i32>>::SHAPE), Slot::Shared(_)));
        assert!(matches!(slot(<&'static i32>::SHAPE), Slot::ReadOnly));
        assert!(matches!(slot(<Vec<i32>>::SHAPE), Slot::Value));
    }

    #[test]
    fn type_stripping() {
        assert_eq!(indirect_type(<Vec<Option<i32>>>::SHAPE), i32::SHAPE);
        assert_eq!(deref_shape(<Option<Vec<i32>>>::SHAPE), <Vec<i32>>::SHAPE);
        assert_eq!(deref_shape(<Rc<Box<u8>>>::SHAPE), u8::SHAPE);
        assert_eq!(deref_shape(<&'static u8>::SHAPE), <&'static u8>::SHAPE);
    }
}
