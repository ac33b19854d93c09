//! Reading scalars off a source and writing them, converted, into a slot.

use std::borrow::Cow;

use facet_core::{Def, Shape};
use facet_reflect::{HasFields, Partial, Peek, ReflectError, ScalarType};

/// A scalar read off a source value, widened to a common representation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Scalar {
    Bool(bool),
    Char(char),
    Int(i128),
    Uint(u128),
    Float(f64),
    Str(String),
}

impl Scalar {
    pub(crate) fn read(peek: Peek<'_, 'static>) -> Option<Self> {
        Some(match peek.scalar_type()? {
            ScalarType::Bool => Scalar::Bool(*peek.get::<bool>().ok()?),
            ScalarType::Char => Scalar::Char(*peek.get::<char>().ok()?),
            ScalarType::Str | ScalarType::String => Scalar::Str(peek.as_str()?.to_owned()),
            ScalarType::CowStr => Scalar::Str(peek.get::<Cow<'static, str>>().ok()?.to_string()),
            ScalarType::F32 => Scalar::Float(*peek.get::<f32>().ok()? as f64),
            ScalarType::F64 => Scalar::Float(*peek.get::<f64>().ok()?),
            ScalarType::U8 => Scalar::Uint(*peek.get::<u8>().ok()? as u128),
            ScalarType::U16 => Scalar::Uint(*peek.get::<u16>().ok()? as u128),
            ScalarType::U32 => Scalar::Uint(*peek.get::<u32>().ok()? as u128),
            ScalarType::U64 => Scalar::Uint(*peek.get::<u64>().ok()? as u128),
            ScalarType::U128 => Scalar::Uint(*peek.get::<u128>().ok()?),
            ScalarType::USize => Scalar::Uint(*peek.get::<usize>().ok()? as u128),
            ScalarType::I8 => Scalar::Int(*peek.get::<i8>().ok()? as i128),
            ScalarType::I16 => Scalar::Int(*peek.get::<i16>().ok()? as i128),
            ScalarType::I32 => Scalar::Int(*peek.get::<i32>().ok()? as i128),
            ScalarType::I64 => Scalar::Int(*peek.get::<i64>().ok()? as i128),
            ScalarType::I128 => Scalar::Int(*peek.get::<i128>().ok()?),
            ScalarType::ISize => Scalar::Int(*peek.get::<isize>().ok()? as i128),
            _ => return None,
        })
    }

    fn is_zero(&self) -> bool {
        match self {
            Scalar::Bool(b) => !b,
            Scalar::Char(c) => *c == '\0',
            Scalar::Int(n) => *n == 0,
            Scalar::Uint(n) => *n == 0,
            Scalar::Float(n) => *n == 0.0,
            Scalar::Str(s) => s.is_empty(),
        }
    }

    /// Whether this scalar converts into a slot of shape `to`.
    ///
    /// Numbers convert into any numeric type with `as` semantics, characters
    /// count as their code point, and text goes into `String`. Nothing
    /// converts into `bool`, and numbers never become text.
    pub(crate) fn converts_to(&self, to: &'static Shape) -> bool {
        let Some(to) = ScalarType::try_from_shape(to) else {
            return false;
        };
        match (self, to) {
            (Scalar::Str(_), ScalarType::String) => true,
            (Scalar::Int(_) | Scalar::Uint(_), ScalarType::Char) => self.code_point().is_some(),
            (Scalar::Int(_) | Scalar::Uint(_) | Scalar::Float(_) | Scalar::Char(_), to) => {
                is_numeric(to)
            }
            _ => false,
        }
    }

    fn code_point(&self) -> Option<char> {
        let n = match *self {
            Scalar::Int(n) => u32::try_from(n).ok()?,
            Scalar::Uint(n) => u32::try_from(n).ok()?,
            _ => return None,
        };
        char::from_u32(n)
    }

    /// Writes this scalar into `partial`, converted to its shape. Only call
    /// after `converts_to` agreed.
    pub(crate) fn write(&self, partial: &mut Partial<'static>) -> Result<(), ReflectError> {
        let shape = partial.shape();
        let to = ScalarType::try_from_shape(shape);
        if let (Some(ScalarType::Char), Some(c)) = (to, self.code_point()) {
            partial.set(c)?;
            return Ok(());
        }
        if let (Some(ScalarType::String), Scalar::Str(s)) = (to, self) {
            partial.set(s.clone())?;
            return Ok(());
        }

        macro_rules! set_as {
            ($ty:ty) => {
                match *self {
                    Scalar::Int(n) => partial.set(n as $ty)?,
                    Scalar::Uint(n) => partial.set(n as $ty)?,
                    Scalar::Float(n) => partial.set(n as $ty)?,
                    Scalar::Char(c) => partial.set(c as u32 as $ty)?,
                    Scalar::Bool(_) | Scalar::Str(_) => {
                        return Err(ReflectError::OperationFailed {
                            shape,
                            operation: "scalar does not convert to this type",
                        });
                    }
                }
            };
        }

        match to {
            Some(ScalarType::U8) => set_as!(u8),
            Some(ScalarType::U16) => set_as!(u16),
            Some(ScalarType::U32) => set_as!(u32),
            Some(ScalarType::U64) => set_as!(u64),
            Some(ScalarType::U128) => set_as!(u128),
            Some(ScalarType::USize) => set_as!(usize),
            Some(ScalarType::I8) => set_as!(i8),
            Some(ScalarType::I16) => set_as!(i16),
            Some(ScalarType::I32) => set_as!(i32),
            Some(ScalarType::I64) => set_as!(i64),
            Some(ScalarType::I128) => set_as!(i128),
            Some(ScalarType::ISize) => set_as!(isize),
            Some(ScalarType::F32) => set_as!(f32),
            Some(ScalarType::F64) => set_as!(f64),
            _ => {
                return Err(ReflectError::OperationFailed {
                    shape,
                    operation: "scalar does not convert to this type",
                });
            }
        };
        Ok(())
    }
}

fn is_numeric(ty: ScalarType) -> bool {
    matches!(
        ty,
        ScalarType::U8
            | ScalarType::U16
            | ScalarType::U32
            | ScalarType::U64
            | ScalarType::U128
            | ScalarType::USize
            | ScalarType::I8
            | ScalarType::I16
            | ScalarType::I32
            | ScalarType::I64
            | ScalarType::I128
            | ScalarType::ISize
            | ScalarType::F32
            | ScalarType::F64
    )
}

/// Zero value: `0`, `false`, `'\0'`, empty text, `None`, or a struct whose
/// fields are all zero.
pub(crate) fn is_zero(value: Peek<'_, 'static>) -> bool {
    if let Some(scalar) = Scalar::read(value) {
        return scalar.is_zero();
    }
    if let Def::Option(_) = value.shape().def {
        return value.into_option().is_ok_and(|option| option.is_none());
    }
    match value.into_struct() {
        Ok(st) => st.fields().all(|(_, field)| is_zero(field)),
        Err(_) => false,
    }
}

/// A `None`, a smart pointer with nothing behind it, or an empty list.
pub(crate) fn is_nil(value: Peek<'_, 'static>) -> bool {
    match value.shape().def {
        Def::Option(_) => value.into_option().is_ok_and(|option| option.is_none()),
        Def::Pointer(_) => value
            .into_pointer()
            .is_ok_and(|ptr| ptr.borrow_inner().is_none()),
        Def::List(_) => value.into_list().is_ok_and(|list| list.is_empty()),
        _ => false,
    }
}
