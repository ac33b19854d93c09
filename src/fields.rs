//! Flattened field tables and path access.

use facet_core::{Field, FieldFlags, Shape, Type, UserType};
use facet_reflect::Peek;

use crate::indirect::{deref_shape, indirect, is_struct};

/// Embedding levels followed before flattening gives up.
const MAX_EMBED_DEPTH: usize = 32;

/// A named, settable slot in the flattened view of a struct.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    /// Name the slot is matched by.
    pub name: &'static str,
    /// Declared shape of the slot.
    pub shape: &'static Shape,
    /// Field indices from the outer struct, through flattened members, down
    /// to the slot.
    pub path: Vec<usize>,
}

/// Flattens a struct shape into its ordered field descriptors.
///
/// Fields are visited in declaration order. A `#[facet(flatten)]` field whose
/// shape (once `Option`s and pointers are stripped) is a struct contributes
/// its own fields in its place; every other field contributes itself. If two
/// paths reach the same name, the first one visited wins.
///
/// Non-struct shapes have no fields.
pub fn deep_fields(shape: &'static Shape) -> Vec<FieldDescriptor> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    collect(shape, &mut prefix, &mut out, 0);
    out
}

fn collect(
    shape: &'static Shape,
    prefix: &mut Vec<usize>,
    out: &mut Vec<FieldDescriptor>,
    depth: usize,
) {
    let Type::User(UserType::Struct(st)) = shape.ty else {
        return;
    };

    if depth > MAX_EMBED_DEPTH {
        log::warn!(
            "Embedding in {shape} nests deeper than {MAX_EMBED_DEPTH} levels, ignoring the rest"
        );
        return;
    }

    for (index, field) in st.fields.iter().enumerate() {
        prefix.push(index);

        if let Some(embedded) = embedded_struct(field) {
            log::trace!("Flattening embedded {} into {shape}", field.name);
            collect(embedded, prefix, out, depth + 1);
        } else if out.iter().any(|f| f.name == field.name) {
            log::trace!("Field {} of {shape} is shadowed by an earlier field", field.name);
        } else {
            out.push(FieldDescriptor {
                name: field.name,
                shape: field.shape(),
                path: prefix.clone(),
            });
        }

        prefix.pop();
    }
}

/// The struct a flattened field embeds, with pointers stripped.
pub(crate) fn embedded_struct(field: &Field) -> Option<&'static Shape> {
    if !field.flags.contains(FieldFlags::FLATTEN) {
        return None;
    }
    let shape = deref_shape(field.shape());
    is_struct(shape).then_some(shape)
}

/// Looks a field up by exact name.
pub(crate) fn find_field<'f>(
    fields: &'f [FieldDescriptor],
    name: &str,
) -> Option<&'f FieldDescriptor> {
    fields.iter().find(|f| f.name == name)
}

/// Reads the slot at `path`. `None` if a pointer on the way is nil.
pub(crate) fn field_at<'mem>(
    value: Peek<'mem, 'static>,
    path: &[usize],
) -> Option<Peek<'mem, 'static>> {
    let Some((&first, rest)) = path.split_first() else {
        return Some(value);
    };
    let field = value.into_struct().ok()?.field(first).ok()?;
    if rest.is_empty() {
        Some(field)
    } else {
        field_at(indirect(field)?, rest)
    }
}
