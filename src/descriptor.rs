//! The per-field view of a target type that binding walks.

use facet_core::{Def, Field, FieldAttribute, FieldFlags, Shape, StructType, Type, UserType};

use crate::{DecoderRegistry, FieldPath, registry::ScalarKind, resolve_key};

/// What binding needs to know about one declared field.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldDescriptor {
    /// Effective name, after any `#[facet(rename)]`.
    pub name: &'static str,
    /// `#[facet(skip)]`: never read from the form.
    pub skip: bool,
    /// `#[facet(flatten)]`: fields are addressed at the parent's level.
    pub flatten: bool,
    pub shape: &'static Shape,
}

impl FieldDescriptor {
    pub fn of(field: &'static Field) -> Self {
        Self {
            name: field.name,
            skip: field
                .attributes
                .contains(&FieldAttribute::Arbitrary("skip")),
            flatten: field.flags.contains(FieldFlags::FLATTEN),
            shape: field.shape,
        }
    }

    /// The form key for this field under `prefix`, or `None` for skipped fields.
    pub fn resolve(&self, prefix: &str) -> Option<FieldPath> {
        if self.skip {
            return None;
        }
        Some(resolve_key(self.name, prefix, self.flatten))
    }
}

/// How a value of some shape is populated from form values.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ShapeCategory {
    /// A host-registered decoder owns this type.
    Custom,
    /// `Option<T>`: left as `None` when the form has nothing for it.
    Optional(&'static Shape),
    /// `Box<T>`, `Arc<T>`, `Rc<T>`: always allocated.
    Pointer(&'static Shape),
    /// `Vec<T>` and other lists.
    List(&'static Shape),
    /// A primitive with a builtin decoder.
    Scalar(ScalarKind),
    /// A struct walked field by field.
    Struct(&'static StructType),
    /// A transparent wrapper (`NonZero<T>`, `#[facet(transparent)]` newtypes)
    /// decoded as its inner type. Holds the inner shape when the wrapper
    /// exposes it as its single field.
    Transparent(Option<&'static Shape>),
    /// Nothing knows how to decode this shape.
    Unhandled,
}

impl ShapeCategory {
    pub fn of(shape: &'static Shape, registry: &DecoderRegistry) -> Self {
        if registry.is_custom(shape) {
            return Self::Custom;
        }
        match &shape.def {
            Def::Option(option_def) => return Self::Optional(option_def.t()),
            Def::Pointer(pointer_def) => {
                return match pointer_def.pointee() {
                    Some(pointee) => Self::Pointer(pointee),
                    None => Self::Unhandled,
                };
            }
            Def::List(list_def) => return Self::List(list_def.t()),
            _ => {}
        }
        if let Some(kind) = ScalarKind::of(shape) {
            return Self::Scalar(kind);
        }
        // Transparent wrappers also describe themselves as single-field
        // structs, so this has to come first.
        if shape.inner.is_some() {
            return Self::Transparent(transparent_inner(shape));
        }
        if let Type::User(UserType::Struct(struct_def)) = &shape.ty {
            return Self::Struct(struct_def);
        }
        Self::Unhandled
    }

    /// Whether values of this category are populated from nested keys
    /// (`key.field`) rather than from the value under `key` itself.
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Struct(_))
    }
}

fn transparent_inner(shape: &'static Shape) -> Option<&'static Shape> {
    match &shape.ty {
        Type::User(UserType::Struct(struct_def)) => match struct_def.fields {
            [field] => Some(field.shape),
            _ => None,
        },
        _ => None,
    }
}

/// Whether list elements of `shape` are walked as structs, looking through
/// `Option`, pointer and transparent wrappers.
pub(crate) fn element_is_struct(shape: &'static Shape, registry: &DecoderRegistry) -> bool {
    match ShapeCategory::of(shape, registry) {
        ShapeCategory::Optional(inner)
        | ShapeCategory::Pointer(inner)
        | ShapeCategory::Transparent(Some(inner)) => element_is_struct(inner, registry),
        category => category.is_nested(),
    }
}
