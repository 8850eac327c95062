#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

use std::{
    error::Error,
    fmt::{self, Display},
    sync::Arc,
};

use facet_core::{Facet, Shape, StructType, Type, UserType};
use facet_reflect::{Partial, ReflectError};

#[cfg(feature = "chrono")]
pub mod datetime;
mod descriptor;
mod path;
mod registry;
mod values;

pub use path::{FieldPath, element_prefix, probe_count, resolve_key};
pub use registry::{BoxError, DecoderRegistry, ScalarKind, ScalarParseError};
pub use values::{FormSource, FormValues};

use descriptor::{FieldDescriptor, ShapeCategory, element_is_struct};
use registry::{Conversion, DecodeFailure};

/// Error type for form binding.
#[derive(Debug)]
pub struct FormError {
    kind: FormErrorKind,
}

impl FormError {
    /// Returns a reference to the error kind for detailed error inspection.
    pub fn kind(&self) -> &FormErrorKind {
        &self.kind
    }

    /// The form key of the field that could not be set, if the error concerns
    /// a single field.
    pub fn path(&self) -> Option<&str> {
        match &self.kind {
            FormErrorKind::FieldConversion { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = &self.kind;
        write!(f, "{kind}")
    }
}

impl Error for FormError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            FormErrorKind::FieldConversion { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl<K: Into<FormErrorKind>> From<K> for FormError {
    fn from(value: K) -> Self {
        let kind = value.into();
        FormError { kind }
    }
}

/// Detailed classification of form binding errors.
#[derive(Debug)]
#[non_exhaustive]
pub enum FormErrorKind {
    /// The target type is not a struct, so there are no fields to bind.
    InvalidTarget(&'static Shape),
    /// A submitted value could not be converted to its field's type.
    FieldConversion {
        /// The form key of the field, e.g. `items[1].quantity`.
        path: String,
        /// The submitted value that was rejected.
        value: String,
        /// The name of the field's type.
        target: &'static str,
        /// Why the decoder rejected the value.
        source: BoxError,
    },
    /// Error from the reflection system while building the target.
    Reflect(ReflectError),
}

impl Display for FormErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormErrorKind::InvalidTarget(shape) => {
                write!(f, "cannot bind form values onto {shape}: target must be a struct")
            }
            FormErrorKind::FieldConversion {
                path,
                value,
                target,
                source,
            } => write!(f, "failed to set '{path}' ({target}) from {value:?}: {source}"),
            FormErrorKind::Reflect(reflect_error) => write!(f, "{reflect_error}"),
        }
    }
}

impl From<ReflectError> for FormErrorKind {
    fn from(value: ReflectError) -> Self {
        Self::Reflect(value)
    }
}

type Result<T> = std::result::Result<T, FormError>;

/// Binds form values onto Facet structs.
///
/// A binder holds the [`DecoderRegistry`] consulted for every field. Clones
/// share the registry, so a decoder registered through one clone is seen by
/// all of them.
#[derive(Debug, Clone)]
pub struct FormBinder {
    registry: Arc<DecoderRegistry>,
}

impl Default for FormBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl FormBinder {
    /// Creates a binder with its own registry, holding the decoders of every
    /// enabled optional integration.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(DecoderRegistry::with_defaults()))
    }

    /// Creates a binder that consults `registry`.
    pub fn with_registry(registry: Arc<DecoderRegistry>) -> Self {
        Self { registry }
    }

    /// The registry this binder consults.
    pub fn registry(&self) -> &Arc<DecoderRegistry> {
        &self.registry
    }

    /// Registers a decoder for `T` in this binder's registry.
    ///
    /// See [`DecoderRegistry::register`].
    pub fn register<T, E, F>(&self, decode: F)
    where
        T: Facet<'static>,
        E: Into<BoxError>,
        F: Fn(&str) -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        self.registry.register(decode);
    }

    /// Builds a `T` from `values`.
    ///
    /// Fields without a submitted value take their default. The first value
    /// that fails to convert aborts binding.
    pub fn bind<T, S>(&self, values: &S) -> Result<T>
    where
        T: Facet<'static>,
        S: FormSource + ?Sized,
    {
        log::trace!("Entering `bind` method");

        let shape = T::SHAPE;
        let Type::User(UserType::Struct(struct_def)) = &shape.ty else {
            return Err(FormErrorKind::InvalidTarget(shape).into());
        };

        let mut typed_partial = Partial::alloc::<T>()?;
        log::trace!(
            "Allocated WIP for type {}",
            typed_partial.inner_mut().shape()
        );

        {
            let partial = typed_partial.inner_mut();
            FormDeserializer {
                values,
                registry: &self.registry,
            }
            .deserialize_struct(partial, struct_def, "")?;
        }

        let boxed_value = typed_partial.build()?;
        log::trace!("WIP fully built");

        Ok(*boxed_value)
    }

    /// Binds `values` onto `target`.
    ///
    /// `target` is only replaced when binding succeeds; on error it is left
    /// exactly as it was.
    pub fn bind_into<T, S>(&self, target: &mut T, values: &S) -> Result<()>
    where
        T: Facet<'static>,
        S: FormSource + ?Sized,
    {
        *target = self.bind(values)?;
        Ok(())
    }
}

struct FormDeserializer<'a, S: ?Sized> {
    values: &'a S,
    registry: &'a DecoderRegistry,
}

impl<S: FormSource + ?Sized> FormDeserializer<'_, S> {
    fn deserialize_struct(
        &self,
        partial: &mut Partial<'static>,
        struct_def: &'static StructType,
        prefix: &str,
    ) -> Result<()> {
        log::trace!(
            "Entering `deserialize_struct` method at {} (prefix '{prefix}')",
            partial.path()
        );

        for (index, field) in struct_def.fields.iter().enumerate() {
            let descriptor = FieldDescriptor::of(field);
            let Some(path) = descriptor.resolve(prefix) else {
                log::debug!("Skipping field '{}'", descriptor.name);
                partial.begin_nth_field(index)?;
                if let Some(default_fn) = field.vtable.default_fn {
                    partial.set_field_default(default_fn)?;
                } else {
                    partial.set_default()?;
                }
                partial.end()?;
                continue;
            };

            partial.begin_field(descriptor.name)?;
            self.deserialize_value(partial, &path)?;
            partial.end()?;
        }

        log::trace!("Exiting `deserialize_struct` method at {}", partial.path());
        Ok(())
    }

    fn deserialize_value(&self, partial: &mut Partial<'static>, path: &FieldPath) -> Result<()> {
        log::trace!(
            "Entering `deserialize_value` method at {} (key '{}')",
            partial.path(),
            path.key
        );

        match ShapeCategory::of(partial.shape(), self.registry) {
            ShapeCategory::Optional(inner) => {
                if self.is_present(inner, path) {
                    partial.begin_some()?;
                    self.deserialize_value(partial, path)?;
                    partial.end()?;
                } else {
                    log::trace!("Nothing submitted for '{}', leaving None", path.key);
                    partial.set_default()?;
                }
            }
            ShapeCategory::Pointer(_) => {
                partial.begin_smart_ptr()?;
                self.deserialize_value(partial, path)?;
                partial.end()?;
            }
            ShapeCategory::Struct(struct_def) => {
                self.deserialize_struct(partial, struct_def, &path.child_prefix)?;
            }
            ShapeCategory::List(item_shape) => {
                self.deserialize_list(partial, item_shape, path)?;
            }
            ShapeCategory::Transparent(_) => {
                let wrapper = partial.shape();
                if self.is_present(wrapper, path) {
                    partial.begin_inner()?;
                    self.deserialize_value(partial, path)?;
                    let raw = self.values.first(&path.key).unwrap_or_default();
                    self.end_inner(partial, wrapper, &path.key, raw)?;
                } else {
                    log::trace!("Nothing submitted for '{}', leaving default", path.key);
                    partial.set_default()?;
                }
            }
            ShapeCategory::Custom | ShapeCategory::Scalar(_) | ShapeCategory::Unhandled => {
                match self.values.first(&path.key) {
                    Some(raw) => self.convert(partial, &path.key, raw)?,
                    None => {
                        log::trace!("Nothing submitted for '{}', leaving default", path.key);
                        partial.set_default()?;
                    }
                }
            }
        }

        Ok(())
    }

    fn deserialize_list(
        &self,
        partial: &mut Partial<'static>,
        item_shape: &'static Shape,
        path: &FieldPath,
    ) -> Result<()> {
        if element_is_struct(item_shape, self.registry) {
            let count = probe_count(self.values, &path.key);
            partial.begin_list()?;
            for index in 0..count {
                let prefix = element_prefix(&path.key, index);
                let element_path = FieldPath {
                    key: prefix.clone(),
                    child_prefix: prefix,
                };
                partial.begin_list_item()?;
                self.deserialize_value(partial, &element_path)?;
                partial.end()?;
            }
            return Ok(());
        }

        let Some(raws) = self.values.values(&path.key) else {
            log::trace!("Nothing submitted for '{}', leaving empty", path.key);
            partial.set_default()?;
            return Ok(());
        };

        partial.begin_list()?;
        for raw in raws {
            partial.begin_list_item()?;
            self.deserialize_item(partial, &path.key, raw)?;
            partial.end()?;
        }
        Ok(())
    }

    /// Writes one submitted value into a list element.
    fn deserialize_item(&self, partial: &mut Partial<'static>, key: &str, raw: &str) -> Result<()> {
        match ShapeCategory::of(partial.shape(), self.registry) {
            ShapeCategory::Optional(_) => {
                partial.begin_some()?;
                self.deserialize_item(partial, key, raw)?;
                partial.end()?;
            }
            ShapeCategory::Pointer(_) => {
                partial.begin_smart_ptr()?;
                self.deserialize_item(partial, key, raw)?;
                partial.end()?;
            }
            ShapeCategory::Transparent(_) => {
                let wrapper = partial.shape();
                partial.begin_inner()?;
                self.deserialize_item(partial, key, raw)?;
                self.end_inner(partial, wrapper, key, raw)?;
            }
            _ => self.convert(partial, key, raw)?,
        }
        Ok(())
    }

    fn convert(&self, partial: &mut Partial<'static>, key: &str, raw: &str) -> Result<()> {
        let shape = partial.shape();
        match self.registry.convert(partial, raw) {
            Ok(Conversion::Assigned) => Ok(()),
            Ok(Conversion::Unhandled) => {
                log::debug!("No decoder for {shape} at '{key}', leaving default");
                partial.set_default()?;
                Ok(())
            }
            Err(DecodeFailure::Parse(source)) => Err(FormErrorKind::FieldConversion {
                path: key.to_owned(),
                value: raw.to_owned(),
                target: shape.type_identifier,
                source,
            }
            .into()),
            Err(DecodeFailure::Reflect(reflect_error)) => Err(reflect_error.into()),
        }
    }

    /// Closes the inner frame of a transparent wrapper. This is where the
    /// wrapper checks its inner value (`NonZero` rejects zero), so a refusal
    /// is reported against the field.
    fn end_inner(
        &self,
        partial: &mut Partial<'static>,
        wrapper: &'static Shape,
        key: &str,
        raw: &str,
    ) -> Result<()> {
        if let Err(reflect_error) = partial.end() {
            return Err(FormErrorKind::FieldConversion {
                path: key.to_owned(),
                value: raw.to_owned(),
                target: wrapper.type_identifier,
                source: reflect_error.to_string().into(),
            }
            .into());
        }
        Ok(())
    }

    /// Whether the form holds anything for an optional value of `shape`.
    fn is_present(&self, shape: &'static Shape, path: &FieldPath) -> bool {
        match ShapeCategory::of(shape, self.registry) {
            ShapeCategory::Optional(inner)
            | ShapeCategory::Pointer(inner)
            | ShapeCategory::Transparent(Some(inner)) => self.is_present(inner, path),
            ShapeCategory::Struct(_) => self.values.has_path(&path.child_prefix),
            ShapeCategory::List(item_shape) if element_is_struct(item_shape, self.registry) => {
                probe_count(self.values, &path.key) > 0
            }
            _ => self.values.contains_key(&path.key),
        }
    }
}

/// Builds a `T` from form values with a fresh [`FormBinder`].
///
/// Returns a [`FormError`] if `T` is not a struct or a submitted value does
/// not convert to its field's type.
///
/// # Example
/// ```
/// # use facet::Facet;
/// # use facet_form::FormValues;
/// # fn main() -> Result<(), facet_form::FormError> {
/// #[derive(Facet, Debug, PartialEq)]
/// struct Signup {
///     name: String,
///     age: u32,
///     newsletter: bool,
/// }
///
/// let values: FormValues = [("name", "Alice"), ("age", "30"), ("newsletter", "true")]
///     .into_iter()
///     .collect();
///
/// let signup: Signup = facet_form::from_form(&values)?;
/// assert_eq!(
///     signup,
///     Signup {
///         name: "Alice".to_string(),
///         age: 30,
///         newsletter: true,
///     }
/// );
/// # Ok(())
/// # }
/// ```
pub fn from_form<T, S>(values: &S) -> Result<T>
where
    T: Facet<'static>,
    S: FormSource + ?Sized,
{
    log::trace!("Entering `from_form` function");
    FormBinder::new().bind(values)
}
