//! String to value conversion: host-registered decoders keyed by type, backed
//! by a fixed table of decoders keyed by primitive kind.

use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display},
    str::FromStr,
    sync::{Arc, PoisonError, RwLock},
};

use facet_core::{ConstTypeId, Facet, Shape};
use facet_reflect::{Partial, ReflectError};

/// Boxed error returned by a failed conversion.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Why a single value could not be written.
#[derive(Debug)]
pub(crate) enum DecodeFailure {
    /// The raw string did not parse as the target type.
    Parse(BoxError),
    /// The parsed value could not be placed into the target.
    Reflect(ReflectError),
}

impl From<ReflectError> for DecodeFailure {
    fn from(value: ReflectError) -> Self {
        Self::Reflect(value)
    }
}

type ErasedDecoder =
    Arc<dyn Fn(&mut Partial<'static>, &str) -> Result<(), DecodeFailure> + Send + Sync>;

type BuiltinDecoder = fn(&mut Partial<'static>, &str) -> Result<(), DecodeFailure>;

/// The outcome of converting one raw value into the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Conversion {
    /// A decoder ran and the frame now holds the value.
    Assigned,
    /// Neither a custom nor a builtin decoder exists for the frame's type.
    Unhandled,
}

/// Type-specific decoders registered by the host application.
///
/// A registry is shared between every binder that holds it and may gain new
/// decoders at any time, including while other threads are binding. Lookups
/// and registrations take a short-lived lock; decoders themselves run with the
/// lock released.
///
/// ```
/// use facet::Facet;
/// use facet_form::{DecoderRegistry, FormBinder, FormValues};
/// use std::sync::Arc;
///
/// #[derive(Facet, Debug, PartialEq, Default)]
/// struct Cents {
///     amount: u64,
/// }
///
/// #[derive(Facet, Debug, PartialEq)]
/// struct Order {
///     price: Cents,
/// }
///
/// let registry = Arc::new(DecoderRegistry::new());
/// registry.register(|raw: &str| -> Result<Cents, std::num::ParseFloatError> {
///     let euros: f64 = raw.parse()?;
///     Ok(Cents { amount: (euros * 100.0).round() as u64 })
/// });
///
/// let values: FormValues = [("price", "12.50")].into_iter().collect();
/// let order: Order = FormBinder::with_registry(registry).bind(&values).unwrap();
/// assert_eq!(order.price, Cents { amount: 1250 });
/// ```
#[derive(Default)]
pub struct DecoderRegistry {
    custom: RwLock<HashMap<ConstTypeId, ErasedDecoder>>,
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("custom", &self.len())
            .finish()
    }
}

impl DecoderRegistry {
    /// Creates a registry with no custom decoders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the decoders of every enabled optional
    /// integration (date/time types with `chrono`, `Uuid` with `uuid`).
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        #[cfg(feature = "chrono")]
        crate::datetime::register_defaults(&registry);
        #[cfg(feature = "uuid")]
        registry.register(|raw: &str| {
            uuid::Uuid::parse_str(raw).map_err(|e| format!("error parsing uuid: {e}"))
        });
        registry
    }

    /// Registers `decode` for every field of type `T`, replacing any decoder
    /// previously registered for `T`.
    ///
    /// A registered decoder takes precedence over the builtin conversion for
    /// the same type, and makes a struct type behave as a single form value
    /// instead of being walked field by field.
    pub fn register<T, E, F>(&self, decode: F)
    where
        T: Facet<'static>,
        E: Into<BoxError>,
        F: Fn(&str) -> Result<T, E> + Send + Sync + 'static,
    {
        let shape = T::SHAPE;
        log::debug!("Registering custom decoder for {shape}");

        let decoder: ErasedDecoder = Arc::new(
            move |partial: &mut Partial<'static>, raw: &str| -> Result<(), DecodeFailure> {
                let value = decode(raw).map_err(|e| DecodeFailure::Parse(e.into()))?;
                partial.set(value)?;
                Ok(())
            },
        );
        self.write().insert(shape.id, decoder);
    }

    /// Removes the decoder registered for `T`, returning whether there was one.
    pub fn unregister<T: Facet<'static>>(&self) -> bool {
        self.write().remove(&T::SHAPE.id).is_some()
    }

    /// Whether a decoder is registered for `T`.
    pub fn contains<T: Facet<'static>>(&self) -> bool {
        self.is_custom(T::SHAPE)
    }

    /// Number of registered custom decoders.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no custom decoder is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn is_custom(&self, shape: &Shape) -> bool {
        self.read().contains_key(&shape.id)
    }

    fn custom(&self, shape: &Shape) -> Option<ErasedDecoder> {
        self.read().get(&shape.id).cloned()
    }

    /// Converts `raw` into the value under construction in `partial`.
    ///
    /// The custom decoder registered for the exact type wins; otherwise the
    /// builtin decoder for the type's primitive kind is used.
    pub(crate) fn convert(
        &self,
        partial: &mut Partial<'static>,
        raw: &str,
    ) -> Result<Conversion, DecodeFailure> {
        let shape = partial.shape();

        if let Some(decoder) = self.custom(shape) {
            log::trace!("Using custom decoder for {shape}");
            decoder(partial, raw)?;
            return Ok(Conversion::Assigned);
        }

        if let Some(kind) = ScalarKind::of(shape) {
            log::trace!("Using builtin {kind} decoder");
            (kind.decoder())(partial, raw)?;
            return Ok(Conversion::Assigned);
        }

        Ok(Conversion::Unhandled)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<ConstTypeId, ErasedDecoder>> {
        self.custom.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<ConstTypeId, ErasedDecoder>> {
        self.custom.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Primitive kinds with a builtin string conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ScalarKind {
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// `String`
    String,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `i128`
    I128,
    /// `isize`
    Isize,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `u128`
    U128,
    /// `usize`
    Usize,
    /// `f32`
    F32,
    /// `f64`
    F64,
}

impl ScalarKind {
    /// The kind of `shape`, if it is one of the builtin primitives.
    pub fn of(shape: &Shape) -> Option<Self> {
        let kind = match shape.type_identifier {
            "bool" => Self::Bool,
            "char" => Self::Char,
            "String" => Self::String,
            "i8" => Self::I8,
            "i16" => Self::I16,
            "i32" => Self::I32,
            "i64" => Self::I64,
            "i128" => Self::I128,
            "isize" => Self::Isize,
            "u8" => Self::U8,
            "u16" => Self::U16,
            "u32" => Self::U32,
            "u64" => Self::U64,
            "u128" => Self::U128,
            "usize" => Self::Usize,
            "f32" => Self::F32,
            "f64" => Self::F64,
            _ => return None,
        };
        Some(kind)
    }

    /// The Rust name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::String => "String",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    fn decoder(self) -> BuiltinDecoder {
        match self {
            Self::Bool => decode_bool,
            Self::Char => parse_and_set::<char>,
            Self::String => decode_string,
            Self::I8 => parse_and_set::<i8>,
            Self::I16 => parse_and_set::<i16>,
            Self::I32 => parse_and_set::<i32>,
            Self::I64 => parse_and_set::<i64>,
            Self::I128 => parse_and_set::<i128>,
            Self::Isize => parse_and_set::<isize>,
            Self::U8 => parse_and_set::<u8>,
            Self::U16 => parse_and_set::<u16>,
            Self::U32 => parse_and_set::<u32>,
            Self::U64 => parse_and_set::<u64>,
            Self::U128 => parse_and_set::<u128>,
            Self::Usize => parse_and_set::<usize>,
            Self::F32 => parse_and_set::<f32>,
            Self::F64 => parse_and_set::<f64>,
        }
    }
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Primitives parsed with their `FromStr` implementation.
trait Primitive: FromStr<Err: Error + Send + Sync + 'static> + Facet<'static> {
    const KIND: ScalarKind;
}

macro_rules! primitive {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(impl Primitive for $ty {
            const KIND: ScalarKind = ScalarKind::$kind;
        })*
    };
}

primitive! {
    char => Char,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, i128 => I128, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, u128 => U128, usize => Usize,
    f32 => F32, f64 => F64,
}

fn parse_and_set<P: Primitive>(
    partial: &mut Partial<'static>,
    raw: &str,
) -> Result<(), DecodeFailure> {
    let value: P = parse_std(P::KIND, raw)?;
    partial.set(value)?;
    Ok(())
}

fn decode_bool(partial: &mut Partial<'static>, raw: &str) -> Result<(), DecodeFailure> {
    let value =
        parse_bool(raw).ok_or_else(|| ScalarParseError::new(ScalarKind::Bool, raw, InvalidBool))?;
    partial.set(value)?;
    Ok(())
}

fn decode_string(partial: &mut Partial<'static>, raw: &str) -> Result<(), DecodeFailure> {
    partial.set(raw.to_owned())?;
    Ok(())
}

fn parse_std<T>(kind: ScalarKind, raw: &str) -> Result<T, ScalarParseError>
where
    T: FromStr<Err: Error + Send + Sync + 'static>,
{
    raw.parse::<T>()
        .map_err(|e| ScalarParseError::new(kind, raw, e))
}

/// The spellings accepted for booleans: `1 t T TRUE true True` and
/// `0 f F FALSE false False`.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
struct InvalidBool;

impl Display for InvalidBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("expected one of 1, t, T, TRUE, true, True, 0, f, F, FALSE, false, False")
    }
}

impl Error for InvalidBool {}

/// A raw form value that is not valid for a builtin primitive kind.
#[derive(Debug)]
pub struct ScalarParseError {
    kind: ScalarKind,
    value: String,
    source: BoxError,
}

impl ScalarParseError {
    fn new(kind: ScalarKind, value: &str, source: impl Into<BoxError>) -> Self {
        Self {
            kind,
            value: value.to_owned(),
            source: source.into(),
        }
    }

    /// The kind the value was meant to become.
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// The offending raw value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for ScalarParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value: {:?}", self.kind, self.value)
    }
}

impl Error for ScalarParseError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<ScalarParseError> for DecodeFailure {
    fn from(value: ScalarParseError) -> Self {
        Self::Parse(Box::new(value))
    }
}
