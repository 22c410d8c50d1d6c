//! Dynamically typed platform values.
//!
//! The platform treats sensor, actuator, and configuration values as
//! numbers, booleans, strings, or small tuples interchangeably.  Rather than
//! passing untyped JSON around, every such value is one of the closed
//! variants below.  Type inference from wire strings happens only in the
//! codec's decode path.

/// A single value: the element type of tuples and the value of actuators.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

/// Any value a sensor reading or configuration entry can carry.
///
/// Tuples hold scalars only; nesting is not representable on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Tuple(Vec<Scalar>),
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Int(v) => Value::Int(v),
            Scalar::Float(v) => Value::Float(v),
            Scalar::Bool(v) => Value::Bool(v),
            Scalar::Str(v) => Value::Str(v),
        }
    }
}

impl From<Vec<Scalar>> for Value {
    fn from(elements: Vec<Scalar>) -> Self {
        Value::Tuple(elements)
    }
}

// Primitive conversions for both variant families.
macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(v: $ty) -> Self {
                    Scalar::$variant(<$conv>::from(v))
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(<$conv>::from(v))
                }
            }
        )*
    };
}

impl_from_primitive!(
    i64 => Int as i64,
    i32 => Int as i64,
    u32 => Int as i64,
    f64 => Float as f64,
    f32 => Float as f64,
    bool => Bool as bool,
    String => Str as String,
    &str => Str as String,
);
