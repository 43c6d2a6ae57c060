use crate::{AsValue, Result};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Dynamically typed value carried by query parameters and result rows.
///
/// Every variant but `Null` wraps an `Option` so that a typed NULL can still
/// describe the column type it belongs to.
#[derive(Default, Debug, Clone, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(Option<bool>),
    Int16(Option<i16>),
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    Decimal(Option<Decimal>),
    Varchar(Option<String>),
    Blob(Option<Box<[u8]>>),
    Date(Option<Date>),
    Time(Option<Time>),
    Timestamp(Option<PrimitiveDateTime>),
    TimestampWithTimezone(Option<OffsetDateTime>),
    Uuid(Option<Uuid>),
    /// Text whose type is decided by the receiving side (e.g. filter tokens).
    Unknown(Option<String>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Boolean(v) => v.is_none(),
            Value::Int16(v) => v.is_none(),
            Value::Int32(v) => v.is_none(),
            Value::Int64(v) => v.is_none(),
            Value::Float32(v) => v.is_none(),
            Value::Float64(v) => v.is_none(),
            Value::Decimal(v) => v.is_none(),
            Value::Varchar(v) => v.is_none(),
            Value::Blob(v) => v.is_none(),
            Value::Date(v) => v.is_none(),
            Value::Time(v) => v.is_none(),
            Value::Timestamp(v) => v.is_none(),
            Value::TimestampWithTimezone(v) => v.is_none(),
            Value::Uuid(v) => v.is_none(),
            Value::Unknown(v) => v.is_none(),
        }
    }

    /// The NULL of the same variant.
    pub fn as_null(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Boolean(..) => Value::Boolean(None),
            Value::Int16(..) => Value::Int16(None),
            Value::Int32(..) => Value::Int32(None),
            Value::Int64(..) => Value::Int64(None),
            Value::Float32(..) => Value::Float32(None),
            Value::Float64(..) => Value::Float64(None),
            Value::Decimal(..) => Value::Decimal(None),
            Value::Varchar(..) => Value::Varchar(None),
            Value::Blob(..) => Value::Blob(None),
            Value::Date(..) => Value::Date(None),
            Value::Time(..) => Value::Time(None),
            Value::Timestamp(..) => Value::Timestamp(None),
            Value::TimestampWithTimezone(..) => Value::TimestampWithTimezone(None),
            Value::Uuid(..) => Value::Uuid(None),
            Value::Unknown(..) => Value::Unknown(None),
        }
    }

    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    /// Convert `self` into the variant of `prototype`.
    ///
    /// Drivers use this to coerce bound parameters to the type the backend
    /// inferred for each placeholder. A `Null` prototype (type not known)
    /// leaves the value untouched.
    pub fn try_as(self, prototype: &Value) -> Result<Value> {
        if self.same_type(prototype) || matches!(prototype, Value::Null) {
            return Ok(self);
        }
        if self.is_null() {
            return Ok(prototype.as_null());
        }
        let result = match prototype {
            Value::Boolean(..) => bool::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Int16(..) => i16::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Int32(..) => i32::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Int64(..) => i64::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Float32(..) => f32::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Float64(..) => f64::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Decimal(..) => Decimal::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Varchar(..) => String::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Blob(..) => Vec::<u8>::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Date(..) => Date::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Time(..) => Time::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Timestamp(..) => {
                PrimitiveDateTime::try_from_value(self.clone()).map(AsValue::as_value)
            }
            Value::TimestampWithTimezone(..) => {
                OffsetDateTime::try_from_value(self.clone()).map(AsValue::as_value)
            }
            Value::Uuid(..) => Uuid::try_from_value(self.clone()).map(AsValue::as_value),
            Value::Unknown(..) | Value::Null => Ok(self.clone()),
        };
        result.map_err(|e| {
            e.context(format!(
                "Cannot convert {:?} into the type of {:?}",
                self, prototype
            ))
        })
    }
}
