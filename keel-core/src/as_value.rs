use crate::{Error, Result, Value, truncate_long};
use atoi::FromRadix10SignedChecked;
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};
use std::any;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, macros::format_description};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`].
///
/// It backs both directions of the data path: record fields become bound
/// parameters through `as_value`, result columns become fields again through
/// `try_from_value`.
///
/// # Conversion contract
/// - `try_from_value` accepts the canonical variant of the type and, where
///   lossless, the other numeric widths (range checked).
/// - Text (`Value::Unknown`, and `Value::Varchar` for non string targets) is
///   handed to `parse`, which must consume the whole input.
///
/// ```rust
/// use keel_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The NULL variant describing this type.
    fn as_empty_value() -> Value;
    fn as_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse the whole input into `Self`.
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input.as_ref()),
            any::type_name::<Self>()
        )))
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

fn conversion_error<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>(),
    ))
}

fn out_of_range<T>(value: impl std::fmt::Display) -> Error {
    Error::msg(format!(
        "Value {value} is out of range for {}",
        any::type_name::<T>()
    ))
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    $($pat_rest => $expr_rest,)*
                    Value::Unknown(Some(ref v)) | Value::Varchar(Some(ref v)) => Self::parse(v),
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let input = input.as_ref().trim();
                match <$source>::from_radix_10_signed_checked(input.as_bytes()) {
                    (Some(v), len) if len > 0 && len == input.len() => Ok(v),
                    (None, len) if len > 0 && len == input.len() => {
                        Err(out_of_range::<Self>(truncate_long!(input)))
                    }
                    _ => Err(Error::msg(format!(
                        "Cannot parse `{}` as {}",
                        truncate_long!(input),
                        any::type_name::<Self>()
                    ))),
                }
            }
        }
    };
}
impl_as_value_integer!(
    i16,
    Value::Int16,
    Value::Int32(Some(v)) => i16::try_from(v).map_err(|_| out_of_range::<i16>(v)),
    Value::Int64(Some(v)) => i16::try_from(v).map_err(|_| out_of_range::<i16>(v)),
);
impl_as_value_integer!(
    i32,
    Value::Int32,
    Value::Int16(Some(v)) => Ok(v.into()),
    Value::Int64(Some(v)) => i32::try_from(v).map_err(|_| out_of_range::<i32>(v)),
    Value::Decimal(Some(v)) => {
        if !v.is_integer() {
            return Err(out_of_range::<i32>(v).context("The value is not a integer"));
        }
        v.to_i32().ok_or(out_of_range::<i32>(v))
    }
);
impl_as_value_integer!(
    i64,
    Value::Int64,
    Value::Int16(Some(v)) => Ok(v.into()),
    Value::Int32(Some(v)) => Ok(v.into()),
    Value::Decimal(Some(v)) => {
        if !v.is_integer() {
            return Err(out_of_range::<i64>(v).context("The value is not a integer"));
        }
        v.to_i64().ok_or(out_of_range::<i64>(v))
    }
);

macro_rules! impl_as_value_float {
    ($source:ty, $destination:path $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v),
                    $($pat_rest => $expr_rest,)*
                    Value::Int16(Some(v)) => Ok(v as _),
                    Value::Int32(Some(v)) => Ok(v as _),
                    Value::Unknown(Some(ref v)) | Value::Varchar(Some(ref v)) => Self::parse(v),
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let input = input.as_ref().trim();
                fast_float::parse::<$source, _>(input).map_err(|_| {
                    Error::msg(format!(
                        "Cannot extract a floating point value from `{}`",
                        truncate_long!(input)
                    ))
                })
            }
        }
    };
}
impl_as_value_float!(
    f32,
    Value::Float32,
    Value::Float64(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v.to_f32().ok_or(out_of_range::<f32>(v)),
);
impl_as_value_float!(
    f64,
    Value::Float64,
    Value::Float32(Some(v)) => Ok(v as _),
    Value::Int64(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v.to_f64().ok_or(out_of_range::<f64>(v)),
);

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $parse:expr $(, $pat_rest:pat => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                match value {
                    $destination(Some(v)) => Ok(v.into()),
                    $($pat_rest => $expr_rest,)*
                    #[allow(unreachable_patterns)]
                    Value::Unknown(Some(ref v)) | Value::Varchar(Some(ref v)) => {
                        <Self as AsValue>::parse(v)
                    }
                    _ => Err(conversion_error::<Self>(&value)),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                $parse(input.as_ref())
            }
        }
    };
}
impl_as_value!(
    bool,
    Value::Boolean,
    |input: &str| {
        match input.trim() {
            x if x.eq_ignore_ascii_case("true") || x.eq_ignore_ascii_case("t") || x == "1" => Ok(true),
            x if x.eq_ignore_ascii_case("false") || x.eq_ignore_ascii_case("f") || x == "0" => Ok(false),
            _ => Err(Error::msg(format!("Cannot parse boolean from `{}`", truncate_long!(input)))),
        }
    },
    Value::Int16(Some(v)) => Ok(v != 0),
    Value::Int32(Some(v)) => Ok(v != 0),
    Value::Int64(Some(v)) => Ok(v != 0),
);
impl_as_value!(
    Decimal,
    Value::Decimal,
    |input: &str| {
        input.trim().parse::<Decimal>().map_err(|e| {
            Error::new(e).context(format!("Cannot parse `{}` as Decimal", truncate_long!(input)))
        })
    },
    Value::Int16(Some(v)) => Ok(v.into()),
    Value::Int32(Some(v)) => Ok(v.into()),
    Value::Int64(Some(v)) => Ok(v.into()),
    Value::Float32(Some(v)) => Decimal::from_f32(v).ok_or(out_of_range::<Decimal>(v)),
    Value::Float64(Some(v)) => Decimal::from_f64(v).ok_or(out_of_range::<Decimal>(v)),
);
impl_as_value!(String, Value::Varchar, |input: &str| Ok(input.to_owned()));
impl_as_value!(
    Uuid,
    Value::Uuid,
    |input: &str| {
        Uuid::parse_str(input.trim()).map_err(|e| {
            Error::new(e).context(format!("Cannot parse `{}` as Uuid", truncate_long!(input)))
        })
    },
);
impl_as_value!(
    Date,
    Value::Date,
    |input: &str| {
        Date::parse(input.trim(), format_description!("[year]-[month]-[day]")).map_err(|e| {
            Error::new(e).context(format!("Cannot parse `{}` as Date", truncate_long!(input)))
        })
    },
    Value::Timestamp(Some(v)) => Ok(v.date()),
);
impl_as_value!(
    Time,
    Value::Time,
    |input: &str| {
        let input = input.trim();
        for format in [
            format_description!("[hour]:[minute]:[second].[subsecond]"),
            format_description!("[hour]:[minute]:[second]"),
            format_description!("[hour]:[minute]"),
        ] {
            if let Ok(v) = Time::parse(input, format) {
                return Ok(v);
            }
        }
        Err(Error::msg(format!("Cannot parse `{}` as Time", truncate_long!(input))))
    },
    Value::Timestamp(Some(v)) => Ok(v.time()),
);
impl_as_value!(
    PrimitiveDateTime,
    Value::Timestamp,
    |input: &str| {
        let input = input.trim();
        for format in [
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        ] {
            if let Ok(v) = PrimitiveDateTime::parse(input, format) {
                return Ok(v);
            }
        }
        Err(Error::msg(format!("Cannot parse `{}` as Timestamp", truncate_long!(input))))
    },
    Value::TimestampWithTimezone(Some(v)) => {
        let v = v.to_utc();
        Ok(PrimitiveDateTime::new(v.date(), v.time()))
    },
);
impl_as_value!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    |input: &str| {
        let input = input.trim();
        for format in [
            format_description!(
                "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour]:[offset_minute]"
            ),
            format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour]:[offset_minute]"),
            format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond][offset_hour]:[offset_minute]"
            ),
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second][offset_hour]:[offset_minute]"),
        ] {
            if let Ok(v) = OffsetDateTime::parse(input, format) {
                return Ok(v);
            }
        }
        Err(Error::msg(format!(
            "Cannot parse `{}` as TimestampWithTimezone",
            truncate_long!(input)
        )))
    },
    Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
);

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        match value {
            Value::Blob(Some(v)) => Ok(v.into_vec()),
            _ => Err(conversion_error::<Self>(&value)),
        }
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::try_from_value(value).map(Some)
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        T::parse(input).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, time};

    #[test]
    fn integers() {
        assert_eq!(i32::parse("-123").unwrap(), -123);
        assert_eq!(i64::parse(" 9000000000 ").unwrap(), 9_000_000_000);
        assert!(i16::parse("40000").is_err());
        assert!(i32::parse("12abc").is_err());
        assert!(i32::parse("").is_err());
        assert_eq!(i64::try_from_value(Value::Int32(Some(5))).unwrap(), 5);
        assert!(i16::try_from_value(Value::Int64(Some(1 << 20))).is_err());
    }

    #[test]
    fn floats_and_decimals() {
        assert_eq!(f64::parse("1.5").unwrap(), 1.5);
        assert!(f32::parse("one").is_err());
        assert_eq!(
            Decimal::parse("12.30").unwrap(),
            Decimal::new(1230, 2)
        );
        assert_eq!(
            i32::try_from_value(Value::Decimal(Some(Decimal::new(42, 0)))).unwrap(),
            42
        );
        assert!(i32::try_from_value(Value::Decimal(Some(Decimal::new(425, 1)))).is_err());
    }

    #[test]
    fn booleans() {
        assert!(bool::parse("TRUE").unwrap());
        assert!(bool::parse("t").unwrap());
        assert!(!bool::parse("0").unwrap());
        assert!(bool::parse("yes").is_err());
        assert!(bool::try_from_value(Value::Int32(Some(3))).unwrap());
    }

    #[test]
    fn temporal() {
        assert_eq!(<Date as AsValue>::parse("2024-02-29").unwrap(), date!(2024 - 02 - 29));
        assert_eq!(<Time as AsValue>::parse("10:20:30").unwrap(), time!(10:20:30));
        assert_eq!(
            <PrimitiveDateTime as AsValue>::parse("2024-01-02 03:04:05.5").unwrap(),
            datetime!(2024-01-02 03:04:05.5)
        );
        assert_eq!(
            <OffsetDateTime as AsValue>::parse("2024-01-02T03:04:05+02:00").unwrap(),
            datetime!(2024-01-02 03:04:05 +02:00)
        );
    }

    #[test]
    fn options() {
        assert_eq!(Option::<i32>::None.as_value(), Value::Int32(None));
        assert_eq!(Some("a".to_string()).as_value(), Value::Varchar(Some("a".into())));
        assert_eq!(Option::<i32>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::try_from_value(Value::Varchar(Some("x".into()))).unwrap(),
            Some("x".into())
        );
    }

    #[test]
    fn strings_and_blobs() {
        assert_eq!(
            String::try_from_value(Value::Unknown(Some("raw".into()))).unwrap(),
            "raw"
        );
        assert!(String::try_from_value(Value::Int32(Some(1))).is_err());
        assert_eq!(
            Vec::<u8>::try_from_value(vec![1u8, 2, 3].as_value()).unwrap(),
            vec![1, 2, 3]
        );
    }
}
