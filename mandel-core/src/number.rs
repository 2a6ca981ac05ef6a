use std::fmt::{Debug, Display};

use num::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::{decimal::FixedDecimal, rational::ExactRational, Error, Result};

/// A numeric type that can be used for the Mandelbrot iteration.
///
/// This trait identifies the operations needed to compute an image:
/// - Conversions from integers, doubles and strings, to place the viewport
/// - Addition, subtraction, multiplication and division, all fallible
/// - Comparison, for the bailout check
/// - A truncation hook, for types whose digits grow without bound
///
/// Arithmetic returns new values; implementations that allocate do so per operation.
pub trait Scalar: Sized + Clone + PartialOrd + Debug + Display + Send + Sync {
    fn zero() -> Self;

    fn from_i32(value: i32) -> Self;

    /// Converts from a double; fails if the value cannot be represented.
    fn from_f64(value: f64) -> Result<Self>;

    fn to_f64(&self) -> Result<f64>;

    /// Parses a coordinate entered as text.
    fn parse(text: &str) -> Result<Self>;

    fn try_add(&self, other: &Self) -> Result<Self>;

    fn try_sub(&self, other: &Self) -> Result<Self>;

    fn try_mul(&self, other: &Self) -> Result<Self>;

    /// Fails with [Error::InvalidArgument] when `other` is zero.
    fn try_div(&self, other: &Self) -> Result<Self>;

    fn neg(&self) -> Self;

    /// Bounds the precision of a value. Only digit-array decimals do anything here.
    fn truncate(&mut self) {}

    /// The escape test: `re_sq + im_sq` is not below `bailout`.
    /// A sum that doesn't compare (NaN) counts as escaped.
    fn escapes(re_sq: &Self, im_sq: &Self, bailout: &Self) -> Result<bool> {
        let magnitude = re_sq.try_add(im_sq)?;
        Ok(!(magnitude < *bailout))
    }
}

fn division_by_zero() -> Error {
    Error::InvalidArgument("division by zero".to_string())
}

macro_rules! impl_float {
    ($t:ty) => {
        impl Scalar for $t {
            fn zero() -> Self {
                0.0
            }

            fn from_i32(value: i32) -> Self {
                value as $t
            }

            fn from_f64(value: f64) -> Result<Self> {
                let narrowed = value as $t;
                if value.is_finite() && !narrowed.is_finite() {
                    return Err(Error::Overflow(format!(
                        "{} is out of range for {}",
                        value,
                        stringify!($t)
                    )));
                }
                Ok(narrowed)
            }

            fn to_f64(&self) -> Result<f64> {
                Ok(f64::from(*self))
            }

            fn parse(text: &str) -> Result<Self> {
                text.trim()
                    .parse()
                    .map_err(|e| Error::Parse(format!("{:?}: {}", text, e)))
            }

            fn try_add(&self, other: &Self) -> Result<Self> {
                Ok(self + other)
            }

            fn try_sub(&self, other: &Self) -> Result<Self> {
                Ok(self - other)
            }

            fn try_mul(&self, other: &Self) -> Result<Self> {
                Ok(self * other)
            }

            fn try_div(&self, other: &Self) -> Result<Self> {
                if *other == 0.0 {
                    return Err(division_by_zero());
                }
                Ok(self / other)
            }

            fn neg(&self) -> Self {
                -self
            }
        }
    };
}

impl_float!(f32);
impl_float!(f64);

impl<const P: usize, const T: bool> Scalar for FixedDecimal<P, T> {
    fn zero() -> Self {
        FixedDecimal::zero()
    }

    fn from_i32(value: i32) -> Self {
        FixedDecimal::from_i64(value.into())
    }

    fn from_f64(value: f64) -> Result<Self> {
        FixedDecimal::from_f64(value)
    }

    fn to_f64(&self) -> Result<f64> {
        let value = FixedDecimal::to_f64(self);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Error::Overflow(format!("{} is outside the double range", self)))
        }
    }

    fn parse(text: &str) -> Result<Self> {
        text.parse()
    }

    fn try_add(&self, other: &Self) -> Result<Self> {
        self.checked_add(other)
    }

    fn try_sub(&self, other: &Self) -> Result<Self> {
        self.checked_sub(other)
    }

    fn try_mul(&self, other: &Self) -> Result<Self> {
        self.checked_mul(other)
    }

    fn try_div(&self, other: &Self) -> Result<Self> {
        self.checked_div(other)
    }

    fn neg(&self) -> Self {
        let mut out = self.clone();
        out.negate();
        out
    }

    fn truncate(&mut self) {
        FixedDecimal::truncate(self)
    }
}

impl Scalar for ExactRational {
    fn zero() -> Self {
        ExactRational::zero()
    }

    fn from_i32(value: i32) -> Self {
        ExactRational::from_integer(value)
    }

    fn from_f64(value: f64) -> Result<Self> {
        ExactRational::from_f64(value)
    }

    fn to_f64(&self) -> Result<f64> {
        ExactRational::to_f64(self)
    }

    fn parse(text: &str) -> Result<Self> {
        text.parse()
    }

    fn try_add(&self, other: &Self) -> Result<Self> {
        Ok(self + other)
    }

    fn try_sub(&self, other: &Self) -> Result<Self> {
        Ok(self - other)
    }

    fn try_mul(&self, other: &Self) -> Result<Self> {
        Ok(self * other)
    }

    fn try_div(&self, other: &Self) -> Result<Self> {
        self.checked_div(other)
    }

    fn neg(&self) -> Self {
        -self
    }
}

fn decimal_overflow(op: &str) -> Error {
    Error::Overflow(format!("decimal {} out of range", op))
}

impl Scalar for Decimal {
    fn zero() -> Self {
        Decimal::ZERO
    }

    fn from_i32(value: i32) -> Self {
        Decimal::from(value)
    }

    fn from_f64(value: f64) -> Result<Self> {
        <Decimal as FromPrimitive>::from_f64(value).ok_or_else(|| {
            Error::Overflow(format!("{} is out of range for a 128-bit decimal", value))
        })
    }

    fn to_f64(&self) -> Result<f64> {
        ToPrimitive::to_f64(self)
            .ok_or_else(|| Error::Overflow(format!("{} has no double equivalent", self)))
    }

    fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        text.parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(|e| Error::Parse(format!("{:?}: {}", text, e)))
    }

    fn try_add(&self, other: &Self) -> Result<Self> {
        self.checked_add(*other).ok_or_else(|| decimal_overflow("sum"))
    }

    fn try_sub(&self, other: &Self) -> Result<Self> {
        self.checked_sub(*other)
            .ok_or_else(|| decimal_overflow("difference"))
    }

    // Products and quotients are normalized so trailing zeros of the scale don't accumulate.
    fn try_mul(&self, other: &Self) -> Result<Self> {
        self.checked_mul(*other)
            .map(|v| v.normalize())
            .ok_or_else(|| decimal_overflow("product"))
    }

    fn try_div(&self, other: &Self) -> Result<Self> {
        if other.is_zero() {
            return Err(division_by_zero());
        }
        self.checked_div(*other)
            .map(|v| v.normalize())
            .ok_or_else(|| decimal_overflow("quotient"))
    }

    fn neg(&self) -> Self {
        -*self
    }
}
