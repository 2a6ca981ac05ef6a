use std::{cmp::Ordering, fmt};

use num::complex::Complex64;

use crate::{number::Scalar, Error, Result};

/// A complex double used as a scalar.
///
/// Values placed by the viewport are purely real; the imaginary part only carries what
/// arithmetic puts there. Ordering, and so the bailout check, looks at the real part.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexScalar(pub Complex64);

impl ComplexScalar {
    pub fn real(value: f64) -> Self {
        ComplexScalar(Complex64::new(value, 0.0))
    }
}

impl PartialOrd for ComplexScalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.re.partial_cmp(&other.0.re)
    }
}

impl fmt::Display for ComplexScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.im == 0.0 {
            write!(f, "{}", self.0.re)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Scalar for ComplexScalar {
    fn zero() -> Self {
        Self::real(0.0)
    }

    fn from_i32(value: i32) -> Self {
        Self::real(value.into())
    }

    fn from_f64(value: f64) -> Result<Self> {
        Ok(Self::real(value))
    }

    fn to_f64(&self) -> Result<f64> {
        Ok(self.0.re)
    }

    /// Accepts a real number or `a+bi`.
    fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(value) = text.parse::<f64>() {
            return Ok(Self::real(value));
        }
        text.parse::<Complex64>()
            .map(ComplexScalar)
            .map_err(|e| Error::Parse(format!("{:?}: {}", text, e)))
    }

    fn try_add(&self, other: &Self) -> Result<Self> {
        Ok(ComplexScalar(self.0 + other.0))
    }

    fn try_sub(&self, other: &Self) -> Result<Self> {
        Ok(ComplexScalar(self.0 - other.0))
    }

    fn try_mul(&self, other: &Self) -> Result<Self> {
        Ok(ComplexScalar(self.0 * other.0))
    }

    fn try_div(&self, other: &Self) -> Result<Self> {
        if other.0.re == 0.0 && other.0.im == 0.0 {
            return Err(Error::InvalidArgument("division by zero".to_string()));
        }
        Ok(ComplexScalar(self.0 / other.0))
    }

    fn neg(&self) -> Self {
        ComplexScalar(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_forms() {
        assert_eq!(ComplexScalar::parse("1.5").unwrap(), ComplexScalar::real(1.5));
        assert_eq!(
            ComplexScalar::parse("1+2i").unwrap(),
            ComplexScalar(Complex64::new(1.0, 2.0))
        );
        assert!(ComplexScalar::parse("abc").is_err());
    }

    #[test]
    fn ordering_uses_real_part() {
        let a = ComplexScalar(Complex64::new(1.0, 100.0));
        let b = ComplexScalar(Complex64::new(2.0, -100.0));
        assert!(a < b);
        assert_eq!(a.to_string(), "1+100i");
        assert_eq!(ComplexScalar::real(-0.5).to_string(), "-0.5");
    }

    #[test]
    fn multiplication_is_complex() {
        let i = ComplexScalar(Complex64::new(0.0, 1.0));
        assert_eq!(i.try_mul(&i).unwrap(), ComplexScalar::real(-1.0));
    }
}
