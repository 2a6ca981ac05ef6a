//! Exact rational numbers over arbitrary-precision integers.

use std::{
    cmp::Ordering,
    fmt,
    ops::{Add, Mul, Neg, Sub},
    str::FromStr,
};

use num::{rational::Ratio, BigInt, Integer, One, Signed, ToPrimitive, Zero};

use crate::{Error, Result};

/// Fractional digits used by [fmt::Display].
const DISPLAY_DIGITS: usize = 30;

/// Fractional digits kept when converting from a double.
/// Every finite double has an exact decimal expansion at this length or shorter
/// for the magnitudes a viewport uses.
const F64_DIGITS: usize = 99;

/// `numer / denom`, with a positive denominator.
///
/// Arithmetic does not reduce; call [ExactRational::factor] to bring a value to lowest terms.
/// Comparison is by value, so reduced and unreduced forms are equal.
#[derive(Clone, Debug)]
pub struct ExactRational {
    numer: BigInt,
    denom: BigInt,
}

impl ExactRational {
    pub fn new(numer: BigInt, denom: BigInt) -> Result<Self> {
        if denom.is_zero() {
            return Err(Error::InvalidArgument("zero denominator".to_string()));
        }
        Ok(Self::new_unchecked(numer, denom))
    }

    fn new_unchecked(numer: BigInt, denom: BigInt) -> Self {
        if denom.is_negative() {
            ExactRational {
                numer: -numer,
                denom: -denom,
            }
        } else {
            ExactRational { numer, denom }
        }
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        ExactRational {
            numer: value.into(),
            denom: BigInt::one(),
        }
    }

    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    pub fn one() -> Self {
        Self::from_integer(1)
    }

    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "cannot represent {} as a rational",
                value
            )));
        }
        format!("{:.*}", F64_DIGITS, value).parse()
    }

    pub fn to_f64(&self) -> Result<f64> {
        Ratio::new_raw(self.numer.clone(), self.denom.clone())
            .to_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| Error::Overflow(format!("{} is outside the double range", self)))
    }

    pub fn numer(&self) -> &BigInt {
        &self.numer
    }

    pub fn denom(&self) -> &BigInt {
        &self.denom
    }

    pub fn is_zero(&self) -> bool {
        self.numer.is_zero()
    }

    /// Reduces to lowest terms.
    pub fn factor(&self) -> Self {
        let gcd = self.numer.gcd(&self.denom);
        if gcd.is_zero() || gcd.is_one() {
            return self.clone();
        }
        ExactRational {
            numer: &self.numer / &gcd,
            denom: &self.denom / &gcd,
        }
    }

    pub fn abs(&self) -> Self {
        ExactRational {
            numer: self.numer.abs(),
            denom: self.denom.clone(),
        }
    }

    pub fn recip(&self) -> Result<Self> {
        Self::new(self.denom.clone(), self.numer.clone())
    }

    pub fn checked_div(&self, other: &Self) -> Result<Self> {
        if other.is_zero() {
            return Err(Error::InvalidArgument("division by zero".to_string()));
        }
        Ok(Self::new_unchecked(
            &self.numer * &other.denom,
            &self.denom * &other.numer,
        ))
    }

    /// Integer power; negative exponents take the reciprocal first.
    pub fn pow(&self, exponent: i32) -> Result<Self> {
        let base = if exponent < 0 {
            self.recip()?
        } else {
            self.clone()
        };
        let n = exponent.unsigned_abs() as usize;
        Ok(ExactRational {
            numer: num::pow(base.numer, n),
            denom: num::pow(base.denom, n),
        })
    }

    /// The largest integer not above the value.
    pub fn floor(&self) -> Self {
        Self::from_integer(self.numer.div_floor(&self.denom))
    }

    /// The smallest integer not below the value.
    pub fn ceil(&self) -> Self {
        Self::from_integer(-(-&self.numer).div_floor(&self.denom))
    }

    /// Nearest integer; halves round up.
    pub fn round(&self) -> Self {
        let half = ExactRational {
            numer: BigInt::one(),
            denom: BigInt::from(2),
        };
        (self + &half).floor()
    }

    /// `self - floor(self / other) * other`, so the result has the sign of `other`.
    pub fn remainder(&self, other: &Self) -> Result<Self> {
        let whole = self.checked_div(other)?.floor();
        Ok(self - &(&whole * other))
    }

    /// Square root truncated to `precision` fractional digits.
    pub fn sqrt(&self, precision: usize) -> Result<Self> {
        if self.numer.is_negative() {
            return Err(Error::InvalidArgument(format!(
                "square root of negative value {}",
                self
            )));
        }
        // floor(sqrt(x)) == isqrt(floor(x)), so flooring the scaled radicand first is exact.
        let scale = num::pow(BigInt::from(10), precision);
        let radicand = &self.numer * &scale * &scale / &self.denom;
        Ok(Self::new_unchecked(radicand.sqrt(), scale).factor())
    }

    /// Base-10 logarithm; only defined for positive values.
    pub fn log10(&self) -> Result<f64> {
        if !self.numer.is_positive() {
            return Err(Error::InvalidArgument(format!(
                "logarithm of non-positive value {}",
                self
            )));
        }
        Ok(log10_magnitude(&self.numer) - log10_magnitude(&self.denom))
    }

    /// Whole part and proper fraction, as `"3 1/2"`; integers print alone.
    pub fn to_mixed_string(&self) -> String {
        let reduced = self.factor();
        let (whole, rest) = reduced.numer.div_rem(&reduced.denom);
        if rest.is_zero() {
            return whole.to_string();
        }
        if whole.is_zero() {
            return format!("{}/{}", rest, reduced.denom);
        }
        format!("{} {}/{}", whole, rest.abs(), reduced.denom)
    }

    /// Decimal rendering truncated to `precision` fractional digits, trailing zeros removed.
    pub fn to_decimal_string(&self, precision: usize) -> String {
        let scale = num::pow(BigInt::from(10), precision);
        let scaled = self.numer.abs() * scale / &self.denom;
        if scaled.is_zero() {
            return "0".to_string();
        }
        let digits = format!("{:0>width$}", scaled, width = precision + 1);
        let (whole, fraction) = digits.split_at(digits.len() - precision);
        let fraction = fraction.trim_end_matches('0');
        let sign = if self.numer.is_negative() { "-" } else { "" };
        if fraction.is_empty() {
            format!("{}{}", sign, whole)
        } else {
            format!("{}{}.{}", sign, whole, fraction)
        }
    }

    /// `n/d` in lowest terms.
    pub fn to_rational_string(&self) -> String {
        let reduced = self.factor();
        format!("{}/{}", reduced.numer, reduced.denom)
    }
}

/// log10 of a positive integer too large for a double: leading digits plus the digit count.
fn log10_magnitude(value: &BigInt) -> f64 {
    let digits = value.magnitude().to_string();
    let lead = digits.len().min(17);
    let leading: f64 = digits[..lead].parse().unwrap_or(1.0);
    leading.log10() + (digits.len() - lead) as f64
}

impl Add for &ExactRational {
    type Output = ExactRational;

    fn add(self, other: &ExactRational) -> ExactRational {
        if self.denom == other.denom {
            return ExactRational {
                numer: &self.numer + &other.numer,
                denom: self.denom.clone(),
            };
        }
        ExactRational {
            numer: &self.numer * &other.denom + &other.numer * &self.denom,
            denom: &self.denom * &other.denom,
        }
    }
}

impl Sub for &ExactRational {
    type Output = ExactRational;

    fn sub(self, other: &ExactRational) -> ExactRational {
        self + &-other
    }
}

impl Mul for &ExactRational {
    type Output = ExactRational;

    fn mul(self, other: &ExactRational) -> ExactRational {
        ExactRational {
            numer: &self.numer * &other.numer,
            denom: &self.denom * &other.denom,
        }
    }
}

impl Neg for &ExactRational {
    type Output = ExactRational;

    fn neg(self) -> ExactRational {
        ExactRational {
            numer: -&self.numer,
            denom: self.denom.clone(),
        }
    }
}

impl Ord for ExactRational {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.numer * &other.denom).cmp(&(&other.numer * &self.denom))
    }
}

impl PartialOrd for ExactRational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ExactRational {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ExactRational {}

impl FromStr for ExactRational {
    type Err = Error;

    /// Accepts `[-]int[.frac]` or `n/d`; the result is in lowest terms.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Parse(format!("not a rational number: {:?}", s));
        let text = s.trim();

        if let Some((numer, denom)) = text.split_once('/') {
            let numer: BigInt = numer.trim().parse().map_err(|_| bad())?;
            let denom: BigInt = denom.trim().parse().map_err(|_| bad())?;
            return Ok(Self::new(numer, denom)?.factor());
        }

        let (sign, unsigned) = match text.as_bytes().first() {
            Some(b'-') => ("-", &text[1..]),
            Some(b'+') => ("", &text[1..]),
            _ => ("", text),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if whole.len() + fraction.len() == 0
            || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(bad());
        }
        let numer: BigInt = format!("{}{}{}", sign, whole, fraction)
            .parse()
            .map_err(|_| bad())?;
        let denom = num::pow(BigInt::from(10), fraction.len());
        Ok(Self::new_unchecked(numer, denom).factor())
    }
}

impl fmt::Display for ExactRational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string(DISPLAY_DIGITS))
    }
}
