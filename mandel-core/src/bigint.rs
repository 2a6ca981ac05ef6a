//! Fixed-capacity, sign-magnitude decimal integers.
//!
//! A [FixedBigInt] stores one base-10 digit per byte, least-significant digit first,
//! in a buffer whose length is fixed when the value is created.
//! Arithmetic happens in place; any result that needs more digits than the buffer holds
//! fails with [Error::Overflow] and resets the receiver to zero.

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{Error, Result};

/// Digit capacity used when none is given.
pub const DEFAULT_MAX_DIGITS: usize = 128;

/// A signed decimal integer with a fixed maximum number of digits.
///
/// Invariants:
/// - `len >= 1`, and `digits[len - 1] != 0` unless the value is zero;
/// - every digit at or beyond `len` is zero;
/// - zero is `len == 1`, `digits[0] == 0`, and never negative.
#[derive(Clone)]
pub struct FixedBigInt {
    negative: bool,
    len: usize,
    digits: Vec<u8>,
}

impl FixedBigInt {
    /// Creates a zero with room for `max_digits` digits (at least one).
    pub fn new(max_digits: usize) -> Self {
        FixedBigInt {
            negative: false,
            len: 1,
            digits: vec![0; max_digits.max(1)],
        }
    }

    /// Zero, with the default capacity.
    pub fn zero() -> Self {
        Self::new(DEFAULT_MAX_DIGITS)
    }

    pub fn from_i64_with_capacity(value: i64, max_digits: usize) -> Result<Self> {
        let mut out = Self::new(max_digits);
        let magnitude = value.unsigned_abs();
        if decimal_len(magnitude) > out.max_digits() {
            return Err(overflow(max_digits));
        }
        out.len = write_digits(&mut out.digits, magnitude);
        out.negative = value < 0;
        Ok(out)
    }

    /// Converts the integer part of `value`, truncating toward zero.
    pub fn from_f64_with_capacity(value: f64, max_digits: usize) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "cannot represent {} as an integer",
                value
            )));
        }
        // Rust prints the exact integer value of a float; no binary/decimal rounding here.
        let text = format!("{:.0}", value.trunc());
        Self::parse_with_capacity(&text, max_digits)
    }

    pub fn parse_with_capacity(text: &str, max_digits: usize) -> Result<Self> {
        let trimmed = text.trim();
        let (negative, body) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::Parse(format!("not an integer: {:?}", text)));
        }
        let significant = body.trim_start_matches('0');
        let mut out = Self::new(max_digits);
        if significant.is_empty() {
            return Ok(out);
        }
        if significant.len() > out.max_digits() {
            return Err(overflow(max_digits));
        }
        for (slot, b) in out.digits.iter_mut().zip(significant.bytes().rev()) {
            *slot = b - b'0';
        }
        out.len = significant.len();
        out.negative = negative;
        Ok(out)
    }

    pub fn max_digits(&self) -> usize {
        self.digits.len()
    }

    /// Number of significant digits; one for zero.
    pub fn num_digits(&self) -> usize {
        self.len
    }

    /// The digit at `10^index`, zero past the significant length.
    pub fn digit(&self, index: usize) -> u8 {
        if index < self.len {
            self.digits[index]
        } else {
            0
        }
    }

    /// Significant digits, least-significant first.
    pub fn magnitude(&self) -> &[u8] {
        &self.digits[..self.len]
    }

    pub fn is_zero(&self) -> bool {
        self.len == 1 && self.digits[0] == 0
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// -1, 0 or 1.
    pub fn signum(&self) -> i32 {
        if self.is_zero() {
            0
        } else if self.negative {
            -1
        } else {
            1
        }
    }

    /// The least-significant digit.
    pub fn mod10(&self) -> u8 {
        self.digits[0]
    }

    pub fn set_zero(&mut self) {
        self.digits[..self.len].fill(0);
        self.len = 1;
        self.negative = false;
    }

    /// Copies `other` into this value, keeping this value's capacity.
    pub fn assign(&mut self, other: &FixedBigInt) -> Result<()> {
        if other.len > self.max_digits() {
            self.set_zero();
            return Err(overflow(self.max_digits()));
        }
        self.digits[..self.len].fill(0);
        self.digits[..other.len].copy_from_slice(other.magnitude());
        self.len = other.len;
        self.negative = other.negative;
        Ok(())
    }

    pub fn negate(&mut self) {
        if !self.is_zero() {
            self.negative = !self.negative;
        }
    }

    pub fn abs(&self) -> Self {
        let mut out = self.clone();
        out.negative = false;
        out
    }

    /// Multiplies by `10^power`.
    pub fn mul_pow10(&mut self, power: usize) -> Result<()> {
        if self.is_zero() || power == 0 {
            return Ok(());
        }
        let new_len = self.len + power;
        if new_len > self.max_digits() {
            self.set_zero();
            return Err(overflow(self.max_digits()));
        }
        self.digits.copy_within(0..self.len, power);
        self.digits[..power].fill(0);
        self.len = new_len;
        Ok(())
    }

    /// Divides by `10^power`, truncating toward zero.
    /// Dividing by a power at or beyond the digit count yields zero.
    pub fn div_pow10(&mut self, power: usize) {
        if self.is_zero() || power == 0 {
            return;
        }
        if power >= self.len {
            self.set_zero();
            return;
        }
        self.digits.copy_within(power..self.len, 0);
        self.digits[self.len - power..self.len].fill(0);
        self.len -= power;
    }

    /// Multiplies (positive `power`) or divides (negative `power`) by a power of ten.
    pub fn shift_pow10(&mut self, power: i32) -> Result<()> {
        if power >= 0 {
            self.mul_pow10(power as usize)
        } else {
            self.div_pow10(power.unsigned_abs() as usize);
            Ok(())
        }
    }

    pub fn add_assign(&mut self, other: &FixedBigInt) -> Result<()> {
        self.add_signed(other.magnitude(), other.negative)
    }

    pub fn sub_assign(&mut self, other: &FixedBigInt) -> Result<()> {
        if other.is_zero() {
            return Ok(());
        }
        self.add_signed(other.magnitude(), !other.negative)
    }

    /// Schoolbook multiplication.
    pub fn mul_assign(&mut self, other: &FixedBigInt) -> Result<()> {
        if self.is_zero() {
            return Ok(());
        }
        if other.is_zero() {
            self.set_zero();
            return Ok(());
        }

        let accumulator = {
            let a = self.magnitude();
            let b = other.magnitude();
            let mut acc = vec![0u32; a.len() + b.len() + 2];
            for (i, &da) in a.iter().enumerate() {
                if da == 0 {
                    continue;
                }
                for (j, &db) in b.iter().enumerate() {
                    acc[i + j] += u32::from(da) * u32::from(db);
                }
            }
            let mut carry = 0u32;
            for cell in acc.iter_mut() {
                let v = *cell + carry;
                *cell = v % 10;
                carry = v / 10;
            }
            acc
        };

        let len = accumulator
            .iter()
            .rposition(|&d| d != 0)
            .map_or(1, |top| top + 1);
        if len > self.max_digits() {
            self.set_zero();
            return Err(overflow(self.max_digits()));
        }
        self.digits[..self.len].fill(0);
        for (slot, &d) in self.digits.iter_mut().zip(&accumulator[..len]) {
            *slot = d as u8;
        }
        self.len = len;
        self.negative = self.negative != other.negative;
        Ok(())
    }

    /// Long division, truncating toward zero.
    ///
    /// Quotient digits are produced most-significant first; each is the number of times the
    /// divisor, shifted to that magnitude, can be taken from the running remainder.
    pub fn div_assign(&mut self, divisor: &FixedBigInt) -> Result<()> {
        if divisor.is_zero() {
            return Err(Error::InvalidArgument("division by zero".to_string()));
        }
        let negative = self.negative != divisor.negative;
        let d = divisor.magnitude();
        if cmp_magnitude(self.magnitude(), d) == Ordering::Less {
            self.set_zero();
            return Ok(());
        }

        let mut remainder = self.magnitude().to_vec();
        let top = remainder.len() - d.len();
        let mut quotient = vec![0u8; top + 1];
        for m in (0..=top).rev() {
            let mut trial = 0u8;
            while cmp_shifted(&remainder, d, m) != Ordering::Less {
                sub_shifted(&mut remainder, d, m);
                trial += 1;
            }
            debug_assert!(trial <= 9, "quotient digit {} out of range", trial);
            quotient[m] = trial;
        }

        self.digits[..self.len].fill(0);
        self.digits[..quotient.len()].copy_from_slice(&quotient);
        self.len = quotient.len();
        self.negative = negative;
        self.trim();
        Ok(())
    }

    pub fn checked_add(&self, other: &FixedBigInt) -> Result<Self> {
        let mut out = self.clone();
        out.add_assign(other)?;
        Ok(out)
    }

    pub fn checked_sub(&self, other: &FixedBigInt) -> Result<Self> {
        let mut out = self.clone();
        out.sub_assign(other)?;
        Ok(out)
    }

    pub fn checked_mul(&self, other: &FixedBigInt) -> Result<Self> {
        let mut out = self.clone();
        out.mul_assign(other)?;
        Ok(out)
    }

    pub fn checked_div(&self, other: &FixedBigInt) -> Result<Self> {
        let mut out = self.clone();
        out.div_assign(other)?;
        Ok(out)
    }

    /// Nearest double; exact up to 15 significant digits.
    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    fn add_signed(&mut self, other: &[u8], other_negative: bool) -> Result<()> {
        if other.len() > self.max_digits() {
            self.set_zero();
            return Err(overflow(self.max_digits()));
        }
        if other == [0] {
            return Ok(());
        }
        if self.is_zero() || self.negative == other_negative {
            self.negative = other_negative;
            return self.add_magnitude(other);
        }
        match cmp_magnitude(self.magnitude(), other) {
            Ordering::Equal => self.set_zero(),
            Ordering::Greater => self.sub_magnitude(other),
            Ordering::Less => {
                self.sub_from_magnitude(other);
                self.negative = other_negative;
            }
        }
        Ok(())
    }

    fn add_magnitude(&mut self, other: &[u8]) -> Result<()> {
        let n = self.len.max(other.len());
        let mut carry = 0u8;
        for i in 0..n {
            let sum = self.digits[i] + other.get(i).copied().unwrap_or(0) + carry;
            if sum >= 10 {
                self.digits[i] = sum - 10;
                carry = 1;
            } else {
                self.digits[i] = sum;
                carry = 0;
            }
        }
        self.len = n;
        if carry > 0 {
            if n == self.max_digits() {
                self.set_zero();
                return Err(overflow(self.max_digits()));
            }
            self.digits[n] = carry;
            self.len = n + 1;
        }
        Ok(())
    }

    /// `|self| -= other`; requires `|self| > other`.
    fn sub_magnitude(&mut self, other: &[u8]) {
        let mut borrow = 0i8;
        for i in 0..self.len {
            let mut d = self.digits[i] as i8 - other.get(i).copied().unwrap_or(0) as i8 - borrow;
            if d < 0 {
                d += 10;
                borrow = 1;
            } else {
                borrow = 0;
            }
            self.digits[i] = d as u8;
        }
        self.trim();
    }

    /// `|self| = other - |self|`; requires `other > |self|`.
    fn sub_from_magnitude(&mut self, other: &[u8]) {
        let mut borrow = 0i8;
        for (i, &o) in other.iter().enumerate() {
            let mut d = o as i8 - self.digits[i] as i8 - borrow;
            if d < 0 {
                d += 10;
                borrow = 1;
            } else {
                borrow = 0;
            }
            self.digits[i] = d as u8;
        }
        self.len = other.len();
        self.trim();
    }

    fn trim(&mut self) {
        while self.len > 1 && self.digits[self.len - 1] == 0 {
            self.len -= 1;
        }
        if self.is_zero() {
            self.negative = false;
        }
    }
}

fn overflow(max_digits: usize) -> Error {
    Error::Overflow(format!("result exceeds {} decimal digits", max_digits))
}

fn decimal_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 10 {
        value /= 10;
        len += 1;
    }
    len
}

/// Writes the digits of `value` into `digits`, returning the significant length.
fn write_digits(digits: &mut [u8], mut value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let mut len = 0;
    while value > 0 {
        digits[len] = (value % 10) as u8;
        value /= 10;
        len += 1;
    }
    len
}

/// Compares two trimmed magnitudes.
fn cmp_magnitude(a: &[u8], b: &[u8]) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.iter().rev().cmp(b.iter().rev()))
}

/// Compares the trimmed remainder against `divisor * 10^shift`.
fn cmp_shifted(remainder: &[u8], divisor: &[u8], shift: usize) -> Ordering {
    let shifted_len = divisor.len() + shift;
    if remainder.len() != shifted_len {
        return remainder.len().cmp(&shifted_len);
    }
    for i in (0..remainder.len()).rev() {
        let d = if i >= shift { divisor[i - shift] } else { 0 };
        match remainder[i].cmp(&d) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// `remainder -= divisor * 10^shift`, then trims; requires the result to be non-negative.
fn sub_shifted(remainder: &mut Vec<u8>, divisor: &[u8], shift: usize) {
    let mut borrow = 0i8;
    for i in shift..remainder.len() {
        let sub = divisor.get(i - shift).copied().unwrap_or(0) as i8;
        if sub == 0 && borrow == 0 && i >= shift + divisor.len() {
            break;
        }
        let mut d = remainder[i] as i8 - sub - borrow;
        if d < 0 {
            d += 10;
            borrow = 1;
        } else {
            borrow = 0;
        }
        remainder[i] = d as u8;
    }
    while remainder.len() > 1 && remainder[remainder.len() - 1] == 0 {
        remainder.pop();
    }
}

impl From<i64> for FixedBigInt {
    fn from(value: i64) -> Self {
        let mut out = Self::zero();
        // At most 19 digits, well inside the default capacity.
        out.len = write_digits(&mut out.digits, value.unsigned_abs());
        out.negative = value < 0;
        out
    }
}

impl FromStr for FixedBigInt {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_with_capacity(s, DEFAULT_MAX_DIGITS)
    }
}

impl PartialEq for FixedBigInt {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FixedBigInt {}

impl PartialOrd for FixedBigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FixedBigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => cmp_magnitude(self.magnitude(), other.magnitude()),
            (true, true) => cmp_magnitude(other.magnitude(), self.magnitude()),
        }
    }
}

impl fmt::Display for FixedBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits: String = self
            .magnitude()
            .iter()
            .rev()
            .map(|&d| char::from(b'0' + d))
            .collect();
        f.pad_integral(!self.negative, "", &digits)
    }
}

impl fmt::Debug for FixedBigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedBigInt({}; cap {})", self, self.max_digits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;

    fn big(s: &str) -> FixedBigInt {
        s.parse().unwrap()
    }

    fn reference(s: &str) -> BigInt {
        s.parse().unwrap()
    }

    /// A spread of magnitudes, including carries across every digit.
    fn samples() -> Vec<String> {
        let mut values: Vec<String> = [
            "0",
            "1",
            "9",
            "10",
            "99",
            "100",
            "999999999",
            "1000000000",
            "123456789012345678901234567890",
            "99999999999999999999999999999999999999",
            "500000000000000000000",
            "7",
            "31415926535897932384626433832795028841971",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        // Deterministic pseudo-random values.
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        for _ in 0..12 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            values.push((state % 10_000_000_000_000).to_string());
        }
        values
    }

    fn signed(values: &[String]) -> Vec<String> {
        values
            .iter()
            .flat_map(|v| {
                if v == "0" {
                    vec![v.clone()]
                } else {
                    vec![v.clone(), format!("-{}", v)]
                }
            })
            .collect()
    }

    #[test]
    fn zero_is_canonical() {
        let z = FixedBigInt::zero();
        assert!(z.is_zero());
        assert_eq!(z.num_digits(), 1);
        assert!(!z.is_negative());
        assert_eq!(z.to_string(), "0");
        assert_eq!(big("-0"), z);
        assert!(!big("-0").is_negative());
        assert_eq!(big("000120").to_string(), "120");
    }

    #[test]
    fn add_matches_reference() {
        let values = signed(&samples());
        for a in &values {
            for b in &values {
                let got = big(a).checked_add(&big(b)).unwrap();
                let want = reference(a) + reference(b);
                assert_eq!(got.to_string(), want.to_string(), "{} + {}", a, b);
            }
        }
    }

    #[test]
    fn subtract_matches_reference() {
        let values = signed(&samples());
        for a in &values {
            for b in &values {
                let got = big(a).checked_sub(&big(b)).unwrap();
                let want = reference(a) - reference(b);
                assert_eq!(got.to_string(), want.to_string(), "{} - {}", a, b);
            }
        }
    }

    #[test]
    fn add_then_subtract_restores() {
        let values = signed(&samples());
        for a in &values {
            for b in &values {
                let mut v = big(a);
                v.add_assign(&big(b)).unwrap();
                v.sub_assign(&big(b)).unwrap();
                assert_eq!(v, big(a), "{} + {} - {}", a, b, b);
            }
        }
    }

    #[test]
    fn zero_result_is_positive() {
        let mut v = big("-12345");
        v.add_assign(&big("12345")).unwrap();
        assert!(v.is_zero());
        assert!(!v.is_negative());
        assert_eq!(v.signum(), 0);
    }

    #[test]
    fn multiply_matches_reference() {
        let values = signed(&samples());
        for a in &values {
            for b in &values {
                let got = big(a).checked_mul(&big(b)).unwrap();
                let want = reference(a) * reference(b);
                assert_eq!(got.to_string(), want.to_string(), "{} * {}", a, b);
            }
        }
    }

    #[test]
    fn divide_matches_reference() {
        let values = signed(&samples());
        for a in &values {
            for b in values.iter().filter(|b| b.as_str() != "0") {
                let got = big(a).checked_div(&big(b)).unwrap();
                // BigInt division truncates toward zero, like ours.
                let want = reference(a) / reference(b);
                assert_eq!(got.to_string(), want.to_string(), "{} / {}", a, b);
            }
        }
    }

    #[test]
    fn divide_by_zero_is_invalid() {
        let err = big("12").checked_div(&FixedBigInt::zero()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn powers_of_ten() {
        let mut v = big("-123");
        v.mul_pow10(3).unwrap();
        assert_eq!(v.to_string(), "-123000");
        v.div_pow10(4);
        assert_eq!(v.to_string(), "-12");
        v.shift_pow10(-2).unwrap();
        assert!(v.is_zero());
        assert!(!v.is_negative());

        let mut w = big("45");
        w.shift_pow10(2).unwrap();
        assert_eq!(w, big("4500"));
        assert_eq!(w.mod10(), 0);
    }

    #[test]
    fn capacity_overflow_is_reported() {
        let mut v = FixedBigInt::from_i64_with_capacity(99_999, 5).unwrap();
        let err = v.add_assign(&FixedBigInt::from(1)).unwrap_err();
        assert!(matches!(err, Error::Overflow(_)));
        assert!(v.is_zero());

        let mut w = FixedBigInt::from_i64_with_capacity(1234, 6).unwrap();
        assert!(matches!(w.mul_assign(&big("1234")), Err(Error::Overflow(_))));

        let mut x = FixedBigInt::from_i64_with_capacity(12, 4).unwrap();
        assert!(x.mul_pow10(3).is_err());
        assert!(FixedBigInt::from_i64_with_capacity(123_456, 5).is_err());
        assert!(FixedBigInt::parse_with_capacity("123456", 5).is_err());
    }

    #[test]
    fn ordering_uses_sign_then_magnitude() {
        let mut values: Vec<FixedBigInt> = ["5", "-5", "0", "-100", "100", "99", "-99"]
            .iter()
            .map(|s| big(s))
            .collect();
        values.sort();
        let sorted: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        assert_eq!(sorted, ["-100", "-99", "-5", "0", "5", "99", "100"]);
    }

    #[test]
    fn float_conversions() {
        assert_eq!(
            FixedBigInt::from_f64_with_capacity(-1234.99, 10).unwrap(),
            big("-1234")
        );
        assert_eq!(FixedBigInt::from_f64_with_capacity(1e20, 30).unwrap().num_digits(), 21);
        assert!(FixedBigInt::from_f64_with_capacity(f64::NAN, 10).is_err());
        assert_eq!(big("-987654321").to_f64(), -987654321.0);
    }

    #[test]
    fn parse_rejects_garbage() {
        for text in ["", "-", "12a", "1.5", "--1", " "] {
            assert!(matches!(text.parse::<FixedBigInt>(), Err(Error::Parse(_))), "{:?}", text);
        }
        assert_eq!(big(" +42 "), FixedBigInt::from(42));
    }
}
