//! Bounded-precision decimal numbers built on [FixedBigInt].

use std::{cmp::Ordering, fmt, str::FromStr};

use crate::{
    bigint::{FixedBigInt, DEFAULT_MAX_DIGITS},
    Error, Result,
};

/// A decimal `mantissa * 10^exponent`.
///
/// `P` is the number of significant digits kept by [FixedDecimal::truncate].
/// Intermediate results may carry more digits than `P`, up to the mantissa's capacity;
/// callers in hot loops truncate explicitly.
/// With `ALWAYS_TRUNCATE` set, every multiplication truncates its result.
#[derive(Clone, Debug)]
pub struct FixedDecimal<const P: usize, const ALWAYS_TRUNCATE: bool = false> {
    mantissa: FixedBigInt,
    exponent: i32,
}

pub type Decimal10 = FixedDecimal<10>;
pub type Decimal16 = FixedDecimal<16>;

impl<const P: usize, const T: bool> FixedDecimal<P, T> {
    pub fn new(mantissa: FixedBigInt, exponent: i32) -> Self {
        FixedDecimal { mantissa, exponent }
    }

    pub fn zero() -> Self {
        Self::new(FixedBigInt::new(DEFAULT_MAX_DIGITS), 0)
    }

    pub fn from_i64(value: i64) -> Self {
        let mut out = Self::new(FixedBigInt::from(value), 0);
        out.normalize();
        out
    }

    /// Converts through the shortest decimal rendering that round-trips to `value`.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "cannot represent {} as a decimal",
                value
            )));
        }
        format!("{:e}", value).parse()
    }

    /// Nearest double; infinite when the value is outside the double range.
    pub fn to_f64(&self) -> f64 {
        format!("{}e{}", self.mantissa, self.exponent)
            .parse()
            .unwrap_or(f64::NAN)
    }

    pub fn mantissa(&self) -> &FixedBigInt {
        &self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn negate(&mut self) {
        self.mantissa.negate();
    }

    /// Keeps the `P` most significant digits, dropping the rest into the exponent.
    pub fn truncate(&mut self) {
        let digits = self.mantissa.num_digits();
        if digits > P {
            let drop = digits - P;
            self.mantissa.div_pow10(drop);
            self.exponent = self.exponent.saturating_add(drop as i32);
        }
    }

    /// Moves trailing zero digits of the mantissa into the exponent.
    pub fn normalize(&mut self) {
        if self.mantissa.is_zero() {
            self.exponent = 0;
            return;
        }
        let zeros = self
            .mantissa
            .magnitude()
            .iter()
            .take_while(|&&d| d == 0)
            .count();
        if zeros > 0 {
            self.mantissa.div_pow10(zeros);
            self.exponent = self.exponent.saturating_add(zeros as i32);
        }
    }

    pub fn checked_add(&self, other: &Self) -> Result<Self> {
        if other.is_zero() {
            return Ok(self.clone());
        }
        if self.is_zero() {
            return Ok(other.clone());
        }
        let (high, low) = if self.exponent >= other.exponent {
            (self, other)
        } else {
            (other, self)
        };

        // Scale the larger-exponent mantissa down to the other's exponent,
        // keeping one digit free for a carry.
        let mut diff = (i64::from(high.exponent) - i64::from(low.exponent)) as u64;
        let room = high
            .mantissa
            .max_digits()
            .saturating_sub(1)
            .saturating_sub(high.mantissa.num_digits()) as u64;
        let mut low_mantissa = low.mantissa.clone();
        if diff > room {
            // Too far apart to align exactly: drop the low operand's least significant digits.
            let excess = diff - room;
            low_mantissa.div_pow10(usize::try_from(excess).unwrap_or(usize::MAX));
            diff = room;
        }
        let exponent = high.exponent - diff as i32;

        let mut mantissa = high.mantissa.clone();
        mantissa.mul_pow10(diff as usize)?;
        mantissa.add_assign(&low_mantissa)?;
        Ok(Self::new(mantissa, exponent))
    }

    pub fn checked_sub(&self, other: &Self) -> Result<Self> {
        let mut negated = other.clone();
        negated.negate();
        self.checked_add(&negated)
    }

    pub fn checked_mul(&self, other: &Self) -> Result<Self> {
        let mantissa = self.mantissa.checked_mul(&other.mantissa)?;
        let exponent = self
            .exponent
            .checked_add(other.exponent)
            .ok_or_else(|| Error::Overflow("decimal exponent out of range".to_string()))?;
        let mut out = Self::new(mantissa, exponent);
        if T {
            out.truncate();
        }
        Ok(out)
    }

    /// Division keeping roughly `P` significant digits of quotient.
    pub fn checked_div(&self, other: &Self) -> Result<Self> {
        if other.is_zero() {
            return Err(Error::InvalidArgument("division by zero".to_string()));
        }
        let spread = self.mantissa.num_digits() as i64 - other.mantissa.num_digits() as i64;
        let change = (P as i64 - spread).max(0);
        let mut mantissa = self.mantissa.clone();
        mantissa.mul_pow10(change as usize)?;
        mantissa.div_assign(&other.mantissa)?;
        let exponent = i64::from(self.exponent) - i64::from(other.exponent) - change;
        let exponent = i32::try_from(exponent)
            .map_err(|_| Error::Overflow("decimal exponent out of range".to_string()))?;
        Ok(Self::new(mantissa, exponent))
    }

    /// Position just above the most significant digit.
    fn top(&self) -> i64 {
        self.mantissa.num_digits() as i64 + i64::from(self.exponent)
    }

    /// The digit at `10^position` of the magnitude.
    fn digit_at(&self, position: i64) -> u8 {
        let index = position - i64::from(self.exponent);
        if index < 0 {
            0
        } else {
            self.mantissa.digit(index as usize)
        }
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        let top = self.top();
        match top.cmp(&other.top()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        let bottom = i64::from(self.exponent.min(other.exponent));
        for position in (bottom..top).rev() {
            match self.digit_at(position).cmp(&other.digit_at(position)) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl<const P: usize, const T: bool> Ord for FixedDecimal<P, T> {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.mantissa.signum(), other.mantissa.signum());
        if a != b {
            return a.cmp(&b);
        }
        match a {
            0 => Ordering::Equal,
            1 => self.cmp_magnitude(other),
            _ => other.cmp_magnitude(self),
        }
    }
}

impl<const P: usize, const T: bool> PartialOrd for FixedDecimal<P, T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<const P: usize, const T: bool> PartialEq for FixedDecimal<P, T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<const P: usize, const T: bool> Eq for FixedDecimal<P, T> {}

impl<const P: usize, const T: bool> FromStr for FixedDecimal<P, T> {
    type Err = Error;

    /// Accepts `[-]int[.frac][e[-]exp]`.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::Parse(format!("not a decimal number: {:?}", s));
        let text = s.trim();
        let (number, exponent) = match text.find(['e', 'E']) {
            Some(at) => {
                let exponent: i32 = text[at + 1..].parse().map_err(|_| bad())?;
                (&text[..at], exponent)
            }
            None => (text, 0),
        };
        let (sign, unsigned) = match number.as_bytes().first() {
            Some(b'-') => ("-", &number[1..]),
            Some(b'+') => ("", &number[1..]),
            _ => ("", number),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if whole.len() + fraction.len() == 0
            || !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(bad());
        }

        let digits = format!("{}{}{}", sign, whole, fraction);
        let mantissa = FixedBigInt::parse_with_capacity(&digits, DEFAULT_MAX_DIGITS)?;
        let exponent = i32::try_from(fraction.len())
            .ok()
            .and_then(|shift| exponent.checked_sub(shift))
            .ok_or_else(bad)?;
        let mut out = Self::new(mantissa, exponent);
        out.normalize();
        Ok(out)
    }
}

impl<const P: usize, const T: bool> fmt::Display for FixedDecimal<P, T> {
    /// Plain decimal notation, without trailing fractional zeros.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits: String = self
            .mantissa
            .magnitude()
            .iter()
            .rev()
            .map(|&d| char::from(b'0' + d))
            .collect();
        let mut text = String::new();
        if self.exponent >= 0 {
            text.push_str(&digits);
            if !self.is_zero() {
                text.extend(std::iter::repeat('0').take(self.exponent as usize));
            }
        } else {
            let point = self.exponent.unsigned_abs() as usize;
            if digits.len() > point {
                let (whole, fraction) = digits.split_at(digits.len() - point);
                text.push_str(whole);
                text.push('.');
                text.push_str(fraction);
            } else {
                text.push_str("0.");
                text.extend(std::iter::repeat('0').take(point - digits.len()));
                text.push_str(&digits);
            }
            let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
            text.truncate(trimmed);
        }
        f.pad_integral(!self.is_negative(), "", &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d10(s: &str) -> Decimal10 {
        s.parse().unwrap()
    }

    fn d16(s: &str) -> Decimal16 {
        s.parse().unwrap()
    }

    #[test]
    fn parse_and_display() {
        for (input, want) in [
            ("1.5", "1.5"),
            ("-0.25", "-0.25"),
            ("120", "120"),
            ("0.000", "0"),
            ("-0", "0"),
            ("1.25e2", "125"),
            ("5e-3", "0.005"),
            ("+.5", "0.5"),
            ("-2.", "-2"),
        ] {
            assert_eq!(d10(input).to_string(), want, "{}", input);
        }
        for bad in ["", ".", "1.2.3", "1e", "abc", "--1", "1e1.5"] {
            assert!(bad.parse::<Decimal10>().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn normalized_on_parse() {
        let v = d10("1200.00");
        assert_eq!(v.mantissa().to_string(), "12");
        assert_eq!(v.exponent(), 2);
        assert_eq!(d10("0").exponent(), 0);
    }

    #[test]
    fn add_and_subtract() {
        assert_eq!(d10("1.5").checked_add(&d10("0.25")).unwrap(), d10("1.75"));
        assert_eq!(d10("1.5").checked_sub(&d10("0.25")).unwrap(), d10("1.25"));
        assert_eq!(d10("0.25").checked_sub(&d10("1.5")).unwrap(), d10("-1.25"));
        assert_eq!(d10("-3").checked_add(&d10("3")).unwrap(), d10("0"));
        assert_eq!(d10("100").checked_add(&d10("0.001")).unwrap(), d10("100.001"));
    }

    #[test]
    fn add_far_apart_drops_low_digits() {
        let huge = Decimal10::new(FixedBigInt::from(1), 200);
        let tiny = d10("1");
        let sum = huge.checked_add(&tiny).unwrap();
        assert_eq!(sum, huge);
        let sum = tiny.checked_add(&huge).unwrap();
        assert_eq!(sum, huge);
    }

    #[test]
    fn multiply() {
        assert_eq!(d10("1.5").checked_mul(&d10("-0.5")).unwrap(), d10("-0.75"));
        assert_eq!(d10("1e10").checked_mul(&d10("1e-12")).unwrap(), d10("0.01"));

        let long = d16("1.23456789012345");
        let square = long.checked_mul(&long).unwrap();
        assert!(square.mantissa().num_digits() > 16);

        let truncating: FixedDecimal<10, true> = "1.23456789012345".parse().unwrap();
        let square = truncating.checked_mul(&truncating).unwrap();
        assert_eq!(square.mantissa().num_digits(), 10);
    }

    #[test]
    fn divide() {
        assert_eq!(d10("1").checked_div(&d10("3")).unwrap(), d10("0.3333333333"));
        assert_eq!(d10("10").checked_div(&d10("4")).unwrap(), d10("2.5"));
        assert_eq!(d10("-3").checked_div(&d10("0.5")).unwrap(), d10("-6"));
        let err = d10("1").checked_div(&d10("0")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn truncate_keeps_leading_digits() {
        let mut v = d10("1.23456789012345");
        v.truncate();
        assert_eq!(v, d10("1.234567890"));
        assert_eq!(v.mantissa().num_digits(), 10);

        let mut short = d10("2.5");
        short.truncate();
        assert_eq!(short, d10("2.5"));
    }

    fn magnitude<const P: usize>(v: &FixedDecimal<P>) -> FixedDecimal<P> {
        FixedDecimal::new(v.mantissa().abs(), v.exponent())
    }

    const OPERANDS: &[&str] = &[
        "7", "1.1", "-3.14159", "0.000271828", "12345.6789", "-9.99", "1", "2e-7", "31415926",
        "0.5", "-123456789",
    ];

    // The quotient keeps at least P digits, so (a/b)*b misses a by less than |a| * 10^(1-P).
    fn division_inverts<const P: usize>() {
        for a in OPERANDS {
            let a: FixedDecimal<P> = a.parse().unwrap();
            for b in OPERANDS {
                let b: FixedDecimal<P> = b.parse().unwrap();
                let back = a.checked_div(&b).unwrap().checked_mul(&b).unwrap();
                let error = magnitude(&back.checked_sub(&a).unwrap());
                let bound = FixedDecimal::<P>::new(a.mantissa().abs(), a.exponent() - (P as i32 - 1));
                assert!(error <= bound, "({} / {}) * {} = {}", a, b, b, back);
            }
        }
    }

    #[test]
    fn division_round_trips_within_precision() {
        division_inverts::<10>();
        division_inverts::<16>();
    }

    #[test]
    fn truncate_never_grows() {
        for text in [
            "1.23456789012345",
            "-98765.4321098765",
            "999999999999",
            "0.00012345678901234",
            "5",
            "-1000000000000000000001",
            "0",
        ] {
            let original = d10(text);
            let mut cut = original.clone();
            cut.truncate();
            assert!(magnitude(&cut) <= magnitude(&original), "{}", text);
            assert!(cut.mantissa().num_digits() <= 10, "{}", text);
            if !original.is_zero() {
                assert_eq!(cut.top(), original.top(), "{}", text);
            }
        }
    }

    #[test]
    fn ordering_is_by_value() {
        let same = Decimal10::new(FixedBigInt::from(150), -2);
        assert_eq!(d10("1.5"), same);
        assert!(d10("-2") < d10("1"));
        assert!(d10("0.001") < d10("0.01"));
        assert!(d10("-0.001") > d10("-0.01"));
        assert!(d10("4") > d10("3.999999999"));
        assert!(d10("0") < d10("0.0000001"));
        assert!(d10("123.4") > d10("123.39"));
    }

    #[test]
    fn float_round_trip() {
        for v in [0.0, 0.1, -1.2, 3.0, 1e-7, -2.5e12, 0.3333333333333333] {
            let d = Decimal16::from_f64(v).unwrap();
            assert_eq!(d.to_f64(), v, "{}", v);
        }
        assert!(Decimal10::from_f64(f64::INFINITY).is_err());
    }
}
