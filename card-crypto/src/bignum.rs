// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Natural number arithmetic over fixed-capacity digit arrays.

A number is a little-endian array of [Digit]: index 0 holds the least
significant digit. Unused high digits are zero. Every function takes the
number of digits it operates on as an explicit argument; slices must be at
least that long (shorter slices panic on indexing, they are never read out
of bounds).

There is no dynamic error signaling here. Callers uphold the documented
preconditions (digit counts below [MAX_NN_DIGITS], non-zero divisors and
moduli). The RSA layer validates key sizes before anything reaches this
module.

Scratch buffers that can hold key material are wrapped in [Zeroizing] so
they are wiped on every exit path.

This arithmetic is not constant time.
*/

use {
    crate::rsa::MAX_RSA_MODULUS_LEN,
    std::cmp::Ordering,
    zeroize::Zeroizing,
};

/// A single digit of a natural number.
pub type Digit = u32;

/// Half of a [Digit], used to keep native multiplies from overflowing.
pub type HalfDigit = u16;

pub const DIGIT_BITS: usize = 32;
pub const DIGIT_LEN: usize = DIGIT_BITS / 8;
pub const HALF_DIGIT_BITS: usize = 16;
pub const MAX_DIGIT: Digit = Digit::MAX;
pub const MAX_HALF_DIGIT: Digit = HalfDigit::MAX as Digit;

/// Capacity of a natural number in digits.
///
/// One digit larger than the largest supported modulus so that
/// intermediate values in division have headroom.
pub const MAX_NN_DIGITS: usize = (MAX_RSA_MODULUS_LEN + DIGIT_LEN - 1) / DIGIT_LEN + 1;

/// A natural number at full capacity.
pub type Nat = [Digit; MAX_NN_DIGITS];

/// A double-width natural number, as produced by [mult].
pub type WideNat = [Digit; 2 * MAX_NN_DIGITS];

/// Obtain a zeroed number that is wiped when dropped.
pub fn new_nat() -> Zeroizing<Nat> {
    Zeroizing::new([0; MAX_NN_DIGITS])
}

/// Obtain a zeroed double-width number that is wiped when dropped.
pub fn new_wide_nat() -> Zeroizing<WideNat> {
    Zeroizing::new([0; 2 * MAX_NN_DIGITS])
}

#[inline]
fn low_half(x: Digit) -> Digit {
    x & MAX_HALF_DIGIT
}

#[inline]
fn high_half(x: Digit) -> Digit {
    x >> HALF_DIGIT_BITS
}

#[inline]
fn to_high_half(x: Digit) -> Digit {
    x << HALF_DIGIT_BITS
}

/// The two most significant bits of a digit.
#[inline]
fn digit_2msb(x: Digit) -> Digit {
    (x >> (DIGIT_BITS - 2)) & 3
}

/// Decode big-endian bytes into `a[..digits]`.
///
/// Leading bytes that do not fit into `digits` digits are dropped. Digits
/// beyond the length of `b` are zeroed.
pub fn decode(a: &mut [Digit], digits: usize, b: &[u8]) {
    let mut j = b.len();

    for ai in a[..digits].iter_mut() {
        let mut t: Digit = 0;
        let mut u = 0;

        while j > 0 && u < DIGIT_BITS {
            j -= 1;
            t |= (b[j] as Digit) << u;
            u += 8;
        }

        *ai = t;
    }
}

/// Encode `a[..digits]` as big-endian bytes filling all of `b`.
///
/// The output is left padded with zeros. Digits that do not fit are
/// truncated.
pub fn encode(b: &mut [u8], a: &[Digit], digits: usize) {
    let mut j = b.len();

    for &t in a[..digits].iter() {
        let mut u = 0;

        while j > 0 && u < DIGIT_BITS {
            j -= 1;
            b[j] = (t >> u) as u8;
            u += 8;
        }
    }

    for x in b[..j].iter_mut() {
        *x = 0;
    }
}

/// Assign a = b.
pub fn assign(a: &mut [Digit], b: &[Digit], digits: usize) {
    a[..digits].copy_from_slice(&b[..digits]);
}

/// Assign a = 0.
pub fn assign_zero(a: &mut [Digit], digits: usize) {
    for x in a[..digits].iter_mut() {
        *x = 0;
    }
}

/// Assign a = b, where b is a single digit.
pub fn assign_digit(a: &mut [Digit], b: Digit, digits: usize) {
    assign_zero(a, digits);
    if digits > 0 {
        a[0] = b;
    }
}

/// Assign a = 2^b.
///
/// `a` is zero when 2^b does not fit into `digits` digits.
pub fn assign_2exp(a: &mut [Digit], b: usize, digits: usize) {
    assign_zero(a, digits);

    if b >= digits * DIGIT_BITS {
        return;
    }

    a[b / DIGIT_BITS] = 1 << (b % DIGIT_BITS);
}

#[inline]
fn add_digits(b: Digit, c: Digit, carry: Digit) -> (Digit, Digit) {
    let ai = b.wrapping_add(carry);

    if ai < carry {
        (c, 1)
    } else {
        let ai = ai.wrapping_add(c);
        (ai, (ai < c) as Digit)
    }
}

#[inline]
fn sub_digits(b: Digit, c: Digit, borrow: Digit) -> (Digit, Digit) {
    let ai = b.wrapping_sub(borrow);

    if ai > MAX_DIGIT - borrow {
        (MAX_DIGIT - c, 1)
    } else {
        let ai = ai.wrapping_sub(c);
        (ai, (ai > MAX_DIGIT - c) as Digit)
    }
}

/// Compute a = b + c, returning the carry out of the top digit.
pub fn add(a: &mut [Digit], b: &[Digit], c: &[Digit], digits: usize) -> Digit {
    let mut carry = 0;

    for i in 0..digits {
        let (ai, next) = add_digits(b[i], c[i], carry);
        a[i] = ai;
        carry = next;
    }

    carry
}

/// Compute a += c, returning the carry out of the top digit.
pub fn add_assign(a: &mut [Digit], c: &[Digit], digits: usize) -> Digit {
    let mut carry = 0;

    for i in 0..digits {
        let (ai, next) = add_digits(a[i], c[i], carry);
        a[i] = ai;
        carry = next;
    }

    carry
}

/// Compute a = b - c, returning the borrow out of the top digit.
pub fn sub(a: &mut [Digit], b: &[Digit], c: &[Digit], digits: usize) -> Digit {
    let mut borrow = 0;

    for i in 0..digits {
        let (ai, next) = sub_digits(b[i], c[i], borrow);
        a[i] = ai;
        borrow = next;
    }

    borrow
}

/// Compute a -= c, returning the borrow out of the top digit.
pub fn sub_assign(a: &mut [Digit], c: &[Digit], digits: usize) -> Digit {
    let mut borrow = 0;

    for i in 0..digits {
        let (ai, next) = sub_digits(a[i], c[i], borrow);
        a[i] = ai;
        borrow = next;
    }

    borrow
}

/// Compute the double-digit product b * c as `[low, high]`.
///
/// Each operand is split into half digits so that no native multiply can
/// overflow a [Digit].
pub fn digit_mult(b: Digit, c: Digit) -> [Digit; 2] {
    let b_high = high_half(b);
    let b_low = low_half(b);
    let c_high = high_half(c);
    let c_low = low_half(c);

    let mut a0 = b_low * c_low;
    let mut t = b_low * c_high;
    let u = b_high * c_low;
    let mut a1 = b_high * c_high;

    t = t.wrapping_add(u);
    if t < u {
        a1 = a1.wrapping_add(to_high_half(1));
    }

    let u = to_high_half(t);
    a0 = a0.wrapping_add(u);
    if a0 < u {
        a1 = a1.wrapping_add(1);
    }
    a1 = a1.wrapping_add(high_half(t));

    [a0, a1]
}

/// Compute the single digit quotient `b / c`, where `b` is `[low, high]`.
///
/// Assumes `b[1] < c` and `high_half(c) > 0`. Each half of the quotient is
/// underestimated by half-digit division and then corrected upward.
pub fn digit_div(b: &[Digit], c: Digit) -> Digit {
    let c_high = high_half(c);
    let c_low = low_half(c);

    let mut t0 = b[0];
    let mut t1 = b[1];

    let mut a_high = if c_high == MAX_HALF_DIGIT {
        high_half(t1)
    } else {
        t1 / (c_high + 1)
    } as HalfDigit;

    let u = a_high as Digit * c_low;
    let v = a_high as Digit * c_high;
    let hu = to_high_half(u);
    t0 = t0.wrapping_sub(hu);
    if t0 > MAX_DIGIT - hu {
        t1 = t1.wrapping_sub(1);
    }
    t1 = t1.wrapping_sub(high_half(u));
    t1 = t1.wrapping_sub(v);

    let hc = to_high_half(c_low);
    while t1 > c_high || (t1 == c_high && t0 >= hc) {
        t0 = t0.wrapping_sub(hc);
        if t0 > MAX_DIGIT - hc {
            t1 = t1.wrapping_sub(1);
        }
        t1 = t1.wrapping_sub(c_high);
        a_high = a_high.wrapping_add(1);
    }

    let mut a_low = if c_high == MAX_HALF_DIGIT {
        low_half(t1)
    } else {
        to_high_half(t1).wrapping_add(high_half(t0)) / (c_high + 1)
    } as HalfDigit;

    let u = a_low as Digit * c_low;
    let v = a_low as Digit * c_high;
    t0 = t0.wrapping_sub(u);
    if t0 > MAX_DIGIT - u {
        t1 = t1.wrapping_sub(1);
    }
    let hv = to_high_half(v);
    t0 = t0.wrapping_sub(hv);
    if t0 > MAX_DIGIT - hv {
        t1 = t1.wrapping_sub(1);
    }
    t1 = t1.wrapping_sub(high_half(v));

    while t1 > 0 || t0 >= c {
        t0 = t0.wrapping_sub(c);
        if t0 > MAX_DIGIT - c {
            t1 = t1.wrapping_sub(1);
        }
        a_low = a_low.wrapping_add(1);
    }

    to_high_half(a_high as Digit).wrapping_add(a_low as Digit)
}

/// Compute a += c * d, returning the carry digit.
fn add_digit_mult_assign(a: &mut [Digit], c: Digit, d: &[Digit], digits: usize) -> Digit {
    if c == 0 {
        return 0;
    }

    let mut carry: Digit = 0;

    for i in 0..digits {
        let t = digit_mult(c, d[i]);

        let mut ai = a[i].wrapping_add(carry);
        carry = (ai < carry) as Digit;
        ai = ai.wrapping_add(t[0]);
        if ai < t[0] {
            carry += 1;
        }
        carry = carry.wrapping_add(t[1]);

        a[i] = ai;
    }

    carry
}

/// Compute a -= c * d, returning the borrow digit.
fn sub_digit_mult_assign(a: &mut [Digit], c: Digit, d: &[Digit], digits: usize) -> Digit {
    if c == 0 {
        return 0;
    }

    let mut borrow: Digit = 0;

    for i in 0..digits {
        let t = digit_mult(c, d[i]);

        let mut ai = a[i].wrapping_sub(borrow);
        borrow = (ai > MAX_DIGIT - borrow) as Digit;
        ai = ai.wrapping_sub(t[0]);
        if ai > MAX_DIGIT - t[0] {
            borrow += 1;
        }
        borrow = borrow.wrapping_add(t[1]);

        a[i] = ai;
    }

    borrow
}

/// Compute a = b * c.
///
/// Lengths: `a[2 * digits]`, `b[digits]`, `c[digits]`.
pub fn mult(a: &mut [Digit], b: &[Digit], c: &[Digit], digits: usize) {
    assign_zero(a, 2 * digits);

    let b_digits = significant_digits(b, digits);
    let c_digits = significant_digits(c, digits);

    for i in 0..b_digits {
        let carry = add_digit_mult_assign(&mut a[i..], b[i], c, c_digits);
        a[i + c_digits] = a[i + c_digits].wrapping_add(carry);
    }
}

/// Compute a = b << c, returning the bits shifted out of the top digit.
///
/// Shifts of a whole digit or more are not performed and return 0.
pub fn lshift(a: &mut [Digit], b: &[Digit], c: usize, digits: usize) -> Digit {
    if c >= DIGIT_BITS {
        return 0;
    }

    let t = DIGIT_BITS - c;
    let mut carry = 0;

    for i in 0..digits {
        let bi = b[i];
        a[i] = (bi << c) | carry;
        carry = if c == 0 { 0 } else { bi >> t };
    }

    carry
}

/// Compute a = b >> c, returning the bits shifted out of the bottom digit.
///
/// Shifts of a whole digit or more are not performed and return 0.
pub fn rshift(a: &mut [Digit], b: &[Digit], c: usize, digits: usize) -> Digit {
    if c >= DIGIT_BITS {
        return 0;
    }

    let t = DIGIT_BITS - c;
    let mut carry = 0;

    for i in (0..digits).rev() {
        let bi = b[i];
        a[i] = (bi >> c) | carry;
        carry = if c == 0 { 0 } else { bi << t };
    }

    carry
}

/// Compute a = c div d and b = c mod d.
///
/// Lengths: `a[c_digits]`, `b[d_digits]`, `c[c_digits]`, `d[d_digits]`.
///
/// Assumes `d > 0`, `c_digits < 2 * MAX_NN_DIGITS` and
/// `d_digits < MAX_NN_DIGITS`. A zero divisor leaves the outputs untouched.
pub fn div(
    a: &mut [Digit],
    b: &mut [Digit],
    c: &[Digit],
    c_digits: usize,
    d: &[Digit],
    d_digits: usize,
) {
    debug_assert!(c_digits < 2 * MAX_NN_DIGITS);
    debug_assert!(d_digits < MAX_NN_DIGITS);

    let dd_digits = significant_digits(d, d_digits);
    if dd_digits == 0 {
        return;
    }

    let mut cc = Zeroizing::new([0 as Digit; 2 * MAX_NN_DIGITS + 1]);
    let mut dd = new_nat();

    // Normalize so the divisor's top digit has its high bit set.
    let shift = DIGIT_BITS - digit_bits(d[dd_digits - 1]);
    cc[c_digits] = lshift(&mut cc[..], c, shift, c_digits);
    lshift(&mut dd[..], d, shift, dd_digits);
    let t = dd[dd_digits - 1];

    assign_zero(a, c_digits);

    let mut i = c_digits as isize - dd_digits as isize;
    while i >= 0 {
        let iu = i as usize;

        let mut ai = if t == MAX_DIGIT {
            cc[iu + dd_digits]
        } else {
            digit_div(&cc[iu + dd_digits - 1..], t + 1)
        };

        let borrow = sub_digit_mult_assign(&mut cc[iu..], ai, &dd[..], dd_digits);
        cc[iu + dd_digits] = cc[iu + dd_digits].wrapping_sub(borrow);

        while cc[iu + dd_digits] != 0 || cmp(&cc[iu..], &dd[..], dd_digits) != Ordering::Less {
            ai = ai.wrapping_add(1);
            let borrow = sub_assign(&mut cc[iu..], &dd[..], dd_digits);
            cc[iu + dd_digits] = cc[iu + dd_digits].wrapping_sub(borrow);
        }

        a[iu] = ai;
        i -= 1;
    }

    assign_zero(b, d_digits);
    rshift(b, &cc[..], shift, dd_digits);
}

/// Compute a = b mod c.
///
/// Lengths: `a[c_digits]`, `b[b_digits]`, `c[c_digits]`.
pub fn modulo(a: &mut [Digit], b: &[Digit], b_digits: usize, c: &[Digit], c_digits: usize) {
    let mut t = new_wide_nat();

    div(&mut t[..], a, b, b_digits, c, c_digits);
}

/// Compute a = b * c mod d.
///
/// Lengths: `a[digits]`, `b[digits]`, `c[digits]`, `d[digits]`.
pub fn mod_mult(a: &mut [Digit], b: &[Digit], c: &[Digit], d: &[Digit], digits: usize) {
    let mut t = new_wide_nat();

    mult(&mut t[..], b, c, digits);
    modulo(a, &t[..], 2 * digits, d, digits);
}

/// Compute a = b^c mod d.
///
/// Lengths: `a[d_digits]`, `b[d_digits]`, `c[c_digits]`, `d[d_digits]`.
///
/// Assumes `b < d`, `d > 0` and `d_digits < MAX_NN_DIGITS`. The exponent is
/// consumed two bits at a time against a table of b, b^2 and b^3.
pub fn mod_exp(
    a: &mut [Digit],
    b: &[Digit],
    c: &[Digit],
    c_digits: usize,
    d: &[Digit],
    d_digits: usize,
) {
    let mut b1 = new_nat();
    let mut b2 = new_nat();
    let mut b3 = new_nat();
    let mut t = new_nat();
    let mut w = new_nat();

    assign(&mut b1[..], b, d_digits);
    mod_mult(&mut b2[..], &b1[..], b, d, d_digits);
    mod_mult(&mut b3[..], &b2[..], b, d, d_digits);

    assign_digit(&mut t[..], 1, d_digits);

    let c_digits = significant_digits(c, c_digits);

    for i in (0..c_digits).rev() {
        let mut ci = c[i];
        let mut ci_bits = DIGIT_BITS;

        // Skip leading zero bit pairs of the most significant digit.
        if i == c_digits - 1 {
            while digit_2msb(ci) == 0 {
                ci <<= 2;
                ci_bits -= 2;
            }
        }

        let mut j = 0;
        while j < ci_bits {
            // t = t^4 * b^s mod d, where s is the top two bits of ci.
            mod_mult(&mut w[..], &t[..], &t[..], d, d_digits);
            mod_mult(&mut t[..], &w[..], &w[..], d, d_digits);

            let power = match digit_2msb(ci) {
                1 => Some(&b1),
                2 => Some(&b2),
                3 => Some(&b3),
                _ => None,
            };

            if let Some(power) = power {
                mod_mult(&mut w[..], &t[..], &power[..], d, d_digits);
                assign(&mut t[..], &w[..], d_digits);
            }

            j += 2;
            ci <<= 2;
        }
    }

    assign(a, &t[..], d_digits);
}

/// Compute a = 1/b mod c.
///
/// Lengths: `a[digits]`, `b[digits]`, `c[digits]`.
///
/// Assumes `gcd(b, c) = 1` and `digits < MAX_NN_DIGITS`. Results for inputs
/// that are not coprime are meaningless.
pub fn mod_inv(a: &mut [Digit], b: &[Digit], c: &[Digit], digits: usize) {
    let mut q = new_nat();
    let mut t1 = new_nat();
    let mut t3 = new_nat();
    let mut u1 = new_nat();
    let mut u3 = new_nat();
    let mut v1 = new_nat();
    let mut v3 = new_nat();
    let mut w = new_wide_nat();

    // Extended Euclid tracking only the coefficient of b. Its sign
    // alternates every step and is tracked separately so no negative
    // numbers are needed.
    assign_digit(&mut u1[..], 1, digits);
    assign_zero(&mut v1[..], digits);
    assign(&mut u3[..], b, digits);
    assign(&mut v3[..], c, digits);
    let mut u1_negative = false;

    while !is_zero(&v3[..], digits) {
        div(&mut q[..], &mut t3[..], &u3[..], digits, &v3[..], digits);
        mult(&mut w[..], &q[..], &v1[..], digits);
        add(&mut t1[..], &u1[..], &w[..], digits);
        assign(&mut u1[..], &v1[..], digits);
        assign(&mut v1[..], &t1[..], digits);
        assign(&mut u3[..], &v3[..], digits);
        assign(&mut v3[..], &t3[..], digits);
        u1_negative = !u1_negative;
    }

    if u1_negative {
        sub(a, c, &u1[..], digits);
    } else {
        assign(a, &u1[..], digits);
    }
}

/// Compute a = gcd(b, c).
///
/// Lengths: `a[digits]`, `b[digits]`, `c[digits]`.
pub fn gcd(a: &mut [Digit], b: &[Digit], c: &[Digit], digits: usize) {
    let mut t = new_nat();
    let mut u = new_nat();
    let mut v = new_nat();

    assign(&mut u[..], b, digits);
    assign(&mut v[..], c, digits);

    while !is_zero(&v[..], digits) {
        modulo(&mut t[..], &u[..], digits, &v[..], digits);
        assign(&mut u[..], &v[..], digits);
        assign(&mut v[..], &t[..], digits);
    }

    assign(a, &u[..], digits);
}

/// Compare two numbers of equal digit count.
pub fn cmp(a: &[Digit], b: &[Digit], digits: usize) -> Ordering {
    for i in (0..digits).rev() {
        match a[i].cmp(&b[i]) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    Ordering::Equal
}

/// Whether a is zero.
pub fn is_zero(a: &[Digit], digits: usize) -> bool {
    a[..digits].iter().all(|x| *x == 0)
}

/// Number of significant digits in a.
pub fn significant_digits(a: &[Digit], digits: usize) -> usize {
    a[..digits]
        .iter()
        .rposition(|x| *x != 0)
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Number of significant bits in a single digit.
pub fn digit_bits(a: Digit) -> usize {
    DIGIT_BITS - a.leading_zeros() as usize
}

/// Number of significant bits in a.
pub fn bits(a: &[Digit], digits: usize) -> usize {
    let digits = significant_digits(a, digits);
    if digits == 0 {
        return 0;
    }

    (digits - 1) * DIGIT_BITS + digit_bits(a[digits - 1])
}
