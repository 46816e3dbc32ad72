//! Operations of the witness program, with the semantics of the circom compiler.
//!
//! Field elements are also read as integers: `[0, (p-1)/2]` are the non-negative values
//! and everything above represents `x - p`. Comparisons and shifts use that signed view,
//! integer division, modulo and the bitwise operations use the canonical representative.

use std::cmp::Ordering;

use ark_bn254::Fr;
use ark_ff::{One, PrimeField, Zero};
use groth16::field::{div, pow_ct, to_biguint};
use groth16::{Groth16Error, Result};
use num_bigint::BigUint;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Bits kept by shifts and bitwise negation.
const MASK_BITS: u64 = 254;

/// Binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a * b^-1`
    Div,
    /// `a^b`
    Pow,
    /// Integer division of the canonical representatives.
    IntDiv,
    /// Remainder of the canonical representatives.
    Mod,
    /// `a == b`
    Eq,
    /// `a != b`
    Neq,
    /// Signed `a < b`.
    Lt,
    /// Signed `a > b`.
    Gt,
    /// Signed `a <= b`.
    Leq,
    /// Signed `a >= b`.
    Geq,
    /// Both operands are non-zero.
    Land,
    /// At least one operand is non-zero.
    Lor,
    /// `a << b`, truncated to 254 bits. A negative `b` shifts right.
    Shl,
    /// `a >> b`. A negative `b` shifts left.
    Shr,
    /// Bitwise and.
    Band,
    /// Bitwise or.
    Bor,
    /// Bitwise xor.
    Bxor,
}

/// Unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnoOperation {
    /// `-a`
    Neg,
    /// `a`
    Id,
    /// `a == 0`
    Lnot,
    /// Bitwise negation of the lower 254 bits.
    Bnot,
}

/// Ternary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TresOperation {
    /// `a != 0 ? b : c`, only the selected branch is evaluated.
    TernCond,
}

impl Operation {
    /// Applies the operation.
    ///
    /// Fails with [`Groth16Error::DivisionByZero`] for `Div`, `IntDiv` and `Mod` by zero.
    pub fn eval(self, a: Fr, b: Fr) -> Result<Fr> {
        let value = match self {
            Operation::Add => a + b,
            Operation::Sub => a - b,
            Operation::Mul => a * b,
            Operation::Div => div(&a, &b)?,
            // both operands may be private signals
            Operation::Pow => pow_ct(&a, b.into_bigint().as_ref()),
            Operation::IntDiv => {
                non_zero(&b)?;
                Fr::from(to_biguint(&a) / to_biguint(&b))
            }
            Operation::Mod => {
                non_zero(&b)?;
                Fr::from(to_biguint(&a) % to_biguint(&b))
            }
            Operation::Eq => from_bool(a == b),
            Operation::Neq => from_bool(a != b),
            Operation::Lt => from_bool(signed_cmp(&a, &b) == Ordering::Less),
            Operation::Gt => from_bool(signed_cmp(&a, &b) == Ordering::Greater),
            Operation::Leq => from_bool(signed_cmp(&a, &b) != Ordering::Greater),
            Operation::Geq => from_bool(signed_cmp(&a, &b) != Ordering::Less),
            Operation::Land => from_bool(!a.is_zero() && !b.is_zero()),
            Operation::Lor => from_bool(!a.is_zero() || !b.is_zero()),
            Operation::Shl => shift(&a, &b, true),
            Operation::Shr => shift(&a, &b, false),
            Operation::Band => Fr::from(to_biguint(&a) & to_biguint(&b)),
            Operation::Bor => Fr::from(to_biguint(&a) | to_biguint(&b)),
            Operation::Bxor => Fr::from(to_biguint(&a) ^ to_biguint(&b)),
        };
        Ok(value)
    }
}

impl UnoOperation {
    /// Applies the operation.
    pub fn eval(self, a: Fr) -> Fr {
        match self {
            UnoOperation::Neg => -a,
            UnoOperation::Id => a,
            UnoOperation::Lnot => from_bool(a.is_zero()),
            UnoOperation::Bnot => Fr::from(mask() ^ to_biguint(&a)),
        }
    }
}

fn non_zero(b: &Fr) -> Result<()> {
    if b.is_zero() {
        Err(Groth16Error::DivisionByZero)
    } else {
        Ok(())
    }
}

fn from_bool(value: bool) -> Fr {
    if value { Fr::one() } else { Fr::zero() }
}

fn mask() -> BigUint {
    (BigUint::from(1u8) << MASK_BITS) - 1u8
}

pub(crate) fn is_negative(a: &Fr) -> bool {
    a.into_bigint() > Fr::MODULUS_MINUS_ONE_DIV_TWO
}

fn signed_cmp(a: &Fr, b: &Fr) -> Ordering {
    match (is_negative(a), is_negative(b)) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        // same sign, the representatives are ordered like the signed values
        _ => a.into_bigint().cmp(&b.into_bigint()),
    }
}

fn shift(a: &Fr, b: &Fr, left: bool) -> Fr {
    let (amount, left) = if is_negative(b) {
        (-*b, !left)
    } else {
        (*b, left)
    };
    let Some(bits) = to_biguint(&amount).to_u64().filter(|bits| *bits < MASK_BITS) else {
        return Fr::zero();
    };
    let value = to_biguint(a);
    if left {
        Fr::from((value << bits) & mask())
    } else {
        Fr::from(value >> bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr(v: i64) -> Fr {
        Fr::from(v)
    }

    #[test]
    fn arithmetic() {
        assert_eq!(Operation::Add.eval(fr(2), fr(3)).unwrap(), fr(5));
        assert_eq!(Operation::Sub.eval(fr(2), fr(3)).unwrap(), fr(-1));
        assert_eq!(Operation::Mul.eval(fr(6), fr(7)).unwrap(), fr(42));
        assert_eq!(Operation::Div.eval(fr(42), fr(7)).unwrap(), fr(6));
        assert_eq!(Operation::Pow.eval(fr(3), fr(4)).unwrap(), fr(81));
        assert_eq!(Operation::Pow.eval(fr(3), fr(0)).unwrap(), fr(1));
        // a^(p-1) = 1, a^(p-2) = 1/a
        assert_eq!(Operation::Pow.eval(fr(3), fr(-1)).unwrap(), fr(1));
        assert_eq!(Operation::Pow.eval(fr(3), fr(-2)).unwrap() * fr(3), fr(1));
        assert_eq!(Operation::IntDiv.eval(fr(7), fr(2)).unwrap(), fr(3));
        assert_eq!(Operation::Mod.eval(fr(7), fr(2)).unwrap(), fr(1));
        // field division is exact, integer division is not
        assert_eq!(Operation::Div.eval(fr(7), fr(2)).unwrap() * fr(2), fr(7));
    }

    #[test]
    fn division_by_zero() {
        for op in [Operation::Div, Operation::IntDiv, Operation::Mod] {
            assert_eq!(
                op.eval(fr(1), fr(0)).unwrap_err(),
                Groth16Error::DivisionByZero
            );
        }
    }

    #[test]
    fn comparisons_are_signed() {
        assert_eq!(Operation::Lt.eval(fr(-1), fr(0)).unwrap(), fr(1));
        assert_eq!(Operation::Gt.eval(fr(-1), fr(0)).unwrap(), fr(0));
        assert_eq!(Operation::Lt.eval(fr(-5), fr(-3)).unwrap(), fr(1));
        assert_eq!(Operation::Leq.eval(fr(4), fr(4)).unwrap(), fr(1));
        assert_eq!(Operation::Geq.eval(fr(3), fr(4)).unwrap(), fr(0));
        assert_eq!(Operation::Eq.eval(fr(-1), fr(-1)).unwrap(), fr(1));
        assert_eq!(Operation::Neq.eval(fr(-1), fr(1)).unwrap(), fr(1));
        assert!(is_negative(&-Fr::one()));
        assert!(!is_negative(&Fr::zero()));
    }

    #[test]
    fn logic_and_bits() {
        assert_eq!(Operation::Land.eval(fr(2), fr(0)).unwrap(), fr(0));
        assert_eq!(Operation::Lor.eval(fr(2), fr(0)).unwrap(), fr(1));
        assert_eq!(Operation::Band.eval(fr(0b1100), fr(0b1010)).unwrap(), fr(0b1000));
        assert_eq!(Operation::Bor.eval(fr(0b1100), fr(0b1010)).unwrap(), fr(0b1110));
        assert_eq!(Operation::Bxor.eval(fr(0b1100), fr(0b1010)).unwrap(), fr(0b0110));
        assert_eq!(UnoOperation::Lnot.eval(fr(0)), fr(1));
        assert_eq!(UnoOperation::Lnot.eval(fr(9)), fr(0));
        assert_eq!(UnoOperation::Neg.eval(fr(9)), fr(-9));
        assert_eq!(UnoOperation::Id.eval(fr(9)), fr(9));
        assert_eq!(UnoOperation::Bnot.eval(Fr::zero()), Fr::from(mask()));
    }

    #[test]
    fn shifts() {
        assert_eq!(Operation::Shl.eval(fr(1), fr(4)).unwrap(), fr(16));
        assert_eq!(Operation::Shr.eval(fr(16), fr(4)).unwrap(), fr(1));
        // negative amounts reverse the direction
        assert_eq!(Operation::Shl.eval(fr(16), fr(-4)).unwrap(), fr(1));
        assert_eq!(Operation::Shr.eval(fr(1), fr(-4)).unwrap(), fr(16));
        assert_eq!(Operation::Shr.eval(fr(1), fr(300)).unwrap(), fr(0));
        assert_eq!(Operation::Shl.eval(fr(1), fr(254)).unwrap(), fr(0));
        let top = Operation::Shl.eval(fr(1), fr(253)).unwrap();
        assert_eq!(top, Fr::from(BigUint::from(1u8) << 253u32));
    }
}
