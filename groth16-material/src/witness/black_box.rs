//! Black-box functions: witness computations that circom leaves to the host.
//!
//! Missing arguments read as zero.

use std::collections::HashMap;
use std::sync::Arc;

use ark_bn254::Fr;
use ark_ff::{Field, LegendreSymbol, One, Zero};
use groth16::field::to_biguint;
use num_traits::ToPrimitive;

/// A function called from a [`Node::Call`](super::Node::Call).
pub type BlackBoxFunction = Arc<dyn Fn(&[Fr]) -> Fr + Send + Sync>;

/// Registered black-box functions by name.
pub type BlackBoxRegistry = HashMap<String, BlackBoxFunction>;

fn arg(args: &[Fr], i: usize) -> Fr {
    args.get(i).copied().unwrap_or_default()
}

/// `in != 0 ? 1 / in : 0`
pub fn bbf_inv() -> BlackBoxFunction {
    Arc::new(|args: &[Fr]| arg(args, 0).inverse().unwrap_or_default())
}

/// The Legendre symbol of `in` as `0`, `1` or `-1`.
pub fn bbf_legendre() -> BlackBoxFunction {
    Arc::new(|args: &[Fr]| match arg(args, 0).legendre() {
        LegendreSymbol::Zero => Fr::zero(),
        LegendreSymbol::QuadraticResidue => Fr::one(),
        LegendreSymbol::QuadraticNonResidue => -Fr::one(),
    })
}

/// A square root of `in`, or zero for non-residues.
pub fn bbf_sqrt_unchecked() -> BlackBoxFunction {
    Arc::new(|args: &[Fr]| arg(args, 0).sqrt().unwrap_or_default())
}

/// `l != -1 ? a : na`
pub fn bbf_sqrt_input() -> BlackBoxFunction {
    Arc::new(|args: &[Fr]| {
        if arg(args, 0) != -Fr::one() {
            arg(args, 1)
        } else {
            arg(args, 2)
        }
    })
}

/// `(in >> i) & 1`
pub fn bbf_num_2_bits_helper() -> BlackBoxFunction {
    Arc::new(|args: &[Fr]| {
        let value = to_biguint(&arg(args, 0));
        let bit = to_biguint(&arg(args, 1))
            .to_u64()
            .is_some_and(|i| value.bit(i));
        Fr::from(bit)
    })
}
