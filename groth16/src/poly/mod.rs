//! Polynomials over radix-2 evaluation domains.

mod dense;
mod domain;

pub use dense::DensePolynomial;
pub use domain::{Radix2Domain, distribute_powers};
