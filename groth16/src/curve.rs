//! Group operations on the BN254 curves and the optimal-ate pairing.
//!
//! Point arithmetic is the short Weierstrass implementation of `ark-ec` (G1 over `Fq`,
//! G2 over the `Fq2` sextic twist). This module adds checked decoding of untrusted
//! encodings and the scalar multiplication the prover and the setup rely on.

use ark_ec::pairing::{MillerLoopOutput, Pairing, PairingOutput};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BitIteratorBE, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::{Groth16Error, Result};

/// Double-and-add over the canonical bits of `scalar`, most significant first.
pub fn scalar_mul<G: CurveGroup>(point: &G, scalar: &G::ScalarField) -> G {
    let mut acc = G::zero();
    for bit in BitIteratorBE::without_leading_zeros(scalar.into_bigint()) {
        acc.double_in_place();
        if bit {
            acc += point;
        }
    }
    acc
}

fn expect_len(bytes: &[u8], expected: usize) -> Result<()> {
    if bytes.len() == expected {
        Ok(())
    } else {
        Err(Groth16Error::InvalidEncoding(format!(
            "expected {expected} bytes, got {}",
            bytes.len()
        )))
    }
}

/// Decodes a compressed point, checking that it lies on the curve and in the prime
/// order subgroup.
pub fn point_from_compressed<A: AffineRepr>(bytes: &[u8]) -> Result<A> {
    expect_len(bytes, A::zero().compressed_size())?;
    Ok(A::deserialize_compressed(bytes)?)
}

/// Decodes an uncompressed point with the same checks as [`point_from_compressed`].
pub fn point_from_uncompressed<A: AffineRepr>(bytes: &[u8]) -> Result<A> {
    expect_len(bytes, A::zero().uncompressed_size())?;
    Ok(A::deserialize_uncompressed(bytes)?)
}

/// Compressed encoding of `point`.
pub fn point_to_compressed<A: AffineRepr>(point: &A) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(point.compressed_size());
    point.serialize_compressed(&mut bytes)?;
    Ok(bytes)
}

/// Uncompressed encoding of `point`.
pub fn point_to_uncompressed<A: AffineRepr>(point: &A) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(point.uncompressed_size());
    point.serialize_uncompressed(&mut bytes)?;
    Ok(bytes)
}

/// The Miller loop of the optimal-ate pairing over all `(g1[i], g2[i])` pairs.
pub fn miller_loop<E: Pairing>(
    g1: impl IntoIterator<Item = impl Into<E::G1Prepared>>,
    g2: impl IntoIterator<Item = impl Into<E::G2Prepared>>,
) -> MillerLoopOutput<E> {
    E::multi_miller_loop(g1, g2)
}

/// Maps a Miller loop result into the target group. `None` only for a zero input.
pub fn final_exponentiation<E: Pairing>(f: MillerLoopOutput<E>) -> Option<PairingOutput<E>> {
    E::final_exponentiation(f)
}

/// The pairing `e(p, q)`.
pub fn pairing<E: Pairing>(p: E::G1Affine, q: E::G2Affine) -> PairingOutput<E> {
    E::pairing(p, q)
}

/// Checks `prod e(g1[i], g2[i]) == 1` with a single final exponentiation.
pub fn pairing_product_is_one<E: Pairing>(g1: &[E::G1Affine], g2: &[E::G2Affine]) -> bool {
    if g1.len() != g2.len() {
        return false;
    }
    final_exponentiation(miller_loop::<E>(g1.iter().copied(), g2.iter().copied()))
        .is_some_and(|out| out.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use ark_bn254::{Bn254, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
    use ark_ec::PrimeGroup;
    use ark_ff::{One, UniformRand};

    #[test]
    fn double_and_add_matches_arkworks() {
        let mut rng = ark_std::test_rng();
        for _ in 0..8 {
            let p = G1Projective::rand(&mut rng);
            let s = Fr::rand(&mut rng);
            assert_eq!(scalar_mul(&p, &s), p * s);
        }
        let q = G2Projective::rand(&mut rng);
        assert_eq!(scalar_mul(&q, &Fr::from(5u64)), q * Fr::from(5u64));
        assert!(scalar_mul(&q, &Fr::zero()).is_zero());
    }

    #[test]
    fn bilinearity() {
        let mut rng = ark_std::test_rng();
        let a = Fr::rand(&mut rng);
        let b = Fr::rand(&mut rng);
        let p = G1Projective::generator();
        let q = G2Projective::generator();
        let lhs = pairing::<Bn254>((p * a).into_affine(), (q * b).into_affine());
        let base = pairing::<Bn254>(p.into_affine(), q.into_affine());
        assert_eq!(lhs, base * (a * b));
        assert_ne!(base.0, <Bn254 as Pairing>::TargetField::one());
    }

    #[test]
    fn product_of_inverse_pairings_is_one() {
        let mut rng = ark_std::test_rng();
        let p = G1Projective::rand(&mut rng).into_affine();
        let q = G2Projective::rand(&mut rng).into_affine();
        assert!(pairing_product_is_one::<Bn254>(&[p, -p], &[q, q]));
        assert!(!pairing_product_is_one::<Bn254>(&[p, p], &[q, q]));
        assert!(!pairing_product_is_one::<Bn254>(&[p], &[q, q]));
    }

    #[test]
    fn compressed_sizes_and_round_trip() {
        let mut rng = ark_std::test_rng();
        let p = G1Projective::rand(&mut rng).into_affine();
        let q = G2Projective::rand(&mut rng).into_affine();
        let p_bytes = point_to_compressed(&p).unwrap();
        let q_bytes = point_to_compressed(&q).unwrap();
        assert_eq!(p_bytes.len(), 32);
        assert_eq!(q_bytes.len(), 64);
        assert_eq!(point_from_compressed::<G1Affine>(&p_bytes).unwrap(), p);
        assert_eq!(point_from_compressed::<G2Affine>(&q_bytes).unwrap(), q);
        assert_eq!(
            point_from_uncompressed::<G1Affine>(&point_to_uncompressed(&p).unwrap()).unwrap(),
            p
        );
        assert_eq!(
            point_from_uncompressed::<G2Affine>(&point_to_uncompressed(&q).unwrap()).unwrap(),
            q
        );
    }

    #[test]
    fn rejects_bad_encodings() {
        let p = G1Affine::generator();
        let bytes = point_to_uncompressed(&p).unwrap();
        let err = point_from_uncompressed::<G1Affine>(&bytes[..63]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidEncoding);

        // (1, 3) is not on y^2 = x^3 + 3
        let mut off_curve = bytes.clone();
        off_curve[32] = 3;
        assert!(point_from_uncompressed::<G1Affine>(&off_curve).is_err());

        assert!(point_from_compressed::<G2Affine>(&[0xff; 64]).is_err());
    }
}
