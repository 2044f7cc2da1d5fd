use crate::Error;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use group::Curve;
use irmaseal_curve::{G1Affine, G1Projective, Scalar};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use tiny_keccak::{Hasher, Shake};
use zeroize::{DefaultIsZeroes, Zeroizing};

/// Size of a compressed target group element.
pub(crate) const GT_BYTES: usize = 288;

/// Size of a compressed G1 group element.
pub(crate) const G1_BYTES: usize = 48;

/// Size of a compressed G2 group element.
pub(crate) const G2_BYTES: usize = 96;

/// Size of a serialized scalar.
pub(crate) const SCALAR_BYTES: usize = 32;

/// A scalar that is wiped when zeroized, used for every secret exponent.
#[derive(Clone, Copy, Default)]
pub(crate) struct SecretScalar(pub(crate) Scalar);

impl DefaultIsZeroes for SecretScalar {}

impl fmt::Debug for SecretScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretScalar(..)")
    }
}

impl PartialEq for SecretScalar {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

/// Draws a uniform scalar, failing loudly if the source cannot deliver.
pub fn rand_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Scalar, Error> {
    let mut wide = Zeroizing::new([0u8; 64]);
    rng.try_fill_bytes(&mut wide[..]).map_err(|_| Error::Randomness)?;

    Ok(Scalar::from_bytes_wide(&wide))
}

/// Draws a uniform non-zero scalar.
pub fn rand_nonzero_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Scalar, Error> {
    loop {
        let s = rand_scalar(rng)?;
        if !bool::from(s.ct_eq(&Scalar::zero())) {
            return Ok(s);
        }
    }
}

pub fn shake256<const N: usize>(slice: &[u8]) -> [u8; N] {
    shake256_parts(&[slice])
}

pub fn shake256_parts<const N: usize>(parts: &[&[u8]]) -> [u8; N] {
    let mut digest = Shake::v256();
    for part in parts {
        digest.update(part);
    }

    let mut buf = [0u8; N];
    digest.finalize(&mut buf);

    buf
}

/// Hashes a byte string onto the prime-order subgroup of G1.
///
/// Try-and-increment: candidate x-coordinates are squeezed from SHAKE256 until one lies on the
/// curve, the cofactor is then cleared. Inputs are public, so the variable running time is fine.
pub fn hash_to_g1(domain: &[u8], msg: &[u8]) -> G1Projective {
    let mut counter: u32 = 0;
    loop {
        let mut x: [u8; G1_BYTES] = shake256_parts(&[domain, &counter.to_be_bytes(), msg]);

        // Compressed, not infinity, keep the hashed sign bit.
        x[0] = (x[0] & 0b0011_1111) | 0b1000_0000;

        let candidate: Option<G1Affine> = G1Affine::from_compressed_unchecked(&x).into();
        if let Some(p) = candidate {
            let p = G1Projective::from(p).clear_cofactor();
            if !bool::from(p.is_identity()) {
                return p;
            }
        }

        counter += 1;
    }
}

/// Converts projective points to affine form with a single shared inversion.
pub(crate) fn batch_affine<C: Curve>(points: &[C]) -> Vec<C::AffineRepr>
where
    C::AffineRepr: Clone + Default,
{
    let mut out = vec![C::AffineRepr::default(); points.len()];
    C::batch_normalize(points, &mut out);

    out
}

/// Evaluates the polynomial with the given coefficients (constant term first) at `x`.
pub(crate) fn eval_poly(coeffs: &[SecretScalar], x: Scalar) -> Scalar {
    coeffs
        .iter()
        .rev()
        .fold(Scalar::zero(), |acc, c| acc * x + c.0)
}

/// Lagrange basis coefficient for point `i` over the index set `set`, evaluated at zero:
/// `Π_{j ∈ set, j ≠ i} j / (j − i)`.
pub(crate) fn lagrange_coefficient(i: u32, set: &[u32]) -> Result<Scalar, Error> {
    let xi = Scalar::from(u64::from(i));
    let mut num = Scalar::one();
    let mut den = Scalar::one();

    for &j in set.iter().filter(|&&j| j != i) {
        let xj = Scalar::from(u64::from(j));
        num *= xj;
        den *= xj - xi;
    }

    Option::from(den.invert())
        .map(|inv: Scalar| num * inv)
        .ok_or(Error::InvalidPolicy("sibling indices are not distinct"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_macros::FailingRng;
    use zeroize::Zeroize;

    #[test]
    fn rand_scalar_reports_randomness_failure() {
        assert_eq!(rand_scalar(&mut FailingRng), Err(Error::Randomness));
    }

    #[test]
    fn lagrange_reconstructs_constant_term() {
        let mut rng = rand::thread_rng();
        let coeffs: Vec<SecretScalar> = (0..3)
            .map(|_| SecretScalar(rand_scalar(&mut rng).unwrap()))
            .collect();

        // Any 3 of the points 1..=5 determine q(0).
        for set in [[1u32, 2, 3], [2, 4, 5], [1, 3, 5]] {
            let q0 = set.iter().fold(Scalar::zero(), |acc, &i| {
                let share = eval_poly(&coeffs, Scalar::from(u64::from(i)));
                acc + share * lagrange_coefficient(i, &set).unwrap()
            });
            assert_eq!(q0, coeffs[0].0);
        }
    }

    #[test]
    fn lagrange_of_single_point_is_one() {
        assert_eq!(lagrange_coefficient(3, &[3]).unwrap(), Scalar::one());
    }

    #[test]
    fn hash_to_g1_is_deterministic_and_domain_separated() {
        let a = hash_to_g1(b"domain-a", b"finance");
        assert_eq!(a, hash_to_g1(b"domain-a", b"finance"));
        assert_ne!(a, hash_to_g1(b"domain-b", b"finance"));
        assert_ne!(a, hash_to_g1(b"domain-a", b"eng"));
        assert!(bool::from(G1Affine::from(a).is_torsion_free()));
    }

    #[test]
    fn secret_scalar_debug_is_redacted() {
        let s = SecretScalar(Scalar::from(7u64));
        assert_eq!(alloc::format!("{:?}", s), "SecretScalar(..)");
    }

    #[test]
    fn secret_scalar_zeroizes() {
        let mut s = SecretScalar(Scalar::from(7u64));
        s.zeroize();
        assert_eq!(s.0, Scalar::zero());
    }
}
