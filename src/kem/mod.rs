//! This module contains KP-ABE key encapsulation mechanisms.
//!
//! Among the schemes are:
//! - GPSW small universe ([`gpsw`]), attributes fixed at setup,
//! - GPSW large universe ([`gpsw_lu`]), attributes hashed onto G1.

#[cfg(feature = "gpsw")]
#[cfg_attr(docsrs, doc(cfg(feature = "gpsw")))]
pub mod gpsw;

#[cfg(feature = "gpsw_lu")]
#[cfg_attr(docsrs, doc(cfg(feature = "gpsw_lu")))]
pub mod gpsw_lu;

use crate::config::CURVE_SECURITY_BITS;
use crate::util::shake256;
use crate::{AccessTree, Attribute, AttributeSet, Compress, Config, Error, Witness};
use core::fmt;
use irmaseal_curve::Gt;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of the shared secret in bytes.
pub const SS_BYTES: usize = 32;

/// All KEMs in this library produce a 32-byte shared secret.
///
/// This shared secret has roughly a 127 bits of security.
/// This is due to the fact that BLS12-381 targets this security level (optimistically).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(pub(crate) [u8; SS_BYTES]);

impl SharedSecret {
    pub fn as_bytes(&self) -> &[u8; SS_BYTES] {
        &self.0
    }
}

/// Uses SHAKE256 to derive a 32-byte shared secret from a target group element.
///
/// Internally compresses the target group element to byte representation.
impl From<&Gt> for SharedSecret {
    fn from(el: &Gt) -> Self {
        SharedSecret(shake256::<SS_BYTES>(&el.to_compressed()))
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Key-policy attribute-based key encapsulation mechanism.
pub trait KpAbeKem {
    /// Scheme identifier.
    const IDENTIFIER: &'static str;

    /// Public parameters (Mpk).
    type Pk: Compress + Clone + fmt::Debug + PartialEq;

    /// Master secret (Msk).
    type Sk: Compress + fmt::Debug;

    /// User secret key bound to an access tree (Usk).
    type Usk: Compress + Clone + fmt::Debug + PartialEq;

    /// Ciphertext bound to an attribute set (Ct).
    type Ct: Compress + Clone + fmt::Debug + PartialEq;

    /// Creates the public parameters and the master secret.
    ///
    /// Schemes with a fixed universe only accept attributes from `universe` later on.
    fn setup<R: RngCore + CryptoRng>(
        config: &Config,
        universe: &[Attribute],
        rng: &mut R,
    ) -> Result<(Self::Pk, Self::Sk), Error>;

    /// Issues a user secret key for an access tree.
    ///
    /// Every call draws fresh sharing polynomials.
    fn keygen<R: RngCore + CryptoRng>(
        sk: &Self::Sk,
        tree: &AccessTree,
        rng: &mut R,
    ) -> Result<Self::Usk, Error>;

    /// Encapsulates a fresh shared secret under a non-empty attribute set.
    fn encaps<R: RngCore + CryptoRng>(
        pk: &Self::Pk,
        attrs: &AttributeSet,
        rng: &mut R,
    ) -> Result<(Self::Ct, SharedSecret), Error>;

    /// The access tree a user secret key is bound to.
    fn policy(usk: &Self::Usk) -> &AccessTree;

    /// The attribute set a ciphertext is bound to.
    fn attributes(ct: &Self::Ct) -> &AttributeSet;

    /// Recovers the shared secret along a given satisfying subtree.
    ///
    /// The result does not depend on which valid witness is used.
    fn decaps_with(usk: &Self::Usk, ct: &Self::Ct, witness: &Witness)
        -> Result<SharedSecret, Error>;

    /// Recovers the shared secret if the ciphertext's attributes satisfy the key's tree.
    fn decaps(usk: &Self::Usk, ct: &Self::Ct) -> Result<SharedSecret, Error> {
        let witness = Self::policy(usk)
            .witness(Self::attributes(ct))
            .ok_or(Error::PolicyNotSatisfied)?;

        Self::decaps_with(usk, ct, &witness)
    }
}

pub(crate) fn check_security(config: &Config) -> Result<(), Error> {
    if config.security_bits > CURVE_SECURITY_BITS {
        tracing::warn!(
            requested = config.security_bits,
            available = CURVE_SECURITY_BITS,
            "security level not supported by BLS12-381"
        );
        return Err(Error::GroupInit);
    }

    Ok(())
}
