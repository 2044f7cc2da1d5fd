//! Large-universe variant of the GPSW KP-ABE KEM, in the random oracle model.
//!
//! Attributes are not fixed at setup. Every attribute is hashed onto G1 instead, so any byte
//! string can be used in policies and ciphertexts.
//!
//! Each leaf `x` labelled `i` carries a blinded share and its blinding exponent in G2:
//! * `D_x = g1^{q_x(0)} · H(i)^{r_x}`,
//! * `R_x = g2^{r_x}`,
//!
//! and a ciphertext carries `E = g2^s` and `E_i = H(i)^s`. Then
//! `e(D_x, E) / e(E_i, R_x) = e(g1, g2)^{s · q_x(0)}`.

use crate::kem::{check_security, KpAbeKem, SharedSecret};
use crate::policy::NodeId;
use crate::util::{batch_affine, hash_to_g1, rand_scalar, SecretScalar};
use crate::wire::{put_g1, put_g2, put_gt, put_scalar, put_u32, Compress, Reader};
use crate::{AccessTree, Attribute, AttributeSet, Config, Error, Witness};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;
use irmaseal_curve::{
    multi_miller_loop, pairing, G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Gt,
};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Domain separation tag for hashing attributes onto G1.
const HASH_DOMAIN: &[u8] = b"kpabe-gpsw-lu-attribute-v1";

/// Public key parameters generated by the PKG used to encaps messages.
/// Also known as MPK.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    y: Gt,
}

/// Secret key parameter generated by the PKG used to extract user secret keys.
/// Also known as MSK.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    y: SecretScalar,
}

/// User secret key. Holds `(D_x, R_x)` for every leaf of its access tree.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSecretKey {
    tree: AccessTree,
    d: BTreeMap<NodeId, (G1Affine, G2Affine)>,
}

/// Encrypted message. Holds `E_i` for every attribute, in attribute order.
#[derive(Clone, Debug, PartialEq)]
pub struct CipherText {
    attributes: AttributeSet,
    e: G2Affine,
    e_i: Vec<G1Affine>,
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

fn hash_attribute(attr: &Attribute) -> G1Projective {
    hash_to_g1(HASH_DOMAIN, attr.as_bytes())
}

impl Compress for PublicKey {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        put_gt(out, &self.y);
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        Ok(PublicKey { y: reader.gt()? })
    }
}

impl Compress for SecretKey {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        put_scalar(out, &self.y.0);
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        Ok(SecretKey {
            y: SecretScalar(reader.scalar()?),
        })
    }
}

impl Compress for UserSecretKey {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        self.tree.write_bytes(out);
        for (d_x, r_x) in self.d.values() {
            put_g1(out, d_x);
            put_g2(out, r_x);
        }
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        UserSecretKey::read_with_config(reader, &Config::default())
    }
}

impl UserSecretKey {
    /// Deserializes a key whose tree was built with [`AccessTree::with_config`].
    pub fn from_bytes_with_config(bytes: &[u8], config: &Config) -> Result<Self, Error> {
        let mut reader = Reader::new(bytes);
        let usk = UserSecretKey::read_with_config(&mut reader, config)?;
        reader.finish()?;

        Ok(usk)
    }

    fn read_with_config(reader: &mut Reader<'_>, config: &Config) -> Result<Self, Error> {
        let tree = AccessTree::read_with_config(reader, config)?;
        let ids: Vec<NodeId> = tree.leaves().map(|(id, _)| id).collect();
        let mut d = BTreeMap::new();
        for id in ids {
            let d_x = reader.g1()?;
            let r_x = reader.g2()?;
            d.insert(id, (d_x, r_x));
        }

        Ok(UserSecretKey { tree, d })
    }
}

impl Compress for CipherText {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        put_g2(out, &self.e);
        put_u32(out, self.attributes.len());
        for (attr, e_i) in self.attributes.iter().zip(self.e_i.iter()) {
            attr.write_bytes(out);
            put_g1(out, e_i);
        }
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let e = reader.g2()?;
        let count = reader.length()?;
        let mut attributes = AttributeSet::new();
        let mut e_i = Vec::new();
        for _ in 0..count {
            let attr = Attribute::read_bytes(reader)?;
            if attributes.iter().next_back().map_or(false, |last| *last >= attr) {
                return Err(Error::Malformed);
            }
            attributes.insert(attr);
            e_i.push(reader.g1()?);
        }

        Ok(CipherText { attributes, e, e_i })
    }
}

/// The large-universe GPSW scheme.
#[derive(Clone, Copy, Debug)]
pub struct GpswLu;

impl KpAbeKem for GpswLu {
    const IDENTIFIER: &'static str = "gpsw-lu";

    type Pk = PublicKey;
    type Sk = SecretKey;
    type Usk = UserSecretKey;
    type Ct = CipherText;

    /// The universe is open, `universe` is not used.
    fn setup<R: RngCore + CryptoRng>(
        config: &Config,
        _universe: &[Attribute],
        rng: &mut R,
    ) -> Result<(PublicKey, SecretKey), Error> {
        check_security(config)?;

        let sk = SecretKey {
            y: SecretScalar(rand_scalar(rng)?),
        };
        let y = pairing(&G1Affine::generator(), &G2Affine::generator()) * sk.y.0;

        tracing::debug!("gpsw-lu setup");

        Ok((PublicKey { y }, sk))
    }

    fn keygen<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        tree: &AccessTree,
        rng: &mut R,
    ) -> Result<UserSecretKey, Error> {
        let shares = tree.share_secret(sk.y.0, rng)?;

        let mut ids = Vec::new();
        let mut d_x = Vec::new();
        let mut r_x = Vec::new();
        for (id, attr) in tree.leaves() {
            let r = Zeroizing::new(SecretScalar(rand_scalar(rng)?));
            ids.push(id);
            d_x.push(G1Projective::generator() * shares[id].0 + hash_attribute(attr) * r.0);
            r_x.push(G2Projective::generator() * r.0);
        }

        let d = ids
            .into_iter()
            .zip(batch_affine(&d_x).into_iter().zip(batch_affine(&r_x)))
            .collect();

        tracing::debug!(nodes = tree.len(), "gpsw-lu keygen");

        Ok(UserSecretKey {
            tree: tree.clone(),
            d,
        })
    }

    fn encaps<R: RngCore + CryptoRng>(
        pk: &PublicKey,
        attrs: &AttributeSet,
        rng: &mut R,
    ) -> Result<(CipherText, SharedSecret), Error> {
        if attrs.is_empty() {
            return Err(Error::EmptyAttributeSet);
        }

        let s = Zeroizing::new(SecretScalar(rand_scalar(rng)?));

        let e = G2Affine::from(G2Projective::generator() * s.0);
        let points: Vec<G1Projective> = attrs
            .iter()
            .map(|attr| hash_attribute(attr) * s.0)
            .collect();
        let e_i = batch_affine(&points);

        let k = SharedSecret::from(&(pk.y * s.0));

        tracing::debug!(attributes = attrs.len(), "gpsw-lu encaps");

        Ok((
            CipherText {
                attributes: attrs.clone(),
                e,
                e_i,
            },
            k,
        ))
    }

    fn policy(usk: &UserSecretKey) -> &AccessTree {
        &usk.tree
    }

    fn attributes(ct: &CipherText) -> &AttributeSet {
        &ct.attributes
    }

    /// Computes `e(Σ c_x · D_x, E) · Π e(−c_x · E_i, R_x)` in a single multi-Miller loop.
    fn decaps_with(
        usk: &UserSecretKey,
        ct: &CipherText,
        witness: &Witness,
    ) -> Result<SharedSecret, Error> {
        let e_i: BTreeMap<&Attribute, &G1Affine> =
            ct.attributes.iter().zip(ct.e_i.iter()).collect();

        let mut d_sum = G1Projective::identity();
        let mut blinds = Vec::new();
        let mut prepared = Vec::new();
        for (id, c) in witness.coefficients(&usk.tree)? {
            let attr = usk
                .tree
                .node(id)
                .and_then(|n| n.attribute())
                .ok_or(Error::Malformed)?;
            let e_i = e_i.get(attr).ok_or(Error::PolicyNotSatisfied)?;
            let (d_x, r_x) = usk.d.get(&id).ok_or(Error::Malformed)?;

            d_sum += G1Projective::from(d_x) * c;
            blinds.push(G1Projective::from(*e_i) * (-c));
            prepared.push(G2Prepared::from(*r_x));
        }

        let mut lhs = batch_affine(&blinds);
        lhs.push(G1Affine::from(d_sum));
        prepared.push(G2Prepared::from(ct.e));

        let terms: Vec<(&G1Affine, &G2Prepared)> = lhs.iter().zip(prepared.iter()).collect();
        let f_root = multi_miller_loop(&terms).final_exponentiation();

        tracing::trace!(leaves = blinds.len(), "gpsw-lu decaps");

        Ok(SharedSecret::from(&f_root))
    }
}
