//! IND-sAtt-CPA secure small-universe KP-ABE KEM by Goyal, Pandey, Sahai and Waters.
//! * From: "[Attribute-Based Encryption for Fine-Grained Access Control of Encrypted Data](https://eprint.iacr.org/2006/309.pdf)"
//!
//! Every attribute gets a secret exponent `t_i` at setup and a public element `T_i = g2^{t_i}`.
//! Only attributes of the setup universe can appear in policies and ciphertexts.
//!
//! Leaf keys live in G1 and ciphertext components in G2, so that
//! `e(D_x, E_i) = e(g1, g2)^{s · q_x(0)}`.

use crate::kem::{check_security, KpAbeKem, SharedSecret};
use crate::policy::NodeId;
use crate::util::{batch_affine, rand_nonzero_scalar, rand_scalar, SecretScalar};
use crate::wire::{put_g1, put_g2, put_gt, put_scalar, put_u32, Compress, Reader};
use crate::{AccessTree, Attribute, AttributeSet, Config, Error, Witness};
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;
use irmaseal_curve::{
    multi_miller_loop, pairing, G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Gt,
    Scalar,
};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Public key parameters generated by the PKG used to encaps messages.
/// Also known as MPK.
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    t: BTreeMap<Attribute, G2Affine>,
    y: Gt,
}

/// Secret key parameter generated by the PKG used to extract user secret keys.
/// Also known as MSK.
pub struct SecretKey {
    y: SecretScalar,
    t: BTreeMap<Attribute, SecretScalar>,
}

/// User secret key. Can be used to decaps the shared secret of ciphertexts whose attributes
/// satisfy its access tree.
#[derive(Clone, Debug, PartialEq)]
pub struct UserSecretKey {
    tree: AccessTree,
    d: BTreeMap<NodeId, G1Affine>,
}

/// Encrypted message. Can only be decrypted with a user secret key whose tree is satisfied by
/// the attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct CipherText {
    attributes: AttributeSet,
    e: G2Affine,
    e_i: Vec<G2Affine>,
}

impl PublicKey {
    /// Attributes this system was set up with.
    pub fn universe(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.t.keys()
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        self.y.zeroize();
        self.t.values_mut().for_each(Zeroize::zeroize);
    }
}

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretKey {}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("attributes", &self.t.len())
            .finish_non_exhaustive()
    }
}

impl Compress for PublicKey {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        put_u32(out, self.t.len());
        for (attr, t_i) in &self.t {
            attr.write_bytes(out);
            put_g2(out, t_i);
        }
        put_gt(out, &self.y);
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let count = reader.length()?;
        let mut t = BTreeMap::new();
        for _ in 0..count {
            let attr = Attribute::read_bytes(reader)?;
            if t.insert(attr, reader.g2()?).is_some() {
                return Err(Error::Malformed);
            }
        }
        let y = reader.gt()?;

        Ok(PublicKey { t, y })
    }
}

impl Compress for SecretKey {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        put_scalar(out, &self.y.0);
        put_u32(out, self.t.len());
        for (attr, t_i) in &self.t {
            attr.write_bytes(out);
            put_scalar(out, &t_i.0);
        }
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let y = SecretScalar(reader.scalar()?);
        let count = reader.length()?;
        let mut sk = SecretKey {
            y,
            t: BTreeMap::new(),
        };
        for _ in 0..count {
            let attr = Attribute::read_bytes(reader)?;
            let t_i = reader.scalar()?;
            if bool::from(t_i.ct_eq(&Scalar::zero()))
                || sk.t.insert(attr, SecretScalar(t_i)).is_some()
            {
                return Err(Error::Malformed);
            }
        }

        Ok(sk)
    }
}

impl Compress for UserSecretKey {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        self.tree.write_bytes(out);
        for d_x in self.d.values() {
            put_g1(out, d_x);
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
            d.insert(id, reader.g1()?);
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
            put_g2(out, e_i);
        }
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let e = reader.g2()?;
        let count = reader.length()?;
        let mut attributes = AttributeSet::new();
        let mut e_i = Vec::new();
        for _ in 0..count {
            let attr = Attribute::read_bytes(reader)?;
            // Components are stored in attribute order, anything else cannot be realigned.
            if attributes.iter().next_back().map_or(false, |last| *last >= attr) {
                return Err(Error::Malformed);
            }
            attributes.insert(attr);
            e_i.push(reader.g2()?);
        }

        Ok(CipherText { attributes, e, e_i })
    }
}

/// The small-universe GPSW scheme.
#[derive(Clone, Copy, Debug)]
pub struct Gpsw;

impl KpAbeKem for Gpsw {
    const IDENTIFIER: &'static str = "gpsw";

    type Pk = PublicKey;
    type Sk = SecretKey;
    type Usk = UserSecretKey;
    type Ct = CipherText;

    /// Draws `y` and a non-zero `t_i` for every attribute of `universe`.
    ///
    /// Fails with [`Error::EmptyAttributeSet`] if the universe is empty.
    fn setup<R: RngCore + CryptoRng>(
        config: &Config,
        universe: &[Attribute],
        rng: &mut R,
    ) -> Result<(PublicKey, SecretKey), Error> {
        check_security(config)?;
        if universe.is_empty() {
            return Err(Error::EmptyAttributeSet);
        }

        let mut sk = SecretKey {
            y: SecretScalar(rand_scalar(rng)?),
            t: BTreeMap::new(),
        };
        for attr in universe {
            sk.t.insert(attr.clone(), SecretScalar(rand_nonzero_scalar(rng)?));
        }

        let points: Vec<G2Projective> = sk
            .t
            .values()
            .map(|t_i| G2Projective::generator() * t_i.0)
            .collect();
        let t = sk.t.keys().cloned().zip(batch_affine(&points)).collect();
        let y = pairing(&G1Affine::generator(), &G2Affine::generator()) * sk.y.0;

        tracing::debug!(universe = sk.t.len(), "gpsw setup");

        Ok((PublicKey { t, y }, sk))
    }

    /// Computes `D_x = g1^{q_x(0) / t_i}` for every leaf `x` labelled `i`.
    fn keygen<R: RngCore + CryptoRng>(
        sk: &SecretKey,
        tree: &AccessTree,
        rng: &mut R,
    ) -> Result<UserSecretKey, Error> {
        // Resolve every leaf before drawing any randomness.
        let mut ids = Vec::new();
        let mut inv_t: Zeroizing<Vec<SecretScalar>> = Zeroizing::new(Vec::new());
        for (id, attr) in tree.leaves() {
            let t_i = sk
                .t
                .get(attr)
                .ok_or_else(|| Error::AttributeNotInUniverse(attr.clone()))?;
            let inv: Option<Scalar> = t_i.0.invert().into();
            ids.push(id);
            inv_t.push(SecretScalar(inv.ok_or(Error::InvalidElement)?));
        }

        let shares = tree.share_secret(sk.y.0, rng)?;

        let points: Vec<G1Projective> = ids
            .iter()
            .zip(inv_t.iter())
            .map(|(id, inv)| G1Projective::generator() * (shares[*id].0 * inv.0))
            .collect();
        let d = ids.into_iter().zip(batch_affine(&points)).collect();

        tracing::debug!(nodes = tree.len(), "gpsw keygen");

        Ok(UserSecretKey {
            tree: tree.clone(),
            d,
        })
    }

    /// Computes `E = g2^s`, `E_i = T_i^s` and derives the shared secret from `Y^s`.
    fn encaps<R: RngCore + CryptoRng>(
        pk: &PublicKey,
        attrs: &AttributeSet,
        rng: &mut R,
    ) -> Result<(CipherText, SharedSecret), Error> {
        if attrs.is_empty() {
            return Err(Error::EmptyAttributeSet);
        }
        let bases = attrs
            .iter()
            .map(|attr| {
                pk.t.get(attr)
                    .ok_or_else(|| Error::AttributeNotInUniverse(attr.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let s = Zeroizing::new(SecretScalar(rand_scalar(rng)?));

        let e = G2Affine::from(G2Projective::generator() * s.0);
        let points: Vec<G2Projective> = bases
            .into_iter()
            .map(|t_i| G2Projective::from(t_i) * s.0)
            .collect();
        let e_i = batch_affine(&points);

        let k = SharedSecret::from(&(pk.y * s.0));

        tracing::debug!(attributes = attrs.len(), "gpsw encaps");

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

    /// Computes `Π e(D_x, E_i)^{c_x} = e(g1, g2)^{s · y}` in a single multi-Miller loop, where
    /// `c_x` is the Lagrange weight of leaf `x` along the witness.
    fn decaps_with(
        usk: &UserSecretKey,
        ct: &CipherText,
        witness: &Witness,
    ) -> Result<SharedSecret, Error> {
        let e_i: BTreeMap<&Attribute, &G2Affine> =
            ct.attributes.iter().zip(ct.e_i.iter()).collect();

        let mut lhs = Vec::new();
        let mut rhs = Vec::new();
        for (id, c) in witness.coefficients(&usk.tree)? {
            let attr = usk
                .tree
                .node(id)
                .and_then(|n| n.attribute())
                .ok_or(Error::Malformed)?;
            let e_i = e_i.get(attr).ok_or(Error::PolicyNotSatisfied)?;
            let d_x = usk.d.get(&id).ok_or(Error::Malformed)?;

            lhs.push(G1Affine::from(G1Projective::from(d_x) * c));
            rhs.push(G2Prepared::from(**e_i));
        }

        let terms: Vec<(&G1Affine, &G2Prepared)> = lhs.iter().zip(rhs.iter()).collect();
        let f_root = multi_miller_loop(&terms).final_exponentiation();

        tracing::trace!(leaves = terms.len(), "gpsw decaps");

        Ok(SharedSecret::from(&f_root))
    }
}
