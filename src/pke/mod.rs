//! Hybrid encryption of arbitrary payloads under an attribute set.
//!
//! A fresh shared secret is encapsulated with any [`KpAbeKem`] and keys AES-256-GCM. The
//! serialized KEM ciphertext is bound to the payload as associated data, so neither part can be
//! swapped out without decryption failing.

use crate::wire::{put_u32, Compress, Reader};
use crate::{AttributeSet, Error, KpAbeKem, SharedSecret};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use alloc::vec::Vec;
use core::fmt;
use rand::{CryptoRng, RngCore};

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_BYTES: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_BYTES: usize = 16;

/// A KEM ciphertext together with the AEAD-encrypted payload.
pub struct Ciphertext<K: KpAbeKem> {
    ct: K::Ct,
    nonce: [u8; NONCE_BYTES],
    tag: [u8; TAG_BYTES],
    payload: Vec<u8>,
}

impl<K: KpAbeKem> Ciphertext<K> {
    /// The attribute set this ciphertext is labelled with.
    pub fn attributes(&self) -> &AttributeSet {
        K::attributes(&self.ct)
    }

    /// The encapsulated key part.
    pub fn kem_ciphertext(&self) -> &K::Ct {
        &self.ct
    }

    /// The encrypted payload, without the tag.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl<K: KpAbeKem> Clone for Ciphertext<K> {
    fn clone(&self) -> Self {
        Ciphertext {
            ct: self.ct.clone(),
            nonce: self.nonce,
            tag: self.tag,
            payload: self.payload.clone(),
        }
    }
}

impl<K: KpAbeKem> PartialEq for Ciphertext<K> {
    fn eq(&self, other: &Self) -> bool {
        self.ct == other.ct
            && self.nonce == other.nonce
            && self.tag == other.tag
            && self.payload == other.payload
    }
}

impl<K: KpAbeKem> fmt::Debug for Ciphertext<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ciphertext")
            .field("scheme", &K::IDENTIFIER)
            .field("ct", &self.ct)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// `len ‖ kem-ct ‖ nonce ‖ tag ‖ payload`, the payload runs to the end of the input.
impl<K: KpAbeKem> Compress for Ciphertext<K> {
    fn write_bytes(&self, out: &mut Vec<u8>) {
        let ct = self.ct.to_bytes();
        put_u32(out, ct.len());
        out.extend_from_slice(&ct);
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.payload);
    }

    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let len = reader.length()?;
        let ct = K::Ct::from_bytes(reader.take(len)?)?;

        let mut nonce = [0u8; NONCE_BYTES];
        nonce.copy_from_slice(reader.take(NONCE_BYTES)?);
        let mut tag = [0u8; TAG_BYTES];
        tag.copy_from_slice(reader.take(TAG_BYTES)?);
        let payload = reader.take(reader.remaining())?.to_vec();

        Ok(Ciphertext {
            ct,
            nonce,
            tag,
            payload,
        })
    }
}

fn cipher(ss: &SharedSecret) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(ss.as_bytes()))
}

/// AEAD failures are opaque, in both directions.
fn aead_failure(_: aes_gcm::Error) -> Error {
    Error::Integrity
}

/// Encrypts `plaintext` so that only keys whose access tree is satisfied by `attrs` can read it.
pub fn encrypt<K, R>(
    pk: &K::Pk,
    attrs: &AttributeSet,
    plaintext: &[u8],
    rng: &mut R,
) -> Result<Ciphertext<K>, Error>
where
    K: KpAbeKem,
    R: RngCore + CryptoRng,
{
    let (ct, ss) = K::encaps(pk, attrs, rng)?;

    let mut nonce = [0u8; NONCE_BYTES];
    rng.try_fill_bytes(&mut nonce).map_err(|_| Error::Randomness)?;

    let aad = ct.to_bytes();
    let mut payload = plaintext.to_vec();
    let tag = cipher(&ss)
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), &aad, &mut payload)
        .map_err(aead_failure)?;

    let mut tag_bytes = [0u8; TAG_BYTES];
    tag_bytes.copy_from_slice(&tag);

    tracing::debug!(scheme = K::IDENTIFIER, len = payload.len(), "payload encrypted");

    Ok(Ciphertext {
        ct,
        nonce,
        tag: tag_bytes,
        payload,
    })
}

/// Decrypts a ciphertext with a user secret key.
///
/// Fails with [`Error::PolicyNotSatisfied`] if the key's tree rejects the ciphertext's attributes
/// and with [`Error::Integrity`] if any part of the ciphertext was altered.
pub fn decrypt<K: KpAbeKem>(usk: &K::Usk, ct: &Ciphertext<K>) -> Result<Vec<u8>, Error> {
    let ss = K::decaps(usk, &ct.ct)?;

    let aad = ct.ct.to_bytes();
    let mut plaintext = ct.payload.clone();
    cipher(&ss)
        .decrypt_in_place_detached(
            Nonce::from_slice(&ct.nonce),
            &aad,
            &mut plaintext,
            Tag::from_slice(&ct.tag),
        )
        .map_err(|e| {
            tracing::debug!(scheme = K::IDENTIFIER, "payload failed to authenticate");
            aead_failure(e)
        })?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessTree, Attribute, Config, Policy};
    use alloc::vec;

    #[test]
    fn aead_failures_are_integrity_errors() {
        assert_eq!(aead_failure(aes_gcm::Error), Error::Integrity);
    }

    macro_rules! test_pke {
        ($scheme: ident, $kem: ty) => {
            mod $scheme {
                use super::*;
                type Kem = $kem;

                fn setup() -> (
                    <Kem as KpAbeKem>::Pk,
                    <Kem as KpAbeKem>::Usk,
                    Ciphertext<Kem>,
                ) {
                    let mut rng = rand::thread_rng();
                    let universe: Vec<Attribute> = ["admin", "finance", "eng"]
                        .iter()
                        .map(|a| Attribute::from(*a))
                        .collect();
                    let (pk, sk) = Kem::setup(&Config::default(), &universe, &mut rng).unwrap();
                    let tree = AccessTree::new(&Policy::and(vec![
                        Policy::leaf("finance"),
                        Policy::leaf("eng"),
                    ]))
                    .unwrap();
                    let usk = Kem::keygen(&sk, &tree, &mut rng).unwrap();

                    let attrs = AttributeSet::from(["finance", "eng", "admin"]);
                    let ct = encrypt::<Kem, _>(&pk, &attrs, b"Q3-report", &mut rng).unwrap();

                    (pk, usk, ct)
                }

                #[test]
                fn eq_encrypt_decrypt() {
                    let (_, usk, ct) = setup();
                    assert_eq!(decrypt(&usk, &ct).unwrap(), b"Q3-report");
                    assert_ne!(ct.payload(), b"Q3-report");
                }

                #[test]
                fn unsatisfied_policy_is_rejected() {
                    let mut rng = rand::thread_rng();
                    let (pk, usk, _) = setup();
                    let ct = encrypt::<Kem, _>(
                        &pk,
                        &AttributeSet::from(["finance"]),
                        b"Q3-report",
                        &mut rng,
                    )
                    .unwrap();

                    assert_eq!(decrypt(&usk, &ct), Err(Error::PolicyNotSatisfied));
                }

                #[test]
                fn empty_payload() {
                    let mut rng = rand::thread_rng();
                    let (pk, usk, _) = setup();
                    let attrs = AttributeSet::from(["finance", "eng"]);
                    let ct = encrypt::<Kem, _>(&pk, &attrs, b"", &mut rng).unwrap();

                    assert_eq!(decrypt(&usk, &ct).unwrap(), b"");
                }

                #[test]
                fn every_bit_flip_is_detected() {
                    let (_, usk, ct) = setup();

                    for byte in 0..ct.payload.len() {
                        for bit in 0..8 {
                            let mut bad = ct.clone();
                            bad.payload[byte] ^= 1 << bit;
                            assert_eq!(decrypt(&usk, &bad), Err(Error::Integrity));
                        }
                    }

                    for byte in 0..TAG_BYTES {
                        for bit in 0..8 {
                            let mut bad = ct.clone();
                            bad.tag[byte] ^= 1 << bit;
                            assert_eq!(decrypt(&usk, &bad), Err(Error::Integrity));
                        }
                    }

                    let mut bad = ct.clone();
                    bad.nonce[0] ^= 0x01;
                    assert_eq!(decrypt(&usk, &bad), Err(Error::Integrity));
                }

                #[test]
                fn swapped_key_part_is_detected() {
                    let mut rng = rand::thread_rng();
                    let (pk, usk, ct) = setup();
                    let other = encrypt::<Kem, _>(
                        &pk,
                        Kem::attributes(&ct.ct),
                        b"Q3-report",
                        &mut rng,
                    )
                    .unwrap();

                    let mut bad = ct.clone();
                    bad.ct = other.ct;
                    assert_eq!(decrypt(&usk, &bad), Err(Error::Integrity));
                }

                #[test]
                fn eq_serialize_deserialize() {
                    let (_, usk, ct) = setup();
                    let bytes = ct.to_bytes();
                    let ct2 = Ciphertext::<Kem>::from_bytes(&bytes).unwrap();

                    assert_eq!(ct, ct2);
                    assert_eq!(decrypt(&usk, &ct2).unwrap(), b"Q3-report");
                    assert_eq!(
                        Ciphertext::<Kem>::from_bytes(&bytes[..20]),
                        Err(Error::Malformed)
                    );
                }

                #[test]
                fn randomness_failure_is_reported() {
                    let (pk, _, ct) = setup();
                    assert_eq!(
                        encrypt::<Kem, _>(
                            &pk,
                            ct.attributes(),
                            b"Q3-report",
                            &mut crate::test_macros::FailingRng
                        ),
                        Err(Error::Randomness)
                    );
                }
            }
        };
    }

    #[cfg(feature = "gpsw")]
    test_pke!(gpsw, crate::kem::gpsw::Gpsw);

    #[cfg(feature = "gpsw_lu")]
    test_pke!(gpsw_lu, crate::kem::gpsw_lu::GpswLu);
}
