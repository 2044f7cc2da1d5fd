//! Key-Policy Attribute-Based Encryption (KP-ABE) on the [BLS12-381 pairing-friendly elliptic curve](https://github.com/zkcrypto/bls12_381) in Rust.
//!
//! The construction is the one by Goyal, Pandey, Sahai and Waters:
//! * From: "[Attribute-Based Encryption for Fine-Grained Access Control of Encrypted Data](https://eprint.iacr.org/2006/309.pdf)"
//!
//! Ciphertexts are labelled with a set of attributes, user secret keys carry an access tree of
//! threshold gates. A key decrypts a ciphertext exactly when the ciphertext's attributes satisfy
//! the key's tree.
//!
//! This crate contains key encapsulation mechanisms (see [the kem module](`crate::kem`)) and a
//! hybrid encryption layer for arbitrary payloads (see [the pke module](`crate::pke`)).
//! Two variants of the scheme are available:
//! * small universe (`gpsw` feature): every attribute is fixed at setup,
//! * large universe (`gpsw_lu` feature): attributes are hashed onto the curve, any byte string works.
//!
//! # Examples
//!
//! ```
//! use kpabe::kem::gpsw::Gpsw;
//! use kpabe::{pke, AccessTree, Attribute, AttributeSet, Config, KpAbeKem, Policy};
//!
//! let mut rng = rand::thread_rng();
//! let universe: Vec<Attribute> = ["admin", "finance", "eng"].iter().map(|a| (*a).into()).collect();
//!
//! // Generate the public parameters and the master secret.
//! let (pk, sk) = Gpsw::setup(&Config::default(), &universe, &mut rng).unwrap();
//!
//! // Issue a key for the policy "finance AND eng".
//! let tree = AccessTree::new(&Policy::and(vec![Policy::leaf("finance"), Policy::leaf("eng")])).unwrap();
//! let usk = Gpsw::keygen(&sk, &tree, &mut rng).unwrap();
//!
//! // Encrypt under a set of attributes and decrypt with the key.
//! let attrs = AttributeSet::from(["finance", "eng", "admin"]);
//! let ct = pke::encrypt::<Gpsw, _>(&pk, &attrs, b"Q3-report", &mut rng).unwrap();
//!
//! assert_eq!(pke::decrypt::<Gpsw>(&usk, &ct).unwrap(), b"Q3-report");
//! ```

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(test)]
#[macro_use]
#[allow(unused)]
mod test_macros;

#[allow(unused)]
mod util;

mod attribute;
mod config;
mod error;

pub mod kem;
pub mod pke;
pub mod policy;
pub mod wire;

pub use attribute::{Attribute, AttributeSet};
pub use config::{Config, CURVE_SECURITY_BITS, DEFAULT_MAX_POLICY_DEPTH};
pub use error::Error;
pub use kem::{KpAbeKem, SharedSecret};
pub use policy::{AccessTree, NodeId, Policy, Witness};
pub use wire::Compress;
