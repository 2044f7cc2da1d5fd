use crate::attribute::Attribute;
use core::fmt;

/// Errors produced by the scheme.
///
/// No variant ever carries secret material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The pairing group cannot satisfy the requested parameters.
    GroupInit,
    /// The secure random source failed to produce bytes.
    Randomness,
    /// The access policy is malformed.
    InvalidPolicy(&'static str),
    /// An attribute has no public parameters in this system.
    AttributeNotInUniverse(Attribute),
    /// Encryption requires at least one attribute.
    EmptyAttributeSet,
    /// The ciphertext attributes do not satisfy the key policy.
    PolicyNotSatisfied,
    /// Authenticated decryption failed.
    ///
    /// Wrong keys, corrupted ciphertexts and forged tags are indistinguishable.
    Integrity,
    /// The access policy nests deeper than allowed.
    PolicyTooDeep,
    /// A serialized group element or scalar is not valid.
    InvalidElement,
    /// A serialized artifact is truncated or has trailing bytes.
    Malformed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::GroupInit => write!(f, "could not initialize the pairing group"),
            Error::Randomness => write!(f, "secure randomness unavailable"),
            Error::InvalidPolicy(reason) => write!(f, "invalid access policy: {}", reason),
            Error::AttributeNotInUniverse(attr) => {
                write!(f, "attribute {} is not in the universe", attr)
            }
            Error::EmptyAttributeSet => write!(f, "attribute set is empty"),
            Error::PolicyNotSatisfied => write!(f, "attributes do not satisfy the policy"),
            Error::Integrity => write!(f, "integrity check failed"),
            Error::PolicyTooDeep => write!(f, "access policy is too deep"),
            Error::InvalidElement => write!(f, "invalid group element"),
            Error::Malformed => write!(f, "malformed encoding"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
