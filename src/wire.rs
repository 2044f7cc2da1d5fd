//! Byte serialization of the scheme's artifacts.
//!
//! All integers are big-endian `u32`, group elements use their compressed form.

use crate::util::{G1_BYTES, G2_BYTES, GT_BYTES, SCALAR_BYTES};
use crate::Error;
use alloc::vec::Vec;
use arrayref::array_ref;
use byteorder::{BigEndian, ByteOrder};
use irmaseal_curve::{G1Affine, G2Affine, Gt, Scalar};
use subtle::CtOption;

/// Artifacts of the system that can be serialized should implement this trait.
///
/// Secret artifacts such as the master secret key and user secret keys implement this as well,
/// callers are responsible for where those bytes end up.
pub trait Compress: Sized {
    /// Appends the serialized artifact to `out`.
    fn write_bytes(&self, out: &mut Vec<u8>);

    /// Reads one artifact from the front of `reader`.
    fn read_bytes(reader: &mut Reader<'_>) -> Result<Self, Error>;

    /// Serializes this artifact.
    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_bytes(&mut out);
        out
    }

    /// Deserializes an artifact, rejecting trailing bytes.
    fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = Reader::new(bytes);
        let res = Self::read_bytes(&mut reader)?;
        reader.finish()?;

        Ok(res)
    }
}

/// Cursor over a serialized artifact.
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes }
    }

    /// Number of bytes not consumed yet.
    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.bytes.len() < n {
            return Err(Error::Malformed);
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;

        Ok(head)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn u32(&mut self) -> Result<u32, Error> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    /// Reads a `u32` length or count.
    pub fn length(&mut self) -> Result<usize, Error> {
        Ok(self.u32()? as usize)
    }

    pub fn g1(&mut self) -> Result<G1Affine, Error> {
        let b = self.take(G1_BYTES)?;
        element(G1Affine::from_compressed(array_ref![b, 0, G1_BYTES]))
    }

    pub fn g2(&mut self) -> Result<G2Affine, Error> {
        let b = self.take(G2_BYTES)?;
        element(G2Affine::from_compressed(array_ref![b, 0, G2_BYTES]))
    }

    pub fn gt(&mut self) -> Result<Gt, Error> {
        let b = self.take(GT_BYTES)?;
        element(Gt::from_compressed(array_ref![b, 0, GT_BYTES]))
    }

    pub fn scalar(&mut self) -> Result<Scalar, Error> {
        let b = self.take(SCALAR_BYTES)?;
        element(Scalar::from_bytes(array_ref![b, 0, SCALAR_BYTES]))
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(self) -> Result<(), Error> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(Error::Malformed)
        }
    }
}

fn element<T>(el: CtOption<T>) -> Result<T, Error> {
    Option::from(el).ok_or(Error::InvalidElement)
}

pub(crate) fn put_u32(out: &mut Vec<u8>, n: usize) {
    debug_assert!(n <= u32::MAX as usize);

    let mut buf = [0u8; 4];
    BigEndian::write_u32(&mut buf, n as u32);
    out.extend_from_slice(&buf);
}

pub(crate) fn put_g1(out: &mut Vec<u8>, el: &G1Affine) {
    out.extend_from_slice(&el.to_compressed());
}

pub(crate) fn put_g2(out: &mut Vec<u8>, el: &G2Affine) {
    out.extend_from_slice(&el.to_compressed());
}

pub(crate) fn put_gt(out: &mut Vec<u8>, el: &Gt) {
    out.extend_from_slice(&el.to_compressed());
}

pub(crate) fn put_scalar(out: &mut Vec<u8>, s: &Scalar) {
    out.extend_from_slice(&s.to_bytes());
}
