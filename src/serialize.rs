//! Binary wire format and base64 text armor.
//!
//! Every object starts with a `[tag u8][version u8]` header followed by
//! little-endian fields. Polynomials travel in their NTT representation:
//! for each prime of the basis, `n` evaluations as u64.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::{HeError, Result};
use crate::params::ParamsId;
use crate::ring::ntt::NttPoly;
use crate::ring::rns::{RnsBasis, RnsPoly};

pub const WIRE_VERSION: u8 = 1;

/// Polynomial count ceiling for a single serialized object.
pub const MAX_COMPONENTS: usize = 1 << 12;

/// Object kind carried in the first header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireTag {
    Parameters = 0x01,
    PublicKey = 0x02,
    SecretKey = 0x03,
    Ciphertext = 0x04,
    MockPublicKey = 0x12,
    MockSecretKey = 0x13,
    MockCiphertext = 0x14,
}

impl WireTag {
    fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => WireTag::Parameters,
            0x02 => WireTag::PublicKey,
            0x03 => WireTag::SecretKey,
            0x04 => WireTag::Ciphertext,
            0x12 => WireTag::MockPublicKey,
            0x13 => WireTag::MockSecretKey,
            0x14 => WireTag::MockCiphertext,
            _ => return None,
        })
    }
}

/// Append-only encoder.
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new(tag: WireTag) -> Self {
        Self { buf: vec![tag as u8, WIRE_VERSION] }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_params_id(&mut self, id: &ParamsId) {
        self.buf.extend_from_slice(id.as_bytes());
    }

    /// Write a length-prefixed list of polynomials.
    pub fn put_polys(&mut self, polys: &[&RnsPoly]) {
        self.put_u16(polys.len() as u16);
        for poly in polys {
            for comp in &poly.components {
                for &e in &comp.evals {
                    self.put_u64(e);
                }
            }
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor-based decoder; every read is bounds-checked.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Check the header and position the cursor after it.
    pub fn new(buf: &'a [u8], expected: WireTag) -> Result<Self> {
        if buf.len() < 2 {
            return Err(HeError::Deserialization("truncated header".into()));
        }
        match WireTag::from_byte(buf[0]) {
            Some(tag) if tag == expected => {}
            Some(tag) => {
                return Err(HeError::Deserialization(format!(
                    "expected {expected:?}, found {tag:?}"
                )))
            }
            None => {
                return Err(HeError::Deserialization(format!("unknown object tag {:#04x}", buf[0])))
            }
        }
        if buf[1] != WIRE_VERSION {
            return Err(HeError::Deserialization(format!("unsupported wire version {}", buf[1])));
        }
        Ok(Self { buf, pos: 2 })
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(HeError::Deserialization(format!(
                "truncated payload: need {len} bytes at offset {}, have {}",
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_le_bytes(self.array()?))
    }

    pub fn params_id(&mut self) -> Result<ParamsId> {
        Ok(ParamsId::from_bytes(self.array()?))
    }

    /// Read a length-prefixed list of polynomials laid out over `basis`,
    /// rejecting evaluations outside [0, q_i).
    pub fn polys(&mut self, basis: &RnsBasis, min: usize, max: usize) -> Result<Vec<RnsPoly>> {
        let count = self.u16()? as usize;
        if count < min || count > max {
            return Err(HeError::Deserialization(format!(
                "expected between {min} and {max} polynomials, found {count}"
            )));
        }
        let n = basis.ring_degree;
        let needed = count * basis.num_moduli() * n * 8;
        if self.remaining() < needed {
            return Err(HeError::Deserialization(format!(
                "truncated polynomial data: need {needed} bytes, have {}",
                self.remaining()
            )));
        }

        let mut polys = Vec::with_capacity(count);
        for _ in 0..count {
            let mut components = Vec::with_capacity(basis.num_moduli());
            for plan in &basis.plans {
                let evals = (0..n).map(|_| self.u64()).collect::<Result<Vec<_>>>()?;
                let comp = NttPoly::from_evals(evals, plan.clone()).map_err(|_| {
                    HeError::Deserialization("polynomial evaluation out of range".into())
                })?;
                components.push(comp);
            }
            polys.push(RnsPoly { components, ring_degree: n });
        }
        Ok(polys)
    }

    /// Fail if bytes are left over.
    pub fn finish(self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(HeError::Deserialization(format!(
                "{} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}

/// Encode bytes as standard base64.
pub fn to_text(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64, ignoring surrounding whitespace.
pub fn from_text(text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text.trim())
        .map_err(|e| HeError::Deserialization(format!("invalid base64: {e}")))
}
