//! The circuit cipher: a parameter-driven byte transform layered under
//! AES-256-CBC.
//!
//! Encryption pads the plaintext with PKCS#7, runs `permutation_rounds` rounds
//! of substitution, logic mixing and rotation keyed by the derived key, then
//! encrypts the result with AES-256-CBC under a fresh IV. The wire format is
//! `base64(iv || ciphertext)`. There is no authentication; a wrong passphrase
//! or a tampered blob surfaces as a padding error at best.

use aes::Aes256;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::{NoPadding, Pkcs7, RawPadding};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use log::debug;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::document::CircuitDocument;
use crate::graph::analyze_circuit;
use crate::params::{CipherParameters, derive_parameters};
use crate::rng::secure_rng;

pub const KEY_BYTES: usize = 32;
pub const BLOCK_BYTES: usize = 16;
pub const IV_BYTES: usize = 16;

/// Number of leading key bytes stirred by the matrix during key derivation.
const KEY_MIX_BYTES: usize = 16;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("ciphertext could not be decoded: {0}")]
    DecodeFailure(String),

    #[error("invalid padding after decryption (wrong passphrase, circuit, or corrupted data)")]
    PaddingError,

    #[error("decrypted plaintext is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Cipher engine bound to one parameter set. Immutable and shareable
/// across threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CircuitCipher {
    params: CipherParameters,
}

impl CircuitCipher {
    pub fn new(params: CipherParameters) -> Self {
        Self { params }
    }

    /// Analyses `document` and builds a cipher from the derived parameters.
    pub fn from_document(document: &CircuitDocument) -> Self {
        Self::new(derive_parameters(&analyze_circuit(document)))
    }

    pub fn parameters(&self) -> &CipherParameters {
        &self.params
    }

    pub fn into_parameters(self) -> CipherParameters {
        self.params
    }

    /// Stretches a passphrase into a 32-byte key by stirring its SHA-256
    /// digest with the substitution matrix and logic operations, once per
    /// key round.
    pub fn derive_key(&self, passphrase: impl AsRef<[u8]>) -> Zeroizing<[u8; KEY_BYTES]> {
        let mut key = Zeroizing::new([0u8; KEY_BYTES]);
        key.copy_from_slice(&Sha256::digest(passphrase.as_ref()));

        let matrix = self.params.substitution_matrix();
        let ops = self.params.logic_ops();
        for round in 0..self.params.key_rounds() {
            for i in 0..KEY_MIX_BYTES {
                let row = &matrix[i % matrix.len()];
                for (col, &m) in row.iter().enumerate() {
                    if m > 0 {
                        let idx = (col + round) % KEY_BYTES;
                        key[i] = key[i].wrapping_add(key[idx] ^ m);
                    }
                }
            }
            for i in 0..KEY_BYTES - 1 {
                key[i] = ops[i % ops.len()].apply(key[i], key[i + 1]);
            }
        }
        key
    }

    /// Forward circuit transform. Output length always equals input length.
    pub fn transform(&self, data: &[u8], key: &[u8; KEY_BYTES]) -> Vec<u8> {
        let mut buf = data.to_vec();
        for round in 0..self.params.permutation_rounds() {
            self.substitute(&mut buf, key, round);
            self.mix_forward(&mut buf, key, round);
            if let Some(shift) = self.rotation(buf.len(), round) {
                buf.rotate_right(shift);
            }
        }
        buf
    }

    /// Exact inverse of [`CircuitCipher::transform`] under the same key.
    pub fn inverse_transform(&self, data: &[u8], key: &[u8; KEY_BYTES]) -> Vec<u8> {
        let mut buf = data.to_vec();
        for round in (0..self.params.permutation_rounds()).rev() {
            if let Some(shift) = self.rotation(buf.len(), round) {
                buf.rotate_left(shift);
            }
            self.mix_backward(&mut buf, key, round);
            self.unsubstitute(&mut buf, key, round);
        }
        buf
    }

    /// Encrypts with an IV drawn from the operating system RNG.
    pub fn encrypt(&self, plaintext: impl AsRef<[u8]>, passphrase: impl AsRef<[u8]>) -> String {
        self.encrypt_with_rng(plaintext, passphrase, &mut secure_rng())
    }

    /// Encrypts with an IV drawn from `rng`. Deterministic RNGs give
    /// reproducible blobs.
    pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        plaintext: impl AsRef<[u8]>,
        passphrase: impl AsRef<[u8]>,
        rng: &mut R,
    ) -> String {
        let plaintext = plaintext.as_ref();
        let key = self.derive_key(passphrase);
        let padded = Zeroizing::new(pkcs7_pad(plaintext));
        let transformed = Zeroizing::new(self.transform(&padded, &key));

        let mut iv = [0u8; IV_BYTES];
        rng.fill_bytes(&mut iv);
        let body = Aes256CbcEnc::new((&*key).into(), (&iv).into())
            .encrypt_padded_vec_mut::<NoPadding>(&transformed);

        let mut blob = Vec::with_capacity(IV_BYTES + body.len());
        blob.extend_from_slice(&iv);
        blob.extend_from_slice(&body);
        debug!(
            "encrypted {} bytes into {} byte blob",
            plaintext.len(),
            blob.len()
        );
        STANDARD.encode(blob)
    }

    pub fn decrypt(
        &self,
        blob: impl AsRef<[u8]>,
        passphrase: impl AsRef<[u8]>,
    ) -> Result<Vec<u8>, CipherError> {
        let raw = STANDARD
            .decode(blob.as_ref())
            .map_err(|err| CipherError::DecodeFailure(err.to_string()))?;
        let Some((iv, body)) = raw.split_first_chunk::<IV_BYTES>() else {
            return Err(CipherError::DecodeFailure(format!(
                "blob is {} bytes, shorter than the {IV_BYTES}-byte IV",
                raw.len()
            )));
        };
        if body.len() % BLOCK_BYTES != 0 {
            return Err(CipherError::DecodeFailure(format!(
                "ciphertext length {} is not a multiple of {BLOCK_BYTES}",
                body.len()
            )));
        }

        let key = self.derive_key(passphrase);
        let transformed = Zeroizing::new(
            Aes256CbcDec::new((&*key).into(), iv.into())
                .decrypt_padded_vec_mut::<NoPadding>(body)
                .map_err(|_| CipherError::DecodeFailure("block decryption failed".into()))?,
        );
        let padded = self.inverse_transform(&transformed, &key);
        let plaintext = pkcs7_unpad(padded)?;
        debug!(
            "decrypted {} byte blob into {} bytes",
            raw.len(),
            plaintext.len()
        );
        Ok(plaintext)
    }

    pub fn decrypt_text(
        &self,
        blob: impl AsRef<[u8]>,
        passphrase: impl AsRef<[u8]>,
    ) -> Result<String, CipherError> {
        Ok(String::from_utf8(self.decrypt(blob, passphrase)?)?)
    }

    fn substitute(&self, buf: &mut [u8], key: &[u8; KEY_BYTES], round: usize) {
        for (i, byte) in buf.iter_mut().enumerate() {
            let mask = key[i % KEY_BYTES] ^ self.params.cell(i, round);
            *byte = byte.wrapping_add(mask);
        }
    }

    fn unsubstitute(&self, buf: &mut [u8], key: &[u8; KEY_BYTES], round: usize) {
        for (i, byte) in buf.iter_mut().enumerate() {
            let mask = key[i % KEY_BYTES] ^ self.params.cell(i, round);
            *byte = byte.wrapping_sub(mask);
        }
    }

    // Each byte absorbs a gate applied to its right-hand neighbour, which is
    // still unmixed at that point. Undoing right to left restores every
    // neighbour before it is needed.
    fn mix_forward(&self, buf: &mut [u8], key: &[u8; KEY_BYTES], round: usize) {
        for i in 0..buf.len().saturating_sub(1) {
            buf[i] ^= self.gate_mask(buf[i + 1], key, i, round);
        }
    }

    fn mix_backward(&self, buf: &mut [u8], key: &[u8; KEY_BYTES], round: usize) {
        for i in (0..buf.len().saturating_sub(1)).rev() {
            buf[i] ^= self.gate_mask(buf[i + 1], key, i, round);
        }
    }

    #[inline]
    fn gate_mask(&self, neighbour: u8, key: &[u8; KEY_BYTES], i: usize, round: usize) -> u8 {
        let ops = self.params.logic_ops();
        ops[(i + round) % ops.len()].apply(neighbour, key[i % KEY_BYTES])
    }

    /// Right-rotation applied at the end of `round`: the matrix cell of the
    /// buffer's final index. `None` for buffers too short to rotate.
    fn rotation(&self, len: usize, round: usize) -> Option<usize> {
        if len < 2 {
            return None;
        }
        Some(self.params.cell(len - 1, round) as usize % len)
    }
}

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let tail = data.len() % BLOCK_BYTES;
    let full = data.len() - tail;
    let mut last = [0u8; BLOCK_BYTES];
    last[..tail].copy_from_slice(&data[full..]);
    Pkcs7::raw_pad(&mut last, tail);

    let mut out = Vec::with_capacity(full + BLOCK_BYTES);
    out.extend_from_slice(&data[..full]);
    out.extend_from_slice(&last);
    out
}

fn pkcs7_unpad(mut data: Vec<u8>) -> Result<Vec<u8>, CipherError> {
    let last_start = data
        .len()
        .checked_sub(BLOCK_BYTES)
        .ok_or(CipherError::PaddingError)?;
    let kept = Pkcs7::raw_unpad(&data[last_start..])
        .map_err(|_| CipherError::PaddingError)?
        .len();
    data.truncate(last_start + kept);
    Ok(data)
}
