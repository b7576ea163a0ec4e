// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Content-encryption keys and their IV discipline.

use std::sync::Mutex;

use bherror::traits::ForeignError as _;

use crate::{
    alg::ContentEncryptionAlgorithm,
    error::{CryptoError, Error, Result, ValidationError},
};

/// Deterministic GCM IV construction per [NIST SP 800-38D, section 8.2.1][1]:
/// a random 32-bit fixed field followed by a 64-bit big-endian invocation
/// counter.  The counter belongs to the key, so a CEK can never repeat an IV
/// no matter how many messages it protects.
///
/// [1]: https://nvlpubs.nist.gov/nistpubs/Legacy/SP/nistspecialpublication800-38d.pdf
struct GcmIvState {
    fixed: [u8; 4],
    counter: u64,
}

/// A content-encryption key, bound to its `enc` algorithm for its whole
/// lifetime.
pub(crate) struct Cek {
    algorithm: ContentEncryptionAlgorithm,
    bytes: Vec<u8>,
    // present only for the GCM algorithms
    iv_state: Option<Mutex<GcmIvState>>,
}

impl Cek {
    /// Generates a fresh random CEK of the length `algorithm` requires.
    pub(crate) fn generate(algorithm: ContentEncryptionAlgorithm) -> Result<Self> {
        let mut bytes = vec![0u8; algorithm.key_len()];
        openssl::rand::rand_bytes(&mut bytes)
            .foreign_err(|| Error::Crypto(CryptoError::KeyGenerationFailed))?;
        Self::from_bytes(algorithm, bytes)
    }

    /// Wraps externally established key bytes (direct key agreement, or a
    /// CEK recovered during decryption), checking the length.
    pub(crate) fn from_bytes(
        algorithm: ContentEncryptionAlgorithm,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        if bytes.len() != algorithm.key_len() {
            return Err(crate::error::root(ValidationError::InvalidKey(format!(
                "{} requires a {}-byte key, got {}",
                algorithm,
                algorithm.key_len(),
                bytes.len()
            ))));
        }

        let iv_state = if algorithm.is_gcm() {
            let mut fixed = [0u8; 4];
            openssl::rand::rand_bytes(&mut fixed)
                .foreign_err(|| Error::Crypto(CryptoError::KeyGenerationFailed))?;
            Some(Mutex::new(GcmIvState { fixed, counter: 0 }))
        } else {
            None
        };

        Ok(Self {
            algorithm,
            bytes,
            iv_state,
        })
    }

    pub(crate) fn algorithm(&self) -> ContentEncryptionAlgorithm {
        self.algorithm
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Produces the next IV for this key.
    ///
    /// GCM IVs come from the per-key deterministic construction and fail once
    /// the invocation counter is exhausted; CBC IVs are independent random
    /// blocks.
    pub(crate) fn next_iv(&self) -> Result<Vec<u8>> {
        match &self.iv_state {
            Some(state) => {
                let mut state = state
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());

                let invocation = state.counter;
                state.counter = invocation.checked_add(1).ok_or_else(|| {
                    crate::error::root(CryptoError::KeyGenerationFailed)
                })?;

                let mut iv = Vec::with_capacity(12);
                iv.extend_from_slice(&state.fixed);
                iv.extend_from_slice(&invocation.to_be_bytes());
                Ok(iv)
            }
            None => {
                let mut iv = vec![0u8; self.algorithm.iv_len()];
                openssl::rand::rand_bytes(&mut iv)
                    .foreign_err(|| Error::Crypto(CryptoError::KeyGenerationFailed))?;
                Ok(iv)
            }
        }
    }
}

impl std::fmt::Debug for Cek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cek")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_has_algorithm_length() {
        use ContentEncryptionAlgorithm::*;
        for algorithm in [A128CbcHs256, A192CbcHs384, A256CbcHs512, A128Gcm, A192Gcm, A256Gcm] {
            let cek = Cek::generate(algorithm).unwrap();
            assert_eq!(cek.bytes().len(), algorithm.key_len());
        }
    }

    #[test]
    fn wrong_length_is_rejected() {
        let error = Cek::from_bytes(ContentEncryptionAlgorithm::A256Gcm, vec![0u8; 16]).unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InvalidKey(_))
        ));
    }

    #[test]
    fn gcm_ivs_share_fixed_field_and_count_up() {
        let cek = Cek::generate(ContentEncryptionAlgorithm::A128Gcm).unwrap();

        let first = cek.next_iv().unwrap();
        let second = cek.next_iv().unwrap();

        assert_eq!(first.len(), 12);
        assert_eq!(first[..4], second[..4]);
        assert_eq!(u64::from_be_bytes(first[4..].try_into().unwrap()), 0);
        assert_eq!(u64::from_be_bytes(second[4..].try_into().unwrap()), 1);
    }

    #[test]
    fn cbc_ivs_are_block_sized() {
        let cek = Cek::generate(ContentEncryptionAlgorithm::A128CbcHs256).unwrap();
        assert_eq!(cek.next_iv().unwrap().len(), 16);
    }
}
