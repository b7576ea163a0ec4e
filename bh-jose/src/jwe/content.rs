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

//! Authenticated content encryption, [RFC 7518, section 5][1].
//!
//! [1]: https://datatracker.ietf.org/doc/html/rfc7518#section-5

use bherror::traits::ForeignError as _;
use openssl::{
    hash::MessageDigest,
    memcmp,
    pkey::PKey,
    sign::Signer,
    symm::{decrypt_aead, encrypt_aead, Cipher},
};

use super::cek::Cek;
use crate::{
    alg::ContentEncryptionAlgorithm,
    error::{CryptoError, DecryptionError, Error, Result},
};

const GCM_TAG_LEN: usize = 16;

/// The output of one authenticated encryption: IV, ciphertext and tag, each
/// carried in its own JWE segment.
pub(crate) struct EncryptedContent {
    pub(crate) iv: Vec<u8>,
    pub(crate) ciphertext: Vec<u8>,
    pub(crate) tag: Vec<u8>,
}

fn aes_gcm(algorithm: ContentEncryptionAlgorithm) -> Cipher {
    match algorithm {
        ContentEncryptionAlgorithm::A128Gcm => Cipher::aes_128_gcm(),
        ContentEncryptionAlgorithm::A192Gcm => Cipher::aes_192_gcm(),
        _ => Cipher::aes_256_gcm(),
    }
}

fn aes_cbc(algorithm: ContentEncryptionAlgorithm) -> Cipher {
    match algorithm {
        ContentEncryptionAlgorithm::A128CbcHs256 => Cipher::aes_128_cbc(),
        ContentEncryptionAlgorithm::A192CbcHs384 => Cipher::aes_192_cbc(),
        _ => Cipher::aes_256_cbc(),
    }
}

fn cbc_hmac_digest(algorithm: ContentEncryptionAlgorithm) -> MessageDigest {
    match algorithm {
        ContentEncryptionAlgorithm::A128CbcHs256 => MessageDigest::sha256(),
        ContentEncryptionAlgorithm::A192CbcHs384 => MessageDigest::sha384(),
        _ => MessageDigest::sha512(),
    }
}

/// Encrypts `plaintext` under the CEK, authenticating `aad`.
///
/// The IV comes from the CEK itself, so GCM invocations under a reused key
/// keep their uniqueness guarantee.
pub(crate) fn encrypt(cek: &Cek, plaintext: &[u8], aad: &[u8]) -> Result<EncryptedContent> {
    let algorithm = cek.algorithm();
    let iv = cek.next_iv()?;

    if algorithm.is_gcm() {
        let mut tag = vec![0u8; GCM_TAG_LEN];
        let ciphertext = encrypt_aead(
            aes_gcm(algorithm),
            cek.bytes(),
            Some(&iv),
            aad,
            plaintext,
            &mut tag,
        )
        .foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))?;

        return Ok(EncryptedContent {
            iv,
            ciphertext,
            tag,
        });
    }

    let (mac_key, enc_key) = split_composite_key(algorithm, cek.bytes());
    let ciphertext = openssl::symm::encrypt(aes_cbc(algorithm), enc_key, Some(&iv), plaintext)
        .foreign_err(|| Error::Crypto(CryptoError::CryptoBackend))?;
    let tag = cbc_hmac_tag(algorithm, mac_key, aad, &iv, &ciphertext)?;

    Ok(EncryptedContent {
        iv,
        ciphertext,
        tag,
    })
}

/// Decrypts and authenticates one JWE content segment set.
///
/// The tag is verified before any plaintext is released; a failed check is a
/// [`DecryptionError::IntegrityCheckFailed`].
pub(crate) fn decrypt(
    algorithm: ContentEncryptionAlgorithm,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    // recovered key bytes go through the same length check as fresh ones
    let cek = Cek::from_bytes(algorithm, key.to_vec())?;

    if algorithm.is_gcm() {
        return decrypt_aead(aes_gcm(algorithm), cek.bytes(), Some(iv), aad, ciphertext, tag)
            .foreign_err(|| Error::Decryption(DecryptionError::IntegrityCheckFailed));
    }

    let (mac_key, enc_key) = split_composite_key(algorithm, cek.bytes());

    let expected = cbc_hmac_tag(algorithm, mac_key, aad, iv, ciphertext)?;
    if expected.len() != tag.len() || !memcmp::eq(&expected, tag) {
        return Err(crate::error::root(DecryptionError::IntegrityCheckFailed));
    }

    openssl::symm::decrypt(aes_cbc(algorithm), enc_key, Some(iv), ciphertext)
        .foreign_err(|| Error::Decryption(DecryptionError::IntegrityCheckFailed))
}

/// Splits a CBC-HMAC composite key into its MAC and encryption halves
/// ([RFC 7518, section 5.2.2.1][1]): the MAC key is the initial half.
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7518#section-5.2.2.1
fn split_composite_key(
    algorithm: ContentEncryptionAlgorithm,
    cek: &[u8],
) -> (&[u8], &[u8]) {
    cek.split_at(algorithm.key_len() / 2)
}

/// The truncated HMAC over `aad || iv || ciphertext || be64(bits(aad))`.
fn cbc_hmac_tag(
    algorithm: ContentEncryptionAlgorithm,
    mac_key: &[u8],
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let backend = || Error::Crypto(CryptoError::CryptoBackend);

    let pkey = PKey::hmac(mac_key).foreign_err(backend)?;
    let mut signer = Signer::new(cbc_hmac_digest(algorithm), &pkey).foreign_err(backend)?;

    signer.update(aad).foreign_err(backend)?;
    signer.update(iv).foreign_err(backend)?;
    signer.update(ciphertext).foreign_err(backend)?;
    let aad_bits = (aad.len() as u64) * 8;
    signer.update(&aad_bits.to_be_bytes()).foreign_err(backend)?;

    let mut tag = signer.sign_to_vec().foreign_err(backend)?;
    tag.truncate(mac_key.len());
    Ok(tag)
}
