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

//! CEK establishment and key encryption, [RFC 7518, section 4][1].
//!
//! [1]: https://datatracker.ietf.org/doc/html/rfc7518#section-4

use bherror::traits::ForeignError as _;
use openssl::{
    aes::{unwrap_key, wrap_key, AesKey},
    derive::Deriver,
    ec::EcKey,
    encrypt::{Decrypter, Encrypter},
    hash::MessageDigest,
    pkey::{PKey, Private, Public},
    rsa::Padding,
    symm::{decrypt_aead, encrypt_aead, Cipher},
};

use super::cek::Cek;
use crate::{
    alg::{ContentEncryptionAlgorithm, KeyManagementAlgorithm},
    error::{CryptoError, DecryptionError, Error, FormatError, Result, ValidationError},
    header::JoseHeader,
    jwk::WebKey,
    utils::concat_kdf::concat_kdf,
};

const GCM_KW_IV_LEN: usize = 12;
const GCM_KW_TAG_LEN: usize = 16;

/// The per-recipient output of key encryption: the encrypted-key segment
/// plus the header parameters the algorithm contributes.
#[derive(Debug)]
pub(crate) struct KeyEncryption {
    pub(crate) encrypted_key: Vec<u8>,
    pub(crate) ephemeral_key: Option<WebKey>,
    pub(crate) initialization_vector: Option<Vec<u8>>,
    pub(crate) authentication_tag: Option<Vec<u8>>,
}

impl KeyEncryption {
    fn plain(encrypted_key: Vec<u8>) -> Self {
        Self {
            encrypted_key,
            ephemeral_key: None,
            initialization_vector: None,
            authentication_tag: None,
        }
    }
}

fn invalid_key(message: &str) -> bherror::Error<Error> {
    crate::error::root(ValidationError::InvalidKey(message.to_string()))
}

fn backend() -> Error {
    Error::Crypto(CryptoError::CryptoBackend)
}

/// Establishes the CEK for a sole direct recipient (`dir` or `ECDH-ES`),
/// where the recipient key itself determines the content key.
///
/// For `ECDH-ES` the returned [`KeyEncryption`] carries the ephemeral key
/// the header must publish; its encrypted-key segment is always empty.
pub(crate) fn establish_direct_cek(
    algorithm: KeyManagementAlgorithm,
    key: &WebKey,
    encryption: ContentEncryptionAlgorithm,
    apu: Option<&[u8]>,
    apv: Option<&[u8]>,
) -> Result<(Cek, KeyEncryption)> {
    match algorithm {
        KeyManagementAlgorithm::Dir => {
            let raw = key
                .raw_bytes()
                .ok_or_else(|| invalid_key("\"dir\" requires a raw symmetric key"))?;
            Ok((
                Cek::from_bytes(encryption, raw.to_vec())?,
                KeyEncryption::plain(Vec::new()),
            ))
        }
        KeyManagementAlgorithm::EcdhEs => {
            let (derived, ephemeral) = ecdh_derive(
                key,
                encryption.as_str(),
                apu,
                apv,
                encryption.key_len(),
            )?;
            let mut encryption_result = KeyEncryption::plain(Vec::new());
            encryption_result.ephemeral_key = Some(ephemeral);
            Ok((Cek::from_bytes(encryption, derived)?, encryption_result))
        }
        other => Err(crate::error::root(ValidationError::AlgorithmKeyMismatch(
            other.to_string(),
        ))),
    }
}

/// Encrypts an established CEK for one recipient (the non-direct
/// algorithms).
pub(crate) fn encrypt_cek(
    algorithm: KeyManagementAlgorithm,
    key: &WebKey,
    cek: &Cek,
    apu: Option<&[u8]>,
    apv: Option<&[u8]>,
) -> Result<KeyEncryption> {
    key.check_algorithm(algorithm.into())?;

    match algorithm {
        KeyManagementAlgorithm::Dir | KeyManagementAlgorithm::EcdhEs => Err(
            crate::error::root(ValidationError::AlgorithmKeyMismatch(algorithm.to_string())),
        ),

        KeyManagementAlgorithm::Rsa1_5
        | KeyManagementAlgorithm::RsaOaep
        | KeyManagementAlgorithm::RsaOaep256 => {
            let rsa = key
                .rsa_public()
                .ok_or_else(|| invalid_key("an RSA public key is required"))?;
            let pkey = PKey::from_rsa(rsa.clone()).foreign_err(backend)?;

            let mut encrypter = Encrypter::new(&pkey).foreign_err(backend)?;
            configure_rsa_padding_enc(&mut encrypter, algorithm)?;

            let mut encrypted =
                vec![0u8; encrypter.encrypt_len(cek.bytes()).foreign_err(backend)?];
            let written = encrypter
                .encrypt(cek.bytes(), &mut encrypted)
                .foreign_err(backend)?;
            encrypted.truncate(written);

            Ok(KeyEncryption::plain(encrypted))
        }

        KeyManagementAlgorithm::A128Kw
        | KeyManagementAlgorithm::A192Kw
        | KeyManagementAlgorithm::A256Kw => {
            let kek = raw_wrap_key(algorithm, key)?;
            Ok(KeyEncryption::plain(aes_wrap(kek, cek.bytes())?))
        }

        KeyManagementAlgorithm::A128GcmKw
        | KeyManagementAlgorithm::A192GcmKw
        | KeyManagementAlgorithm::A256GcmKw => {
            let kek = raw_wrap_key(algorithm, key)?;

            let mut iv = vec![0u8; GCM_KW_IV_LEN];
            openssl::rand::rand_bytes(&mut iv)
                .foreign_err(|| Error::Crypto(CryptoError::KeyGenerationFailed))?;

            let mut tag = vec![0u8; GCM_KW_TAG_LEN];
            let encrypted = encrypt_aead(
                gcm_kw_cipher(algorithm),
                kek,
                Some(&iv),
                &[],
                cek.bytes(),
                &mut tag,
            )
            .foreign_err(backend)?;

            let mut result = KeyEncryption::plain(encrypted);
            result.initialization_vector = Some(iv);
            result.authentication_tag = Some(tag);
            Ok(result)
        }

        KeyManagementAlgorithm::EcdhEsA128Kw
        | KeyManagementAlgorithm::EcdhEsA192Kw
        | KeyManagementAlgorithm::EcdhEsA256Kw => {
            let wrap_len = algorithm
                .wrap_key_len()
                .unwrap_or_else(|| unreachable!("ECDH-ES+A*KW always wraps"));
            let (kek, ephemeral) =
                ecdh_derive(key, algorithm.as_str(), apu, apv, wrap_len)?;

            let mut result = KeyEncryption::plain(aes_wrap(&kek, cek.bytes())?);
            result.ephemeral_key = Some(ephemeral);
            Ok(result)
        }
    }
}

/// Recovers the CEK bytes for one recipient, [RFC 7516, section 5.2][1]
/// steps 8-10.
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-5.2
pub(crate) fn decrypt_cek(
    algorithm: KeyManagementAlgorithm,
    encryption: ContentEncryptionAlgorithm,
    key: &WebKey,
    encrypted_key: &[u8],
    header: &JoseHeader,
) -> Result<Vec<u8>> {
    key.check_algorithm(algorithm.into())?;

    if algorithm.is_direct() && !encrypted_key.is_empty() {
        return Err(crate::error::root(FormatError::EncryptedKeyLength(
            encrypted_key.len(),
        )));
    }

    match algorithm {
        KeyManagementAlgorithm::Dir => key
            .raw_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| invalid_key("\"dir\" requires a raw symmetric key")),

        KeyManagementAlgorithm::EcdhEs => ecdh_agree(
            key,
            header,
            encryption.as_str(),
            encryption.key_len(),
        ),

        KeyManagementAlgorithm::Rsa1_5
        | KeyManagementAlgorithm::RsaOaep
        | KeyManagementAlgorithm::RsaOaep256 => {
            let rsa = key
                .rsa_private()
                .ok_or_else(|| invalid_key("an RSA private key is required"))?;
            if encrypted_key.len() != rsa.size() as usize {
                return Err(crate::error::root(FormatError::EncryptedKeyLength(
                    encrypted_key.len(),
                )));
            }
            let pkey = PKey::from_rsa(rsa.clone()).foreign_err(backend)?;

            let mut decrypter = Decrypter::new(&pkey).foreign_err(backend)?;
            configure_rsa_padding_dec(&mut decrypter, algorithm)?;

            let failed = || Error::Decryption(DecryptionError::IntegrityCheckFailed);
            let mut decrypted =
                vec![0u8; decrypter.decrypt_len(encrypted_key).foreign_err(failed)?];
            let written = decrypter
                .decrypt(encrypted_key, &mut decrypted)
                .foreign_err(failed)?;
            decrypted.truncate(written);
            Ok(decrypted)
        }

        KeyManagementAlgorithm::A128Kw
        | KeyManagementAlgorithm::A192Kw
        | KeyManagementAlgorithm::A256Kw => {
            if encrypted_key.len() != encryption.key_len() + 8 {
                return Err(crate::error::root(FormatError::EncryptedKeyLength(
                    encrypted_key.len(),
                )));
            }
            aes_unwrap(raw_wrap_key(algorithm, key)?, encrypted_key)
        }

        KeyManagementAlgorithm::A128GcmKw
        | KeyManagementAlgorithm::A192GcmKw
        | KeyManagementAlgorithm::A256GcmKw => {
            let kek = raw_wrap_key(algorithm, key)?;
            let iv = header
                .initialization_vector()
                .ok_or_else(|| crate::error::root(ValidationError::MissingField("iv")))?;
            let tag = header
                .authentication_tag()
                .ok_or_else(|| crate::error::root(ValidationError::MissingField("tag")))?;

            decrypt_aead(
                gcm_kw_cipher(algorithm),
                kek,
                Some(iv),
                &[],
                encrypted_key,
                tag,
            )
            .foreign_err(|| Error::Decryption(DecryptionError::IntegrityCheckFailed))
        }

        KeyManagementAlgorithm::EcdhEsA128Kw
        | KeyManagementAlgorithm::EcdhEsA192Kw
        | KeyManagementAlgorithm::EcdhEsA256Kw => {
            if encrypted_key.len() != encryption.key_len() + 8 {
                return Err(crate::error::root(FormatError::EncryptedKeyLength(
                    encrypted_key.len(),
                )));
            }
            let wrap_len = algorithm
                .wrap_key_len()
                .unwrap_or_else(|| unreachable!("ECDH-ES+A*KW always wraps"));
            let kek = ecdh_agree(key, header, algorithm.as_str(), wrap_len)?;
            aes_unwrap(&kek, encrypted_key)
        }
    }
}

fn configure_rsa_padding_enc(
    encrypter: &mut Encrypter,
    algorithm: KeyManagementAlgorithm,
) -> Result<()> {
    match algorithm {
        KeyManagementAlgorithm::Rsa1_5 => encrypter
            .set_rsa_padding(Padding::PKCS1)
            .foreign_err(backend)?,
        KeyManagementAlgorithm::RsaOaep => encrypter
            .set_rsa_padding(Padding::PKCS1_OAEP)
            .foreign_err(backend)?,
        _ => {
            encrypter
                .set_rsa_padding(Padding::PKCS1_OAEP)
                .foreign_err(backend)?;
            encrypter
                .set_rsa_oaep_md(MessageDigest::sha256())
                .foreign_err(backend)?;
            encrypter
                .set_rsa_mgf1_md(MessageDigest::sha256())
                .foreign_err(backend)?;
        }
    }
    Ok(())
}

fn configure_rsa_padding_dec(
    decrypter: &mut Decrypter,
    algorithm: KeyManagementAlgorithm,
) -> Result<()> {
    match algorithm {
        KeyManagementAlgorithm::Rsa1_5 => decrypter
            .set_rsa_padding(Padding::PKCS1)
            .foreign_err(backend)?,
        KeyManagementAlgorithm::RsaOaep => decrypter
            .set_rsa_padding(Padding::PKCS1_OAEP)
            .foreign_err(backend)?,
        _ => {
            decrypter
                .set_rsa_padding(Padding::PKCS1_OAEP)
                .foreign_err(backend)?;
            decrypter
                .set_rsa_oaep_md(MessageDigest::sha256())
                .foreign_err(backend)?;
            decrypter
                .set_rsa_mgf1_md(MessageDigest::sha256())
                .foreign_err(backend)?;
        }
    }
    Ok(())
}

fn gcm_kw_cipher(algorithm: KeyManagementAlgorithm) -> Cipher {
    match algorithm {
        KeyManagementAlgorithm::A128GcmKw => Cipher::aes_128_gcm(),
        KeyManagementAlgorithm::A192GcmKw => Cipher::aes_192_gcm(),
        _ => Cipher::aes_256_gcm(),
    }
}

fn raw_wrap_key<'a>(
    algorithm: KeyManagementAlgorithm,
    key: &'a WebKey,
) -> Result<&'a [u8]> {
    let raw = key
        .raw_bytes()
        .ok_or_else(|| invalid_key("a raw symmetric key is required"))?;
    let expected = algorithm
        .wrap_key_len()
        .unwrap_or_else(|| unreachable!("only called for the wrapping algorithms"));
    if raw.len() != expected {
        return Err(invalid_key(&format!(
            "{algorithm} requires a {expected}-byte key, got {}",
            raw.len()
        )));
    }
    Ok(raw)
}

fn aes_wrap(kek: &[u8], cek: &[u8]) -> Result<Vec<u8>> {
    let kek = AesKey::new_encrypt(kek).map_err(|_| crate::error::root(backend()))?;
    let mut wrapped = vec![0u8; cek.len() + 8];
    wrap_key(&kek, None, &mut wrapped, cek).map_err(|_| crate::error::root(backend()))?;
    Ok(wrapped)
}

fn aes_unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>> {
    let kek = AesKey::new_decrypt(kek).map_err(|_| crate::error::root(backend()))?;
    let mut cek = vec![0u8; wrapped.len() - 8];
    // the KW integrity check failing means a wrong key or a forged segment
    unwrap_key(&kek, None, &mut cek, wrapped)
        .map_err(|_| crate::error::root(DecryptionError::IntegrityCheckFailed))?;
    Ok(cek)
}

/// Runs the sender side of an ECDH-ES exchange against the recipient's
/// public key: generates the ephemeral pair, derives the shared secret and
/// feeds it through the Concat KDF.
fn ecdh_derive(
    recipient: &WebKey,
    algorithm_id: &str,
    apu: Option<&[u8]>,
    apv: Option<&[u8]>,
    key_len: usize,
) -> Result<(Vec<u8>, WebKey)> {
    let curve = recipient
        .ec_curve()
        .ok_or_else(|| invalid_key("an EC key is required for ECDH-ES"))?;
    let peer = recipient
        .ec_public()
        .ok_or_else(|| invalid_key("an EC public key is required for ECDH-ES"))?;

    let group = crate::jwk::curve_group(curve)?;
    let ephemeral = EcKey::generate(&group)
        .foreign_err(|| Error::Crypto(CryptoError::KeyGenerationFailed))?;
    let ephemeral_public = EcKey::from_public_key(&group, ephemeral.public_key())
        .foreign_err(|| Error::Crypto(CryptoError::KeyGenerationFailed))?;

    let z = shared_secret(&ephemeral, peer)?;
    let derived = concat_kdf(
        &z,
        algorithm_id,
        apu.unwrap_or(&[]),
        apv.unwrap_or(&[]),
        key_len,
    );

    let ephemeral_key = WebKey::builder().ec_public_key(ephemeral_public)?.build()?;
    Ok((derived, ephemeral_key))
}

/// Runs the recipient side of an ECDH-ES exchange: agrees with the header's
/// ephemeral key using the recipient's private key.
fn ecdh_agree(
    recipient: &WebKey,
    header: &JoseHeader,
    algorithm_id: &str,
    key_len: usize,
) -> Result<Vec<u8>> {
    let private = recipient
        .ec_private()
        .ok_or_else(|| invalid_key("an EC private key is required for ECDH-ES"))?;
    let ephemeral = header
        .ephemeral_key()
        .ok_or_else(|| crate::error::root(ValidationError::MissingField("epk")))?;
    let peer = ephemeral
        .ec_public()
        .ok_or_else(|| invalid_key("the ephemeral key is not an EC key"))?;

    if recipient.ec_curve() != ephemeral.ec_curve() {
        return Err(invalid_key("the ephemeral key is on a different curve"));
    }

    let z = shared_secret(private, peer)?;
    Ok(concat_kdf(
        &z,
        algorithm_id,
        header.agreement_party_u_info().unwrap_or(&[]),
        header.agreement_party_v_info().unwrap_or(&[]),
        key_len,
    ))
}

fn shared_secret(private: &EcKey<Private>, peer: &EcKey<Public>) -> Result<Vec<u8>> {
    let local = PKey::from_ec_key(private.clone()).foreign_err(backend)?;
    let peer = PKey::from_ec_key(peer.clone()).foreign_err(backend)?;

    let mut deriver = Deriver::new(&local).foreign_err(backend)?;
    deriver.set_peer(&peer).foreign_err(backend)?;
    deriver.derive_to_vec().foreign_err(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alg::EcCurve,
        jwk::tests::{generate_ec_key, generate_rsa_key},
    };

    fn oct_key(bytes: usize) -> WebKey {
        let mut raw = vec![0u8; bytes];
        openssl::rand::rand_bytes(&mut raw).unwrap();
        WebKey::builder().raw_key(raw).build().unwrap()
    }

    fn header_from(result: &KeyEncryption) -> JoseHeader {
        let mut builder = JoseHeader::builder();
        if let Some(ephemeral) = &result.ephemeral_key {
            builder = builder.ephemeral_key(ephemeral.clone()).unwrap();
        }
        if let Some(iv) = &result.initialization_vector {
            builder = builder.initialization_vector(iv.clone());
        }
        if let Some(tag) = &result.authentication_tag {
            builder = builder.authentication_tag(tag.clone());
        }
        builder.build().unwrap()
    }

    #[test]
    fn wrap_round_trip_symmetric_algorithms() {
        use KeyManagementAlgorithm::*;
        let enc = ContentEncryptionAlgorithm::A256Gcm;

        for algorithm in [A128Kw, A192Kw, A256Kw, A128GcmKw, A192GcmKw, A256GcmKw] {
            let key = oct_key(algorithm.wrap_key_len().unwrap());
            let cek = Cek::generate(enc).unwrap();

            let result = encrypt_cek(algorithm, &key, &cek, None, None).unwrap();
            let header = header_from(&result);
            let recovered =
                decrypt_cek(algorithm, enc, &key, &result.encrypted_key, &header).unwrap();

            assert_eq!(recovered, cek.bytes(), "{algorithm}");
        }
    }

    #[test]
    fn rsa_round_trip() {
        use KeyManagementAlgorithm::*;
        let enc = ContentEncryptionAlgorithm::A128CbcHs256;
        let key = generate_rsa_key();

        for algorithm in [Rsa1_5, RsaOaep, RsaOaep256] {
            let cek = Cek::generate(enc).unwrap();

            let result = encrypt_cek(algorithm, &key, &cek, None, None).unwrap();
            let header = header_from(&result);
            let recovered =
                decrypt_cek(algorithm, enc, &key, &result.encrypted_key, &header).unwrap();

            assert_eq!(recovered, cek.bytes(), "{algorithm}");
        }
    }

    #[test]
    fn ecdh_direct_agreement_matches() {
        let enc = ContentEncryptionAlgorithm::A256Gcm;
        let recipient = generate_ec_key(EcCurve::P256);

        let (cek, result) = establish_direct_cek(
            KeyManagementAlgorithm::EcdhEs,
            &recipient.to_public().unwrap(),
            enc,
            Some(b"Alice"),
            Some(b"Bob"),
        )
        .unwrap();
        assert!(result.encrypted_key.is_empty());

        let header = JoseHeader::builder()
            .ephemeral_key(result.ephemeral_key.clone().unwrap())
            .unwrap()
            .agreement_party_u_info(b"Alice".to_vec())
            .unwrap()
            .agreement_party_v_info(b"Bob".to_vec())
            .unwrap()
            .build()
            .unwrap();

        let recovered =
            decrypt_cek(KeyManagementAlgorithm::EcdhEs, enc, &recipient, &[], &header).unwrap();
        assert_eq!(recovered, cek.bytes());
    }

    #[test]
    fn ecdh_key_wrap_round_trip() {
        use KeyManagementAlgorithm::*;
        let enc = ContentEncryptionAlgorithm::A128Gcm;

        for (algorithm, curve) in [
            (EcdhEsA128Kw, EcCurve::P256),
            (EcdhEsA192Kw, EcCurve::P384),
            (EcdhEsA256Kw, EcCurve::P521),
        ] {
            let recipient = generate_ec_key(curve);
            let cek = Cek::generate(enc).unwrap();

            let result =
                encrypt_cek(algorithm, &recipient.to_public().unwrap(), &cek, None, None).unwrap();
            let header = header_from(&result);
            let recovered =
                decrypt_cek(algorithm, enc, &recipient, &result.encrypted_key, &header).unwrap();

            assert_eq!(recovered, cek.bytes(), "{algorithm}");
        }
    }

    #[test]
    fn direct_algorithms_must_not_carry_encrypted_key() {
        let enc = ContentEncryptionAlgorithm::A128Gcm;
        let key = oct_key(enc.key_len());
        let header = JoseHeader::builder().build().unwrap();

        let error = decrypt_cek(KeyManagementAlgorithm::Dir, enc, &key, b"stray", &header)
            .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Format(FormatError::EncryptedKeyLength(5))
        ));
    }

    #[test]
    fn wrapped_key_length_is_checked() {
        let enc = ContentEncryptionAlgorithm::A128Gcm;
        let key = oct_key(16);
        let header = JoseHeader::builder().build().unwrap();

        let error = decrypt_cek(
            KeyManagementAlgorithm::A128Kw,
            enc,
            &key,
            &[0u8; 11],
            &header,
        )
        .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Format(FormatError::EncryptedKeyLength(11))
        ));
    }

    #[test]
    fn unwrap_with_wrong_key_fails_integrity() {
        let enc = ContentEncryptionAlgorithm::A128Gcm;
        let cek = Cek::generate(enc).unwrap();
        let key = oct_key(16);
        let other = oct_key(16);

        let result = encrypt_cek(KeyManagementAlgorithm::A128Kw, &key, &cek, None, None).unwrap();
        let header = JoseHeader::builder().build().unwrap();

        let error = decrypt_cek(
            KeyManagementAlgorithm::A128Kw,
            enc,
            &other,
            &result.encrypted_key,
            &header,
        )
        .unwrap_err();
        assert!(matches!(
            error.error,
            Error::Decryption(DecryptionError::IntegrityCheckFailed)
        ));
    }

    #[test]
    fn wrap_key_length_mismatch_is_rejected() {
        let cek = Cek::generate(ContentEncryptionAlgorithm::A128Gcm).unwrap();
        let key = oct_key(32);

        let error =
            encrypt_cek(KeyManagementAlgorithm::A128Kw, &key, &cek, None, None).unwrap_err();
        assert!(matches!(
            error.error,
            Error::Validation(ValidationError::InvalidKey(_))
        ));
    }
}
