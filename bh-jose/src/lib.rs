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

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! This crate provides types for working with [JSON Object Signing and
//! Encryption (JOSE)][1]: JSON Web Keys ([RFC 7517][2]), JSON Web Signatures
//! ([RFC 7515][3]) and JSON Web Encryption ([RFC 7516][4]), with the
//! algorithms of [RFC 7518][5] backed by [`openssl`].
//!
//! [1]: https://datatracker.ietf.org/doc/html/rfc7165
//! [2]: https://datatracker.ietf.org/doc/html/rfc7517
//! [3]: https://datatracker.ietf.org/doc/html/rfc7515
//! [4]: https://datatracker.ietf.org/doc/html/rfc7516
//! [5]: https://datatracker.ietf.org/doc/html/rfc7518
//!
//! # Details
//!
//! Keys are modeled by [`WebKey`], built through [`WebKeyBuilder`] from raw
//! bytes, [`openssl`] key objects, PEM text or certificate chains, and
//! collected into [`WebKeySet`]s.  Signed and encrypted messages are modeled
//! by [`Jws`] and [`Jwe`]; both are produced by builders and parsed from the
//! compact or JSON serializations.  All header parameters of both message
//! kinds live in [`JoseHeader`].
//!
//! # Examples
//!
//! ## Sign and verify a payload
//!
//! ```
//! use bh_jose::{Jws, SignatureAlgorithm, WebKey};
//!
//! let pem = include_str!("../demos/ec-private.pem");
//! let key = WebKey::builder().pem(pem).unwrap().build().unwrap();
//!
//! let jws = Jws::builder()
//!     .payload(b"It's a dangerous business, going out your door.".to_vec())
//!     .add_signature(SignatureAlgorithm::Es256, &key)
//!     .unwrap()
//!     .sign()
//!     .unwrap();
//!
//! let compact = jws.to_compact().unwrap();
//! Jws::from_compact(&compact)
//!     .unwrap()
//!     .verify(&key, &[])
//!     .unwrap();
//! ```
//!
//! ## Encrypt and decrypt a payload
//!
//! ```
//! use bh_jose::{
//!     ContentEncryptionAlgorithm, Jwe, KeyManagementAlgorithm, WebKey,
//! };
//!
//! let mut secret = vec![0u8; 32];
//! openssl::rand::rand_bytes(&mut secret).unwrap();
//! let key = WebKey::builder().raw_key(secret).build().unwrap();
//!
//! let jwe = Jwe::builder()
//!     .plaintext(b"Live long and prosper.".to_vec())
//!     .encryption(ContentEncryptionAlgorithm::A256Gcm)
//!     .unwrap()
//!     .add_recipient(KeyManagementAlgorithm::Dir, &key)
//!     .unwrap()
//!     .encrypt()
//!     .unwrap();
//!
//! let compact = jwe.to_compact().unwrap();
//! let decrypted = Jwe::from_compact(&compact)
//!     .unwrap()
//!     .decrypt(&key, &[])
//!     .unwrap();
//! assert_eq!(decrypted, b"Live long and prosper.");
//! ```

mod alg;
mod error;
mod header;
mod jwe;
mod jwk;
mod jws;
mod utils;

pub use alg::{
    Algorithm, CompressionAlgorithm, ContentEncryptionAlgorithm, EcCurve, KeyKind,
    KeyManagementAlgorithm, KeyUse, SignatureAlgorithm,
};
pub use error::{
    CryptoError, DecryptionError, Error, FormatError, Result, UnsupportedError, ValidationError,
};
pub use header::{JoseHeader, JoseHeaderBuilder};
pub use jwe::{Jwe, JweBuilder, JweRecipient};
pub use jwk::{
    JwkObject, KeyOperation, KeySetClient, KeyType, RemoteKeySets, WebKey, WebKeyBuilder,
    WebKeySet,
};
#[cfg(feature = "reqwest")]
pub use jwk::HttpKeySetClient;
pub use jws::{Jws, JwsBuilder, JwsSignature};

/// Helper macro with the same syntax as [`serde_json::json`] specialized for
/// constructing JSON objects.
///
/// It will construct a more specific type ([`serde_json::Map<String,Value>`])
/// than just [`serde_json::Value`] when constructing an object, and panic if
/// the syntax is valid JSON but not an object.
#[macro_export]
macro_rules! json_object {
    ($stuff:tt) => {
        match ::serde_json::json!($stuff) {
            ::serde_json::Value::Object(o) => o,
            _ => unreachable!("JSON literal wasn't an object"),
        }
    };
}
