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

pub(crate) mod concat_kdf;
pub(crate) mod digest;

use std::io::{Read as _, Write as _};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use bherror::traits::ForeignError as _;
use flate2::{read::DeflateDecoder, write::DeflateEncoder, Compression};
use openssl::bn::BigNum;

use crate::error::{Error, FormatError, Result};

/// Returns the `base64url`-encoded string **without padding** of the given
/// `payload`.
pub fn base64_url_encode<T: AsRef<[u8]>>(payload: T) -> String {
    URL_SAFE_NO_PAD.encode(payload)
}

/// Decodes the given `payload` as the `base64url`-encoded string **without
/// padding** into bytes.
pub fn base64_url_decode<T: AsRef<[u8]>>(payload: T) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(payload.as_ref()).foreign_err(|| {
        Error::Format(FormatError::Base64(
            String::from_utf8_lossy(payload.as_ref()).into(),
        ))
    })
}

/// Splits a compact JOSE serialization into exactly `expected` `.`-separated
/// segments.
///
/// JWS compact form has 3 segments, JWE compact form has 5; see [RFC 7515,
/// section 7.1][1] and [RFC 7516, section 7.1][2].
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7515#section-7.1
/// [2]: https://datatracker.ietf.org/doc/html/rfc7516#section-7.1
pub(crate) fn split_compact(input: &str, expected: usize) -> Result<Vec<&str>> {
    let segments: Vec<&str> = input.split('.').collect();

    if segments.len() != expected {
        return Err(crate::error::root(FormatError::SegmentCount(
            expected,
            segments.len(),
        )));
    }

    Ok(segments)
}

/// Encodes an unsigned big-endian integer as an unpadded `base64url` string,
/// the representation JWK uses for RSA and EC parameters.
pub(crate) fn base64_url_uint(bn: &openssl::bn::BigNumRef) -> String {
    base64_url_encode(bn.to_vec())
}

/// Decodes a JWK unsigned big-endian integer parameter into a [`BigNum`].
pub(crate) fn base64_url_uint_decode(value: &str) -> Result<BigNum> {
    let bytes = base64_url_decode(value)?;
    BigNum::from_slice(&bytes).foreign_err(|| {
        Error::Format(FormatError::JwkParsingFailed(
            "invalid big-integer value".to_string(),
        ))
    })
}

/// Compresses the `payload` with raw DEFLATE, the representation required by
/// the JWE `"zip": "DEF"` header parameter ([RFC 7516, section 4.1.3][1]).
///
/// [1]: https://datatracker.ietf.org/doc/html/rfc7516#section-4.1.3
pub(crate) fn deflate_compress(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut e = DeflateEncoder::new(Vec::new(), Compression::best());
    e.write_all(payload)?;
    e.finish()
}

/// Decompresses a raw-DEFLATE `payload`.
pub(crate) fn deflate_decompress(payload: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut d = DeflateDecoder::new(payload);
    let mut decompressed = Vec::new();
    d.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_url_round_trip() {
        let cases: [(&[u8], &str); 3] = [
            (b"Hello, World!", "SGVsbG8sIFdvcmxkIQ"),
            (b"", ""),
            (&[0xDE, 0xAD, 0xBE, 0xEF], "3q2-7w"),
        ];

        for (raw, encoded) in cases {
            assert_eq!(base64_url_encode(raw), encoded);
            assert_eq!(base64_url_decode(encoded).unwrap(), raw);
        }
    }

    #[test]
    fn test_base64_url_decode_rejects_padding() {
        let error = base64_url_decode("SGVsbG8sIFdvcmxkIQ==").unwrap_err();
        assert!(matches!(error.error, Error::Format(FormatError::Base64(_))));
    }

    #[test]
    fn test_split_compact() {
        let segments = split_compact("a.b.c", 3).unwrap();
        assert_eq!(segments, vec!["a", "b", "c"]);

        // empty segments are preserved, e.g. the encrypted-key slot of a
        // direct-agreement JWE
        let segments = split_compact("a..c.d.e", 5).unwrap();
        assert_eq!(segments[1], "");

        let error = split_compact("a.b", 3).unwrap_err();
        assert_eq!(error.error, Error::Format(FormatError::SegmentCount(3, 2)));
    }

    #[test]
    fn test_base64_url_uint_round_trip() {
        // 65537, the usual RSA public exponent, encodes as "AQAB"
        let e = BigNum::from_u32(65537).unwrap();
        assert_eq!(base64_url_uint(&e), "AQAB");

        let decoded = base64_url_uint_decode("AQAB").unwrap();
        assert_eq!(decoded, e);
    }

    #[test]
    fn test_deflate_round_trip() {
        let payload = b"Live long and prosper.".repeat(8);

        let compressed = deflate_compress(&payload).unwrap();
        assert!(compressed.len() < payload.len());

        let decompressed = deflate_decompress(&compressed).unwrap();
        assert_eq!(decompressed, payload);
    }
}
