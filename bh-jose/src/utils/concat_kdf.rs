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

use super::digest::sha256;

/// Derives `key_len` bytes from the ECDH shared secret `z` using the Concat
/// KDF of [NIST SP 800-56A, section 5.8.1][1] with SHA-256, parameterized as
/// [RFC 7518, section 4.6.2][2] requires.
///
/// `algorithm_id` is the `enc` name for direct ECDH-ES agreement and the
/// `alg` name for the `ECDH-ES+A*KW` variants.  `apu`/`apv` are the raw
/// (already base64url-decoded) PartyUInfo / PartyVInfo values, empty when the
/// header carries none.
///
/// [1]: https://nvlpubs.nist.gov/nistpubs/SpecialPublications/NIST.SP.800-56Ar2.pdf
/// [2]: https://datatracker.ietf.org/doc/html/rfc7518#section-4.6.2
pub(crate) fn concat_kdf(
    z: &[u8],
    algorithm_id: &str,
    apu: &[u8],
    apv: &[u8],
    key_len: usize,
) -> Vec<u8> {
    let mut other_info = Vec::new();
    push_length_prefixed(&mut other_info, algorithm_id.as_bytes());
    push_length_prefixed(&mut other_info, apu);
    push_length_prefixed(&mut other_info, apv);
    // SuppPubInfo is the key length in *bits*, without a length prefix
    other_info.extend_from_slice(&((key_len as u32) * 8).to_be_bytes());

    let rounds = key_len.div_ceil(32);
    let mut derived = Vec::with_capacity(rounds * 32);

    for counter in 1..=rounds as u32 {
        let mut input = Vec::with_capacity(4 + z.len() + other_info.len());
        input.extend_from_slice(&counter.to_be_bytes());
        input.extend_from_slice(z);
        input.extend_from_slice(&other_info);
        derived.extend_from_slice(&sha256(&input));
    }

    derived.truncate(key_len);
    derived
}

fn push_length_prefixed(buffer: &mut Vec<u8>, data: &[u8]) {
    buffer.extend_from_slice(&(data.len() as u32).to_be_bytes());
    buffer.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The example of [RFC 7518, Appendix C][1].
    ///
    /// [1]: https://datatracker.ietf.org/doc/html/rfc7518#appendix-C
    #[test]
    fn test_rfc7518_appendix_c_vector() {
        let z: [u8; 32] = [
            158, 86, 217, 29, 129, 113, 53, 211, 114, 131, 66, 131, 191, 132, 38, 156, 251, 49,
            110, 163, 218, 128, 106, 72, 246, 218, 167, 121, 140, 254, 144, 196,
        ];

        let derived = concat_kdf(&z, "A128GCM", b"Alice", b"Bob", 16);

        assert_eq!(
            derived,
            [86, 170, 141, 234, 248, 35, 109, 32, 92, 34, 40, 205, 113, 167, 16, 26]
        );
        assert_eq!(crate::utils::base64_url_encode(&derived), "VqqN6vgjbSBcIijNcacQGg");
    }

    #[test]
    fn test_multi_round_output_length() {
        let z = [7u8; 32];

        // 64 bytes needs two SHA-256 rounds
        let derived = concat_kdf(&z, "A256CBC-HS512", b"", b"", 64);
        assert_eq!(derived.len(), 64);

        // the round counter feeds the hash, so the two blocks must differ
        assert_ne!(&derived[..32], &derived[32..]);
    }

    #[test]
    fn test_party_info_changes_output() {
        let z = [1u8; 32];

        let plain = concat_kdf(&z, "A128GCM", b"", b"", 16);
        let with_parties = concat_kdf(&z, "A128GCM", b"Alice", b"Bob", 16);

        assert_ne!(plain, with_parties);
    }
}
