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

/// Computes the `SHA-1` digest of the `payload`.
///
/// Only used for the legacy `x5t` certificate thumbprint; everything else in
/// the crate uses SHA-2.
pub fn sha1<T: AsRef<[u8]>>(payload: T) -> [u8; 20] {
    openssl::sha::sha1(payload.as_ref())
}

/// Computes the `SHA-256` digest of the `payload`.
pub fn sha256<T: AsRef<[u8]>>(payload: T) -> [u8; 32] {
    openssl::sha::sha256(payload.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        let digest = sha256(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_sha1_known_value() {
        let digest = sha1(b"abc");
        assert_eq!(hex::encode(digest), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }
}
