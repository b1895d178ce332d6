// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! BER/DER, X.509 and RSA primitives for smart card token libraries.

This crate is the software core shared by token drivers: it turns untrusted
certificate bytes into typed structures and performs PKCS#1 v1.5 RSA
operations on key material held in memory.

Functionality includes:

* [BerOctet], a tree of BER/DER tag-length-value elements that can be
  decoded, edited and re-encoded. Unmodified trees re-encode to exactly
  the bytes they were decoded from.
* [X509Cert], a read-only view over a certificate exposing its serial
  number, names, validity, RSA public key, key usage and basic constraints.
* [RsaPublicKey] and [RsaPrivateKey], with the PKCS#1 v1.5 block formats
  and raw transforms in [rsa]. Private key operations use the Chinese
  Remainder Theorem.
* [bignum], the fixed-capacity natural number arithmetic underneath the
  RSA layer.

Low-level ASN.1 vocabulary lives in modules named after the RFC that
defines it.

# Security Limitations

Arithmetic is not constant time. Temporary numbers and padded blocks
holding key material are wiped after every operation, but no attempt is
made to hide timing.

[X509Cert::is_root_cert] compares the encoded issuer and subject and does
not look at the signature. Use [X509Cert::verify_signed_by_certificate]
when the signature matters.

# Logging

Diagnostics go through the [log] facade. Nothing is emitted unless the
host installs a logger, and hosts can compile the calls out entirely with
`log`'s `max_level_off` feature.
*/

pub mod algorithm;
pub use algorithm::{DigestAlgorithm, KeyAlgorithm, SignatureAlgorithm};
pub mod asn1time;
pub mod ber;
pub use ber::{BerOctet, TagClass};
pub mod bignum;
mod certificate;
pub use certificate::*;
mod error;
pub use error::*;
pub mod oid;
pub mod random;
pub use random::{DigestRandom, RandomSource, SystemRandomSource};
pub mod rfc3280;
pub mod rfc3447;
pub mod rfc4519;
pub mod rfc5280;
pub use rfc5280::KeyUsage;
pub mod rsa;
pub use rsa::{RsaPrivateKey, RsaPublicKey};
mod signing;
pub use signing::*;

#[cfg(any(test, feature = "test"))]
pub mod testutil;

pub use bytes::Bytes;
