// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! RSA keys and PKCS#1 v1.5 primitives.

The block formats are the two of PKCS#1 v1.5:

* Type 1 (signatures): `00 01 FF .. FF 00 <message>`.
* Type 2 (encryption): `00 02 <non-zero random> 00 <message>`.

Both need at least 8 padding bytes, so a message can be at most the modulus
length minus [PKCS1_OVERHEAD] bytes.

Private key operations use the Chinese Remainder Theorem over the two primes.
Every intermediate number and padded block is wiped once the operation
returns, whether it succeeded or not.
*/

use {
    crate::{
        bignum::{self, new_nat, new_wide_nat, Digit, MAX_NN_DIGITS},
        error::{CardCryptoError, Result},
        random::RandomSource,
    },
    log::debug,
    std::cmp::Ordering,
    zeroize::{Zeroize, Zeroizing},
};

/// Largest supported modulus size in bits.
pub const MAX_RSA_MODULUS_BITS: usize = 4096;

/// Largest supported modulus size in bytes.
pub const MAX_RSA_MODULUS_LEN: usize = (MAX_RSA_MODULUS_BITS + 7) / 8;

/// Largest supported prime size in bits.
pub const MAX_RSA_PRIME_BITS: usize = (MAX_RSA_MODULUS_BITS + 1) / 2;

/// Largest supported prime size in bytes.
pub const MAX_RSA_PRIME_LEN: usize = (MAX_RSA_PRIME_BITS + 7) / 8;

/// Bytes of a PKCS#1 v1.5 block not available to the message.
pub const PKCS1_OVERHEAD: usize = 11;

const BLOCK_TYPE_SIGNATURE: u8 = 1;
const BLOCK_TYPE_ENCRYPTION: u8 = 2;
const MIN_PADDING_LEN: usize = PKCS1_OVERHEAD - 3;

fn strip_leading_zeros(data: &[u8]) -> &[u8] {
    let start = data.iter().position(|b| *b != 0).unwrap_or(data.len());
    &data[start..]
}

fn bit_length(stripped: &[u8]) -> usize {
    match stripped.first() {
        Some(first) => (stripped.len() - 1) * 8 + (8 - first.leading_zeros() as usize),
        None => 0,
    }
}

/// Copy a big-endian integer into the tail of a fixed-size array.
fn right_align<const N: usize>(name: &'static str, value: &[u8]) -> Result<[u8; N]> {
    let value = strip_leading_zeros(value);

    if value.is_empty() || value.len() > N {
        return Err(CardCryptoError::RsaKeyComponent(name));
    }

    let mut out = [0u8; N];
    out[N - value.len()..].copy_from_slice(value);

    Ok(out)
}

fn checked_modulus(modulus: &[u8]) -> Result<(usize, [u8; MAX_RSA_MODULUS_LEN])> {
    let stripped = strip_leading_zeros(modulus);
    let bits = bit_length(stripped);

    if bits > MAX_RSA_MODULUS_BITS {
        return Err(CardCryptoError::RsaModulusTooLarge(bits));
    }

    Ok((bits, right_align("modulus", stripped)?))
}

/// An RSA public key.
#[derive(Clone, Eq, PartialEq)]
pub struct RsaPublicKey {
    bits: usize,
    modulus: [u8; MAX_RSA_MODULUS_LEN],
    exponent: [u8; MAX_RSA_MODULUS_LEN],
}

impl std::fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("bits", &self.bits)
            .field("modulus", &hex::encode(self.modulus()))
            .field("exponent", &hex::encode(self.exponent()))
            .finish()
    }
}

impl RsaPublicKey {
    /// Construct a key from big-endian modulus and exponent bytes.
    ///
    /// Leading zero bytes, such as ASN.1 INTEGER sign padding, are ignored.
    pub fn new(modulus: &[u8], exponent: &[u8]) -> Result<Self> {
        let (bits, modulus) = checked_modulus(modulus)?;

        Ok(Self {
            bits,
            modulus,
            exponent: right_align("publicExponent", exponent)?,
        })
    }

    /// Size of the modulus in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Size of the modulus in bytes. This is the size of every block.
    pub fn modulus_len(&self) -> usize {
        (self.bits + 7) / 8
    }

    /// The modulus without leading zeros.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus[MAX_RSA_MODULUS_LEN - self.modulus_len()..]
    }

    /// The public exponent without leading zeros.
    pub fn exponent(&self) -> &[u8] {
        strip_leading_zeros(&self.exponent)
    }

    /// Encrypt a message into a type 2 block.
    pub fn encrypt(&self, message: &[u8], rng: &mut dyn RandomSource) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.modulus_len()];
        public_encrypt(&mut out, message, self, rng)?;

        Ok(out)
    }

    /// Recover the message of a type 1 block, i.e. open a raw signature.
    pub fn decrypt(&self, signature: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.modulus_len()];
        let len = public_decrypt(&mut out, signature, self)?;
        out.truncate(len);

        Ok(out)
    }
}

/// An RSA private key with its CRT components.
///
/// Key material is wiped when the value is dropped.
#[derive(Clone, Zeroize)]
pub struct RsaPrivateKey {
    bits: usize,
    modulus: [u8; MAX_RSA_MODULUS_LEN],
    public_exponent: [u8; MAX_RSA_MODULUS_LEN],
    exponent: [u8; MAX_RSA_MODULUS_LEN],
    prime_p: [u8; MAX_RSA_PRIME_LEN],
    prime_q: [u8; MAX_RSA_PRIME_LEN],
    exponent_p: [u8; MAX_RSA_PRIME_LEN],
    exponent_q: [u8; MAX_RSA_PRIME_LEN],
    coefficient: [u8; MAX_RSA_PRIME_LEN],
}

impl Drop for RsaPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.bits)
            .field("modulus", &hex::encode(self.modulus()))
            .finish_non_exhaustive()
    }
}

impl RsaPrivateKey {
    /// Construct a key from its big-endian components.
    ///
    /// `primes` is `(p, q)`, `prime_exponents` is `(d mod (p-1), d mod (q-1))`
    /// and `coefficient` is `q^-1 mod p`.
    pub fn new(
        modulus: &[u8],
        public_exponent: &[u8],
        private_exponent: &[u8],
        primes: (&[u8], &[u8]),
        prime_exponents: (&[u8], &[u8]),
        coefficient: &[u8],
    ) -> Result<Self> {
        let (bits, modulus) = checked_modulus(modulus)?;

        Ok(Self {
            bits,
            modulus,
            public_exponent: right_align("publicExponent", public_exponent)?,
            exponent: right_align("privateExponent", private_exponent)?,
            prime_p: right_align("prime1", primes.0)?,
            prime_q: right_align("prime2", primes.1)?,
            exponent_p: right_align("exponent1", prime_exponents.0)?,
            exponent_q: right_align("exponent2", prime_exponents.1)?,
            coefficient: right_align("coefficient", coefficient)?,
        })
    }

    /// Parse a PKCS#1 `RSAPrivateKey` DER structure.
    pub fn from_pkcs1_der(data: &[u8]) -> Result<Self> {
        crate::rfc3447::parse_rsa_private_key(data)
    }

    /// Parse a PKCS#8 `PrivateKeyInfo` DER structure holding an RSA key.
    pub fn from_pkcs8_der(data: &[u8]) -> Result<Self> {
        crate::rfc3447::parse_private_key_info(data)
    }

    /// Parse a PEM `RSA PRIVATE KEY` or `PRIVATE KEY` document.
    pub fn from_pem(data: impl AsRef<[u8]>) -> Result<Self> {
        crate::rfc3447::parse_private_key_pem(data.as_ref())
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    pub fn modulus_len(&self) -> usize {
        (self.bits + 7) / 8
    }

    pub fn modulus(&self) -> &[u8] {
        &self.modulus[MAX_RSA_MODULUS_LEN - self.modulus_len()..]
    }

    pub fn public_exponent(&self) -> &[u8] {
        strip_leading_zeros(&self.public_exponent)
    }

    pub fn private_exponent(&self) -> &[u8] {
        strip_leading_zeros(&self.exponent)
    }

    /// The primes `(p, q)`.
    pub fn primes(&self) -> (&[u8], &[u8]) {
        (
            strip_leading_zeros(&self.prime_p),
            strip_leading_zeros(&self.prime_q),
        )
    }

    /// The CRT exponents `(d mod (p-1), d mod (q-1))`.
    pub fn prime_exponents(&self) -> (&[u8], &[u8]) {
        (
            strip_leading_zeros(&self.exponent_p),
            strip_leading_zeros(&self.exponent_q),
        )
    }

    /// The CRT coefficient `q^-1 mod p`.
    pub fn coefficient(&self) -> &[u8] {
        strip_leading_zeros(&self.coefficient)
    }

    /// Obtain the public half of this key.
    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            bits: self.bits,
            modulus: self.modulus,
            exponent: self.public_exponent,
        }
    }

    /// Produce a type 1 block over `message`, i.e. a raw signature.
    pub fn encrypt(&self, message: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; self.modulus_len()];
        private_encrypt(&mut out, message, self)?;

        Ok(out)
    }

    /// Decrypt a ciphertext holding a type 2 block.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(vec![0u8; self.modulus_len()]);
        let len = private_decrypt(&mut out, ciphertext, self)?;
        out.truncate(len);

        Ok(out)
    }
}

fn check_block_lengths(output: &[u8], input: &[u8], modulus_len: usize) -> Result<()> {
    if input.len() > modulus_len {
        return Err(CardCryptoError::RsaInputLength {
            actual: input.len(),
            modulus: modulus_len,
        });
    }

    if output.len() < modulus_len {
        return Err(CardCryptoError::RsaOutputTooSmall {
            actual: output.len(),
            required: modulus_len,
        });
    }

    Ok(())
}

/// Reject inputs that are not strictly below the modulus.
fn check_range(input: &[Digit], modulus: &[Digit], modulus_digits: usize) -> Result<()> {
    if bignum::significant_digits(input, MAX_NN_DIGITS) > modulus_digits
        || bignum::cmp(input, modulus, modulus_digits) != Ordering::Less
    {
        return Err(CardCryptoError::RsaDataOutOfRange);
    }

    Ok(())
}

/// Raw public key transform: `output = input^e mod n`.
///
/// Writes exactly [RsaPublicKey::modulus_len] bytes and returns that count.
pub fn public_block(output: &mut [u8], input: &[u8], key: &RsaPublicKey) -> Result<usize> {
    let modulus_len = key.modulus_len();
    check_block_lengths(output, input, modulus_len)?;

    let mut c = new_nat();
    let mut e = new_nat();
    let mut m = new_nat();
    let mut n = new_nat();

    bignum::decode(&mut m[..], MAX_NN_DIGITS, input);
    bignum::decode(&mut n[..], MAX_NN_DIGITS, &key.modulus);
    bignum::decode(&mut e[..], MAX_NN_DIGITS, &key.exponent);
    let n_digits = bignum::significant_digits(&n[..], MAX_NN_DIGITS);
    let e_digits = bignum::significant_digits(&e[..], MAX_NN_DIGITS);

    check_range(&m[..], &n[..], n_digits)?;

    bignum::mod_exp(&mut c[..], &m[..], &e[..], e_digits, &n[..], n_digits);
    bignum::encode(&mut output[..modulus_len], &c[..], n_digits);

    Ok(modulus_len)
}

/// Raw private key transform: `output = input^d mod n`, computed over the primes.
///
/// Writes exactly [RsaPrivateKey::modulus_len] bytes and returns that count.
pub fn private_block(output: &mut [u8], input: &[u8], key: &RsaPrivateKey) -> Result<usize> {
    let modulus_len = key.modulus_len();
    check_block_lengths(output, input, modulus_len)?;

    let mut c = new_nat();
    let mut cp = new_nat();
    let mut cq = new_nat();
    let mut dp = new_nat();
    let mut dq = new_nat();
    let mut mp = new_nat();
    let mut mq = new_nat();
    let mut mq_p = new_nat();
    let mut n = new_nat();
    let mut p = new_nat();
    let mut q = new_nat();
    let mut q_inv = new_nat();
    let mut t = new_nat();
    let mut w = new_wide_nat();

    bignum::decode(&mut c[..], MAX_NN_DIGITS, input);
    bignum::decode(&mut n[..], MAX_NN_DIGITS, &key.modulus);
    bignum::decode(&mut p[..], MAX_NN_DIGITS, &key.prime_p);
    bignum::decode(&mut q[..], MAX_NN_DIGITS, &key.prime_q);
    bignum::decode(&mut dp[..], MAX_NN_DIGITS, &key.exponent_p);
    bignum::decode(&mut dq[..], MAX_NN_DIGITS, &key.exponent_q);
    bignum::decode(&mut q_inv[..], MAX_NN_DIGITS, &key.coefficient);

    let c_digits = bignum::significant_digits(&c[..], MAX_NN_DIGITS);
    let n_digits = bignum::significant_digits(&n[..], MAX_NN_DIGITS);
    let prime_digits = bignum::significant_digits(&p[..], MAX_NN_DIGITS)
        .max(bignum::significant_digits(&q[..], MAX_NN_DIGITS));

    check_range(&c[..], &n[..], n_digits)?;

    // mP = (c mod p)^dP mod p, mQ = (c mod q)^dQ mod q.
    bignum::modulo(&mut cp[..], &c[..], c_digits, &p[..], prime_digits);
    bignum::modulo(&mut cq[..], &c[..], c_digits, &q[..], prime_digits);
    bignum::mod_exp(&mut mp[..], &cp[..], &dp[..], prime_digits, &p[..], prime_digits);
    bignum::mod_exp(&mut mq[..], &cq[..], &dq[..], prime_digits, &q[..], prime_digits);

    // t = (mP - mQ) * qInv mod p. mQ is reduced mod p first so q > p works.
    bignum::modulo(&mut mq_p[..], &mq[..], prime_digits, &p[..], prime_digits);
    if bignum::cmp(&mp[..], &mq_p[..], prime_digits) != Ordering::Less {
        bignum::sub(&mut t[..], &mp[..], &mq_p[..], prime_digits);
    } else {
        bignum::sub(&mut t[..], &mq_p[..], &mp[..], prime_digits);
        let negated = t.clone();
        bignum::sub(&mut t[..], &p[..], &negated[..], prime_digits);
    }
    let difference = t.clone();
    bignum::mod_mult(&mut t[..], &difference[..], &q_inv[..], &p[..], prime_digits);

    // m = t * q + mQ.
    bignum::mult(&mut w[..], &t[..], &q[..], prime_digits);
    bignum::add_assign(&mut w[..], &mq[..], n_digits);

    bignum::encode(&mut output[..modulus_len], &w[..], n_digits);

    Ok(modulus_len)
}

/// Locate the message within a decrypted block of the given type.
///
/// Returns the offset of the first message byte.
fn unpad(block: &[u8], block_type: u8) -> Result<usize> {
    let modulus_len = block.len();

    if modulus_len < PKCS1_OVERHEAD {
        return Err(CardCryptoError::RsaPaddingTooShort);
    }

    if block[0] != 0 || block[1] != block_type {
        debug!(
            "rejecting PKCS#1 block with header {:02x}{:02x}; expected type {}",
            block[0], block[1], block_type
        );
        return Err(CardCryptoError::RsaBlockType {
            expected: block_type,
            actual: block[1],
        });
    }

    let separator = if block_type == BLOCK_TYPE_SIGNATURE {
        block[2..]
            .iter()
            .position(|b| *b != 0xff)
            .map(|i| i + 2)
            .filter(|i| block[*i] == 0)
    } else {
        block[2..]
            .iter()
            .position(|b| *b == 0)
            .map(|i| i + 2)
    };

    let separator = separator.ok_or_else(|| {
        debug!("rejecting type {} PKCS#1 block without separator", block_type);
        CardCryptoError::RsaMissingSeparator
    })?;

    if separator - 2 < MIN_PADDING_LEN {
        debug!(
            "rejecting type {} PKCS#1 block with {} padding bytes",
            block_type,
            separator - 2
        );
        return Err(CardCryptoError::RsaPaddingTooShort);
    }

    Ok(separator + 1)
}

fn check_message_length(message: &[u8], modulus_len: usize) -> Result<()> {
    if message.len() + PKCS1_OVERHEAD > modulus_len {
        return Err(CardCryptoError::RsaMessageTooLong {
            message: message.len(),
            modulus: modulus_len,
        });
    }

    Ok(())
}

fn copy_message(output: &mut [u8], message: &[u8]) -> Result<usize> {
    if output.len() < message.len() {
        return Err(CardCryptoError::RsaOutputTooSmall {
            actual: output.len(),
            required: message.len(),
        });
    }

    output[..message.len()].copy_from_slice(message);

    Ok(message.len())
}

/// PKCS#1 v1.5 encryption with a public key.
///
/// Padding bytes come from `rng`; zero bytes are redrawn until non-zero.
/// Returns the number of bytes written, which is the modulus length.
pub fn public_encrypt(
    output: &mut [u8],
    input: &[u8],
    key: &RsaPublicKey,
    rng: &mut dyn RandomSource,
) -> Result<usize> {
    let modulus_len = key.modulus_len();
    check_message_length(input, modulus_len)?;

    let mut block = Zeroizing::new(vec![0u8; modulus_len]);
    let padding_len = modulus_len - input.len() - 3;

    block[1] = BLOCK_TYPE_ENCRYPTION;
    {
        let padding = &mut block[2..2 + padding_len];
        rng.fill(padding)?;

        for b in padding.iter_mut() {
            while *b == 0 {
                let mut byte = [0u8; 1];
                rng.fill(&mut byte)?;
                *b = byte[0];
            }
        }
    }
    block[modulus_len - input.len()..].copy_from_slice(input);

    public_block(output, &block, key)
}

/// Recover the message of a type 1 block with a public key.
///
/// Returns the number of message bytes written to `output`.
pub fn public_decrypt(output: &mut [u8], input: &[u8], key: &RsaPublicKey) -> Result<usize> {
    let modulus_len = key.modulus_len();

    if input.len() > modulus_len {
        return Err(CardCryptoError::RsaInputLength {
            actual: input.len(),
            modulus: modulus_len,
        });
    }

    let mut block = Zeroizing::new(vec![0u8; modulus_len]);
    public_block(&mut block, input, key)?;

    let start = unpad(&block, BLOCK_TYPE_SIGNATURE)?;

    copy_message(output, &block[start..])
}

/// Produce a type 1 block with a private key.
///
/// Returns the number of bytes written, which is the modulus length.
pub fn private_encrypt(output: &mut [u8], input: &[u8], key: &RsaPrivateKey) -> Result<usize> {
    let modulus_len = key.modulus_len();
    check_message_length(input, modulus_len)?;

    let mut block = Zeroizing::new(vec![0xffu8; modulus_len]);
    block[0] = 0;
    block[1] = BLOCK_TYPE_SIGNATURE;
    block[modulus_len - input.len() - 1] = 0;
    block[modulus_len - input.len()..].copy_from_slice(input);

    private_block(output, &block, key)
}

/// PKCS#1 v1.5 decryption with a private key.
///
/// Returns the number of message bytes written to `output`.
pub fn private_decrypt(output: &mut [u8], input: &[u8], key: &RsaPrivateKey) -> Result<usize> {
    let modulus_len = key.modulus_len();

    if input.len() > modulus_len {
        return Err(CardCryptoError::RsaInputLength {
            actual: input.len(),
            modulus: modulus_len,
        });
    }

    let mut block = Zeroizing::new(vec![0u8; modulus_len]);
    private_block(&mut block, input, key)?;

    let start = unpad(&block, BLOCK_TYPE_ENCRYPTION)?;

    copy_message(output, &block[start..])
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::{random::DigestRandom, testutil},
    };

    const MESSAGE: &[u8] = b"attack at dawn";

    fn rng() -> DigestRandom {
        let mut rng = DigestRandom::new();
        rng.update(&[0x5a; crate::random::RANDOM_BYTES_NEEDED]);
        rng
    }

    #[test]
    fn key_components() {
        let key = testutil::ca_private_key();
        assert_eq!(key.bits(), 1024);
        assert_eq!(key.modulus_len(), 128);
        assert_eq!(key.public_exponent(), &[0x01, 0x00, 0x01]);
        assert_eq!(key.primes().0[0], 0xec);
        assert_eq!(key.primes().1[0], 0xc6);

        let public = key.public_key();
        assert_eq!(public.modulus(), key.modulus());
        assert_eq!(
            hex::encode(public.modulus()),
            testutil::CA_MODULUS_HEX.trim_start_matches("00")
        );
    }

    #[test]
    fn key_construction_limits() {
        let oversized = vec![0xffu8; MAX_RSA_MODULUS_LEN + 1];
        assert!(matches!(
            RsaPublicKey::new(&oversized, &[3]),
            Err(CardCryptoError::RsaModulusTooLarge(4104))
        ));
        assert!(matches!(
            RsaPublicKey::new(&[0, 0], &[3]),
            Err(CardCryptoError::RsaKeyComponent("modulus"))
        ));

        // Sign padding is accepted and dropped.
        let key = RsaPublicKey::new(&[0x00, 0xc1, 0x01], &[0x00, 0x03]).unwrap();
        assert_eq!(key.bits(), 16);
        assert_eq!(key.modulus(), &[0xc1, 0x01]);
        assert_eq!(key.exponent(), &[0x03]);
    }

    #[test]
    fn signature_matches_openssl() -> Result<()> {
        let key = testutil::ca_private_key();
        let signature = key.encrypt(MESSAGE)?;
        assert_eq!(hex::encode(&signature), testutil::CA_SIGNATURE_HEX);

        assert_eq!(key.public_key().decrypt(&signature)?, MESSAGE);

        Ok(())
    }

    #[test]
    fn decrypts_openssl_ciphertext() -> Result<()> {
        let ciphertext = hex::decode(testutil::CA_CIPHERTEXT_HEX).unwrap();
        let plaintext = testutil::ca_private_key().decrypt(&ciphertext)?;
        assert_eq!(plaintext.as_slice(), MESSAGE);

        Ok(())
    }

    #[test]
    fn encrypt_decrypt_round_trip() -> Result<()> {
        let key = testutil::ca_private_key();
        let public = key.public_key();
        let mut rng = rng();

        for len in [0, 1, 14, 64, 117] {
            let message = (0..len).map(|i| i as u8).collect::<Vec<_>>();
            let ciphertext = public.encrypt(&message, &mut rng)?;
            assert_eq!(ciphertext.len(), 128);
            assert_eq!(key.decrypt(&ciphertext)?.as_slice(), message.as_slice());

            let signature = key.encrypt(&message)?;
            assert_eq!(public.decrypt(&signature)?, message);
        }

        Ok(())
    }

    #[test]
    fn empty_message_round_trip() -> Result<()> {
        let key = testutil::ca_private_key();
        let public = key.public_key();

        let ciphertext = public.encrypt(&[], &mut rng())?;

        // The separator is the final byte of the block.
        let mut block = [0u8; 128];
        private_block(&mut block, &ciphertext, &key)?;
        assert_eq!(block[127], 0);
        assert!(block[2..127].iter().all(|b| *b != 0));

        assert!(key.decrypt(&ciphertext)?.is_empty());
        assert!(public.decrypt(&key.encrypt(&[])?)?.is_empty());

        Ok(())
    }

    #[test]
    fn encryption_padding_is_random_and_non_zero() -> Result<()> {
        let key = testutil::ca_private_key();
        let public = key.public_key();
        let mut rng = rng();

        let a = public.encrypt(MESSAGE, &mut rng)?;
        let b = public.encrypt(MESSAGE, &mut rng)?;
        assert_ne!(a, b);

        let mut block = [0u8; 128];
        private_block(&mut block, &a, &key)?;
        assert_eq!(&block[..2], &[0, 2]);
        let separator = 128 - MESSAGE.len() - 1;
        assert!(block[2..separator].iter().all(|b| *b != 0));
        assert_eq!(block[separator], 0);

        Ok(())
    }

    #[test]
    fn crt_matches_full_exponent() -> Result<()> {
        let key = testutil::ca_private_key();
        let input = hex::decode(testutil::CA_CIPHERTEXT_HEX).unwrap();

        let mut crt = [0u8; 128];
        private_block(&mut crt, &input, &key)?;

        let mut c = new_nat();
        let mut d = new_nat();
        let mut n = new_nat();
        let mut m = new_nat();
        bignum::decode(&mut c[..], MAX_NN_DIGITS, &input);
        bignum::decode(&mut d[..], MAX_NN_DIGITS, key.private_exponent());
        bignum::decode(&mut n[..], MAX_NN_DIGITS, key.modulus());
        let n_digits = bignum::significant_digits(&n[..], MAX_NN_DIGITS);
        let d_digits = bignum::significant_digits(&d[..], MAX_NN_DIGITS);
        bignum::mod_exp(&mut m[..], &c[..], &d[..], d_digits, &n[..], n_digits);

        let mut direct = [0u8; 128];
        bignum::encode(&mut direct, &m[..], n_digits);

        assert_eq!(crt, direct);

        Ok(())
    }

    #[test]
    fn crt_with_larger_second_prime() -> Result<()> {
        let key = testutil::ca_private_key();
        let (p, q) = key.primes();
        let (dp, dq) = key.prime_exponents();

        // Swap the primes. The coefficient becomes p^-1 mod q.
        let mut pn = new_nat();
        let mut qn = new_nat();
        let mut inv = new_nat();
        bignum::decode(&mut pn[..], MAX_NN_DIGITS, p);
        bignum::decode(&mut qn[..], MAX_NN_DIGITS, q);
        let digits = bignum::significant_digits(&pn[..], MAX_NN_DIGITS);
        bignum::mod_inv(&mut inv[..], &pn[..], &qn[..], digits);
        let mut coefficient = [0u8; 64];
        bignum::encode(&mut coefficient, &inv[..], digits);

        let swapped = RsaPrivateKey::new(
            key.modulus(),
            key.public_exponent(),
            key.private_exponent(),
            (q, p),
            (dq, dp),
            &coefficient,
        )?;

        assert_eq!(swapped.encrypt(MESSAGE)?, key.encrypt(MESSAGE)?);

        let ciphertext = hex::decode(testutil::CA_CIPHERTEXT_HEX).unwrap();
        assert_eq!(swapped.decrypt(&ciphertext)?.as_slice(), MESSAGE);

        Ok(())
    }

    #[test]
    fn rejects_input_not_below_modulus() {
        let key = testutil::ca_private_key();
        let public = key.public_key();
        let mut out = [0u8; 128];

        let n = public.modulus().to_vec();
        let err = public_block(&mut out, &n, &public).unwrap_err();
        assert!(matches!(err, CardCryptoError::RsaDataOutOfRange));
        assert_eq!(err.kind(), crate::ErrorKind::Range);

        assert!(matches!(
            private_decrypt(&mut out, &[0xff; 128], &key),
            Err(CardCryptoError::RsaDataOutOfRange)
        ));
        assert!(matches!(
            private_decrypt(&mut out, &[1; 129], &key),
            Err(CardCryptoError::RsaInputLength {
                actual: 129,
                modulus: 128
            })
        ));
    }

    #[test]
    fn length_limits() {
        let key = testutil::ca_private_key();
        let public = key.public_key();
        let mut rng = rng();

        assert!(matches!(
            public.encrypt(&[1; 118], &mut rng),
            Err(CardCryptoError::RsaMessageTooLong {
                message: 118,
                modulus: 128
            })
        ));
        assert!(matches!(
            key.encrypt(&[1; 118]),
            Err(CardCryptoError::RsaMessageTooLong { .. })
        ));

        let mut small = [0u8; 64];
        assert!(matches!(
            private_encrypt(&mut small, MESSAGE, &key),
            Err(CardCryptoError::RsaOutputTooSmall {
                actual: 64,
                required: 128
            })
        ));

        let signature = key.encrypt(MESSAGE).unwrap();
        let mut tiny = [0u8; 4];
        assert!(matches!(
            public_decrypt(&mut tiny, &signature, &public),
            Err(CardCryptoError::RsaOutputTooSmall {
                actual: 4,
                required: 14
            })
        ));
    }

    /// Run a hand built block through the public transform so the private
    /// transform recovers it.
    fn seal(block: &[u8], key: &RsaPrivateKey) -> Vec<u8> {
        let mut out = vec![0u8; 128];
        public_block(&mut out, block, &key.public_key()).unwrap();
        out
    }

    #[test]
    fn rejects_malformed_padding() {
        let key = testutil::ca_private_key();
        let mut out = [0u8; 128];

        // Type 1 block handed to decryption.
        let mut block = vec![0xffu8; 128];
        block[0] = 0;
        block[1] = 1;
        block[100] = 0;
        let err = private_decrypt(&mut out, &seal(&block, &key), &key).unwrap_err();
        assert!(matches!(
            err,
            CardCryptoError::RsaBlockType {
                expected: 2,
                actual: 1
            }
        ));
        assert_eq!(err.kind(), crate::ErrorKind::Policy);

        // Type 2 block without any zero separator.
        let mut block = vec![0x11u8; 128];
        block[0] = 0;
        block[1] = 2;
        assert!(matches!(
            private_decrypt(&mut out, &seal(&block, &key), &key),
            Err(CardCryptoError::RsaMissingSeparator)
        ));

        // Seven padding bytes.
        block[9] = 0;
        assert!(matches!(
            private_decrypt(&mut out, &seal(&block, &key), &key),
            Err(CardCryptoError::RsaPaddingTooShort)
        ));

        // Eight is the minimum.
        block[9] = 0x11;
        block[10] = 0;
        let len = private_decrypt(&mut out, &seal(&block, &key), &key).unwrap();
        assert_eq!(len, 128 - 11);

        // Type 2 block handed to signature recovery.
        let mut sealed = [0u8; 128];
        private_block(&mut sealed, &block, &key).unwrap();
        assert!(matches!(
            public_decrypt(&mut out, &sealed, &key.public_key()),
            Err(CardCryptoError::RsaBlockType {
                expected: 1,
                actual: 2
            })
        ));

        // Type 1 padding interrupted before the separator.
        let mut block = vec![0xffu8; 128];
        block[0] = 0;
        block[1] = 1;
        block[50] = 0x42;
        let mut sealed = [0u8; 128];
        private_block(&mut sealed, &block, &key).unwrap();
        assert!(matches!(
            public_decrypt(&mut out, &sealed, &key.public_key()),
            Err(CardCryptoError::RsaMissingSeparator)
        ));
    }
}
