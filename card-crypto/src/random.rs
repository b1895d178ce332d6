// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Sources of random bytes for PKCS#1 padding.

[SystemRandomSource] is the one to use unless the host has a reason to
supply its own entropy. [DigestRandom] is a seeded digest stream generator
for hosts that collect entropy themselves (a card challenge, for example)
and for reproducible tests.

Instances are not synchronized. Each concurrent caller owns its own source.
*/

use {
    crate::error::{CardCryptoError, Result},
    ring::{
        digest,
        rand::{SecureRandom, SystemRandom},
    },
    zeroize::Zeroize,
};

/// Number of seed bytes a [DigestRandom] must receive before producing output.
pub const RANDOM_BYTES_NEEDED: usize = 256;

const STATE_LEN: usize = 32;

/// Something that can fill a buffer with random bytes.
pub trait RandomSource {
    /// Fill `dest` entirely with random bytes.
    fn fill(&mut self, dest: &mut [u8]) -> Result<()>;
}

/// Operating system randomness via [ring::rand::SystemRandom].
#[derive(Debug)]
pub struct SystemRandomSource {
    rng: SystemRandom,
}

impl Default for SystemRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRandomSource {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl RandomSource for SystemRandomSource {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        self.rng
            .fill(dest)
            .map_err(|_| CardCryptoError::RandomFailure)
    }
}

/// A SHA-256 stream generator over a seeded counter state.
///
/// Seed material is digested and added into a 256-bit state. Each output
/// block is the digest of the state, after which the state is incremented.
#[derive(Zeroize)]
pub struct DigestRandom {
    state: [u8; STATE_LEN],
    output: [u8; STATE_LEN],
    output_available: usize,
    bytes_needed: usize,
}

impl Drop for DigestRandom {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for DigestRandom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestRandom")
            .field("bytes_needed", &self.bytes_needed)
            .finish_non_exhaustive()
    }
}

impl Default for DigestRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl DigestRandom {
    /// Construct an unseeded generator.
    pub fn new() -> Self {
        Self {
            state: [0; STATE_LEN],
            output: [0; STATE_LEN],
            output_available: 0,
            bytes_needed: RANDOM_BYTES_NEEDED,
        }
    }

    /// The number of seed bytes still required before output is available.
    pub fn bytes_needed(&self) -> usize {
        self.bytes_needed
    }

    /// Mix seed material into the state.
    pub fn update(&mut self, seed: &[u8]) {
        let d = digest::digest(&digest::SHA256, seed);

        // state += digest, as big-endian numbers.
        let mut carry = 0u16;
        for (s, b) in self.state.iter_mut().zip(d.as_ref().iter()).rev() {
            carry += *s as u16 + *b as u16;
            *s = carry as u8;
            carry >>= 8;
        }

        self.bytes_needed = self.bytes_needed.saturating_sub(seed.len());
    }

    fn increment_state(&mut self) {
        for s in self.state.iter_mut().rev() {
            *s = s.wrapping_add(1);
            if *s != 0 {
                break;
            }
        }
    }
}

impl RandomSource for DigestRandom {
    fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        if self.bytes_needed > 0 {
            return Err(CardCryptoError::RandomNotSeeded(self.bytes_needed));
        }

        let mut offset = 0;
        while offset < dest.len() {
            if self.output_available == 0 {
                let d = digest::digest(&digest::SHA256, &self.state);
                self.output.copy_from_slice(d.as_ref());
                self.output_available = STATE_LEN;
                self.increment_state();
            }

            let start = STATE_LEN - self.output_available;
            let count = self.output_available.min(dest.len() - offset);
            dest[offset..offset + count].copy_from_slice(&self.output[start..start + count]);

            offset += count;
            self.output_available -= count;
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn seeded(seed: u8) -> DigestRandom {
        let mut rng = DigestRandom::new();
        rng.update(&[seed; RANDOM_BYTES_NEEDED]);
        rng
    }

    #[test]
    fn unseeded_refuses() {
        let mut rng = DigestRandom::new();
        rng.update(&[1; 100]);

        let mut buf = [0u8; 8];
        let err = rng.fill(&mut buf).unwrap_err();
        assert!(matches!(err, CardCryptoError::RandomNotSeeded(156)));
        assert_eq!(err.kind(), crate::ErrorKind::Environment);

        rng.update(&[2; 156]);
        assert_eq!(rng.bytes_needed(), 0);
        rng.fill(&mut buf).unwrap();
    }

    #[test]
    fn deterministic_stream() -> Result<()> {
        let mut a = seeded(7);
        let mut b = seeded(7);
        let mut c = seeded(8);

        let mut whole = [0u8; 100];
        a.fill(&mut whole)?;

        // Output does not depend on how requests are chunked.
        let mut pieces = [0u8; 100];
        b.fill(&mut pieces[..5])?;
        b.fill(&mut pieces[5..40])?;
        b.fill(&mut pieces[40..])?;
        assert_eq!(whole, pieces);

        let mut other = [0u8; 100];
        c.fill(&mut other)?;
        assert_ne!(whole, other);

        // The first block is the digest of the seeded state.
        let mut expected_state = [0u8; STATE_LEN];
        expected_state.copy_from_slice(
            digest::digest(&digest::SHA256, &[7; RANDOM_BYTES_NEEDED]).as_ref(),
        );
        let first = digest::digest(&digest::SHA256, &expected_state);
        assert_eq!(&whole[..STATE_LEN], first.as_ref());

        Ok(())
    }

    #[test]
    fn system_source_fills() -> Result<()> {
        let mut rng = SystemRandomSource::new();
        let mut buf = [0u8; 64];
        rng.fill(&mut buf)?;
        assert!(buf.iter().any(|b| *b != 0));

        Ok(())
    }
}
