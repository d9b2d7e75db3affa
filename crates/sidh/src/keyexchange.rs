//! L5 / L9 — key generation and shared-secret agreement.
//!
//! Each party walks an isogeny chain whose kernel is generated by a
//! secret linear combination of their own fixed torsion basis. The
//! walk uses [`crate::strategy`]'s optimal split tables to decide,
//! at each node, how many steps to push a partial kernel forward
//! before evaluating an isogeny — recursively, rather than with an
//! explicit stack, since the recursion depth (at most `isogeny_steps`)
//! is shallow enough not to matter and the recursive form makes the
//! push/evaluate cost split in [`crate::strategy`] directly legible
//! in the code.

use crate::bigint::Digits;
use crate::curve::{xdble, xtple, MontgomeryCurve, ProjectivePoint};
use crate::error::SidhError;
use crate::fp2::Fp2;
use crate::isogeny::{
    compute_four_isogeny, compute_three_isogeny, eval_four_isogeny, eval_three_isogeny,
};
use crate::params::{base_torsion_basis, RandomSource, THREE_POW_EB};
use crate::party::Party;
use crate::strategy::{alice_splits, bob_splits};

const BYTES_PER_SCALAR: usize = 8 * crate::bigint::NWORDS_FIELD;

/// A party's secret scalar: Alice's even in `[2, 2^eA - 2]`, Bob's in
/// `[3, 2*3^eB/3 - 1]` — see [`SecretKey::generate`].
#[derive(Clone, zeroize::Zeroize, zeroize::ZeroizeOnDrop)]
pub struct SecretKey {
    #[zeroize(skip)]
    party: Party,
    scalar: Digits,
}

/// The public key a party publishes: the codomain curve's torsion
/// basis images, as affine x-coordinates `(phi(P_other), phi(Q_other),
/// phi(P_other - Q_other))`.
#[derive(Clone, Copy, Debug)]
pub struct PublicKey {
    /// Owning party (whose secret produced this key).
    pub party: Party,
    /// `x(phi(P_other))`.
    pub p_x: Fp2,
    /// `x(phi(Q_other))`.
    pub q_x: Fp2,
    /// `x(phi(P_other - Q_other))`.
    pub pq_x: Fp2,
}

impl PublicKey {
    /// Encode as 576 octets: `x(phi(P)) ‖ x(phi(Q)) ‖ x(phi(P - Q))`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; crate::encoding::PUBLIC_KEY_BYTES] {
        let mut out = [0_u8; crate::encoding::PUBLIC_KEY_BYTES];
        let fp2_bytes = crate::encoding::FP2_BYTES;
        for (slot, value) in out.chunks_exact_mut(fp2_bytes).zip([self.p_x, self.q_x, self.pq_x].iter()) {
            slot.copy_from_slice(&crate::encoding::fp2_to_bytes(value));
        }
        out
    }

    /// Decode a public key belonging to `party`.
    pub fn try_from_bytes(party: Party, bytes: &[u8; crate::encoding::PUBLIC_KEY_BYTES]) -> Result<Self, SidhError> {
        let fp2_bytes = crate::encoding::FP2_BYTES;
        let mut chunks = bytes.chunks_exact(fp2_bytes);
        let mut next = || -> Result<Fp2, SidhError> {
            let chunk = chunks.next().ok_or(SidhError::InvalidArgument("public key is too short"))?;
            let mut array = [0_u8; crate::encoding::FP2_BYTES];
            array.copy_from_slice(chunk);
            crate::encoding::fp2_from_bytes(&array)
        };
        let p_x = next()?;
        let q_x = next()?;
        let pq_x = next()?;
        Ok(Self { party, p_x, q_x, pq_x })
    }
}

/// The shared secret: the `j`-invariant of the common codomain curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(into = "[u8; crate::encoding::SHARED_SECRET_BYTES]", try_from = "[u8; crate::encoding::SHARED_SECRET_BYTES]")
)]
pub struct SharedSecret(pub Fp2);

impl SharedSecret {
    /// Encode as 192 octets (one `Fp2`).
    #[must_use]
    pub fn to_bytes(&self) -> [u8; crate::encoding::SHARED_SECRET_BYTES] {
        crate::encoding::fp2_to_bytes(&self.0)
    }

    /// Decode a shared secret previously produced by [`Self::to_bytes`].
    pub fn try_from_bytes(bytes: &[u8; crate::encoding::SHARED_SECRET_BYTES]) -> Result<Self, SidhError> {
        Ok(Self(crate::encoding::fp2_from_bytes(bytes)?))
    }
}

impl From<SharedSecret> for [u8; crate::encoding::SHARED_SECRET_BYTES] {
    fn from(value: SharedSecret) -> Self {
        value.to_bytes()
    }
}

impl TryFrom<[u8; crate::encoding::SHARED_SECRET_BYTES]> for SharedSecret {
    type Error = SidhError;

    fn try_from(bytes: [u8; crate::encoding::SHARED_SECRET_BYTES]) -> Result<Self, Self::Error> {
        Self::try_from_bytes(&bytes)
    }
}

fn digits_to_bits(digits: &Digits, bit_len: u32) -> Vec<bool> {
    let mut bits = Vec::with_capacity(bit_len as usize);
    for bit_index in 0..bit_len {
        let limb_index = (bit_index / 64) as usize;
        let within = bit_index % 64;
        let limb = digits.get(limb_index).copied().unwrap_or(0);
        bits.push((limb >> within) & 1 == 1);
    }
    bits
}

fn mask_to_bit_length(digits: &mut Digits, bit_len: u32) {
    for (limb_index, limb) in digits.iter_mut().enumerate() {
        let limb_start = (limb_index as u32) * 64;
        if limb_start >= bit_len {
            *limb = 0;
        } else if limb_start + 64 > bit_len {
            let keep = bit_len - limb_start;
            *limb &= (1_u64 << keep) - 1;
        }
    }
}

fn bytes_to_digits(bytes: &[u8; BYTES_PER_SCALAR]) -> Digits {
    let mut digits = [0_u64; crate::bigint::NWORDS_FIELD];
    for (limb, chunk) in digits.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0_u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    digits
}

fn digits_from_u64(value: u64) -> Digits {
    let mut out = [0_u64; crate::bigint::NWORDS_FIELD];
    if let Some(low) = out.get_mut(0) {
        *low = value;
    }
    out
}

/// Sample Alice's secret scalar: rejection sampling in `[0, 2^eA/2 -
/// 2]`, then `+1` and double, producing the even scalar in `[2, 2^eA -
/// 2]` the data model calls for.
fn sample_alice_scalar(rng: &mut impl RandomSource, max_iterations: u32) -> Result<Digits, SidhError> {
    let (bound, _borrow) = crate::bigint::mp_sub(&crate::params::TWO_POW_EA_MINUS_1, &digits_from_u64(2));
    for _attempt in 0..max_iterations {
        let mut bytes = [0_u8; BYTES_PER_SCALAR];
        rng.try_fill_bytes(&mut bytes)?;
        let mut digits = bytes_to_digits(&bytes);
        mask_to_bit_length(&mut digits, Party::Alice.scalar_bits());
        if !bool::from(crate::bigint::ct_lt(&bound, &digits)) {
            let (plus_one, _) = crate::bigint::mp_add(&digits, &digits_from_u64(1));
            let (doubled, _) = crate::bigint::mp_add(&plus_one, &plus_one);
            return Ok(doubled);
        }
    }
    tracing::warn!(max_iterations, "rejection sampling for alice's scalar exhausted its retry budget");
    Err(SidhError::TooManyIterations(max_iterations))
}

/// Sample Bob's secret scalar: rejection sampling in `[0, 3^eB/3 -
/// 2]`, then `+1`, double, `+1` again, producing the scalar in `[3,
/// 2*3^eB/3 - 1]` the data model calls for (`3^eB` is not a power of
/// two, hence the rejection sampling rather than a plain bit mask).
fn sample_bob_scalar(rng: &mut impl RandomSource, max_iterations: u32) -> Result<Digits, SidhError> {
    let (bound, _borrow) = crate::bigint::mp_sub(&crate::params::THREE_POW_EB_MINUS_1, &digits_from_u64(2));
    for _attempt in 0..max_iterations {
        let mut bytes = [0_u8; BYTES_PER_SCALAR];
        rng.try_fill_bytes(&mut bytes)?;
        let mut digits = bytes_to_digits(&bytes);
        mask_to_bit_length(&mut digits, Party::Bob.scalar_bits());
        if !bool::from(crate::bigint::ct_lt(&bound, &digits)) {
            let (plus_one, _) = crate::bigint::mp_add(&digits, &digits_from_u64(1));
            let (doubled, _) = crate::bigint::mp_add(&plus_one, &plus_one);
            let (result, _) = crate::bigint::mp_add(&doubled, &digits_from_u64(1));
            return Ok(result);
        }
    }
    tracing::warn!(max_iterations, "rejection sampling for bob's scalar exhausted its retry budget");
    Err(SidhError::TooManyIterations(max_iterations))
}

impl SecretKey {
    /// Generate a fresh secret key for `party`.
    pub fn generate(
        party: Party,
        parameters: &crate::params::ParameterSet,
        rng: &mut impl RandomSource,
    ) -> Result<Self, SidhError> {
        tracing::debug!(?party, "generating secret key");
        let scalar = match party {
            Party::Alice => sample_alice_scalar(rng, parameters.max_rng_iterations)?,
            Party::Bob => sample_bob_scalar(rng, parameters.max_rng_iterations)?,
        };
        tracing::debug!(?party, "secret key generated");
        Ok(Self { party, scalar })
    }

    /// The owning party.
    #[must_use]
    pub fn party(&self) -> Party {
        self.party
    }

    /// Encode the secret scalar as 48 little-endian octets.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; crate::encoding::SCALAR_BYTES] {
        crate::encoding::scalar_to_bytes(&self.scalar)
    }

    /// Decode a secret scalar previously produced by [`Self::to_bytes`]
    /// for `party`.
    pub fn try_from_bytes(party: Party, bytes: &[u8; crate::encoding::SCALAR_BYTES]) -> Result<Self, SidhError> {
        let scalar = crate::encoding::scalar_from_bytes(bytes);
        let mut masked = scalar;
        mask_to_bit_length(&mut masked, party.scalar_bits());
        if masked != scalar {
            return Err(SidhError::InvalidArgument("scalar exceeds this party's scalar bit length"));
        }
        if party == Party::Bob && !bool::from(crate::bigint::ct_lt(&scalar, &THREE_POW_EB)) {
            return Err(SidhError::InvalidArgument("scalar is not less than 3^eB"));
        }
        Ok(Self { party, scalar })
    }

    /// Derive the public key that announces this secret's isogeny.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        tracing::debug!(party = ?self.party, "deriving public key");
        let own_basis = base_torsion_basis(self.party);
        let other_basis = base_torsion_basis(self.party.other());
        let bits = digits_to_bits(&self.scalar, self.party.scalar_bits());
        let mut curve = MontgomeryCurve::base();
        let kernel =
            crate::curve::ladder_3_pt(&own_basis.p_x, &own_basis.q_x, &own_basis.pq_x, &bits, &curve);
        let mut images = [
            ProjectivePoint::from_affine(other_basis.p_x),
            ProjectivePoint::from_affine(other_basis.q_x),
            ProjectivePoint::from_affine(other_basis.pq_x),
        ];
        walk(self.party, kernel, self.party.isogeny_steps(), &mut images, &mut curve);
        tracing::debug!(party = ?self.party, "public key derived");
        PublicKey {
            party: self.party,
            p_x: images[0].to_affine(),
            q_x: images[1].to_affine(),
            pq_x: images[2].to_affine(),
        }
    }

    /// Agree on a shared secret with a peer's public key. The peer
    /// must be the other party (Alice agrees against Bob's key, and
    /// vice versa).
    pub fn agree(&self, peer: &PublicKey) -> Result<SharedSecret, SidhError> {
        tracing::debug!(party = ?self.party, "agreeing against an uncompressed peer key");
        if peer.party != self.party.other() {
            return Err(SidhError::InvalidArgument("peer public key belongs to the wrong party"));
        }
        let curve_a = crate::curve::recover_curve_a(&peer.p_x, &peer.q_x, &peer.pq_x);
        let mut curve = MontgomeryCurve { a: curve_a, c: Fp2::one() };
        let bits = digits_to_bits(&self.scalar, self.party.scalar_bits());
        let kernel = crate::curve::ladder_3_pt(&peer.p_x, &peer.q_x, &peer.pq_x, &bits, &curve);
        let mut no_aux_points: [ProjectivePoint; 0] = [];
        walk(self.party, kernel, self.party.isogeny_steps(), &mut no_aux_points, &mut curve);
        tracing::debug!(party = ?self.party, "agreement complete");
        Ok(SharedSecret(curve.j_invariant()))
    }

    /// Agree on a shared secret from a peer's *compressed* public key.
    pub fn agree_compressed(
        &self,
        peer: &crate::compression::CompressedPublicKey,
        rng: &mut impl RandomSource,
        parameters: &crate::params::ParameterSet,
    ) -> Result<SharedSecret, SidhError> {
        tracing::debug!(party = ?self.party, "agreeing against a compressed peer key");
        if peer.party != self.party.other() {
            return Err(SidhError::InvalidArgument("peer public key belongs to the wrong party"));
        }
        let (kernel_point, curve_a) = crate::compression::decompress(peer, &self.scalar, rng, parameters)?;
        let mut curve = MontgomeryCurve { a: curve_a, c: Fp2::one() };
        let kernel = ProjectivePoint::from_affine(kernel_point.0);
        let mut no_aux_points: [ProjectivePoint; 0] = [];
        walk(self.party, kernel, self.party.isogeny_steps(), &mut no_aux_points, &mut curve);
        tracing::debug!(party = ?self.party, "compressed agreement complete");
        Ok(SharedSecret(curve.j_invariant()))
    }
}

/// Recursively drive `kernel` (order `degree^height`) through
/// `height` isogeny evaluations, updating `curve` to the final
/// codomain and pushing every point in `aux` through the same chain.
fn walk(
    party: Party,
    kernel: ProjectivePoint,
    height: u32,
    aux: &mut [ProjectivePoint],
    curve: &mut MontgomeryCurve,
) {
    if height == 0 {
        return;
    }
    if height == 1 {
        apply_leaf_isogeny(party, &kernel, aux, curve);
        return;
    }
    let splits = match party {
        Party::Alice => alice_splits(),
        Party::Bob => bob_splits(),
    };
    let split = splits.get((height - 1) as usize).copied().unwrap_or(1).clamp(1, height - 1);
    let (a24, c24) = curve.doubling_constants();
    let push_steps = height - split;
    let pushed = push_kernel(party, &kernel, push_steps, &a24, &c24);

    let mut combined: Vec<ProjectivePoint> = aux.to_vec();
    combined.push(kernel);
    walk(party, pushed, split, &mut combined, curve);

    let (evaluated_aux, evaluated_kernel_slot) = combined.split_at(aux.len());
    aux.copy_from_slice(evaluated_aux);
    let Some(&evaluated_kernel) = evaluated_kernel_slot.first() else {
        unreachable!("combined always has aux.len() + 1 elements, the kernel is the last one")
    };
    walk(party, evaluated_kernel, push_steps, aux, curve);
}

fn push_kernel(party: Party, point: &ProjectivePoint, steps: u32, a24: &Fp2, c24: &Fp2) -> ProjectivePoint {
    match party {
        Party::Alice => xdble(point, a24, c24, 2 * steps),
        Party::Bob => xtple(point, a24, c24, steps),
    }
}

fn apply_leaf_isogeny(party: Party, kernel: &ProjectivePoint, aux: &mut [ProjectivePoint], curve: &mut MontgomeryCurve) {
    match party {
        Party::Alice => {
            let (coeffs, codomain) = compute_four_isogeny(kernel);
            *curve = codomain;
            for point in aux.iter_mut() {
                *point = eval_four_isogeny(point, &coeffs);
            }
        }
        Party::Bob => {
            let (coeffs, codomain) = compute_three_isogeny(kernel);
            *curve = codomain;
            for point in aux.iter_mut() {
                *point = eval_three_isogeny(point, &coeffs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SecretKey;
    use crate::error::SidhError;
    use crate::params::{RandomSource, P751};
    use crate::party::Party;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn alice_and_bob_agree() {
        let mut rng = StdRng::seed_from_u64(42);
        let alice = SecretKey::generate(Party::Alice, &P751, &mut rng).expect("rng does not fail in tests");
        let bob = SecretKey::generate(Party::Bob, &P751, &mut rng).expect("rng does not fail in tests");
        let alice_public = alice.public_key();
        let bob_public = bob.public_key();
        let alice_secret = alice.agree(&bob_public).expect("valid peer key");
        let bob_secret = bob.agree(&alice_public).expect("valid peer key");
        assert_eq!(alice_secret, bob_secret);
    }

    #[test]
    fn agree_rejects_same_party_key() {
        let mut rng = StdRng::seed_from_u64(7);
        let alice = SecretKey::generate(Party::Alice, &P751, &mut rng).expect("rng does not fail in tests");
        let other_alice = SecretKey::generate(Party::Alice, &P751, &mut rng).expect("rng does not fail in tests");
        let result = alice.agree(&other_alice.public_key());
        assert!(result.is_err());
    }

    /// Not cryptographically sound randomness — a deterministic source
    /// for reproducing the exact same keys and shared secret run over run.
    struct ByteCounterRng(u8);

    impl RandomSource for ByteCounterRng {
        fn try_fill_bytes(&mut self, out: &mut [u8]) -> Result<(), SidhError> {
            for byte in out.iter_mut() {
                *byte = self.0;
                self.0 = self.0.wrapping_add(1);
            }
            Ok(())
        }
    }

    #[test]
    fn deterministic_byte_counter_rng_agrees_and_replays() {
        let mut rng = ByteCounterRng(0);
        let alice = SecretKey::generate(Party::Alice, &P751, &mut rng).expect("rng does not fail in tests");
        let bob = SecretKey::generate(Party::Bob, &P751, &mut rng).expect("rng does not fail in tests");
        let alice_secret = alice.agree(&bob.public_key()).expect("valid peer key");
        let bob_secret = bob.agree(&alice.public_key()).expect("valid peer key");
        assert_eq!(alice_secret, bob_secret);
        assert_eq!(alice_secret.to_bytes().len(), crate::encoding::SHARED_SECRET_BYTES);

        let mut replay_rng = ByteCounterRng(0);
        let replay_alice = SecretKey::generate(Party::Alice, &P751, &mut replay_rng).expect("rng does not fail in tests");
        let replay_bob = SecretKey::generate(Party::Bob, &P751, &mut replay_rng).expect("rng does not fail in tests");
        assert_eq!(replay_alice.to_bytes(), alice.to_bytes());
        assert_eq!(replay_bob.to_bytes(), bob.to_bytes());
        let replay_secret = replay_alice.agree(&replay_bob.public_key()).expect("valid peer key");
        assert_eq!(replay_secret, alice_secret);
    }

    #[test]
    fn cross_party_mix_every_pair_agrees() {
        const PAIRS_PER_SIDE: usize = 10;
        let mut rng = StdRng::seed_from_u64(1_000);
        let alices: Vec<SecretKey> = (0..PAIRS_PER_SIDE)
            .map(|_| SecretKey::generate(Party::Alice, &P751, &mut rng).expect("rng does not fail in tests"))
            .collect();
        let bobs: Vec<SecretKey> = (0..PAIRS_PER_SIDE)
            .map(|_| SecretKey::generate(Party::Bob, &P751, &mut rng).expect("rng does not fail in tests"))
            .collect();
        let alice_publics: Vec<_> = alices.iter().map(SecretKey::public_key).collect();
        let bob_publics: Vec<_> = bobs.iter().map(SecretKey::public_key).collect();

        for (alice, alice_public) in alices.iter().zip(&alice_publics) {
            for (bob, bob_public) in bobs.iter().zip(&bob_publics) {
                let alice_secret = alice.agree(bob_public).expect("valid peer key");
                let bob_secret = bob.agree(alice_public).expect("valid peer key");
                assert_eq!(alice_secret, bob_secret);
            }
        }
    }
}
