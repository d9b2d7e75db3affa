//! Which side of the key exchange a value belongs to.

/// Alice walks 2-isogenies (`eA = 372`); Bob walks 3-isogenies (`eB = 239`).
///
/// Every keypair, curve, and wire-format type in this crate is specific
/// to one party — there is no untyped `is_alice: bool` anywhere in the
/// public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    /// The 2^eA-isogeny side.
    Alice,
    /// The 3^eB-isogeny side.
    Bob,
}

impl Party {
    /// The isogeny degree's prime base (2 for Alice, 3 for Bob).
    #[must_use]
    pub const fn prime(self) -> u64 {
        match self {
            Self::Alice => 2,
            Self::Bob => 3,
        }
    }

    /// The isogeny chain length (`eA` or `eB`): the exponent in
    /// `prime()^chain_length()`, i.e. the height of the isogeny tree
    /// this party walks. Not the bit length of a secret scalar — see
    /// [`Self::scalar_bits`] for that.
    #[must_use]
    pub const fn chain_length(self) -> u32 {
        match self {
            Self::Alice => 372,
            Self::Bob => 239,
        }
    }

    /// Bit length of a fully-sampled secret scalar for this party.
    ///
    /// Distinct from [`Self::chain_length`]: Alice's order `2^eA` is a
    /// power of two, so her transformed scalar (`[2, 2^eA - 2]`, see
    /// [`crate::keyexchange::SecretKey::generate`]) happens to need
    /// exactly `eA` bits too. Bob's order `3^eB` is not a power of two
    /// — his transformed scalar range tops out just under `2*3^eB/3`,
    /// which needs noticeably more than `eB` bits.
    #[must_use]
    pub const fn scalar_bits(self) -> u32 {
        match self {
            Self::Alice => 372,
            Self::Bob => 379,
        }
    }

    /// The number of isogeny evaluations the walk performs.
    ///
    /// Alice batches pairs of 2-isogenies into a single 4-isogeny
    /// evaluation (halving the number of isogeny evaluations at the
    /// cost of one extra field multiplication per step); Bob's
    /// 3-isogenies are not batched.
    #[must_use]
    pub const fn isogeny_steps(self) -> u32 {
        match self {
            Self::Alice => 186,
            Self::Bob => 239,
        }
    }

    /// The degree of a single isogeny evaluation in the walk (`4` for
    /// Alice's batched steps, `3` for Bob's).
    #[must_use]
    pub const fn isogeny_degree(self) -> u64 {
        match self {
            Self::Alice => 4,
            Self::Bob => 3,
        }
    }

    /// The other party.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Alice => Self::Bob,
            Self::Bob => Self::Alice,
        }
    }
}
