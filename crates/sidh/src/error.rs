//! Error types for the SIDH core.

/// Everything that can go wrong while generating keys, agreeing on a
/// shared secret, or (de)compressing a public key.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SidhError {
    /// An argument was the wrong length, or otherwise malformed, for the
    /// operation it was passed to.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A rejection-sampling loop (torsion-basis search, scalar sampling)
    /// exhausted its retry budget without the random source producing a
    /// usable value. With a sound [`RandomSource`](crate::params::RandomSource)
    /// this indicates a misconfigured retry bound, not bad luck.
    #[error("random source exhausted after {0} rejection-sampling attempts")]
    TooManyIterations(u32),

    /// A decoded public key failed the validation required before use
    /// (curve membership, non-trivial kernel generator, or similar).
    #[error("public key failed validation")]
    PublicKeyValidation,

    /// The caller's [`RandomSource`](crate::params::RandomSource) returned
    /// an error.
    #[error("random source error")]
    Rng,
}
