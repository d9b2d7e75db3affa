//! # sidh
//!
//! Supersingular Isogeny Diffie-Hellman key exchange over the `p751`
//! parameter set (`eA = 372`, `eB = 239`).
//!
//! Two parties, Alice and Bob, each walk an isogeny chain of their own
//! fixed degree (`2` for Alice, `3` for Bob) whose kernel is generated
//! by a secret scalar multiple of a fixed public torsion basis. Each
//! party publishes the images of the *other* party's basis under their
//! own isogeny; agreement recomputes the shared codomain curve from the
//! peer's images and one's own secret, and the `j`-invariant of that
//! curve is the shared secret.
//!
//! ```
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use sidh::{Party, SecretKey, P751};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let alice = SecretKey::generate(Party::Alice, &P751, &mut rng)?;
//! let bob = SecretKey::generate(Party::Bob, &P751, &mut rng)?;
//! let alice_secret = alice.agree(&bob.public_key())?;
//! let bob_secret = bob.agree(&alice.public_key())?;
//! assert_eq!(alice_secret, bob_secret);
//! # Ok::<(), sidh::SidhError>(())
//! ```
//!
//! ## Module layout
//!
//! - [`bigint`] / [`fp`] / [`fp2`]: fixed-width arithmetic, `GF(p)`,
//!   `GF(p^2)`.
//! - [`curve`]: `x`-only Montgomery arithmetic, plus a non-constant-time
//!   affine submodule used only by compression.
//! - [`isogeny`]: 2-, 3-, and 4-isogeny computation and evaluation.
//! - [`strategy`]: optimal isogeny-tree split tables.
//! - [`party`] / [`params`]: which side of the exchange, and the fixed
//!   public parameters.
//! - [`keyexchange`]: key generation and shared-secret agreement.
//! - [`pairing`] / [`dlp`] / [`compression`]: public-key compression.
//! - [`encoding`]: wire-format byte conversions.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::pub_use, reason = "exporting items for consumers")]

pub mod bigint;
pub mod compression;
pub mod curve;
pub mod dlp;
pub mod encoding;
pub mod error;
pub mod fp;
pub mod fp2;
pub mod isogeny;
pub mod keyexchange;
pub mod pairing;
pub mod params;
pub mod party;
pub mod strategy;

pub use compression::CompressedPublicKey;
pub use error::SidhError;
pub use keyexchange::{PublicKey, SecretKey, SharedSecret};
pub use params::{ParameterSet, RandomSource, P751};
pub use party::Party;
