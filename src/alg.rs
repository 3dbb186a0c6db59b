//! Implementations of JWT signing / verification algorithms. Also contains generic traits
//! for signing and verifying keys.

mod ecdsa;
mod eddsa;
mod generic;
mod hmacs;
mod none;
mod rsa;

pub use self::ecdsa::{Es256, Es384, Es512};
pub use self::eddsa::Ed25519;
pub use self::generic::{KeyMaterial, SigningKey, VerifyingKey};
pub use self::hmacs::*;
pub use self::none::{NoSignature, NoneAlg};
pub use self::rsa::{Rsa, RsaPrivateKey, RsaPublicKey, RsaSignature, MIN_MODULUS_BITS};
