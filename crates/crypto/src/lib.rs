//! Cryptographic building blocks for Ianua gateways.
//!
//! - [`tls`]: decodes embedded base64 PEM material into a shared
//!   `rustls::ClientConfig`.
//! - [`digest`]: the digest algorithms a hash signer can start from.
//! - [`signing`]: post-processing chains (hex, base64, RSA PKCS#1 v1.5) run
//!   over a digest.

pub mod digest;
pub mod signing;
pub mod tls;

pub use digest::DigestAlgorithm;
pub use signing::{
    HashChain, PostProcessAlgorithm, PostProcessStep, RsaSigningKey, SigningError,
};
pub use tls::{ClientTlsConfig, ClientTlsOptions, TlsError, TlsMaterial, load_tls};

// Re-export for consumers so they don't need a direct `secrecy` dependency.
pub use secrecy::{ExposeSecret, SecretString};
