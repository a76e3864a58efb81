//! Digest-then-post-process signature chains.
//!
//! A [`HashChain`] digests its input with a [`DigestAlgorithm`] and feeds the
//! bytes through an ordered list of [`PostProcessStep`]s, each consuming the
//! previous step's output bytes. With no steps the result is the lowercase hex
//! of the digest.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::digest::DigestAlgorithm;

/// Errors raised while building or running a signature chain.
#[derive(Debug, Error)]
pub enum SigningError {
    #[error("unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    #[error("unknown post-process algorithm: {0}")]
    UnknownPostProcessAlgorithm(String),

    /// The RSA private key is missing or cannot be parsed.
    #[error("invalid signing key: {0}")]
    SigningKey(String),

    /// The steps cannot be composed.
    #[error("invalid post-process chain: {0}")]
    InvalidChain(String),

    #[error("RSA signing failed: {0}")]
    Rsa(#[from] rsa::Error),
}

/// Name of a post-processing step, as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessAlgorithm {
    Hex,
    Base64,
    RsaPkcs1,
}

impl PostProcessAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Base64 => "base64",
            Self::RsaPkcs1 => "rsa_pkcs1",
        }
    }
}

impl FromStr for PostProcessAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hex" => Ok(Self::Hex),
            "base64" => Ok(Self::Base64),
            "rsa_pkcs1" | "rsa-pkcs1" | "rsa" => Ok(Self::RsaPkcs1),
            _ => Err(SigningError::UnknownPostProcessAlgorithm(s.to_owned())),
        }
    }
}

/// An RSA private key used for PKCS#1 v1.5 signatures.
#[derive(Clone)]
pub struct RsaSigningKey(RsaPrivateKey);

impl RsaSigningKey {
    /// Parse a base64-encoded PEM private key, PKCS#8 or PKCS#1.
    pub fn from_base64_pem(encoded: &SecretString) -> Result<Self, SigningError> {
        let der = Zeroizing::new(
            B64.decode(encoded.expose_secret().trim())
                .map_err(|e| SigningError::SigningKey(format!("invalid base64: {e}")))?,
        );
        let pem = std::str::from_utf8(&der)
            .map_err(|_| SigningError::SigningKey("PEM is not valid UTF-8".into()))?;
        Self::from_pem(pem)
    }

    pub fn from_pem(pem: &str) -> Result<Self, SigningError> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map(Self)
            .map_err(|e| SigningError::SigningKey(e.to_string()))
    }

    pub fn from_key(key: RsaPrivateKey) -> Self {
        Self(key)
    }
}

impl fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RsaSigningKey([REDACTED])")
    }
}

/// One transformation applied to the running byte sequence.
#[derive(Debug, Clone)]
pub enum PostProcessStep {
    /// Lowercase hex text of the input bytes.
    Hex,
    /// Standard base64 text of the input bytes.
    Base64,
    /// PKCS#1 v1.5 signature over the input, which must be the raw digest.
    RsaPkcs1(RsaSigningKey),
}

impl PostProcessStep {
    /// Build a step from its configured name. `private_key` is required for
    /// `rsa_pkcs1` and ignored otherwise.
    pub fn from_config(
        algorithm: &str,
        private_key: Option<&SecretString>,
    ) -> Result<Self, SigningError> {
        match algorithm.parse::<PostProcessAlgorithm>()? {
            PostProcessAlgorithm::Hex => Ok(Self::Hex),
            PostProcessAlgorithm::Base64 => Ok(Self::Base64),
            PostProcessAlgorithm::RsaPkcs1 => {
                let key = private_key.ok_or_else(|| {
                    SigningError::SigningKey("rsa_pkcs1 requires a private_key".into())
                })?;
                Ok(Self::RsaPkcs1(RsaSigningKey::from_base64_pem(key)?))
            }
        }
    }

    pub fn algorithm(&self) -> PostProcessAlgorithm {
        match self {
            Self::Hex => PostProcessAlgorithm::Hex,
            Self::Base64 => PostProcessAlgorithm::Base64,
            Self::RsaPkcs1(_) => PostProcessAlgorithm::RsaPkcs1,
        }
    }

    fn produces_text(&self) -> bool {
        !matches!(self, Self::RsaPkcs1(_))
    }
}

/// A digest followed by zero or more post-processing steps.
#[derive(Debug, Clone)]
pub struct HashChain {
    digest: DigestAlgorithm,
    steps: Vec<PostProcessStep>,
}

impl HashChain {
    /// Validate and build a chain.
    ///
    /// An RSA step must come first, since it signs the raw digest, and a
    /// non-empty chain must end with a text step.
    pub fn new(digest: DigestAlgorithm, steps: Vec<PostProcessStep>) -> Result<Self, SigningError> {
        if let Some(pos) = steps
            .iter()
            .skip(1)
            .position(|step| matches!(step, PostProcessStep::RsaPkcs1(_)))
        {
            return Err(SigningError::InvalidChain(format!(
                "rsa_pkcs1 must be the first step, found at position {}",
                pos + 1
            )));
        }
        if let Some(last) = steps.last()
            && !last.produces_text()
        {
            return Err(SigningError::InvalidChain(format!(
                "chain must end with hex or base64, not {}",
                last.algorithm().as_str()
            )));
        }
        Ok(Self { digest, steps })
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest
    }

    pub fn steps(&self) -> &[PostProcessStep] {
        &self.steps
    }

    /// Digest `input` and run every step in order.
    pub fn sign(&self, input: &[u8]) -> Result<String, SigningError> {
        let mut bytes = self.digest.digest(input);
        if self.steps.is_empty() {
            return Ok(hex::encode(bytes));
        }
        for step in &self.steps {
            bytes = match step {
                PostProcessStep::Hex => hex::encode(&bytes).into_bytes(),
                PostProcessStep::Base64 => B64.encode(&bytes).into_bytes(),
                PostProcessStep::RsaPkcs1(RsaSigningKey(key)) => {
                    key.sign(self.digest.pkcs1v15(), &bytes)?
                }
            };
        }
        String::from_utf8(bytes)
            .map_err(|_| SigningError::InvalidChain("chain produced non-text output".into()))
    }
}
