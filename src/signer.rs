use rsa::{
    pkcs1v15::{Signature, SigningKey, VerifyingKey},
    signature::{SignatureEncoding, Signer as _, Verifier as _},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    credential::parse_rsa_pem,
    error::{Result, WalletError},
};

/// Signature algorithms understood by the token framing.
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    Debug,
    Serialize,
    Deserialize,
    strum::EnumString,
    strum::Display,
)]
pub enum SigningAlgorithm {
    /// RSASSA-PKCS1-v1_5 using SHA-256
    #[strum(serialize = "RS256")]
    RS256,
}

/// Trait for signing compact token input.
///
/// Signing is CPU-bound and synchronous; implementations hold no mutable state
/// and may be shared across threads.
pub trait Signer: Send + Sync {
    /// The algorithm advertised in the token header.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Signs the provided data and returns the raw signature bytes.
    ///
    /// # Arguments
    ///
    /// * `data` - The data to sign.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// RS256 signer over an RSA private key.
#[derive(Clone)]
pub struct Rs256Signer {
    signing_key: SigningKey<Sha256>,
    public_key: RsaPublicKey,
}

impl std::fmt::Debug for Rs256Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rs256Signer").finish_non_exhaustive()
    }
}

impl Rs256Signer {
    /// Creates a signer from an already parsed private key.
    pub fn new(private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        let signing_key = SigningKey::<Sha256>::new(private_key);

        Self {
            signing_key,
            public_key,
        }
    }

    /// Creates a signer from a PKCS#8 or PKCS#1 PEM private key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self::new(parse_rsa_pem(pem)?))
    }

    /// The public half of the signing key.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

impl Signer for Rs256Signer {
    fn algorithm(&self) -> SigningAlgorithm {
        SigningAlgorithm::RS256
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        log::trace!("Signing {} bytes with RS256 key", data.len());
        let sig = self
            .signing_key
            .try_sign(data)
            .map_err(|e| WalletError::signing(format!("RS256 signing failed: {e}")))?;
        Ok(sig.to_vec())
    }
}

/// Verifies an RS256 signature over `data` with `public_key`.
pub fn verify_rs256(public_key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key = VerifyingKey::<Sha256>::new(public_key.clone());
    let signature = Signature::try_from(signature)
        .map_err(|e| WalletError::signing(format!("malformed RS256 signature: {e}")))?;

    verifying_key
        .verify(data, &signature)
        .map_err(|_| WalletError::signing("RS256 signature verification failed"))
}
