/// Solana wallet keys and message signing

use ed25519_dalek::{Signer, SigningKey, KEYPAIR_LENGTH, SECRET_KEY_LENGTH};

use crate::core::error::{ClaimError, ClaimResult};

/// Detached ed25519 signature over a challenge message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSignature([u8; 64]);

impl MessageSignature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

pub struct WalletSigner {
    signing_key: SigningKey,
    address: String,
}

impl WalletSigner {
    /// Load from a base58 secret: a 64-byte keypair (Solana CLI / Phantom
    /// export format) or a bare 32-byte seed.
    pub fn from_base58(secret: &str) -> ClaimResult<Self> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| ClaimError::crypto(format!("secret key is not valid base58: {}", e)))?;

        let signing_key = match bytes.len() {
            KEYPAIR_LENGTH => {
                let mut keypair = [0u8; KEYPAIR_LENGTH];
                keypair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&keypair)
                    .map_err(|e| ClaimError::crypto(format!("invalid keypair: {}", e)))?
            }
            SECRET_KEY_LENGTH => {
                let mut seed = [0u8; SECRET_KEY_LENGTH];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            other => {
                return Err(ClaimError::crypto(format!(
                    "secret key must be {} or {} bytes, got {}",
                    KEYPAIR_LENGTH, SECRET_KEY_LENGTH, other
                )))
            }
        };

        Ok(Self::from_signing_key(signing_key))
    }

    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        Self { signing_key, address }
    }

    /// Base58 public key
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Deterministic for a given key and message
    pub fn sign(&self, message: &[u8]) -> MessageSignature {
        MessageSignature(self.signing_key.sign(message).to_bytes())
    }
}
