//! ECDSA key management for signers
//!
//! Signer identities are secp256k1 public keys. Inside the wallet a signer is
//! only ever known by its identity hash, the SHA-256 of the compressed key.

use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

use super::hash::{sha256, Digest};

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid signature encoding")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A signer's key pair
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Compressed public key as hex
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    pub fn address(&self) -> String {
        public_key_to_address(&self.public_key)
    }

    /// The hash under which this signer is stored in the signer set
    pub fn identity(&self) -> Digest {
        identity_hash(&self.public_key)
    }

    /// Sign a 32-byte message digest
    pub fn sign(&self, message: &Digest) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.secret_key, message)
    }
}

/// Hash of a signer's compressed public key
pub fn identity_hash(public_key: &PublicKey) -> Digest {
    sha256(&public_key.serialize())
}

/// Base58Check(RIPEMD160(SHA256(pubkey))) display address for a signer
pub fn public_key_to_address(public_key: &PublicKey) -> String {
    let sha256_hash = sha256(&public_key.serialize());

    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256_hash.as_bytes());
    let ripemd_hash = ripemd.finalize();

    let mut address_bytes = vec![0x00];
    address_bytes.extend_from_slice(&ripemd_hash);

    let checksum = Sha256::digest(Sha256::digest(&address_bytes));
    address_bytes.extend_from_slice(&checksum[..4]);

    bs58::encode(address_bytes).into_string()
}

/// Parse a public key from hex string
pub fn public_key_from_hex(hex_key: &str) -> Result<PublicKey, KeyError> {
    let bytes = hex::decode(hex_key).map_err(|_| KeyError::InvalidPublicKey)?;
    PublicKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPublicKey)
}

/// Sign a message digest, returning a 64-byte compact signature
pub fn sign_message(secret_key: &SecretKey, message: &Digest) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(message.as_bytes())?;
    let signature = secp.sign_ecdsa(&message, secret_key);
    Ok(signature.serialize_compact().to_vec())
}

/// Verify a compact signature against a public key
///
/// Returns `Ok(false)` for a well-formed signature that does not verify and
/// an error only when the signature bytes cannot be decoded.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &Digest,
    signature: &[u8],
) -> Result<bool, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(message.as_bytes())?;
    let sig = secp256k1::ecdsa::Signature::from_compact(signature)
        .map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.verify_ecdsa(&message, &sig, public_key).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert_eq!(kp.private_key_hex().len(), 64);
        assert_eq!(kp.public_key_hex().len(), 66);
        assert!(kp.address().starts_with('1'));
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = KeyPair::generate();
        let message = sha256(b"approve nonce 0");

        let signature = kp.sign(&message).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(verify_signature(&kp.public_key, &message, &signature).unwrap());

        let other = sha256(b"approve nonce 1");
        assert!(!verify_signature(&kp.public_key, &other, &signature).unwrap());
    }

    #[test]
    fn test_malformed_signature() {
        let kp = KeyPair::generate();
        let message = sha256(b"m");
        assert!(matches!(
            verify_signature(&kp.public_key, &message, &[1, 2, 3]),
            Err(KeyError::InvalidSignature)
        ));
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::from_private_key_hex(&kp1.private_key_hex()).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.identity(), kp2.identity());
    }

    #[test]
    fn test_public_key_from_hex() {
        let kp = KeyPair::generate();
        let pk = public_key_from_hex(&kp.public_key_hex()).unwrap();
        assert_eq!(identity_hash(&pk), kp.identity());
        assert!(public_key_from_hex("not-hex").is_err());
        assert!(public_key_from_hex("02abcd").is_err());
    }
}
