//! # gateway-crypto
//!
//! Cryptographic primitives for the agent interaction gateway: adaptive
//! password/API-key hashing, authenticated encryption for stored secrets,
//! SHA-256 hashing, and the gateway's Ed25519 signing keypair.
//!
//! ## Quick Example
//!
//! ```
//! use gateway_crypto::{hash_password, verify_password};
//!
//! let hash = hash_password("s3cret").unwrap();
//! verify_password("s3cret", &hash).unwrap();
//! ```

pub mod error;
pub mod hash;
pub mod password;
pub mod secret;
pub mod signing;

pub use error::CryptoError;
pub use hash::sha256_hex;
pub use password::{generate_api_key, hash_password, verify_password};
pub use secret::SecretCipher;
pub use signing::{verify_signature, GatewayKeypair};
