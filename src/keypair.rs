//! Ed25519 keypairs: the fresh mint account generated for a CreateToken
//! intent and the key behind [`crate::signer::KeypairSigner`].

pub use solana_keypair::Keypair;
