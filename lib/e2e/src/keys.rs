use alloy::{
    hex,
    primitives::{keccak256, Address, B512, U256},
    signers::local::PrivateKeySigner,
};

/// Signing material of one logical actor of a test run.
///
/// Generated once per actor and never persisted.
#[derive(Clone, Debug)]
pub struct Keypair {
    signer: PrivateKeySigner,
}

impl Keypair {
    /// Generate a fresh random keypair.
    #[must_use]
    pub fn generate() -> Self {
        let keypair = Self { signer: PrivateKeySigner::random() };
        tracing::debug!(public = %keypair.public_key_id(), "generated keypair");
        keypair
    }

    /// Uncompressed public key, without the `0x04` tag.
    #[must_use]
    pub fn public_key(&self) -> B512 {
        let point =
            self.signer.credential().verifying_key().to_encoded_point(false);
        B512::from_slice(&point.as_bytes()[1..])
    }

    /// Public key digest contracts receive in `*_public_key` arguments.
    ///
    /// Also the salt of every contract address derived for this keypair.
    #[must_use]
    pub fn public_key_id(&self) -> U256 {
        U256::from_be_bytes(keccak256(self.public_key()).0)
    }

    /// Hex-encoded secret key.
    #[must_use]
    pub fn secret_hex(&self) -> String {
        hex::encode(self.signer.to_bytes())
    }

    /// Address paying fees for external calls signed with this keypair.
    #[must_use]
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl From<PrivateKeySigner> for Keypair {
    fn from(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }
}
