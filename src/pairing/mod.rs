//! Pairing material: key generation (X25519 noise key, Ed25519 identity key,
//! adv secret) and the login QR payload shown to the user.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::SigningKey;
use rand::{Rng, RngCore};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::store::{Credentials, KeyPair};

/// Keys generated for a new device: Noise key, identity key, and adv secret.
#[derive(Clone, Debug)]
pub struct PairingKeys {
    pub noise_key: KeyPair,
    pub identity_key: KeyPair,
    pub adv_secret: [u8; 32],
}

/// Generate fresh pairing keys.
pub fn generate_pairing_keys() -> PairingKeys {
    let mut noise_private = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut noise_private);
    let secret = StaticSecret::from(noise_private);
    let noise_public = PublicKey::from(&secret).to_bytes();

    let identity_signing = SigningKey::generate(&mut rand::thread_rng());

    let mut adv_secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut adv_secret);

    PairingKeys {
        noise_key: KeyPair {
            public: noise_public,
            private: noise_private,
        },
        identity_key: KeyPair {
            public: identity_signing.verifying_key().to_bytes(),
            private: identity_signing.to_bytes(),
        },
        adv_secret,
    }
}

/// 14-bit registration id.
pub fn generate_registration_id() -> u16 {
    rand::thread_rng().gen::<u16>() & 0x3fff
}

/// Random reference the server would hand out per QR rotation.
pub fn generate_qr_ref() -> String {
    let mut raw = [0u8; 18];
    rand::thread_rng().fill_bytes(&mut raw);
    format!("2@{}", STANDARD.encode(raw))
}

/// Login QR payload: `ref,noisePub,identityPub,advSecret` (base64 keys).
pub fn qr_payload(qr_ref: &str, creds: &Credentials) -> String {
    [
        qr_ref.to_string(),
        STANDARD.encode(creds.noise_key.public),
        STANDARD.encode(creds.signed_identity_key.public),
        STANDARD.encode(creds.adv_secret_key),
    ]
    .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_public_matches_private() {
        let keys = generate_pairing_keys();
        let derived = PublicKey::from(&StaticSecret::from(keys.noise_key.private)).to_bytes();
        assert_eq!(derived, keys.noise_key.public);
    }

    #[test]
    fn identity_public_matches_private() {
        let keys = generate_pairing_keys();
        let signing = SigningKey::from_bytes(&keys.identity_key.private);
        assert_eq!(signing.verifying_key().to_bytes(), keys.identity_key.public);
    }

    #[test]
    fn fresh_keys_differ() {
        let a = generate_pairing_keys();
        let b = generate_pairing_keys();
        assert_ne!(a.noise_key.private, b.noise_key.private);
        assert_ne!(a.adv_secret, b.adv_secret);
    }

    #[test]
    fn registration_id_fits_14_bits() {
        for _ in 0..64 {
            assert!(generate_registration_id() < 0x4000);
        }
    }

    #[test]
    fn qr_payload_has_ref_and_three_keys() {
        let creds = Credentials::init();
        let qr_ref = generate_qr_ref();
        let payload = qr_payload(&qr_ref, &creds);
        let parts: Vec<&str> = payload.split(',').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], qr_ref);
        for part in &parts[1..] {
            assert_eq!(STANDARD.decode(part).unwrap().len(), 32);
        }
        assert_eq!(STANDARD.decode(parts[3]).unwrap(), creds.adv_secret_key);
    }
}
