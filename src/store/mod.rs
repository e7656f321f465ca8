//! Credential store.

mod file;

pub use file::{FileStore, CREDS_FILE};

use crate::types::Jid;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A 32-byte key pair, serialized as base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    #[serde(with = "b64")]
    pub public: [u8; 32],
    #[serde(with = "b64")]
    pub private: [u8; 32],
}

/// Authentication state for one linked device. Opaque to the session layer:
/// it is only loaded, handed to the client and written back unmodified.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub noise_key: KeyPair,
    pub signed_identity_key: KeyPair,
    #[serde(with = "b64")]
    pub adv_secret_key: [u8; 32],
    pub registration_id: u16,
    /// Our JID after pairing (None until the QR code is scanned).
    #[serde(default)]
    pub me: Option<Jid>,
    #[serde(default)]
    pub platform: Option<String>,
}

impl Credentials {
    /// Fresh, unpaired credentials.
    pub fn init() -> Self {
        let keys = crate::pairing::generate_pairing_keys();
        Self {
            noise_key: keys.noise_key,
            signed_identity_key: keys.identity_key,
            adv_secret_key: keys.adv_secret,
            registration_id: crate::pairing::generate_registration_id(),
            me: None,
            platform: None,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.me.is_some()
    }
}

/// Store trait: persist and load credential state for one session.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load saved credentials, if any.
    async fn load(&self) -> crate::Result<Option<Credentials>>;

    /// Save credentials (after pairing or key changes).
    async fn save(&self, creds: &Credentials) -> crate::Result<()>;
}

/// Load saved credentials or initialise new ones. Fresh credentials are not
/// written until the client reports an update.
pub async fn load_or_init(store: &dyn CredentialStore) -> crate::Result<Credentials> {
    Ok(store.load().await?.unwrap_or_else(Credentials::init))
}

mod b64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let raw = STANDARD.decode(s).map_err(de::Error::custom)?;
        raw.try_into()
            .map_err(|_| de::Error::custom("expected 32 bytes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_json_uses_base64_keys() {
        let creds = Credentials::init();
        let json = serde_json::to_value(&creds).unwrap();
        let noise_pub = json["noiseKey"]["public"].as_str().unwrap();
        assert_eq!(noise_pub.len(), 44);
        assert!(json["me"].is_null());
    }

    #[test]
    fn credentials_reject_short_keys() {
        let mut json = serde_json::to_value(Credentials::init()).unwrap();
        json["advSecretKey"] = serde_json::Value::String("AAAA".into());
        assert!(serde_json::from_value::<Credentials>(json).is_err());
    }

    #[test]
    fn fresh_credentials_are_unregistered() {
        assert!(!Credentials::init().is_registered());
    }
}
