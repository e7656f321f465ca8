use std::fmt;
use std::str::FromStr;

/// Server for regular user accounts.
pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";

/// JID represents a WhatsApp user/entity ID (`user@server`, or `user:device@server`
/// for a specific linked device).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Jid {
    pub user: String,
    pub device: u16,
    pub server: String,
}

impl Jid {
    /// New regular JID (user@server).
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            device: 0,
            server: server.into(),
        }
    }

    /// Resolve an HTTP `to` parameter: a full JID, or a phone number that is
    /// addressed on the default user server.
    pub fn from_recipient(recipient: &str) -> Result<Self, JidParseError> {
        let trimmed = recipient.trim();
        if trimmed.contains('@') {
            return trimmed.parse();
        }
        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(JidParseError);
        }
        Ok(Self::new(digits, DEFAULT_USER_SERVER))
    }

    /// JID without the device part.
    pub fn to_non_device(&self) -> Self {
        Self::new(self.user.clone(), self.server.clone())
    }
}

impl FromStr for Jid {
    type Err = JidParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (user, server) = s.split_once('@').ok_or(JidParseError)?;
        if server.is_empty() || server.contains('@') {
            return Err(JidParseError);
        }
        match user.split_once(':') {
            Some((u, device)) => Ok(Self {
                user: u.to_string(),
                device: device.parse().map_err(|_| JidParseError)?,
                server: server.to_string(),
            }),
            None => Ok(Self::new(user, server)),
        }
    }
}

#[derive(Debug)]
pub struct JidParseError;

impl std::fmt::Display for JidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid JID format")
    }
}

impl std::error::Error for JidParseError {}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.device > 0 {
            write!(f, "{}:{}@{}", self.user, self.device, self.server)
        } else {
            write!(f, "{}@{}", self.user, self.server)
        }
    }
}

impl serde::Serialize for Jid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Jid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Jid::from_str(&s).map_err(serde::de::Error::custom)
    }
}
