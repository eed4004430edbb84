use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Opaque, stable user identifier.
///
/// Only ever compared for equality and used as a map key; the inner value
/// carries no meaning to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserSecret(String);

impl UserSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserSecret {
    fn from(secret: String) -> Self {
        Self(secret)
    }
}

impl From<&str> for UserSecret {
    fn from(secret: &str) -> Self {
        Self(secret.to_string())
    }
}
