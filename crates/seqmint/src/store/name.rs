use core::fmt;

/// The identifier of a durable sequence.
///
/// By convention a sequence is named after the entity kind it keys,
/// suffixed with `Id`: `clientId`, `customerId`, `productId`,
/// `documentTypeId` and so on. [`SequenceName::for_entity`] builds that
/// form; [`SequenceName::new`] accepts any identifier for callers with a
/// different convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SequenceName(String);

impl SequenceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The conventional `<entity>Id` sequence name for an entity kind.
    ///
    /// # Example
    ///
    /// ```
    /// use seqmint::SequenceName;
    ///
    /// assert_eq!(SequenceName::for_entity("client").as_str(), "clientId");
    /// ```
    pub fn for_entity(kind: &str) -> Self {
        Self(format!("{kind}Id"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SequenceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for SequenceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
