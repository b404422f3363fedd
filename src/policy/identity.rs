//! Identity secrets and how a request is mapped to one
//!
//! Secrets are opaque upstream tokens. They are zeroized on drop and their
//! `Debug` output is redacted so they never reach the logs.

use hyper::header::HeaderName;
use std::collections::HashMap;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::ConfigError;

/// Default header carrying the caller-asserted subject in multi-user mode.
pub const DEFAULT_SUBJECT_HEADER: &str = "x-token-subject";

/// Per-user secret token presented to the secondary service.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct IdentitySecret(String);

impl IdentitySecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw token. Only the exchanger should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for IdentitySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentitySecret([REDACTED])")
    }
}

/// User identifier -> secret. Populated at configuration time, read-only after.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    entries: HashMap<String, IdentitySecret>,
}

impl IdentityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting duplicate user names.
    pub fn try_from_entries<I>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, IdentitySecret)>,
    {
        let mut table = Self::new();
        for (user, secret) in entries {
            table.insert(user, secret)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, user: String, secret: IdentitySecret) -> Result<(), ConfigError> {
        if self.entries.contains_key(&user) {
            return Err(ConfigError::DuplicateUser(user));
        }
        self.entries.insert(user, secret);
        Ok(())
    }

    pub fn lookup(&self, user: &str) -> Option<&IdentitySecret> {
        self.entries.get(user)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How the gate finds the secret for a request.
#[derive(Debug, Clone)]
pub enum IdentityResolution {
    /// Single-tenant: every approved request uses the same secret.
    Fixed(IdentitySecret),
    /// Multi-tenant: the subject header selects an entry of the table.
    Table {
        table: IdentityTable,
        subject_header: HeaderName,
    },
}

impl IdentityResolution {
    /// Multi-tenant resolution using the default subject header.
    pub fn table(table: IdentityTable) -> Self {
        Self::Table {
            table,
            subject_header: HeaderName::from_static(DEFAULT_SUBJECT_HEADER),
        }
    }

    /// Secret for the asserted subject, if any.
    ///
    /// A missing subject never resolves in table mode. An empty fixed secret
    /// never resolves either.
    pub fn resolve(&self, subject: Option<&str>) -> Option<&IdentitySecret> {
        match self {
            Self::Fixed(secret) if !secret.is_empty() => Some(secret),
            Self::Fixed(_) => None,
            Self::Table { table, .. } => subject.and_then(|s| table.lookup(s)),
        }
    }

    /// Header the subject is read from, for table mode.
    pub fn subject_header(&self) -> Option<&HeaderName> {
        match self {
            Self::Fixed(_) => None,
            Self::Table { subject_header, .. } => Some(subject_header),
        }
    }

    pub fn identity_count(&self) -> usize {
        match self {
            Self::Fixed(_) => 1,
            Self::Table { table, .. } => table.len(),
        }
    }
}
