//! Record rows and version identifiers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{DocId, Error};

/// The value of a record: a JSON object.
pub type DocValue = serde_json::Map<String, serde_json::Value>;

/// Identifies one row of a lineage: `"{doc_id}@{seq}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId {
    doc_id: DocId,
    seq: u64,
}

impl VersionId {
    /// The first version of a lineage.
    pub fn first(doc_id: impl Into<DocId>) -> Self {
        Self {
            doc_id: doc_id.into(),
            seq: 1,
        }
    }

    /// The version that supersedes this one.
    pub fn next(&self) -> Self {
        Self {
            doc_id: self.doc_id.clone(),
            seq: self.seq + 1,
        }
    }

    /// Logical document identifier.
    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// Position in the lineage, starting at 1.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.doc_id, self.seq)
    }
}

impl FromStr for VersionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (doc_id, seq) = s
            .rsplit_once('@')
            .ok_or_else(|| Error::InvalidVersion(s.to_string()))?;

        if doc_id.is_empty() {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let seq = seq
            .parse::<u64>()
            .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        if seq == 0 {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        Ok(Self {
            doc_id: doc_id.to_string(),
            seq,
        })
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The version argument of `update` and `delete`.
///
/// Remote callers may send a single version or an array of versions. Only
/// the single form is supported; the store rejects `Many` before touching
/// any row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionSelector {
    Single(VersionId),
    Many(Vec<VersionId>),
}

impl VersionSelector {
    /// The single version, or `InvalidArgument` for arrays.
    pub fn single(self) -> crate::Result<VersionId> {
        match self {
            VersionSelector::Single(version) => Ok(version),
            VersionSelector::Many(versions) => Err(Error::VersionArrayUnsupported(versions.len())),
        }
    }
}

impl From<VersionId> for VersionSelector {
    fn from(version: VersionId) -> Self {
        VersionSelector::Single(version)
    }
}

impl From<&VersionId> for VersionSelector {
    fn from(version: &VersionId) -> Self {
        VersionSelector::Single(version.clone())
    }
}

impl From<Vec<VersionId>> for VersionSelector {
    fn from(versions: Vec<VersionId>) -> Self {
        VersionSelector::Many(versions)
    }
}

/// One row of the append-only record log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Logical document identifier, shared by every version of the lineage
    pub id: DocId,
    /// This row's version
    pub version: VersionId,
    /// Tombstone flag
    pub deleted: bool,
    /// Versions this row supersedes, oldest first
    pub links: Vec<VersionId>,
    /// Concurrent divergent versions (reserved for merge support)
    pub forks: Vec<VersionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub value: DocValue,
}

impl Record {
    /// First row of a new lineage.
    pub fn new(id: impl Into<DocId>, value: DocValue, timestamp: DateTime<Utc>) -> Self {
        let id = id.into();
        Self {
            version: VersionId::first(id.clone()),
            id,
            deleted: false,
            links: Vec::new(),
            forks: Vec::new(),
            created_at: timestamp,
            updated_at: timestamp,
            value,
        }
    }

    /// Check if record is active (not deleted).
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// The row that supersedes this one, with `patch` merged over the value.
    pub fn successor(&self, patch: DocValue, timestamp: DateTime<Utc>) -> Self {
        let mut value = self.value.clone();
        value.extend(patch);

        Self {
            value,
            ..self.superseded_by(timestamp)
        }
    }

    /// A tombstone superseding this row.
    pub fn tombstone(&self, timestamp: DateTime<Utc>) -> Self {
        Self {
            deleted: true,
            ..self.superseded_by(timestamp)
        }
    }

    fn superseded_by(&self, timestamp: DateTime<Utc>) -> Self {
        let mut links = self.links.clone();
        links.push(self.version.clone());

        Self {
            id: self.id.clone(),
            version: self.version.next(),
            deleted: self.deleted,
            links,
            forks: self.forks.clone(),
            created_at: self.created_at,
            updated_at: timestamp,
            value: self.value.clone(),
        }
    }
}
