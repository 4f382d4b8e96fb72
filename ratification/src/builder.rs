pub use crate::config::*;
use crate::Snapshot;

/// A builder for assembling a snapshot.
///
/// Mostly a convenience for hosts and tests that bootstrap a registry before
/// any document exists on disk.
///
/// ```
/// pub use ratification::builder::Builder;
/// # use ratification::RatifyErrors;
///
/// let mut builder = Builder::new()
///     .members(&["Alice A".to_string(), "Bob B".to_string()])?;
///
/// builder.add_member("Charlie C", "ab34ef...")?;
///
/// let snapshot = builder.build();
/// assert_eq!(snapshot.member_names().len(), 3);
/// # Ok::<(), RatifyErrors>(())
/// ```
pub struct Builder {
    pub(crate) _members: Vec<Member>,
    pub(crate) _candidates: Vec<Candidate>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _members: Vec::new(),
            _candidates: Vec::new(),
        }
    }

    /// Registers members by name, with no credential set.
    ///
    /// A member without a credential hash cannot pass verification; hosts that
    /// authenticate votes should use [`Builder::add_member`] instead.
    pub fn members(self, names: &[String]) -> Result<Builder, RatifyErrors> {
        let mut builder = self;
        for name in names {
            builder.add_member(name, "")?;
        }
        Ok(builder)
    }

    /// Registers one member with an already-hashed credential.
    pub fn add_member(&mut self, name: &str, credential_hash: &str) -> Result<(), RatifyErrors> {
        if name.trim().is_empty() {
            return Err(RatifyErrors::MissingField("name"));
        }
        if self._members.iter().any(|m| m.name == name) {
            return Err(RatifyErrors::DuplicateMember(name.to_string()));
        }
        self._members.push(Member {
            name: name.to_string(),
            credential_hash: credential_hash.to_string(),
        });
        Ok(())
    }

    pub fn build(self) -> Snapshot {
        let mut snapshot = Snapshot {
            members: self._members,
            candidates: self._candidates,
        };
        snapshot.resolve_all();
        snapshot
    }
}

impl Default for Builder {
    fn default() -> Builder {
        Builder::new()
    }
}
