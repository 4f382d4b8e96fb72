// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// A registered voter.
///
/// The name is the identity (unique, case-sensitive). The credential hash is
/// opaque to this crate: verification against a plaintext secret is the
/// caller's concern.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Member {
    pub name: String,
    pub credential_hash: String,
}

/// The recorded position of one member on one candidate.
///
/// The absence of a ballot is distinct from a No: a single missing ballot is
/// enough to break unanimous approval, while unanimous rejection additionally
/// requires every member to have actually cast a No.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Ballot {
    Yes,
    No,
    NotVoted,
}

/// Partial mapping from member name to a yes/no vote for one candidate.
///
/// Entries for names outside the member registry are never created; the
/// lifecycle operations validate the member before writing.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct VoteLedger {
    entries: BTreeMap<String, bool>,
}

impl VoteLedger {
    pub fn from_entries(entries: BTreeMap<String, bool>) -> VoteLedger {
        VoteLedger { entries }
    }

    pub fn entries(&self) -> &BTreeMap<String, bool> {
        &self.entries
    }

    /// The ballot cast by the given member, or `NotVoted`.
    pub fn ballot(&self, member_name: &str) -> Ballot {
        match self.entries.get(member_name) {
            Some(true) => Ballot::Yes,
            Some(false) => Ballot::No,
            None => Ballot::NotVoted,
        }
    }

    /// Records a vote, overwriting any prior vote by the same member.
    pub fn set(&mut self, member_name: &str, vote: bool) {
        self.entries.insert(member_name.to_string(), vote);
    }

    /// Discards every recorded vote.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Overwrites the ledger with the same vote from every listed member.
    pub fn fill(&mut self, members: &[Member], vote: bool) {
        self.entries = members.iter().map(|m| (m.name.clone(), vote)).collect();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Derived state of a candidate.
///
/// `Banned` is the ratified outcome (unanimous yes). `Allowed` is the cleared
/// outcome (unanimous no with full participation). Anything else is `Pending`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Status {
    Pending,
    Banned,
    Allowed,
}

impl Status {
    /// The wire form used in the persisted document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Banned => "banned",
            Status::Allowed => "allowed",
        }
    }

    /// Inverse of [`Status::as_str`]. Unknown values yield `None`; callers map
    /// that to their invalid-status failure.
    pub fn parse(value: &str) -> Option<Status> {
        match value {
            "pending" => Some(Status::Pending),
            "banned" => Some(Status::Banned),
            "allowed" => Some(Status::Allowed),
            _ => None,
        }
    }
}

/// An entity nominated for ratification.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: String,
    pub first_name: String,
    /// Single uppercase letter, normalized at creation.
    pub last_initial: String,
    pub notes: String,
    pub votes: VoteLedger,
    pub status: Status,
    /// Kept in sync as `status == Banned` for legacy consumers.
    pub ratified: bool,
    /// Cache of the registry size at last recompute, not a source of truth.
    pub total_members: usize,
    pub created_at: String,
}

// ******** Output data structures *********

/// Outcome of one resolver pass over a ledger and a member registry.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Resolution {
    pub status: Status,
    pub total_members: usize,
}

// ********* Configuration **********

/// How a direct tally resolution maps vote counts to a status.
///
/// Ties, including the empty 0-0 tally, always favor the yes side.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TallyMode {
    /// Majority-yes bans, majority-no allows.
    Majority,
    /// The inverted mapping: majority-yes allows, majority-no bans.
    Opposite,
}

/// Errors surfaced by the lifecycle operations.
///
/// All are caller mistakes or state conflicts, detected before any mutation is
/// applied, and non-retryable.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RatifyErrors {
    /// A required field was empty or missing.
    MissingField(&'static str),
    /// No candidate with this id.
    CandidateNotFound(String),
    /// The named voter is not in the member registry.
    UnknownMember(String),
    /// Another candidate already holds this (first name, last initial) pair.
    DuplicateCandidate(String),
    /// A member with this exact name already exists.
    DuplicateMember(String),
}

impl Error for RatifyErrors {}

impl Display for RatifyErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RatifyErrors::MissingField(field) => write!(f, "required field is empty: {}", field),
            RatifyErrors::CandidateNotFound(id) => write!(f, "candidate not found: {}", id),
            RatifyErrors::UnknownMember(name) => write!(f, "member not recognized: {}", name),
            RatifyErrors::DuplicateCandidate(name) => {
                write!(f, "candidate name already exists: {}", name)
            }
            RatifyErrors::DuplicateMember(name) => {
                write!(f, "member already exists: {}", name)
            }
        }
    }
}
