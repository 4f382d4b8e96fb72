mod config;
pub mod builder;
pub mod manual;

use log::{debug, info};

use std::ops::AddAssign;

pub use crate::config::*;

// **** Private structures ****

/// Count of ballots cast one way in a single ledger.
#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct BallotCount(u32);

impl BallotCount {
    const EMPTY: BallotCount = BallotCount(0);
}

impl AddAssign for BallotCount {
    fn add_assign(&mut self, rhs: BallotCount) {
        self.0 += rhs.0;
    }
}

const CANDIDATE_ID_LEN: usize = 7;

/// Derives a fresh candidate id from the name fields and the creation time.
///
/// Hashing keeps ids hard to guess without pulling a randomness source into
/// the crate. The salt is bumped until the id is unique within the snapshot.
fn make_candidate_id(
    existing: &[Candidate],
    first_name: &str,
    last_initial: &str,
    created_at: &str,
) -> String {
    let mut salt: u32 = 0;
    loop {
        let digest = sha256::digest(format!(
            "{:08}{}|{}|{}",
            salt, first_name, last_initial, created_at
        ));
        let id: String = digest.chars().take(CANDIDATE_ID_LEN).collect();
        if !existing.iter().any(|c| c.id == id) {
            return id;
        }
        salt += 1;
    }
}

fn count_ballots(ledger: &VoteLedger) -> (BallotCount, BallotCount) {
    let mut yes = BallotCount::EMPTY;
    let mut no = BallotCount::EMPTY;
    for &vote in ledger.entries().values() {
        if vote {
            yes += BallotCount(1);
        } else {
            no += BallotCount(1);
        }
    }
    (yes, no)
}

/// Computes a candidate's derived status from its vote ledger and the member
/// registry.
///
/// Approval is strict: every member must have a Yes ballot, and a missing
/// ballot counts against it. Rejection additionally requires full
/// participation, so silence can never reject a candidate by default. An empty
/// registry can reach no unanimous decision at all.
pub fn resolve_status(ledger: &VoteLedger, members: &[Member]) -> Resolution {
    let n = members.len();
    let all_yes = n > 0 && members.iter().all(|m| ledger.ballot(&m.name) == Ballot::Yes);
    let all_no = n > 0
        && ledger.len() == n
        && members.iter().all(|m| ledger.ballot(&m.name) == Ballot::No);
    let status = if all_yes {
        Status::Banned
    } else if all_no {
        Status::Allowed
    } else {
        Status::Pending
    };
    Resolution {
        status,
        total_members: n,
    }
}

/// Applies a resolver pass to the candidate in place.
///
/// The write-back depends only on the ledger and the registry, so repeated
/// passes over unchanged state are idempotent. The member count is written
/// unconditionally: the cache self-heals after any membership change.
fn apply_resolution(candidate: &mut Candidate, members: &[Member]) {
    let res = resolve_status(&candidate.votes, members);
    candidate.status = res.status;
    candidate.ratified = res.status == Status::Banned;
    candidate.total_members = res.total_members;
    debug!(
        "apply_resolution: candidate {} -> {}",
        candidate.id,
        res.status.as_str()
    );
}

/// The full in-memory state: the member registry and every candidate.
///
/// All lifecycle operations live here. Each one validates before mutating and
/// leaves every derived field consistent with the current registry, so a
/// freshly deserialized snapshot can be handed in on every call and the next
/// whole-document write loses nothing.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Snapshot {
    pub members: Vec<Member>,
    pub candidates: Vec<Candidate>,
}

impl Snapshot {
    pub fn new() -> Snapshot {
        Snapshot::default()
    }

    /// Member names in registry order.
    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.name.clone()).collect()
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    fn candidate_index(&self, candidate_id: &str) -> Result<usize, RatifyErrors> {
        self.candidates
            .iter()
            .position(|c| c.id == candidate_id)
            .ok_or_else(|| RatifyErrors::CandidateNotFound(candidate_id.to_string()))
    }

    /// Re-runs the resolver on every candidate.
    pub fn resolve_all(&mut self) {
        let members = &self.members;
        for c in self.candidates.iter_mut() {
            apply_resolution(c, members);
        }
    }

    /// Adds a member and recomputes every candidate.
    ///
    /// The new member has cast no ballot anywhere, so previously unanimous
    /// outcomes revert to pending and every cached member count is refreshed.
    pub fn add_member(&mut self, member: Member) -> Result<(), RatifyErrors> {
        if member.name.trim().is_empty() {
            return Err(RatifyErrors::MissingField("name"));
        }
        if self.members.iter().any(|m| m.name == member.name) {
            return Err(RatifyErrors::DuplicateMember(member.name));
        }
        info!("add_member: {}", member.name);
        self.members.push(member);
        self.resolve_all();
        Ok(())
    }

    /// Nominates a new candidate with an empty ledger.
    ///
    /// The last initial is normalized to its first character, uppercased. The
    /// (first name, last initial) pair must be unique case-insensitively.
    /// `created_at` is supplied by the caller; this crate holds no clock.
    pub fn create_candidate(
        &mut self,
        first_name: &str,
        last_initial: &str,
        notes: &str,
        created_at: &str,
    ) -> Result<&Candidate, RatifyErrors> {
        let first_name = first_name.trim();
        if first_name.is_empty() {
            return Err(RatifyErrors::MissingField("firstName"));
        }
        let initial: String = match last_initial.trim().chars().next() {
            Some(c) => c.to_uppercase().collect(),
            None => return Err(RatifyErrors::MissingField("lastInitial")),
        };
        let duplicate = self.candidates.iter().any(|c| {
            c.first_name.to_lowercase() == first_name.to_lowercase()
                && c.last_initial.to_lowercase() == initial.to_lowercase()
        });
        if duplicate {
            return Err(RatifyErrors::DuplicateCandidate(format!(
                "{} {}",
                first_name, initial
            )));
        }
        let id = make_candidate_id(&self.candidates, first_name, &initial, created_at);
        info!("create_candidate: {} {} ({})", first_name, initial, id);
        let mut candidate = Candidate {
            id,
            first_name: first_name.to_string(),
            last_initial: initial,
            notes: notes.to_string(),
            votes: VoteLedger::default(),
            status: Status::Pending,
            ratified: false,
            total_members: self.members.len(),
            created_at: created_at.to_string(),
        };
        // The empty ledger is already pending; the extra pass is idempotent.
        apply_resolution(&mut candidate, &self.members);
        self.candidates.push(candidate);
        Ok(self.candidates.last().unwrap())
    }

    /// Records one member's vote, overwriting any prior vote by that member.
    ///
    /// This is the only path by which a ledger grows under normal operation.
    pub fn record_vote(
        &mut self,
        candidate_id: &str,
        member_name: &str,
        vote: bool,
    ) -> Result<&Candidate, RatifyErrors> {
        let idx = self.candidate_index(candidate_id)?;
        if self.member(member_name).is_none() {
            return Err(RatifyErrors::UnknownMember(member_name.to_string()));
        }
        info!(
            "record_vote: candidate {} member {} vote {}",
            candidate_id, member_name, vote
        );
        let members = &self.members;
        let candidate = &mut self.candidates[idx];
        candidate.votes.set(member_name, vote);
        apply_resolution(candidate, members);
        Ok(&self.candidates[idx])
    }

    /// Restarts deliberation from scratch: every prior vote is discarded
    /// irrecoverably and the candidate returns to pending.
    pub fn reopen(&mut self, candidate_id: &str) -> Result<&Candidate, RatifyErrors> {
        let idx = self.candidate_index(candidate_id)?;
        info!("reopen: candidate {}", candidate_id);
        let members = &self.members;
        let candidate = &mut self.candidates[idx];
        candidate.votes.clear();
        apply_resolution(candidate, members);
        Ok(&self.candidates[idx])
    }

    /// Forces a status by rewriting the ledger to a matching unanimous vote.
    ///
    /// The override is a synthetic unanimous ballot, not a resolver bypass: an
    /// independent recompute over the rewritten ledger reproduces the forced
    /// outcome. Forcing pending clears the ledger instead.
    pub fn force_status(
        &mut self,
        candidate_id: &str,
        status: Status,
    ) -> Result<&Candidate, RatifyErrors> {
        let idx = self.candidate_index(candidate_id)?;
        info!("force_status: candidate {} -> {}", candidate_id, status.as_str());
        let members = &self.members;
        let candidate = &mut self.candidates[idx];
        match status {
            Status::Banned => candidate.votes.fill(members, true),
            Status::Allowed => candidate.votes.fill(members, false),
            Status::Pending => candidate.votes.clear(),
        }
        apply_resolution(candidate, members);
        Ok(&self.candidates[idx])
    }

    /// Resolves a candidate from the votes cast so far, without waiting for
    /// unanimity and without touching the ledger.
    ///
    /// Ties, including the empty 0-0 tally, favor the yes side. The written
    /// status stands only until the next resolver pass, which any later vote
    /// or membership change triggers.
    pub fn resolve_by_tally(
        &mut self,
        candidate_id: &str,
        mode: TallyMode,
    ) -> Result<&Candidate, RatifyErrors> {
        let idx = self.candidate_index(candidate_id)?;
        let candidate = &mut self.candidates[idx];
        let (yes, no) = count_ballots(&candidate.votes);
        let majority_yes = yes >= no;
        let status = match (mode, majority_yes) {
            (TallyMode::Majority, true) => Status::Banned,
            (TallyMode::Majority, false) => Status::Allowed,
            (TallyMode::Opposite, true) => Status::Allowed,
            (TallyMode::Opposite, false) => Status::Banned,
        };
        info!(
            "resolve_by_tally: candidate {} yes {:?} no {:?} -> {}",
            candidate_id,
            yes,
            no,
            status.as_str()
        );
        candidate.status = status;
        candidate.ratified = status == Status::Banned;
        candidate.total_members = self.members.len();
        Ok(&self.candidates[idx])
    }

    /// Removes the candidate entirely. Irreversible; nothing references a
    /// candidate by id, so there is no cascade.
    pub fn delete_candidate(&mut self, candidate_id: &str) -> Result<Candidate, RatifyErrors> {
        let idx = self.candidate_index(candidate_id)?;
        info!("delete_candidate: {}", candidate_id);
        Ok(self.candidates.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREATED_AT: &str = "2026-08-06T12:00:00.000Z";

    fn member(name: &str) -> Member {
        Member {
            name: name.to_string(),
            credential_hash: String::new(),
        }
    }

    fn snapshot_with_members(names: &[&str]) -> Snapshot {
        Snapshot {
            members: names.iter().map(|n| member(n)).collect(),
            candidates: Vec::new(),
        }
    }

    fn create(snapshot: &mut Snapshot, first: &str, last: &str) -> String {
        snapshot
            .create_candidate(first, last, "", CREATED_AT)
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn unanimous_yes_bans() {
        let mut s = snapshot_with_members(&["A", "B", "C"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        s.record_vote(&id, "B", true).unwrap();
        let c = s.record_vote(&id, "C", true).unwrap();
        assert_eq!(c.status, Status::Banned);
        assert!(c.ratified);
    }

    #[test]
    fn unanimous_no_with_full_participation_allows() {
        let mut s = snapshot_with_members(&["A", "B", "C"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", false).unwrap();
        s.record_vote(&id, "B", false).unwrap();
        let c = s.record_vote(&id, "C", false).unwrap();
        assert_eq!(c.status, Status::Allowed);
        assert!(!c.ratified);
    }

    #[test]
    fn partial_yes_votes_stay_pending() {
        let mut s = snapshot_with_members(&["A", "B", "C"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        let c = s.record_vote(&id, "B", true).unwrap();
        assert_eq!(c.status, Status::Pending);
        assert!(!c.ratified);
    }

    #[test]
    fn silence_does_not_count_toward_rejection() {
        // Two No votes out of three members: not a rejection until C speaks.
        let mut s = snapshot_with_members(&["A", "B", "C"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", false).unwrap();
        let c = s.record_vote(&id, "B", false).unwrap();
        assert_eq!(c.status, Status::Pending);
        let c = s.record_vote(&id, "C", false).unwrap();
        assert_eq!(c.status, Status::Allowed);
    }

    #[test]
    fn empty_registry_stays_pending() {
        let mut ledger = VoteLedger::default();
        ledger.set("ghost", true);
        let res = resolve_status(&ledger, &[]);
        assert_eq!(res.status, Status::Pending);
        assert_eq!(res.total_members, 0);
    }

    #[test]
    fn resolver_is_idempotent() {
        let mut s = snapshot_with_members(&["A", "B"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        let first = s.candidate(&id).unwrap().clone();
        s.resolve_all();
        s.resolve_all();
        assert_eq!(s.candidate(&id).unwrap(), &first);
    }

    #[test]
    fn adding_a_member_reverts_ratified_outcomes() {
        // Registry [A, B, C]; X banned unanimously; D joins without a vote.
        let mut s = snapshot_with_members(&["A", "B", "C"]);
        let id = create(&mut s, "Jamie", "S");
        for name in ["A", "B", "C"] {
            s.record_vote(&id, name, true).unwrap();
        }
        assert_eq!(s.candidate(&id).unwrap().status, Status::Banned);
        s.add_member(member("D")).unwrap();
        let c = s.candidate(&id).unwrap();
        assert_eq!(c.status, Status::Pending);
        assert!(!c.ratified);
        assert_eq!(c.total_members, 4);
    }

    #[test]
    fn tie_favors_yes() {
        let mut s = snapshot_with_members(&["A", "B"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        s.record_vote(&id, "B", false).unwrap();
        let c = s.resolve_by_tally(&id, TallyMode::Majority).unwrap();
        assert_eq!(c.status, Status::Banned);
        assert!(c.ratified);
    }

    #[test]
    fn empty_tally_is_a_yes_tie() {
        let mut s = snapshot_with_members(&["A", "B"]);
        let id = create(&mut s, "Jamie", "S");
        let c = s.resolve_by_tally(&id, TallyMode::Majority).unwrap();
        assert_eq!(c.status, Status::Banned);
    }

    #[test]
    fn opposite_mode_inverts_the_mapping() {
        let mut s = snapshot_with_members(&["A", "B", "C"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        s.record_vote(&id, "B", true).unwrap();
        s.record_vote(&id, "C", false).unwrap();
        let c = s.resolve_by_tally(&id, TallyMode::Opposite).unwrap();
        assert_eq!(c.status, Status::Allowed);
    }

    #[test]
    fn tally_does_not_rewrite_the_ledger() {
        let mut s = snapshot_with_members(&["A", "B"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        s.resolve_by_tally(&id, TallyMode::Majority).unwrap();
        let c = s.candidate(&id).unwrap();
        assert_eq!(c.status, Status::Banned);
        assert_eq!(c.votes.len(), 1);
        // The next resolver pass overrides the tallied status.
        s.resolve_all();
        assert_eq!(s.candidate(&id).unwrap().status, Status::Pending);
    }

    #[test]
    fn forced_status_survives_a_recompute() {
        let mut s = snapshot_with_members(&["A", "B", "C"]);
        let id = create(&mut s, "Jamie", "S");
        s.force_status(&id, Status::Banned).unwrap();
        assert_eq!(s.candidate(&id).unwrap().status, Status::Banned);
        s.resolve_all();
        let c = s.candidate(&id).unwrap();
        assert_eq!(c.status, Status::Banned);
        assert_eq!(c.votes.len(), 3);
        for name in ["A", "B", "C"] {
            assert_eq!(c.votes.ballot(name), Ballot::Yes);
        }
    }

    #[test]
    fn forcing_allowed_fabricates_unanimous_rejection() {
        let mut s = snapshot_with_members(&["A", "B"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        let c = s.force_status(&id, Status::Allowed).unwrap();
        assert_eq!(c.status, Status::Allowed);
        assert_eq!(c.votes.ballot("A"), Ballot::No);
        assert_eq!(c.votes.ballot("B"), Ballot::No);
    }

    #[test]
    fn forcing_pending_clears_the_ledger() {
        let mut s = snapshot_with_members(&["A", "B"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        let c = s.force_status(&id, Status::Pending).unwrap();
        assert_eq!(c.status, Status::Pending);
        assert!(c.votes.is_empty());
    }

    #[test]
    fn duplicate_candidate_is_case_insensitive() {
        let mut s = snapshot_with_members(&["A"]);
        create(&mut s, "Jamie", "S");
        let err = s
            .create_candidate("jamie", "s", "", CREATED_AT)
            .unwrap_err();
        assert_eq!(err, RatifyErrors::DuplicateCandidate("jamie S".to_string()));
    }

    #[test]
    fn last_initial_is_normalized() {
        let mut s = snapshot_with_members(&["A"]);
        let id = create(&mut s, "Jamie", "smith");
        assert_eq!(s.candidate(&id).unwrap().last_initial, "S");
    }

    #[test]
    fn blank_names_are_rejected() {
        let mut s = snapshot_with_members(&["A"]);
        assert_eq!(
            s.create_candidate("", "S", "", CREATED_AT).unwrap_err(),
            RatifyErrors::MissingField("firstName")
        );
        assert_eq!(
            s.create_candidate("Jamie", "  ", "", CREATED_AT).unwrap_err(),
            RatifyErrors::MissingField("lastInitial")
        );
        assert!(s.candidates.is_empty());
    }

    #[test]
    fn reopen_discards_every_vote() {
        let mut s = snapshot_with_members(&["A", "B"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        s.record_vote(&id, "B", true).unwrap();
        assert_eq!(s.candidate(&id).unwrap().status, Status::Banned);
        let c = s.reopen(&id).unwrap();
        assert_eq!(c.status, Status::Pending);
        assert!(c.votes.is_empty());
        assert!(!c.ratified);
    }

    #[test]
    fn members_may_change_their_mind() {
        let mut s = snapshot_with_members(&["A"]);
        let id = create(&mut s, "Jamie", "S");
        s.record_vote(&id, "A", true).unwrap();
        assert_eq!(s.candidate(&id).unwrap().status, Status::Banned);
        let c = s.record_vote(&id, "A", false).unwrap();
        assert_eq!(c.status, Status::Allowed);
        assert_eq!(c.votes.len(), 1);
    }

    #[test]
    fn unknown_voters_are_rejected_before_any_write() {
        let mut s = snapshot_with_members(&["A"]);
        let id = create(&mut s, "Jamie", "S");
        let err = s.record_vote(&id, "Mallory", true).unwrap_err();
        assert_eq!(err, RatifyErrors::UnknownMember("Mallory".to_string()));
        assert!(s.candidate(&id).unwrap().votes.is_empty());
    }

    #[test]
    fn missing_candidates_are_reported() {
        let mut s = snapshot_with_members(&["A"]);
        assert_eq!(
            s.record_vote("nope", "A", true).unwrap_err(),
            RatifyErrors::CandidateNotFound("nope".to_string())
        );
        assert_eq!(
            s.delete_candidate("nope").unwrap_err(),
            RatifyErrors::CandidateNotFound("nope".to_string())
        );
    }

    #[test]
    fn duplicate_members_are_rejected_exactly() {
        let mut s = snapshot_with_members(&["Alice A"]);
        let err = s.add_member(member("Alice A")).unwrap_err();
        assert_eq!(err, RatifyErrors::DuplicateMember("Alice A".to_string()));
        // Member identity is case-sensitive; a different casing is a new member.
        s.add_member(member("alice a")).unwrap();
        assert_eq!(s.members.len(), 2);
    }

    #[test]
    fn delete_removes_the_candidate() {
        let mut s = snapshot_with_members(&["A"]);
        let id = create(&mut s, "Jamie", "S");
        let removed = s.delete_candidate(&id).unwrap();
        assert_eq!(removed.id, id);
        assert!(s.candidates.is_empty());
    }

    #[test]
    fn candidate_ids_are_unique_and_short() {
        let mut s = snapshot_with_members(&["A"]);
        let id1 = create(&mut s, "Jamie", "S");
        let id2 = create(&mut s, "Robin", "K");
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), CANDIDATE_ID_LEN);
        assert_eq!(id2.len(), CANDIDATE_ID_LEN);
    }
}
