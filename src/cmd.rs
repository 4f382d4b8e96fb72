use log::{debug, info, warn};

use ratification::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::cmd::store::*;

#[derive(Debug, Snafu)]
pub enum CmdError {
    #[snafu(display("Error reading data file {path}"))]
    OpeningData {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing data file {path}"))]
    WritingData {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },

    #[snafu(display("{source}"))]
    Lifecycle { source: RatifyErrors },

    #[snafu(display("Unknown status: {value} (expected pending, banned or allowed)"))]
    InvalidStatus { value: String },
    #[snafu(display("Invalid vote: {value} (expected yes or no)"))]
    InvalidVote { value: String },
    #[snafu(display("Invalid tally mode: {value} (expected majority or opposite)"))]
    InvalidTallyMode { value: String },
    #[snafu(display("Credential check failed for member {name}"))]
    Unauthorized { name: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type CmdResult<T> = Result<T, CmdError>;

pub mod store {
    use crate::cmd::*;

    pub const DEFAULT_DATA_PATH: &str = "data.json";

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct MemberRecord {
        pub name: String,
        #[serde(rename = "credentialHash")]
        pub credential_hash: String,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct CandidateRecord {
        pub id: String,
        #[serde(rename = "firstName")]
        pub first_name: String,
        #[serde(rename = "lastInitial")]
        pub last_initial: String,
        #[serde(default)]
        pub notes: String,
        #[serde(default)]
        pub votes: BTreeMap<String, bool>,
        /// Absent in documents written by older hosts; derived from `ratified`
        /// on load in that case.
        #[serde(default)]
        pub status: String,
        pub ratified: bool,
        #[serde(rename = "totalMembers")]
        pub total_members: usize,
        #[serde(rename = "createdAt")]
        pub created_at: String,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
    pub struct DataFile {
        pub members: Vec<MemberRecord>,
        pub candidates: Vec<CandidateRecord>,
    }

    pub fn to_snapshot(file: DataFile) -> CmdResult<Snapshot> {
        let members: Vec<Member> = file
            .members
            .into_iter()
            .map(|m| Member {
                name: m.name,
                credential_hash: m.credential_hash,
            })
            .collect();
        let mut candidates: Vec<Candidate> = Vec::new();
        for c in file.candidates {
            let status = if c.status.is_empty() {
                if c.ratified {
                    Status::Banned
                } else {
                    Status::Pending
                }
            } else {
                Status::parse(&c.status).context(InvalidStatusSnafu {
                    value: c.status.clone(),
                })?
            };
            candidates.push(Candidate {
                id: c.id,
                first_name: c.first_name,
                last_initial: c.last_initial,
                notes: c.notes,
                votes: VoteLedger::from_entries(c.votes),
                status,
                ratified: status == Status::Banned,
                total_members: c.total_members,
                created_at: c.created_at,
            });
        }
        Ok(Snapshot {
            members,
            candidates,
        })
    }

    pub fn candidate_record(candidate: &Candidate) -> CandidateRecord {
        CandidateRecord {
            id: candidate.id.clone(),
            first_name: candidate.first_name.clone(),
            last_initial: candidate.last_initial.clone(),
            notes: candidate.notes.clone(),
            votes: candidate.votes.entries().clone(),
            status: candidate.status.as_str().to_string(),
            ratified: candidate.ratified,
            total_members: candidate.total_members,
            created_at: candidate.created_at.clone(),
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> DataFile {
        DataFile {
            members: snapshot
                .members
                .iter()
                .map(|m| MemberRecord {
                    name: m.name.clone(),
                    credential_hash: m.credential_hash.clone(),
                })
                .collect(),
            candidates: snapshot.candidates.iter().map(candidate_record).collect(),
        }
    }

    /// File-backed document store.
    ///
    /// The whole document is reloaded before every operation and rewritten
    /// after every mutation; nothing is cached between process runs.
    pub struct Store {
        path: String,
    }

    impl Store {
        pub fn new(path: Option<String>) -> Store {
            Store {
                path: path.unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()),
            }
        }

        pub fn load(&self) -> CmdResult<Snapshot> {
            if !Path::new(&self.path).exists() {
                debug!("load: no data file at {}, starting empty", self.path);
                return Ok(Snapshot::default());
            }
            let contents = fs::read_to_string(&self.path).context(OpeningDataSnafu {
                path: self.path.clone(),
            })?;
            let file: DataFile =
                serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
            to_snapshot(file)
        }

        pub fn save(&self, snapshot: &Snapshot) -> CmdResult<()> {
            let file = from_snapshot(snapshot);
            let contents = serde_json::to_string_pretty(&file).context(ParsingJsonSnafu {})?;
            fs::write(&self.path, contents).context(WritingDataSnafu {
                path: self.path.clone(),
            })?;
            info!(
                "save: wrote {} members and {} candidates to {}",
                snapshot.members.len(),
                snapshot.candidates.len(),
                self.path
            );
            Ok(())
        }
    }

    pub fn hash_pin(pin: &str) -> String {
        sha256::digest(pin.to_string())
    }

    /// Compares a plaintext PIN against a member's stored hash. Members with
    /// no hash set can never pass.
    pub fn verify_credential(snapshot: &Snapshot, member_name: &str, pin: &str) -> bool {
        match snapshot.member(member_name) {
            Some(m) => !m.credential_hash.is_empty() && m.credential_hash == hash_pin(pin),
            None => false,
        }
    }
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn parse_vote(value: &str) -> CmdResult<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "y" | "true" => Ok(true),
        "no" | "n" | "false" => Ok(false),
        _ => InvalidVoteSnafu { value }.fail(),
    }
}

fn parse_status(value: &str) -> CmdResult<Status> {
    Status::parse(&value.to_lowercase()).context(InvalidStatusSnafu { value })
}

fn parse_mode(value: &str) -> CmdResult<TallyMode> {
    match value.to_lowercase().as_str() {
        "majority" => Ok(TallyMode::Majority),
        "opposite" => Ok(TallyMode::Opposite),
        _ => InvalidTallyModeSnafu { value }.fail(),
    }
}

/// Enforces the PIN check when the member exists. A missing member falls
/// through so the vote is reported as unknown-member rather than unauthorized.
fn check_credential(snapshot: &Snapshot, member_name: &str, pin: &str) -> CmdResult<()> {
    if snapshot.member(member_name).is_some() {
        ensure!(
            verify_credential(snapshot, member_name, pin),
            UnauthorizedSnafu { name: member_name }
        );
    }
    Ok(())
}

fn candidate_js(candidate: &Candidate) -> CmdResult<JSValue> {
    serde_json::to_value(candidate_record(candidate)).context(ParsingJsonSnafu {})
}

fn print_result(js: &JSValue) -> CmdResult<()> {
    let pretty = serde_json::to_string_pretty(js).context(ParsingJsonSnafu {})?;
    println!("{}", pretty);
    Ok(())
}

fn export(store: &Store, out: &Option<String>, reference: &Option<String>) -> CmdResult<()> {
    let snapshot = store.load()?;
    let file = from_snapshot(&snapshot);
    let pretty = serde_json::to_string_pretty(&file).context(ParsingJsonSnafu {})?;
    match out.as_deref() {
        None | Some("stdout") => println!("{}", pretty),
        Some(path) => fs::write(path, &pretty).context(WritingDataSnafu { path })?,
    }

    // The reference document, if provided for comparison
    if let Some(reference_path) = reference {
        let ref_contents = fs::read_to_string(reference_path).context(OpeningDataSnafu {
            path: reference_path.clone(),
        })?;
        let ref_js: JSValue = serde_json::from_str(&ref_contents).context(ParsingJsonSnafu {})?;
        let pretty_ref = serde_json::to_string_pretty(&ref_js).context(ParsingJsonSnafu {})?;
        if pretty_ref != pretty {
            warn!("Found differences with the reference document");
            print_diff(pretty_ref.as_str(), pretty.as_ref(), "\n");
            whatever!("Difference detected between exported document and reference document");
        }
    }
    Ok(())
}

pub fn run(args: &Args) -> CmdResult<()> {
    let store = Store::new(args.data.clone());
    match &args.command {
        Command::Members => {
            let snapshot = store.load()?;
            print_result(&json!({ "members": snapshot.member_names() }))
        }
        Command::AddMember { name, pin } => {
            let mut snapshot = store.load()?;
            let member = Member {
                name: name.clone(),
                credential_hash: hash_pin(pin),
            };
            snapshot.add_member(member).context(LifecycleSnafu {})?;
            store.save(&snapshot)?;
            print_result(&json!({
                "message": "member added",
                "members": snapshot.member_names()
            }))
        }
        Command::Candidates => {
            // Statuses are pre-resolved by the mutating operations; listing
            // reports the document as stored.
            let snapshot = store.load()?;
            let records: Vec<CandidateRecord> =
                snapshot.candidates.iter().map(candidate_record).collect();
            let js = serde_json::to_value(records).context(ParsingJsonSnafu {})?;
            print_result(&json!({ "candidates": js }))
        }
        Command::Add {
            first_name,
            last_initial,
            notes,
        } => {
            let mut snapshot = store.load()?;
            let created_at = now_iso();
            let candidate = snapshot
                .create_candidate(first_name, last_initial, notes, &created_at)
                .context(LifecycleSnafu {})?;
            let js = candidate_js(candidate)?;
            store.save(&snapshot)?;
            print_result(&json!({ "message": "candidate added", "candidate": js }))
        }
        Command::Vote {
            candidate_id,
            member,
            choice,
            pin,
        } => {
            let mut snapshot = store.load()?;
            let vote = parse_vote(choice)?;
            check_credential(&snapshot, member, pin)?;
            let candidate = snapshot
                .record_vote(candidate_id, member, vote)
                .context(LifecycleSnafu {})?;
            let js = candidate_js(candidate)?;
            store.save(&snapshot)?;
            print_result(&json!({ "message": "vote recorded", "candidate": js }))
        }
        Command::Reopen { candidate_id } => {
            let mut snapshot = store.load()?;
            let candidate = snapshot.reopen(candidate_id).context(LifecycleSnafu {})?;
            let js = candidate_js(candidate)?;
            store.save(&snapshot)?;
            print_result(&json!({ "message": "candidate reopened", "candidate": js }))
        }
        Command::SetStatus {
            candidate_id,
            status,
        } => {
            let mut snapshot = store.load()?;
            let status = parse_status(status)?;
            let candidate = snapshot
                .force_status(candidate_id, status)
                .context(LifecycleSnafu {})?;
            let js = candidate_js(candidate)?;
            store.save(&snapshot)?;
            print_result(&json!({ "message": "status forced", "candidate": js }))
        }
        Command::Tally { candidate_id, mode } => {
            let mut snapshot = store.load()?;
            let mode = parse_mode(mode)?;
            let candidate = snapshot
                .resolve_by_tally(candidate_id, mode)
                .context(LifecycleSnafu {})?;
            let js = candidate_js(candidate)?;
            store.save(&snapshot)?;
            print_result(&json!({ "message": "tally resolved", "candidate": js }))
        }
        Command::Remove { candidate_id } => {
            let mut snapshot = store.load()?;
            let removed = snapshot
                .delete_candidate(candidate_id)
                .context(LifecycleSnafu {})?;
            let js = candidate_js(&removed)?;
            store.save(&snapshot)?;
            print_result(&json!({ "message": "candidate removed", "candidate": js }))
        }
        Command::Export { out, reference } => export(&store, out, reference),
    }
}
