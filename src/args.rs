use clap::{Parser, Subcommand};

/// This is a membership ratification ledger program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON document holding the members and the candidates.
    /// A missing file is treated as an empty document and created on the first mutation.
    /// Defaults to data.json in the current directory.
    #[clap(short, long, value_parser)]
    pub data: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Lists the member names in registry order.
    Members,

    /// Registers a new member. Every candidate is recomputed afterwards, since
    /// the new member has not voted on any of them yet.
    AddMember {
        /// The member name (unique, case-sensitive).
        #[clap(value_parser)]
        name: String,
        /// The PIN used to authenticate this member's votes. Only its hash is stored.
        #[clap(short, long, value_parser)]
        pin: String,
    },

    /// Lists every candidate with its votes and derived status.
    Candidates,

    /// Nominates a new candidate with an empty vote ledger.
    Add {
        /// The candidate's first name.
        #[clap(value_parser)]
        first_name: String,
        /// The candidate's last initial. Normalized to a single uppercase letter.
        #[clap(value_parser)]
        last_initial: String,
        /// Free-form notes attached to the candidate.
        #[clap(short, long, value_parser, default_value = "")]
        notes: String,
    },

    /// Records one member's vote on a candidate. Voting again overwrites the
    /// member's earlier vote.
    Vote {
        /// The candidate id, as reported by the candidates listing.
        #[clap(value_parser)]
        candidate_id: String,
        /// The voting member's name.
        #[clap(value_parser)]
        member: String,
        /// yes or no.
        #[clap(value_parser)]
        choice: String,
        /// The voting member's PIN.
        #[clap(short, long, value_parser)]
        pin: String,
    },

    /// Discards every vote on a candidate and returns it to pending.
    Reopen {
        #[clap(value_parser)]
        candidate_id: String,
    },

    /// Forces a status (pending, banned or allowed). The ledger is rewritten to
    /// a matching unanimous vote so that a recompute agrees with the override.
    SetStatus {
        #[clap(value_parser)]
        candidate_id: String,
        /// pending, banned or allowed.
        #[clap(value_parser)]
        status: String,
    },

    /// Resolves a candidate from the votes cast so far instead of waiting for
    /// unanimity. Ties favor the yes side.
    Tally {
        #[clap(value_parser)]
        candidate_id: String,
        /// majority or opposite.
        #[clap(short, long, value_parser, default_value = "majority")]
        mode: String,
    },

    /// Deletes a candidate entirely. Irreversible.
    Remove {
        #[clap(value_parser)]
        candidate_id: String,
    },

    /// Writes the whole document, optionally checking it against a reference.
    Export {
        /// (file path, 'stdout' or empty) Where the document will be written.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference document in JSON format. If provided, ratify will
        /// check that the exported document matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
}
