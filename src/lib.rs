//! # Chiave (Accounts & Authentication Backend)
//!
//! `chiave` is a message-bus backed authentication microservice: it
//! registers accounts, authenticates logins, activates accounts through
//! tokenized links, and manages the password-reset lifecycle.
//!
//! ## Accounts
//!
//! Accounts are identified by a unique email; the backing store's unique
//! index is the source of truth when registrations race. Passwords are
//! stored only as Argon2id digests, and an account created without a
//! password simply has no local credential until a reset sets one.
//!
//! ## Tokens
//!
//! - **Activation links** carry the account id; activation is idempotent
//!   and an unknown id is an answer, not an error.
//! - **Password reset tokens** are opaque 256-bit values with a one-hour
//!   default lifetime. At most one token is live per email — requesting a
//!   new one invalidates the previous — and a successful reset consumes it.
//! - **Session tokens** are HS256-signed claims binding account id and
//!   role, verifiable without a store round-trip.
//!
//! ## Transport
//!
//! Commands arrive on a durable RabbitMQ queue as
//! `{"pattern": {"cmd": ...}, "data": ..., "id": ...}` envelopes. Failures
//! surface as a uniform `{message, status}` error; notification delivery is
//! fire-and-forget and never fails the operation that queued it.

pub mod auth;
pub mod bus;
pub mod cli;
pub mod email;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
