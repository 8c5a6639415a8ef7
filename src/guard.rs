//! Ownership guard: decides whether an identity may perform an operation on
//! a review or comment. Pure functions, no I/O.
//!
//! Checks happen in two stages. [`admit`] runs before the target is loaded and
//! only looks at the identity; [`authorize`] runs once the target is loaded and
//! before anything is written.

use std::fmt;

use crate::config::ReadPolicy;
use crate::db::models::UserId;
use crate::extractors::CurrentUser;

/// The acting identity of a request, after session lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Anonymous,
    User(CurrentUser),
}

impl Identity {
    pub fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Anonymous => None,
            Self::User(user) => Some(user),
        }
    }

    pub fn require(&self) -> Result<&CurrentUser, Denied> {
        self.user().ok_or(Denied::AuthenticationRequired)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::Update | Self::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denied {
    /// No identity on a gated operation.
    AuthenticationRequired,
    /// Identity present but it is not the resource's author.
    NotOwner,
}

impl fmt::Display for Denied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationRequired => write!(f, "authentication required"),
            Self::NotOwner => write!(f, "not the owner"),
        }
    }
}

impl std::error::Error for Denied {}

/// Resources with a single, immutable author.
pub trait Owned {
    fn owner(&self) -> UserId;
}

/// Identity-only check, before the target is fetched.
pub fn admit(identity: &Identity, op: Operation, reads: ReadPolicy) -> Result<(), Denied> {
    match op {
        Operation::Read => match (reads, identity) {
            (ReadPolicy::Authenticated, Identity::Anonymous) => Err(Denied::AuthenticationRequired),
            _ => Ok(()),
        },
        Operation::Create | Operation::Update | Operation::Delete => {
            identity.require().map(|_| ())
        }
    }
}

/// Full check against a loaded target. Reads and creates are never
/// ownership-gated; updates and deletes require `identity == target.owner()`.
pub fn authorize<R: Owned + ?Sized>(
    identity: &Identity,
    op: Operation,
    target: &R,
    reads: ReadPolicy,
) -> Result<(), Denied> {
    admit(identity, op, reads)?;

    if op.is_mutation() {
        let actor = identity.require()?;
        if actor.id != target.owner() {
            return Err(Denied::NotOwner);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note(UserId);

    impl Owned for Note {
        fn owner(&self) -> UserId {
            self.0
        }
    }

    fn user(id: i64) -> Identity {
        Identity::User(CurrentUser {
            id: UserId(id),
            username: format!("user{}", id),
        })
    }

    const ALL_OPS: [Operation; 4] = [
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];

    #[test]
    fn author_may_do_everything() {
        let note = Note(UserId(1));
        for op in ALL_OPS {
            assert_eq!(authorize(&user(1), op, &note, ReadPolicy::Public), Ok(()));
        }
    }

    #[test]
    fn other_user_may_read_and_create_but_not_mutate() {
        let note = Note(UserId(1));
        let bob = user(2);
        assert_eq!(authorize(&bob, Operation::Read, &note, ReadPolicy::Public), Ok(()));
        assert_eq!(authorize(&bob, Operation::Create, &note, ReadPolicy::Public), Ok(()));
        assert_eq!(
            authorize(&bob, Operation::Update, &note, ReadPolicy::Public),
            Err(Denied::NotOwner)
        );
        assert_eq!(
            authorize(&bob, Operation::Delete, &note, ReadPolicy::Public),
            Err(Denied::NotOwner)
        );
    }

    #[test]
    fn anonymous_mutation_is_authentication_not_ownership() {
        let note = Note(UserId(1));
        for op in [Operation::Create, Operation::Update, Operation::Delete] {
            assert_eq!(
                authorize(&Identity::Anonymous, op, &note, ReadPolicy::Public),
                Err(Denied::AuthenticationRequired),
                "op {}",
                op
            );
        }
    }

    #[test]
    fn read_policy_controls_anonymous_reads() {
        let note = Note(UserId(1));
        assert_eq!(
            authorize(&Identity::Anonymous, Operation::Read, &note, ReadPolicy::Public),
            Ok(())
        );
        assert_eq!(
            authorize(&Identity::Anonymous, Operation::Read, &note, ReadPolicy::Authenticated),
            Err(Denied::AuthenticationRequired)
        );
        assert_eq!(
            authorize(&user(5), Operation::Read, &note, ReadPolicy::Authenticated),
            Ok(())
        );
    }

    #[test]
    fn admit_only_checks_identity() {
        assert_eq!(admit(&user(9), Operation::Delete, ReadPolicy::Public), Ok(()));
        assert_eq!(
            admit(&Identity::Anonymous, Operation::Update, ReadPolicy::Public),
            Err(Denied::AuthenticationRequired)
        );
    }

    #[test]
    fn denial_reasons_are_distinct() {
        assert_eq!(Denied::AuthenticationRequired.to_string(), "authentication required");
        assert_eq!(Denied::NotOwner.to_string(), "not the owner");
    }
}
