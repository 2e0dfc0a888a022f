//! The two-member access registry.

use std::sync::Mutex;

use crate::model::UserId;

/// The maximum number of members the ledger accepts.
pub const MEMBER_CAPACITY: usize = 2;

/// The result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The user was added as a new member. Carries the member count after
    /// registration.
    Registered {
        /// Number of registered members after this registration.
        members: usize,
    },
    /// The user was already a member.
    AlreadyRegistered {
        /// Number of registered members.
        members: usize,
    },
    /// The registry already holds [MEMBER_CAPACITY] members.
    Full,
}

/// Tracks which users may operate on the ledger.
///
/// Construct once at process start and share by reference. The member list
/// only ever grows, up to [MEMBER_CAPACITY]; registration is an atomic
/// check-and-append, so two concurrent callers cannot both claim the last
/// slot.
#[derive(Debug, Default)]
pub struct AccessRegistry {
    members: Mutex<Vec<UserId>>,
}

impl AccessRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to register `user_id` as a member.
    pub fn try_register(&self, user_id: UserId) -> RegistrationOutcome {
        let mut members = self.members.lock().expect("member list mutex poisoned");

        if members.contains(&user_id) {
            return RegistrationOutcome::AlreadyRegistered {
                members: members.len(),
            };
        }

        if members.len() >= MEMBER_CAPACITY {
            return RegistrationOutcome::Full;
        }

        members.push(user_id);
        tracing::info!(
            "registered user {user_id} ({}/{MEMBER_CAPACITY})",
            members.len()
        );

        RegistrationOutcome::Registered {
            members: members.len(),
        }
    }

    /// Whether `user_id` is a registered member.
    pub fn is_authorized(&self, user_id: UserId) -> bool {
        self.members
            .lock()
            .expect("member list mutex poisoned")
            .contains(&user_id)
    }

    /// The other registered member, when one exists.
    pub fn peer_of(&self, user_id: UserId) -> Option<UserId> {
        self.members
            .lock()
            .expect("member list mutex poisoned")
            .iter()
            .copied()
            .find(|&member| member != user_id)
    }
}
