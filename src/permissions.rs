//! Access Control Engine.
//!
//! A pure decision layer: it never touches storage and is a function only of
//! the (optional) identity, the kind of action, and an optional owner id for
//! object-level checks. Every mutating handler routes its decision through
//! [`authorize`]; read paths short-circuit to Allow for everyone, anonymous
//! included.

use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::Role;

/// Capabilities
///
/// The authorization-relevant facts about an identity, computed once per
/// request. Capabilities are OR-combined flags, not a hierarchy:
/// - `is_admin` has two independent sources — role == admin, or the staff
///   elevation flag. Both paths are deliberate and both are kept.
/// - `is_moderator` is a distinct capability; it neither implies nor is
///   implied by `is_admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub is_admin: bool,
    pub is_moderator: bool,
}

impl Capabilities {
    pub fn of(user: &AuthUser) -> Self {
        Self {
            is_admin: user.role == Role::Admin || user.is_staff,
            is_moderator: user.role == Role::Moderator,
        }
    }
}

/// Action
///
/// The route-level axis of the decision: what kind of operation the request
/// represents. Read variants exist so callers can express "safe method" and
/// get the unconditional Allow the combinator semantics require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Any GET on catalog or content. Open to everyone.
    Read,
    /// Create/update/delete on categories, genres or titles. Admin only.
    CatalogWrite,
    /// User administration (list/create/update/delete accounts). Admin only.
    UserAdmin,
    /// Posting a new review or comment. Any authenticated identity.
    ContentCreate,
    /// Editing or deleting an existing review or comment. Author, moderator
    /// or admin; requires a target owner.
    ContentModify,
}

/// Decision
///
/// Allow/Deny outcome. Anonymous identity is a valid input, not an error;
/// it simply Denies every unsafe action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allow
    }
}

/// The single decision function.
///
/// Combinator semantics ("AuthenticatedOrReadOnly AND
/// AdminOrModeratorOrAuthorOrReadOnly"): safe actions short-circuit to Allow;
/// unsafe actions require an authenticated identity AND one of the
/// capability alternatives for that action kind.
pub fn authorize(identity: Option<&AuthUser>, action: Action, owner: Option<Uuid>) -> Decision {
    if action == Action::Read {
        return Decision::Allow;
    }

    // Every unsafe action requires an authenticated identity.
    let Some(user) = identity else {
        return Decision::Deny;
    };
    let caps = Capabilities::of(user);

    let allowed = match action {
        Action::Read => true,
        Action::CatalogWrite | Action::UserAdmin => caps.is_admin,
        Action::ContentCreate => true,
        Action::ContentModify => {
            // Author-match OR moderator OR admin, evaluated as independent
            // alternatives. A missing owner can never match the actor.
            caps.is_moderator || caps.is_admin || owner == Some(user.id)
        }
    };

    if allowed { Decision::Allow } else { Decision::Deny }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role, is_staff: bool) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "someone".into(),
            role,
            is_staff,
        }
    }

    #[test]
    fn reads_allow_everyone_including_anonymous() {
        assert_eq!(authorize(None, Action::Read, None), Decision::Allow);
        let user = identity(Role::User, false);
        assert_eq!(authorize(Some(&user), Action::Read, None), Decision::Allow);
    }

    #[test]
    fn anonymous_denied_on_every_unsafe_action() {
        for action in [
            Action::CatalogWrite,
            Action::UserAdmin,
            Action::ContentCreate,
            Action::ContentModify,
        ] {
            assert_eq!(authorize(None, action, None), Decision::Deny);
        }
    }

    #[test]
    fn catalog_write_is_admin_only() {
        let plain = identity(Role::User, false);
        let moderator = identity(Role::Moderator, false);
        let admin = identity(Role::Admin, false);
        assert_eq!(
            authorize(Some(&plain), Action::CatalogWrite, None),
            Decision::Deny
        );
        assert_eq!(
            authorize(Some(&moderator), Action::CatalogWrite, None),
            Decision::Deny
        );
        assert_eq!(
            authorize(Some(&admin), Action::CatalogWrite, None),
            Decision::Allow
        );
    }

    #[test]
    fn staff_flag_grants_admin_capability_independently_of_role() {
        let staff = identity(Role::User, true);
        assert!(Capabilities::of(&staff).is_admin);
        assert_eq!(
            authorize(Some(&staff), Action::UserAdmin, None),
            Decision::Allow
        );
    }

    #[test]
    fn moderator_is_not_a_subset_or_superset_of_admin() {
        let moderator = identity(Role::Moderator, false);
        let caps = Capabilities::of(&moderator);
        assert!(caps.is_moderator);
        assert!(!caps.is_admin);

        let admin = identity(Role::Admin, false);
        let caps = Capabilities::of(&admin);
        assert!(caps.is_admin);
        assert!(!caps.is_moderator);
    }

    #[test]
    fn any_authenticated_identity_may_create_content() {
        let plain = identity(Role::User, false);
        assert_eq!(
            authorize(Some(&plain), Action::ContentCreate, None),
            Decision::Allow
        );
    }

    #[test]
    fn content_modify_requires_author_moderator_or_admin() {
        let author = identity(Role::User, false);
        let stranger = identity(Role::User, false);
        let moderator = identity(Role::Moderator, false);
        let admin = identity(Role::Admin, false);
        let owner = Some(author.id);

        assert_eq!(
            authorize(Some(&author), Action::ContentModify, owner),
            Decision::Allow
        );
        assert_eq!(
            authorize(Some(&stranger), Action::ContentModify, owner),
            Decision::Deny
        );
        assert_eq!(
            authorize(Some(&moderator), Action::ContentModify, owner),
            Decision::Allow
        );
        assert_eq!(
            authorize(Some(&admin), Action::ContentModify, owner),
            Decision::Allow
        );
    }

    #[test]
    fn missing_owner_never_matches_the_actor() {
        let user = identity(Role::User, false);
        assert_eq!(
            authorize(Some(&user), Action::ContentModify, None),
            Decision::Deny
        );
    }
}
