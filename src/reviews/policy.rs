//! Authorization policy.
//!
//! Pure predicates over (actor id, privileged flag, owner id); no stored
//! state. The privileged flag is the single elevated-rights capability.

/// Owner or privileged actors may delete a review.
pub fn can_delete(actor_id: i32, privileged: bool, owner_id: i32) -> bool {
    actor_id == owner_id || privileged
}

/// Owner or privileged actors may accept/reject join requests.
pub fn can_adjudicate(actor_id: i32, privileged: bool, owner_id: i32) -> bool {
    actor_id == owner_id || privileged
}

/// Privileged actors skip the request workflow and join directly.
pub fn can_join_directly(privileged: bool) -> bool {
    privileged
}

/// Comment rights: the owner, members of the review's group, and
/// privileged actors.
pub fn can_comment(actor_id: i32, privileged: bool, owner_id: i32, is_member: bool) -> bool {
    actor_id == owner_id || privileged || is_member
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: i32 = 1;
    const OTHER: i32 = 2;

    #[test]
    fn owner_can_delete_and_adjudicate() {
        assert!(can_delete(OWNER, false, OWNER));
        assert!(can_adjudicate(OWNER, false, OWNER));
    }

    #[test]
    fn privileged_can_delete_and_adjudicate_any_review() {
        assert!(can_delete(OTHER, true, OWNER));
        assert!(can_adjudicate(OTHER, true, OWNER));
    }

    #[test]
    fn plain_non_owner_is_denied() {
        assert!(!can_delete(OTHER, false, OWNER));
        assert!(!can_adjudicate(OTHER, false, OWNER));
        assert!(!can_join_directly(false));
    }

    #[test]
    fn only_privilege_grants_direct_join() {
        assert!(can_join_directly(true));
        assert!(!can_join_directly(false));
    }

    #[test]
    fn comment_rights() {
        assert!(can_comment(OWNER, false, OWNER, false));
        assert!(can_comment(OTHER, false, OWNER, true));
        assert!(can_comment(OTHER, true, OWNER, false));
        assert!(!can_comment(OTHER, false, OWNER, false));
    }
}
