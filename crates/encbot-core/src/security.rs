use crate::domain::UserId;

// ============== Authorization ==============

/// The single access rule of the bot: only the configured administrator may
/// broadcast. No admin configured means nobody may.
pub fn is_admin(user_id: Option<UserId>, admin_id: Option<UserId>) -> bool {
    match (user_id, admin_id) {
        (Some(user), Some(admin)) => user == admin,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_configured_admin_passes() {
        assert!(is_admin(Some(UserId(1)), Some(UserId(1))));
        assert!(!is_admin(Some(UserId(2)), Some(UserId(1))));
        assert!(!is_admin(None, Some(UserId(1))));
        assert!(!is_admin(Some(UserId(1)), None));
    }
}
