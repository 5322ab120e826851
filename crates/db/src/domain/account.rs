//! Account aggregate.

use crate::entities::account;

use super::events::DomainEvent;

/// An account loaded for mutation.
///
/// Profile fields are written back unconditionally on save; the
/// follow/block edges are only ever touched through the emitted
/// events. Operations against the account itself (self-follow,
/// self-block, …) are event-free no-ops.
#[derive(Debug, Clone)]
pub struct AccountAggregate {
    /// The underlying row.
    pub model: account::Model,
    events: Vec<DomainEvent>,
}

impl AccountAggregate {
    /// Wrap a loaded row.
    #[must_use]
    pub const fn new(model: account::Model) -> Self {
        Self {
            model,
            events: Vec::new(),
        }
    }

    /// Row id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.model.id
    }

    /// Whether this account is owned by a site (has a private key).
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        self.model.ap_private_key.is_some()
    }

    /// Update the editable profile fields.
    pub fn update_profile(
        &mut self,
        name: Option<String>,
        bio: Option<String>,
        avatar_url: Option<String>,
        banner_image_url: Option<String>,
    ) {
        self.model.name = name;
        self.model.bio = bio;
        self.model.avatar_url = avatar_url;
        self.model.banner_image_url = banner_image_url;
    }

    /// Follow another account. No-op on self.
    pub fn follow(&mut self, target_id: &str) {
        if target_id == self.model.id {
            return;
        }
        self.events.push(DomainEvent::AccountFollowed {
            follower_id: self.model.id.clone(),
            following_id: target_id.to_string(),
        });
    }

    /// Unfollow another account. No-op on self.
    pub fn unfollow(&mut self, target_id: &str) {
        if target_id == self.model.id {
            return;
        }
        self.events.push(DomainEvent::AccountUnfollowed {
            follower_id: self.model.id.clone(),
            following_id: target_id.to_string(),
        });
    }

    /// Block another account. No-op on self.
    pub fn block(&mut self, target_id: &str) {
        if target_id == self.model.id {
            return;
        }
        self.events.push(DomainEvent::AccountBlocked {
            blocker_id: self.model.id.clone(),
            blocked_id: target_id.to_string(),
        });
    }

    /// Unblock another account. No-op on self.
    pub fn unblock(&mut self, target_id: &str) {
        if target_id == self.model.id {
            return;
        }
        self.events.push(DomainEvent::AccountUnblocked {
            blocker_id: self.model.id.clone(),
            blocked_id: target_id.to_string(),
        });
    }

    /// Block a whole domain. No-op on the account's own domain.
    pub fn block_domain(&mut self, domain: &str) {
        let domain = domain.to_lowercase();
        if domain == self.model.domain {
            return;
        }
        self.events.push(DomainEvent::DomainBlocked {
            blocker_id: self.model.id.clone(),
            domain,
        });
    }

    /// Unblock a domain. No-op on the account's own domain.
    pub fn unblock_domain(&mut self, domain: &str) {
        let domain = domain.to_lowercase();
        if domain == self.model.domain {
            return;
        }
        self.events.push(DomainEvent::DomainUnblocked {
            blocker_id: self.model.id.clone(),
            domain,
        });
    }

    /// Drain the accumulated events, in emission order.
    pub fn pull_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    /// Peek at pending events without draining them.
    #[must_use]
    pub fn pending_events(&self) -> &[DomainEvent] {
        &self.events
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn test_model(id: &str, domain: &str) -> account::Model {
        account::Model {
            id: id.to_string(),
            uuid: Some("00000000-0000-0000-0000-000000000001".to_string()),
            username: "index".to_string(),
            name: None,
            bio: None,
            avatar_url: None,
            banner_image_url: None,
            url: None,
            ap_id: format!("https://{domain}/.ghost/activitypub/users/index"),
            ap_id_hash: "hash".to_string(),
            ap_inbox_url: format!("https://{domain}/.ghost/activitypub/inbox/index"),
            ap_shared_inbox_url: None,
            ap_outbox_url: None,
            ap_followers_url: None,
            ap_following_url: None,
            ap_liked_url: None,
            ap_public_key: None,
            ap_private_key: None,
            domain: domain.to_string(),
            domain_hash: "dhash".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
            deleted_at: None,
        }
    }

    #[test]
    fn test_follow_emits_event() {
        let mut account = AccountAggregate::new(test_model("a1", "blog.example"));
        account.follow("a2");

        assert_eq!(
            account.pull_events(),
            vec![DomainEvent::AccountFollowed {
                follower_id: "a1".to_string(),
                following_id: "a2".to_string(),
            }]
        );
        // Drained.
        assert!(account.pull_events().is_empty());
    }

    #[test]
    fn test_self_operations_are_no_ops() {
        let mut account = AccountAggregate::new(test_model("a1", "blog.example"));

        account.follow("a1");
        account.unfollow("a1");
        account.block("a1");
        account.unblock("a1");
        account.block_domain("blog.example");
        account.unblock_domain("blog.example");

        assert!(account.pending_events().is_empty());
    }

    #[test]
    fn test_update_profile_rewrites_fields_without_events() {
        let mut account = AccountAggregate::new(test_model("a1", "blog.example"));
        account.update_profile(
            Some("New Name".to_string()),
            Some("bio".to_string()),
            None,
            None,
        );

        assert_eq!(account.model.name.as_deref(), Some("New Name"));
        assert_eq!(account.model.bio.as_deref(), Some("bio"));
        // Profile edits flow through the row update, not events.
        assert!(account.pending_events().is_empty());
    }

    #[test]
    fn test_events_preserve_order() {
        let mut account = AccountAggregate::new(test_model("a1", "blog.example"));
        account.block("a2");
        account.follow("a3");
        account.block_domain("spam.example");

        let events = account.pull_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], DomainEvent::AccountBlocked { .. }));
        assert!(matches!(events[1], DomainEvent::AccountFollowed { .. }));
        assert!(matches!(
            events[2],
            DomainEvent::DomainBlocked { ref domain, .. } if domain == "spam.example"
        ));
    }
}
