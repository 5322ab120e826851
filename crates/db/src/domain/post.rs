//! Post aggregate.

use chrono::{DateTime, Utc};
use fedipress_common::{ap_id_hash, AppError, AppResult};
use serde_json::Value;

use crate::entities::post::{self, PostAudience, PostType};

use super::events::DomainEvent;

/// Reading speed used for the article reading-time heuristic.
const WORDS_PER_MINUTE: usize = 275;

/// Dirty flags driving the partial UPDATE on save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: bool,
    pub excerpt: bool,
    pub summary: bool,
    pub content: bool,
    pub url: bool,
    pub image_url: bool,
    pub audience: bool,
    pub deleted_at: bool,
}

impl PostChanges {
    /// Whether any column needs writing.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.title
            || self.excerpt
            || self.summary
            || self.content
            || self.url
            || self.image_url
            || self.audience
            || self.deleted_at
    }
}

/// A post under construction or loaded for mutation.
#[derive(Debug, Clone)]
pub struct PostAggregate {
    /// The underlying row. `model.id` is empty until the first save
    /// assigns one.
    pub model: post::Model,
    /// Accounts mentioned by this post, persisted alongside it.
    pub mentioned_account_ids: Vec<String>,
    changes: PostChanges,
    is_new: bool,
    events: Vec<DomainEvent>,
}

impl PostAggregate {
    /// Wrap a loaded row.
    #[must_use]
    pub const fn from_model(model: post::Model) -> Self {
        Self {
            model,
            mentioned_account_ids: Vec::new(),
            changes: PostChanges {
                title: false,
                excerpt: false,
                summary: false,
                content: false,
                url: false,
                image_url: false,
                audience: false,
                deleted_at: false,
            },
            is_new: false,
            events: Vec::new(),
        }
    }

    /// Create a new article.
    #[must_use]
    pub fn new_article(
        author_id: &str,
        uuid: &str,
        ap_id: &str,
        title: String,
        content: Option<String>,
        excerpt: Option<String>,
        url: Option<String>,
        image_url: Option<String>,
        published_at: DateTime<Utc>,
        metadata: Option<Value>,
    ) -> Self {
        let reading_time = reading_time_minutes(content.as_deref());
        let model = blank_model(
            author_id,
            uuid,
            ap_id,
            PostType::Article,
            PostAudience::Public,
            published_at,
        );
        let mut aggregate = Self {
            model: post::Model {
                title: Some(title),
                excerpt,
                content,
                url,
                image_url,
                reading_time_minutes: reading_time,
                metadata,
                ..model
            },
            mentioned_account_ids: Vec::new(),
            changes: PostChanges::default(),
            is_new: true,
            events: Vec::new(),
        };
        aggregate.record_created();
        aggregate
    }

    /// Create a new top-level note. Notes never carry a title.
    #[must_use]
    pub fn new_note(
        author_id: &str,
        uuid: &str,
        ap_id: &str,
        content: String,
        audience: PostAudience,
        published_at: DateTime<Utc>,
    ) -> Self {
        let model = blank_model(author_id, uuid, ap_id, PostType::Note, audience, published_at);
        let mut aggregate = Self {
            model: post::Model {
                content: Some(content),
                ..model
            },
            mentioned_account_ids: Vec::new(),
            changes: PostChanges::default(),
            is_new: true,
            events: Vec::new(),
        };
        aggregate.record_created();
        aggregate
    }

    /// Create a reply to an existing post.
    ///
    /// The thread root is inherited from the parent (or is the parent
    /// itself when the parent is top-level).
    #[must_use]
    pub fn new_reply(
        author_id: &str,
        uuid: &str,
        ap_id: &str,
        content: String,
        parent: &post::Model,
        audience: PostAudience,
        published_at: DateTime<Utc>,
    ) -> Self {
        let thread_root = parent
            .thread_root
            .clone()
            .unwrap_or_else(|| parent.id.clone());
        let model = blank_model(author_id, uuid, ap_id, PostType::Note, audience, published_at);
        let mut aggregate = Self {
            model: post::Model {
                content: Some(content),
                in_reply_to: Some(parent.id.clone()),
                thread_root: Some(thread_root),
                ..model
            },
            mentioned_account_ids: Vec::new(),
            changes: PostChanges::default(),
            is_new: true,
            events: Vec::new(),
        };
        aggregate.record_created();
        aggregate
    }

    fn record_created(&mut self) {
        self.events.push(DomainEvent::PostCreated {
            post_id: String::new(), // patched by the repository at insert
            author_id: self.model.author_id.clone(),
            post_type: self.model.post_type,
            audience: self.model.audience,
            in_reply_to: self.model.in_reply_to.clone(),
            mentioned_account_ids: self.mentioned_account_ids.clone(),
        });
    }

    /// Whether this aggregate has not been persisted yet.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether this post has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.model.deleted_at.is_some()
    }

    /// Dirty flags accumulated since load.
    #[must_use]
    pub const fn changes(&self) -> PostChanges {
        self.changes
    }

    /// Record mentioned accounts (persisted with the post).
    pub fn set_mentions(&mut self, account_ids: Vec<String>) {
        self.mentioned_account_ids = account_ids;
        if let Some(DomainEvent::PostCreated {
            mentioned_account_ids,
            ..
        }) = self.events.last_mut()
        {
            mentioned_account_ids.clone_from(&self.mentioned_account_ids);
        }
    }

    /// Update the article content fields (webhook edit path).
    pub fn update_content(
        &mut self,
        title: Option<String>,
        content: Option<String>,
        excerpt: Option<String>,
        url: Option<String>,
        image_url: Option<String>,
    ) -> AppResult<()> {
        self.ensure_mutable()?;
        if self.model.post_type == PostType::Article {
            self.model.title = title;
            self.changes.title = true;
        }
        self.model.content = content;
        self.changes.content = true;
        self.model.excerpt = excerpt;
        self.changes.excerpt = true;
        self.model.url = url;
        self.changes.url = true;
        self.model.image_url = image_url;
        self.changes.image_url = true;
        Ok(())
    }

    /// Soft-delete this post.
    ///
    /// Rejects with `not-author` when attempted by anyone but the
    /// author; repeated deletes are rejected like any other mutation.
    pub fn delete(&mut self, requested_by: &str) -> AppResult<()> {
        if requested_by != self.model.author_id {
            return Err(AppError::NotAuthor);
        }
        if self.is_deleted() {
            return Err(AppError::Conflict("post is deleted".to_string()));
        }
        self.model.deleted_at = Some(Utc::now().into());
        self.changes.deleted_at = true;
        self.events.push(DomainEvent::PostDeleted {
            post_id: self.model.id.clone(),
            author_id: self.model.author_id.clone(),
        });
        Ok(())
    }

    fn ensure_mutable(&self) -> AppResult<()> {
        if self.is_deleted() {
            return Err(AppError::Conflict("post is deleted".to_string()));
        }
        Ok(())
    }

    /// Drain the accumulated events, in emission order.
    pub fn pull_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    /// Mark the aggregate persisted with its assigned id, patching the
    /// pending created event.
    pub fn mark_persisted(&mut self, id: String) {
        self.model.id.clone_from(&id);
        if self.model.thread_root.is_none() && self.model.in_reply_to.is_none() {
            self.model.thread_root = Some(id.clone());
        }
        self.is_new = false;
        for event in &mut self.events {
            if let DomainEvent::PostCreated { post_id, .. } = event {
                post_id.clone_from(&id);
            }
        }
    }
}

fn blank_model(
    author_id: &str,
    uuid: &str,
    ap_id: &str,
    post_type: PostType,
    audience: PostAudience,
    published_at: DateTime<Utc>,
) -> post::Model {
    post::Model {
        id: String::new(),
        uuid: uuid.to_string(),
        post_type,
        audience,
        author_id: author_id.to_string(),
        title: None,
        excerpt: None,
        summary: None,
        content: None,
        url: None,
        image_url: None,
        published_at: published_at.into(),
        in_reply_to: None,
        thread_root: None,
        like_count: 0,
        repost_count: 0,
        reply_count: 0,
        reading_time_minutes: 0,
        attachments: None,
        ap_id: ap_id.to_string(),
        ap_id_hash: ap_id_hash(ap_id),
        metadata: None,
        deleted_at: None,
    }
}

/// Estimate reading time from HTML content.
#[must_use]
pub fn reading_time_minutes(content: Option<&str>) -> i32 {
    let Some(content) = content else { return 0 };
    let text = strip_tags(content);
    let words = text.split_whitespace().count();
    i32::try_from(words.div_ceil(WORDS_PER_MINUTE)).unwrap_or(i32::MAX)
}

/// Remove HTML tags, keeping text content.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn article() -> PostAggregate {
        PostAggregate::new_article(
            "a1",
            "11111111-1111-1111-1111-111111111111",
            "https://blog.example/.ghost/activitypub/article/11111111-1111-1111-1111-111111111111",
            "Hello".to_string(),
            Some("<p>words here</p>".to_string()),
            None,
            Some("https://blog.example/hello/".to_string()),
            None,
            Utc::now(),
            None,
        )
    }

    #[test]
    fn test_new_note_has_no_title() {
        let note = PostAggregate::new_note(
            "a1",
            "22222222-2222-2222-2222-222222222222",
            "https://blog.example/.ghost/activitypub/note/2222",
            "hi".to_string(),
            PostAudience::Public,
            Utc::now(),
        );
        assert!(note.model.title.is_none());
        assert_eq!(note.model.post_type, PostType::Note);
    }

    #[test]
    fn test_thread_root_self_for_top_level() {
        let mut post = article();
        post.mark_persisted("p1".to_string());
        assert_eq!(post.model.thread_root.as_deref(), Some("p1"));
    }

    #[test]
    fn test_thread_root_inherited_for_replies() {
        let mut root = article();
        root.mark_persisted("p1".to_string());

        let mut reply = PostAggregate::new_reply(
            "a2",
            "33333333-3333-3333-3333-333333333333",
            "https://other.example/.ghost/activitypub/note/3333",
            "re: hello".to_string(),
            &root.model,
            PostAudience::Public,
            Utc::now(),
        );
        reply.mark_persisted("p2".to_string());
        assert_eq!(reply.model.in_reply_to.as_deref(), Some("p1"));
        assert_eq!(reply.model.thread_root.as_deref(), Some("p1"));

        let mut nested = PostAggregate::new_reply(
            "a3",
            "44444444-4444-4444-4444-444444444444",
            "https://third.example/.ghost/activitypub/note/4444",
            "re: re: hello".to_string(),
            &reply.model,
            PostAudience::Public,
            Utc::now(),
        );
        nested.mark_persisted("p3".to_string());
        assert_eq!(nested.model.in_reply_to.as_deref(), Some("p2"));
        assert_eq!(nested.model.thread_root.as_deref(), Some("p1"));
    }

    #[test]
    fn test_created_event_patched_with_id() {
        let mut post = article();
        post.mark_persisted("p9".to_string());
        let events = post.pull_events();
        assert!(
            matches!(&events[0], DomainEvent::PostCreated { post_id, .. } if post_id == "p9")
        );
    }

    #[test]
    fn test_delete_requires_author() {
        let mut post = article();
        post.mark_persisted("p1".to_string());

        assert!(matches!(post.delete("someone-else"), Err(AppError::NotAuthor)));
        assert!(post.delete("a1").is_ok());
        assert!(post.is_deleted());
    }

    #[test]
    fn test_deleted_post_rejects_mutation() {
        let mut post = article();
        post.mark_persisted("p1".to_string());
        post.delete("a1").unwrap();
        // A fresh load of the deleted row must reject edits too.
        let mut reloaded = PostAggregate::from_model(post.model.clone());
        assert!(reloaded
            .update_content(Some("t".into()), None, None, None, None)
            .is_err());
    }

    #[test]
    fn test_reading_time() {
        let words = (0..550).map(|_| "word").collect::<Vec<_>>().join(" ");
        assert_eq!(reading_time_minutes(Some(&words)), 2);
        assert_eq!(reading_time_minutes(Some("short")), 1);
        assert_eq!(reading_time_minutes(None), 0);
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<p>a<b>b</b></p>").split_whitespace().count(), 2);
    }
}
