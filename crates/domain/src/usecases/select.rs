//! Due-post selection

use time::OffsetDateTime;

use crate::model::Post;
use crate::status::PostStatus;

/// Whether a post is eligible for publishing at `now`
pub fn is_due(post: &Post, now: OffsetDateTime) -> bool {
    post.status == PostStatus::Scheduled && post.scheduled_at.is_some_and(|at| at <= now)
}

/// Keep only posts that are scheduled with a schedule time at or before `now`
pub fn select_due(posts: impl IntoIterator<Item = Post>, now: OffsetDateTime) -> Vec<Post> {
    posts.into_iter().filter(|p| is_due(p, now)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Platform, PlatformContent, PostContent, TwitterContent};
    use std::collections::BTreeSet;
    use time::macros::datetime;

    fn post(id: &str, status: PostStatus, scheduled_at: Option<OffsetDateTime>) -> Post {
        let mut post = Post::new(
            BTreeSet::from([Platform::Twitter]),
            PostContent::new().with(PlatformContent::Twitter(TwitterContent {
                text: "hello".to_string(),
                media_ids: vec![],
            })),
            datetime!(2023-12-01 00:00 UTC),
        )
        .unwrap();
        post.id = id.to_string();
        post.status = status;
        post.scheduled_at = scheduled_at;
        post
    }

    #[test]
    fn test_select_due_picks_only_scheduled_past_posts() {
        let now = datetime!(2024-01-01 00:05 UTC);
        let past = Some(datetime!(2024-01-01 00:00 UTC));
        let future = Some(datetime!(2024-01-01 01:00 UTC));

        let posts = vec![
            post("draft_past", PostStatus::Draft, past),
            post("scheduled_past", PostStatus::Scheduled, past),
            post("scheduled_future", PostStatus::Scheduled, future),
            post("scheduled_none", PostStatus::Scheduled, None),
            post("published_past", PostStatus::Published, past),
            post("scheduled_now", PostStatus::Scheduled, Some(now)),
        ];

        let due: Vec<String> = select_due(posts, now).into_iter().map(|p| p.id).collect();

        assert_eq!(due, vec!["scheduled_past", "scheduled_now"]);
    }

    #[test]
    fn test_select_due_compares_instants_across_offsets() {
        let now = datetime!(2024-01-01 00:05 UTC);
        // 01:00 at +01:00 is 00:00 UTC
        let at = Some(datetime!(2024-01-01 01:00 +01:00));
        let due = select_due(vec![post("p", PostStatus::Scheduled, at)], now);
        assert_eq!(due.len(), 1);
    }

    #[test]
    fn test_select_due_empty_input() {
        assert!(select_due(Vec::new(), datetime!(2024-01-01 00:00 UTC)).is_empty());
    }
}
