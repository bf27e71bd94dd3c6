//! Merge rules of the client-held feed aggregates: idempotent page
//! merging, live push routing, like deltas, and stale-fetch discard.

mod common;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use common::base_time;
use murmur::app::feed::{FeedFilter, FeedPage};
use murmur::app::likes::ToggleOutcome;
use murmur::client::{FeedStore, FeedUpdate, FeedView};
use murmur::domain::cursor;
use murmur::domain::like::{LikeDetail, LikeView};
use murmur::domain::post::PostView;
use murmur::domain::tag::TagRef;
use murmur::domain::user::UserRef;
use murmur::infra::live::LiveEvent;

fn user_ref(username: &str) -> UserRef {
    UserRef {
        id: Uuid::new_v4(),
        username: username.to_string(),
    }
}

fn post_view(content: &str, tags: &[&str], author: &UserRef, created_at: OffsetDateTime) -> PostView {
    PostView {
        id: Uuid::new_v4(),
        content: content.to_string(),
        slug: content.to_lowercase().replace(' ', "-"),
        author: author.clone(),
        tags: tags
            .iter()
            .map(|name| TagRef {
                id: Uuid::new_v4(),
                name: name.to_string(),
            })
            .collect(),
        likes: Vec::new(),
        created_at,
    }
}

fn page(posts: Vec<PostView>, total_count: i64, has_more: bool) -> FeedPage {
    let end_cursor = posts
        .last()
        .map(|post| cursor::encode(cursor::unix_millis(post.created_at)));
    FeedPage {
        total_count,
        end_cursor,
        has_more,
        posts,
    }
}

#[test]
fn page_merge_is_idempotent() {
    let author = user_ref("alice");
    let base = base_time();
    let first = page(
        vec![
            post_view("newest entry", &[], &author, base + Duration::seconds(2)),
            post_view("older entry", &[], &author, base + Duration::seconds(1)),
        ],
        2,
        false,
    );

    let mut view = FeedView::new(false);
    view.apply(FeedUpdate::Page(first.clone()));
    let once = view.clone();
    view.apply(FeedUpdate::Page(first));

    assert_eq!(view, once);
    assert_eq!(view.posts.len(), 2);
    assert_eq!(view.total_count, 2);
}

#[test]
fn older_page_appends_and_adopts_flags() {
    let author = user_ref("alice");
    let base = base_time();

    let mut view = FeedView::new(false);
    view.apply(FeedUpdate::Page(page(
        vec![post_view("page one", &[], &author, base + Duration::seconds(5))],
        2,
        true,
    )));
    assert!(view.has_more);

    view.apply(FeedUpdate::Page(page(
        vec![post_view("page two", &[], &author, base + Duration::seconds(1))],
        2,
        false,
    )));

    assert_eq!(view.posts.len(), 2);
    assert_eq!(view.posts[1].content, "page two");
    assert!(!view.has_more);
    assert_eq!(
        view.end_cursor.as_deref().unwrap(),
        cursor::encode(cursor::unix_millis(base + Duration::seconds(1)))
    );
}

#[test]
fn page_with_newer_cursor_is_dropped() {
    let author = user_ref("alice");
    let base = base_time();

    let mut view = FeedView::new(false);
    view.apply(FeedUpdate::Page(page(
        vec![post_view("held page", &[], &author, base + Duration::seconds(1))],
        3,
        true,
    )));
    let held = view.clone();

    // A stale arrival carrying a newer cursor than the view has walked
    // to must not disturb the aggregate.
    view.apply(FeedUpdate::Page(page(
        vec![post_view("stale page", &[], &author, base + Duration::seconds(9))],
        3,
        true,
    )));

    assert_eq!(view, held);
}

#[test]
fn created_prepends_dedupes_and_bumps_total() {
    let author = user_ref("alice");
    let base = base_time();

    let mut view = FeedView::new(false);
    view.apply(FeedUpdate::Page(page(
        vec![post_view("existing post", &[], &author, base)],
        1,
        false,
    )));

    let pushed = post_view("pushed post", &[], &author, base + Duration::seconds(1));
    view.apply(FeedUpdate::Created(pushed.clone()));
    assert_eq!(view.posts.len(), 2);
    assert_eq!(view.posts[0].id, pushed.id);
    assert_eq!(view.total_count, 2);

    // Redelivery is absorbed.
    view.apply(FeedUpdate::Created(pushed));
    assert_eq!(view.posts.len(), 2);
    assert_eq!(view.total_count, 2);
}

#[test]
fn created_on_empty_view_seeds_the_cursor() {
    let author = user_ref("alice");
    let pushed = post_view("first ever", &[], &author, base_time());

    let mut view = FeedView::new(false);
    view.apply(FeedUpdate::Created(pushed.clone()));

    assert_eq!(view.posts.len(), 1);
    assert_eq!(
        view.end_cursor.as_deref().unwrap(),
        cursor::encode(cursor::unix_millis(pushed.created_at))
    );
}

#[test]
fn from_page_maps_sentinel_counts() {
    let author = user_ref("alice");
    let liked_at = base_time() + Duration::seconds(30);
    let post = post_view("delta post", &[], &author, base_time());

    // -1: one added like, timestamp carried as raw millis.
    let added = FeedPage {
        total_count: -1,
        end_cursor: Some(cursor::unix_millis(liked_at).to_string()),
        has_more: false,
        posts: vec![post.clone()],
    };
    match FeedUpdate::from_page(added) {
        FeedUpdate::LikeAdded { post: carried, liked_at: at } => {
            assert_eq!(carried.id, post.id);
            assert_eq!(at, liked_at);
        }
        other => panic!("expected LikeAdded, got {:?}", other),
    }

    // -2: one removed like.
    let removed = FeedPage {
        total_count: -2,
        end_cursor: None,
        has_more: false,
        posts: vec![post.clone()],
    };
    match FeedUpdate::from_page(removed) {
        FeedUpdate::LikeRemoved { post_id } => assert_eq!(post_id, post.id),
        other => panic!("expected LikeRemoved, got {:?}", other),
    }

    // Any ordinary count stays a page.
    let plain = page(vec![post.clone()], 1, false);
    assert!(matches!(FeedUpdate::from_page(plain), FeedUpdate::Page(_)));

    // A sentinel with no post degrades to an empty page, which merges
    // as a no-op on an established view.
    let empty = FeedPage {
        total_count: -1,
        end_cursor: None,
        has_more: false,
        posts: Vec::new(),
    };
    let mut view = FeedView::new(true);
    view.apply(FeedUpdate::Page(page(vec![post], 1, false)));
    let held = view.clone();
    view.apply(FeedUpdate::from_page(empty));
    assert_eq!(view, held);
}

#[test]
fn like_delta_round_trip_on_empty_liked_by_view() {
    let author = user_ref("alice");
    let liked_at = base_time() + Duration::seconds(7);
    let post = post_view("the liked post", &[], &author, base_time());

    let mut view = FeedView::new(true);
    view.apply(FeedUpdate::like_added(post.clone(), liked_at));

    assert_eq!(view.posts.len(), 1);
    assert_eq!(view.total_count, 1);
    assert_eq!(
        view.end_cursor.as_deref().unwrap(),
        cursor::encode(cursor::unix_millis(liked_at))
    );

    view.apply(FeedUpdate::LikeRemoved { post_id: post.id });
    assert!(view.posts.is_empty());

    // Removing a post that is not held is a no-op, not an error.
    view.apply(FeedUpdate::LikeRemoved { post_id: post.id });
    assert!(view.posts.is_empty());
}

#[test]
fn post_created_event_routes_to_matching_keys_only() {
    let author = user_ref("alice");
    let tagged = post_view(
        "a tagged post",
        &["rust"],
        &author,
        base_time() + Duration::seconds(1),
    );

    let mut store = FeedStore::new();
    store.ensure(&FeedFilter::All);
    store.ensure(&FeedFilter::Tag("rust".to_string()));
    store.ensure(&FeedFilter::Tag("go".to_string()));
    store.ensure(&FeedFilter::Author(author.id));
    store.ensure(&FeedFilter::LikedBy(author.id));

    store.handle_event(&LiveEvent::PostCreated {
        post: tagged.clone(),
    });

    assert!(store.view(&FeedFilter::All).unwrap().contains(tagged.id));
    assert!(store
        .view(&FeedFilter::Tag("rust".to_string()))
        .unwrap()
        .contains(tagged.id));
    assert!(!store
        .view(&FeedFilter::Tag("go".to_string()))
        .unwrap()
        .contains(tagged.id));
    assert!(store
        .view(&FeedFilter::Author(author.id))
        .unwrap()
        .contains(tagged.id));
    // Liked-by feeds move on like events, never on creation.
    assert!(!store
        .view(&FeedFilter::LikedBy(author.id))
        .unwrap()
        .contains(tagged.id));
}

#[test]
fn like_created_event_updates_liker_feed_and_refreshes_others() {
    let author = user_ref("alice");
    let liker = user_ref("bob");
    let liked_at = base_time() + Duration::seconds(20);

    let mut post = post_view("a popular post", &[], &author, base_time());
    let like_view = LikeView {
        id: Uuid::new_v4(),
        user: liker.clone(),
        created_at: liked_at,
    };
    post.likes.push(like_view.clone());

    let mut store = FeedStore::new();
    // The All view already holds the post, without the new like.
    let mut stale = post.clone();
    stale.likes.clear();
    store.apply(&FeedFilter::All, FeedUpdate::Page(page(vec![stale], 1, false)));
    store.ensure(&FeedFilter::LikedBy(liker.id));

    store.handle_event(&LiveEvent::LikeCreated {
        like: LikeDetail {
            id: like_view.id,
            user: liker.clone(),
            post: post.clone(),
            created_at: liked_at,
        },
    });

    let liked_by = store.view(&FeedFilter::LikedBy(liker.id)).unwrap();
    assert!(liked_by.contains(post.id));
    assert_eq!(liked_by.total_count, 1);

    let all = store.view(&FeedFilter::All).unwrap();
    assert_eq!(all.posts[0].likes.len(), 1);
    assert_eq!(all.posts[0].likes[0].user.username, "bob");
    // Still one copy of the post there, not a prepend.
    assert_eq!(all.posts.len(), 1);
    assert_eq!(all.total_count, 1);
}

#[test]
fn reset_invalidates_in_flight_fetches() {
    let author = user_ref("alice");
    let key = FeedFilter::All;

    let mut store = FeedStore::new();
    let ticket = store.begin_fetch(&key);
    store.reset(&key);

    let late = page(vec![post_view("late arrival", &[], &author, base_time())], 1, false);
    assert!(!store.complete_fetch(ticket, late.clone()));
    assert!(store.view(&key).is_none());

    // A fetch begun after the reset merges normally.
    let ticket = store.begin_fetch(&key);
    assert!(store.complete_fetch(ticket, late));
    assert_eq!(store.view(&key).unwrap().posts.len(), 1);
}

#[test]
fn note_toggle_folds_own_toggle_into_liked_by_feed() {
    let author = user_ref("alice");
    let liker = user_ref("bob");
    let liked_at = base_time() + Duration::seconds(3);
    let post = post_view("toggled post", &[], &author, base_time());

    let mut store = FeedStore::new();
    store.ensure(&FeedFilter::LikedBy(liker.id));

    let like = LikeDetail {
        id: Uuid::new_v4(),
        user: liker.clone(),
        post: post.clone(),
        created_at: liked_at,
    };
    store.note_toggle(liker.id, post.id, &ToggleOutcome::Liked { like: like.clone() });
    assert!(store
        .view(&FeedFilter::LikedBy(liker.id))
        .unwrap()
        .contains(post.id));

    store.note_toggle(liker.id, post.id, &ToggleOutcome::Unliked { id: like.id });
    assert!(!store
        .view(&FeedFilter::LikedBy(liker.id))
        .unwrap()
        .contains(post.id));
}
