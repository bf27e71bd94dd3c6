use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::like::LikeView;
use crate::domain::tag::TagRef;
use crate::domain::user::UserRef;

/// The stored post record. Relations are held as id references on both
/// sides; every mutation that touches one side must touch the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub slug: String,
    pub author_id: Uuid,
    pub tags: Vec<Uuid>,
    pub likes: Vec<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Post {
    pub fn new(author_id: Uuid, content: impl Into<String>, created_at: OffsetDateTime) -> Self {
        let content = content.into();
        let slug = slug_for(&content);
        Self {
            id: Uuid::new_v4(),
            content,
            slug,
            author_id,
            tags: Vec::new(),
            likes: Vec::new(),
            created_at,
        }
    }
}

/// A fully hydrated post: author, tags and the full like list are
/// embedded so a feed page needs no secondary fetch per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub content: String,
    pub slug: String,
    pub author: UserRef,
    pub tags: Vec<TagRef>,
    pub likes: Vec<LikeView>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Derived post identity: a lowercase slug built from the first four
/// words of the content, letters only.
pub fn slug_for(content: &str) -> String {
    let letters_and_spaces: String = content
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect();

    letters_and_spaces
        .split(' ')
        .filter(|word| !word.is_empty())
        .take(4)
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}
