pub mod cart_item;
pub mod course;
pub mod course_chapter;
pub mod course_lesson;
pub mod course_review;
pub mod discount;
pub mod enrollment;
pub mod enrollment_lesson;
pub mod user;
pub mod wishlist_item;

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered list of short strings stored as a JSON array column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct StringList(pub Vec<String>);

impl From<Vec<String>> for StringList {
    fn from(items: Vec<String>) -> Self {
        StringList(
            items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

/// List of ids stored as a JSON array column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct IdList(pub Vec<Uuid>);

impl IdList {
    pub fn contains(&self, id: &Uuid) -> bool {
        self.0.contains(id)
    }
}
