use super::StringList;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

/// Moderation state. Publishing is tracked separately by `is_published`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CourseStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "archived")]
    Archived,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    Display,
    EnumString,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CourseLevel {
    #[sea_orm(string_value = "beginner")]
    Beginner,
    #[sea_orm(string_value = "intermediate")]
    Intermediate,
    #[sea_orm(string_value = "advanced")]
    Advanced,
    #[sea_orm(string_value = "all_levels")]
    AllLevels,
}

/// Catalog entry owned by one instructor
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    #[sea_orm(nullable)]
    pub subtitle: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    pub level: CourseLevel,
    pub language: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub price: Decimal,
    #[sea_orm(nullable)]
    pub thumbnail_url: Option<String>,
    #[sea_orm(nullable)]
    pub preview_video_url: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub requirements: StringList,
    #[sea_orm(column_type = "Json")]
    pub what_you_will_learn: StringList,
    #[sea_orm(column_type = "Json")]
    pub target_audience: StringList,
    #[sea_orm(column_type = "Json")]
    pub tags: StringList,
    pub status: CourseStatus,
    pub is_published: bool,
    #[sea_orm(nullable)]
    pub published_at: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Text", nullable)]
    pub rejection_reason: Option<String>,
    /// Sum of lesson durations, in seconds.
    pub total_duration: i32,
    pub total_lessons: i32,
    pub total_enrollments: i32,
    #[sea_orm(column_type = "Decimal(Some((5, 2)))")]
    pub rating: Decimal,
    pub total_reviews: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Visible in the public catalog and open for enrollment.
    pub fn is_listed(&self) -> bool {
        self.status == CourseStatus::Approved && self.is_published
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InstructorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Instructor,
    #[sea_orm(has_many = "super::course_chapter::Entity")]
    Chapters,
    #[sea_orm(has_many = "super::course_lesson::Entity")]
    Lessons,
    #[sea_orm(has_many = "super::course_review::Entity")]
    Reviews,
    #[sea_orm(has_many = "super::enrollment::Entity")]
    Enrollments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instructor.def()
    }
}

impl Related<super::course_chapter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chapters.def()
    }
}

impl Related<super::course_lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lessons.def()
    }
}

impl Related<super::course_review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl Related<super::enrollment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Enrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
