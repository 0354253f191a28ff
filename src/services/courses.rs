use crate::{
    auth::AuthUser,
    entities::{
        cart_item,
        course::{self, CourseLevel, CourseStatus},
        course_chapter, course_lesson, course_review, enrollment, enrollment_lesson,
        user::{self, UserRole},
        wishlist_item, StringList,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{fetch_page, users::recalculate_instructor_stats, Page},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Total seconds and lesson count of a curriculum.
pub fn curriculum_totals(lessons: &[course_lesson::Model]) -> (i32, i32) {
    let duration = lessons.iter().map(|l| l.duration.max(0)).sum();
    (duration, lessons.len() as i32)
}

/// Mean rating rounded to one decimal, with the review count.
pub fn rating_summary(ratings: &[i16]) -> (Decimal, i32) {
    if ratings.is_empty() {
        return (Decimal::ZERO, 0);
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    let mean = Decimal::from(sum) / Decimal::from(ratings.len() as i64);
    (
        mean.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero),
        ratings.len() as i32,
    )
}

/// Rewrites `total_duration` and `total_lessons` from the lesson rows.
pub(crate) async fn refresh_curriculum_totals<C: ConnectionTrait>(
    db: &C,
    course_id: Uuid,
) -> Result<(), ServiceError> {
    let lessons = course_lesson::Entity::find()
        .filter(course_lesson::Column::CourseId.eq(course_id))
        .all(db)
        .await?;
    let (duration, count) = curriculum_totals(&lessons);
    course::Entity::update_many()
        .col_expr(course::Column::TotalDuration, Expr::value(duration))
        .col_expr(course::Column::TotalLessons, Expr::value(count))
        .col_expr(course::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(course::Column::Id.eq(course_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Rewrites `rating` and `total_reviews` from the review rows.
pub(crate) async fn refresh_rating<C: ConnectionTrait>(
    db: &C,
    course_id: Uuid,
) -> Result<(), ServiceError> {
    let ratings: Vec<i16> = course_review::Entity::find()
        .filter(course_review::Column::CourseId.eq(course_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.rating)
        .collect();
    let (rating, count) = rating_summary(&ratings);
    course::Entity::update_many()
        .col_expr(course::Column::Rating, Expr::value(rating))
        .col_expr(course::Column::TotalReviews, Expr::value(count))
        .filter(course::Column::Id.eq(course_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Loads a course the actor may edit: its instructor or any admin.
pub(crate) async fn load_managed_course<C: ConnectionTrait>(
    db: &C,
    actor: &AuthUser,
    course_id: Uuid,
) -> Result<course::Model, ServiceError> {
    let course = course::Entity::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Course"))?;
    if !actor.can_manage(course.instructor_id) {
        return Err(ServiceError::Forbidden(
            "You can only manage your own courses".into(),
        ));
    }
    Ok(course)
}

/// Deletes a course with every row that hangs off it, then rebuilds the
/// instructor's counters from what is left.
pub(crate) async fn remove_course<C: ConnectionTrait>(
    db: &C,
    course: &course::Model,
) -> Result<(), ServiceError> {
    let enrollment_ids: Vec<Uuid> = enrollment::Entity::find()
        .filter(enrollment::Column::CourseId.eq(course.id))
        .all(db)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    enrollment_lesson::Entity::delete_many()
        .filter(enrollment_lesson::Column::EnrollmentId.is_in(enrollment_ids))
        .exec(db)
        .await?;
    enrollment::Entity::delete_many()
        .filter(enrollment::Column::CourseId.eq(course.id))
        .exec(db)
        .await?;
    course_review::Entity::delete_many()
        .filter(course_review::Column::CourseId.eq(course.id))
        .exec(db)
        .await?;
    course_lesson::Entity::delete_many()
        .filter(course_lesson::Column::CourseId.eq(course.id))
        .exec(db)
        .await?;
    course_chapter::Entity::delete_many()
        .filter(course_chapter::Column::CourseId.eq(course.id))
        .exec(db)
        .await?;
    cart_item::Entity::delete_many()
        .filter(cart_item::Column::CourseId.eq(course.id))
        .exec(db)
        .await?;
    wishlist_item::Entity::delete_many()
        .filter(wishlist_item::Column::CourseId.eq(course.id))
        .exec(db)
        .await?;
    course::Entity::delete_by_id(course.id).exec(db).await?;

    recalculate_instructor_stats(db, course.instructor_id).await?;
    Ok(())
}

/// Public face of an instructor on course listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InstructorSummary {
    pub id: Uuid,
    pub name: String,
    pub headline: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&user::Model> for InstructorSummary {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name.clone(),
            headline: u.headline.clone(),
            avatar_url: u.avatar_url.clone(),
        }
    }
}

/// Catalog listing entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseCard {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub category: String,
    pub level: CourseLevel,
    pub language: String,
    pub price: Decimal,
    pub thumbnail_url: Option<String>,
    pub status: CourseStatus,
    pub is_published: bool,
    pub rating: Decimal,
    pub total_reviews: i32,
    pub total_enrollments: i32,
    pub total_lessons: i32,
    pub total_duration: i32,
    pub instructor: Option<InstructorSummary>,
    pub published_at: Option<DateTime<Utc>>,
}

impl CourseCard {
    fn new(c: course::Model, instructor: Option<InstructorSummary>) -> Self {
        Self {
            id: c.id,
            title: c.title,
            subtitle: c.subtitle,
            category: c.category,
            level: c.level,
            language: c.language,
            price: c.price,
            thumbnail_url: c.thumbnail_url,
            status: c.status,
            is_published: c.is_published,
            rating: c.rating,
            total_reviews: c.total_reviews,
            total_enrollments: c.total_enrollments,
            total_lessons: c.total_lessons,
            total_duration: c.total_duration,
            instructor,
            published_at: c.published_at,
        }
    }
}

/// Builds cards for `courses`, loading their instructors in one query.
pub(crate) async fn course_cards<C: ConnectionTrait>(
    db: &C,
    courses: Vec<course::Model>,
) -> Result<Vec<CourseCard>, ServiceError> {
    let instructors: HashMap<Uuid, InstructorSummary> = user::Entity::find()
        .filter(user::Column::Id.is_in(courses.iter().map(|c| c.instructor_id)))
        .all(db)
        .await?
        .iter()
        .map(|u| (u.id, InstructorSummary::from(u)))
        .collect();

    Ok(courses
        .into_iter()
        .map(|c| {
            let instructor = instructors.get(&c.instructor_id).cloned();
            CourseCard::new(c, instructor)
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CourseSort {
    #[default]
    Newest,
    Popular,
    Rating,
    PriceAsc,
    PriceDesc,
}

/// Public catalog filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CatalogQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    /// Matches title or description.
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub instructor_id: Option<Uuid>,
    pub sort: Option<CourseSort>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LessonView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Present for preview lessons, or for the course's managers.
    pub video_url: Option<String>,
    pub duration: i32,
    pub position: i32,
    pub is_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChapterView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub lessons: Vec<LessonView>,
}

/// Course page with curriculum
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseDetail {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: String,
    pub category: String,
    pub level: CourseLevel,
    pub language: String,
    pub price: Decimal,
    pub thumbnail_url: Option<String>,
    pub preview_video_url: Option<String>,
    pub requirements: Vec<String>,
    pub what_you_will_learn: Vec<String>,
    pub target_audience: Vec<String>,
    pub tags: Vec<String>,
    pub status: CourseStatus,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub total_duration: i32,
    pub total_lessons: i32,
    pub total_enrollments: i32,
    pub rating: Decimal,
    pub total_reviews: i32,
    pub instructor: Option<InstructorSummary>,
    pub chapters: Vec<ChapterView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn build_curriculum(
    chapters: Vec<course_chapter::Model>,
    lessons: Vec<course_lesson::Model>,
    show_all_videos: bool,
) -> Vec<ChapterView> {
    let mut by_chapter: HashMap<Uuid, Vec<LessonView>> = HashMap::new();
    for l in lessons {
        let video_url = if show_all_videos || l.is_preview {
            l.video_url
        } else {
            None
        };
        by_chapter.entry(l.chapter_id).or_default().push(LessonView {
            id: l.id,
            title: l.title,
            description: l.description,
            video_url,
            duration: l.duration,
            position: l.position,
            is_preview: l.is_preview,
        });
    }

    chapters
        .into_iter()
        .map(|c| {
            let mut lessons = by_chapter.remove(&c.id).unwrap_or_default();
            lessons.sort_by_key(|l| l.position);
            ChapterView {
                id: c.id,
                title: c.title,
                description: c.description,
                position: c.position,
                lessons,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCourseRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: String,
    #[validate(length(max = 300))]
    pub subtitle: Option<String>,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    #[validate(length(min = 1, max = 100, message = "Category is required"))]
    pub category: String,
    pub level: Option<CourseLevel>,
    #[validate(length(min = 2, max = 50))]
    pub language: Option<String>,
    pub price: Decimal,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    #[validate(url)]
    pub preview_video_url: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub what_you_will_learn: Vec<String>,
    #[serde(default)]
    pub target_audience: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 3, max = 200, message = "Title must be 3-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 300))]
    pub subtitle: Option<String>,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub level: Option<CourseLevel>,
    #[validate(length(min = 2, max = 50))]
    pub language: Option<String>,
    pub price: Option<Decimal>,
    #[validate(url)]
    pub thumbnail_url: Option<String>,
    #[validate(url)]
    pub preview_video_url: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub what_you_will_learn: Option<Vec<String>>,
    pub target_audience: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChapterRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LessonRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub video_url: Option<String>,
    /// Seconds.
    #[validate(range(min = 0, max = 86400, message = "Duration must be 0-86400 seconds"))]
    pub duration: i32,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    #[serde(default)]
    pub is_preview: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateLessonRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(url)]
    pub video_url: Option<String>,
    #[validate(range(min = 0, max = 86400, message = "Duration must be 0-86400 seconds"))]
    pub duration: Option<i32>,
    #[validate(range(min = 0))]
    pub position: Option<i32>,
    pub is_preview: Option<bool>,
    /// Moves the lesson to another chapter of the same course.
    pub chapter_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,
    #[validate(length(max = 2000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Reviewer {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewView {
    pub id: Uuid,
    pub course_id: Uuid,
    pub rating: i16,
    pub comment: Option<String>,
    pub user: Option<Reviewer>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn check_price(price: Decimal) -> Result<(), ServiceError> {
    if price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".into(),
        ));
    }
    if price.scale() > 2 && price != price.round_dp(2) {
        return Err(ServiceError::ValidationError(
            "Price can have at most two decimal places".into(),
        ));
    }
    Ok(())
}

async fn next_position<C, E>(db: &C, select: sea_orm::Select<E>) -> Result<i32, ServiceError>
where
    C: ConnectionTrait,
    E: EntityTrait,
    E::Model: Send + Sync,
{
    Ok(select.count(db).await? as i32)
}

/// Service for the course catalog, curriculum and reviews
#[derive(Clone)]
pub struct CourseService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CourseService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn detail(
        &self,
        course: course::Model,
        show_all_videos: bool,
    ) -> Result<CourseDetail, ServiceError> {
        let instructor = user::Entity::find_by_id(course.instructor_id)
            .one(&*self.db)
            .await?
            .as_ref()
            .map(InstructorSummary::from);
        let chapters = course_chapter::Entity::find()
            .filter(course_chapter::Column::CourseId.eq(course.id))
            .order_by_asc(course_chapter::Column::Position)
            .order_by_asc(course_chapter::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let lessons = course_lesson::Entity::find()
            .filter(course_lesson::Column::CourseId.eq(course.id))
            .order_by_asc(course_lesson::Column::Position)
            .all(&*self.db)
            .await?;

        Ok(CourseDetail {
            id: course.id,
            title: course.title,
            subtitle: course.subtitle,
            description: course.description,
            category: course.category,
            level: course.level,
            language: course.language,
            price: course.price,
            thumbnail_url: course.thumbnail_url,
            preview_video_url: course.preview_video_url,
            requirements: course.requirements.0,
            what_you_will_learn: course.what_you_will_learn.0,
            target_audience: course.target_audience.0,
            tags: course.tags.0,
            status: course.status,
            is_published: course.is_published,
            published_at: course.published_at,
            rejection_reason: course.rejection_reason,
            total_duration: course.total_duration,
            total_lessons: course.total_lessons,
            total_enrollments: course.total_enrollments,
            rating: course.rating,
            total_reviews: course.total_reviews,
            instructor,
            chapters: build_curriculum(chapters, lessons, show_all_videos),
            created_at: course.created_at,
            updated_at: course.updated_at,
        })
    }

    /// Approved and published courses only.
    #[instrument(skip(self))]
    pub async fn list_catalog(
        &self,
        query: CatalogQuery,
        limit: u64,
    ) -> Result<Page<CourseCard>, ServiceError> {
        let mut select = course::Entity::find()
            .filter(course::Column::Status.eq(CourseStatus::Approved))
            .filter(course::Column::IsPublished.eq(true));

        if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
            select = select.filter(course::Column::Category.eq(category.trim()));
        }
        if let Some(level) = query.level {
            select = select.filter(course::Column::Level.eq(level));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(course::Column::Title.contains(search))
                    .add(course::Column::Description.contains(search)),
            );
        }
        if let Some(min) = query.min_price {
            select = select.filter(course::Column::Price.gte(min));
        }
        if let Some(max) = query.max_price {
            select = select.filter(course::Column::Price.lte(max));
        }
        if let Some(instructor_id) = query.instructor_id {
            select = select.filter(course::Column::InstructorId.eq(instructor_id));
        }

        select = match query.sort.unwrap_or_default() {
            CourseSort::Newest => select.order_by_desc(course::Column::PublishedAt),
            CourseSort::Popular => select.order_by_desc(course::Column::TotalEnrollments),
            CourseSort::Rating => select
                .order_by_desc(course::Column::Rating)
                .order_by_desc(course::Column::TotalReviews),
            CourseSort::PriceAsc => select.order_by_asc(course::Column::Price),
            CourseSort::PriceDesc => select.order_by_desc(course::Column::Price),
        }
        .order_by_desc(course::Column::CreatedAt);

        let page = fetch_page(&*self.db, select, query.page.unwrap_or(1), limit).await?;
        let cards = course_cards(&*self.db, page.items).await?;
        Ok(Page {
            items: cards,
            total: page.total,
            page: page.page,
            limit: page.limit,
        })
    }

    /// Public course page; only preview lessons expose their video.
    #[instrument(skip(self))]
    pub async fn get_public_course(&self, course_id: Uuid) -> Result<CourseDetail, ServiceError> {
        let course = course::Entity::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .filter(course::Model::is_listed)
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        self.detail(course, false).await
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn get_managed_course(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
    ) -> Result<CourseDetail, ServiceError> {
        let course = load_managed_course(&*self.db, actor, course_id).await?;
        self.detail(course, true).await
    }

    #[instrument(skip(self), fields(instructor = %actor.user_id))]
    pub async fn list_instructor_courses(
        &self,
        actor: &AuthUser,
        status: Option<CourseStatus>,
        page: u64,
        limit: u64,
    ) -> Result<Page<CourseCard>, ServiceError> {
        let mut select = course::Entity::find()
            .filter(course::Column::InstructorId.eq(actor.user_id))
            .order_by_desc(course::Column::CreatedAt);
        if let Some(status) = status {
            select = select.filter(course::Column::Status.eq(status));
        }
        let page = fetch_page(&*self.db, select, page, limit).await?;
        let cards = course_cards(&*self.db, page.items).await?;
        Ok(Page {
            items: cards,
            total: page.total,
            page: page.page,
            limit: page.limit,
        })
    }

    /// New courses start as drafts owned by the caller.
    #[instrument(skip(self, request), fields(instructor = %actor.user_id))]
    pub async fn create_course(
        &self,
        actor: &AuthUser,
        request: CreateCourseRequest,
    ) -> Result<CourseDetail, ServiceError> {
        request.validate()?;
        check_price(request.price)?;
        if actor.role == UserRole::Instructor && !actor.is_approved {
            return Err(ServiceError::Forbidden(
                "Instructor account is pending approval".into(),
            ));
        }

        let now = Utc::now();
        let txn = self.db.begin().await?;
        let created = course::ActiveModel {
            id: Set(Uuid::new_v4()),
            instructor_id: Set(actor.user_id),
            title: Set(request.title.trim().to_string()),
            subtitle: Set(request.subtitle),
            description: Set(request.description),
            category: Set(request.category.trim().to_string()),
            level: Set(request.level.unwrap_or(CourseLevel::AllLevels)),
            language: Set(request.language.unwrap_or_else(|| "English".to_string())),
            price: Set(request.price),
            thumbnail_url: Set(request.thumbnail_url),
            preview_video_url: Set(request.preview_video_url),
            requirements: Set(StringList::from(request.requirements)),
            what_you_will_learn: Set(StringList::from(request.what_you_will_learn)),
            target_audience: Set(StringList::from(request.target_audience)),
            tags: Set(StringList::from(request.tags)),
            status: Set(CourseStatus::Draft),
            is_published: Set(false),
            published_at: Set(None),
            rejection_reason: Set(None),
            total_duration: Set(0),
            total_lessons: Set(0),
            total_enrollments: Set(0),
            rating: Set(Decimal::ZERO),
            total_reviews: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        user::Entity::update_many()
            .col_expr(
                user::Column::TotalCourses,
                Expr::col(user::Column::TotalCourses).add(1),
            )
            .filter(user::Column::Id.eq(actor.user_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::CourseCreated {
                course_id: created.id,
                instructor_id: actor.user_id,
            })
            .await;
        info!(course_id = %created.id, "course created");
        self.detail(created, true).await
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn update_course(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        request: UpdateCourseRequest,
    ) -> Result<CourseDetail, ServiceError> {
        request.validate()?;
        let course = load_managed_course(&*self.db, actor, course_id).await?;
        if course.status == CourseStatus::Archived {
            return Err(ServiceError::InvalidOperation(
                "Archived courses cannot be edited".into(),
            ));
        }

        let mut active: course::ActiveModel = course.into();
        if let Some(title) = request.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(subtitle) = request.subtitle {
            active.subtitle = Set(Some(subtitle));
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(category) = request.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(level) = request.level {
            active.level = Set(level);
        }
        if let Some(language) = request.language {
            active.language = Set(language);
        }
        if let Some(price) = request.price {
            check_price(price)?;
            active.price = Set(price);
        }
        if let Some(url) = request.thumbnail_url {
            active.thumbnail_url = Set(Some(url));
        }
        if let Some(url) = request.preview_video_url {
            active.preview_video_url = Set(Some(url));
        }
        if let Some(items) = request.requirements {
            active.requirements = Set(StringList::from(items));
        }
        if let Some(items) = request.what_you_will_learn {
            active.what_you_will_learn = Set(StringList::from(items));
        }
        if let Some(items) = request.target_audience {
            active.target_audience = Set(StringList::from(items));
        }
        if let Some(items) = request.tags {
            active.tags = Set(StringList::from(items));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!(course_id = %updated.id, "course updated");
        self.detail(updated, true).await
    }

    /// Owners may only delete courses nobody has bought; admins go through
    /// the admin service.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_course(&self, actor: &AuthUser, course_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let course = load_managed_course(&txn, actor, course_id).await?;

        if !actor.is_admin() {
            let enrollments = enrollment::Entity::find()
                .filter(enrollment::Column::CourseId.eq(course.id))
                .count(&txn)
                .await?;
            if enrollments > 0 {
                warn!(%course_id, enrollments, "refusing to delete course with enrollments");
                return Err(ServiceError::Conflict(
                    "Courses with enrollments cannot be deleted".into(),
                ));
            }
        }

        remove_course(&txn, &course).await?;
        txn.commit().await?;

        self.event_sender.publish(Event::CourseDeleted(course_id)).await;
        info!(%course_id, "course deleted");
        Ok(())
    }

    /// Draft or rejected courses with at least one lesson go to review.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn submit_for_review(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
    ) -> Result<CourseDetail, ServiceError> {
        let course = load_managed_course(&*self.db, actor, course_id).await?;
        if !matches!(course.status, CourseStatus::Draft | CourseStatus::Rejected) {
            return Err(ServiceError::InvalidOperation(format!(
                "A {} course cannot be submitted for review",
                course.status
            )));
        }
        if course.total_lessons == 0 {
            return Err(ServiceError::InvalidOperation(
                "Add at least one lesson before submitting".into(),
            ));
        }

        let mut active: course::ActiveModel = course.into();
        active.status = Set(CourseStatus::Pending);
        active.rejection_reason = Set(None);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender.publish(Event::CourseSubmitted(course_id)).await;
        info!(%course_id, "course submitted for review");
        self.detail(updated, true).await
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn set_published(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        publish: bool,
    ) -> Result<CourseDetail, ServiceError> {
        let course = load_managed_course(&*self.db, actor, course_id).await?;
        if publish && course.status != CourseStatus::Approved {
            return Err(ServiceError::InvalidOperation(
                "Only approved courses can be published".into(),
            ));
        }

        let first_publish = course.published_at.is_none();
        let mut active: course::ActiveModel = course.into();
        active.is_published = Set(publish);
        if publish && first_publish {
            active.published_at = Set(Some(Utc::now()));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        let event = if publish {
            Event::CoursePublished(course_id)
        } else {
            Event::CourseUnpublished(course_id)
        };
        self.event_sender.publish(event).await;
        info!(%course_id, publish, "course visibility changed");
        self.detail(updated, true).await
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn create_chapter(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        request: ChapterRequest,
    ) -> Result<course_chapter::Model, ServiceError> {
        request.validate()?;
        let course = load_managed_course(&*self.db, actor, course_id).await?;
        let position = match request.position {
            Some(p) => p,
            None => {
                next_position(
                    &*self.db,
                    course_chapter::Entity::find()
                        .filter(course_chapter::Column::CourseId.eq(course.id)),
                )
                .await?
            }
        };

        let now = Utc::now();
        let chapter = course_chapter::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(course.id),
            title: Set(request.title.trim().to_string()),
            description: Set(request.description),
            position: Set(position),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;
        info!(%course_id, chapter_id = %chapter.id, "chapter created");
        Ok(chapter)
    }

    async fn load_chapter(
        &self,
        course_id: Uuid,
        chapter_id: Uuid,
    ) -> Result<course_chapter::Model, ServiceError> {
        course_chapter::Entity::find_by_id(chapter_id)
            .one(&*self.db)
            .await?
            .filter(|c| c.course_id == course_id)
            .ok_or_else(|| ServiceError::not_found("Chapter"))
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn update_chapter(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        chapter_id: Uuid,
        request: ChapterRequest,
    ) -> Result<course_chapter::Model, ServiceError> {
        request.validate()?;
        load_managed_course(&*self.db, actor, course_id).await?;
        let chapter = self.load_chapter(course_id, chapter_id).await?;

        let mut active: course_chapter::ActiveModel = chapter.into();
        active.title = Set(request.title.trim().to_string());
        active.description = Set(request.description);
        if let Some(position) = request.position {
            active.position = Set(position);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Removes the chapter with its lessons and refreshes the course totals.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_chapter(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        chapter_id: Uuid,
    ) -> Result<(), ServiceError> {
        load_managed_course(&*self.db, actor, course_id).await?;
        let chapter = self.load_chapter(course_id, chapter_id).await?;

        let txn = self.db.begin().await?;
        course_lesson::Entity::delete_many()
            .filter(course_lesson::Column::ChapterId.eq(chapter.id))
            .exec(&txn)
            .await?;
        course_chapter::Entity::delete_by_id(chapter.id)
            .exec(&txn)
            .await?;
        refresh_curriculum_totals(&txn, course_id).await?;
        txn.commit().await?;

        info!(%course_id, %chapter_id, "chapter deleted");
        Ok(())
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn create_lesson(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        chapter_id: Uuid,
        request: LessonRequest,
    ) -> Result<course_lesson::Model, ServiceError> {
        request.validate()?;
        load_managed_course(&*self.db, actor, course_id).await?;
        let chapter = self.load_chapter(course_id, chapter_id).await?;

        let txn = self.db.begin().await?;
        let position = match request.position {
            Some(p) => p,
            None => {
                next_position(
                    &txn,
                    course_lesson::Entity::find()
                        .filter(course_lesson::Column::ChapterId.eq(chapter.id)),
                )
                .await?
            }
        };
        let now = Utc::now();
        let lesson = course_lesson::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(course_id),
            chapter_id: Set(chapter.id),
            title: Set(request.title.trim().to_string()),
            description: Set(request.description),
            video_url: Set(request.video_url),
            duration: Set(request.duration),
            position: Set(position),
            is_preview: Set(request.is_preview),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;
        refresh_curriculum_totals(&txn, course_id).await?;
        txn.commit().await?;

        info!(%course_id, lesson_id = %lesson.id, "lesson created");
        Ok(lesson)
    }

    async fn load_lesson(
        &self,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<course_lesson::Model, ServiceError> {
        course_lesson::Entity::find_by_id(lesson_id)
            .one(&*self.db)
            .await?
            .filter(|l| l.course_id == course_id)
            .ok_or_else(|| ServiceError::not_found("Lesson"))
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn update_lesson(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        lesson_id: Uuid,
        request: UpdateLessonRequest,
    ) -> Result<course_lesson::Model, ServiceError> {
        request.validate()?;
        load_managed_course(&*self.db, actor, course_id).await?;
        let lesson = self.load_lesson(course_id, lesson_id).await?;
        if let Some(chapter_id) = request.chapter_id {
            self.load_chapter(course_id, chapter_id).await?;
        }

        let txn = self.db.begin().await?;
        let mut active: course_lesson::ActiveModel = lesson.into();
        if let Some(title) = request.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(url) = request.video_url {
            active.video_url = Set(Some(url));
        }
        if let Some(duration) = request.duration {
            active.duration = Set(duration);
        }
        if let Some(position) = request.position {
            active.position = Set(position);
        }
        if let Some(is_preview) = request.is_preview {
            active.is_preview = Set(is_preview);
        }
        if let Some(chapter_id) = request.chapter_id {
            active.chapter_id = Set(chapter_id);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        refresh_curriculum_totals(&txn, course_id).await?;
        txn.commit().await?;

        Ok(updated)
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_lesson(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        lesson_id: Uuid,
    ) -> Result<(), ServiceError> {
        load_managed_course(&*self.db, actor, course_id).await?;
        let lesson = self.load_lesson(course_id, lesson_id).await?;

        let txn = self.db.begin().await?;
        course_lesson::Entity::delete_by_id(lesson.id)
            .exec(&txn)
            .await?;
        refresh_curriculum_totals(&txn, course_id).await?;
        txn.commit().await?;

        info!(%course_id, %lesson_id, "lesson deleted");
        Ok(())
    }

    /// Creates or replaces the caller's review; requires a standing enrollment.
    #[instrument(skip(self, request), fields(student = %actor.user_id))]
    pub async fn upsert_review(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        request: ReviewRequest,
    ) -> Result<ReviewView, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let rating = i16::from(request.rating);
        let txn = self.db.begin().await?;

        course::Entity::find_by_id(course_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        let enrolled = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(actor.user_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .one(&txn)
            .await?
            .is_some_and(|e| e.grants_access());
        if !enrolled {
            return Err(ServiceError::Forbidden(
                "Only enrolled students can review this course".into(),
            ));
        }

        let existing = course_review::Entity::find()
            .filter(course_review::Column::CourseId.eq(course_id))
            .filter(course_review::Column::UserId.eq(actor.user_id))
            .one(&txn)
            .await?;
        let review = match existing {
            Some(review) => {
                let mut active: course_review::ActiveModel = review.into();
                active.rating = Set(rating);
                active.comment = Set(request.comment);
                active.updated_at = Set(now);
                active.update(&txn).await?
            }
            None => course_review::ActiveModel {
                id: Set(Uuid::new_v4()),
                course_id: Set(course_id),
                user_id: Set(actor.user_id),
                rating: Set(rating),
                comment: Set(request.comment),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Review already exists"))?,
        };
        refresh_rating(&txn, course_id).await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::ReviewSubmitted {
                course_id,
                user_id: actor.user_id,
                rating,
            })
            .await;
        info!(%course_id, rating, "review saved");

        Ok(ReviewView {
            id: review.id,
            course_id,
            rating: review.rating,
            comment: review.comment,
            user: Some(Reviewer {
                id: actor.user_id,
                name: actor.name.clone(),
                avatar_url: None,
            }),
            created_at: review.created_at,
            updated_at: review.updated_at,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_reviews(
        &self,
        course_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<Page<ReviewView>, ServiceError> {
        course::Entity::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .filter(course::Model::is_listed)
            .ok_or_else(|| ServiceError::not_found("Course"))?;

        let select = course_review::Entity::find()
            .filter(course_review::Column::CourseId.eq(course_id))
            .order_by_desc(course_review::Column::UpdatedAt);
        let page = fetch_page(&*self.db, select, page, limit).await?;

        let reviewers: HashMap<Uuid, Reviewer> = user::Entity::find()
            .filter(user::Column::Id.is_in(page.items.iter().map(|r| r.user_id)))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| {
                (
                    u.id,
                    Reviewer {
                        id: u.id,
                        name: u.name,
                        avatar_url: u.avatar_url,
                    },
                )
            })
            .collect();

        Ok(page.map(|r| ReviewView {
            id: r.id,
            course_id: r.course_id,
            rating: r.rating,
            comment: r.comment,
            user: reviewers.get(&r.user_id).cloned(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lesson(chapter_id: Uuid, position: i32, duration: i32, preview: bool) -> course_lesson::Model {
        let now = Utc::now();
        course_lesson::Model {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            chapter_id,
            title: format!("Lesson {position}"),
            description: None,
            video_url: Some(format!("https://cdn.learnhub.test/{position}.mp4")),
            duration,
            position,
            is_preview: preview,
            created_at: now,
            updated_at: now,
        }
    }

    fn chapter(position: i32) -> course_chapter::Model {
        let now = Utc::now();
        course_chapter::Model {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: format!("Chapter {position}"),
            description: None,
            position,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn totals_sum_durations_and_count_lessons() {
        let c = Uuid::new_v4();
        let lessons = vec![lesson(c, 0, 300, false), lesson(c, 1, 420, true)];
        assert_eq!(curriculum_totals(&lessons), (720, 2));
        assert_eq!(curriculum_totals(&[]), (0, 0));
    }

    #[test]
    fn rating_is_mean_to_one_decimal() {
        assert_eq!(rating_summary(&[]), (Decimal::ZERO, 0));
        assert_eq!(rating_summary(&[5, 4]), (dec!(4.5), 2));
        assert_eq!(rating_summary(&[5, 4, 4]), (dec!(4.3), 3));
        assert_eq!(rating_summary(&[5, 5, 4, 4, 4, 4]), (dec!(4.3), 6));
        assert_eq!(rating_summary(&[1, 2]), (dec!(1.5), 2));
    }

    #[test]
    fn public_curriculum_hides_non_preview_videos() {
        let first = chapter(0);
        let lessons = vec![
            lesson(first.id, 1, 60, false),
            lesson(first.id, 0, 60, true),
        ];
        let public = build_curriculum(vec![first.clone()], lessons.clone(), false);
        assert_eq!(public[0].lessons.len(), 2);
        assert_eq!(public[0].lessons[0].position, 0);
        assert!(public[0].lessons[0].video_url.is_some());
        assert!(public[0].lessons[1].video_url.is_none());

        let managed = build_curriculum(vec![first], lessons, true);
        assert!(managed[0].lessons.iter().all(|l| l.video_url.is_some()));
    }

    #[test]
    fn prices_must_be_non_negative_cents() {
        assert!(check_price(dec!(0)).is_ok());
        assert!(check_price(dec!(49.99)).is_ok());
        assert!(check_price(dec!(10.500)).is_ok());
        assert!(check_price(dec!(-1)).is_err());
        assert!(check_price(dec!(1.999)).is_err());
    }
}
