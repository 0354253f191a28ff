use crate::{
    auth::AuthUser,
    entities::{
        cart_item,
        course::{self, CourseStatus},
        course_review, discount, enrollment, enrollment_lesson,
        user::{self, UserRole},
        wishlist_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        courses::{course_cards, refresh_rating, remove_course, CourseCard},
        fetch_page,
        payments::{reverse_counters, summarize, RevenueSummary},
        users::UserProfile,
        Page,
    },
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub role: Option<UserRole>,
    /// Matches name or email.
    pub search: Option<String>,
    pub is_approved: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RejectRequest {
    #[validate(length(min = 3, max = 1000, message = "Reason must be 3-1000 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserCounts {
    pub total: u64,
    pub students: u64,
    pub instructors: u64,
    pub admins: u64,
    pub pending_instructors: u64,
    pub inactive: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CourseCounts {
    pub total: u64,
    pub draft: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub archived: u64,
    pub published: u64,
}

/// Admin dashboard figures
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardStats {
    pub users: UserCounts,
    pub courses: CourseCounts,
    pub total_enrollments: u64,
    pub revenue: RevenueSummary,
}

/// Service for moderation and platform-wide statistics
#[derive(Clone)]
pub struct AdminService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl AdminService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    async fn load_course(&self, course_id: Uuid) -> Result<course::Model, ServiceError> {
        course::Entity::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        query: UserListQuery,
        limit: u64,
    ) -> Result<Page<UserProfile>, ServiceError> {
        let mut select = user::Entity::find().order_by_desc(user::Column::CreatedAt);
        if let Some(role) = query.role {
            select = select.filter(user::Column::Role.eq(role));
        }
        if let Some(approved) = query.is_approved {
            select = select.filter(user::Column::IsApproved.eq(approved));
        }
        if let Some(active) = query.is_active {
            select = select.filter(user::Column::IsActive.eq(active));
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(user::Column::Name.contains(search))
                    .add(user::Column::Email.contains(search.to_lowercase())),
            );
        }

        let page = fetch_page(&*self.db, select, query.page.unwrap_or(1), limit).await?;
        Ok(page.map(UserProfile::from))
    }

    #[instrument(skip(self))]
    pub async fn approve_instructor(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        let account = self.load_user(user_id).await?;
        if account.role != UserRole::Instructor {
            return Err(ServiceError::InvalidOperation(
                "Only instructor accounts need approval".into(),
            ));
        }

        let mut active: user::ActiveModel = account.into();
        active.is_approved = Set(true);
        active.rejection_reason = Set(None);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender.publish(Event::InstructorApproved(user_id)).await;
        info!(%user_id, "instructor approved");
        Ok(updated.into())
    }

    #[instrument(skip(self, request))]
    pub async fn reject_instructor(
        &self,
        user_id: Uuid,
        request: RejectRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let account = self.load_user(user_id).await?;
        if account.role != UserRole::Instructor {
            return Err(ServiceError::InvalidOperation(
                "Only instructor accounts can be rejected".into(),
            ));
        }

        let mut active: user::ActiveModel = account.into();
        active.is_approved = Set(false);
        active.rejection_reason = Set(Some(request.reason.trim().to_string()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender.publish(Event::InstructorRejected(user_id)).await;
        info!(%user_id, "instructor rejected");
        Ok(updated.into())
    }

    /// Deactivated users are refused on their next request.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn set_user_status(
        &self,
        actor: &AuthUser,
        user_id: Uuid,
        request: UserStatusRequest,
    ) -> Result<UserProfile, ServiceError> {
        let account = self.load_user(user_id).await?;
        if account.id == actor.user_id {
            return Err(ServiceError::InvalidOperation(
                "You cannot change your own status".into(),
            ));
        }
        if account.is_admin() && !request.is_active {
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be deactivated".into(),
            ));
        }

        let mut active: user::ActiveModel = account.into();
        active.is_active = Set(request.is_active);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .publish(Event::UserStatusChanged {
                user_id,
                is_active: request.is_active,
            })
            .await;
        info!(%user_id, is_active = request.is_active, "user status changed");
        Ok(updated.into())
    }

    /// Removes a non-admin account with everything it owns. Purchases are
    /// backed out of the counters of the courses and instructors they fed.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let account = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))?;
        if account.is_admin() {
            warn!(%user_id, "refusing to delete admin account");
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be deleted".into(),
            ));
        }

        // Purchases made by this user.
        let purchases = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(user_id))
            .all(&txn)
            .await?;
        for purchase in purchases.iter().filter(|e| e.grants_access()) {
            reverse_counters(&txn, purchase).await?;
        }
        enrollment_lesson::Entity::delete_many()
            .filter(enrollment_lesson::Column::EnrollmentId.is_in(purchases.iter().map(|e| e.id)))
            .exec(&txn)
            .await?;
        enrollment::Entity::delete_many()
            .filter(enrollment::Column::StudentId.eq(user_id))
            .exec(&txn)
            .await?;

        // Reviews written by this user.
        let reviewed: BTreeSet<Uuid> = course_review::Entity::find()
            .filter(course_review::Column::UserId.eq(user_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|r| r.course_id)
            .collect();
        course_review::Entity::delete_many()
            .filter(course_review::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        for course_id in reviewed {
            refresh_rating(&txn, course_id).await?;
        }

        // Courses taught by this user.
        let owned = course::Entity::find()
            .filter(course::Column::InstructorId.eq(user_id))
            .all(&txn)
            .await?;
        for course in &owned {
            remove_course(&txn, course).await?;
        }

        wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;
        discount::Entity::delete_many()
            .filter(discount::Column::CreatedBy.eq(user_id))
            .exec(&txn)
            .await?;
        user::Entity::delete_by_id(user_id).exec(&txn).await?;

        txn.commit().await?;

        self.event_sender.publish(Event::UserDeleted(user_id)).await;
        info!(%user_id, courses_removed = owned.len(), "user deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn pending_courses(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<Page<CourseCard>, ServiceError> {
        let select = course::Entity::find()
            .filter(course::Column::Status.eq(CourseStatus::Pending))
            .order_by_asc(course::Column::UpdatedAt);
        let page = fetch_page(&*self.db, select, page, limit).await?;
        let cards = course_cards(&*self.db, page.items).await?;
        Ok(Page {
            items: cards,
            total: page.total,
            page: page.page,
            limit: page.limit,
        })
    }

    async fn transition_course(
        &self,
        course: course::Model,
        status: CourseStatus,
        reason: Option<String>,
    ) -> Result<CourseCard, ServiceError> {
        let mut active: course::ActiveModel = course.into();
        active.status = Set(status);
        active.rejection_reason = Set(reason);
        if status != CourseStatus::Approved {
            active.is_published = Set(false);
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        course_cards(&*self.db, vec![updated])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::InternalError("course vanished after update".into()))
    }

    #[instrument(skip(self))]
    pub async fn approve_course(&self, course_id: Uuid) -> Result<CourseCard, ServiceError> {
        let course = self.load_course(course_id).await?;
        if course.status != CourseStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Only pending courses can be approved (course is {})",
                course.status
            )));
        }
        let card = self
            .transition_course(course, CourseStatus::Approved, None)
            .await?;
        self.event_sender.publish(Event::CourseApproved(course_id)).await;
        info!(%course_id, "course approved");
        Ok(card)
    }

    #[instrument(skip(self, request))]
    pub async fn reject_course(
        &self,
        course_id: Uuid,
        request: RejectRequest,
    ) -> Result<CourseCard, ServiceError> {
        request.validate()?;
        let course = self.load_course(course_id).await?;
        if course.status != CourseStatus::Pending {
            return Err(ServiceError::InvalidOperation(format!(
                "Only pending courses can be rejected (course is {})",
                course.status
            )));
        }
        let card = self
            .transition_course(
                course,
                CourseStatus::Rejected,
                Some(request.reason.trim().to_string()),
            )
            .await?;
        self.event_sender.publish(Event::CourseRejected(course_id)).await;
        info!(%course_id, "course rejected");
        Ok(card)
    }

    /// Archived courses leave the catalog; existing students keep access.
    #[instrument(skip(self))]
    pub async fn archive_course(&self, course_id: Uuid) -> Result<CourseCard, ServiceError> {
        let course = self.load_course(course_id).await?;
        if course.status == CourseStatus::Archived {
            return Err(ServiceError::InvalidOperation(
                "Course is already archived".into(),
            ));
        }
        let card = self
            .transition_course(course, CourseStatus::Archived, None)
            .await?;
        self.event_sender.publish(Event::CourseArchived(course_id)).await;
        info!(%course_id, "course archived");
        Ok(card)
    }

    /// Deletes a course regardless of enrollments.
    #[instrument(skip(self))]
    pub async fn delete_course(&self, course_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let course = course::Entity::find_by_id(course_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        remove_course(&txn, &course).await?;
        txn.commit().await?;

        self.event_sender.publish(Event::CourseDeleted(course_id)).await;
        info!(%course_id, "course deleted by admin");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ServiceError> {
        let db = &*self.db;
        let count_role = |role: UserRole| {
            user::Entity::find()
                .filter(user::Column::Role.eq(role))
                .count(db)
        };
        let count_status = |status: CourseStatus| {
            course::Entity::find()
                .filter(course::Column::Status.eq(status))
                .count(db)
        };

        let users = UserCounts {
            total: user::Entity::find().count(db).await?,
            students: count_role(UserRole::Student).await?,
            instructors: count_role(UserRole::Instructor).await?,
            admins: count_role(UserRole::Admin).await?,
            pending_instructors: user::Entity::find()
                .filter(user::Column::Role.eq(UserRole::Instructor))
                .filter(user::Column::IsApproved.eq(false))
                .count(db)
                .await?,
            inactive: user::Entity::find()
                .filter(user::Column::IsActive.eq(false))
                .count(db)
                .await?,
        };

        let courses = CourseCounts {
            total: course::Entity::find().count(db).await?,
            draft: count_status(CourseStatus::Draft).await?,
            pending: count_status(CourseStatus::Pending).await?,
            approved: count_status(CourseStatus::Approved).await?,
            rejected: count_status(CourseStatus::Rejected).await?,
            archived: count_status(CourseStatus::Archived).await?,
            published: course::Entity::find()
                .filter(course::Column::IsPublished.eq(true))
                .count(db)
                .await?,
        };

        let enrollments = enrollment::Entity::find().all(db).await?;
        let revenue = summarize(&enrollments);
        metrics::gauge!(
            "learnhub_gross_revenue",
            revenue.gross_revenue.to_f64().unwrap_or_default()
        );

        Ok(DashboardStats {
            users,
            courses,
            total_enrollments: revenue.paid_enrollments,
            revenue,
        })
    }
}
