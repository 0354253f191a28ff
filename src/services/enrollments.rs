use crate::{
    auth::AuthUser,
    entities::{
        cart_item, course, course_chapter, course_lesson,
        enrollment::{self, PaymentMethod, PaymentStatus},
        enrollment_lesson, user, wishlist_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        courses::{course_cards, load_managed_course, CourseCard},
        discounts,
        fetch_page, round_money,
        payments::CommissionPolicy,
        Page,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Percentage of `total` lessons completed, rounded half-up and clamped
/// to 0..=100. A course without lessons reports 0.
pub fn compute_progress(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let (completed, total) = (completed as u64, total as u64);
    let rounded = (200 * completed + total) / (2 * total);
    rounded.min(100) as i32
}

/// Completed count and watch time over the lessons the course still has.
fn tally_completed(
    entries: &[enrollment_lesson::Model],
    lesson_ids: &HashSet<Uuid>,
) -> (usize, i32) {
    entries
        .iter()
        .filter(|e| lesson_ids.contains(&e.lesson_id))
        .fold((0, 0), |(count, watched), e| (count + 1, watched + e.watch_time))
}

fn transaction_id() -> String {
    format!("TXN-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct EnrollRequest {
    #[validate(length(min = 1, max = 32, message = "Discount code must be 1-32 characters"))]
    pub discount_code: Option<String>,
    /// Defaults to `card`; zero-amount purchases are always `free`.
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CompleteLessonRequest {
    /// Seconds watched.
    #[validate(range(min = 0, max = 86400, message = "Watch time must be 0-86400 seconds"))]
    pub watch_time: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentSummary {
    pub id: Uuid,
    pub course: Option<CourseCard>,
    pub progress: i32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub payment_status: PaymentStatus,
    pub amount_paid: Decimal,
    pub currency: String,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
}

impl EnrollmentSummary {
    fn new(enrollment: &enrollment::Model, course: Option<CourseCard>) -> Self {
        Self {
            id: enrollment.id,
            course,
            progress: enrollment.progress,
            is_completed: enrollment.is_completed,
            completed_at: enrollment.completed_at,
            payment_status: enrollment.payment_status,
            amount_paid: enrollment.amount_paid,
            currency: enrollment.currency.clone(),
            enrolled_at: enrollment.enrolled_at,
            last_accessed_at: enrollment.last_accessed_at,
        }
    }
}

/// Full enrollment with its payment snapshot and completed lessons
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentDetail {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course: Option<CourseCard>,
    pub original_price: Decimal,
    pub discount_code: Option<String>,
    pub discount_amount: Decimal,
    pub amount_paid: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub progress: i32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_watch_time: i32,
    pub completed_lessons: Vec<Uuid>,
    pub enrolled_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl EnrollmentDetail {
    fn new(e: enrollment::Model, course: Option<CourseCard>, completed_lessons: Vec<Uuid>) -> Self {
        Self {
            id: e.id,
            student_id: e.student_id,
            course,
            original_price: e.original_price,
            discount_code: e.discount_code,
            discount_amount: e.discount_amount,
            amount_paid: e.amount_paid,
            currency: e.currency,
            payment_method: e.payment_method,
            payment_status: e.payment_status,
            transaction_id: e.transaction_id,
            progress: e.progress,
            is_completed: e.is_completed,
            completed_at: e.completed_at,
            total_watch_time: e.total_watch_time,
            completed_lessons,
            enrolled_at: e.enrolled_at,
            refunded_at: e.refunded_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentCheck {
    pub is_enrolled: bool,
    pub enrollment_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    pub progress: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LessonContent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub duration: i32,
    pub position: i32,
    pub is_preview: bool,
    pub is_completed: bool,
    pub watch_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChapterContent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub lessons: Vec<LessonContent>,
}

/// Everything a student needs to take the course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseContent {
    pub enrollment_id: Uuid,
    pub course_id: Uuid,
    pub title: String,
    pub progress: i32,
    pub is_completed: bool,
    pub total_watch_time: i32,
    pub chapters: Vec<ChapterContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LessonProgress {
    pub enrollment_id: Uuid,
    pub lesson_id: Uuid,
    pub progress: i32,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub total_watch_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseStudent {
    pub enrollment_id: Uuid,
    pub student_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub progress: i32,
    pub is_completed: bool,
    pub payment_status: PaymentStatus,
    pub amount_paid: Decimal,
    pub enrolled_at: DateTime<Utc>,
}

/// Service for purchases and learning progress
#[derive(Clone)]
pub struct EnrollmentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    policy: CommissionPolicy,
    currency: String,
}

impl EnrollmentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        policy: CommissionPolicy,
        currency: String,
    ) -> Self {
        Self {
            db,
            event_sender,
            policy,
            currency,
        }
    }

    async fn load_own(
        &self,
        actor: &AuthUser,
        enrollment_id: Uuid,
    ) -> Result<enrollment::Model, ServiceError> {
        let enrollment = enrollment::Entity::find_by_id(enrollment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Enrollment"))?;
        if !actor.can_manage(enrollment.student_id) {
            return Err(ServiceError::Forbidden(
                "This enrollment belongs to another student".into(),
            ));
        }
        Ok(enrollment)
    }

    /// Purchases a course. The coupon redemption, the enrollment row and all
    /// counter updates commit together or not at all.
    #[instrument(skip(self, request), fields(student = %actor.user_id))]
    pub async fn enroll(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        request: EnrollRequest,
    ) -> Result<EnrollmentDetail, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let course = course::Entity::find_by_id(course_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        if !course.is_listed() {
            return Err(ServiceError::BadRequest(
                "Course is not available for enrollment".into(),
            ));
        }
        if course.instructor_id == actor.user_id {
            return Err(ServiceError::BadRequest(
                "You cannot enroll in your own course".into(),
            ));
        }

        let existing = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(actor.user_id))
            .filter(enrollment::Column::CourseId.eq(course.id))
            .one(&txn)
            .await?;
        if let Some(existing) = existing {
            warn!(course_id = %course.id, status = %existing.payment_status, "duplicate enrollment attempt");
            return Err(ServiceError::Conflict(
                "Already enrolled in this course".into(),
            ));
        }

        let original_price = round_money(course.price);
        let coupon = match request.discount_code.as_deref() {
            Some(code) if !code.trim().is_empty() => {
                let (discount, amount_off) =
                    discounts::quote(&txn, code, course.id, original_price, now).await?;
                discounts::redeem(&txn, &discount).await?;
                Some((discount, amount_off))
            }
            _ => None,
        };
        let discount_amount = coupon.as_ref().map_or(Decimal::ZERO, |(_, off)| *off);
        let amount_paid = round_money((original_price - discount_amount).max(Decimal::ZERO));

        let payment_method = if amount_paid.is_zero() {
            PaymentMethod::Free
        } else {
            match request.payment_method {
                Some(PaymentMethod::Free) => {
                    return Err(ServiceError::BadRequest(
                        "A paid course cannot use the free payment method".into(),
                    ))
                }
                Some(method) => method,
                None => PaymentMethod::Card,
            }
        };
        let split = self.policy.split(amount_paid);

        let created = enrollment::ActiveModel {
            id: Set(Uuid::new_v4()),
            student_id: Set(actor.user_id),
            course_id: Set(course.id),
            instructor_id: Set(course.instructor_id),
            original_price: Set(original_price),
            discount_amount: Set(discount_amount),
            discount_code: Set(coupon.as_ref().map(|(d, _)| d.code.clone())),
            amount_paid: Set(amount_paid),
            platform_fee: Set(split.platform_fee),
            instructor_earning: Set(split.instructor_earning),
            currency: Set(self.currency.clone()),
            payment_method: Set(payment_method),
            payment_status: Set(PaymentStatus::Completed),
            transaction_id: Set(transaction_id()),
            progress: Set(0),
            is_completed: Set(false),
            completed_at: Set(None),
            total_watch_time: Set(0),
            last_accessed_at: Set(None),
            refunded_at: Set(None),
            refund_reason: Set(None),
            enrolled_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::conflict_on_unique(e, "Already enrolled in this course"))?;

        course::Entity::update_many()
            .col_expr(
                course::Column::TotalEnrollments,
                Expr::col(course::Column::TotalEnrollments).add(1),
            )
            .filter(course::Column::Id.eq(course.id))
            .exec(&txn)
            .await?;

        user::Entity::update_many()
            .col_expr(
                user::Column::TotalStudents,
                Expr::col(user::Column::TotalStudents).add(1),
            )
            .col_expr(
                user::Column::TotalRevenue,
                Expr::col(user::Column::TotalRevenue).add(split.instructor_earning),
            )
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(course.instructor_id))
            .exec(&txn)
            .await?;

        cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(actor.user_id))
            .filter(cart_item::Column::CourseId.eq(course.id))
            .exec(&txn)
            .await?;
        wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(actor.user_id))
            .filter(wishlist_item::Column::CourseId.eq(course.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        metrics::counter!("learnhub_enrollments_total", 1, "method" => payment_method.to_string());
        if let Some((discount, _)) = &coupon {
            metrics::counter!("learnhub_coupon_redemptions_total", 1);
            self.event_sender
                .publish(Event::CouponRedeemed {
                    discount_id: discount.id,
                    code: discount.code.clone(),
                })
                .await;
        }
        self.event_sender
            .publish(Event::StudentEnrolled {
                enrollment_id: created.id,
                course_id: course.id,
                student_id: actor.user_id,
                amount_paid,
            })
            .await;
        info!(
            enrollment_id = %created.id,
            course_id = %course.id,
            %amount_paid,
            "student enrolled"
        );

        let card = course_cards(&*self.db, vec![course]).await?.into_iter().next();
        Ok(EnrollmentDetail::new(created, card, Vec::new()))
    }

    #[instrument(skip(self), fields(student = %actor.user_id))]
    pub async fn my_enrollments(
        &self,
        actor: &AuthUser,
        page: u64,
        limit: u64,
    ) -> Result<Page<EnrollmentSummary>, ServiceError> {
        let select = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(actor.user_id))
            .order_by_desc(enrollment::Column::EnrolledAt);
        let page = fetch_page(&*self.db, select, page, limit).await?;

        let courses = course::Entity::find()
            .filter(course::Column::Id.is_in(page.items.iter().map(|e| e.course_id)))
            .all(&*self.db)
            .await?;
        let mut cards: HashMap<Uuid, CourseCard> = course_cards(&*self.db, courses)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(page.map(|e| {
            let card = cards.remove(&e.course_id);
            EnrollmentSummary::new(&e, card)
        }))
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn get_enrollment(
        &self,
        actor: &AuthUser,
        enrollment_id: Uuid,
    ) -> Result<EnrollmentDetail, ServiceError> {
        let enrollment = self.load_own(actor, enrollment_id).await?;
        let completed = completed_lessons(&*self.db, enrollment.id)
            .await?
            .into_iter()
            .map(|l| l.lesson_id)
            .collect();
        let course = course::Entity::find_by_id(enrollment.course_id)
            .one(&*self.db)
            .await?;
        let card = match course {
            Some(course) => course_cards(&*self.db, vec![course]).await?.into_iter().next(),
            None => None,
        };
        Ok(EnrollmentDetail::new(enrollment, card, completed))
    }

    /// `is_enrolled` is true only while the enrollment grants access.
    #[instrument(skip(self), fields(student = %actor.user_id))]
    pub async fn check_enrollment(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
    ) -> Result<EnrollmentCheck, ServiceError> {
        let enrollment = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(actor.user_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .one(&*self.db)
            .await?;

        Ok(match enrollment {
            Some(e) => EnrollmentCheck {
                is_enrolled: e.grants_access(),
                enrollment_id: Some(e.id),
                payment_status: Some(e.payment_status),
                progress: Some(e.progress),
            },
            None => EnrollmentCheck {
                is_enrolled: false,
                enrollment_id: None,
                payment_status: None,
                progress: None,
            },
        })
    }

    /// Full curriculum with video URLs, for students whose payment stands.
    #[instrument(skip(self), fields(student = %actor.user_id))]
    pub async fn course_content(
        &self,
        actor: &AuthUser,
        enrollment_id: Uuid,
    ) -> Result<CourseContent, ServiceError> {
        let enrollment = self.load_own(actor, enrollment_id).await?;
        if !enrollment.grants_access() {
            return Err(ServiceError::Forbidden(
                "This enrollment no longer grants access to the course".into(),
            ));
        }

        let course = course::Entity::find_by_id(enrollment.course_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Course"))?;
        let chapters = course_chapter::Entity::find()
            .filter(course_chapter::Column::CourseId.eq(course.id))
            .order_by_asc(course_chapter::Column::Position)
            .all(&*self.db)
            .await?;
        let lessons = course_lesson::Entity::find()
            .filter(course_lesson::Column::CourseId.eq(course.id))
            .order_by_asc(course_lesson::Column::Position)
            .all(&*self.db)
            .await?;
        let watched: HashMap<Uuid, i32> = completed_lessons(&*self.db, enrollment.id)
            .await?
            .into_iter()
            .map(|l| (l.lesson_id, l.watch_time))
            .collect();

        let chapters = chapters
            .into_iter()
            .map(|chapter| ChapterContent {
                lessons: lessons
                    .iter()
                    .filter(|l| l.chapter_id == chapter.id)
                    .map(|l| LessonContent {
                        id: l.id,
                        title: l.title.clone(),
                        description: l.description.clone(),
                        video_url: l.video_url.clone(),
                        duration: l.duration,
                        position: l.position,
                        is_preview: l.is_preview,
                        is_completed: watched.contains_key(&l.id),
                        watch_time: watched.get(&l.id).copied().unwrap_or(0),
                    })
                    .collect(),
                id: chapter.id,
                title: chapter.title,
                description: chapter.description,
                position: chapter.position,
            })
            .collect();

        let mut touched: enrollment::ActiveModel = enrollment.clone().into();
        touched.last_accessed_at = Set(Some(Utc::now()));
        touched.update(&*self.db).await?;

        Ok(CourseContent {
            enrollment_id: enrollment.id,
            course_id: course.id,
            title: course.title,
            progress: enrollment.progress,
            is_completed: enrollment.is_completed,
            total_watch_time: enrollment.total_watch_time,
            chapters,
        })
    }

    /// Marks a lesson complete and recomputes progress and watch time.
    #[instrument(skip(self, request), fields(student = %actor.user_id))]
    pub async fn complete_lesson(
        &self,
        actor: &AuthUser,
        enrollment_id: Uuid,
        lesson_id: Uuid,
        request: CompleteLessonRequest,
    ) -> Result<LessonProgress, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let enrollment = enrollment::Entity::find_by_id(enrollment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Enrollment"))?;
        if enrollment.student_id != actor.user_id {
            return Err(ServiceError::Forbidden(
                "This enrollment belongs to another student".into(),
            ));
        }
        if !enrollment.grants_access() {
            return Err(ServiceError::BadRequest(
                "Progress cannot be recorded on a refunded enrollment".into(),
            ));
        }

        let lesson_ids: HashSet<Uuid> = course_lesson::Entity::find()
            .filter(course_lesson::Column::CourseId.eq(enrollment.course_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        if !lesson_ids.contains(&lesson_id) {
            return Err(ServiceError::NotFound(
                "Lesson not found in this course".into(),
            ));
        }

        let watch_time = request.watch_time.unwrap_or(0);
        let entry = enrollment_lesson::Entity::find()
            .filter(enrollment_lesson::Column::EnrollmentId.eq(enrollment.id))
            .filter(enrollment_lesson::Column::LessonId.eq(lesson_id))
            .one(&txn)
            .await?;
        match entry {
            Some(entry) => {
                let mut entry: enrollment_lesson::ActiveModel = entry.into();
                entry.watch_time = Set(watch_time);
                entry.update(&txn).await?;
            }
            None => {
                enrollment_lesson::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    enrollment_id: Set(enrollment.id),
                    lesson_id: Set(lesson_id),
                    watch_time: Set(watch_time),
                    completed_at: Set(now),
                }
                .insert(&txn)
                .await
                .map_err(|e| ServiceError::conflict_on_unique(e, "Lesson already completed"))?;
            }
        }

        let entries = completed_lessons(&txn, enrollment.id).await?;
        let (completed, total_watch_time) = tally_completed(&entries, &lesson_ids);
        let progress = compute_progress(completed, lesson_ids.len());
        let finished_now = progress >= 100 && !enrollment.is_completed;

        let mut active: enrollment::ActiveModel = enrollment.clone().into();
        active.progress = Set(progress);
        active.total_watch_time = Set(total_watch_time);
        active.last_accessed_at = Set(Some(now));
        active.updated_at = Set(now);
        if finished_now {
            active.is_completed = Set(true);
            active.completed_at = Set(Some(now));
        }
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        debug!(%enrollment_id, %lesson_id, progress, "lesson completed");
        self.event_sender
            .publish(Event::LessonCompleted {
                enrollment_id,
                lesson_id,
                progress,
            })
            .await;
        if finished_now {
            info!(%enrollment_id, course_id = %updated.course_id, "course completed");
            self.event_sender
                .publish(Event::CourseCompleted {
                    enrollment_id,
                    course_id: updated.course_id,
                    student_id: updated.student_id,
                })
                .await;
        }

        Ok(LessonProgress {
            enrollment_id,
            lesson_id,
            progress: updated.progress,
            is_completed: updated.is_completed,
            completed_at: updated.completed_at,
            completed_lessons: completed,
            total_lessons: lesson_ids.len(),
            total_watch_time: updated.total_watch_time,
        })
    }

    /// Students of a course, visible to its instructor and admins.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn course_students(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<Page<CourseStudent>, ServiceError> {
        load_managed_course(&*self.db, actor, course_id).await?;

        let select = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(course_id))
            .order_by_desc(enrollment::Column::EnrolledAt);
        let page = fetch_page(&*self.db, select, page, limit).await?;

        let students: HashMap<Uuid, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(page.items.iter().map(|e| e.student_id)))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(page.map(|e| {
            let student = students.get(&e.student_id);
            CourseStudent {
                enrollment_id: e.id,
                student_id: e.student_id,
                name: student.map(|s| s.name.clone()),
                email: student.map(|s| s.email.clone()),
                progress: e.progress,
                is_completed: e.is_completed,
                payment_status: e.payment_status,
                amount_paid: e.amount_paid,
                enrolled_at: e.enrolled_at,
            }
        }))
    }
}

async fn completed_lessons<C: ConnectionTrait>(
    db: &C,
    enrollment_id: Uuid,
) -> Result<Vec<enrollment_lesson::Model>, ServiceError> {
    Ok(enrollment_lesson::Entity::find()
        .filter(enrollment_lesson::Column::EnrollmentId.eq(enrollment_id))
        .order_by_asc(enrollment_lesson::Column::CompletedAt)
        .all(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, 0)]
    #[case(3, 0, 0)]
    #[case(0, 4, 0)]
    #[case(1, 3, 33)]
    #[case(2, 3, 67)]
    #[case(1, 8, 13)]
    #[case(1, 200, 1)]
    #[case(4, 4, 100)]
    #[case(5, 4, 100)]
    fn progress_rounds_half_up(#[case] done: usize, #[case] total: usize, #[case] expected: i32) {
        assert_eq!(compute_progress(done, total), expected);
    }

    fn completed(lesson_id: Uuid, watch_time: i32) -> enrollment_lesson::Model {
        enrollment_lesson::Model {
            id: Uuid::new_v4(),
            enrollment_id: Uuid::nil(),
            lesson_id,
            watch_time,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn removed_lessons_drop_out_of_the_tally() {
        let kept = Uuid::new_v4();
        let removed = Uuid::new_v4();
        let entries = vec![completed(kept, 120), completed(removed, 600)];
        let lesson_ids: HashSet<Uuid> = [kept, Uuid::new_v4()].into_iter().collect();
        assert_eq!(tally_completed(&entries, &lesson_ids), (1, 120));
    }

    #[test]
    fn transaction_ids_are_unique_and_prefixed() {
        let a = transaction_id();
        let b = transaction_id();
        assert!(a.starts_with("TXN-"));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn progress_is_bounded_and_monotonic(total in 1usize..500, steps in 0usize..600) {
            let mut last = 0;
            for done in 0..=steps {
                let p = compute_progress(done, total);
                prop_assert!((0..=100).contains(&p));
                prop_assert!(p >= last);
                last = p;
            }
        }
    }
}
