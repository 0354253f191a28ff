use crate::{
    auth::AuthUser,
    entities::{
        course,
        enrollment::{self, PaymentMethod, PaymentStatus},
        user,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{fetch_page, round_money, Page},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Platform / instructor shares of one payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RevenueSplit {
    pub platform_fee: Decimal,
    pub instructor_earning: Decimal,
}

/// The single place where the platform commission is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommissionPolicy {
    platform_percent: Decimal,
}

impl CommissionPolicy {
    pub fn new(platform_percent: u8) -> Self {
        Self {
            platform_percent: Decimal::from(platform_percent.min(100)),
        }
    }

    pub fn platform_percent(&self) -> Decimal {
        self.platform_percent
    }

    /// The platform fee is rounded to cents; the instructor gets the rest,
    /// so the two parts always add up to `amount`.
    pub fn split(&self, amount: Decimal) -> RevenueSplit {
        let amount = round_money(amount.max(Decimal::ZERO));
        let platform_fee = round_money(amount * self.platform_percent / Decimal::ONE_HUNDRED);
        RevenueSplit {
            platform_fee,
            instructor_earning: amount - platform_fee,
        }
    }
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Whether `enrolled_at` is still inside a refund window of `days`.
pub fn within_refund_window(enrolled_at: DateTime<Utc>, days: u32, now: DateTime<Utc>) -> bool {
    now - enrolled_at <= Duration::days(i64::from(days))
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct RefundRequest {
    #[validate(length(max = 1000, message = "Reason is too long"))]
    pub reason: Option<String>,
}

/// One payment as shown in a student's history
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentRecord {
    pub enrollment_id: Uuid,
    pub course_id: Uuid,
    pub course_title: Option<String>,
    pub original_price: Decimal,
    pub discount_code: Option<String>,
    pub discount_amount: Decimal,
    pub amount_paid: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub transaction_id: String,
    pub enrolled_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub refund_reason: Option<String>,
}

impl PaymentRecord {
    fn new(enrollment: enrollment::Model, course: Option<course::Model>) -> Self {
        Self {
            enrollment_id: enrollment.id,
            course_id: enrollment.course_id,
            course_title: course.map(|c| c.title),
            original_price: enrollment.original_price,
            discount_code: enrollment.discount_code,
            discount_amount: enrollment.discount_amount,
            amount_paid: enrollment.amount_paid,
            currency: enrollment.currency,
            payment_method: enrollment.payment_method,
            payment_status: enrollment.payment_status,
            transaction_id: enrollment.transaction_id,
            enrolled_at: enrollment.enrolled_at,
            refunded_at: enrollment.refunded_at,
            refund_reason: enrollment.refund_reason,
        }
    }
}

/// Money totals folded from stored payment snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RevenueSummary {
    pub gross_revenue: Decimal,
    pub platform_commission: Decimal,
    pub instructor_payouts: Decimal,
    pub refunded_amount: Decimal,
    pub paid_enrollments: u64,
    pub refunds: u64,
}

impl RevenueSummary {
    fn add(&mut self, enrollment: &enrollment::Model) {
        match enrollment.payment_status {
            PaymentStatus::Completed => {
                self.gross_revenue += enrollment.amount_paid;
                self.platform_commission += enrollment.platform_fee;
                self.instructor_payouts += enrollment.instructor_earning;
                self.paid_enrollments += 1;
            }
            PaymentStatus::Refunded => {
                self.refunded_amount += enrollment.amount_paid;
                self.refunds += 1;
            }
            PaymentStatus::Pending | PaymentStatus::Failed => {}
        }
    }

    fn rounded(mut self) -> Self {
        self.gross_revenue = round_money(self.gross_revenue);
        self.platform_commission = round_money(self.platform_commission);
        self.instructor_payouts = round_money(self.instructor_payouts);
        self.refunded_amount = round_money(self.refunded_amount);
        self
    }
}

/// Sums completed and refunded payments. Refunded rows never count towards
/// revenue, so a refund cancels exactly what its purchase added.
pub fn summarize<'a>(enrollments: impl IntoIterator<Item = &'a enrollment::Model>) -> RevenueSummary {
    let mut summary = RevenueSummary::default();
    for enrollment in enrollments {
        summary.add(enrollment);
    }
    summary.rounded()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseEarnings {
    pub course_id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub students: u64,
    pub refunds: u64,
    pub gross_sales: Decimal,
    pub earnings: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InstructorEarnings {
    pub instructor_id: Uuid,
    pub platform_commission_percent: Decimal,
    pub total_earnings: Decimal,
    pub total_sales: Decimal,
    pub total_students: u64,
    pub refunded_amount: Decimal,
    pub courses: Vec<CourseEarnings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyRevenue {
    /// `YYYY-MM`
    pub month: String,
    pub revenue: Decimal,
    pub enrollments: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TopCourse {
    pub course_id: Uuid,
    pub title: Option<String>,
    pub enrollments: u64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlatformAnalytics {
    pub summary: RevenueSummary,
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub top_courses: Vec<TopCourse>,
}

/// Completed revenue bucketed by purchase month, oldest first.
pub fn revenue_by_month(enrollments: &[enrollment::Model]) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<String, (Decimal, u64)> = BTreeMap::new();
    for e in enrollments
        .iter()
        .filter(|e| e.payment_status == PaymentStatus::Completed)
    {
        let entry = months
            .entry(e.enrolled_at.format("%Y-%m").to_string())
            .or_default();
        entry.0 += e.amount_paid;
        entry.1 += 1;
    }
    months
        .into_iter()
        .map(|(month, (revenue, enrollments))| MonthlyRevenue {
            month,
            revenue: round_money(revenue),
            enrollments,
        })
        .collect()
}

const TOP_COURSES: usize = 5;

/// Service for payment history, refunds and revenue reporting
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    policy: CommissionPolicy,
    refund_window_days: u32,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        policy: CommissionPolicy,
        refund_window_days: u32,
    ) -> Self {
        Self {
            db,
            event_sender,
            policy,
            refund_window_days,
        }
    }

    pub fn policy(&self) -> CommissionPolicy {
        self.policy
    }

    #[instrument(skip(self), fields(student = %actor.user_id))]
    pub async fn payment_history(
        &self,
        actor: &AuthUser,
        page: u64,
        limit: u64,
    ) -> Result<Page<PaymentRecord>, ServiceError> {
        let select = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(actor.user_id))
            .order_by_desc(enrollment::Column::EnrolledAt);
        let page = fetch_page(&*self.db, select, page, limit).await?;

        let course_ids: Vec<Uuid> = page.items.iter().map(|e| e.course_id).collect();
        let mut courses: HashMap<Uuid, course::Model> = course::Entity::find()
            .filter(course::Column::Id.is_in(course_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(page.map(|e| {
            let course = courses.remove(&e.course_id);
            PaymentRecord::new(e, course)
        }))
    }

    /// Refunds a completed payment and reverses exactly what the purchase
    /// added to the course and instructor counters.
    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn refund(
        &self,
        actor: &AuthUser,
        enrollment_id: Uuid,
        request: RefundRequest,
    ) -> Result<PaymentRecord, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let existing = enrollment::Entity::find_by_id(enrollment_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Enrollment"))?;

        if !actor.is_admin() {
            if existing.student_id != actor.user_id {
                return Err(ServiceError::Forbidden(
                    "You can only refund your own purchases".into(),
                ));
            }
            if !within_refund_window(existing.enrolled_at, self.refund_window_days, now) {
                warn!(%enrollment_id, "refund requested after the refund window");
                return Err(ServiceError::BadRequest(format!(
                    "Refunds are only available within {} days of purchase",
                    self.refund_window_days
                )));
            }
        }
        if existing.payment_status != PaymentStatus::Completed {
            return Err(ServiceError::BadRequest(
                "Only completed payments can be refunded".into(),
            ));
        }

        let reason = request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        // Conditional on the status so two concurrent refunds reverse once.
        let marked = enrollment::Entity::update_many()
            .col_expr(
                enrollment::Column::PaymentStatus,
                Expr::value(PaymentStatus::Refunded),
            )
            .col_expr(enrollment::Column::RefundedAt, Expr::value(Some(now)))
            .col_expr(enrollment::Column::RefundReason, Expr::value(reason))
            .col_expr(enrollment::Column::UpdatedAt, Expr::value(now))
            .filter(enrollment::Column::Id.eq(existing.id))
            .filter(enrollment::Column::PaymentStatus.eq(PaymentStatus::Completed))
            .exec(&txn)
            .await?;
        if marked.rows_affected == 0 {
            return Err(ServiceError::BadRequest(
                "Only completed payments can be refunded".into(),
            ));
        }

        reverse_counters(&txn, &existing).await?;

        let refunded = enrollment::Entity::find_by_id(existing.id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Enrollment"))?;
        let course = course::Entity::find_by_id(refunded.course_id)
            .one(&txn)
            .await?;

        txn.commit().await?;

        metrics::counter!("learnhub_refunds_total", 1);
        self.event_sender
            .publish(Event::EnrollmentRefunded {
                enrollment_id: refunded.id,
                course_id: refunded.course_id,
                amount: refunded.amount_paid,
            })
            .await;
        info!(
            %enrollment_id,
            amount = %refunded.amount_paid,
            "enrollment refunded"
        );

        Ok(PaymentRecord::new(refunded, course))
    }

    #[instrument(skip(self), fields(instructor = %actor.user_id))]
    pub async fn instructor_earnings(
        &self,
        actor: &AuthUser,
    ) -> Result<InstructorEarnings, ServiceError> {
        let courses = course::Entity::find()
            .filter(course::Column::InstructorId.eq(actor.user_id))
            .order_by_asc(course::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        let enrollments = enrollment::Entity::find()
            .filter(enrollment::Column::InstructorId.eq(actor.user_id))
            .all(&*self.db)
            .await?;

        let totals = summarize(&enrollments);
        let per_course = courses
            .into_iter()
            .map(|c| {
                let summary = summarize(enrollments.iter().filter(|e| e.course_id == c.id));
                CourseEarnings {
                    course_id: c.id,
                    title: c.title,
                    price: c.price,
                    students: summary.paid_enrollments,
                    refunds: summary.refunds,
                    gross_sales: summary.gross_revenue,
                    earnings: summary.instructor_payouts,
                }
            })
            .collect();

        Ok(InstructorEarnings {
            instructor_id: actor.user_id,
            platform_commission_percent: self.policy.platform_percent(),
            total_earnings: totals.instructor_payouts,
            total_sales: totals.gross_revenue,
            total_students: totals.paid_enrollments,
            refunded_amount: totals.refunded_amount,
            courses: per_course,
        })
    }

    #[instrument(skip(self))]
    pub async fn platform_analytics(&self) -> Result<PlatformAnalytics, ServiceError> {
        let enrollments = enrollment::Entity::find()
            .order_by_asc(enrollment::Column::EnrolledAt)
            .all(&*self.db)
            .await?;

        let mut per_course: HashMap<Uuid, (u64, Decimal)> = HashMap::new();
        for e in enrollments
            .iter()
            .filter(|e| e.payment_status == PaymentStatus::Completed)
        {
            let entry = per_course.entry(e.course_id).or_default();
            entry.0 += 1;
            entry.1 += e.amount_paid;
        }
        let mut ranked: Vec<(Uuid, u64, Decimal)> = per_course
            .into_iter()
            .map(|(id, (n, revenue))| (id, n, revenue))
            .collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(b.1.cmp(&a.1)));
        ranked.truncate(TOP_COURSES);

        let titles: HashMap<Uuid, String> = course::Entity::find()
            .filter(course::Column::Id.is_in(ranked.iter().map(|r| r.0)))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.title))
            .collect();

        let top_courses = ranked
            .into_iter()
            .map(|(course_id, enrollments, revenue)| TopCourse {
                course_id,
                title: titles.get(&course_id).cloned(),
                enrollments,
                revenue: round_money(revenue),
            })
            .collect();

        Ok(PlatformAnalytics {
            summary: summarize(&enrollments),
            revenue_by_month: revenue_by_month(&enrollments),
            top_courses,
        })
    }
}

/// Takes one enrollment back out of the course and instructor counters.
pub(crate) async fn reverse_counters<C: ConnectionTrait>(
    db: &C,
    enrollment: &enrollment::Model,
) -> Result<(), ServiceError> {
    course::Entity::update_many()
        .col_expr(
            course::Column::TotalEnrollments,
            Expr::col(course::Column::TotalEnrollments).sub(1),
        )
        .filter(course::Column::Id.eq(enrollment.course_id))
        .filter(course::Column::TotalEnrollments.gt(0))
        .exec(db)
        .await?;

    user::Entity::update_many()
        .col_expr(
            user::Column::TotalStudents,
            Expr::col(user::Column::TotalStudents).sub(1),
        )
        .filter(user::Column::Id.eq(enrollment.instructor_id))
        .filter(user::Column::TotalStudents.gt(0))
        .exec(db)
        .await?;

    user::Entity::update_many()
        .col_expr(
            user::Column::TotalRevenue,
            Expr::col(user::Column::TotalRevenue).sub(enrollment.instructor_earning),
        )
        .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(user::Column::Id.eq(enrollment.instructor_id))
        .exec(db)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn paid(amount: Decimal, status: PaymentStatus, at: DateTime<Utc>) -> enrollment::Model {
        let split = CommissionPolicy::default().split(amount);
        enrollment::Model {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            instructor_id: Uuid::new_v4(),
            original_price: amount,
            discount_amount: Decimal::ZERO,
            discount_code: None,
            amount_paid: amount,
            platform_fee: split.platform_fee,
            instructor_earning: split.instructor_earning,
            currency: "USD".into(),
            payment_method: PaymentMethod::Card,
            payment_status: status,
            transaction_id: format!("TXN-{}", Uuid::new_v4()),
            progress: 0,
            is_completed: false,
            completed_at: None,
            total_watch_time: 0,
            last_accessed_at: None,
            refunded_at: None,
            refund_reason: None,
            enrolled_at: at,
            updated_at: at,
        }
    }

    #[rstest]
    #[case(10, dec!(100), dec!(10), dec!(90))]
    #[case(0, dec!(100), dec!(0), dec!(100))]
    #[case(100, dec!(49.99), dec!(49.99), dec!(0))]
    #[case(15, dec!(19.99), dec!(3.00), dec!(16.99))]
    #[case(10, dec!(0), dec!(0), dec!(0))]
    fn split_matches_policy(
        #[case] percent: u8,
        #[case] amount: Decimal,
        #[case] fee: Decimal,
        #[case] earning: Decimal,
    ) {
        let split = CommissionPolicy::new(percent).split(amount);
        assert_eq!(split.platform_fee, fee);
        assert_eq!(split.instructor_earning, earning);
    }

    #[test]
    fn refund_window_is_inclusive_in_days() {
        let enrolled = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert!(within_refund_window(enrolled, 30, enrolled + Duration::days(30)));
        assert!(!within_refund_window(
            enrolled,
            30,
            enrolled + Duration::days(30) + Duration::seconds(1)
        ));
        assert!(within_refund_window(enrolled, 0, enrolled));
    }

    #[test]
    fn refunded_rows_do_not_count_as_revenue() {
        let now = Utc::now();
        let rows = vec![
            paid(dec!(100), PaymentStatus::Completed, now),
            paid(dec!(50), PaymentStatus::Refunded, now),
            paid(dec!(20), PaymentStatus::Failed, now),
        ];
        let summary = summarize(&rows);
        assert_eq!(summary.gross_revenue, dec!(100));
        assert_eq!(summary.platform_commission, dec!(10));
        assert_eq!(summary.instructor_payouts, dec!(90));
        assert_eq!(summary.refunded_amount, dec!(50));
        assert_eq!(summary.paid_enrollments, 1);
        assert_eq!(summary.refunds, 1);
    }

    #[test]
    fn monthly_buckets_are_sorted() {
        let jan = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 3, 0, 0, 0).unwrap();
        let rows = vec![
            paid(dec!(30), PaymentStatus::Completed, feb),
            paid(dec!(10), PaymentStatus::Completed, jan),
            paid(dec!(15), PaymentStatus::Completed, jan),
            paid(dec!(99), PaymentStatus::Refunded, jan),
        ];
        let months = revenue_by_month(&rows);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2024-01");
        assert_eq!(months[0].revenue, dec!(25));
        assert_eq!(months[0].enrollments, 2);
        assert_eq!(months[1].month, "2024-02");
    }

    #[test]
    fn analytics_nest_the_revenue_summary() {
        let at = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let rows = vec![paid(dec!(100), PaymentStatus::Completed, at)];
        let analytics = PlatformAnalytics {
            summary: summarize(&rows),
            revenue_by_month: revenue_by_month(&rows),
            top_courses: Vec::new(),
        };
        let json = serde_json::to_value(&analytics).unwrap();
        let gross: Decimal = json["summary"]["gross_revenue"]
            .as_str()
            .and_then(|v| v.parse().ok())
            .unwrap();
        assert_eq!(gross, dec!(100));
        assert!(json.get("gross_revenue").is_none());
    }

    proptest! {
        #[test]
        fn split_parts_add_up(cents in 0i64..100_000_000, percent in 0u8..=100) {
            let amount = Decimal::new(cents, 2);
            let split = CommissionPolicy::new(percent).split(amount);
            prop_assert_eq!(split.platform_fee + split.instructor_earning, amount);
            prop_assert!(split.platform_fee >= Decimal::ZERO);
            prop_assert!(split.instructor_earning >= Decimal::ZERO);
        }
    }
}
