use crate::{
    auth::AuthUser,
    entities::{
        course,
        discount::{self, DiscountType},
        IdList,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{fetch_page, round_money, Page},
};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// True while the coupon is switched on, inside its window and not used up.
pub fn is_valid(discount: &discount::Model, now: DateTime<Utc>) -> bool {
    discount.is_active
        && discount.valid_from <= now
        && now <= discount.valid_until
        && discount
            .usage_limit
            .map_or(true, |limit| discount.used_count < limit)
}

/// A coupon without course scoping applies everywhere.
pub fn applies_to_course(discount: &discount::Model, course_id: Uuid) -> bool {
    match &discount.applicable_courses {
        Some(list) if !list.0.is_empty() => list.contains(&course_id),
        _ => true,
    }
}

/// Amount taken off `amount` by this coupon at `now`, rounded to cents.
pub fn calculate_discount(discount: &discount::Model, amount: Decimal, now: DateTime<Utc>) -> Decimal {
    if !is_valid(discount, now) || amount < discount.min_order_amount {
        return Decimal::ZERO;
    }

    let raw = match discount.discount_type {
        DiscountType::Percentage => amount * discount.value / Decimal::ONE_HUNDRED,
        DiscountType::Fixed => discount.value,
    };

    let limit = match discount.max_discount_amount {
        Some(max) => amount.min(max),
        None => amount,
    };
    let limit = limit.round_dp_with_strategy(2, RoundingStrategy::ToZero);

    round_money(raw).min(limit).max(Decimal::ZERO)
}

fn has_sub_cents(value: Decimal) -> bool {
    value != value.round_dp(2)
}

pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate_code_chars(code: &str) -> Result<(), validator::ValidationError> {
    if code
        .trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        let mut err = validator::ValidationError::new("code_chars");
        err.message = Some("Code may contain only letters, digits, '-' and '_'".into());
        Err(err)
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDiscountRequest {
    #[validate(
        length(min = 3, max = 32, message = "Code must be 3-32 characters"),
        custom = "validate_code_chars"
    )]
    pub code: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: DateTime<Utc>,
    pub is_active: Option<bool>,
    pub applicable_courses: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDiscountRequest {
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub min_order_amount: Option<Decimal>,
    pub max_discount_amount: Option<Decimal>,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub applicable_courses: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ValidateDiscountRequest {
    #[validate(length(min = 1, message = "Code is required"))]
    pub code: String,
    pub course_id: Uuid,
}

/// Price quote for a coupon applied to one course
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DiscountQuote {
    pub discount_id: Uuid,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub message: String,
}

/// Checks the value/window rules shared by create and update.
fn check_terms(
    discount_type: DiscountType,
    value: Decimal,
    min_order_amount: Decimal,
    max_discount_amount: Option<Decimal>,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if value <= Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Discount value must be greater than zero".into(),
        ));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(ServiceError::ValidationError(
            "Percentage discount cannot exceed 100".into(),
        ));
    }
    if min_order_amount < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Minimum order amount cannot be negative".into(),
        ));
    }
    if matches!(max_discount_amount, Some(max) if max <= Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "Maximum discount amount must be greater than zero".into(),
        ));
    }
    let fixed_value = (discount_type == DiscountType::Fixed).then_some(value);
    if [fixed_value, Some(min_order_amount), max_discount_amount]
        .into_iter()
        .flatten()
        .any(has_sub_cents)
    {
        return Err(ServiceError::ValidationError(
            "Amounts can have at most two decimal places".into(),
        ));
    }
    if valid_until <= valid_from {
        return Err(ServiceError::ValidationError(
            "valid_until must be after valid_from".into(),
        ));
    }
    Ok(())
}

/// Loads the coupon for `code` and prices it against one course.
/// Every rejection is a 400 except an unknown code.
pub(crate) async fn quote<C: ConnectionTrait>(
    db: &C,
    code: &str,
    course_id: Uuid,
    amount: Decimal,
    now: DateTime<Utc>,
) -> Result<(discount::Model, Decimal), ServiceError> {
    let code = normalize_code(code);
    let discount = discount::Entity::find()
        .filter(discount::Column::Code.eq(code.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("Discount code"))?;

    if !is_valid(&discount, now) {
        warn!(code = %discount.code, "discount code is not currently valid");
        return Err(ServiceError::BadRequest(
            "Discount code is expired, inactive or fully used".into(),
        ));
    }
    if !applies_to_course(&discount, course_id) {
        return Err(ServiceError::BadRequest(
            "Discount code does not apply to this course".into(),
        ));
    }
    if amount < discount.min_order_amount {
        return Err(ServiceError::BadRequest(format!(
            "Minimum order amount of {} required for this code",
            round_money(discount.min_order_amount)
        )));
    }

    let amount_off = calculate_discount(&discount, amount, now);
    Ok((discount, amount_off))
}

/// Claims one use of the coupon. The conditional update keeps `used_count`
/// at or below `usage_limit` under concurrent checkouts.
pub(crate) async fn redeem<C: ConnectionTrait>(
    db: &C,
    discount: &discount::Model,
) -> Result<(), ServiceError> {
    let mut update = discount::Entity::update_many()
        .col_expr(
            discount::Column::UsedCount,
            Expr::col(discount::Column::UsedCount).add(1),
        )
        .col_expr(discount::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(discount::Column::Id.eq(discount.id));

    if discount.usage_limit.is_some() {
        update = update.filter(
            Expr::col(discount::Column::UsedCount).lt(Expr::col(discount::Column::UsageLimit)),
        );
    }

    let result = update.exec(db).await?;
    if result.rows_affected == 0 {
        warn!(code = %discount.code, "discount usage limit reached during checkout");
        return Err(ServiceError::BadRequest(
            "Discount code has reached its usage limit".into(),
        ));
    }
    Ok(())
}

/// Service for coupon management and pricing
#[derive(Clone)]
pub struct DiscountService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl DiscountService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Instructors may only scope coupons to courses they own.
    async fn check_course_scope(
        &self,
        actor: &AuthUser,
        courses: &[Uuid],
    ) -> Result<(), ServiceError> {
        if actor.is_admin() {
            return Ok(());
        }
        if courses.is_empty() {
            return Err(ServiceError::Forbidden(
                "Instructors must limit discounts to their own courses".into(),
            ));
        }
        let owned = course::Entity::find()
            .filter(course::Column::Id.is_in(courses.iter().copied()))
            .filter(course::Column::InstructorId.eq(actor.user_id))
            .all(&*self.db)
            .await?;
        if owned.len() != courses.len() {
            return Err(ServiceError::Forbidden(
                "Discounts can only target your own courses".into(),
            ));
        }
        Ok(())
    }

    async fn load_owned(&self, actor: &AuthUser, id: Uuid) -> Result<discount::Model, ServiceError> {
        let discount = discount::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Discount"))?;
        if !actor.can_manage(discount.created_by) {
            return Err(ServiceError::Forbidden(
                "You can only manage discounts you created".into(),
            ));
        }
        Ok(discount)
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn create_discount(
        &self,
        actor: &AuthUser,
        request: CreateDiscountRequest,
    ) -> Result<discount::Model, ServiceError> {
        request.validate()?;

        let now = Utc::now();
        let valid_from = request.valid_from.unwrap_or(now);
        let min_order_amount = request.min_order_amount.unwrap_or(Decimal::ZERO);
        check_terms(
            request.discount_type,
            request.value,
            min_order_amount,
            request.max_discount_amount,
            valid_from,
            request.valid_until,
        )?;

        let courses = request.applicable_courses.unwrap_or_default();
        self.check_course_scope(actor, &courses).await?;

        let code = normalize_code(&request.code);
        let model = discount::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.clone()),
            description: Set(request.description),
            discount_type: Set(request.discount_type),
            value: Set(request.value),
            min_order_amount: Set(min_order_amount),
            max_discount_amount: Set(request.max_discount_amount),
            usage_limit: Set(request.usage_limit),
            used_count: Set(0),
            valid_from: Set(valid_from),
            valid_until: Set(request.valid_until),
            is_active: Set(request.is_active.unwrap_or(true)),
            applicable_courses: Set((!courses.is_empty()).then(|| IdList(courses))),
            created_by: Set(actor.user_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            ServiceError::conflict_on_unique(e, format!("Discount code {} already exists", code))
        })?;

        info!(discount_id = %model.id, code = %model.code, "discount created");
        self.event_sender
            .publish(Event::DiscountCreated {
                discount_id: model.id,
                code: model.code.clone(),
            })
            .await;
        Ok(model)
    }

    /// Admins see every coupon, instructors only their own.
    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn list_discounts(
        &self,
        actor: &AuthUser,
        page: u64,
        limit: u64,
    ) -> Result<Page<discount::Model>, ServiceError> {
        let mut select = discount::Entity::find().order_by_desc(discount::Column::CreatedAt);
        if !actor.is_admin() {
            select = select.filter(discount::Column::CreatedBy.eq(actor.user_id));
        }
        Ok(fetch_page(&*self.db, select, page, limit).await?)
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn get_discount(
        &self,
        actor: &AuthUser,
        id: Uuid,
    ) -> Result<discount::Model, ServiceError> {
        self.load_owned(actor, id).await
    }

    #[instrument(skip(self, request), fields(actor = %actor.user_id))]
    pub async fn update_discount(
        &self,
        actor: &AuthUser,
        id: Uuid,
        request: UpdateDiscountRequest,
    ) -> Result<discount::Model, ServiceError> {
        request.validate()?;
        let existing = self.load_owned(actor, id).await?;

        // Stored amounts come back from the column type; only new input is held to cents.
        let value = request.value.unwrap_or(match existing.discount_type {
            DiscountType::Fixed => round_money(existing.value),
            DiscountType::Percentage => existing.value,
        });
        let min_order_amount = request
            .min_order_amount
            .unwrap_or_else(|| round_money(existing.min_order_amount));
        let max_discount_amount = request
            .max_discount_amount
            .or(existing.max_discount_amount.map(round_money));
        let valid_from = request.valid_from.unwrap_or(existing.valid_from);
        let valid_until = request.valid_until.unwrap_or(existing.valid_until);
        check_terms(
            existing.discount_type,
            value,
            min_order_amount,
            max_discount_amount,
            valid_from,
            valid_until,
        )?;

        if let Some(limit) = request.usage_limit {
            if limit < existing.used_count {
                return Err(ServiceError::ValidationError(format!(
                    "Usage limit cannot be below the {} uses already made",
                    existing.used_count
                )));
            }
        }

        let mut active: discount::ActiveModel = existing.into();
        if let Some(courses) = request.applicable_courses {
            self.check_course_scope(actor, &courses).await?;
            active.applicable_courses = Set((!courses.is_empty()).then(|| IdList(courses)));
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(limit) = request.usage_limit {
            active.usage_limit = Set(Some(limit));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.value = Set(value);
        active.min_order_amount = Set(min_order_amount);
        active.max_discount_amount = Set(max_discount_amount);
        active.valid_from = Set(valid_from);
        active.valid_until = Set(valid_until);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;
        info!(discount_id = %updated.id, "discount updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(actor = %actor.user_id))]
    pub async fn delete_discount(&self, actor: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.load_owned(actor, id).await?;
        discount::Entity::delete_by_id(existing.id)
            .exec(&*self.db)
            .await?;
        info!(discount_id = %id, code = %existing.code, "discount deleted");
        Ok(())
    }

    /// Prices a code against a listed course without redeeming it.
    #[instrument(skip(self, request))]
    pub async fn validate_code(
        &self,
        request: ValidateDiscountRequest,
    ) -> Result<DiscountQuote, ServiceError> {
        request.validate()?;

        let course = course::Entity::find_by_id(request.course_id)
            .one(&*self.db)
            .await?
            .filter(course::Model::is_listed)
            .ok_or_else(|| ServiceError::not_found("Course"))?;

        let (discount, amount_off) =
            quote(&*self.db, &request.code, course.id, course.price, Utc::now()).await?;
        debug!(code = %discount.code, %amount_off, "discount quoted");

        Ok(DiscountQuote {
            discount_id: discount.id,
            code: discount.code,
            discount_type: discount.discount_type,
            value: discount.value,
            original_amount: round_money(course.price),
            discount_amount: amount_off,
            final_amount: round_money(course.price - amount_off),
            message: "Discount code applied".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn coupon(discount_type: DiscountType, value: Decimal) -> discount::Model {
        let now = Utc::now();
        discount::Model {
            id: Uuid::new_v4(),
            code: "SAVE".into(),
            description: None,
            discount_type,
            value,
            min_order_amount: Decimal::ZERO,
            max_discount_amount: None,
            usage_limit: None,
            used_count: 0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            is_active: true,
            applicable_courses: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ten_percent_of_hundred_is_ten() {
        let d = coupon(DiscountType::Percentage, dec!(10));
        let off = calculate_discount(&d, dec!(100), Utc::now());
        assert_eq!(off, dec!(10));
        assert_eq!(dec!(100) - off, dec!(90));
    }

    #[test]
    fn below_minimum_order_gives_nothing() {
        let mut d = coupon(DiscountType::Fixed, dec!(15));
        d.min_order_amount = dec!(50);
        assert_eq!(calculate_discount(&d, dec!(40), Utc::now()), Decimal::ZERO);
        assert_eq!(calculate_discount(&d, dec!(50), Utc::now()), dec!(15));
    }

    #[rstest]
    #[case::inactive(|d: &mut discount::Model| d.is_active = false)]
    #[case::not_started(|d: &mut discount::Model| d.valid_from = Utc::now() + Duration::hours(1))]
    #[case::expired(|d: &mut discount::Model| d.valid_until = Utc::now() - Duration::hours(1))]
    #[case::used_up(|d: &mut discount::Model| { d.usage_limit = Some(3); d.used_count = 3; })]
    fn invalid_coupons_give_nothing(#[case] tweak: fn(&mut discount::Model)) {
        let mut d = coupon(DiscountType::Percentage, dec!(20));
        tweak(&mut d);
        let now = Utc::now();
        assert!(!is_valid(&d, now));
        assert_eq!(calculate_discount(&d, dec!(100), now), Decimal::ZERO);
    }

    #[test]
    fn cap_and_amount_bound_the_discount() {
        let mut d = coupon(DiscountType::Percentage, dec!(50));
        d.max_discount_amount = Some(dec!(20));
        assert_eq!(calculate_discount(&d, dec!(100), Utc::now()), dec!(20));

        let big = coupon(DiscountType::Fixed, dec!(80));
        assert_eq!(calculate_discount(&big, dec!(30), Utc::now()), dec!(30));
    }

    #[test]
    fn percentage_rounds_to_cents() {
        let d = coupon(DiscountType::Percentage, dec!(15));
        assert_eq!(calculate_discount(&d, dec!(19.99), Utc::now()), dec!(3.00));
        let d = coupon(DiscountType::Percentage, dec!(33));
        assert_eq!(calculate_discount(&d, dec!(9.99), Utc::now()), dec!(3.30));
    }

    #[test]
    fn course_scoping() {
        let course = Uuid::new_v4();
        let mut d = coupon(DiscountType::Fixed, dec!(5));
        assert!(applies_to_course(&d, course));
        d.applicable_courses = Some(IdList(vec![]));
        assert!(applies_to_course(&d, course));
        d.applicable_courses = Some(IdList(vec![Uuid::new_v4()]));
        assert!(!applies_to_course(&d, course));
        d.applicable_courses = Some(IdList(vec![course]));
        assert!(applies_to_course(&d, course));
    }

    #[test]
    fn codes_are_normalized_to_upper_case() {
        assert_eq!(normalize_code("  spring-24 "), "SPRING-24");
        assert!(validate_code_chars("SPRING_24").is_ok());
        assert!(validate_code_chars("NO SPACES").is_err());
    }

    #[test]
    fn terms_reject_bad_windows_and_values() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        assert!(check_terms(DiscountType::Fixed, dec!(5), dec!(0), None, now, later).is_ok());
        assert!(check_terms(DiscountType::Fixed, dec!(0), dec!(0), None, now, later).is_err());
        assert!(
            check_terms(DiscountType::Percentage, dec!(101), dec!(0), None, now, later).is_err()
        );
        assert!(check_terms(DiscountType::Fixed, dec!(5), dec!(0), None, later, now).is_err());
    }

    #[rstest]
    #[case::fixed_value(DiscountType::Fixed, dec!(4.999), dec!(0), None)]
    #[case::minimum(DiscountType::Percentage, dec!(10), dec!(20.001), None)]
    #[case::maximum(DiscountType::Percentage, dec!(10), dec!(0), Some(dec!(0.005)))]
    fn terms_reject_sub_cent_amounts(
        #[case] kind: DiscountType,
        #[case] value: Decimal,
        #[case] min_order: Decimal,
        #[case] max: Option<Decimal>,
    ) {
        let now = Utc::now();
        let result = check_terms(kind, value, min_order, max, now, now + Duration::days(1));
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[test]
    fn percentage_value_may_carry_fractions() {
        let now = Utc::now();
        let later = now + Duration::days(1);
        assert!(
            check_terms(DiscountType::Percentage, dec!(12.5), dec!(0), None, now, later).is_ok()
        );
    }

    #[test]
    fn rounding_never_lifts_the_discount_over_its_cap() {
        let mut d = coupon(DiscountType::Percentage, dec!(50));
        d.max_discount_amount = Some(dec!(0.005));
        assert_eq!(calculate_discount(&d, dec!(100), Utc::now()), dec!(0));

        let mut d = coupon(DiscountType::Fixed, dec!(10));
        d.max_discount_amount = Some(dec!(7.499));
        assert_eq!(calculate_discount(&d, dec!(100), Utc::now()), dec!(7.49));
    }

    fn money() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #[test]
        fn discount_is_bounded(
            amount in money(),
            value in 1i64..20_000,
            percentage in any::<bool>(),
            cap in proptest::option::of(1i64..500_000),
        ) {
            let (kind, value) = if percentage {
                (DiscountType::Percentage, Decimal::new(value % 10_000 + 1, 2))
            } else {
                (DiscountType::Fixed, Decimal::new(value, 2))
            };
            let mut d = coupon(kind, value);
            d.max_discount_amount = cap.map(|c| Decimal::new(c, 2));

            let off = calculate_discount(&d, amount, Utc::now());
            prop_assert!(off >= Decimal::ZERO);
            prop_assert!(off <= amount);
            if let Some(max) = d.max_discount_amount {
                prop_assert!(off <= max);
            }
        }
    }
}
