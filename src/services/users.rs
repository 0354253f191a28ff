use crate::{
    auth::{hash_password, verify_password, AuthService, AuthUser, TokenResponse},
    entities::{
        cart_item, course,
        enrollment::{self, PaymentStatus},
        user::{self, UserRole},
        wishlist_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        courses::{course_cards, CourseCard},
        round_money,
    },
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Grace Hopper",
    "email": "grace@learnhub.dev",
    "password": "compilers-4-all",
    "role": "instructor"
}))]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
    /// `student` (default) or `instructor`.
    pub role: Option<UserRole>,
    #[validate(length(max = 120))]
    pub headline: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 100, message = "Name must be 2-100 characters"))]
    pub name: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    #[validate(length(max = 120))]
    pub headline: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

/// Account as returned to its owner and to admins
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub headline: Option<String>,
    pub is_active: bool,
    pub is_approved: bool,
    pub rejection_reason: Option<String>,
    pub total_students: i32,
    pub total_revenue: Decimal,
    pub total_courses: i32,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserProfile {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            avatar_url: u.avatar_url,
            bio: u.bio,
            headline: u.headline,
            is_active: u.is_active,
            is_approved: u.is_approved,
            rejection_reason: u.rejection_reason,
            total_students: u.total_students,
            total_revenue: u.total_revenue,
            total_courses: u.total_courses,
            created_at: u.created_at,
        }
    }
}

/// Result of register/login. Pending instructors get no token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthPayload {
    pub user: UserProfile,
    pub token: Option<TokenResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartView {
    pub items: Vec<CourseCard>,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InstructorProfile {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub headline: Option<String>,
    pub total_students: i32,
    pub total_courses: i32,
    pub courses: Vec<CourseCard>,
}

/// Instructor counters rebuilt from the rows they summarize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InstructorStats {
    pub total_students: i32,
    pub total_revenue: Decimal,
    pub total_courses: i32,
}

/// Recomputes an instructor's counters from completed enrollments and owned
/// courses, and stores them.
pub(crate) async fn recalculate_instructor_stats<C: ConnectionTrait>(
    db: &C,
    instructor_id: Uuid,
) -> Result<InstructorStats, ServiceError> {
    let paid = enrollment::Entity::find()
        .filter(enrollment::Column::InstructorId.eq(instructor_id))
        .filter(enrollment::Column::PaymentStatus.eq(PaymentStatus::Completed))
        .all(db)
        .await?;
    let total_courses = course::Entity::find()
        .filter(course::Column::InstructorId.eq(instructor_id))
        .count(db)
        .await?;

    let stats = InstructorStats {
        total_students: paid.len() as i32,
        total_revenue: round_money(paid.iter().map(|e| e.instructor_earning).sum()),
        total_courses: total_courses as i32,
    };

    if let Some(instructor) = user::Entity::find_by_id(instructor_id).one(db).await? {
        let mut active: user::ActiveModel = instructor.into();
        active.total_students = Set(stats.total_students);
        active.total_revenue = Set(stats.total_revenue);
        active.total_courses = Set(stats.total_courses);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
    }

    Ok(stats)
}

/// Service for accounts, profiles, wishlist and cart
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    auth: Arc<AuthService>,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        auth: Arc<AuthService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            auth,
        }
    }

    async fn load(&self, user_id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("User"))
    }

    /// Students are approved at once; instructors wait for an admin and
    /// receive no token until then.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthPayload, ServiceError> {
        request.validate()?;
        let role = request.role.unwrap_or(UserRole::Student);
        if role == UserRole::Admin {
            warn!("attempt to self-register an admin account");
            return Err(ServiceError::Forbidden(
                "Admin accounts cannot be self-registered".into(),
            ));
        }

        let email = normalize_email(&request.email);
        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db)
            .await?
            .is_some();
        if taken {
            return Err(ServiceError::Conflict("Email is already registered".into()));
        }

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.trim().to_string()),
            email: Set(email),
            password_hash: Set(hash_password(&request.password)?),
            role: Set(role),
            avatar_url: Set(None),
            bio: Set(None),
            headline: Set(request.headline),
            is_active: Set(true),
            is_approved: Set(role == UserRole::Student),
            rejection_reason: Set(None),
            total_students: Set(0),
            total_revenue: Set(Decimal::ZERO),
            total_courses: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::conflict_on_unique(e, "Email is already registered"))?;

        self.event_sender
            .publish(Event::UserRegistered {
                user_id: created.id,
                role,
            })
            .await;
        info!(user_id = %created.id, %role, "user registered");

        let token = if created.is_approved {
            Some(self.auth.generate_token(&created)?)
        } else {
            None
        };
        Ok(AuthPayload {
            user: created.into(),
            token,
        })
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthPayload, ServiceError> {
        request.validate()?;
        let invalid = || ServiceError::Unauthorized("Invalid email or password".into());

        let account = user::Entity::find()
            .filter(user::Column::Email.eq(normalize_email(&request.email)))
            .one(&*self.db)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&request.password, &account.password_hash)? {
            warn!(user_id = %account.id, "failed login");
            return Err(invalid());
        }
        if !account.is_active {
            return Err(ServiceError::Forbidden("Account is deactivated".into()));
        }
        if account.role == UserRole::Instructor && !account.is_approved {
            return Err(ServiceError::Forbidden(
                "Instructor account is pending approval".into(),
            ));
        }

        let token = self.auth.generate_token(&account)?;
        metrics::counter!("learnhub_logins_total", 1, "role" => account.role.to_string());
        info!(user_id = %account.id, "user logged in");
        Ok(AuthPayload {
            user: account.into(),
            token: Some(token),
        })
    }

    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn me(&self, actor: &AuthUser) -> Result<UserProfile, ServiceError> {
        Ok(self.load(actor.user_id).await?.into())
    }

    #[instrument(skip(self, request), fields(user = %actor.user_id))]
    pub async fn update_profile(
        &self,
        actor: &AuthUser,
        request: UpdateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        request.validate()?;
        let mut active: user::ActiveModel = self.load(actor.user_id).await?.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(url) = request.avatar_url {
            active.avatar_url = Set(Some(url));
        }
        if let Some(bio) = request.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(headline) = request.headline {
            active.headline = Set(Some(headline));
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?.into())
    }

    #[instrument(skip(self, request), fields(user = %actor.user_id))]
    pub async fn change_password(
        &self,
        actor: &AuthUser,
        request: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        request.validate()?;
        let account = self.load(actor.user_id).await?;
        if !verify_password(&request.current_password, &account.password_hash)? {
            return Err(ServiceError::BadRequest(
                "Current password is incorrect".into(),
            ));
        }

        let mut active: user::ActiveModel = account.into();
        active.password_hash = Set(hash_password(&request.new_password)?);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;
        info!(user_id = %actor.user_id, "password changed");
        Ok(())
    }

    async fn listed_course(&self, course_id: Uuid) -> Result<course::Model, ServiceError> {
        course::Entity::find_by_id(course_id)
            .one(&*self.db)
            .await?
            .filter(course::Model::is_listed)
            .ok_or_else(|| ServiceError::not_found("Course"))
    }

    async fn cards_for(&self, course_ids: Vec<Uuid>) -> Result<Vec<CourseCard>, ServiceError> {
        let mut courses = course::Entity::find()
            .filter(course::Column::Id.is_in(course_ids.iter().copied()))
            .all(&*self.db)
            .await?;
        courses.sort_by_key(|c| course_ids.iter().position(|id| *id == c.id));
        course_cards(&*self.db, courses).await
    }

    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn wishlist(&self, actor: &AuthUser) -> Result<Vec<CourseCard>, ServiceError> {
        let ids = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(actor.user_id))
            .order_by_desc(wishlist_item::Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|w| w.course_id)
            .collect();
        self.cards_for(ids).await
    }

    /// Adding a course twice is a no-op.
    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn add_to_wishlist(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
    ) -> Result<Vec<CourseCard>, ServiceError> {
        let course = self.listed_course(course_id).await?;
        let exists = wishlist_item::Entity::find()
            .filter(wishlist_item::Column::UserId.eq(actor.user_id))
            .filter(wishlist_item::Column::CourseId.eq(course.id))
            .one(&*self.db)
            .await?
            .is_some();
        if !exists {
            wishlist_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(actor.user_id),
                course_id: Set(course.id),
                created_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Course is already in your wishlist"))?;
        }
        self.wishlist(actor).await
    }

    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn remove_from_wishlist(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
    ) -> Result<Vec<CourseCard>, ServiceError> {
        let removed = wishlist_item::Entity::delete_many()
            .filter(wishlist_item::Column::UserId.eq(actor.user_id))
            .filter(wishlist_item::Column::CourseId.eq(course_id))
            .exec(&*self.db)
            .await?;
        if removed.rows_affected == 0 {
            return Err(ServiceError::NotFound(
                "Course is not in your wishlist".into(),
            ));
        }
        self.wishlist(actor).await
    }

    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn cart(&self, actor: &AuthUser) -> Result<CartView, ServiceError> {
        let ids = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(actor.user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| c.course_id)
            .collect();
        let items = self.cards_for(ids).await?;
        let total = round_money(items.iter().map(|c| c.price).sum());
        Ok(CartView { items, total })
    }

    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn add_to_cart(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let course = self.listed_course(course_id).await?;
        if course.instructor_id == actor.user_id {
            return Err(ServiceError::BadRequest(
                "You cannot buy your own course".into(),
            ));
        }
        let enrolled = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(actor.user_id))
            .filter(enrollment::Column::CourseId.eq(course.id))
            .one(&*self.db)
            .await?
            .is_some();
        if enrolled {
            return Err(ServiceError::Conflict(
                "Already enrolled in this course".into(),
            ));
        }

        let exists = cart_item::Entity::find()
            .filter(cart_item::Column::UserId.eq(actor.user_id))
            .filter(cart_item::Column::CourseId.eq(course.id))
            .one(&*self.db)
            .await?
            .is_some();
        if !exists {
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(actor.user_id),
                course_id: Set(course.id),
                created_at: Set(Utc::now()),
            }
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::conflict_on_unique(e, "Course is already in your cart"))?;
        }
        self.cart(actor).await
    }

    #[instrument(skip(self), fields(user = %actor.user_id))]
    pub async fn remove_from_cart(
        &self,
        actor: &AuthUser,
        course_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let removed = cart_item::Entity::delete_many()
            .filter(cart_item::Column::UserId.eq(actor.user_id))
            .filter(cart_item::Column::CourseId.eq(course_id))
            .exec(&*self.db)
            .await?;
        if removed.rows_affected == 0 {
            return Err(ServiceError::NotFound("Course is not in your cart".into()));
        }
        self.cart(actor).await
    }

    /// Public profile of an approved, active instructor.
    #[instrument(skip(self))]
    pub async fn instructor_profile(
        &self,
        instructor_id: Uuid,
    ) -> Result<InstructorProfile, ServiceError> {
        let instructor = user::Entity::find_by_id(instructor_id)
            .one(&*self.db)
            .await?
            .filter(|u| u.role == UserRole::Instructor && u.is_approved && u.is_active)
            .ok_or_else(|| ServiceError::not_found("Instructor"))?;

        let courses = course::Entity::find()
            .filter(course::Column::InstructorId.eq(instructor.id))
            .filter(course::Column::Status.eq(course::CourseStatus::Approved))
            .filter(course::Column::IsPublished.eq(true))
            .order_by_desc(course::Column::PublishedAt)
            .all(&*self.db)
            .await?;

        Ok(InstructorProfile {
            id: instructor.id,
            name: instructor.name,
            avatar_url: instructor.avatar_url,
            bio: instructor.bio,
            headline: instructor.headline,
            total_students: instructor.total_students,
            total_courses: courses.len() as i32,
            courses: course_cards(&*self.db, courses).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn register_request_validation() {
        let mut request = RegisterRequest {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password: "long-enough".into(),
            role: None,
            headline: None,
        };
        assert!(request.validate().is_ok());

        request.password = "short".into();
        request.email = "not-an-email".into();
        let err = ServiceError::from(request.validate().unwrap_err());
        match err {
            ServiceError::InvalidFields(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["email", "password"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn profile_never_exposes_password_hash() {
        let now = Utc::now();
        let model = user::Model {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "secret-hash".into(),
            role: UserRole::Student,
            avatar_url: None,
            bio: None,
            headline: None,
            is_active: true,
            is_approved: true,
            rejection_reason: None,
            total_students: 0,
            total_revenue: Decimal::ZERO,
            total_courses: 0,
            created_at: now,
            updated_at: now,
        };
        let raw = serde_json::to_string(&model).unwrap();
        assert!(!raw.contains("secret-hash"));
        let profile = serde_json::to_value(UserProfile::from(model)).unwrap();
        assert!(profile.get("password_hash").is_none());
        assert_eq!(profile["role"], "student");
    }
}
