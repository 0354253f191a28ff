pub mod admin;
pub mod auth;
pub mod common;
pub mod courses;
pub mod discounts;
pub mod enrollments;
pub mod payments;
pub mod users;

use crate::{
    auth::AuthService,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        admin::AdminService, courses::CourseService, discounts::DiscountService,
        enrollments::EnrollmentService, payments::CommissionPolicy, payments::PaymentService,
        users::UserService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub courses: Arc<CourseService>,
    pub enrollments: Arc<EnrollmentService>,
    pub payments: Arc<PaymentService>,
    pub discounts: Arc<DiscountService>,
    pub admin: Arc<AdminService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        let policy = CommissionPolicy::new(config.platform_commission_percent);

        Self {
            users: Arc::new(UserService::new(
                db_pool.clone(),
                event_sender.clone(),
                auth_service,
            )),
            courses: Arc::new(CourseService::new(db_pool.clone(), event_sender.clone())),
            enrollments: Arc::new(EnrollmentService::new(
                db_pool.clone(),
                event_sender.clone(),
                policy,
                config.default_currency.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                db_pool.clone(),
                event_sender.clone(),
                policy,
                config.refund_window_days,
            )),
            discounts: Arc::new(DiscountService::new(db_pool.clone(), event_sender.clone())),
            admin: Arc::new(AdminService::new(db_pool, event_sender)),
        }
    }
}
