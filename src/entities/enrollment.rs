use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

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
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "refunded")]
    Refunded,
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
pub enum PaymentMethod {
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "paypal")]
    Paypal,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "free")]
    Free,
}

/// A student's purchase of one course, with the payment snapshot taken at
/// checkout and the learning progress since.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    /// Course owner at purchase time; earnings are attributed here.
    pub instructor_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub original_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub discount_amount: Decimal,
    #[sea_orm(nullable)]
    pub discount_code: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount_paid: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub platform_fee: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub instructor_earning: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[sea_orm(unique)]
    pub transaction_id: String,
    pub progress: i32,
    pub is_completed: bool,
    #[sea_orm(nullable)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Seconds, summed over completed lessons.
    pub total_watch_time: i32,
    #[sea_orm(nullable)]
    pub last_accessed_at: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub refunded_at: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Text", nullable)]
    pub refund_reason: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Content access is granted only while the payment stands.
    pub fn grants_access(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Student,
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id",
        on_delete = "Cascade"
    )]
    Course,
    #[sea_orm(has_many = "super::enrollment_lesson::Entity")]
    CompletedLessons,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::enrollment_lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CompletedLessons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
