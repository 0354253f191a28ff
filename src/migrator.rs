use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_course_tables::Migration),
            Box::new(m20240101_000003_create_course_reviews_table::Migration),
            Box::new(m20240101_000004_create_enrollment_tables::Migration),
            Box::new(m20240101_000005_create_discounts_table::Migration),
            Box::new(m20240101_000006_create_wishlist_and_cart_tables::Migration),
        ]
    }
}

async fn create_unique_index(
    manager: &SchemaManager<'_>,
    name: &str,
    table: impl IntoIden + 'static,
    cols: Vec<DynIden>,
) -> Result<(), DbErr> {
    let mut index = Index::create();
    index.if_not_exists().name(name).table(table).unique();
    for col in cols {
        index.col(col);
    }
    manager.create_index(index.to_owned()).await
}

async fn create_index(
    manager: &SchemaManager<'_>,
    name: &str,
    table: impl IntoIden + 'static,
    col: impl IntoIden + 'static,
) -> Result<(), DbErr> {
    manager
        .create_index(
            Index::create()
                .if_not_exists()
                .name(name)
                .table(table)
                .col(col)
                .to_owned(),
        )
        .await
}

mod m20240101_000001_create_users_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Users::Name).string_len(100).not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).text().not_null())
                        .col(ColumnDef::new(Users::Role).string_len(20).not_null())
                        .col(ColumnDef::new(Users::AvatarUrl).string().null())
                        .col(ColumnDef::new(Users::Bio).text().null())
                        .col(ColumnDef::new(Users::Headline).string().null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::IsApproved)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Users::RejectionReason).text().null())
                        .col(
                            ColumnDef::new(Users::TotalStudents)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Users::TotalRevenue)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Users::TotalCourses)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(manager, "idx_users_role", Users::Table, Users::Role).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000002_create_course_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_course_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Courses::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Courses::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Courses::InstructorId).uuid().not_null())
                        .col(ColumnDef::new(Courses::Title).string_len(200).not_null())
                        .col(ColumnDef::new(Courses::Subtitle).string_len(300).null())
                        .col(ColumnDef::new(Courses::Description).text().not_null())
                        .col(ColumnDef::new(Courses::Category).string_len(100).not_null())
                        .col(ColumnDef::new(Courses::Level).string_len(20).not_null())
                        .col(ColumnDef::new(Courses::Language).string_len(50).not_null())
                        .col(
                            ColumnDef::new(Courses::Price)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Courses::ThumbnailUrl).string().null())
                        .col(ColumnDef::new(Courses::PreviewVideoUrl).string().null())
                        .col(ColumnDef::new(Courses::Requirements).json().not_null())
                        .col(ColumnDef::new(Courses::WhatYouWillLearn).json().not_null())
                        .col(ColumnDef::new(Courses::TargetAudience).json().not_null())
                        .col(ColumnDef::new(Courses::Tags).json().not_null())
                        .col(ColumnDef::new(Courses::Status).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Courses::IsPublished)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Courses::PublishedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Courses::RejectionReason).text().null())
                        .col(
                            ColumnDef::new(Courses::TotalDuration)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::TotalLessons)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::TotalEnrollments)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::Rating)
                                .decimal_len(5, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::TotalReviews)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Courses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Courses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_courses_instructor_id")
                                .from(Courses::Table, Courses::InstructorId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_courses_instructor_id",
                Courses::Table,
                Courses::InstructorId,
            )
            .await?;
            create_index(manager, "idx_courses_status", Courses::Table, Courses::Status).await?;
            create_index(
                manager,
                "idx_courses_category",
                Courses::Table,
                Courses::Category,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CourseChapters::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CourseChapters::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CourseChapters::CourseId).uuid().not_null())
                        .col(
                            ColumnDef::new(CourseChapters::Title)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CourseChapters::Description).text().null())
                        .col(
                            ColumnDef::new(CourseChapters::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CourseChapters::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CourseChapters::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_course_chapters_course_id")
                                .from(CourseChapters::Table, CourseChapters::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_course_chapters_course_id",
                CourseChapters::Table,
                CourseChapters::CourseId,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CourseLessons::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CourseLessons::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CourseLessons::CourseId).uuid().not_null())
                        .col(ColumnDef::new(CourseLessons::ChapterId).uuid().not_null())
                        .col(
                            ColumnDef::new(CourseLessons::Title)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CourseLessons::Description).text().null())
                        .col(ColumnDef::new(CourseLessons::VideoUrl).string().null())
                        .col(
                            ColumnDef::new(CourseLessons::Duration)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CourseLessons::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CourseLessons::IsPreview)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(CourseLessons::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CourseLessons::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_course_lessons_course_id")
                                .from(CourseLessons::Table, CourseLessons::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_course_lessons_chapter_id")
                                .from(CourseLessons::Table, CourseLessons::ChapterId)
                                .to(CourseChapters::Table, CourseChapters::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_index(
                manager,
                "idx_course_lessons_chapter_id",
                CourseLessons::Table,
                CourseLessons::ChapterId,
            )
            .await?;
            create_index(
                manager,
                "idx_course_lessons_course_id",
                CourseLessons::Table,
                CourseLessons::CourseId,
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CourseLessons::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CourseChapters::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Courses::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000003_create_course_reviews_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_course_reviews_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CourseReviews::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CourseReviews::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CourseReviews::CourseId).uuid().not_null())
                        .col(ColumnDef::new(CourseReviews::UserId).uuid().not_null())
                        .col(
                            ColumnDef::new(CourseReviews::Rating)
                                .small_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CourseReviews::Comment).text().null())
                        .col(
                            ColumnDef::new(CourseReviews::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CourseReviews::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_course_reviews_course_id")
                                .from(CourseReviews::Table, CourseReviews::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_course_reviews_user_id")
                                .from(CourseReviews::Table, CourseReviews::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_unique_index(
                manager,
                "uq_course_reviews_course_user",
                CourseReviews::Table,
                vec![
                    CourseReviews::CourseId.into_iden(),
                    CourseReviews::UserId.into_iden(),
                ],
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CourseReviews::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000004_create_enrollment_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_enrollment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Enrollments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Enrollments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Enrollments::StudentId).uuid().not_null())
                        .col(ColumnDef::new(Enrollments::CourseId).uuid().not_null())
                        .col(ColumnDef::new(Enrollments::InstructorId).uuid().not_null())
                        .col(
                            ColumnDef::new(Enrollments::OriginalPrice)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::DiscountAmount)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Enrollments::DiscountCode).string_len(50).null())
                        .col(
                            ColumnDef::new(Enrollments::AmountPaid)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::PlatformFee)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Enrollments::InstructorEarning)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Enrollments::Currency).string_len(3).not_null())
                        .col(
                            ColumnDef::new(Enrollments::PaymentMethod)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::PaymentStatus)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::TransactionId)
                                .string_len(64)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::Progress)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Enrollments::IsCompleted)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Enrollments::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::TotalWatchTime)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Enrollments::LastAccessedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::RefundedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(Enrollments::RefundReason).text().null())
                        .col(
                            ColumnDef::new(Enrollments::EnrolledAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Enrollments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_enrollments_student_id")
                                .from(Enrollments::Table, Enrollments::StudentId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_enrollments_course_id")
                                .from(Enrollments::Table, Enrollments::CourseId)
                                .to(Courses::Table, Courses::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_unique_index(
                manager,
                "uq_enrollments_student_course",
                Enrollments::Table,
                vec![
                    Enrollments::StudentId.into_iden(),
                    Enrollments::CourseId.into_iden(),
                ],
            )
            .await?;
            create_index(
                manager,
                "idx_enrollments_course_id",
                Enrollments::Table,
                Enrollments::CourseId,
            )
            .await?;
            create_index(
                manager,
                "idx_enrollments_instructor_id",
                Enrollments::Table,
                Enrollments::InstructorId,
            )
            .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EnrollmentLessons::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(EnrollmentLessons::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EnrollmentLessons::EnrollmentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(EnrollmentLessons::LessonId).uuid().not_null())
                        .col(
                            ColumnDef::new(EnrollmentLessons::WatchTime)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(EnrollmentLessons::CompletedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_enrollment_lessons_enrollment_id")
                                .from(EnrollmentLessons::Table, EnrollmentLessons::EnrollmentId)
                                .to(Enrollments::Table, Enrollments::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            create_unique_index(
                manager,
                "uq_enrollment_lessons_enrollment_lesson",
                EnrollmentLessons::Table,
                vec![
                    EnrollmentLessons::EnrollmentId.into_iden(),
                    EnrollmentLessons::LessonId.into_iden(),
                ],
            )
            .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(EnrollmentLessons::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Enrollments::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000005_create_discounts_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_discounts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Discounts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Discounts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::Code)
                                .string_len(50)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Discounts::Description).text().null())
                        .col(
                            ColumnDef::new(Discounts::DiscountType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::Value)
                                .decimal_len(16, 4)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::MinOrderAmount)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Discounts::MaxDiscountAmount)
                                .decimal_len(16, 4)
                                .null(),
                        )
                        .col(ColumnDef::new(Discounts::UsageLimit).integer().null())
                        .col(
                            ColumnDef::new(Discounts::UsedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Discounts::ValidFrom)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::ValidUntil)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Discounts::ApplicableCourses).json().null())
                        .col(ColumnDef::new(Discounts::CreatedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(Discounts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Discounts::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_discounts_created_by")
                                .from(Discounts::Table, Discounts::CreatedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Discounts::Table).to_owned())
                .await
        }
    }
}

mod m20240101_000006_create_wishlist_and_cart_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_wishlist_and_cart_tables"
        }
    }

    fn saved_course_table(table: DynIden, fk_prefix: &str) -> TableCreateStatement {
        Table::create()
            .table(table.clone())
            .if_not_exists()
            .col(
                ColumnDef::new(SavedCourse::Id)
                    .uuid()
                    .primary_key()
                    .not_null(),
            )
            .col(ColumnDef::new(SavedCourse::UserId).uuid().not_null())
            .col(ColumnDef::new(SavedCourse::CourseId).uuid().not_null())
            .col(
                ColumnDef::new(SavedCourse::CreatedAt)
                    .timestamp_with_time_zone()
                    .not_null(),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("{}_user_id", fk_prefix))
                    .from(table.clone(), SavedCourse::UserId)
                    .to(Users::Table, Users::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .on_update(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name(format!("{}_course_id", fk_prefix))
                    .from(table, SavedCourse::CourseId)
                    .to(Courses::Table, Courses::Id)
                    .on_delete(ForeignKeyAction::Cascade)
                    .on_update(ForeignKeyAction::Cascade),
            )
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for (table, prefix) in [
                (WishlistItems::Table.into_iden(), "wishlist_items"),
                (CartItems::Table.into_iden(), "cart_items"),
            ] {
                manager
                    .create_table(saved_course_table(table.clone(), &format!("fk_{}", prefix)))
                    .await?;
                create_unique_index(
                    manager,
                    &format!("uq_{}_user_course", prefix),
                    table,
                    vec![
                        SavedCourse::UserId.into_iden(),
                        SavedCourse::CourseId.into_iden(),
                    ],
                )
                .await?;
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WishlistItems::Table).to_owned())
                .await
        }
    }

    /// Column names shared by the wishlist and cart tables.
    #[derive(DeriveIden)]
    enum SavedCourse {
        Id,
        UserId,
        CourseId,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum WishlistItems {
        Table,
    }

    #[derive(DeriveIden)]
    enum CartItems {
        Table,
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Role,
    AvatarUrl,
    Bio,
    Headline,
    IsActive,
    IsApproved,
    RejectionReason,
    TotalStudents,
    TotalRevenue,
    TotalCourses,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Courses {
    Table,
    Id,
    InstructorId,
    Title,
    Subtitle,
    Description,
    Category,
    Level,
    Language,
    Price,
    ThumbnailUrl,
    PreviewVideoUrl,
    Requirements,
    WhatYouWillLearn,
    TargetAudience,
    Tags,
    Status,
    IsPublished,
    PublishedAt,
    RejectionReason,
    TotalDuration,
    TotalLessons,
    TotalEnrollments,
    Rating,
    TotalReviews,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CourseChapters {
    Table,
    Id,
    CourseId,
    Title,
    Description,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CourseLessons {
    Table,
    Id,
    CourseId,
    ChapterId,
    Title,
    Description,
    VideoUrl,
    Duration,
    Position,
    IsPreview,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum CourseReviews {
    Table,
    Id,
    CourseId,
    UserId,
    Rating,
    Comment,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Enrollments {
    Table,
    Id,
    StudentId,
    CourseId,
    InstructorId,
    OriginalPrice,
    DiscountAmount,
    DiscountCode,
    AmountPaid,
    PlatformFee,
    InstructorEarning,
    Currency,
    PaymentMethod,
    PaymentStatus,
    TransactionId,
    Progress,
    IsCompleted,
    CompletedAt,
    TotalWatchTime,
    LastAccessedAt,
    RefundedAt,
    RefundReason,
    EnrolledAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum EnrollmentLessons {
    Table,
    Id,
    EnrollmentId,
    LessonId,
    WatchTime,
    CompletedAt,
}

#[derive(DeriveIden)]
enum Discounts {
    Table,
    Id,
    Code,
    Description,
    DiscountType,
    Value,
    MinOrderAmount,
    MaxDiscountAmount,
    UsageLimit,
    UsedCount,
    ValidFrom,
    ValidUntil,
    IsActive,
    ApplicableCourses,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
