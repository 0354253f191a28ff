//! Seed data script - creates the first admin account
//!
//! Run with: cargo run --bin seed-data -- --admin-email admin@example.com
//!
//! With `--demo` it also creates:
//! - an approved instructor and a student
//! - one approved, published course with a chapter and three lessons

use chrono::Utc;
use clap::Parser;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use std::time::Duration as StdDuration;
use tracing::{info, warn};
use uuid::Uuid;

use learnhub_api::{
    auth::hash_password,
    db,
    entities::{
        course::{self, CourseLevel, CourseStatus},
        course_chapter, course_lesson,
        user::{self, UserRole},
        StringList,
    },
};

#[derive(Parser, Debug)]
#[command(name = "seed-data", about = "Create the LearnHub admin account and demo data")]
struct Args {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://learnhub.db?mode=rwc")]
    database_url: String,

    #[arg(long, default_value = "admin@learnhub.local")]
    admin_email: String,

    /// Must be at least 8 characters
    #[arg(long, env = "SEED_ADMIN_PASSWORD")]
    admin_password: String,

    #[arg(long, default_value = "Platform Admin")]
    admin_name: String,

    /// Also create a demo instructor, student and course
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();
    if args.admin_password.len() < 8 {
        anyhow::bail!("admin password must be at least 8 characters");
    }

    info!("=== LearnHub Seed Data ===");

    let mut options = ConnectOptions::new(args.database_url.clone());
    options
        .max_connections(5)
        .min_connections(1)
        .connect_timeout(StdDuration::from_secs(10))
        .acquire_timeout(StdDuration::from_secs(10));

    info!("Connecting to database: {}", args.database_url);
    let conn = Database::connect(options).await?;
    db::run_migrations(&conn).await?;

    let admin = ensure_user(
        &conn,
        &args.admin_name,
        &args.admin_email,
        &args.admin_password,
        UserRole::Admin,
    )
    .await?;
    info!("Admin account ready: {}", admin.email);

    if args.demo {
        let instructor = ensure_user(
            &conn,
            "Demo Instructor",
            "instructor@learnhub.local",
            &args.admin_password,
            UserRole::Instructor,
        )
        .await?;
        ensure_user(
            &conn,
            "Demo Student",
            "student@learnhub.local",
            &args.admin_password,
            UserRole::Student,
        )
        .await?;
        let course = create_demo_course(&conn, &instructor).await?;
        info!("Demo course published: {} ({})", course.title, course.id);
    }

    info!("=== Seed Data Complete ===");
    info!("Explore the API at: http://localhost:8080/swagger-ui");
    Ok(())
}

async fn ensure_user(
    conn: &DatabaseConnection,
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> anyhow::Result<user::Model> {
    let email = email.trim().to_lowercase();
    if let Some(existing) = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(conn)
        .await?
    {
        warn!("{} already exists; leaving it unchanged", email);
        return Ok(existing);
    }

    let now = Utc::now();
    let model = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email),
        password_hash: Set(hash_password(password)?),
        role: Set(role),
        avatar_url: Set(None),
        bio: Set(None),
        headline: Set(None),
        is_active: Set(true),
        is_approved: Set(true),
        rejection_reason: Set(None),
        total_students: Set(0),
        total_revenue: Set(dec!(0)),
        total_courses: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;
    Ok(model)
}

async fn create_demo_course(
    conn: &DatabaseConnection,
    instructor: &user::Model,
) -> anyhow::Result<course::Model> {
    let now = Utc::now();
    let lessons = [
        ("Welcome and setup", 420, true),
        ("Ownership in practice", 1260, false),
        ("Building a small CLI", 1800, false),
    ];
    let total_duration: i32 = lessons.iter().map(|(_, secs, _)| secs).sum();

    let course = course::ActiveModel {
        id: Set(Uuid::new_v4()),
        instructor_id: Set(instructor.id),
        title: Set("Practical Rust for Backend Developers".to_string()),
        subtitle: Set(Some("From ownership to production services".to_string())),
        description: Set("A hands-on tour of the language through small services.".to_string()),
        category: Set("programming".to_string()),
        level: Set(CourseLevel::Beginner),
        language: Set("English".to_string()),
        price: Set(dec!(49.99)),
        thumbnail_url: Set(None),
        preview_video_url: Set(None),
        requirements: Set(StringList(vec!["Basic programming experience".into()])),
        what_you_will_learn: Set(StringList(vec![
            "Ownership and borrowing".into(),
            "Error handling with Result".into(),
        ])),
        target_audience: Set(StringList(vec!["Backend developers".into()])),
        tags: Set(StringList(vec!["rust".into(), "backend".into()])),
        status: Set(CourseStatus::Approved),
        is_published: Set(true),
        published_at: Set(Some(now)),
        rejection_reason: Set(None),
        total_duration: Set(total_duration),
        total_lessons: Set(lessons.len() as i32),
        total_enrollments: Set(0),
        rating: Set(dec!(0)),
        total_reviews: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    let chapter = course_chapter::ActiveModel {
        id: Set(Uuid::new_v4()),
        course_id: Set(course.id),
        title: Set("Getting started".to_string()),
        description: Set(None),
        position: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    for (position, (title, duration, is_preview)) in (1..).zip(lessons) {
        course_lesson::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_id: Set(course.id),
            chapter_id: Set(chapter.id),
            title: Set(title.to_string()),
            description: Set(None),
            video_url: Set(Some(format!("https://videos.learnhub.local/demo/{}", position))),
            duration: Set(duration),
            position: Set(position),
            is_preview: Set(is_preview),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;
    }

    let mut owner: user::ActiveModel = instructor.clone().into();
    owner.total_courses = Set(instructor.total_courses + 1);
    owner.update(conn).await?;

    Ok(course)
}
