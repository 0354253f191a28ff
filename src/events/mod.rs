use metrics::counter;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::user::UserRole;

/// Handle for publishing domain events onto the in-process channel.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    /// The state change that produced the event has already committed.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Account events
    UserRegistered { user_id: Uuid, role: UserRole },
    InstructorApproved(Uuid),
    InstructorRejected(Uuid),
    UserStatusChanged { user_id: Uuid, is_active: bool },
    UserDeleted(Uuid),

    // Catalog events
    CourseCreated { course_id: Uuid, instructor_id: Uuid },
    CourseSubmitted(Uuid),
    CourseApproved(Uuid),
    CourseRejected(Uuid),
    CourseArchived(Uuid),
    CoursePublished(Uuid),
    CourseUnpublished(Uuid),
    CourseDeleted(Uuid),
    ReviewSubmitted { course_id: Uuid, user_id: Uuid, rating: i16 },

    // Enrollment and payment events
    StudentEnrolled {
        enrollment_id: Uuid,
        course_id: Uuid,
        student_id: Uuid,
        amount_paid: Decimal,
    },
    EnrollmentRefunded {
        enrollment_id: Uuid,
        course_id: Uuid,
        amount: Decimal,
    },
    LessonCompleted {
        enrollment_id: Uuid,
        lesson_id: Uuid,
        progress: i32,
    },
    CourseCompleted {
        enrollment_id: Uuid,
        course_id: Uuid,
        student_id: Uuid,
    },
    DiscountCreated { discount_id: Uuid, code: String },
    CouponRedeemed { discount_id: Uuid, code: String },
}

impl Event {
    /// Short name used for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::UserRegistered { .. } => "user_registered",
            Event::InstructorApproved(_) => "instructor_approved",
            Event::InstructorRejected(_) => "instructor_rejected",
            Event::UserStatusChanged { .. } => "user_status_changed",
            Event::UserDeleted(_) => "user_deleted",
            Event::CourseCreated { .. } => "course_created",
            Event::CourseSubmitted(_) => "course_submitted",
            Event::CourseApproved(_) => "course_approved",
            Event::CourseRejected(_) => "course_rejected",
            Event::CourseArchived(_) => "course_archived",
            Event::CoursePublished(_) => "course_published",
            Event::CourseUnpublished(_) => "course_unpublished",
            Event::CourseDeleted(_) => "course_deleted",
            Event::ReviewSubmitted { .. } => "review_submitted",
            Event::StudentEnrolled { .. } => "student_enrolled",
            Event::EnrollmentRefunded { .. } => "enrollment_refunded",
            Event::LessonCompleted { .. } => "lesson_completed",
            Event::CourseCompleted { .. } => "course_completed",
            Event::DiscountCreated { .. } => "discount_created",
            Event::CouponRedeemed { .. } => "coupon_redeemed",
        }
    }
}

/// Creates the channel pair used by the server.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("learnhub.events.processed", 1, "kind" => event.kind());

        match &event {
            Event::StudentEnrolled {
                enrollment_id,
                course_id,
                student_id,
                amount_paid,
            } => info!(
                %enrollment_id, %course_id, %student_id, %amount_paid,
                "student enrolled"
            ),
            Event::EnrollmentRefunded {
                enrollment_id,
                course_id,
                amount,
            } => info!(%enrollment_id, %course_id, %amount, "enrollment refunded"),
            Event::CourseCompleted {
                enrollment_id,
                course_id,
                student_id,
            } => info!(%enrollment_id, %course_id, %student_id, "course completed"),
            other => info!(kind = other.kind(), event = ?other, "domain event"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn published_events_reach_the_receiver() {
        let (sender, mut rx) = channel(4);
        let course_id = Uuid::new_v4();
        sender.publish(Event::CoursePublished(course_id)).await;

        assert_eq!(rx.recv().await, Some(Event::CoursePublished(course_id)));
    }

    #[tokio::test]
    async fn publish_tolerates_closed_channel() {
        let (sender, rx) = channel(1);
        drop(rx);
        sender.publish(Event::UserDeleted(Uuid::new_v4())).await;
        assert!(sender.send(Event::UserDeleted(Uuid::new_v4())).await.is_err());
    }

    #[tokio::test]
    async fn processor_stops_when_senders_drop() {
        let (sender, rx) = channel(2);
        let handle = tokio::spawn(process_events(rx));
        sender.publish(Event::CourseApproved(Uuid::new_v4())).await;
        drop(sender);
        handle.await.unwrap();
    }
}
