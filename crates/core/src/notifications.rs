//! Outbound notifications.
//!
//! State transitions (booking, cancellation, rescheduling, doctor approval) produce a
//! [`Notification`] which is handed to the [`NotificationGateway`]. Delivery is best-effort: the
//! gateway logs transport failures and never reports them to the caller, so a broken mail relay
//! cannot fail or roll back a committed booking.

use chrono::{DateTime, Utc};
use medibook_types::EmailAddress;
use std::sync::{Arc, Mutex};

/// Subject of the booking confirmation sent to the patient or guest.
pub const SUBJECT_BOOKING_CONFIRMATION: &str = "Your Appointment Confirmation";
/// Subject of the new-booking notice sent to the doctor.
pub const SUBJECT_NEW_BOOKING: &str = "New Appointment Booked";
/// Subject of the cancellation notice sent to the patient.
pub const SUBJECT_CANCELLED: &str = "Your Appointment Has Been Cancelled";
/// Subject of the reschedule notice sent to the patient.
pub const SUBJECT_RESCHEDULED: &str = "Your Appointment Has Been Rescheduled";
/// Subject of the approval notice sent to a doctor.
pub const SUBJECT_DOCTOR_APPROVED: &str = "Your Doctor Account Has Been Approved!";

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: EmailAddress,
    pub subject: String,
    pub body: String,
}

fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn format_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M UTC").to_string()
}

impl Notification {
    /// Confirmation for the person who booked.
    pub fn booking_confirmation(
        to: EmailAddress,
        patient_name: &str,
        doctor_name: &str,
        specialty: &str,
        booking_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            to,
            subject: SUBJECT_BOOKING_CONFIRMATION.into(),
            body: format!(
                "Hello {patient_name},\n\n\
                 Your appointment with Dr. {doctor_name} ({specialty}) is confirmed!\n\
                 Booking ID: {booking_id}\n\
                 Date: {}\n\
                 Time: {}\n\n\
                 Thank you for choosing our service!",
                format_date(at),
                format_time(at)
            ),
        }
    }

    /// Notice to the doctor that a slot was booked.
    pub fn new_booking(
        to: EmailAddress,
        doctor_name: &str,
        patient_name: &str,
        booking_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            to,
            subject: SUBJECT_NEW_BOOKING.into(),
            body: format!(
                "Hello Dr. {doctor_name},\n\n\
                 A new appointment has been booked with you.\n\
                 Patient: {patient_name}\n\
                 Booking ID: {booking_id}\n\
                 Date: {}\n\
                 Time: {}\n\n\
                 Please log in to your dashboard to view more details.",
                format_date(at),
                format_time(at)
            ),
        }
    }

    pub fn cancellation(
        to: EmailAddress,
        patient_name: &str,
        doctor_name: &str,
        booking_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            to,
            subject: SUBJECT_CANCELLED.into(),
            body: format!(
                "Hello {patient_name},\n\n\
                 Your appointment with Dr. {doctor_name} scheduled for {} {} has been cancelled.\n\
                 Booking ID: {booking_id}\n\n\
                 If you did not request this cancellation, please contact our support team immediately.",
                format_date(at),
                format_time(at)
            ),
        }
    }

    pub fn rescheduled(
        to: EmailAddress,
        patient_name: &str,
        doctor_name: &str,
        booking_id: &str,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            to,
            subject: SUBJECT_RESCHEDULED.into(),
            body: format!(
                "Hello {patient_name},\n\n\
                 Your appointment with Dr. {doctor_name} has been successfully rescheduled.\n\
                 Booking ID: {booking_id}\n\
                 New Date: {}\n\
                 New Time: {}\n\n\
                 Thank you for choosing our service!",
                format_date(at),
                format_time(at)
            ),
        }
    }

    pub fn doctor_approved(to: EmailAddress, doctor_name: &str) -> Self {
        Self {
            to,
            subject: SUBJECT_DOCTOR_APPROVED.into(),
            body: format!(
                "Congratulations, Dr. {doctor_name}!\n\n\
                 Your account has been approved by the admin. Please log in and complete your \
                 profile to start receiving appointments.\n\
                 Make sure to fill in your specialty, qualifications, experience, and other \
                 details so patients can find and book you.\n\n\
                 Thank you for joining our platform!"
            ),
        }
    }
}

/// Errors reported by a notification transport.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// A delivery channel for notifications (SMTP relay, queue, log...).
pub trait Notifier: Send + Sync + std::fmt::Debug {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Development transport: emits each notification as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "notification sent"
        );
        tracing::debug!(body = %notification.body, "notification body");
        Ok(())
    }
}

/// Keeps every notification in memory. Used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of everything sent so far.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|_| NotifyError::Transport("recording notifier lock poisoned".into()))?
            .push(notification.clone());
        Ok(())
    }
}

/// Fire-and-forget front for a [`Notifier`].
#[derive(Debug, Clone)]
pub struct NotificationGateway {
    notifier: Arc<dyn Notifier>,
}

impl NotificationGateway {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Delivers `notification`, logging (never returning) any failure.
    pub fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.notifier.send(&notification) {
            tracing::warn!(
                to = %notification.to,
                subject = %notification.subject,
                "failed to deliver notification: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Debug)]
    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn send(&self, _notification: &Notification) -> Result<(), NotifyError> {
            Err(NotifyError::Transport("relay unreachable".into()))
        }
    }

    fn email(s: &str) -> EmailAddress {
        EmailAddress::parse(s).expect("valid email")
    }

    #[test]
    fn booking_confirmation_mentions_booking_details() {
        let at = Utc.with_ymd_and_hms(2030, 6, 1, 10, 0, 0).single().expect("valid instant");
        let n = Notification::booking_confirmation(
            email("pat@example.com"),
            "Pat",
            "Ada Jones",
            "Cardiologist",
            "APT3006011234",
            at,
        );

        assert_eq!(n.subject, "Your Appointment Confirmation");
        assert!(n.body.contains("Dr. Ada Jones (Cardiologist)"));
        assert!(n.body.contains("APT3006011234"));
        assert!(n.body.contains("2030-06-01"));
        assert!(n.body.contains("10:00 UTC"));
    }

    #[test]
    fn dispatch_swallows_transport_failures() {
        let gateway = NotificationGateway::new(Arc::new(FailingNotifier));

        gateway.dispatch(Notification::doctor_approved(email("doc@example.com"), "Ada"));
    }

    #[test]
    fn recording_notifier_keeps_messages_in_order() {
        let recorder = RecordingNotifier::new();
        let gateway = NotificationGateway::new(Arc::new(recorder.clone()));

        gateway.dispatch(Notification::doctor_approved(email("a@example.com"), "A"));
        gateway.dispatch(Notification::doctor_approved(email("b@example.com"), "B"));

        let sent = recorder.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to.as_str(), "a@example.com");
        assert_eq!(sent[1].subject, SUBJECT_DOCTOR_APPROVED);
    }
}
