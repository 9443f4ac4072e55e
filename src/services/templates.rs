// services/templates.rs
//
// Fixed library of outbound message templates. Each sender formats a body
// from typed parameters and delegates to the dual-channel dispatcher; none of
// them ever interpolates an absent optional field into the final string.

use super::notify_service::{NotificationResult, NotificationService, MAX_MESSAGE_LENGTH};

pub const BRAND_NAME: &str = "EduTrack";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub(crate) fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Keep every rendered body inside the transport's single-message ceiling.
fn clamp_message(body: String) -> String {
    if body.chars().count() <= MAX_MESSAGE_LENGTH {
        body
    } else {
        body.chars().take(MAX_MESSAGE_LENGTH).collect()
    }
}

fn absence_alert_body(parent_name: &str, student_name: &str, date: &str) -> String {
    clamp_message(format!(
        "Dear {}, {} was marked absent on {}. Please contact the school office if this is unexpected. - {}",
        parent_name, student_name, date, BRAND_NAME
    ))
}

fn fee_due_reminder_body(
    parent_name: &str,
    student_name: &str,
    currency_symbol: &str,
    amount: f64,
    due_date: &str,
) -> String {
    clamp_message(format!(
        "Dear {}, a fee payment of {}{:.2} for {} is due by {}. Kindly pay on time to avoid late charges. - {}",
        parent_name, currency_symbol, amount, student_name, due_date, BRAND_NAME
    ))
}

fn fee_receipt_body(
    parent_name: &str,
    student_name: &str,
    currency_symbol: &str,
    amount: f64,
    receipt_number: &str,
) -> String {
    clamp_message(format!(
        "Dear {}, we have received {}{:.2} towards {}'s fees. Receipt no: {}. Thank you. - {}",
        parent_name, currency_symbol, amount, student_name, receipt_number, BRAND_NAME
    ))
}

fn exam_schedule_body(student_name: &str, exam_name: &str, start_date: &str) -> String {
    clamp_message(format!(
        "Exam notice for {}: {} begins on {}. The detailed timetable is available on the portal. - {}",
        student_name, exam_name, start_date, BRAND_NAME
    ))
}

fn result_published_body(parent_name: &str, student_name: &str, exam_name: &str) -> String {
    clamp_message(format!(
        "Dear {}, the {} results for {} have been published. Log in to the portal to view the report card. - {}",
        parent_name, exam_name, student_name, BRAND_NAME
    ))
}

fn salary_notification_body(
    staff_name: &str,
    month: u32,
    year: i32,
    currency_symbol: &str,
    amount: f64,
    status: &str,
) -> String {
    clamp_message(format!(
        "Dear {}, your salary for {} {} of {}{:.2} has been {}. - {}",
        staff_name,
        month_name(month),
        year,
        currency_symbol,
        amount,
        status,
        BRAND_NAME
    ))
}

pub(crate) fn emergency_alert_body(severity: &str, title: &str, body: &str) -> String {
    clamp_message(format!(
        "🚨 {}: {}. {} - {}",
        severity.to_uppercase(),
        title,
        body,
        BRAND_NAME
    ))
}

fn admission_confirmation_body(student_name: &str, class_name: &str) -> String {
    clamp_message(format!(
        "Admission confirmed: {} has been enrolled in {}. Welcome to the {} family!",
        student_name, class_name, BRAND_NAME
    ))
}

fn event_announcement_body(title: &str, date: &str, venue: Option<&str>) -> String {
    // An absent venue is omitted cleanly, never rendered as empty punctuation.
    let venue_part = match venue.map(str::trim).filter(|v| !v.is_empty()) {
        Some(venue) => format!(" at {}", venue),
        None => String::new(),
    };
    clamp_message(format!(
        "Event announcement: {} on {}{}. All parents and students are invited. - {}",
        title, date, venue_part, BRAND_NAME
    ))
}

fn holiday_notice_body(holiday_name: &str, start_date: &str, end_date: &str) -> String {
    clamp_message(format!(
        "Holiday notice: the school will remain closed for {} from {} to {}. - {}",
        holiday_name, start_date, end_date, BRAND_NAME
    ))
}

fn transport_alert_body(student_name: &str, route_name: &str, message: &str) -> String {
    clamp_message(format!(
        "Transport update for {} (route {}): {} - {}",
        student_name, route_name, message, BRAND_NAME
    ))
}

fn meeting_invite_body(
    parent_name: &str,
    teacher_name: &str,
    date: &str,
    subject: Option<&str>,
) -> String {
    let subject_part = match subject.map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) => format!(" regarding {}", subject),
        None => String::new(),
    };
    clamp_message(format!(
        "Dear {}, {} has requested a meeting with you on {}{}. Please confirm your availability. - {}",
        parent_name, teacher_name, date, subject_part, BRAND_NAME
    ))
}

fn welcome_body(user_name: &str, role: &str) -> String {
    clamp_message(format!(
        "Welcome {}! Your {} account on {} is ready. Use your registered phone number to sign in.",
        user_name, role, BRAND_NAME
    ))
}

impl NotificationService {
    pub async fn send_absence_alert(
        &self,
        phone: &str,
        parent_name: &str,
        student_name: &str,
        date: &str,
    ) -> NotificationResult {
        let body = absence_alert_body(parent_name, student_name, date);
        self.send_notification(phone, &body).await
    }

    pub async fn send_fee_due_reminder(
        &self,
        phone: &str,
        parent_name: &str,
        student_name: &str,
        amount: f64,
        due_date: &str,
    ) -> NotificationResult {
        let body =
            fee_due_reminder_body(parent_name, student_name, self.currency_symbol(), amount, due_date);
        self.send_notification(phone, &body).await
    }

    pub async fn send_fee_receipt(
        &self,
        phone: &str,
        parent_name: &str,
        student_name: &str,
        amount: f64,
        receipt_number: &str,
    ) -> NotificationResult {
        let body = fee_receipt_body(
            parent_name,
            student_name,
            self.currency_symbol(),
            amount,
            receipt_number,
        );
        self.send_notification(phone, &body).await
    }

    pub async fn send_exam_schedule(
        &self,
        phone: &str,
        student_name: &str,
        exam_name: &str,
        start_date: &str,
    ) -> NotificationResult {
        let body = exam_schedule_body(student_name, exam_name, start_date);
        self.send_notification(phone, &body).await
    }

    pub async fn send_result_notification(
        &self,
        phone: &str,
        parent_name: &str,
        student_name: &str,
        exam_name: &str,
    ) -> NotificationResult {
        let body = result_published_body(parent_name, student_name, exam_name);
        self.send_notification(phone, &body).await
    }

    /// Salary notice: the month number renders as a full month name and the
    /// amount carries the configured currency symbol.
    pub async fn send_salary_notification(
        &self,
        phone: &str,
        staff_name: &str,
        month: u32,
        year: i32,
        amount: f64,
        status: &str,
    ) -> NotificationResult {
        let body = salary_notification_body(
            staff_name,
            month,
            year,
            self.currency_symbol(),
            amount,
            status,
        );
        self.send_notification(phone, &body).await
    }

    /// Emergency notice: severity is uppercased and prefixed with an alert glyph.
    pub async fn send_emergency_alert(
        &self,
        phone: &str,
        severity: &str,
        title: &str,
        body: &str,
    ) -> NotificationResult {
        let body = emergency_alert_body(severity, title, body);
        self.send_notification(phone, &body).await
    }

    pub async fn send_admission_confirmation(
        &self,
        phone: &str,
        student_name: &str,
        class_name: &str,
    ) -> NotificationResult {
        let body = admission_confirmation_body(student_name, class_name);
        self.send_notification(phone, &body).await
    }

    pub async fn send_event_announcement(
        &self,
        phone: &str,
        title: &str,
        date: &str,
        venue: Option<&str>,
    ) -> NotificationResult {
        let body = event_announcement_body(title, date, venue);
        self.send_notification(phone, &body).await
    }

    pub async fn send_holiday_notice(
        &self,
        phone: &str,
        holiday_name: &str,
        start_date: &str,
        end_date: &str,
    ) -> NotificationResult {
        let body = holiday_notice_body(holiday_name, start_date, end_date);
        self.send_notification(phone, &body).await
    }

    pub async fn send_transport_alert(
        &self,
        phone: &str,
        student_name: &str,
        route_name: &str,
        message: &str,
    ) -> NotificationResult {
        let body = transport_alert_body(student_name, route_name, message);
        self.send_notification(phone, &body).await
    }

    pub async fn send_meeting_invite(
        &self,
        phone: &str,
        parent_name: &str,
        teacher_name: &str,
        date: &str,
        subject: Option<&str>,
    ) -> NotificationResult {
        let body = meeting_invite_body(parent_name, teacher_name, date, subject);
        self.send_notification(phone, &body).await
    }

    pub async fn send_welcome_message(
        &self,
        phone: &str,
        user_name: &str,
        role: &str,
    ) -> NotificationResult {
        let body = welcome_body(user_name, role);
        self.send_notification(phone, &body).await
    }
}
