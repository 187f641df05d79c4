//! HTML email bodies for the three notification kinds.

use upkeep_core::types::{NotificationKind, WorkOrderInstance};

/// Subject line for a notification.
pub fn subject(kind: NotificationKind, order: &WorkOrderInstance, upcoming_days: u32) -> String {
    match kind {
        NotificationKind::Upcoming => format!(
            "Upcoming Work Order #{} Due in {} Day{}",
            order.work_order_id,
            upcoming_days,
            if upcoming_days == 1 { "" } else { "s" }
        ),
        NotificationKind::DueToday => format!("Work Order #{} Due Today", order.work_order_id),
        NotificationKind::Overdue => format!("OVERDUE: Work Order #{}", order.work_order_id),
    }
}

/// HTML body for a notification.
pub fn body(kind: NotificationKind, order: &WorkOrderInstance, upcoming_days: u32) -> String {
    match kind {
        NotificationKind::Upcoming => render(
            "#2196F3",
            "#f9f9f9",
            "Work Order Reminder",
            &format!(
                "This is a friendly reminder that you have a work order due in \
                 <strong>{upcoming_days} day{}</strong>.",
                if upcoming_days == 1 { "" } else { "s" }
            ),
            "Please ensure this work order is completed by the due date. If you \
             anticipate any issues with completing this task on time, please \
             notify your supervisor as soon as possible.",
            order,
        ),
        NotificationKind::DueToday => render(
            "#FF9800",
            "#fff3e0",
            "Work Order Due Today",
            "This is an important reminder that you have a work order \
             <strong>due today</strong>.",
            "Please prioritize this task to ensure it is completed today. If you \
             have already completed this work order, please update its status in \
             the system.",
            order,
        ),
        NotificationKind::Overdue => render(
            "#F44336",
            "#ffebee",
            "OVERDUE Work Order",
            "This is an <strong>urgent notification</strong> that you have an \
             <strong>OVERDUE</strong> work order that requires immediate attention.",
            "Please complete this work order as soon as possible or contact your \
             supervisor to discuss any issues preventing its completion.",
            order,
        ),
    }
}

fn render(
    header_color: &str,
    block_color: &str,
    heading: &str,
    intro: &str,
    closing: &str,
    order: &WorkOrderInstance,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<style>
  body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
  .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
  .header {{ background-color: {header_color}; color: white; padding: 10px 20px; text-align: center; }}
  .content {{ padding: 20px; border: 1px solid #ddd; }}
  .work-order {{ background-color: {block_color}; padding: 15px; margin-top: 20px; border-left: 4px solid {header_color}; }}
  .footer {{ text-align: center; margin-top: 20px; font-size: 12px; color: #777; }}
</style>
</head>
<body>
<div class="container">
  <div class="header"><h2>{heading}</h2></div>
  <div class="content">
    <p>Hello,</p>
    <p>{intro}</p>
    <div class="work-order">
      <h3>Work Order #{id}: {title}</h3>
      <p><strong>Equipment:</strong> #{equipment}</p>
      <p><strong>Priority:</strong> {priority}</p>
      <p><strong>Due Date:</strong> {due}</p>
      <p><strong>Description:</strong> {description}</p>
    </div>
    <p>{closing}</p>
    <p>Best regards,<br>Upkeep CMMS</p>
  </div>
  <div class="footer">
    <p>This is an automated message from the Upkeep CMMS. Please do not reply to this email.</p>
  </div>
</div>
</body>
</html>"#,
        id = order.work_order_id,
        title = escape(&order.title),
        equipment = order.equipment_id,
        priority = order.priority.as_str(),
        due = order.due_date,
        description = escape(&order.description),
    )
}

/// Minimal HTML escaping for user-entered text.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
