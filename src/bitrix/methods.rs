//! Parameter builders for the portal methods the scheduler calls.
//!
//! Field names and magic constants follow the Bitrix REST API: activity
//! fields are SCREAMING_CASE inside a `fields` object, while
//! `calendar.event.add` and `crm.activity.todo.add` take camelCase
//! top-level parameters.

use serde_json::{Value, json};

use crate::scheduling::deal::DealId;

pub const USER_CURRENT: &str = "user.current";
pub const CALENDAR_EVENT_ADD: &str = "calendar.event.add";
pub const CRM_ACTIVITY_ADD: &str = "crm.activity.add";
pub const CRM_ACTIVITY_TODO_ADD: &str = "crm.activity.todo.add";

/// OWNER_TYPE_ID for a deal.
const OWNER_TYPE_DEAL: u8 = 2;
/// TYPE_ID values on crm.activity.add.
const ACTIVITY_TYPE_MEETING: u8 = 2;
const ACTIVITY_TYPE_EMAIL: u8 = 4;

pub fn calendar_event_add(
    owner_id: Option<u64>,
    subject: &str,
    from: &str,
    to: &str,
    description: &str,
) -> Value {
    let mut params = json!({
        "type": "user",
        "name": subject,
        "description": description,
        "from": from,
        "to": to,
        // Timed event, not all-day
        "skip_time": "N",
    });
    if let Some(id) = owner_id {
        // The portal wants this one as a string
        params["ownerId"] = json!(id.to_string());
    }
    params
}

pub fn activity_add(
    deal_id: DealId,
    subject: &str,
    from: &str,
    to: &str,
    description: &str,
) -> Value {
    json!({
        "fields": {
            "OWNER_TYPE_ID": OWNER_TYPE_DEAL,
            "OWNER_ID": deal_id,
            "TYPE_ID": ACTIVITY_TYPE_MEETING,
            "SUBJECT": subject,
            "START_TIME": from,
            "END_TIME": to,
            "COMPLETED": "N",
            "DESCRIPTION": description,
        }
    })
}

pub fn todo_add(deal_id: DealId, subject: &str, deadline: &str, description: &str) -> Value {
    json!({
        "ownerTypeId": OWNER_TYPE_DEAL,
        "ownerId": deal_id,
        "title": subject,
        "deadline": deadline,
        "description": description,
    })
}

/// Email-type note recording which client address should receive the
/// invite, so it is not lost when the portal has no outbound mail set up.
pub fn client_invite_note(deal_id: DealId, client_email: &str, meet_link: Option<&str>) -> Value {
    json!({
        "fields": {
            "OWNER_TYPE_ID": OWNER_TYPE_DEAL,
            "OWNER_ID": deal_id,
            "TYPE_ID": ACTIVITY_TYPE_EMAIL,
            "SUBJECT": format!("Client invited: {}", client_email),
            "COMPLETED": "N",
            "DESCRIPTION": format!(
                "Invite to send to: {}\nMeet: {}",
                client_email,
                meet_link.unwrap_or("(no link)")
            ),
        }
    })
}
