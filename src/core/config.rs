use std::env;

/// How the form collects the meeting start: one `datetime-local` input or
/// separate date and time-grid inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeInputMode {
    Combined,
    Split,
}

/// What gets attached to the deal once the calendar event exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Meeting,
    Todo,
}

/// Which serialization the portal methods receive for the time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeWireFormat {
    /// `YYYY-MM-DD HH:MM:SS` wall-clock time, no timezone.
    Local,
    /// ISO-8601 with a UTC offset.
    Instant,
}

/// Configuration for one form iteration. The shipped forms differ only in
/// field set and formats, so a single orchestrator is driven by this struct
/// rather than forking per variant.
#[derive(Clone, Copy, Debug)]
pub struct FormVariant {
    pub requires_owner_id: bool,
    pub time_input_mode: TimeInputMode,
    pub allows_explicit_deal_id: bool,
    pub activity_kind: ActivityKind,
    pub time_wire_format: TimeWireFormat,
}

impl FormVariant {
    /// The original form: datetime-local input, explicit id or pasted deal
    /// link, calendar event owned by the acting user, meeting activity.
    pub fn classic() -> Self {
        Self {
            requires_owner_id: true,
            time_input_mode: TimeInputMode::Combined,
            allows_explicit_deal_id: true,
            activity_kind: ActivityKind::Meeting,
            time_wire_format: TimeWireFormat::Local,
        }
    }

    /// The embedded-tab form: deal id comes from placement context only and
    /// the portal infers the acting user.
    pub fn placement() -> Self {
        Self {
            requires_owner_id: false,
            time_input_mode: TimeInputMode::Combined,
            allows_explicit_deal_id: false,
            activity_kind: ActivityKind::Meeting,
            time_wire_format: TimeWireFormat::Instant,
        }
    }

    /// The split date + 15-minute time-grid form, which files a to-do on the
    /// deal instead of a timeline meeting.
    pub fn grid() -> Self {
        Self {
            requires_owner_id: true,
            time_input_mode: TimeInputMode::Split,
            allows_explicit_deal_id: true,
            activity_kind: ActivityKind::Todo,
            time_wire_format: TimeWireFormat::Local,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "classic" => Some(Self::classic()),
            "placement" => Some(Self::placement()),
            "grid" => Some(Self::grid()),
            _ => None,
        }
    }
}

impl Default for FormVariant {
    fn default() -> Self {
        Self::classic()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base REST webhook URL for the portal, e.g.
    /// `https://portal.bitrix24.com/rest/1/abc123`.
    pub bitrix_webhook_url: String,
    pub variant: FormVariant,
}

impl Default for AppConfig {
    fn default() -> Self {
        let bitrix_webhook_url = env::var("AGENDAR_BITRIX_WEBHOOK_URL")
            .expect("Missing env var AGENDAR_BITRIX_WEBHOOK_URL");
        let variant = match env::var("AGENDAR_VARIANT") {
            Ok(name) => FormVariant::from_name(&name)
                .unwrap_or_else(|| panic!("Unknown AGENDAR_VARIANT: {}", name)),
            Err(_) => FormVariant::default(),
        };

        Self {
            bitrix_webhook_url,
            variant,
        }
    }
}
