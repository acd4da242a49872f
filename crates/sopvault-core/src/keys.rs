//! Key namespace persisted by the host application. The store itself has
//! no knowledge of schemas; these constants are the contract between the
//! host's subsystems and the migration / session passes.

pub const USER_PROFILE: &str = "sop_user";
pub const THEME: &str = "sop_theme";
pub const SOP_LIST: &str = "sop_sops";
pub const TEAM_LIST: &str = "sop_teams";
pub const TEAM_MEMBERS: &str = "sop_team_members";
pub const CURRENT_TEAM: &str = "sop_current_team";
pub const ANALYTICS_EVENTS: &str = "sop_analytics_events";
pub const SESSION_STARTED_AT: &str = "sop_session_started_at";
pub const SESSION_LAST_ACTIVITY: &str = "sop_session_last_activity";

/// Every record the host application currently persists. `migrate_all`
/// walks exactly this list.
pub const KNOWN_KEYS: &[&str] = &[
    USER_PROFILE,
    THEME,
    SOP_LIST,
    TEAM_LIST,
    TEAM_MEMBERS,
    CURRENT_TEAM,
    ANALYTICS_EVENTS,
];

/// Records cleared when a session expires.
pub const SESSION_KEYS: &[&str] = &[
    USER_PROFILE,
    CURRENT_TEAM,
    SESSION_STARTED_AT,
    SESSION_LAST_ACTIVITY,
];
