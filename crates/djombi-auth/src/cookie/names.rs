//! Fixed cookie names used by the session context.

/// Adafri access token.
pub const ACCESS_TOKEN: &str = "access_token";
/// Adafri refresh token.
pub const REFRESH_TOKEN: &str = "refresh_token";
/// Djombi access token minted by the profile service.
pub const DJOMBI_ACCESS_TOKEN: &str = "djombi_access_token";
/// Djombi refresh token.
pub const DJOMBI_REFRESH_TOKEN: &str = "djombi_refresh_token";
/// Legacy messaging token, lowest priority.
pub const MESSAGE_ACCESS_TOKEN: &str = "message_access_token";
/// Signed-in user's email.
pub const USER_EMAIL: &str = "user_email";
/// Signed-in user's display name.
pub const USER_NAME: &str = "user_name";
/// Signed-in user's id.
pub const USER_ID: &str = "user_id";
/// Current organization id.
pub const CURRENT_ORGANIZATION_ID: &str = "current_organization_id";
/// Current organization payload (JSON).
pub const CURRENT_ORGANIZATION_DATA: &str = "current_organization_data";
/// Selected email account id.
pub const SELECTED_EMAIL_ID: &str = "selected_email_id";
/// Selected email account type.
pub const SELECTED_EMAIL_TYPE: &str = "selected_email_type";
/// Selected email account payload (JSON).
pub const SELECTED_EMAIL_DATA: &str = "selected_email_data";
/// Linked email accounts (JSON array).
pub const LINKED_EMAIL_ACCOUNTS: &str = "linked_email_accounts";
/// `authenticated` once a login completed.
pub const AUTH_STATUS: &str = "auth_status";
/// RFC 3339 timestamp of the last login.
pub const LAST_LOGIN: &str = "last_login";

/// Every cookie the session context owns.
pub const ALL: &[&str] = &[
    ACCESS_TOKEN,
    REFRESH_TOKEN,
    DJOMBI_ACCESS_TOKEN,
    DJOMBI_REFRESH_TOKEN,
    MESSAGE_ACCESS_TOKEN,
    USER_EMAIL,
    USER_NAME,
    USER_ID,
    CURRENT_ORGANIZATION_ID,
    CURRENT_ORGANIZATION_DATA,
    SELECTED_EMAIL_ID,
    SELECTED_EMAIL_TYPE,
    SELECTED_EMAIL_DATA,
    LINKED_EMAIL_ACCOUNTS,
    AUTH_STATUS,
    LAST_LOGIN,
];

/// Cookies dropped when the organization scope is cleared.
pub const ORGANIZATION: &[&str] = &[CURRENT_ORGANIZATION_ID, CURRENT_ORGANIZATION_DATA];

/// Cookies dropped when the email selection is cleared.
pub const EMAIL: &[&str] = &[
    SELECTED_EMAIL_ID,
    SELECTED_EMAIL_TYPE,
    SELECTED_EMAIL_DATA,
    LINKED_EMAIL_ACCOUNTS,
];

/// Cookies holding Djombi credentials.
pub const DJOMBI: &[&str] = &[DJOMBI_ACCESS_TOKEN, DJOMBI_REFRESH_TOKEN];
