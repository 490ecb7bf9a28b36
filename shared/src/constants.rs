pub const MIN_PIX_VALUE_CENTS: i64 = 50;
pub const DEFAULT_CURRENCY: &str = "BRL";

pub const INVALID_PIX_VALUE_ERROR: &str = "The value field must be an integer amount in cents (minimum 50)";
pub const MISSING_PIX_ID_ERROR: &str = "PIX id is required";
pub const INVALID_PIX_ID_ERROR: &str = "PIX id may only contain letters, digits, '-' and '_'";
pub const INVALID_ROTATION_ERROR: &str = "current_rotation is out of range";
pub const MISSING_EVENT_FIELDS_ERROR: &str = "pixelId, accessToken and eventName are required";
pub const PAYMENT_NOT_IDENTIFIED_MESSAGE: &str = "Payment not identified yet, please try again.";
pub const ALREADY_PLAYED_ERROR: &str = "The discount wheel has already been played in this session";
pub const WHEEL_INACTIVE_ERROR: &str = "The discount wheel is not active";

// Persisted per browser session
pub const WHEEL_PLAYED_KEY: &str = "wheel_played";
pub const WHEEL_WON_KEY: &str = "wheel_won";

pub const SESSION_COOKIE_NAME: &str = "checkout_session";

// Larger wheel angles lose the precision needed to keep spinning forward
pub const MAX_WHEEL_ROTATION_DEG: f64 = 1.0e9;

// Timers, in milliseconds
pub const SPIN_DURATION_MS: u32 = 3000;
pub const AUTO_CLOSE_ON_LOSS_MS: u32 = 2000;
pub const REVISIT_CLOSE_DELAY_MS: u32 = 500;
pub const PAYMENT_CONFIRMED_CLOSE_MS: u32 = 3000;
pub const COPY_FEEDBACK_MS: u32 = 2000;
