pub mod checkout;
pub mod clipboard;
pub mod constants;
pub mod pix;
pub mod pixel_tracking;
pub mod session_store;
pub mod shared_wheel_game;
pub mod validation;
