pub mod ad_events;
pub mod checkout;
pub mod pix;
pub mod wheel;
