pub mod analysis;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod lifi;
pub mod profile;
pub mod send_email;
pub mod vitals;
