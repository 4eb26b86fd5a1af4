pub mod attendance;
pub mod attendance_form;
pub mod client;
pub mod form_field;
pub mod notification;
pub mod nps;
pub mod role;
pub mod user;
