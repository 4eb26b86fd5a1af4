pub mod attendances;
pub mod clients;
pub mod forms;
pub mod notifications;
pub mod nps;
pub mod users;
