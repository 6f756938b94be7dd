pub(crate) mod auth;
pub(crate) mod dashboard;
pub(crate) mod errors;
pub(crate) mod exams;
pub(crate) mod feedback;
pub(crate) mod forms;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod profile;
pub(crate) mod router;
pub(crate) mod session;
pub(crate) mod submissions;
pub(crate) mod users;
pub(crate) mod validation;
