pub(crate) mod demo_seed;
pub(crate) mod exams;
pub(crate) mod identity;
pub(crate) mod roles;
pub(crate) mod route_guard;
pub(crate) mod session;
pub(crate) mod session_registry;
pub(crate) mod storage;
pub(crate) mod uploads;
