pub(crate) mod exams;
pub(crate) mod feedback;
pub(crate) mod profiles;
pub(crate) mod store;
pub(crate) mod submissions;
pub(crate) mod user_roles;

pub(crate) use store::{
    NewExam, NewFeedback, NewSubmission, PgStore, ProfileUpdate, RecordStore, StoreError,
    StoreResult,
};
