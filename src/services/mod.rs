pub(crate) mod access_window;
pub(crate) mod errors;
pub(crate) mod ranking;
pub(crate) mod schedule;
pub(crate) mod scoring;
