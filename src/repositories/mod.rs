pub(crate) mod classes;
pub(crate) mod exams;
pub(crate) mod questions;
pub(crate) mod results;
pub(crate) mod subjects;
pub(crate) mod terms;
pub(crate) mod users;
