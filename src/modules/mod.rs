pub mod articles;
pub mod assignments;
pub mod courses;
pub mod learning;
pub mod quizzes;
pub mod users;
pub mod webinars;
