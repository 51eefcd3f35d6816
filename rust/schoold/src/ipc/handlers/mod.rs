pub mod assignments;
pub mod attendance;
pub mod classes;
pub mod core;
pub mod grades;
pub mod parents;
pub mod reports;
pub mod students;
