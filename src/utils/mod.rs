pub mod io;
pub mod parallel;
