pub mod app;
pub mod cli;
pub mod controller;
pub mod display;
pub mod error;
pub mod export;
pub mod ids;
pub mod logging;
pub mod merge;
pub mod model;
pub mod notify;
pub mod pomodoro;
pub mod recurrence;
pub mod reminder;
pub mod sort;
pub mod storage;
pub mod ticker;
pub mod util;

pub use app::run;
pub use controller::TodoApp;
pub use error::TodoError;
