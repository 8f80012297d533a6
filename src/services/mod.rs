pub mod accounts;
pub mod notification;
pub mod session_sweeper;
pub mod tasks;

pub use accounts::AccountService;
pub use session_sweeper::SessionSweeper;
pub use tasks::TaskService;
