pub mod couple;
pub mod session;
pub mod task;
pub mod user;

pub use couple::Couple;
pub use session::Session;
pub use task::{NewTask, NewTaskRequest, Task, UpdateStatusRequest};
pub use user::{LoginRequest, NewUser, RegisterRequest, User, UserProfile};
