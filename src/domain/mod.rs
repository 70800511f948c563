//! Records owned by a user and the validated payloads that create or edit them.

pub mod note;
pub mod task;
pub mod user;
pub mod validation;

pub use note::{search_notes, CreateNote, Note, UpdateNote};
pub use task::{CreateTask, Priority, Task, UpdateTask};
pub use user::{RegistrationRequest, UpdateProfile, User, UserRecord};
pub use validation::ValidationError;
