pub mod customer;
pub mod task;
pub mod template;

pub use customer::NewInteraction;
pub use task::NewTask;
pub use template::EmailTemplate;
