pub mod customers;
pub mod email;
pub mod tasks;
pub mod templates;

pub use customers::CustomerService;
pub use email::EmailService;
pub use tasks::TaskService;
pub use templates::TemplateService;
