pub mod models;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use services::slots::generate_slots;
pub use services::blocks::BlockService;
pub use services::template::TemplateService;
pub use router::create_schedule_router;
