pub mod handler;

pub use handler::{create_ui_router, index_page};
