pub mod color;
pub mod handler;
pub mod layout;
pub mod renderer;
pub mod types;

pub use color::{ColorParseError, Rgba};
pub use handler::create_cover_router;
pub use layout::{FontFit, SvgTextMeasurer, TextMeasure, fit_font_size, initial_font_size};
pub use renderer::{RenderedCover, render_cover, render_cover_async, to_data_url};
pub use types::{CoverQuery, GenerateResponse, RenderRequest};
