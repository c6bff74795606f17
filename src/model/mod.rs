//! Typed records synchronized from the remote wiki
//!
//! - `PageModel`: one wiki page (index page, novel, chapter)
//! - `NovelCollectionModel`: a novel's detail record with its books and chapters
//! - `NovelContentModel`: the rendered body of one page
//! - `ImageModel`: an image asset and where it lives locally

mod content;
mod image;
mod novel;
mod page;

pub use content::NovelContentModel;
pub use image::ImageModel;
pub use novel::{BookModel, NovelCollectionModel};
pub use page::{PageModel, PageType};
