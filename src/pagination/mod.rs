//! Opaque cursor pagination with RFC 8288 `Link` headers.
//!
//! The [`Paginator`] slices any ordered sequence given an id extractor.
//! Its `Link` header is an ordinary response header, so it passes through
//! content negotiation untouched.

mod cursor;
mod link;
mod paginator;
mod params;

pub use cursor::{Cursor, CursorError};
pub use link::build_link_header;
pub use paginator::{Page, Paginator};
pub use params::{DEFAULT_LIMIT, MAX_LIMIT, PageParams};
