//! # Data Loader Crate
//!
//! This crate loads the MovieLens "latest" datasets and holds them in the
//! rating store used by the prediction engine.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, Tag, Link, Genre, RatingBucket, DataIndex)
//! - **parser**: Parse the CSV tables into Rust structs
//! - **index**: Load a dataset directory and validate it
//! - **error**: Load and lookup errors
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::DataIndex;
//! use std::path::Path;
//!
//! let mut index = DataIndex::load_dataset(Path::new("data/raw"), "ml-latest-small")?;
//!
//! let title = index.movie_by_id(1)?.title.clone();
//! let existed = index.delete_rating(1, 1)?;
//! println!("{} rating removed: {}", title, existed);
//! ```

// Public modules
pub mod error;
pub mod types;
pub mod parser;
pub mod index;

// Re-export commonly used types for convenience
pub use error::{DataError, Result};
pub use types::{
    // Type aliases
    UserId,
    MovieId,
    // Core types
    Dataset,
    Movie,
    Link,
    Rating,
    Tag,
    RatingBucket,
    DataIndex,
    // Enums
    Genre,
};
