//! DataIndex building and validation.
//!
//! Loads the four MovieLens tables into a `DataIndex`:
//! - Resolve a dataset name to its directory
//! - Parse the tables in parallel with Rayon
//! - Insert everything and check referential integrity

use crate::error::{DataError, Result};
use crate::parser;
use crate::types::*;
use std::path::Path;
use tracing::{info, instrument};

impl DataIndex {
    /// Load a named dataset from `<root>/<name>/`.
    ///
    /// Fails with `InvalidDataset` before touching the filesystem if the
    /// name is not a known MovieLens release.
    pub fn load_dataset(root: &Path, name: &str) -> Result<Self> {
        let dataset: Dataset = name.parse()?;
        let mut index = Self::load_from_files(&root.join(dataset.dir_name()))?;
        index.name = dataset.to_string();
        Ok(index)
    }

    /// Load the four MovieLens tables from a directory
    ///
    /// Steps:
    /// 1. Parse links, movies, ratings and tags in parallel
    /// 2. Build primary and secondary indices
    /// 3. Validate data integrity
    #[instrument]
    pub fn load_from_files(data_dir: &Path) -> Result<Self> {
        info!("Loading MovieLens tables from {:?}", data_dir);

        let links_path = data_dir.join("links.csv");
        let movies_path = data_dir.join("movies.csv");
        let ratings_path = data_dir.join("ratings.csv");
        let tags_path = data_dir.join("tags.csv");

        // Nested joins give four-way parallelism
        let ((links, movies), (ratings, tags)) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_links(&links_path),
                    || parser::parse_movies(&movies_path),
                )
            },
            || {
                rayon::join(
                    || parser::parse_ratings(&ratings_path),
                    || parser::parse_tags(&tags_path),
                )
            },
        );

        let links = links?;
        let movies = movies?;
        let ratings = ratings?;
        let tags = tags?;

        info!(
            "Parsed {} links, {} movies, {} ratings, {} tags",
            links.len(),
            movies.len(),
            ratings.len(),
            tags.len()
        );

        let mut index = DataIndex::new();
        index.name = data_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        for link in links {
            index.insert_link(link);
        }
        for movie in movies {
            index.insert_movie(movie);
        }
        for rating in ratings {
            index.insert_rating(rating);
        }
        for tag in tags {
            index.insert_tag(tag);
        }

        index.validate()?;

        let (users, movies, ratings) = index.counts();
        info!(users, movies, ratings, "DataIndex built and validated");
        Ok(index)
    }

    /// Validate data integrity
    ///
    /// Check that:
    /// - All rating.movie_id references exist in movies
    /// - Ratings are half-integers in the valid range (0.5 - 5.0)
    pub fn validate(&self) -> Result<()> {
        for rating in self.ratings.values() {
            if !self.movies.contains_key(&rating.movie_id) {
                return Err(DataError::MissingReference {
                    entity: "Movie".to_string(),
                    id: rating.movie_id,
                });
            }
            if RatingBucket::from_rating(rating.rating).is_none() {
                return Err(DataError::InvalidValue {
                    field: "rating".to_string(),
                    value: rating.rating.to_string(),
                });
            }
        }
        Ok(())
    }
}
