//! Core domain types for the MovieLens "latest" datasets.
//!
//! This module defines the fundamental data structures used throughout the system:
//! - Type aliases for domain clarity (UserId, MovieId)
//! - Movies, ratings, tags and links as plain structs
//! - The genre vocabulary and the half-star rating buckets used for rule mining
//! - `DataIndex`, the in-memory rating store

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{DataError, Result};

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

// =============================================================================
// Dataset names
// =============================================================================

/// The MovieLens releases this crate knows how to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dataset {
    /// 100836 ratings and 3683 tag applications across 9742 movies
    #[default]
    MlLatestSmall,
    /// The full "latest" release (tens of millions of ratings)
    MlLatest,
}

impl Dataset {
    /// Directory name of the dataset under the raw data root
    pub fn dir_name(&self) -> &'static str {
        match self {
            Dataset::MlLatestSmall => "ml-latest-small",
            Dataset::MlLatest => "ml-latest",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl FromStr for Dataset {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ml-latest-small" => Ok(Dataset::MlLatestSmall),
            "ml-latest" => Ok(Dataset::MlLatest),
            _ => Err(DataError::InvalidDataset {
                name: s.to_string(),
            }),
        }
    }
}

// =============================================================================
// Movie-related Types
// =============================================================================

/// Represents a movie in the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    /// Title including the release year, e.g. "Toy Story (1995)"
    pub title: String,
    /// Genres exactly as listed in movies.csv (may be the sentinel alone)
    pub genres: Vec<Genre>,
}

impl Movie {
    /// Genres of the movie without the "(no genres listed)" sentinel
    pub fn genre_set(&self) -> BTreeSet<Genre> {
        self.genres
            .iter()
            .copied()
            .filter(|genre| !genre.is_sentinel())
            .collect()
    }
}

/// Movie genres from MovieLens.
///
/// The 19 real genres plus the `NoGenresListed` sentinel, which is kept on
/// the movie but never becomes a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Children,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Fantasy,
    FilmNoir,
    Horror,
    Imax,
    Musical,
    Mystery,
    Romance,
    SciFi,
    Thriller,
    War,
    Western,
    NoGenresListed,
}

impl Genre {
    /// Feature vocabulary: every genre except the sentinel, in column order
    pub const VOCABULARY: [Genre; 19] = [
        Genre::Action,
        Genre::Adventure,
        Genre::Animation,
        Genre::Children,
        Genre::Comedy,
        Genre::Crime,
        Genre::Documentary,
        Genre::Drama,
        Genre::Fantasy,
        Genre::FilmNoir,
        Genre::Horror,
        Genre::Imax,
        Genre::Musical,
        Genre::Mystery,
        Genre::Romance,
        Genre::SciFi,
        Genre::Thriller,
        Genre::War,
        Genre::Western,
    ];

    /// Label as it appears in movies.csv
    pub fn label(&self) -> &'static str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Children => "Children",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Fantasy => "Fantasy",
            Genre::FilmNoir => "Film-Noir",
            Genre::Horror => "Horror",
            Genre::Imax => "IMAX",
            Genre::Musical => "Musical",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFi => "Sci-Fi",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
            Genre::NoGenresListed => "(no genres listed)",
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Genre::NoGenresListed)
    }

    /// Column of this genre in the one-hot vocabulary, `None` for the sentinel
    pub fn column(&self) -> Option<usize> {
        Genre::VOCABULARY.iter().position(|g| g == self)
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identifiers linking a movie to IMDb and TMDb
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub movie_id: MovieId,
    /// Kept as text: IMDb ids carry leading zeros ("0114709")
    pub imdb_id: String,
    pub tmdb_id: Option<u32>,
}

// =============================================================================
// Rating and Tag Types
// =============================================================================

/// Represents a single rating from a user for a movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Half-star rating from 0.5 to 5.0
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

/// Free-text tag applied by a user to a movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub tag: String,
    pub timestamp: i64,
}

/// One-hot discretization of a half-star rating.
///
/// Stored as the number of half stars, so `RatingBucket(8)` is 4.0 stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RatingBucket(u8);

impl RatingBucket {
    pub const MIN_HALF_STARS: u8 = 1;
    pub const MAX_HALF_STARS: u8 = 10;

    /// Bucket for a rating value, `None` unless it is a half-integer in [0.5, 5.0]
    pub fn from_rating(rating: f32) -> Option<Self> {
        let doubled = rating * 2.0;
        let half_stars = doubled.round();
        if (doubled - half_stars).abs() > 1e-4 {
            return None;
        }
        let half_stars = half_stars as i32;
        if half_stars < Self::MIN_HALF_STARS as i32 || half_stars > Self::MAX_HALF_STARS as i32 {
            return None;
        }
        Some(RatingBucket(half_stars as u8))
    }

    /// Numeric rating this bucket stands for
    pub fn value(&self) -> f64 {
        self.0 as f64 / 2.0
    }

    pub fn half_stars(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for RatingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rating_{:.1}", self.value())
    }
}

// =============================================================================
// DataIndex - The Rating Store
// =============================================================================

/// In-memory view of the four MovieLens tables.
///
/// Ratings are keyed by `(user_id, movie_id)` in a `BTreeMap`, which gives
/// both the uniqueness invariant and the `(user, movie)` ordering for free.
/// `delete_rating` is the only mutation after loading; it bumps `generation`.
/// Every mutation also takes a fresh process-wide `revision`, so memoized
/// derived values can tell both a changed store and a different store apart.
#[derive(Debug, Clone)]
pub struct DataIndex {
    pub(crate) name: String,

    // Primary data stores
    pub(crate) movies: BTreeMap<MovieId, Movie>,
    pub(crate) links: BTreeMap<MovieId, Link>,
    pub(crate) ratings: BTreeMap<(UserId, MovieId), Rating>,
    pub(crate) tags: Vec<Tag>,

    /// Users who rated each movie (secondary index over `ratings`)
    pub(crate) movie_raters: HashMap<MovieId, BTreeSet<UserId>>,

    pub(crate) generation: u64,
    revision: u64,
}

static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

impl DataIndex {
    /// Creates a new, empty DataIndex
    pub fn new() -> Self {
        Self {
            name: String::new(),
            movies: BTreeMap::new(),
            links: BTreeMap::new(),
            ratings: BTreeMap::new(),
            tags: Vec::new(),
            movie_raters: HashMap::new(),
            generation: 0,
            revision: next_revision(),
        }
    }

    /// Name of the dataset this index was loaded from (empty for synthetic indices)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of successful deletions since the index was built
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Token for the current contents.
    ///
    /// Unique per mutation across the process; clones share it until one of
    /// them changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // Getters

    /// Get a movie by ID
    pub fn get_movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    /// Get a movie by ID, failing with `UnknownMovie` if it is not in the movie table
    pub fn movie_by_id(&self, id: MovieId) -> Result<&Movie> {
        self.movies.get(&id).ok_or(DataError::UnknownMovie(id))
    }

    /// All movies ordered by id
    pub fn movies(&self) -> impl Iterator<Item = &Movie> + '_ {
        self.movies.values()
    }

    pub fn get_link(&self, movie_id: MovieId) -> Option<&Link> {
        self.links.get(&movie_id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// Ratings filtered by user and/or movie, ordered by `(user_id, movie_id)`.
    ///
    /// Both filters absent returns every rating.
    pub fn ratings_for(&self, user_id: Option<UserId>, movie_id: Option<MovieId>) -> Vec<Rating> {
        match (user_id, movie_id) {
            (Some(user_id), Some(movie_id)) => {
                self.ratings.get(&(user_id, movie_id)).copied().into_iter().collect()
            }
            (Some(user_id), None) => self.user_ratings(user_id).copied().collect(),
            (None, Some(movie_id)) => self.movie_ratings(movie_id).copied().collect(),
            (None, None) => self.ratings.values().copied().collect(),
        }
    }

    /// Ratings made by a user, ordered by movie id
    pub fn user_ratings(&self, user_id: UserId) -> impl Iterator<Item = &Rating> + '_ {
        self.ratings
            .range((user_id, MovieId::MIN)..=(user_id, MovieId::MAX))
            .map(|(_, rating)| rating)
    }

    /// Ratings received by a movie, ordered by user id
    pub fn movie_ratings(&self, movie_id: MovieId) -> impl Iterator<Item = &Rating> + '_ {
        self.movie_raters
            .get(&movie_id)
            .into_iter()
            .flatten()
            .filter_map(move |&user_id| self.ratings.get(&(user_id, movie_id)))
    }

    /// Look up a single rating
    pub fn get_rating(&self, user_id: UserId, movie_id: MovieId) -> Option<&Rating> {
        self.ratings.get(&(user_id, movie_id))
    }

    /// Whether the user appears in the ratings table
    pub fn has_user(&self, user_id: UserId) -> bool {
        self.user_ratings(user_id).next().is_some()
    }

    /// Distinct users appearing in the ratings table, ascending
    pub fn user_ids(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.ratings.keys().map(|&(user_id, _)| user_id).collect();
        users.dedup();
        users
    }

    // Mutators

    /// Insert a movie into the index
    pub fn insert_movie(&mut self, movie: Movie) {
        self.revision = next_revision();
        self.movies.insert(movie.id, movie);
    }

    pub fn insert_link(&mut self, link: Link) {
        self.revision = next_revision();
        self.links.insert(link.movie_id, link);
    }

    pub fn insert_tag(&mut self, tag: Tag) {
        self.revision = next_revision();
        self.tags.push(tag);
    }

    /// Insert a rating and update indices.
    ///
    /// A rating for an existing `(user_id, movie_id)` pair replaces the old
    /// one, which is returned.
    pub fn insert_rating(&mut self, rating: Rating) -> Option<Rating> {
        self.revision = next_revision();
        self.movie_raters
            .entry(rating.movie_id)
            .or_default()
            .insert(rating.user_id);
        self.ratings.insert((rating.user_id, rating.movie_id), rating)
    }

    /// Remove a rating, simulating an unknown ground truth.
    ///
    /// Checks run in a fixed order: the user must appear in the ratings
    /// table (`UnknownUser`), then the movie must be in the movie table
    /// (`UnknownMovie`). Returns whether the rating existed.
    pub fn delete_rating(&mut self, user_id: UserId, movie_id: MovieId) -> Result<bool> {
        if !self.has_user(user_id) {
            return Err(DataError::UnknownUser(user_id));
        }
        if !self.movies.contains_key(&movie_id) {
            return Err(DataError::UnknownMovie(movie_id));
        }

        if self.ratings.remove(&(user_id, movie_id)).is_none() {
            return Ok(false);
        }

        if let Some(raters) = self.movie_raters.get_mut(&movie_id) {
            raters.remove(&user_id);
            if raters.is_empty() {
                self.movie_raters.remove(&movie_id);
            }
        }
        self.generation += 1;
        self.revision = next_revision();
        debug!(user_id, movie_id, generation = self.generation, "Rating deleted");
        Ok(true)
    }

    /// Number of ratings currently in the store
    pub fn rating_count(&self) -> usize {
        self.ratings.len()
    }

    /// Get (users, movies, ratings) counts for debugging/validation
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.user_ids().len(), self.movies.len(), self.ratings.len())
    }
}

// Implement Default trait for convenience
impl Default for DataIndex {
    fn default() -> Self {
        Self::new()
    }
}
