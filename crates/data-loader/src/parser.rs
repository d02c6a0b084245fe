//! Parser for MovieLens CSV tables.
//!
//! Each table has a header row:
//! - links.csv:   movieId,imdbId,tmdbId
//! - movies.csv:  movieId,title,genres   (genres pipe-separated)
//! - ratings.csv: userId,movieId,rating,timestamp
//! - tags.csv:    userId,movieId,tag,timestamp
//!
//! Titles and tags may be quoted and contain commas, so rows go through the
//! `csv` crate and serde rather than a manual split.

use crate::error::{DataError, Result};
use crate::types::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MovieRecord {
    movie_id: MovieId,
    title: String,
    genres: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingRecord {
    user_id: UserId,
    movie_id: MovieId,
    rating: f32,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TagRecord {
    user_id: UserId,
    movie_id: MovieId,
    tag: String,
    timestamp: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRecord {
    movie_id: MovieId,
    imdb_id: String,
    tmdb_id: Option<u32>,
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Deserialize every row of a CSV table
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(DataError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let file = file_label(path);
    let mut reader = csv::Reader::from_reader(File::open(path)?);

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: T = result.map_err(|e| DataError::ParseError {
            file: file.clone(),
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Parse movies.csv
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    read_records::<MovieRecord>(path)?
        .into_iter()
        .map(|record| {
            Ok(Movie {
                id: record.movie_id,
                title: record.title,
                genres: parse_genres(&record.genres)?,
            })
        })
        .collect()
}

/// Parse ratings.csv
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    Ok(read_records::<RatingRecord>(path)?
        .into_iter()
        .map(|record| Rating {
            user_id: record.user_id,
            movie_id: record.movie_id,
            rating: record.rating,
            timestamp: record.timestamp,
        })
        .collect())
}

/// Parse tags.csv; a missing file yields no tags
pub fn parse_tags(path: &Path) -> Result<Vec<Tag>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(read_records::<TagRecord>(path)?
        .into_iter()
        .map(|record| Tag {
            user_id: record.user_id,
            movie_id: record.movie_id,
            tag: record.tag,
            timestamp: record.timestamp,
        })
        .collect())
}

/// Parse links.csv; a missing file yields no links
pub fn parse_links(path: &Path) -> Result<Vec<Link>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(read_records::<LinkRecord>(path)?
        .into_iter()
        .map(|record| Link {
            movie_id: record.movie_id,
            imdb_id: record.imdb_id,
            tmdb_id: record.tmdb_id,
        })
        .collect())
}

/// Parse a genre label into Genre enum
///
/// Example: "Action" -> Ok(Genre::Action)
///          "Sci-Fi" -> Ok(Genre::SciFi)
pub fn parse_genre(s: &str) -> Result<Genre> {
    match s {
        "Action" => Ok(Genre::Action),
        "Adventure" => Ok(Genre::Adventure),
        "Animation" => Ok(Genre::Animation),
        // MovieLens 1M spells it "Children's"
        "Children" | "Children's" => Ok(Genre::Children),
        "Comedy" => Ok(Genre::Comedy),
        "Crime" => Ok(Genre::Crime),
        "Documentary" => Ok(Genre::Documentary),
        "Drama" => Ok(Genre::Drama),
        "Fantasy" => Ok(Genre::Fantasy),
        "Film-Noir" => Ok(Genre::FilmNoir),
        "Horror" => Ok(Genre::Horror),
        "IMAX" => Ok(Genre::Imax),
        "Musical" => Ok(Genre::Musical),
        "Mystery" => Ok(Genre::Mystery),
        "Romance" => Ok(Genre::Romance),
        "Sci-Fi" => Ok(Genre::SciFi),
        "Thriller" => Ok(Genre::Thriller),
        "War" => Ok(Genre::War),
        "Western" => Ok(Genre::Western),
        "(no genres listed)" => Ok(Genre::NoGenresListed),
        _ => Err(DataError::InvalidValue {
            field: "genre".to_string(),
            value: s.to_string(),
        }),
    }
}

/// Parse pipe-separated genres
///
/// Example: "Action|Adventure|Sci-Fi" -> vec![Genre::Action, Genre::Adventure, Genre::SciFi]
pub fn parse_genres(s: &str) -> Result<Vec<Genre>> {
    s.split('|').map(|label| parse_genre(label.trim())).collect()
}
