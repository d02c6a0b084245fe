//! Example: Inspect the neighborhoods and rules behind one prediction
//!
//! Run with: cargo run --package sources --example inspect_user
//!
//! This example shows how to:
//! 1. Load the small MovieLens release
//! 2. Find the movie's genre cluster and the user's peer cluster
//! 3. Mine the user's genre → rating rules
//! 4. Display the rules that apply to the movie

use data_loader::DataIndex;
use pipeline::FeatureBuilder;
use sources::{ClusterConfig, NeighborhoodFinder, RuleMetric, RuleMiner};
use std::path::Path;
use std::time::Instant;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("info")
        .init();

    println!("=== Rating Signals Example ===\n");

    println!("Loading MovieLens dataset...");
    let start = Instant::now();
    let index = DataIndex::load_dataset(Path::new("data/raw"), "ml-latest-small")?;
    println!("Loaded dataset in {:?}\n", start.elapsed());

    let (user_id, movie_id) = (1, 1);
    let movie = index.movie_by_id(movie_id)?;
    println!("Target: user {} / {}\n", user_id, movie.title);

    let finder = NeighborhoodFinder::new(ClusterConfig::default());
    let start = Instant::now();
    let movies = finder.movie_cluster(&index, movie_id, 8)?;
    let users = finder.user_cluster(&index, user_id, movie_id, 8, 8)?;
    println!(
        "Movie cluster: {} movies, user cluster: {} users ({:?})",
        movies.len(),
        users.len(),
        start.elapsed()
    );
    match finder.neighborhood_average(&index, user_id, movie_id, 8, 8)? {
        Some(average) => println!("Neighborhood average: {:.3}\n", average),
        None => println!("No peer rated this movie\n"),
    }

    let start = Instant::now();
    let rules = RuleMiner::new().mined_rules(&FeatureBuilder::new(&index), user_id)?;
    let relevant = sources::relevant_rules(&rules, &movie.genre_set());
    println!(
        "Mined {} rules, {} relevant ({:?})",
        rules.len(),
        relevant.len(),
        start.elapsed()
    );
    for rule in relevant.iter().take(10) {
        println!("  {}", rule);
    }

    if let Some(prediction) = sources::rule_weighted_prediction(&relevant, RuleMetric::Confidence) {
        println!("\nRule-weighted prediction: {:.3}", prediction);
    }

    Ok(())
}
