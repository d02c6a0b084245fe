use data_loader::DataIndex;
use std::path::Path;
use std::time::Instant;

fn main() -> data_loader::Result<()> {
    let root = Path::new("data/raw");

    println!("Loading MovieLens ml-latest-small dataset...\n");

    let start = Instant::now();
    let index = DataIndex::load_dataset(root, "ml-latest-small")?;
    let elapsed = start.elapsed();

    let (users, movies, ratings) = index.counts();

    println!("\n=== Load Complete ===");
    println!("Time taken: {:?}", elapsed);
    println!("Users: {}", users);
    println!("Movies: {}", movies);
    println!("Ratings: {}", ratings);
    println!("Tags: {}", index.tags().len());
    println!("\nPerformance: {:.0} ratings/second",
             ratings as f64 / elapsed.as_secs_f64());
    Ok(())
}
