//! Benchmarks for clustering and rule mining
//!
//! Run with: cargo bench --package sources
//!
//! Uses a synthetic store so the numbers don't depend on a downloaded dataset.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use data_loader::{DataIndex, Genre, Movie, Rating};
use pipeline::FeatureBuilder;
use sources::{ClusterConfig, NeighborhoodFinder, RuleMiner};

const MOVIES: u32 = 500;
const USERS: u32 = 200;

fn synthetic_index() -> DataIndex {
    let mut index = DataIndex::new();
    let vocabulary = Genre::VOCABULARY;

    for id in 1..=MOVIES {
        let first = vocabulary[id as usize % vocabulary.len()];
        let second = vocabulary[(id as usize * 7) % vocabulary.len()];
        index.insert_movie(Movie {
            id,
            title: format!("Synthetic {} (2000)", id),
            genres: vec![first, second],
        });
    }

    for user_id in 1..=USERS {
        for step in 0..25 {
            let movie_id = (user_id * 13 + step * 17) % MOVIES + 1;
            let half_stars = (user_id + movie_id) % 10 + 1;
            index.insert_rating(Rating {
                user_id,
                movie_id,
                rating: half_stars as f32 / 2.0,
                timestamp: 0,
            });
        }
    }

    index
}

fn bench_movie_cluster(c: &mut Criterion) {
    let index = synthetic_index();
    let finder = NeighborhoodFinder::new(ClusterConfig::default());

    c.bench_function("movie_cluster", |b| {
        b.iter(|| {
            let cluster = finder.movie_cluster(&index, black_box(1), black_box(8));
            black_box(cluster)
        })
    });
}

fn bench_user_cluster(c: &mut Criterion) {
    let index = synthetic_index();
    let finder = NeighborhoodFinder::new(ClusterConfig::default());
    let movie_id = index.user_ratings(1).next().map(|r| r.movie_id).unwrap_or(1);

    c.bench_function("user_cluster", |b| {
        b.iter(|| {
            let cluster = finder.user_cluster(&index, black_box(1), movie_id, 8, 8);
            black_box(cluster)
        })
    });
}

fn bench_mined_rules(c: &mut Criterion) {
    let index = synthetic_index();
    let miner = RuleMiner::new();

    c.bench_function("mined_rules", |b| {
        b.iter(|| {
            let rules = miner.mined_rules(&FeatureBuilder::new(&index), black_box(1));
            black_box(rules)
        })
    });
}

criterion_group!(
    benches,
    bench_movie_cluster,
    bench_user_cluster,
    bench_mined_rules
);
criterion_main!(benches);
