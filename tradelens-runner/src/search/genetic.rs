//! Genetic mode — evolve a population of strategy subsets.
//!
//! A chromosome is a set of strategy indices with a size in
//! `[min_strategies, max_strategies]`, stored in gene order. Each generation:
//!
//! 1. The `elite_count` fittest chromosomes pass through unchanged.
//! 2. Parents are picked by tournament (size 3, best wins, first found on ties).
//! 3. Single-point crossover at rate 0.7; children are the order-preserving
//!    union of a prefix of one parent and the suffix of the other, truncated
//!    to the maximum size and topped up with random unused strategies when
//!    below the minimum.
//! 4. Each child mutates with probability 0.1, removing one member or adding
//!    one unused strategy (a fair coin, constrained by the size bounds).
//!
//! Every newly seen member set is merged into the leaderboard, so it
//! accumulates the best portfolios across all generations. Fitness is cached
//! per member set and never recomputed.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tradelens_core::{RngHierarchy, StrategyLedger};

use super::{SearchConfig, SearchDriver, SearchError, SearchHooks, SearchOutcome};

pub const TOURNAMENT_SIZE: usize = 3;
pub const CROSSOVER_RATE: f64 = 0.7;
pub const MUTATION_RATE: f64 = 0.1;

type Chromosome = Vec<usize>;

/// Fitness summary of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// 0 is the initial random population.
    pub generation: usize,
    /// Best defined fitness in the population.
    pub best: Option<f64>,
    /// Mean of the finite fitness values.
    pub mean: Option<f64>,
    /// Distinct member sets scored so far.
    pub evaluated: usize,
}

/// Run the genetic search described in the module docs.
///
/// The random source is derived from `config.seed`, so a fixed seed replays
/// the same populations and the same leaderboard. A zero `population_size`
/// yields an empty result; zero `generations` scores only the initial
/// population.
pub fn genetic_search(
    strategies: &[StrategyLedger],
    config: &SearchConfig,
    hooks: SearchHooks<'_>,
) -> Result<SearchOutcome, SearchError> {
    let Some((mut driver, min_size, max_size)) = SearchDriver::start(strategies, config, hooks)?
    else {
        return Ok(SearchOutcome::empty());
    };

    let rngs = RngHierarchy::from_optional(config.seed);
    let seed = rngs.master_seed();
    let pop_size = config.population_size;
    if pop_size == 0 {
        debug!("population_size is 0, nothing to evolve");
        return Ok(driver.finish(0, false, false, Some(seed), Vec::new()));
    }

    let n = driver.strategies().len();
    let elite = config.elite_count.min(pop_size);
    let planned = (pop_size as u64).saturating_mul(config.generations as u64 + 1);
    info!(
        seed,
        strategies = n,
        population = pop_size,
        generations = config.generations,
        elite,
        ranking = %config.ranking_function,
        "starting genetic search"
    );

    if driver.is_cancelled() {
        return Ok(driver.finish(planned, true, false, Some(seed), Vec::new()));
    }

    let mut rng = rngs.rng_for("genetic", 0);
    let mut cache: HashMap<Chromosome, f64> = HashMap::new();

    let mut population: Vec<Chromosome> = (0..pop_size)
        .map(|_| random_chromosome(&mut rng, n, min_size, max_size))
        .collect();
    let mut fitness = evaluate_population(&mut driver, &population, &mut cache)?;
    let mut history = vec![generation_stats(0, &fitness, driver.evaluated)];
    driver.report(0, config.generations as u64);

    let mut cancelled = false;
    for generation in 1..=config.generations {
        if driver.is_cancelled() {
            cancelled = true;
            break;
        }

        let mut next = elites(&population, &fitness, elite);
        while next.len() < pop_size {
            let a = tournament(&fitness, &mut rng);
            let b = tournament(&fitness, &mut rng);
            let (mut c1, mut c2) = if rng.gen_bool(CROSSOVER_RATE) {
                crossover(&population[a], &population[b], &mut rng)
            } else {
                (population[a].clone(), population[b].clone())
            };
            for child in [&mut c1, &mut c2] {
                repair(child, n, min_size, max_size, &mut rng);
                mutate(child, n, min_size, max_size, &mut rng);
            }
            next.push(c1);
            if next.len() < pop_size {
                next.push(c2);
            }
        }

        population = next;
        fitness = evaluate_population(&mut driver, &population, &mut cache)?;
        let stats = generation_stats(generation, &fitness, driver.evaluated);
        debug!(generation, best = ?stats.best, mean = ?stats.mean, "generation complete");
        history.push(stats);
        driver.report(generation as u64, config.generations as u64);
    }

    Ok(driver.finish(planned, cancelled, false, Some(seed), history))
}

/// Score the population, reusing cached fitness for known member sets.
///
/// New member sets are scored as one parallel batch and recorded in
/// first-appearance order.
fn evaluate_population(
    driver: &mut SearchDriver<'_>,
    population: &[Chromosome],
    cache: &mut HashMap<Chromosome, f64>,
) -> Result<Vec<f64>, SearchError> {
    let keys: Vec<Chromosome> = population.iter().map(|c| canonical(c)).collect();

    let mut queued: HashSet<&Chromosome> = HashSet::new();
    let pending: Vec<Chromosome> = keys
        .iter()
        .filter(|k| !cache.contains_key(*k) && queued.insert(*k))
        .cloned()
        .collect();

    if !pending.is_empty() {
        let scored = driver.evaluate_batch(&pending)?;
        for (key, candidate) in pending.into_iter().zip(&scored) {
            cache.insert(key, candidate.score);
        }
        driver.record(scored);
    }

    Ok(keys
        .iter()
        .map(|k| cache.get(k).copied().unwrap_or(f64::NAN))
        .collect())
}

fn canonical(chromosome: &[usize]) -> Chromosome {
    let mut key = chromosome.to_vec();
    key.sort_unstable();
    key
}

/// Undefined fitness loses every comparison.
fn selection_score(fitness: f64) -> f64 {
    if fitness.is_nan() {
        f64::NEG_INFINITY
    } else {
        fitness
    }
}

fn random_chromosome(rng: &mut StdRng, n: usize, min_size: usize, max_size: usize) -> Chromosome {
    let k = rng.gen_range(min_size..=max_size);
    index::sample(rng, n, k).into_vec()
}

fn elites(population: &[Chromosome], fitness: &[f64], count: usize) -> Vec<Chromosome> {
    let mut order: Vec<usize> = (0..population.len()).collect();
    // Stable sort keeps the earlier chromosome first on ties.
    order.sort_by(|&a, &b| selection_score(fitness[b]).total_cmp(&selection_score(fitness[a])));
    order
        .into_iter()
        .take(count)
        .map(|i| population[i].clone())
        .collect()
}

fn tournament(fitness: &[f64], rng: &mut StdRng) -> usize {
    let mut best = rng.gen_range(0..fitness.len());
    for _ in 1..TOURNAMENT_SIZE {
        let challenger = rng.gen_range(0..fitness.len());
        if selection_score(fitness[challenger]) > selection_score(fitness[best]) {
            best = challenger;
        }
    }
    best
}

fn crossover(a: &[usize], b: &[usize], rng: &mut StdRng) -> (Chromosome, Chromosome) {
    let shortest = a.len().min(b.len());
    let point = if shortest > 1 {
        rng.gen_range(1..shortest)
    } else {
        shortest
    };
    (
        ordered_union(&a[..point], &b[point..]),
        ordered_union(&b[..point], &a[point..]),
    )
}

fn ordered_union(head: &[usize], tail: &[usize]) -> Chromosome {
    let mut out = Vec::with_capacity(head.len() + tail.len());
    for &gene in head.iter().chain(tail) {
        if !out.contains(&gene) {
            out.push(gene);
        }
    }
    out
}

fn push_unused(child: &mut Chromosome, n: usize, rng: &mut StdRng) -> bool {
    let unused: Vec<usize> = (0..n).filter(|i| !child.contains(i)).collect();
    match unused.choose(rng) {
        Some(&gene) => {
            child.push(gene);
            true
        }
        None => false,
    }
}

/// Clip to `max_size`, then top up to `min_size` with unused strategies.
fn repair(child: &mut Chromosome, n: usize, min_size: usize, max_size: usize, rng: &mut StdRng) {
    child.truncate(max_size);
    while child.len() < min_size {
        if !push_unused(child, n, rng) {
            break;
        }
    }
}

fn mutate(child: &mut Chromosome, n: usize, min_size: usize, max_size: usize, rng: &mut StdRng) {
    if !rng.gen_bool(MUTATION_RATE) {
        return;
    }
    let can_remove = child.len() > min_size;
    let can_add = child.len() < max_size;
    let remove = match (can_remove, can_add) {
        (true, true) => rng.gen_bool(0.5),
        (true, false) => true,
        (false, true) => false,
        (false, false) => return,
    };
    if remove {
        let i = rng.gen_range(0..child.len());
        child.remove(i);
    } else {
        push_unused(child, n, rng);
    }
}

fn generation_stats(generation: usize, fitness: &[f64], evaluated: usize) -> GenerationStats {
    let best = fitness
        .iter()
        .copied()
        .filter(|f| !f.is_nan())
        .max_by(|a, b| a.total_cmp(b));
    let finite: Vec<f64> = fitness.iter().copied().filter(|f| f.is_finite()).collect();
    let mean = if finite.is_empty() {
        None
    } else {
        Some(finite.iter().sum::<f64>() / finite.len() as f64)
    };
    GenerationStats {
        generation,
        best,
        mean,
        evaluated,
    }
}
