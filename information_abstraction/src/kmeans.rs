use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KmeansError {
    #[error("{points} points cannot seed {k} distinct centers")]
    TooFewPoints { k: usize, points: usize },
    #[error("cluster {cluster} emptied and no point is left to reseed it")]
    EmptyCluster { cluster: usize },
}

/// K-means over scalar strengths
///
/// Points are hand strengths (histogram means) so distance is the absolute
/// difference.
#[derive(Debug, Clone)]
pub struct Kmeans {
    /// the cluster centers
    means: Vec<f64>,
    /// which cluster each datapoint is assigned to
    assignments: Vec<usize>,
    /// how many datapoints are in each cluster
    counts: Vec<usize>,
}

impl Kmeans {
    /// Initializes k cluster centers using the Kmeans++ method
    ///
    /// The first center is a uniformly random point, each following center
    /// is drawn with probability proportional to the squared distance to
    /// the nearest center already chosen.
    pub fn init_pp<R: Rng>(k: usize, data: &[f64], rng: &mut R) -> Result<Self, KmeansError> {
        let n_data = data.len();
        if k == 0 || n_data < k {
            return Err(KmeansError::TooFewPoints { k, points: n_data });
        }
        let mut means = Vec::with_capacity(k);
        let mut last_chosen = data[rng.gen_range(0..n_data)];
        means.push(last_chosen);
        let mut min_sq_dists = vec![f64::MAX; n_data];
        for _ in 1..k {
            min_sq_dists
                .par_iter_mut()
                .zip(data.par_iter())
                .for_each(|(min_sq_dist, x)| {
                    let dist = x - last_chosen;
                    if dist * dist < *min_sq_dist {
                        *min_sq_dist = dist * dist;
                    }
                });
            // all weights zero means every point already sits on a center
            let distribution = WeightedIndex::new(&min_sq_dists)
                .map_err(|_| KmeansError::TooFewPoints { k, points: n_data })?;
            last_chosen = data[distribution.sample(rng)];
            means.push(last_chosen);
        }
        Ok(Kmeans::with_means(means, n_data))
    }

    /// Starts from explicit centers
    pub fn with_means(means: Vec<f64>, n_data: usize) -> Self {
        let k = means.len();
        Kmeans {
            means,
            assignments: vec![0; n_data],
            counts: vec![0; k],
        }
    }

    pub fn k(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Nearest center, the lowest index wins ties
    pub fn nearest(&self, x: f64) -> usize {
        let mut min_dist = f64::MAX;
        let mut min_idx = 0usize;
        for (j, mean) in self.means.iter().enumerate() {
            let dist = (x - mean).abs();
            if dist < min_dist {
                min_dist = dist;
                min_idx = j;
            }
        }
        min_idx
    }

    /// Moves every datapoint to its nearest center
    /// Returns the number of datapoints that changed cluster
    pub fn assignment_step(&mut self, data: &[f64]) -> usize {
        let this = &*self;
        let new_assignments: Vec<usize> = data.par_iter().map(|x| this.nearest(*x)).collect();
        let changed = new_assignments
            .iter()
            .zip(self.assignments.iter())
            .filter(|(a, b)| a != b)
            .count();
        self.counts = vec![0; self.k()];
        for a in &new_assignments {
            self.counts[*a] += 1;
        }
        self.assignments = new_assignments;
        changed
    }

    /// Moves every center to the mean of its datapoints
    /// Returns the largest distance any center moved
    ///
    /// An empty cluster takes over the point farthest from its own center.
    pub fn update_step(&mut self, data: &[f64]) -> Result<f64, KmeansError> {
        for cluster in 0..self.k() {
            if self.counts[cluster] == 0 {
                self.reseed(cluster, data)?;
            }
        }
        let mut sums = vec![0f64; self.k()];
        for (x, a) in data.iter().zip(self.assignments.iter()) {
            sums[*a] += x;
        }
        let mut max_delta = 0f64;
        for (i, mean) in self.means.iter_mut().enumerate() {
            let new_mean = sums[i] / self.counts[i] as f64;
            max_delta = max_delta.max((new_mean - *mean).abs());
            *mean = new_mean;
        }
        Ok(max_delta)
    }

    fn reseed(&mut self, cluster: usize, data: &[f64]) -> Result<(), KmeansError> {
        let mut farthest: Option<(usize, f64)> = None;
        for (i, (x, a)) in data.iter().zip(self.assignments.iter()).enumerate() {
            // never empty another cluster to fill this one
            if self.counts[*a] < 2 {
                continue;
            }
            let dist = (x - self.means[*a]).abs();
            if farthest.map_or(true, |(_, d)| dist > d) {
                farthest = Some((i, dist));
            }
        }
        match farthest {
            Some((i, dist)) if dist > 0.0 => {
                self.counts[self.assignments[i]] -= 1;
                self.counts[cluster] += 1;
                self.assignments[i] = cluster;
                self.means[cluster] = data[i];
                Ok(())
            }
            _ => Err(KmeansError::EmptyCluster { cluster }),
        }
    }

    /// Runs K-Means until no center moves more than `delta_cutoff`
    /// or the maximum number of iterations
    /// Returns the number of iterations
    pub fn run(
        &mut self,
        data: &[f64],
        delta_cutoff: f64,
        max_iterations: usize,
    ) -> Result<usize, KmeansError> {
        let mut iterations = 0;
        while iterations < max_iterations {
            iterations += 1;
            self.assignment_step(data);
            let delta = self.update_step(data)?;
            if delta <= delta_cutoff {
                break;
            }
        }
        Ok(iterations)
    }

    /// sum of the squared distance between each datapoint and its assigned center
    pub fn inertia(&self, data: &[f64]) -> f64 {
        data.iter()
            .zip(self.assignments.iter())
            .map(|(x, a)| {
                let d = x - self.means[*a];
                d * d
            })
            .sum()
    }
}
