//! Compact prefix-sum table
//!
//! Storing one `u64` offset per canon is not affordable at river scale
//! (billions of entries), so only every `CHUNK`-th prefix sum is kept and the
//! remainder is recovered by re-counting at most `CHUNK - 1` entries.
use rayon::prelude::*;

/// number of entries covered by one stored base offset
pub const CHUNK: usize = 8;

#[derive(Debug, Clone)]
pub struct ChunkedOffsets {
    /// prefix sum at the start of every chunk
    bases: Vec<u64>,
    /// number of entries the table covers
    len: usize,
    /// sum of every entry
    total: u64,
}

impl ChunkedOffsets {
    /// Builds the table from a per-entry count function
    ///
    /// `count` must be deterministic, it is called again on lookup. The
    /// first error it returns aborts the build.
    pub fn build<F, E>(len: usize, count: F) -> Result<Self, E>
    where
        F: Fn(usize) -> Result<u64, E> + Sync,
        E: Send,
    {
        let n_chunks = (len + CHUNK - 1) / CHUNK;
        let chunk_sums: Vec<u64> = (0..n_chunks)
            .into_par_iter()
            .map(|c| {
                let end = std::cmp::min(len, (c + 1) * CHUNK);
                (c * CHUNK..end).map(&count).sum::<Result<u64, E>>()
            })
            .collect::<Result<_, E>>()?;
        let mut bases = Vec::with_capacity(n_chunks);
        let mut total = 0u64;
        for sum in chunk_sums {
            bases.push(total);
            total += sum;
        }
        Ok(ChunkedOffsets { bases, len, total })
    }

    /// Sum of the counts of every entry before `i`
    ///
    /// # Panics
    ///
    /// if `i > self.len()`
    pub fn offset<F, E>(&self, i: usize, count: F) -> Result<u64, E>
    where
        F: Fn(usize) -> Result<u64, E>,
    {
        assert!(i <= self.len, "offset {} out of bounds ({})", i, self.len);
        if i == self.len {
            return Ok(self.total);
        }
        let chunk = i / CHUNK;
        let scanned: u64 = (chunk * CHUNK..i).map(count).sum::<Result<u64, E>>()?;
        Ok(self.bases[chunk] + scanned)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total(&self) -> u64 {
        self.total
    }
}
