use crate::bucket_list::{self, BucketList};
use crate::canon::CanonIndex;
use crate::error::{AbstractionError, Result};
use crate::round::BettingRound;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Bucket assignments for every canon of every round
///
/// Lists are held in memory and written by `flush`. A tree is flushed when
/// every list on disk matches memory. The marker file is written after the
/// last list, so a tree whose flush was cut short never loads as flushed.
pub struct BucketTree {
    dir: PathBuf,
    counts: [u8; 4],
    lists: Vec<Box<dyn BucketList>>,
    flushed: bool,
}

impl BucketTree {
    /// Loads each round's list from `dir`, allocating the ones not yet built
    ///
    /// # Arguments
    /// * `dir` directory holding `bucket-r{round}-k{buckets}.dat` files
    /// * `counts` number of buckets per round
    /// * `sizes` number of canons per round
    pub fn open(dir: &Path, counts: [u8; 4], sizes: [u64; 4]) -> Result<Self> {
        let mut lists = Vec::with_capacity(4);
        let mut flushed = marker_path(dir, counts).exists();
        for round in BettingRound::ALL.iter() {
            let r = usize::from(*round);
            if counts[r] == 0 {
                return Err(AbstractionError::BucketOutOfRange { bucket: 0, max: 0 });
            }
            let path = list_path(dir, *round, counts[r]);
            if path.exists() {
                debug!("loading {}", path.display());
                lists.push(bucket_list::load_list(&path, sizes[r], usize::from(counts[r]))?);
            } else {
                flushed = false;
                lists.push(bucket_list::new_list(sizes[r], usize::from(counts[r])));
            }
        }
        Ok(BucketTree {
            dir: dir.to_path_buf(),
            counts,
            lists,
            flushed,
        })
    }

    pub fn bucket_count(&self, round: BettingRound) -> u8 {
        self.counts[usize::from(round)]
    }

    pub fn bucket_counts(&self) -> [u8; 4] {
        self.counts
    }

    pub fn round_size(&self, round: BettingRound) -> u64 {
        self.lists[usize::from(round)].len()
    }

    /// # Panics
    ///
    /// if `canon` is out of bounds for the round
    pub fn get(&self, round: BettingRound, canon: u64) -> u8 {
        self.lists[usize::from(round)].get(canon)
    }

    pub fn try_get(&self, round: BettingRound, canon: u64) -> Result<u8> {
        self.check_canon(round, canon)?;
        Ok(self.get(round, canon))
    }

    /// # Panics
    ///
    /// if `canon` or `bucket` is out of bounds for the round
    pub fn set(&mut self, round: BettingRound, canon: u64, bucket: u8) {
        assert!(bucket < self.bucket_count(round));
        self.flushed = false;
        self.lists[usize::from(round)].set(canon, bucket);
    }

    pub fn try_set(&mut self, round: BettingRound, canon: u64, bucket: u8) -> Result<()> {
        self.check_canon(round, canon)?;
        if bucket >= self.bucket_count(round) {
            return Err(AbstractionError::BucketOutOfRange {
                bucket: usize::from(bucket),
                max: usize::from(self.bucket_count(round)),
            });
        }
        self.set(round, canon, bucket);
        Ok(())
    }

    fn check_canon(&self, round: BettingRound, canon: u64) -> Result<()> {
        let size = self.round_size(round);
        if canon >= size {
            return Err(AbstractionError::CanonOutOfBounds { round, canon, size });
        }
        Ok(())
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Writes every round's list, then the marker
    pub fn flush(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let marker = marker_path(&self.dir, self.counts);
        if marker.exists() {
            fs::remove_file(&marker)?;
        }
        for round in BettingRound::ALL.iter() {
            let r = usize::from(*round);
            let path = list_path(&self.dir, *round, self.counts[r]);
            bucket_list::flush(self.lists[r].as_ref(), &path)?;
        }
        fs::File::create(&marker)?.sync_all()?;
        self.flushed = true;
        info!("flushed bucket tree to {}", self.dir.display());
        Ok(())
    }

    /// Branch over every canon of a round
    pub fn branch(&mut self, round: BettingRound) -> Branch<'_> {
        let canons = (0..self.round_size(round)).collect();
        self.branch_with(round, canons, None)
    }

    /// Branch over a subset of a round's canons
    pub fn branch_with(
        &mut self,
        round: BettingRound,
        canons: Vec<u64>,
        parent_bucket: Option<u8>,
    ) -> Branch<'_> {
        self.flushed = false;
        Branch {
            round,
            parent_bucket,
            canons,
            list: self.lists[usize::from(round)].as_mut(),
        }
    }

    /// One full-round branch per round, usable in parallel
    pub fn branches(&mut self) -> Vec<Branch<'_>> {
        self.flushed = false;
        self.lists
            .iter_mut()
            .zip(BettingRound::ALL.iter())
            .map(|(list, round)| Branch {
                round: *round,
                parent_bucket: None,
                canons: (0..list.len()).collect(),
                list: list.as_mut(),
            })
            .collect()
    }

    /// Next-round canons grouped by the bucket of their parent
    ///
    /// Perfect recall makes every child's parent unique, so the groups
    /// partition the next round.
    pub fn sub_branches(&self, index: &CanonIndex, round: BettingRound) -> Result<Vec<Vec<u64>>> {
        let mut groups = vec![Vec::new(); usize::from(self.bucket_count(round))];
        for parent in 0..self.round_size(round) {
            let bucket = self.get(round, parent);
            groups[usize::from(bucket)].extend(index.successors(round, parent)?);
        }
        Ok(groups)
    }
}

fn list_path(dir: &Path, round: BettingRound, buckets: u8) -> PathBuf {
    dir.join(format!("bucket-r{}-k{}.dat", usize::from(round), buckets))
}

fn marker_path(dir: &Path, counts: [u8; 4]) -> PathBuf {
    dir.join(format!(
        "flushed-k{}-{}-{}-{}",
        counts[0], counts[1], counts[2], counts[3]
    ))
}

/// A set of canons of one round being bucketized together
pub struct Branch<'a> {
    round: BettingRound,
    parent_bucket: Option<u8>,
    canons: Vec<u64>,
    list: &'a mut dyn BucketList,
}

impl<'a> Branch<'a> {
    pub fn round(&self) -> BettingRound {
        self.round
    }

    /// bucket shared by the parents of every canon, `None` for a full round
    pub fn parent_bucket(&self) -> Option<u8> {
        self.parent_bucket
    }

    pub fn canons(&self) -> &[u64] {
        &self.canons
    }

    pub fn len(&self) -> usize {
        self.canons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canons.is_empty()
    }

    pub fn max_buckets(&self) -> usize {
        self.list.max_buckets()
    }

    pub fn get(&self, canon: u64) -> u8 {
        self.list.get(canon)
    }

    pub fn set(&mut self, canon: u64, bucket: u8) {
        self.list.set(canon, bucket);
    }
}

/// Mixed-radix joint index over the buckets of consecutive rounds
///
/// The joint bucket of a hand up to round `r` is the row it uses in that
/// round's regret table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketSequence {
    counts: Vec<usize>,
}

impl BucketSequence {
    pub fn new(counts: &[u8]) -> Self {
        BucketSequence {
            counts: counts.iter().map(|c| usize::from(*c)).collect(),
        }
    }

    /// number of rounds covered
    pub fn rounds(&self) -> usize {
        self.counts.len()
    }

    /// number of joint sequences for rounds `0..=round`
    pub fn size(&self, round: usize) -> usize {
        self.counts[..=round].iter().product()
    }

    pub fn encode(&self, buckets: &[u8]) -> usize {
        assert!(buckets.len() <= self.counts.len());
        buckets
            .iter()
            .zip(self.counts.iter())
            .fold(0usize, |index, (b, k)| {
                assert!(usize::from(*b) < *k, "bucket {} out of range {}", b, k);
                index * k + usize::from(*b)
            })
    }

    pub fn decode(&self, round: usize, mut index: usize) -> Vec<u8> {
        assert!(index < self.size(round));
        let mut buckets = vec![0u8; round + 1];
        for r in (0..=round).rev() {
            buckets[r] = (index % self.counts[r]) as u8;
            index /= self.counts[r];
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_flush_state() {
        let dir = temp_dir("test_bucket_tree_flush_state");
        let sizes = [5, 9, 4, 3];
        let counts = [3, 4, 20, 2];
        let mut tree = BucketTree::open(&dir, counts, sizes).unwrap();
        assert!(!tree.is_flushed());
        tree.set(BettingRound::FLOP, 8, 3);
        tree.set(BettingRound::TURN, 1, 19);
        tree.flush().unwrap();
        assert!(tree.is_flushed());
        tree.set(BettingRound::PREFLOP, 0, 1);
        assert!(!tree.is_flushed());
        tree.flush().unwrap();

        let loaded = BucketTree::open(&dir, counts, sizes).unwrap();
        assert!(loaded.is_flushed());
        assert_eq!(loaded.get(BettingRound::FLOP, 8), 3);
        assert_eq!(loaded.get(BettingRound::TURN, 1), 19);
        assert_eq!(loaded.get(BettingRound::PREFLOP, 0), 1);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_interrupted_flush_is_not_flushed() {
        let dir = temp_dir("test_bucket_tree_interrupted_flush");
        let sizes = [5, 9, 4, 3];
        let counts = [3, 4, 5, 2];
        let mut tree = BucketTree::open(&dir, counts, sizes).unwrap();
        tree.set(BettingRound::RIVER, 2, 1);
        tree.flush().unwrap();
        assert!(BucketTree::open(&dir, counts, sizes).unwrap().is_flushed());

        // every list is on disk but the marker is missing
        fs::remove_file(marker_path(&dir, counts)).unwrap();
        for round in BettingRound::ALL.iter() {
            assert!(list_path(&dir, *round, counts[usize::from(*round)]).exists());
        }
        let reopened = BucketTree::open(&dir, counts, sizes).unwrap();
        assert!(!reopened.is_flushed());
        assert_eq!(reopened.get(BettingRound::RIVER, 2), 1);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_checked_access() {
        let dir = temp_dir("test_bucket_tree_checked_access");
        let mut tree = BucketTree::open(&dir, [2, 2, 2, 2], [4, 4, 4, 4]).unwrap();
        assert!(matches!(
            tree.try_get(BettingRound::RIVER, 4),
            Err(AbstractionError::CanonOutOfBounds { .. })
        ));
        assert!(matches!(
            tree.try_set(BettingRound::RIVER, 0, 2),
            Err(AbstractionError::BucketOutOfRange { .. })
        ));
        assert!(tree.try_set(BettingRound::RIVER, 3, 1).is_ok());
        assert_eq!(tree.try_get(BettingRound::RIVER, 3).unwrap(), 1);
    }

    #[test]
    fn test_branches_write_through() {
        let dir = temp_dir("test_bucket_tree_branches");
        let mut tree = BucketTree::open(&dir, [2, 2, 2, 2], [3, 4, 5, 6]).unwrap();
        for mut branch in tree.branches() {
            let canons = branch.canons().to_vec();
            assert_eq!(canons.len() as u64, 3 + usize::from(branch.round()) as u64);
            for canon in canons {
                branch.set(canon, (canon % 2) as u8);
            }
        }
        assert_eq!(tree.get(BettingRound::RIVER, 5), 1);
        assert_eq!(tree.get(BettingRound::PREFLOP, 2), 0);
    }

    #[test]
    fn test_sequence() {
        let sequence = BucketSequence::new(&[3, 4, 2]);
        assert_eq!(sequence.size(0), 3);
        assert_eq!(sequence.size(2), 24);
        let index = sequence.encode(&[2, 1, 1]);
        assert_eq!(index, (2 * 4 + 1) * 2 + 1);
        assert_eq!(sequence.decode(2, index), vec![2, 1, 1]);
        for i in 0..sequence.size(1) {
            assert_eq!(sequence.encode(&sequence.decode(1, i)), i);
        }
    }
}
