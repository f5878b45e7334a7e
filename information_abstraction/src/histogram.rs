//! Strength histograms
//!
//! A histogram counts the final hand values a canon reaches over every
//! (or a sample of) board completions. Its mean is the scalar strength used
//! for clustering.
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Histogram of possible strengths of a hand
///
/// The running total and weighted sum are kept alongside the counts so the
/// mean is always current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthHist {
    counts: Vec<u32>,
    total: u64,
    weighted: u64,
}

impl StrengthHist {
    /// Empty histogram over `value_count` values
    pub fn new(value_count: usize) -> Self {
        StrengthHist {
            counts: vec![0; value_count],
            total: 0,
            weighted: 0,
        }
    }

    pub fn count(&mut self, value: u16) {
        self.count_n(value, 1);
    }

    pub fn count_n(&mut self, value: u16, n: u32) {
        let v = usize::from(value);
        assert!(v < self.counts.len(), "value {} outside histogram", value);
        self.counts[v] += n;
        self.total += u64::from(n);
        self.weighted += u64::from(n) * (v as u64 + 1);
    }

    pub fn get(&self, value: u16) -> u32 {
        self.counts.get(usize::from(value)).copied().unwrap_or(0)
    }

    /// number of distinct values
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn total_count(&self) -> u64 {
        self.total
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Share of all counts falling on `value`, 0 for unseen or out of range values
    pub fn probability_of(&self, value: u16) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.get(value)) / self.total as f64
    }

    /// The most frequent value, lowest value on ties
    pub fn most_probable(&self) -> Option<u16> {
        let mut best: Option<(usize, u32)> = None;
        for (v, &c) in self.counts.iter().enumerate() {
            if c > 0 && best.map_or(true, |(_, bc)| c > bc) {
                best = Some((v, c));
            }
        }
        best.map(|(v, _)| v as u16)
    }

    /// Mean of `value + 1` over all counts
    pub fn mean(&self) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.weighted as f64 / self.total as f64)
    }

    /// FNV-1a digest of the raw counts
    ///
    /// Stable across processes and builds, unlike `std::hash`.
    pub fn stable_hash(&self) -> u64 {
        let mut hash = FNV_OFFSET;
        for count in &self.counts {
            for byte in count.to_be_bytes().iter() {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        }
        hash
    }

    /// Krichevsky-Trofimov coding length of the observations in bits
    ///
    /// Items are coded class by class; the j-th item overall, with `i` earlier
    /// items of its class, costs `-log2((i + alpha) / (j + classes * alpha))`.
    pub fn transmission_cost(&self, alpha: f64) -> f64 {
        let classes = self.counts.iter().filter(|c| **c > 0).count() as f64;
        let mut j = 0u64;
        let mut length = 0.0;
        for &count in self.counts.iter().filter(|c| **c > 0) {
            for i in 0..count {
                let p = (f64::from(i) + alpha) / (j as f64 + classes * alpha);
                length -= p.log2();
                j += 1;
            }
        }
        length
    }

    /// Writes the histogram in sparse form
    ///
    /// length, number of non-zero entries, then (value, count) pairs
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let non_zero = self.counts.iter().filter(|c| **c > 0).count();
        writer.write_u32::<LittleEndian>(self.counts.len() as u32)?;
        writer.write_u32::<LittleEndian>(non_zero as u32)?;
        for (v, &c) in self.counts.iter().enumerate().filter(|(_, c)| **c > 0) {
            writer.write_u16::<LittleEndian>(v as u16)?;
            writer.write_u32::<LittleEndian>(c)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let len = reader.read_u32::<LittleEndian>()? as usize;
        let non_zero = reader.read_u32::<LittleEndian>()?;
        let mut hist = StrengthHist::new(len);
        for _ in 0..non_zero {
            let value = reader.read_u16::<LittleEndian>()?;
            let count = reader.read_u32::<LittleEndian>()?;
            if usize::from(value) >= len {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("value {} outside histogram of {}", value, len),
                ));
            }
            hist.count_n(value, count);
        }
        Ok(hist)
    }
}

impl PartialOrd for StrengthHist {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by mean strength, empty histograms first
impl Ord for StrengthHist {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_mean = match (self.mean(), other.mean()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.total_cmp(&b),
        };
        by_mean.then_with(|| self.counts.cmp(&other.counts))
    }
}

/// Append-only file of histograms for one round, in canon order
pub struct HistogramStore {
    writer: BufWriter<File>,
    written: u64,
}

impl HistogramStore {
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(HistogramStore {
            writer: BufWriter::new(file),
            written: 0,
        })
    }

    pub fn append(&mut self, hist: &StrengthHist) -> io::Result<()> {
        hist.write_to(&mut self.writer)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn finish(mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Reads every histogram back in the order they were appended
    pub fn read_all(path: &Path) -> io::Result<Vec<StrengthHist>> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hists = Vec::new();
        loop {
            match StrengthHist::read_from(&mut reader) {
                Ok(hist) => hists.push(hist),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }
        Ok(hists)
    }
}
