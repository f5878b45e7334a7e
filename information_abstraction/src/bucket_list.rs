//! Flat per-canon bucket storage
//!
//! A round's bucket assignments are a byte array indexed by canon. With 16 or
//! fewer buckets two assignments share a byte: the even canon in the low
//! nibble, the odd canon in the high nibble.
use crate::error::{AbstractionError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::Path;

const LO_MASK: u8 = 0x0F;
const HI_MASK: u8 = 0xF0;

/// Mapping from canon to bucket for one round
pub trait BucketList: Send + Sync {
    /// bucket of a canon
    ///
    /// # Panics
    ///
    /// if `index >= self.len()`
    fn get(&self, index: u64) -> u8;
    /// # Panics
    ///
    /// if `index >= self.len()` or `bucket` does not fit
    fn set(&mut self, index: u64, bucket: u8);
    /// number of canons
    fn len(&self) -> u64;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// number of distinct buckets the encoding can hold
    fn max_buckets(&self) -> usize;
    /// backing bytes, written as is
    fn as_bytes(&self) -> &[u8];
}

/// Two buckets per byte
#[derive(Debug, Clone)]
pub struct HalfBucketList {
    bytes: Vec<u8>,
    len: u64,
}

impl HalfBucketList {
    pub fn new(len: u64) -> Self {
        HalfBucketList {
            bytes: vec![0; half_index(len) + if is_low(len) { 0 } else { 1 }],
            len,
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, len: u64) -> Result<Self> {
        let list = HalfBucketList::new(len);
        if bytes.len() != list.bytes.len() {
            return Err(size_mismatch(bytes.len(), list.bytes.len()));
        }
        Ok(HalfBucketList { bytes, len })
    }
}

#[inline(always)]
fn half_index(index: u64) -> usize {
    (index >> 1) as usize
}

#[inline(always)]
fn is_low(index: u64) -> bool {
    index % 2 == 0
}

impl BucketList for HalfBucketList {
    fn get(&self, index: u64) -> u8 {
        assert!(index < self.len, "canon {} out of bounds ({})", index, self.len);
        let pair = self.bytes[half_index(index)];
        if is_low(index) {
            pair & LO_MASK
        } else {
            (pair & HI_MASK) >> 4
        }
    }

    fn set(&mut self, index: u64, bucket: u8) {
        assert!(index < self.len, "canon {} out of bounds ({})", index, self.len);
        assert!(bucket <= LO_MASK, "bucket {} does not fit a nibble", bucket);
        let current = self.bytes[half_index(index)];
        self.bytes[half_index(index)] = if is_low(index) {
            current & HI_MASK | bucket
        } else {
            current & LO_MASK | bucket << 4
        };
    }

    fn len(&self) -> u64 {
        self.len
    }

    fn max_buckets(&self) -> usize {
        usize::from(LO_MASK) + 1
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One bucket per byte, for more than 16 buckets
#[derive(Debug, Clone)]
pub struct ByteBucketList {
    bytes: Vec<u8>,
}

impl ByteBucketList {
    pub fn new(len: u64) -> Self {
        ByteBucketList {
            bytes: vec![0; len as usize],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>, len: u64) -> Result<Self> {
        if bytes.len() as u64 != len {
            return Err(size_mismatch(bytes.len(), len as usize));
        }
        Ok(ByteBucketList { bytes })
    }
}

impl BucketList for ByteBucketList {
    fn get(&self, index: u64) -> u8 {
        self.bytes[index as usize]
    }

    fn set(&mut self, index: u64, bucket: u8) {
        self.bytes[index as usize] = bucket;
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn max_buckets(&self) -> usize {
        256
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn size_mismatch(actual: usize, expected: usize) -> AbstractionError {
    AbstractionError::Inconsistent(format!(
        "bucket file holds {} bytes, expected {}",
        actual, expected
    ))
}

/// Smallest encoding that holds `buckets` distinct values
pub fn new_list(len: u64, buckets: usize) -> Box<dyn BucketList> {
    if buckets <= usize::from(LO_MASK) + 1 {
        Box::new(HalfBucketList::new(len))
    } else {
        Box::new(ByteBucketList::new(len))
    }
}

/// Reads a list written by `flush`
pub fn load_list(path: &Path, len: u64, buckets: usize) -> Result<Box<dyn BucketList>> {
    let bytes = fs::read(path)?;
    if buckets <= usize::from(LO_MASK) + 1 {
        Ok(Box::new(HalfBucketList::from_bytes(bytes, len)?))
    } else {
        Ok(Box::new(ByteBucketList::from_bytes(bytes, len)?))
    }
}

/// Persists a list, replacing any previous file only once the write succeeded
pub fn flush(list: &dyn BucketList, path: &Path) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(list.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_list_size() {
        assert_eq!(HalfBucketList::new(0).as_bytes().len(), 0);
        assert_eq!(HalfBucketList::new(7).as_bytes().len(), 4);
        assert_eq!(HalfBucketList::new(8).as_bytes().len(), 4);
    }

    #[test]
    fn test_nibble_round_trip() {
        let size = 101;
        let mut list = HalfBucketList::new(size);
        for i in 0..size {
            list.set(i, (i % 16) as u8);
        }
        for i in 0..size {
            assert_eq!(list.get(i), (i % 16) as u8);
        }
    }

    #[test]
    fn test_nibble_neighbors_untouched() {
        let mut list = HalfBucketList::new(4);
        list.set(0, 0x0A);
        list.set(1, 0x05);
        for value in 0..16u8 {
            list.set(0, value);
            assert_eq!(list.get(1), 0x05);
            list.set(1, value);
            assert_eq!(list.get(0), value);
            list.set(1, 0x05);
        }
        assert_eq!(list.get(2), 0);
        assert_eq!(list.as_bytes()[0] & LO_MASK, 15);
        assert_eq!(list.as_bytes()[0] >> 4, 0x05);
    }

    #[test]
    #[should_panic]
    fn test_nibble_overflow() {
        let mut list = HalfBucketList::new(2);
        list.set(0, 16);
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds() {
        let list = HalfBucketList::new(3);
        list.get(3);
    }

    #[test]
    fn test_flush_and_load() {
        let path = std::env::temp_dir().join("test_flush_and_load.bucket");
        let mut list = new_list(9, 12);
        assert_eq!(list.max_buckets(), 16);
        for i in 0..9 {
            list.set(i, (11 - i) as u8);
        }
        flush(list.as_ref(), &path).unwrap();
        let loaded = load_list(&path, 9, 12).unwrap();
        for i in 0..9 {
            assert_eq!(loaded.get(i), list.get(i));
        }
        assert!(load_list(&path, 40, 12).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_byte_list() {
        let mut list = new_list(3, 200);
        assert_eq!(list.max_buckets(), 256);
        list.set(2, 199);
        assert_eq!(list.get(2), 199);
        assert_eq!(list.get(1), 0);
    }
}
