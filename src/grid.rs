//! Dense accumulator grids
//!
//! A grid is a `rows x cols` table of f64 accumulators. Values are only ever
//! added to, so concurrent training passes share one grid. On disk a grid is
//! a `(rows u32, cols u32)` header followed by the values in row-major order,
//! all little endian.
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array2;
use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

const HEADER_BYTES: u64 = 8;

pub trait Grid: Send + Sync {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    fn get(&self, row: usize, col: usize) -> io::Result<f64>;
    /// Atomically adds `value` to a cell
    fn add(&self, row: usize, col: usize, value: f64) -> io::Result<()>;

    fn shape(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    /// Writes the header and every value
    fn write_to(&self, writer: &mut dyn Write) -> io::Result<()> {
        write_header(writer, self.rows(), self.cols())?;
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                writer.write_f64::<LittleEndian>(self.get(row, col)?)?;
            }
        }
        Ok(())
    }
}

fn write_header(writer: &mut dyn Write, rows: usize, cols: usize) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(rows as u32)?;
    writer.write_u32::<LittleEndian>(cols as u32)
}

/// reads the `(rows, cols)` header of a grid
pub fn read_header(reader: &mut dyn Read) -> io::Result<(usize, usize)> {
    let rows = reader.read_u32::<LittleEndian>()? as usize;
    let cols = reader.read_u32::<LittleEndian>()? as usize;
    Ok((rows, cols))
}

/// Memory resident grid
///
/// Cells hold f64 bits, `add` is a compare-and-swap loop.
#[derive(Debug)]
pub struct ArrayGrid {
    cells: Array2<AtomicU64>,
}

impl ArrayGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        ArrayGrid {
            cells: Array2::from_shape_fn((rows, cols), |_| AtomicU64::new(0f64.to_bits())),
        }
    }

    /// Reads a grid written by `write_to`
    pub fn read_from(reader: &mut dyn Read) -> io::Result<Self> {
        let (rows, cols) = read_header(reader)?;
        let grid = ArrayGrid::new(rows, cols);
        for cell in grid.cells.iter() {
            cell.store(reader.read_f64::<LittleEndian>()?.to_bits(), Ordering::Relaxed);
        }
        Ok(grid)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        ArrayGrid::read_from(&mut BufReader::new(File::open(path)?))
    }

    /// Copy of every value
    pub fn to_array(&self) -> Array2<f64> {
        self.cells
            .map(|cell| f64::from_bits(cell.load(Ordering::Relaxed)))
    }
}

impl Grid for ArrayGrid {
    fn rows(&self) -> usize {
        self.cells.nrows()
    }

    fn cols(&self) -> usize {
        self.cells.ncols()
    }

    fn get(&self, row: usize, col: usize) -> io::Result<f64> {
        Ok(f64::from_bits(self.cells[[row, col]].load(Ordering::Relaxed)))
    }

    fn add(&self, row: usize, col: usize, value: f64) -> io::Result<()> {
        let cell = &self.cells[[row, col]];
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + value).to_bits();
            match cell.compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Disk backed grid
///
/// Every access seeks into the file under a lock, for tables too large to
/// hold in memory. Shares the on-disk format of `ArrayGrid`.
#[derive(Debug)]
pub struct FileGrid {
    file: Mutex<File>,
    rows: usize,
    cols: usize,
}

impl FileGrid {
    /// Creates a zeroed grid file
    pub fn create(path: &Path, rows: usize, cols: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        {
            let mut writer = BufWriter::new(&file);
            write_header(&mut writer, rows, cols)?;
            for _ in 0..rows * cols {
                writer.write_f64::<LittleEndian>(0.0)?;
            }
            writer.flush()?;
        }
        Ok(FileGrid {
            file: Mutex::new(file),
            rows,
            cols,
        })
    }

    /// Opens an existing grid file for reading and writing
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let (rows, cols) = read_header(&mut file)?;
        let expected = HEADER_BYTES + 8 * (rows * cols) as u64;
        if file.metadata()?.len() != expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} is truncated", path.display()),
            ));
        }
        Ok(FileGrid {
            file: Mutex::new(file),
            rows,
            cols,
        })
    }

    fn position(&self, row: usize, col: usize) -> u64 {
        assert!(row < self.rows && col < self.cols);
        HEADER_BYTES + 8 * (row * self.cols + col) as u64
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "grid file lock poisoned"))
    }
}

impl Grid for FileGrid {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn get(&self, row: usize, col: usize) -> io::Result<f64> {
        let position = self.position(row, col);
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(position))?;
        file.read_f64::<LittleEndian>()
    }

    fn add(&self, row: usize, col: usize, value: f64) -> io::Result<()> {
        let position = self.position(row, col);
        let mut file = self.lock()?;
        file.seek(SeekFrom::Start(position))?;
        let current = file.read_f64::<LittleEndian>()?;
        file.seek(SeekFrom::Start(position))?;
        file.write_f64::<LittleEndian>(current + value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_concurrent_adds() {
        let grid = ArrayGrid::new(2, 3);
        (0..10_000).into_par_iter().for_each(|i| {
            grid.add(i % 2, 1, 0.5).unwrap();
        });
        assert_eq!(grid.get(0, 1).unwrap(), 2500.0);
        assert_eq!(grid.get(1, 1).unwrap(), 2500.0);
        assert_eq!(grid.get(1, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_rw_grid() {
        let grid = ArrayGrid::new(3, 2);
        grid.add(2, 1, -1.25).unwrap();
        grid.add(0, 0, 7.0).unwrap();
        let mut buffer = Vec::new();
        grid.write_to(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 8 + 3 * 2 * 8);

        let loaded = ArrayGrid::read_from(&mut buffer.as_slice()).unwrap();
        assert_eq!(loaded.shape(), (3, 2));
        assert_eq!(loaded.to_array(), grid.to_array());
        assert!(ArrayGrid::read_from(&mut &buffer[..20]).is_err());
    }

    #[test]
    fn test_file_grid() {
        let path = std::env::temp_dir().join("test_file_grid.grid");
        {
            let grid = FileGrid::create(&path, 4, 3).unwrap();
            grid.add(3, 2, 1.5).unwrap();
            grid.add(3, 2, 1.0).unwrap();
            grid.add(0, 1, -4.0).unwrap();
        }
        let grid = FileGrid::open(&path).unwrap();
        assert_eq!(grid.shape(), (4, 3));
        assert_eq!(grid.get(3, 2).unwrap(), 2.5);

        // both grids share a format
        let array = ArrayGrid::load(&path).unwrap();
        assert_eq!(array.get(0, 1).unwrap(), -4.0);
        assert_eq!(array.get(3, 2).unwrap(), 2.5);
        std::fs::remove_file(&path).unwrap();
    }
}
