//! SRTM/NASADEM `.hgt` elevation tiles.
//!
//! # References
//!
//! 1. [HGT file layout](http://fileformats.archiveteam.org/index.php?title=HGT&oldid=17250)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

use crate::{ElevationSource, HorizonError};
use byteorder::{BigEndian as BE, ReadBytesExt};
use dashmap::DashMap;
use geo::geometry::Coord;
use log::debug;
use memmap2::Mmap;
use std::{
    fs::File,
    io::{BufReader, ErrorKind},
    mem::size_of,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Sample value SRTM uses for voids.
const VOID: i16 = i16::MIN;

/// Tiles loaded on demand from a directory of `.hgt` files.
pub struct Tiles {
    /// Directory containing `.hgt` tile files.
    tile_dir: PathBuf,

    /// How to load tiles (in-memory or mapped).
    tile_mode: TileMode,

    /// Tiles which have been loaded on demand, keyed by SW corner.
    tiles: DashMap<Coord<i16>, Arc<Tile>>,
}

impl Tiles {
    pub fn new(tile_dir: PathBuf, tile_mode: TileMode) -> Result<Self, HorizonError> {
        let mut has_height_files = false;

        // Fail early if tile_dir has no `hgt` files at all.
        for entry in std::fs::read_dir(&tile_dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(std::ffi::OsStr::to_str);
            if ext.is_some_and(|ext| ext.eq_ignore_ascii_case("hgt")) {
                has_height_files = true;
                break;
            }
        }

        if has_height_files {
            Ok(Self {
                tile_dir,
                tile_mode,
                tiles: DashMap::new(),
            })
        } else {
            Err(HorizonError::Path(tile_dir))
        }
    }

    /// Returns the tile containing `coord`.
    ///
    /// A tile missing on disk is returned as a tombstone with no
    /// samples.
    pub fn get(&self, coord: Coord<f64>) -> Result<Arc<Tile>, HorizonError> {
        let sw_corner = sw_corner(coord);
        self.tiles
            .entry(sw_corner)
            .or_try_insert_with(|| match self.load_tile(sw_corner) {
                Ok(tile) => Ok(Arc::new(tile)),
                Err(HorizonError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                    debug!("tombstone in lieu of missing tile for {sw_corner:?}");
                    Ok(Arc::new(Tile::tombstone(sw_corner)))
                }
                Err(e) => Err(e),
            })
            .map(|r| r.clone())
    }

    fn load_tile(&self, sw_corner: Coord<i16>) -> Result<Tile, HorizonError> {
        let tile_path = {
            let file_name = file_name(sw_corner);
            let tile_path = self.tile_dir.join(&file_name);
            if tile_path.exists() {
                tile_path
            } else {
                self.tile_dir.join(file_name.to_lowercase())
            }
        };
        debug!("loading {tile_path:?}");
        match self.tile_mode {
            TileMode::InMem => Tile::load(tile_path),
            TileMode::MemMap => Tile::memmap(tile_path),
        }
    }
}

impl ElevationSource for Tiles {
    fn elevation(&self, coord: Coord<f64>) -> Result<Option<f64>, HorizonError> {
        Ok(self.get(coord)?.get(coord).map(f64::from))
    }
}

/// How to handle tile.
///
/// The trade off between loading tile data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileMode {
    /// Parse tile and load into memory.
    InMem,

    /// Memory map file contents.
    MemMap,
}

enum SampleStore {
    Tombstone,
    InMem(Box<[i16]>),
    MemMap(Mmap),
}

impl SampleStore {
    fn get(&self, index: usize) -> Option<i16> {
        let sample = match self {
            Self::Tombstone => return None,
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let start = index * size_of::<i16>();
                i16::from_be_bytes([raw[start], raw[start + 1]])
            }
        };
        (sample != VOID).then_some(sample)
    }
}

/// One 1°x1° elevation tile.
pub struct Tile {
    /// Integer coordinate of the tile's SW corner.
    sw_corner: Coord<i16>,

    /// Samples per row and per column.
    dimension: usize,

    samples: SampleStore,
}

impl Tile {
    /// Returns a Tile read into memory from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HorizonError> {
        let dimension = extract_dimension(&path)?;
        let sw_corner = parse_sw_corner(&path)?;
        let mut file = BufReader::new(File::open(path)?);
        let mut samples = vec![0_i16; dimension * dimension];
        file.read_i16_into::<BE>(&mut samples)?;
        Ok(Self {
            sw_corner,
            dimension,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Returns a Tile using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, HorizonError> {
        let dimension = extract_dimension(&path)?;
        let sw_corner = parse_sw_corner(&path)?;
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            sw_corner,
            dimension,
            samples: SampleStore::MemMap(mmap),
        })
    }

    /// Returns a tile with no samples.
    pub fn tombstone(sw_corner: Coord<i16>) -> Self {
        Self {
            sw_corner,
            dimension: 1201,
            samples: SampleStore::Tombstone,
        }
    }

    /// Arcseconds between samples.
    pub fn resolution(&self) -> u8 {
        if self.dimension == 3601 {
            1
        } else {
            3
        }
    }

    /// Returns the sample nearest to `coord`, or `None` if `coord`
    /// is outside this tile or the sample is void.
    pub fn get(&self, coord: Coord<f64>) -> Option<i16> {
        let (row, col) = self.coord_to_row_col(coord)?;
        self.samples.get(row * self.dimension + col)
    }

    /// Rows count down from the north edge, columns east from the
    /// west edge.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn coord_to_row_col(&self, coord: Coord<f64>) -> Option<(usize, usize)> {
        let cells = (self.dimension - 1) as f64;
        let row = ((f64::from(self.sw_corner.y) + 1.0 - coord.y) * cells).round();
        let col = ((coord.x - f64::from(self.sw_corner.x)) * cells).round();
        if (0.0..=cells).contains(&row) && (0.0..=cells).contains(&col) {
            Some((row as usize, col as usize))
        } else {
            None
        }
    }
}

/// Returns samples per side based on the file's length.
fn extract_dimension<P: AsRef<Path>>(path: P) -> Result<usize, HorizonError> {
    const RES_1_ARCSECOND_LEN: u64 = 3601 * 3601 * size_of::<i16>() as u64;
    const RES_3_ARCSECOND_LEN: u64 = 1201 * 1201 * size_of::<i16>() as u64;
    match path.as_ref().metadata()?.len() {
        RES_1_ARCSECOND_LEN => Ok(3601),
        RES_3_ARCSECOND_LEN => Ok(1201),
        invalid_len => Err(HorizonError::HgtLen(invalid_len)),
    }
}

fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i16>, HorizonError> {
    let mk_err = || HorizonError::HgtName(path.as_ref().to_owned());
    let name = path
        .as_ref()
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(mk_err)?
        .to_uppercase();
    if name.len() != 7 || !name.is_ascii() {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" => 1,
        "S" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i16>().map_err(|_| mk_err())?;
    let lon_sign = match &name[3..4] {
        "E" => 1,
        "W" => -1,
        _ => return Err(mk_err()),
    };
    let lon = lon_sign * name[4..7].parse::<i16>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}

/// Returns the southwest corner as integers for coord.
fn sw_corner(Coord { x, y }: Coord<f64>) -> Coord<i16> {
    #[allow(clippy::cast_possible_truncation)]
    Coord {
        x: (x.floor() as i16),
        y: (y.floor() as i16),
    }
}

/// Returns the expected file name for the tile at `sw_corner`.
fn file_name(Coord { x, y }: Coord<i16>) -> String {
    let n_s = if y.is_negative() { 'S' } else { 'N' };
    let e_w = if x.is_negative() { 'W' } else { 'E' };
    format!("{n_s}{:02}{e_w}{:03}.hgt", y.abs(), x.abs())
}

#[cfg(test)]
mod tests {
    use super::{file_name, parse_sw_corner, sw_corner, Coord, TileMode, Tiles, VOID};
    use crate::{geodesy::move_by, ElevationSource, HorizonError};
    use byteorder::{BigEndian as BE, WriteBytesExt};
    use std::{fs::File, io::BufWriter, path::Path};

    const DIM: usize = 1201;

    /// Writes a 3-arcsecond tile where sample (row, col) is
    /// `row + col`, except for the given overrides.
    fn write_tile(dir: &Path, name: &str, overrides: &[((usize, usize), i16)]) {
        let mut out = BufWriter::new(File::create(dir.join(name)).unwrap());
        for row in 0..DIM {
            for col in 0..DIM {
                let sample = overrides
                    .iter()
                    .find(|(at, _)| *at == (row, col))
                    .map_or((row + col) as i16, |(_, v)| *v);
                out.write_i16::<BE>(sample).unwrap();
            }
        }
    }

    fn at(sw: Coord<i16>, row: usize, col: usize) -> Coord<f64> {
        Coord {
            x: f64::from(sw.x) + col as f64 / (DIM - 1) as f64,
            y: f64::from(sw.y) + 1.0 - row as f64 / (DIM - 1) as f64,
        }
    }

    #[test]
    fn test_lookup_in_both_modes() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "N47E009.hgt", &[((10, 20), VOID)]);
        let sw = Coord { x: 9, y: 47 };
        for mode in [TileMode::InMem, TileMode::MemMap] {
            let tiles = Tiles::new(dir.path().to_owned(), mode).unwrap();
            // The north row and east column belong to the neighbouring
            // tiles' lookups.
            assert_eq!(tiles.elevation(at(sw, 1, 1)).unwrap(), Some(2.0));
            assert_eq!(tiles.elevation(at(sw, 100, 200)).unwrap(), Some(300.0));
            assert_eq!(tiles.elevation(at(sw, 1200, 1199)).unwrap(), Some(2399.0));
            // Nearest sample wins.
            let mut off_grid = at(sw, 100, 200);
            off_grid.x += 0.2 / 1200.0;
            assert_eq!(tiles.elevation(off_grid).unwrap(), Some(300.0));
            // Voids are missing samples.
            assert_eq!(tiles.elevation(at(sw, 10, 20)).unwrap(), None);
            assert_eq!(tiles.get(at(sw, 5, 5)).unwrap().resolution(), 3);
        }
    }

    #[test]
    fn test_missing_tile_is_tombstone() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "N47E009.hgt", &[]);
        let tiles = Tiles::new(dir.path().to_owned(), TileMode::MemMap).unwrap();
        let south_pole = Coord { y: -90.0, x: 0.0 };
        assert_eq!(tiles.elevation(south_pole).unwrap(), None);
    }

    #[test]
    fn test_lowercase_file_name() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "s01w001.hgt", &[]);
        let tiles = Tiles::new(dir.path().to_owned(), TileMode::InMem).unwrap();
        let sw = Coord { x: -1, y: -1 };
        assert_eq!(tiles.elevation(at(sw, 3, 4)).unwrap(), Some(7.0));
    }

    #[test]
    fn test_empty_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Tiles::new(dir.path().to_owned(), TileMode::InMem),
            Err(HorizonError::Path(_))
        ));
    }

    #[test]
    fn test_bad_length_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("N00E000.hgt"), [0_u8; 10]).unwrap();
        let tiles = Tiles::new(dir.path().to_owned(), TileMode::InMem).unwrap();
        assert!(matches!(
            tiles.elevation(Coord { x: 0.5, y: 0.5 }),
            Err(HorizonError::HgtLen(10))
        ));
    }

    #[test]
    fn test_parse_hgt_name() {
        assert_eq!(
            parse_sw_corner("data/N44W072.hgt").unwrap(),
            Coord { x: -72, y: 44 }
        );
        assert_eq!(
            parse_sw_corner("s01e000.hgt").unwrap(),
            Coord { x: 0, y: -1 }
        );
        assert!(matches!(
            parse_sw_corner("X44W072.hgt"),
            Err(HorizonError::HgtName(_))
        ));
    }

    #[test]
    fn test_file_name_round_trips() {
        for (corner, name) in [
            (Coord { x: 0, y: 0 }, "N00E000.hgt"),
            (Coord { x: -1, y: -1 }, "S01W001.hgt"),
            (Coord { x: -180, y: 0 }, "N00W180.hgt"),
            (Coord { x: 179, y: -56 }, "S56E179.hgt"),
            (Coord { x: -72, y: 44 }, "N44W072.hgt"),
        ] {
            assert_eq!(file_name(corner), name);
            assert_eq!(parse_sw_corner(name).unwrap(), corner);
            assert_eq!(parse_sw_corner(name.to_lowercase()).unwrap(), corner);
        }
        // Just below zero belongs to the tile to the south-west.
        assert_eq!(
            sw_corner(Coord {
                y: -f64::EPSILON,
                x: -f64::EPSILON
            }),
            Coord { x: -1, y: -1 }
        );
    }

    #[test]
    fn test_lookup_east_across_antimeridian() {
        let dir = tempfile::tempdir().unwrap();
        write_tile(dir.path(), "N00W180.hgt", &[]);
        let tiles = Tiles::new(dir.path().to_owned(), TileMode::MemMap).unwrap();
        let observer = Coord { y: 0.5, x: 179.999 };
        let moved = move_by(observer, 0.0, 1000.0);
        assert_eq!(sw_corner(moved), Coord { x: -180, y: 0 });
        // 0.5° south of the north edge, ~9.6 samples east of the west
        // edge.
        let sw = Coord { x: -180, y: 0 };
        assert_eq!(tiles.elevation(moved).unwrap(), Some(610.0));
        assert_eq!(
            tiles.elevation(moved).unwrap(),
            tiles.elevation(at(sw, 600, 10)).unwrap()
        );
        // The observer's own tile isn't on disk.
        assert_eq!(tiles.elevation(observer).unwrap(), None);
    }
}
