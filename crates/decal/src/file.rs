//! Decal data file.
//!
//! A CBOR document holding a version byte, the table of datablock names the
//! decals reference, and one record per saved decal. Only decals flagged
//! [`DecalFlags::SAVE`] are written.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

use crate::instance::{DecalFlags, DecalInstance};
use crate::store::{DecalStore, DecalStoreConfig};

/// Bump on any change to the record layout.
pub const FILE_VERSION: u8 = 5;

/// Errors from reading or writing decal files.
#[derive(Debug, thiserror::Error)]
pub enum DecalFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("decal file version mismatch: file has v{file_version}, expected v{expected_version}")]
    VersionMismatch { file_version: u8, expected_version: u8 },
    #[error("decal {record} references datablock {index}, but only {count} are listed")]
    DanglingDatablock { record: usize, index: u32, count: usize },
}

/// On-disk form of a single decal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecalRecord {
    pub data_index: u32,
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub size: f32,
    pub rot_around_normal: f32,
    pub render_priority: u8,
    pub flags: u8,
}

impl DecalRecord {
    fn from_instance(d: &DecalInstance) -> Self {
        Self {
            data_index: d.data_index,
            position: d.position,
            normal: d.normal,
            tangent: d.tangent,
            size: d.size,
            rot_around_normal: d.rot_around_normal,
            render_priority: d.render_priority,
            flags: d.flags.bits(),
        }
    }

    fn to_instance(&self) -> DecalInstance {
        let mut d = DecalInstance::new(self.position, self.normal, self.tangent, self.size);
        d.rot_around_normal = self.rot_around_normal;
        d.data_index = self.data_index;
        d.render_priority = self.render_priority;
        d.flags = DecalFlags::from_bits_truncate(self.flags);
        d
    }
}

#[derive(Debug, Deserialize)]
struct VersionHeader {
    version: u8,
}

#[derive(Debug, Serialize, Deserialize)]
struct DecalFileBody {
    version: u8,
    datablocks: Vec<String>,
    records: Vec<DecalRecord>,
}

impl DecalStore {
    /// Write every savable decal. `datablocks[i]` names datablock index `i`.
    /// Returns the number of records written.
    pub fn save<W: Write>(
        &self,
        datablocks: &[String],
        writer: W,
    ) -> Result<usize, DecalFileError> {
        let records: Vec<DecalRecord> = self
            .spheres()
            .iter()
            .flat_map(|s| s.items().iter())
            .filter_map(|id| self.get(*id))
            .filter(|d| d.flags.contains(DecalFlags::SAVE))
            .map(DecalRecord::from_instance)
            .collect();
        for (record, r) in records.iter().enumerate() {
            if r.data_index as usize >= datablocks.len() {
                return Err(DecalFileError::DanglingDatablock {
                    record,
                    index: r.data_index,
                    count: datablocks.len(),
                });
            }
        }
        let count = records.len();
        let body = DecalFileBody {
            version: FILE_VERSION,
            datablocks: datablocks.to_vec(),
            records,
        };
        cbor_serialize(&body, writer)?;
        Ok(count)
    }

    /// Read a decal file into a fresh store. Returns the store and the
    /// datablock name table.
    pub fn load<R: Read>(
        mut reader: R,
        config: DecalStoreConfig,
    ) -> Result<(Self, Vec<String>), DecalFileError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let header: VersionHeader = cbor_deserialize(&buf)?;
        if header.version != FILE_VERSION {
            return Err(DecalFileError::VersionMismatch {
                file_version: header.version,
                expected_version: FILE_VERSION,
            });
        }
        let body: DecalFileBody = cbor_deserialize(&buf)?;

        let mut store = DecalStore::new(config);
        for (record, r) in body.records.iter().enumerate() {
            if r.data_index as usize >= body.datablocks.len() {
                return Err(DecalFileError::DanglingDatablock {
                    record,
                    index: r.data_index,
                    count: body.datablocks.len(),
                });
            }
            store.add_decal(r.to_instance());
        }
        store.clear_dirty();
        Ok((store, body.datablocks))
    }

    pub fn save_to_path(
        &self,
        datablocks: &[String],
        path: impl AsRef<Path>,
    ) -> Result<usize, DecalFileError> {
        let _span = tracing::info_span!("decal_save").entered();
        let file = std::fs::File::create(path.as_ref())?;
        let count = self.save(datablocks, std::io::BufWriter::new(file))?;
        tracing::info!(records = count, path = %path.as_ref().display(), "decal file written");
        Ok(count)
    }

    pub fn load_from_path(
        path: impl AsRef<Path>,
        config: DecalStoreConfig,
    ) -> Result<(Self, Vec<String>), DecalFileError> {
        let _span = tracing::info_span!("decal_load").entered();
        let file = std::fs::File::open(path.as_ref())?;
        let loaded = Self::load(std::io::BufReader::new(file), config)?;
        tracing::info!(
            records = loaded.0.len(),
            path = %path.as_ref().display(),
            "decal file read"
        );
        Ok(loaded)
    }
}

fn cbor_serialize<T: Serialize, W: Write>(value: &T, writer: W) -> Result<(), DecalFileError> {
    ciborium::into_writer(value, writer).map_err(|e| DecalFileError::CborEncode(e.to_string()))
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecalFileError> {
    ciborium::from_reader(data).map_err(|e| DecalFileError::CborDecode(e.to_string()))
}
