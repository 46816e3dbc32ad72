//! The sectioned container shared by `.r1cs`, `.wtns` and `.zkey` files.
//!
//! Layout: 4 magic bytes, `u32` version, `u32` section count, then per section a `u32`
//! type, a `u64` byte length and the payload. All integers are little-endian.

use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::reader_utils::{InvalidHeaderError, read_header};

/// Errors while splitting a circom binary file into its sections.
#[derive(Debug, Error)]
pub enum BinFileError {
    /// The magic bytes did not match.
    #[error(transparent)]
    InvalidHeader(#[from] InvalidHeaderError),
    /// The file ended before a length prefix could be read.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// A section claims more bytes than the file contains.
    #[error("section {id} declares {declared} bytes but only {available} remain")]
    TruncatedSection {
        /// Section type.
        id: u32,
        /// Declared length.
        declared: u64,
        /// Remaining bytes in the file.
        available: usize,
    },
    /// A required section is absent.
    #[error("missing section {0}")]
    MissingSection(u32),
    /// The file declares a version this parser does not understand.
    #[error("unsupported {kind} version {version}")]
    UnsupportedVersion {
        /// File kind (magic).
        kind: &'static str,
        /// Declared version.
        version: u32,
    },
}

pub(crate) struct BinFile<'a> {
    version: u32,
    sections: Vec<(u32, &'a [u8])>,
}

impl<'a> BinFile<'a> {
    pub(crate) fn parse(bytes: &'a [u8], magic: &'static str) -> Result<Self, BinFileError> {
        let mut reader = bytes;
        read_header(&mut reader, magic)?;
        let version = reader.read_u32::<LittleEndian>()?;
        let num_sections = reader.read_u32::<LittleEndian>()?;
        let mut sections = Vec::new();
        for _ in 0..num_sections {
            let id = reader.read_u32::<LittleEndian>()?;
            let declared = reader.read_u64::<LittleEndian>()?;
            let size = usize::try_from(declared)
                .ok()
                .filter(|size| *size <= reader.len())
                .ok_or(BinFileError::TruncatedSection {
                    id,
                    declared,
                    available: reader.len(),
                })?;
            let (section, rest) = reader.split_at(size);
            sections.push((id, section));
            reader = rest;
        }
        tracing::trace!(magic, version, num_sections, "parsed binary container");
        Ok(Self { version, sections })
    }

    pub(crate) fn version(&self) -> u32 {
        self.version
    }

    /// Returns the first section with the given type.
    pub(crate) fn section(&self, id: u32) -> Result<&'a [u8], BinFileError> {
        self.sections
            .iter()
            .find(|(section_id, _)| *section_id == id)
            .map(|(_, data)| *data)
            .ok_or(BinFileError::MissingSection(id))
    }
}

/// Writes a sectioned container. Sections are emitted in the given order.
pub(crate) fn write_bin_file<W: Write>(
    mut writer: W,
    magic: &str,
    version: u32,
    sections: &[(u32, Vec<u8>)],
) -> std::io::Result<()> {
    writer.write_all(magic.as_bytes())?;
    writer.write_u32::<LittleEndian>(version)?;
    writer.write_u32::<LittleEndian>(sections.len() as u32)?;
    for (id, data) in sections {
        writer.write_u32::<LittleEndian>(*id)?;
        writer.write_u64::<LittleEndian>(data.len() as u64)?;
        writer.write_all(data)?;
    }
    Ok(())
}
