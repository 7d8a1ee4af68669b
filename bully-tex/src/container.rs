use std::io::{Read, Seek, SeekFrom, Cursor};

use bstr::ByteSlice;

use crate::TexResult;
use crate::TexError::*;
use crate::ReadExt;
use crate::macros;
use crate::{TexEntry, PayloadCompression};


/// Fixed 16-byte header at the start of every container
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
	/// Container version.  Informational only.
	pub version: u32,
	/// Number of entries plus one, as stored.
	pub entry_count_field: u32,
	/// Reserved; appears to identify the file.
	pub file_id: u32,
	/// Offset of the metadata block, or 0 if there is none.
	pub metadata_offset: u32,
}


impl ContainerHeader {
	/// Size in bytes of the header.
	pub const SIZE: u64 = 16;


	/// Read the header; fields past the end of `input` read as 0.
	pub fn read_from<R: Read>(input: &mut R) -> Self {
		let version = input.read_u32_or_zero();
		let entry_count_field = input.read_u32_or_zero();
		let file_id = input.read_u32_or_zero();
		let metadata_offset = input.read_u32_or_zero();
		ContainerHeader { version, entry_count_field, file_id, metadata_offset }
	}


	/// Effective number of entries.
	///
	/// # Example
	/// ```
	/// # use bully_tex::ContainerHeader;
	/// let header = ContainerHeader { entry_count_field: 3, ..Default::default() };
	/// assert_eq!(header.entry_count(), 2);
	/// let header = ContainerHeader { entry_count_field: 0, ..Default::default() };
	/// assert_eq!(header.entry_count(), 0);
	/// ```
	pub const fn entry_count(&self) -> u32 {
		self.entry_count_field.saturating_sub(1)
	}


	/// Position of the offset table: past the header and one `u32` word per
	/// entry that precedes the table.
	pub fn offset_table_position(&self) -> u64 {
		Self::SIZE + 4 * u64::from(self.entry_count())
	}
}


/// A parsed TEX container: header, entry offsets and metadata
///
/// Entries are read on demand with [`TexContainer::read_entry`], since
/// [`TexEntry::read_from`] needs the source again.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TexContainer {
	/// Container header.
	pub header: ContainerHeader,
	/// Entry offsets read from the offset table.  Holds fewer than
	/// [`ContainerHeader::entry_count`] offsets if the table is cut short by
	/// the end of the file; see [`TexContainer::offset`].
	pub offsets: Vec<u32>,
	/// Metadata text, with bytes that are not valid UTF-8 dropped.
	pub metadata: Option<String>,
	/// `true` if the metadata contains `compressOnDisk = true` (in any case).
	pub compress_on_disk: bool,
}


impl TexContainer {
	/// Marker in lower-cased metadata text selecting [`PayloadCompression::OnDisk`].
	pub const COMPRESS_ON_DISK_MARKER: &'static str = "compressondisk = true";


	/// Read a [`TexContainer`][Self] from a [`Read`] + [`Seek`].
	///
	/// Parsing is lenient: header and table fields past the end of the file
	/// read as 0, and a metadata block that is missing, out of bounds or not
	/// valid text leaves [`compress_on_disk`][Self::compress_on_disk] unset.
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: Seeking in `input` failed.
	pub fn read_from<R: Read + Seek>(input: &mut R) -> TexResult<Self> {
		let file_size = input.seek(SeekFrom::End(0))?;
		let _ = input.seek(SeekFrom::Start(0))?;

		let header = ContainerHeader::read_from(input);
		let count = header.entry_count();

		let table_position = header.offset_table_position();
		let _ = input.seek(SeekFrom::Start(table_position))?;

		let available = file_size.saturating_sub(table_position) / 4;
		#[allow(clippy::cast_possible_truncation)]
		let present = std::cmp::min(u64::from(count), available) as usize;
		let offsets: Vec<u32> = (0..present).map(|_| input.read_u32_or_zero()).collect();

		macros::log!(debug, "TEX v{}: {} entries, table at 0x{:X} ({} present), metadata at 0x{:X}",
			header.version, count, table_position, present, header.metadata_offset);

		let metadata = Self::read_metadata(input, header.metadata_offset, file_size)?;
		let compress_on_disk = metadata
			.as_deref()
			.map_or(false, |text| text.to_lowercase().contains(Self::COMPRESS_ON_DISK_MARKER));

		Ok(TexContainer { header, offsets, metadata, compress_on_disk })
	}


	/// Wrap `input` with a [`Cursor`][std::io::Cursor] and
	/// [`read_from`][`Self::read_from`] from it.
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: Should never happen for an in-memory source.
	pub fn from_bytes(input: &[u8]) -> TexResult<Self> {
		let mut cursor = Cursor::new(input);
		Self::read_from(&mut cursor)
	}


	fn read_metadata<R: Read + Seek>(input: &mut R, offset: u32, file_size: u64) -> TexResult<Option<String>> {
		if offset == 0 || u64::from(offset) >= file_size {
			return Ok(None);
		};

		let _ = input.seek(SeekFrom::Start(offset.into()))?;
		let len = input.read_u32_or_zero();
		let blob = input.read_up_to(len.into());

		let text: String = blob.utf8_chunks().map(|chunk| chunk.valid()).collect();

		macros::log!(trace, "Metadata block: {:?}", text);

		Ok(Some(text))
	}


	/// Effective number of entries.
	pub const fn entry_count(&self) -> u32 {
		self.header.entry_count()
	}


	/// Return true if the container has no entries.
	pub const fn is_empty(&self) -> bool {
		self.entry_count() == 0
	}


	/// Offset of entry `index`, or `None` if `index` is out of range.  Offset
	/// table words past the end of the file are 0.
	pub fn offset(&self, index: usize) -> Option<u32> {
		if index >= self.entry_count() as usize {
			return None;
		};

		Some(self.offsets.get(index).copied().unwrap_or(0))
	}


	/// Payload convention used by this container's entries.
	pub fn compression(&self) -> PayloadCompression {
		if self.compress_on_disk {
			PayloadCompression::OnDisk
		}
		else {
			PayloadCompression::LengthPrefixed
		}
	}


	/// Read entry `index` (0-based) from `input`, which must be the source
	/// this container was read from.
	///
	/// # Errors
	/// - [`EntryIndexOutOfRange`]: `index` is not below [`Self::entry_count`].
	/// - [`UnexpectedIoError`]: Seeking in `input` failed.
	pub fn read_entry<R: Read + Seek>(&self, input: &mut R, index: usize) -> TexResult<TexEntry> {
		let offset = self.offset(index).ok_or(EntryIndexOutOfRange)?;
		TexEntry::read_from(input, offset, self.compression())
	}


	/// Read the last entry, which holds the most detailed mip level, or
	/// `None` if the container has no entries.
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: Seeking in `input` failed.
	pub fn read_detail_entry<R: Read + Seek>(&self, input: &mut R) -> TexResult<Option<TexEntry>> {
		match self.entry_count() {
			0 => Ok(None),
			count => self.read_entry(input, count as usize - 1).map(Some),
		}
	}
}


#[cfg(test)]
use crate::{build_container, ExtendExt, TexFormat, PayloadStatus};


#[test]
fn read_simple_container() {
	let data = build_container(&[
		(5, 4, 4, vec![0u8; 8]),
		(1, 2, 1, vec![1, 2, 3, 4, 5, 6]),
	], None);

	let container = TexContainer::from_bytes(&data).unwrap();
	assert_eq!(container.header.version, 1);
	assert_eq!(container.entry_count(), 2);
	assert_eq!(container.header.offset_table_position(), 24);
	assert_eq!(container.offsets, vec![32, 60]);
	assert_eq!(container.metadata, None);
	assert!(!container.compress_on_disk);

	let mut cursor = Cursor::new(&data);
	let entry = container.read_detail_entry(&mut cursor).unwrap().unwrap();
	assert_eq!(entry.format, TexFormat::Bgr888);
	assert_eq!(entry.data, vec![1, 2, 3, 4, 5, 6]);

	let entry = container.read_entry(&mut cursor, 0).unwrap();
	assert_eq!(entry.format, TexFormat::Dxt1);

	assert!(matches!(container.read_entry(&mut cursor, 2), Err(EntryIndexOutOfRange)));
}


#[test]
fn empty_container() {
	for count_field in [0u32, 1] {
		let mut data = vec![];
		for v in [1, count_field, 0, 0] {
			data.extend_with_u32(v);
		};

		let container = TexContainer::from_bytes(&data).unwrap();
		assert!(container.is_empty());
		assert!(container.offsets.is_empty());
		assert!(container.read_detail_entry(&mut Cursor::new(&data)).unwrap().is_none());
	};

	let container = TexContainer::from_bytes(&[0x01, 0x00]).unwrap();
	assert_eq!(container.header, ContainerHeader { version: 0, ..Default::default() });
	assert!(container.is_empty());
}


#[test]
fn compress_on_disk_marker() {
	let cases = [
		("compressOnDisk = true", true),
		("[texture]\nCompressOnDisk = TRUE\nmips = 4", true),
		("compressondisk = false", false),
		("compressOnDisk=true", false),
		("", false),
	];

	for (text, expected) in cases {
		let data = build_container(&[(8, 1, 1, vec![0u8])], Some(text));
		let container = TexContainer::from_bytes(&data).unwrap();
		assert_eq!(container.metadata.as_deref(), Some(text));
		assert_eq!(container.compress_on_disk, expected, "{:?}", text);
	};
}


#[test]
fn metadata_invalid_utf8_is_dropped() {
	let mut data = build_container(&[(8, 1, 1, vec![0u8])], None);
	let metadata_offset = data.len() as u32;
	let blob = b"compress\xFFOnDisk = \xC3true";
	data.extend_with_u32(blob.len() as u32);
	data.extend(blob);
	data[12..16].copy_from_slice(&metadata_offset.to_le_bytes());

	let container = TexContainer::from_bytes(&data).unwrap();
	assert_eq!(container.metadata.as_deref(), Some("compressOnDisk = true"));
	assert!(container.compress_on_disk);
}


#[test]
fn metadata_offset_out_of_bounds() {
	let mut data = build_container(&[(8, 1, 1, vec![0u8])], Some("compressOnDisk = true"));
	let file_size = data.len() as u32;
	data[12..16].copy_from_slice(&file_size.to_le_bytes());

	let container = TexContainer::from_bytes(&data).unwrap();
	assert_eq!(container.metadata, None);
	assert!(!container.compress_on_disk);
	assert_eq!(container.compression(), PayloadCompression::LengthPrefixed);
}


#[test]
fn on_disk_container() {
	let raw = vec![0x80u8; 4];
	let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);

	let mut payload = vec![];
	payload.extend_with_u32(raw.len() as u32);
	payload.extend(&compressed);

	// build_container writes payload_size as the payload length, which
	// already includes the declared size word
	let data = build_container(&[(8, 2, 2, payload)], Some("CompressOnDisk = true"));

	let container = TexContainer::from_bytes(&data).unwrap();
	assert_eq!(container.compression(), PayloadCompression::OnDisk);

	let entry = container.read_detail_entry(&mut Cursor::new(&data)).unwrap().unwrap();
	assert_eq!(entry.declared_size, Some(4));
	assert_eq!(entry.status, PayloadStatus::Inflated);
	assert_eq!(entry.data, raw);
}


#[test]
fn offset_table_cut_short() {
	let mut data = vec![];
	for v in [1u32, 1001, 0, 0] {
		data.extend_with_u32(v);
	};
	data.resize(16 + 4 * 1000, 0);
	data.extend_with_u32(0x1234);

	let container = TexContainer::from_bytes(&data).unwrap();
	assert_eq!(container.entry_count(), 1000);
	assert_eq!(container.offsets, vec![0x1234]);
	assert_eq!(container.offset(0), Some(0x1234));
	assert_eq!(container.offset(999), Some(0));
	assert_eq!(container.offset(1000), None);
}
