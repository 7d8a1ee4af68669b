use std::io::{Read, Seek, SeekFrom, Cursor};

use crate::TexResult;
use crate::ReadExt;
use crate::macros;
use crate::{TexFormat, PayloadCompression, PayloadStatus, DecodeOutcome, DecodedImage};
#[cfg(doc)] use crate::TexError::*;


/// A single texture (mip level) from a [`TexContainer`][crate::TexContainer]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TexEntry {
	/// Pixel encoding of [`data`][Self::data].
	pub format: TexFormat,
	/// Width in pixels.
	pub width: u32,
	/// Height in pixels.
	pub height: u32,
	/// Mip count as stored in the record.  Informational only.
	pub mip_count: u32,
	/// Size of the payload region as stored in the record.
	pub payload_size: u32,
	/// Decompressed size declared by [`PayloadCompression::OnDisk`] records.
	/// Not validated.
	pub declared_size: Option<u32>,
	/// Whether [`data`][Self::data] was inflated or used as stored.
	pub status: PayloadStatus,
	/// [`format`][Self::format]-encoded pixel data.
	pub data: Vec<u8>,
}


impl TexEntry {
	/// Read the entry record at `offset`, recovering its payload according
	/// to `compression`.
	///
	/// Record fields that lie past the end of `input` read as 0, and the
	/// payload is cut short at the end of `input`.  A payload that fails to
	/// inflate is kept as-is (see [`PayloadStatus`]).
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: Seeking to `offset` failed.
	pub fn read_from<R: Read + Seek>(input: &mut R, offset: u32, compression: PayloadCompression) -> TexResult<Self> {
		let _ = input.seek(SeekFrom::Start(offset.into()))?;

		let format = TexFormat::from(input.read_u32_or_zero());
		let width = input.read_u32_or_zero();
		let height = input.read_u32_or_zero();
		let mip_count = input.read_u32_or_zero();
		let payload_size = input.read_u32_or_zero();

		macros::log!(trace, "Entry at 0x{:X}: {} {}x{}, {} mips, payload {} bytes ({})",
			offset, format, width, height, mip_count, payload_size, compression);

		let (declared_size, payload) = match compression {
			PayloadCompression::OnDisk => {
				let declared_size = input.read_u32_or_zero();
				let payload = input.read_up_to(payload_size.saturating_sub(4).into());
				(Some(declared_size), payload)
			},

			PayloadCompression::LengthPrefixed => (None, input.read_up_to(payload_size.into())),
		};

		let (data, status) = compression.recover(payload);

		Ok(TexEntry { format, width, height, mip_count, payload_size, declared_size, status, data })
	}


	/// Read an entry record from the start of `input`, see
	/// [`TexEntry::read_from`].
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: Should never happen for an in-memory source.
	pub fn from_bytes(input: &[u8], compression: PayloadCompression) -> TexResult<Self> {
		let mut cursor = Cursor::new(input);
		Self::read_from(&mut cursor, 0, compression)
	}


	/// Return true if any dimension is 0.
	pub fn is_empty(&self) -> bool {
		self.width == 0 || self.height == 0
	}


	/// Decode [`data`][Self::data] into an image, or report that
	/// [`format`][Self::format] has no decoder.
	///
	/// # Errors
	/// - [`ImageTooLarge`]: A dimension exceeds [`TexFormat::MAX_DIMENSION`], or the
	///   decoded image would exceed [`TexFormat::MAX_IMAGE_BYTES`].
	pub fn decode(&self) -> TexResult<DecodeOutcome> {
		let image = match self.format.decode_pixels(&self.data, self.width, self.height)? {
			Some(image) => image,
			None => {
				macros::log!(info, "Unsupported texture format {}", self.format.code());
				return Ok(DecodeOutcome::UnsupportedFormat(self.format.code()));
			},
		};

		let decoded = DecodedImage { format: self.format, status: self.status, image };

		Ok(DecodeOutcome::Decoded(decoded))
	}
}


#[cfg(test)]
use crate::ExtendExt;


#[cfg(test)]
fn record(format: u32, width: u32, height: u32, payload_size: u32) -> Vec<u8> {
	let mut buf = vec![];
	for v in [format, width, height, 1, payload_size] {
		buf.extend_with_u32(v);
	};
	buf
}


#[test]
fn read_length_prefixed_entry() {
	let mut data = record(1, 2, 1, 6);
	data.extend([1u8, 2, 3, 4, 5, 6, 0xEE]);

	let entry = TexEntry::from_bytes(&data, PayloadCompression::LengthPrefixed).unwrap();
	assert_eq!(entry.format, TexFormat::Bgr888);
	assert_eq!((entry.width, entry.height, entry.mip_count), (2, 1, 1));
	assert_eq!(entry.declared_size, None);
	assert_eq!(entry.status, PayloadStatus::Stored);
	assert_eq!(entry.data, vec![1, 2, 3, 4, 5, 6]);
}


#[test]
fn read_on_disk_entry() {
	let raw: Vec<u8> = (0..16u8).collect();
	let compressed = miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6);

	let mut data = record(8, 4, 4, compressed.len() as u32 + 4);
	data.extend_with_u32(raw.len() as u32);
	data.extend(&compressed);

	let entry = TexEntry::from_bytes(&data, PayloadCompression::OnDisk).unwrap();
	assert_eq!(entry.format, TexFormat::Luminance8);
	assert_eq!(entry.declared_size, Some(16));
	assert_eq!(entry.status, PayloadStatus::Inflated);
	assert_eq!(entry.data, raw);
}


#[test]
fn read_on_disk_entry_not_compressed() {
	let mut data = record(0, 1, 1, 8);
	data.extend_with_u32(4);
	data.extend([10u8, 20, 30, 40]);

	let entry = TexEntry::from_bytes(&data, PayloadCompression::OnDisk).unwrap();
	assert_eq!(entry.status, PayloadStatus::InflateFailed);
	assert_eq!(entry.data, vec![10, 20, 30, 40]);

	match entry.decode().unwrap() {
		DecodeOutcome::Decoded(decoded) => {
			assert_eq!(decoded.status, PayloadStatus::InflateFailed);
			assert_eq!(decoded.image.to_rgba8().get_pixel(0, 0).0, [10, 20, 30, 40]);
		},
		other => panic!("Unexpected outcome: {:?}", other),
	};
}


#[test]
fn read_truncated_entry() {
	// Payload size promises more than the file holds
	let mut data = record(3, 4, 4, 32);
	data.extend([0xFFu8, 0xFF, 0x1F]);

	let entry = TexEntry::from_bytes(&data, PayloadCompression::LengthPrefixed).unwrap();
	assert_eq!(entry.data, vec![0xFF, 0xFF, 0x1F]);

	// Record header itself cut short
	let entry = TexEntry::from_bytes(&record(5, 8, 8, 0)[..10], PayloadCompression::LengthPrefixed).unwrap();
	assert_eq!(entry.format, TexFormat::Dxt1);
	assert_eq!(entry.width, 8);
	assert_eq!((entry.height, entry.mip_count, entry.payload_size), (0, 0, 0));
	assert!(entry.is_empty());
	assert!(entry.data.is_empty());
}


#[test]
fn decode_unsupported_entry() {
	let mut data = record(2, 4, 4, 8);
	data.extend([0u8; 8]);

	let entry = TexEntry::from_bytes(&data, PayloadCompression::LengthPrefixed).unwrap();
	assert!(matches!(entry.decode().unwrap(), DecodeOutcome::UnsupportedFormat(2)));
}
