use std::io::{Read, Seek, Cursor};

use image::{DynamicImage, GenericImageView};

use crate::TexResult;
use crate::TexError::*;
use crate::macros;
use crate::{TexContainer, TexFormat, PayloadStatus};


/// An image decoded from a [`TexEntry`][crate::TexEntry]
#[derive(Debug, Clone)]
pub struct DecodedImage {
	/// Format of the entry the image was decoded from.
	pub format: TexFormat,
	/// How the entry's payload was recovered.
	pub status: PayloadStatus,
	/// Decoded pixels: [`DynamicImage::ImageRgba8`], or `ImageRgb8` /
	/// `ImageLuma8` for formats without alpha or color.
	pub image: DynamicImage,
}


impl DecodedImage {
	/// Width in pixels.
	pub fn width(&self) -> u32 {
		self.image.width()
	}


	/// Height in pixels.
	pub fn height(&self) -> u32 {
		self.image.height()
	}
}


/// Result of decoding a container or one of its entries
#[derive(Debug, Clone)]
pub enum DecodeOutcome {
	/// The entry was decoded.
	Decoded(DecodedImage),
	/// The container holds no entries.
	NoEntries,
	/// The entry's format code has no decoder.  Member is the code.
	UnsupportedFormat(u32),
}


impl DecodeOutcome {
	/// Return the decoded image, if any.
	pub fn into_image(self) -> Option<DecodedImage> {
		match self {
			DecodeOutcome::Decoded(decoded) => Some(decoded),
			_ => None,
		}
	}
}


/// Reads a [`TexContainer`] from a source and decodes its entries
#[allow(missing_debug_implementations)]
pub struct TexDecoder<R> {
	reader: R,
	container: TexContainer,
}


impl<R: Read + Seek> TexDecoder<R> {
	/// Read the container header, offset table and metadata from `reader`.
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: Seeking in `reader` failed.
	pub fn with_reader(mut reader: R) -> TexResult<Self> {
		let container = TexContainer::read_from(&mut reader)?;
		Ok(Self { reader, container })
	}


	/// The parsed container.
	pub fn container(&self) -> &TexContainer {
		&self.container
	}


	/// Read and decode entry `index` (0-based).
	///
	/// # Errors
	/// - [`EntryIndexOutOfRange`]: `index` is not below [`TexContainer::entry_count`].
	/// - [`ImageTooLarge`]: The entry's dimensions exceed [`TexFormat::MAX_DIMENSION`]
	///   or its decoded size exceeds [`TexFormat::MAX_IMAGE_BYTES`].
	/// - [`UnexpectedIoError`]: Seeking in the source failed.
	pub fn decode_nth(&mut self, index: usize) -> TexResult<DecodeOutcome> {
		let entry = self.container.read_entry(&mut self.reader, index)?;

		macros::log!(debug, "Decoding entry #{}: {} {}x{} ({})",
			index, entry.format, entry.width, entry.height, entry.status);

		entry.decode()
	}


	/// Decode the last (most detailed) entry, see [`TexDecoder::decode_nth`].
	/// Returns [`DecodeOutcome::NoEntries`] for a container without entries.
	///
	/// # Errors
	/// - [`ImageTooLarge`]: The entry's dimensions exceed [`TexFormat::MAX_DIMENSION`]
	///   or its decoded size exceeds [`TexFormat::MAX_IMAGE_BYTES`].
	/// - [`UnexpectedIoError`]: Seeking in the source failed.
	pub fn decode_detail(&mut self) -> TexResult<DecodeOutcome> {
		match self.container.entry_count() {
			0 => {
				macros::log!(info, "Container has no entries");
				Ok(DecodeOutcome::NoEntries)
			},
			count => self.decode_nth(count as usize - 1),
		}
	}


	/// Give back the source.
	pub fn into_inner(self) -> R {
		self.reader
	}
}


impl<'a> TexDecoder<Cursor<&'a [u8]>> {
	/// Create a decoder over an in-memory container.
	///
	/// # Errors
	/// - [`UnexpectedIoError`]: Should never happen for an in-memory source.
	pub fn from_bytes(data: &'a [u8]) -> TexResult<Self> {
		Self::with_reader(Cursor::new(data))
	}
}


/// Decode the most detailed entry of the container in `data`.
///
/// # Example
/// ```
/// # use bully_tex::{decode_tex, DecodeOutcome};
/// // Header with an entry count field of 1, i.e. no entries
/// let data = [1u8, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
/// assert!(matches!(decode_tex(&data).unwrap(), DecodeOutcome::NoEntries));
/// ```
///
/// # Errors
/// - [`ImageTooLarge`]: The entry's dimensions exceed [`TexFormat::MAX_DIMENSION`]
///   or its decoded size exceeds [`TexFormat::MAX_IMAGE_BYTES`].
pub fn decode_tex(data: &[u8]) -> TexResult<DecodeOutcome> {
	TexDecoder::from_bytes(data)?.decode_detail()
}


#[cfg(test)]
use crate::build_container;


#[cfg(test)]
fn decode_one(format: u32, width: u32, height: u32, payload: Vec<u8>) -> DecodeOutcome {
	let data = build_container(&[(format, width, height, payload)], None);
	decode_tex(&data).unwrap()
}


#[test]
fn decode_bgr_container() {
	let outcome = decode_one(1, 2, 1, vec![3, 2, 1, 30, 20, 10]);
	let decoded = outcome.into_image().unwrap();

	assert_eq!(decoded.format, TexFormat::Bgr888);
	assert_eq!(decoded.status, PayloadStatus::Stored);
	assert_eq!((decoded.width(), decoded.height()), (2, 1));

	let rgba = decoded.image.to_rgba8();
	assert_eq!(rgba.get_pixel(0, 0).0, [1, 2, 3, 255]);
	assert_eq!(rgba.get_pixel(1, 0).0, [10, 20, 30, 255]);
}


#[test]
fn decode_length_prefixed_zlib() {
	let raw: Vec<u8> = [0xFFu8, 0x00, 0x00, 0x80].repeat(4);
	let mut payload = (raw.len() as u32).to_le_bytes().to_vec();
	payload.extend(miniz_oxide::deflate::compress_to_vec_zlib(&raw, 6));

	let decoded = decode_one(0, 2, 2, payload).into_image().unwrap();
	assert_eq!(decoded.status, PayloadStatus::Inflated);
	assert!(decoded.image.to_rgba8().pixels().all(|p| p.0 == [0xFF, 0x00, 0x00, 0x80]));
}


#[test]
fn decode_truncated_dxt1() {
	// 8x4 image, only the first of two blocks present
	let block = vec![0x00u8, 0xF8, 0x00, 0xF8, 0, 0, 0, 0];
	let decoded = decode_one(5, 8, 4, block).into_image().unwrap();
	let rgba = decoded.image.to_rgba8();

	assert_eq!(rgba.get_pixel(0, 0).0, [248, 0, 0, 255]);
	assert_eq!(rgba.get_pixel(3, 3).0, [248, 0, 0, 255]);
	assert_eq!(rgba.get_pixel(4, 0).0, [0, 0, 0, 255]);
	assert_eq!(rgba.get_pixel(7, 3).0, [0, 0, 0, 255]);
}


#[test]
fn decode_unsupported_format() {
	assert!(matches!(decode_one(2, 4, 4, vec![0u8; 16]), DecodeOutcome::UnsupportedFormat(2)));
	assert!(matches!(decode_one(42, 4, 4, vec![]), DecodeOutcome::UnsupportedFormat(42)));
}


#[test]
fn decode_selects_last_entry() {
	let data = build_container(&[
		(8, 1, 1, vec![0x10]),
		(8, 2, 1, vec![0x20, 0x30]),
	], None);

	let mut decoder = TexDecoder::from_bytes(&data).unwrap();
	assert_eq!(decoder.container().entry_count(), 2);

	let detail = decoder.decode_detail().unwrap().into_image().unwrap();
	assert_eq!(detail.width(), 2);

	let first = decoder.decode_nth(0).unwrap().into_image().unwrap();
	assert_eq!(first.image.to_luma8().get_pixel(0, 0).0, [0x10]);

	assert!(matches!(decoder.decode_nth(2), Err(EntryIndexOutOfRange)));
}


#[test]
fn decode_too_large() {
	let result = decode_tex(&build_container(&[(5, 40000, 4, vec![])], None));
	assert!(matches!(result, Err(ImageTooLarge(40000, 4))));

	// A few dozen bytes must not claim gigabytes of pixels
	let data = build_container(&[(0, 32768, 32768, vec![])], None);
	assert!(data.len() < 64);
	assert!(matches!(decode_tex(&data), Err(ImageTooLarge(32768, 32768))));
}
