use derive_more::Display;
use image::DynamicImage;

use crate::TexResult;
use crate::TexError::*;
use crate::block::{self, Dxt1Block, Dxt3Block, Dxt5Block, Pvrtc2Block};
use crate::pixconv;
use crate::pixel::{PackedPixel, Rgb565Pixel, Abgr1555Pixel};


/// Pixel encoding of a [`TexEntry`][crate::TexEntry], as stored in its format
/// code
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TexFormat {
	/// Code 0: RGBA 8:8:8:8, byte order R, G, B, A.
	#[display(fmt = "RGBA8888")]
	Rgba8888,

	/// Code 1: RGB 8:8:8, byte order B, G, R.
	#[display(fmt = "BGR888")]
	Bgr888,

	/// Code 3: RGB 5:6:5 in a little-endian 2-byte integer.
	#[display(fmt = "RGB565")]
	Rgb565,

	/// Code 4: 1-bit alpha and RGB 5:5:5 in a little-endian 2-byte integer.
	#[display(fmt = "ABGR16")]
	Abgr1555,

	/// Code 5: DXT1 (BC1) texture.
	#[display(fmt = "DXT1")]
	Dxt1,

	/// Code 6: DXT3 (BC2) texture.
	#[display(fmt = "DXT3")]
	Dxt3,

	/// Code 7: DXT5 (BC3) texture.
	#[display(fmt = "DXT5")]
	Dxt5,

	/// Code 8: 8-bit luminance.
	#[display(fmt = "L8")]
	Luminance8,

	/// Code 9: 8x4 blocks of two RGB565 endpoints and 2-bit indices.
	///
	/// This is the game's own two-endpoint scheme, not the PVRTC bitstream:
	/// there is no modulation mode and no blending across block boundaries.
	#[display(fmt = "PVRTC2")]
	Pvrtc2,

	/// Any other code.  Entries of this format are reported as
	/// [`DecodeOutcome::UnsupportedFormat`][crate::DecodeOutcome::UnsupportedFormat].
	#[display(fmt = "unsupported ({})", _0)]
	Unsupported(u32),
}


impl From<u32> for TexFormat {
	fn from(code: u32) -> Self {
		use TexFormat::*;

		match code {
			0 => Rgba8888,
			1 => Bgr888,
			3 => Rgb565,
			4 => Abgr1555,
			5 => Dxt1,
			6 => Dxt3,
			7 => Dxt5,
			8 => Luminance8,
			9 => Pvrtc2,
			code => Unsupported(code),
		}
	}
}


impl TexFormat {
	/// Largest width or height [`Self::decode_pixels`] accepts.
	pub const MAX_DIMENSION: u32 = 32768;

	/// Largest decoded image, in bytes, [`Self::decode_pixels`] accepts.
	pub const MAX_IMAGE_BYTES: u64 = 256 * 1024 * 1024;


	/// Return the numeric format code as stored in the entry record.
	///
	/// # Example
	/// ```
	/// # use bully_tex::TexFormat;
	/// assert_eq!(TexFormat::Dxt5.code(), 7);
	/// assert_eq!(TexFormat::from(2).code(), 2);
	/// ```
	pub const fn code(&self) -> u32 {
		use TexFormat::*;

		match self {
			Rgba8888 => 0,
			Bgr888 => 1,
			Rgb565 => 3,
			Abgr1555 => 4,
			Dxt1 => 5,
			Dxt3 => 6,
			Dxt5 => 7,
			Luminance8 => 8,
			Pvrtc2 => 9,
			Unsupported(code) => *code,
		}
	}


	/// Return true if the format is block-compressed.
	pub const fn is_block_compressed(&self) -> bool {
		use TexFormat::*;
		matches!(self, Dxt1 | Dxt3 | Dxt5 | Pvrtc2)
	}


	/// Return true if decoded images of this format carry an alpha channel.
	///
	/// # Example
	/// ```
	/// # use bully_tex::TexFormat;
	/// assert!(TexFormat::Dxt3.has_alpha());
	/// assert!(!TexFormat::Bgr888.has_alpha());
	/// ```
	pub const fn has_alpha(&self) -> bool {
		use TexFormat::*;
		matches!(self, Rgba8888 | Abgr1555 | Dxt3 | Dxt5)
	}


	/// Bytes per pixel of the decoded image, or `None` for
	/// [`TexFormat::Unsupported`].
	pub const fn decoded_pixel_bytes(&self) -> Option<u64> {
		use TexFormat::*;

		match self {
			Luminance8 => Some(1),
			Bgr888 => Some(3),
			Unsupported(_) => None,
			_ => Some(4),
		}
	}


	/// Return true if a decoder exists for this format.
	pub const fn is_supported(&self) -> bool {
		!matches!(self, TexFormat::Unsupported(_))
	}


	/// Decode `data` as a `width`x`height` image of this format.  Returns
	/// `Ok(None)` for [`TexFormat::Unsupported`].
	///
	/// Missing trailing data never fails the decode: pixels without data keep
	/// the format's default value (opaque black, or transparent black for
	/// formats with alpha).
	///
	/// # Errors
	/// - [`ImageTooLarge`]: `width` or `height` exceeds [`Self::MAX_DIMENSION`],
	///   or the decoded image would exceed [`Self::MAX_IMAGE_BYTES`].
	/// - [`PixelReadError`]: a packed pixel or block could not be parsed
	///   (should never happen).
	pub fn decode_pixels(&self, data: &[u8], width: u32, height: u32) -> TexResult<Option<DynamicImage>> {
		use TexFormat::*;

		if width > Self::MAX_DIMENSION || height > Self::MAX_DIMENSION {
			return Err(ImageTooLarge(width, height));
		};

		if let Some(pixel_bytes) = self.decoded_pixel_bytes() {
			if u64::from(width) * u64::from(height) * pixel_bytes > Self::MAX_IMAGE_BYTES {
				return Err(ImageTooLarge(width, height));
			};
		};

		let image = match self {
			Rgba8888 => DynamicImage::ImageRgba8(pixconv::rgba8888_to_image(data, width, height)),
			Bgr888 => DynamicImage::ImageRgb8(pixconv::bgr888_to_image(data, width, height)),
			Rgb565 => DynamicImage::ImageRgba8(Rgb565Pixel::convert_to_image(data, width, height)?),
			Abgr1555 => DynamicImage::ImageRgba8(Abgr1555Pixel::convert_to_image(data, width, height)?),
			Dxt1 => DynamicImage::ImageRgba8(block::decode_blocks::<Dxt1Block>(data, width, height)?),
			Dxt3 => DynamicImage::ImageRgba8(block::decode_blocks::<Dxt3Block>(data, width, height)?),
			Dxt5 => DynamicImage::ImageRgba8(block::decode_blocks::<Dxt5Block>(data, width, height)?),
			Luminance8 => DynamicImage::ImageLuma8(pixconv::luminance8_to_image(data, width, height)),
			Pvrtc2 => DynamicImage::ImageRgba8(block::decode_blocks::<Pvrtc2Block>(data, width, height)?),
			Unsupported(_) => return Ok(None),
		};

		Ok(Some(image))
	}
}


#[test]
fn format_codes() {
	for code in 0..16u32 {
		let format = TexFormat::from(code);
		assert_eq!(format.code(), code);
		assert_eq!(format.is_supported(), !matches!(code, 2 | 10..=15));
	};

	assert_eq!(TexFormat::from(2), TexFormat::Unsupported(2));
	assert_eq!(TexFormat::from(u32::MAX), TexFormat::Unsupported(u32::MAX));
}


#[test]
fn decode_unsupported() {
	let result = TexFormat::Unsupported(2).decode_pixels(&[0u8; 16], 2, 2).unwrap();
	assert!(result.is_none());
}


#[test]
fn oversized_dimensions() {
	let result = TexFormat::Dxt1.decode_pixels(&[], TexFormat::MAX_DIMENSION + 1, 1);
	assert!(matches!(result, Err(crate::TexError::ImageTooLarge(32769, 1))));
}


#[test]
fn oversized_image_bytes() {
	let side = TexFormat::MAX_DIMENSION;
	for format in [TexFormat::Rgba8888, TexFormat::Dxt1, TexFormat::Luminance8] {
		let result = format.decode_pixels(&[], side, side);
		assert!(matches!(result, Err(crate::TexError::ImageTooLarge(32768, 32768))), "{}", format);
	};

	// Exactly at the limit for one byte per pixel but not for four
	let result = TexFormat::Rgba8888.decode_pixels(&[], 16384, 16384);
	assert!(matches!(result, Err(crate::TexError::ImageTooLarge(16384, 16384))));
	assert_eq!(16384 * 16384 * TexFormat::Luminance8.decoded_pixel_bytes().unwrap(), TexFormat::MAX_IMAGE_BYTES);

	assert!(TexFormat::Unsupported(2).decode_pixels(&[], side, side).unwrap().is_none());
}


#[test]
fn decoded_color_types() {
	use image::{ColorType, GenericImageView};

	let cases = [
		(TexFormat::Rgba8888, ColorType::Rgba8),
		(TexFormat::Bgr888, ColorType::Rgb8),
		(TexFormat::Rgb565, ColorType::Rgba8),
		(TexFormat::Abgr1555, ColorType::Rgba8),
		(TexFormat::Dxt1, ColorType::Rgba8),
		(TexFormat::Dxt3, ColorType::Rgba8),
		(TexFormat::Dxt5, ColorType::Rgba8),
		(TexFormat::Luminance8, ColorType::L8),
		(TexFormat::Pvrtc2, ColorType::Rgba8),
	];

	for (format, color) in cases {
		let image = format.decode_pixels(&[], 3, 5).unwrap().unwrap();
		assert_eq!(image.color(), color, "{}", format);
		assert_eq!((image.width(), image.height()), (3, 5));
	};
}
