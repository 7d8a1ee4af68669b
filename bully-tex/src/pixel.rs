use crate::TexResult;
use crate::TexError::*;


use deku::{prelude::*, DekuContainerRead};
use image::{Rgba, RgbaImage};
use tap::prelude::*;


/// A 16-bit pixel stored as a little-endian integer, whose bit fields are
/// declared most significant bit first
pub(crate) trait PackedPixel: for<'a> DekuContainerRead<'a> + Sized {
	const PIXEL_WIDTH_BYTES: usize = 2;

	/// Value of pixels with no data behind them.
	const DEFAULT_RGBA: [u8; 4];

	fn into_rgba8(self) -> [u8; 4];


	fn from_data(data: &[u8]) -> TexResult<Self> {
		let data = data.get(0..Self::PIXEL_WIDTH_BYTES)
			.ok_or(PixelReadError)?
			.to_owned()
			.tap_mut(|d| d.reverse());

		let (_, result) = <Self as DekuContainerRead>::from_bytes((data.as_slice(), 0))
			.map_err(|_| PixelReadError)?;
		Ok(result)
	}


	/// Decode `width * height` pixels from `data`; pixels past the end of
	/// `data` keep [`Self::DEFAULT_RGBA`].
	fn convert_to_image(data: &[u8], width: u32, height: u32) -> TexResult<RgbaImage> {
		let mut image = RgbaImage::from_pixel(width, height, Rgba(Self::DEFAULT_RGBA));

		for (pixel, pixdata) in image.pixels_mut().zip(data.chunks_exact(Self::PIXEL_WIDTH_BYTES)) {
			*pixel = Rgba(Self::from_data(pixdata)?.into_rgba8());
		};

		Ok(image)
	}
}


/// RGB 5:6:5, also the endpoint color encoding of every block format
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead)]
pub(crate) struct Rgb565Pixel {
	#[deku(bits = "5")]
	r: u8,
	#[deku(bits = "6")]
	g: u8,
	#[deku(bits = "5")]
	b: u8,
}


impl Rgb565Pixel {
	#[allow(clippy::cast_possible_truncation)]
	pub(crate) const fn from_u16(value: u16) -> Self {
		Self {
			r: ((value >> 11) & 0x1F) as u8,
			g: ((value >> 5) & 0x3F) as u8,
			b: (value & 0x1F) as u8,
		}
	}


	/// Expand to RGB 8:8:8 by shifting each field into the high bits.
	pub(crate) const fn into_rgb8(self) -> [u8; 3] {
		[self.r << 3, self.g << 2, self.b << 3]
	}
}


impl PackedPixel for Rgb565Pixel {
	const DEFAULT_RGBA: [u8; 4] = [0, 0, 0, 0xFF];

	fn into_rgba8(self) -> [u8; 4] {
		let [r, g, b] = self.into_rgb8();
		[r, g, b, 0xFF]
	}
}


/// 1-bit alpha and RGB 5:5:5
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead)]
pub(crate) struct Abgr1555Pixel {
	#[deku(bits = "1")]
	a: u8,
	#[deku(bits = "5")]
	r: u8,
	#[deku(bits = "5")]
	g: u8,
	#[deku(bits = "5")]
	b: u8,
}


impl PackedPixel for Abgr1555Pixel {
	const DEFAULT_RGBA: [u8; 4] = [0, 0, 0, 0];

	fn into_rgba8(self) -> [u8; 4] {
		let a = if self.a != 0 { 0xFF } else { 0x00 };
		[self.r << 3, self.g << 3, self.b << 3, a]
	}
}


#[test]
fn rgb565_expansion_formula() {
	for v in 0..=u16::MAX {
		let expected = [
			(((v >> 11) & 0x1F) << 3) as u8,
			(((v >> 5) & 0x3F) << 2) as u8,
			((v & 0x1F) << 3) as u8,
		];

		assert_eq!(Rgb565Pixel::from_u16(v).into_rgb8(), expected, "{:#06x}", v);
	};
}


#[test]
fn rgb565_from_data_matches_from_u16() {
	for v in [0x0000u16, 0xFFFF, 0xF800, 0x07E0, 0x001F, 0x1234, 0xBEEF] {
		assert_eq!(Rgb565Pixel::from_data(&v.to_le_bytes()).unwrap(), Rgb565Pixel::from_u16(v));
	};
}


#[test]
fn abgr1555_bytes() {
	// a=1 r=0b11111 g=0b00000 b=0b10101
	let opaque = 0b1_11111_00000_10101u16.to_le_bytes();
	assert_eq!(Abgr1555Pixel::from_data(&opaque).unwrap().into_rgba8(), [0xF8, 0x00, 0xA8, 0xFF]);

	// a=0 r=0b00001 g=0b11111 b=0b00000
	let clear = 0b0_00001_11111_00000u16.to_le_bytes();
	assert_eq!(Abgr1555Pixel::from_data(&clear).unwrap().into_rgba8(), [0x08, 0xF8, 0x00, 0x00]);
}


#[test]
fn truncated_pixel_data_keeps_defaults() {
	// Two full pixels and one stray byte for a 2x2 image
	let data = [0x1F, 0x00, 0xE0, 0x07, 0xFF];

	let image = Rgb565Pixel::convert_to_image(&data, 2, 2).unwrap();
	assert_eq!(image.get_pixel(0, 0).0, [0x00, 0x00, 0xF8, 0xFF]);
	assert_eq!(image.get_pixel(1, 0).0, [0x00, 0xFC, 0x00, 0xFF]);
	assert_eq!(image.get_pixel(0, 1).0, [0x00, 0x00, 0x00, 0xFF]);
	assert_eq!(image.get_pixel(1, 1).0, [0x00, 0x00, 0x00, 0xFF]);

	let image = Abgr1555Pixel::convert_to_image(&data[..2], 2, 1).unwrap();
	assert_eq!(image.get_pixel(0, 0).0, [0x00, 0x00, 0xF8, 0x00]);
	assert_eq!(image.get_pixel(1, 0).0, [0x00, 0x00, 0x00, 0x00]);
}
