use byteorder::{ByteOrder, LittleEndian};
use deku::{prelude::*, DekuContainerRead};
use image::{Rgba, RgbaImage};
use static_assertions::const_assert;

use crate::TexResult;
use crate::TexError::*;
use crate::macros;
use crate::pixel::Rgb565Pixel;


const MAX_BLOCK_PIXELS: usize = 32;


/// A block-compressed pixel format: fixed-size tiles, each decoded from a
/// fixed number of bytes
pub(crate) trait BlockFormat {
	const BLOCK_WIDTH: u32;
	const BLOCK_HEIGHT: u32;
	const BLOCK_BYTES: usize;
	/// Value of pixels whose block is missing from the data.
	const DEFAULT_RGBA: [u8; 4];

	const BLOCK_PIXELS: usize = (Self::BLOCK_WIDTH * Self::BLOCK_HEIGHT) as usize;

	/// Decode `block` (exactly [`Self::BLOCK_BYTES`] long) into
	/// [`Self::BLOCK_PIXELS`] row-major RGBA pixels.
	fn decode_block(block: &[u8], pixels: &mut [[u8; 4]]) -> TexResult<()>;
}


/// Decode a `width`x`height` image from consecutive row-major blocks.
///
/// Edge blocks are clipped to the image.  Decoding stops at the first block
/// that `data` cannot hold in full; every pixel not covered by then keeps
/// [`BlockFormat::DEFAULT_RGBA`].
pub(crate) fn decode_blocks<F: BlockFormat>(data: &[u8], width: u32, height: u32) -> TexResult<RgbaImage> {
	let mut image = RgbaImage::from_pixel(width, height, Rgba(F::DEFAULT_RGBA));

	let blocks_x = width / F::BLOCK_WIDTH + u32::from(width % F::BLOCK_WIDTH != 0);
	let blocks_y = height / F::BLOCK_HEIGHT + u32::from(height % F::BLOCK_HEIGHT != 0);

	let mut blocks = data.chunks_exact(F::BLOCK_BYTES);
	let mut pixels = [[0u8; 4]; MAX_BLOCK_PIXELS];
	let pixels = &mut pixels[..F::BLOCK_PIXELS];

	for by in 0..blocks_y {
		for bx in 0..blocks_x {
			let block = match blocks.next() {
				Some(block) => block,
				None => {
					macros::log!(debug, "Block data ends before block ({}, {}) of {}x{}", bx, by, blocks_x, blocks_y);
					return Ok(image);
				},
			};

			F::decode_block(block, pixels)?;

			#[allow(clippy::cast_possible_truncation)]
			for (i, rgba) in pixels.iter().enumerate() {
				let x = bx * F::BLOCK_WIDTH + (i as u32) % F::BLOCK_WIDTH;
				let y = by * F::BLOCK_HEIGHT + (i as u32) / F::BLOCK_WIDTH;

				if x < width && y < height {
					image.put_pixel(x, y, Rgba(*rgba));
				};
			};
		};
	};

	Ok(image)
}


/// How the two interpolated entries of a [`ColorBlock`] palette are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaletteMode {
	/// Two thirds blends if `color0 > color1`, otherwise a half blend and black.
	Toggled,
	/// Always two thirds blends.
	FourColor,
}


/// Two RGB565 endpoints and 2-bit palette indices, least significant pair first
#[derive(Debug, Clone, Copy, PartialEq, Eq, DekuRead)]
#[deku(endian = "little")]
struct ColorBlock {
	color0: u16,
	color1: u16,
	indices: u32,
}


impl ColorBlock {
	const SIZE: usize = 8;


	fn read(data: &[u8]) -> TexResult<Self> {
		let data = data.get(0..Self::SIZE).ok_or(PixelReadError)?;
		let (_, result) = <Self as DekuContainerRead>::from_bytes((data, 0))
			.map_err(|_| PixelReadError)?;
		Ok(result)
	}


	fn palette(&self, mode: PaletteMode) -> [[u8; 3]; 4] {
		let c0 = Rgb565Pixel::from_u16(self.color0).into_rgb8();
		let c1 = Rgb565Pixel::from_u16(self.color1).into_rgb8();

		if mode == PaletteMode::FourColor || self.color0 > self.color1 {
			[c0, c1, blend(c0, c1, 2, 1, 3), blend(c0, c1, 1, 2, 3)]
		}
		else {
			[c0, c1, blend(c0, c1, 1, 1, 2), [0, 0, 0]]
		}
	}


	/// Palette index of pixel `i`.  Pixels past the 16th select entry 0.
	fn index(&self, i: usize) -> usize {
		#[allow(clippy::cast_possible_truncation)]
		let shift = (2 * i) as u32;
		(self.indices.checked_shr(shift).unwrap_or(0) & 0x03) as usize
	}


	fn decode_rgb(&self, mode: PaletteMode, pixels: &mut [[u8; 4]]) {
		let palette = self.palette(mode);

		for (i, pixel) in pixels.iter_mut().enumerate() {
			let [r, g, b] = palette[self.index(i)];
			*pixel = [r, g, b, 0xFF];
		};
	}
}


#[allow(clippy::cast_possible_truncation)]
fn blend(a: [u8; 3], b: [u8; 3], weight_a: u16, weight_b: u16, divisor: u16) -> [u8; 3] {
	[0, 1, 2].map(|c| ((weight_a * u16::from(a[c]) + weight_b * u16::from(b[c])) / divisor) as u8)
}


/// DXT5 alpha palette for endpoints `a0` and `a1`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn alpha_ramp(a0: u8, a1: u8) -> [u8; 8] {
	let (w0, w1) = (u16::from(a0), u16::from(a1));
	let mut ramp = [a0, a1, 0, 0, 0, 0, 0x00, 0xFF];

	if a0 > a1 {
		for k in 1..=6u16 {
			ramp[usize::from(k) + 1] = (((7 - k) * w0 + k * w1) / 7) as u8;
		};
	}
	else {
		for k in 1..=4u16 {
			ramp[usize::from(k) + 1] = (((5 - k) * w0 + k * w1) / 5) as u8;
		};
	};

	ramp
}


/// DXT1: one [`ColorBlock`] per 4x4 tile, opaque
pub(crate) struct Dxt1Block;


impl BlockFormat for Dxt1Block {
	const BLOCK_WIDTH: u32 = 4;
	const BLOCK_HEIGHT: u32 = 4;
	const BLOCK_BYTES: usize = 8;
	const DEFAULT_RGBA: [u8; 4] = [0, 0, 0, 0xFF];

	fn decode_block(block: &[u8], pixels: &mut [[u8; 4]]) -> TexResult<()> {
		ColorBlock::read(block)?.decode_rgb(PaletteMode::Toggled, pixels);
		Ok(())
	}
}


/// DXT3: 4-bit explicit alpha per pixel, then a [`ColorBlock`]
pub(crate) struct Dxt3Block;


impl BlockFormat for Dxt3Block {
	const BLOCK_WIDTH: u32 = 4;
	const BLOCK_HEIGHT: u32 = 4;
	const BLOCK_BYTES: usize = 16;
	const DEFAULT_RGBA: [u8; 4] = [0, 0, 0, 0];

	fn decode_block(block: &[u8], pixels: &mut [[u8; 4]]) -> TexResult<()> {
		let (alpha, color) = block.split_at(8);
		ColorBlock::read(color)?.decode_rgb(PaletteMode::Toggled, pixels);

		for (i, pixel) in pixels.iter_mut().enumerate() {
			let nibble = (alpha[i / 2] >> ((i % 2) * 4)) & 0x0F;
			pixel[3] = (nibble << 4) | nibble;
		};

		Ok(())
	}
}


/// DXT5: two alpha endpoints with 3-bit indices, then a [`ColorBlock`]
pub(crate) struct Dxt5Block;


impl BlockFormat for Dxt5Block {
	const BLOCK_WIDTH: u32 = 4;
	const BLOCK_HEIGHT: u32 = 4;
	const BLOCK_BYTES: usize = 16;
	const DEFAULT_RGBA: [u8; 4] = [0, 0, 0, 0];

	fn decode_block(block: &[u8], pixels: &mut [[u8; 4]]) -> TexResult<()> {
		let (alpha, color) = block.split_at(8);
		ColorBlock::read(color)?.decode_rgb(PaletteMode::FourColor, pixels);

		let ramp = alpha_ramp(alpha[0], alpha[1]);
		let indices = LittleEndian::read_u48(&alpha[2..8]);

		for (i, pixel) in pixels.iter_mut().enumerate() {
			#[allow(clippy::cast_possible_truncation)]
			let index = ((indices >> (3 * i)) & 0x07) as usize;
			pixel[3] = ramp[index];
		};

		Ok(())
	}
}


/// The game's two-endpoint 8x4 format: one [`ColorBlock`] (read as a
/// little-endian 64-bit word) per tile, always four opaque colors
///
/// Only 32 index bits exist for 32 pixels, so rows 0-1 of each block use
/// indices and rows 2-3 always take `color0`.
pub(crate) struct Pvrtc2Block;


impl BlockFormat for Pvrtc2Block {
	const BLOCK_WIDTH: u32 = 8;
	const BLOCK_HEIGHT: u32 = 4;
	const BLOCK_BYTES: usize = 8;
	const DEFAULT_RGBA: [u8; 4] = [0, 0, 0, 0xFF];

	fn decode_block(block: &[u8], pixels: &mut [[u8; 4]]) -> TexResult<()> {
		ColorBlock::read(block)?.decode_rgb(PaletteMode::FourColor, pixels);
		Ok(())
	}
}


const_assert!(<Pvrtc2Block as BlockFormat>::BLOCK_PIXELS <= MAX_BLOCK_PIXELS);
const_assert!(<Dxt5Block as BlockFormat>::BLOCK_PIXELS <= MAX_BLOCK_PIXELS);


#[cfg(test)]
fn color_block(color0: u16, color1: u16, indices: u32) -> Vec<u8> {
	let mut data = Vec::with_capacity(8);
	data.extend(color0.to_le_bytes());
	data.extend(color1.to_le_bytes());
	data.extend(indices.to_le_bytes());
	data
}


#[test]
fn dxt1_equal_endpoints() {
	// Indices 3 would select black, which is not an endpoint
	for indices in [0x0000_0000, 0x5555_5555, 0xAAAA_AAAA, 0x2492_4924] {
		let data = color_block(0xF800, 0xF800, indices);
		let image = decode_blocks::<Dxt1Block>(&data, 4, 4).unwrap();
		assert!(image.pixels().all(|p| p.0 == [0xF8, 0x00, 0x00, 0xFF]), "{:#010x}", indices);
	};
}


#[test]
fn dxt1_palette_modes() {
	let four = ColorBlock { color0: 0xFFFF, color1: 0x0000, indices: 0 };
	assert_eq!(four.palette(PaletteMode::Toggled), [
		[0xF8, 0xFC, 0xF8],
		[0x00, 0x00, 0x00],
		[165, 168, 165],
		[82, 84, 82],
	]);

	let three = ColorBlock { color0: 0x0000, color1: 0xFFFF, indices: 0 };
	assert_eq!(three.palette(PaletteMode::Toggled), [
		[0x00, 0x00, 0x00],
		[0xF8, 0xFC, 0xF8],
		[124, 126, 124],
		[0, 0, 0],
	]);
	assert_eq!(three.palette(PaletteMode::FourColor)[3], [165, 168, 165]);

	let data = color_block(0x0000, 0xFFFF, 0xFFFF_FFFF);
	let image = decode_blocks::<Dxt1Block>(&data, 4, 4).unwrap();
	assert!(image.pixels().all(|p| p.0 == [0, 0, 0, 0xFF]));
}


#[test]
fn dxt1_index_order() {
	// Pixel 0 = index 1, pixel 5 = index 2, pixel 15 = index 1
	let indices = 0b01 | (0b10 << 10) | (0b01 << 30);
	let data = color_block(0xFFFF, 0x0000, indices);
	let image = decode_blocks::<Dxt1Block>(&data, 4, 4).unwrap();

	assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0xFF]);
	assert_eq!(image.get_pixel(1, 0).0, [0xF8, 0xFC, 0xF8, 0xFF]);
	assert_eq!(image.get_pixel(1, 1).0, [165, 168, 165, 0xFF]);
	assert_eq!(image.get_pixel(3, 3).0, [0, 0, 0, 0xFF]);
}


#[test]
fn dxt1_edge_blocks_are_clipped() {
	let mut data = vec![];
	for color in [0xF800u16, 0x07E0, 0x001F, 0xFFFF] {
		data.extend(color_block(color, color, 0));
	};

	let image = decode_blocks::<Dxt1Block>(&data, 6, 5).unwrap();
	assert_eq!(image.dimensions(), (6, 5));
	assert_eq!(image.get_pixel(3, 3).0, [0xF8, 0x00, 0x00, 0xFF]);
	assert_eq!(image.get_pixel(5, 0).0, [0x00, 0xFC, 0x00, 0xFF]);
	assert_eq!(image.get_pixel(0, 4).0, [0x00, 0x00, 0xF8, 0xFF]);
	assert_eq!(image.get_pixel(5, 4).0, [0xF8, 0xFC, 0xF8, 0xFF]);
}


#[test]
fn dxt1_truncated_block_stays_black() {
	let mut data = color_block(0xFFFF, 0xFFFF, 0);
	data.extend([0xFF, 0xFF, 0xFF, 0xFF]);

	let image = decode_blocks::<Dxt1Block>(&data, 8, 4).unwrap();
	for y in 0..4 {
		for x in 0..4 {
			assert_eq!(image.get_pixel(x, y).0, [0xF8, 0xFC, 0xF8, 0xFF]);
			assert_eq!(image.get_pixel(x + 4, y).0, [0, 0, 0, 0xFF]);
		};
	};
}


#[test]
fn dxt3_explicit_alpha() {
	let mut data = vec![0xF0u8, 0x5A, 0, 0, 0, 0, 0, 0x10];
	data.extend(color_block(0x001F, 0x001F, 0));

	let image = decode_blocks::<Dxt3Block>(&data, 4, 4).unwrap();
	assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0xF8, 0x00]);
	assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0xF8, 0xFF]);
	assert_eq!(image.get_pixel(2, 0).0, [0, 0, 0xF8, 0xAA]);
	assert_eq!(image.get_pixel(3, 0).0, [0, 0, 0xF8, 0x55]);
	assert_eq!(image.get_pixel(2, 3).0, [0, 0, 0xF8, 0x00]);
	assert_eq!(image.get_pixel(3, 3).0, [0, 0, 0xF8, 0x11]);

	// Missing second block
	let image = decode_blocks::<Dxt3Block>(&data, 8, 4).unwrap();
	assert_eq!(image.get_pixel(4, 0).0, [0, 0, 0, 0]);
}


#[test]
fn dxt3_three_color_palette() {
	// Pixels 0..3 select entries 2, 3, 0, 1
	let mut data = vec![0x3Cu8, 0x9F, 0, 0, 0, 0, 0, 0];
	data.extend(color_block(0x001F, 0xF800, 0b01_00_11_10));

	let image = decode_blocks::<Dxt3Block>(&data, 4, 4).unwrap();
	assert_eq!(image.get_pixel(0, 0).0, [124, 0, 124, 0xCC]);
	assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0, 0x33]);
	assert_eq!(image.get_pixel(2, 0).0, [0, 0, 0xF8, 0xFF]);
	assert_eq!(image.get_pixel(3, 0).0, [0xF8, 0, 0, 0x99]);
}


#[test]
fn dxt5_alpha_ramps() {
	assert_eq!(alpha_ramp(200, 100), [200, 100, 185, 171, 157, 142, 128, 114]);
	assert_eq!(alpha_ramp(50, 200), [50, 200, 80, 110, 140, 170, 0, 255]);
	assert_eq!(alpha_ramp(7, 7), [7, 7, 7, 7, 7, 7, 0, 255]);
}


#[test]
fn dxt5_block() {
	// Pixel 0 = alpha index 6, pixel 1 = alpha index 7, the rest index 0
	let mut data = vec![50u8, 200, 6 | (7 << 3), 0, 0, 0, 0, 0];
	// color0 < color1 would be the 3-color mode in DXT1; DXT5 ignores it
	data.extend(color_block(0x0000, 0xFFFF, 0xFFFF_FFFF));

	let image = decode_blocks::<Dxt5Block>(&data, 4, 4).unwrap();
	assert_eq!(image.get_pixel(0, 0).0, [165, 168, 165, 0]);
	assert_eq!(image.get_pixel(1, 0).0, [165, 168, 165, 255]);
	assert_eq!(image.get_pixel(2, 0).0, [165, 168, 165, 50]);
	assert_eq!(image.get_pixel(3, 3).0, [165, 168, 165, 50]);
}


#[test]
fn pvrtc2_block() {
	let data = color_block(0xF800, 0x001F, 0xFFFF_FFFF);
	let image = decode_blocks::<Pvrtc2Block>(&data, 8, 4).unwrap();

	for x in 0..8 {
		for y in 0..2 {
			assert_eq!(image.get_pixel(x, y).0, [82, 0, 165, 0xFF]);
		};
		for y in 2..4 {
			assert_eq!(image.get_pixel(x, y).0, [0xF8, 0, 0, 0xFF]);
		};
	};

	let data = color_block(0xF800, 0x001F, 0b10);
	let image = decode_blocks::<Pvrtc2Block>(&data, 8, 4).unwrap();
	assert_eq!(image.get_pixel(0, 0).0, [165, 0, 82, 0xFF]);
	assert_eq!(image.get_pixel(1, 0).0, [0xF8, 0, 0, 0xFF]);
}


#[test]
fn pvrtc2_grid() {
	let mut data = color_block(0x07E0, 0x07E0, 0);
	data.extend([0u8; 7]);

	let image = decode_blocks::<Pvrtc2Block>(&data, 10, 6).unwrap();
	assert_eq!(image.get_pixel(7, 3).0, [0, 0xFC, 0, 0xFF]);
	assert_eq!(image.get_pixel(8, 0).0, [0, 0, 0, 0xFF]);
	assert_eq!(image.get_pixel(0, 4).0, [0, 0, 0, 0xFF]);
}
