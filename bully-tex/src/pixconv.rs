use image::{GrayImage, RgbImage, RgbaImage};


/// Copy R, G, B, A quadruplets into a transparent black image.
pub(crate) fn rgba8888_to_image(data: &[u8], width: u32, height: u32) -> RgbaImage {
	let mut image = RgbaImage::new(width, height);

	for (pixel, rgba) in image.pixels_mut().zip(data.chunks_exact(4)) {
		pixel.0.copy_from_slice(rgba);
	};

	image
}


/// Reorder B, G, R byte triplets into an RGB image; missing pixels stay black.
pub(crate) fn bgr888_to_image(data: &[u8], width: u32, height: u32) -> RgbImage {
	let mut image = RgbImage::new(width, height);

	for (pixel, bgr) in image.pixels_mut().zip(data.chunks_exact(3)) {
		pixel.0 = [bgr[2], bgr[1], bgr[0]];
	};

	image
}


pub(crate) fn luminance8_to_image(data: &[u8], width: u32, height: u32) -> GrayImage {
	let mut image = GrayImage::new(width, height);

	for (pixel, l) in image.pixels_mut().zip(data) {
		pixel.0 = [*l];
	};

	image
}


#[test]
fn bgr888_reorder() {
	let data = [0x10u8, 0x20, 0x30, 0x40, 0x50, 0x60];
	let image = bgr888_to_image(&data, 2, 1);
	assert_eq!(image.get_pixel(0, 0).0, [0x30, 0x20, 0x10]);
	assert_eq!(image.get_pixel(1, 0).0, [0x60, 0x50, 0x40]);
}


#[test]
fn short_data_keeps_defaults() {
	let image = rgba8888_to_image(&[1, 2, 3, 4, 5, 6], 2, 1);
	assert_eq!(image.get_pixel(0, 0).0, [1, 2, 3, 4]);
	assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0, 0]);

	let image = bgr888_to_image(&[1, 2, 3, 4], 2, 1);
	assert_eq!(image.get_pixel(0, 0).0, [3, 2, 1]);
	assert_eq!(image.get_pixel(1, 0).0, [0, 0, 0]);

	let image = luminance8_to_image(&[7, 8, 9, 10, 11], 2, 2);
	assert_eq!(image.as_raw(), &vec![7, 8, 9, 10]);
}
