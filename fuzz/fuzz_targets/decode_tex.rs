#![no_main]
use libfuzzer_sys::fuzz_target;

use bully_tex::TexDecoder;

fuzz_target!(|data: &[u8]| {
	let mut decoder = match TexDecoder::from_bytes(data) {
		Ok(decoder) => decoder,
		Err(_) => return,
	};

	let count = decoder.container().entry_count() as usize;

	for index in 0..count.min(4) {
		let _ = decoder.decode_nth(index);
	};

	let _ = decoder.decode_detail();
});
