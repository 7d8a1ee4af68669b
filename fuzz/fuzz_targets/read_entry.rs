#![no_main]
use libfuzzer_sys::fuzz_target;

use bully_tex::{TexEntry, PayloadCompression};

fuzz_target!(|data: &[u8]| {
	for compression in [PayloadCompression::OnDisk, PayloadCompression::LengthPrefixed] {
		if let Ok(entry) = TexEntry::from_bytes(data, compression) {
			let _ = entry.decode();
		};
	};
});
