use byteorder::{ByteOrder, LittleEndian};
use derive_more::Display;
use miniz_oxide::inflate::{decompress_to_vec_zlib, decompress_to_vec_zlib_with_limit};

use crate::macros;


/// How zlib-compressed payloads are wrapped in a container's entry records
///
/// The convention is chosen once per container, from its metadata block (see
/// [`TexContainer::compress_on_disk`][crate::TexContainer::compress_on_disk]).
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadCompression {
	/// The record carries a declared decompressed size after its payload size,
	/// and the `payload_size - 4` bytes that follow are always zlib data.
	#[display(fmt = "compressed on disk")]
	OnDisk,

	/// The payload starts with its decompressed length and may or may not be
	/// zlib data; the inflated result is kept only if its length matches.
	#[default]
	#[display(fmt = "length-prefixed")]
	LengthPrefixed,
}


/// What happened to an entry's payload while it was read
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PayloadStatus {
	/// The payload was zlib data and was inflated.
	#[display(fmt = "inflated")]
	Inflated,

	/// The payload was not compressed and is used as stored.
	#[display(fmt = "stored")]
	Stored,

	/// The payload should have been zlib data but did not inflate; the
	/// compressed bytes are used as-is.
	#[display(fmt = "inflate failed, raw bytes used")]
	InflateFailed,
}


impl PayloadCompression {
	/// Recover the pixel data from `payload`, the bytes that follow the entry
	/// record header (and, for [`OnDisk`][Self::OnDisk], the declared size).
	///
	/// Never fails: data that cannot be inflated is returned unchanged.
	///
	/// # Example
	/// ```
	/// # use bully_tex::{PayloadCompression, PayloadStatus};
	/// let (data, status) = PayloadCompression::LengthPrefixed.recover(vec![1, 2, 3]);
	/// assert_eq!(data, vec![1, 2, 3]);
	/// assert_eq!(status, PayloadStatus::Stored);
	/// ```
	pub fn recover(self, payload: Vec<u8>) -> (Vec<u8>, PayloadStatus) {
		match self {
			PayloadCompression::OnDisk => match decompress_to_vec_zlib(&payload) {
				Ok(data) => (data, PayloadStatus::Inflated),
				Err(e) => {
					macros::log!(warn, "Failed to inflate {} payload bytes ({:?}), using them as-is", payload.len(), e.status);
					(payload, PayloadStatus::InflateFailed)
				},
			},

			PayloadCompression::LengthPrefixed => {
				if payload.len() <= 5 {
					return (payload, PayloadStatus::Stored);
				};

				let (prefix, compressed) = payload.split_at(4);
				let expected_len = LittleEndian::read_u32(prefix) as usize;

				// One spare byte so that a stream of exactly `expected_len` bytes
				// is never cut off at the limit
				match decompress_to_vec_zlib_with_limit(compressed, expected_len.saturating_add(1)) {
					Ok(data) if data.len() == expected_len => (data, PayloadStatus::Inflated),
					_ => {
						macros::log!(trace, "Payload of {} bytes is not length-prefixed zlib data", payload.len());
						(payload, PayloadStatus::Stored)
					},
				}
			},
		}
	}
}


#[cfg(test)]
fn zlib(data: &[u8]) -> Vec<u8> {
	miniz_oxide::deflate::compress_to_vec_zlib(data, 6)
}


#[test]
fn on_disk_inflates() {
	let raw: Vec<u8> = (0..200u8).collect();
	let (data, status) = PayloadCompression::OnDisk.recover(zlib(&raw));
	assert_eq!(data, raw);
	assert_eq!(status, PayloadStatus::Inflated);
}


#[test]
fn on_disk_falls_back_to_raw() {
	let garbage = vec![0xDEu8, 0xAD, 0xBE, 0xEF, 0x00, 0x11];
	let (data, status) = PayloadCompression::OnDisk.recover(garbage.clone());
	assert_eq!(data, garbage);
	assert_eq!(status, PayloadStatus::InflateFailed);

	let (data, status) = PayloadCompression::OnDisk.recover(vec![]);
	assert!(data.is_empty());
	assert_eq!(status, PayloadStatus::InflateFailed);
}


#[test]
fn length_prefixed_inflates() {
	let raw = vec![0x42u8; 64];
	let mut payload = (raw.len() as u32).to_le_bytes().to_vec();
	payload.extend(zlib(&raw));

	let (data, status) = PayloadCompression::LengthPrefixed.recover(payload);
	assert_eq!(data, raw);
	assert_eq!(status, PayloadStatus::Inflated);
}


#[test]
fn length_prefixed_mismatch_keeps_bytes() {
	let raw = vec![0x42u8; 64];

	for declared in [63u32, 65, 0] {
		let mut payload = declared.to_le_bytes().to_vec();
		payload.extend(zlib(&raw));

		let (data, status) = PayloadCompression::LengthPrefixed.recover(payload.clone());
		assert_eq!(data, payload, "declared length {}", declared);
		assert_eq!(status, PayloadStatus::Stored);
	};
}


#[test]
fn length_prefixed_short_or_raw() {
	let short = vec![5u8, 0, 0, 0, 0x78];
	assert_eq!(PayloadCompression::LengthPrefixed.recover(short.clone()), (short, PayloadStatus::Stored));

	let raw: Vec<u8> = (0..48u8).collect();
	assert_eq!(PayloadCompression::LengthPrefixed.recover(raw.clone()), (raw, PayloadStatus::Stored));
}
