#![warn(missing_docs, unreachable_pub, clippy::all)]
#![allow(clippy::wildcard_imports, clippy::enum_glob_use)]
#![warn(clippy::missing_errors_doc, clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]


#![doc = include_str!("../../README.md")]


mod macros;
mod container;
mod entry;
mod payload;
mod format;
mod pixel;
mod pixconv;
mod block;
mod decode;

pub use container::*;
pub use entry::*;
pub use payload::*;
pub use format::*;
pub use decode::*;


use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use derive_more::{Display, Error};
#[cfg(test)] use static_assertions::assert_impl_all;

use TexError::*;

/// [`std::result::Result`] parameterized with [`TexError`]
pub type TexResult<T> = Result<T, TexError>;


/// `bully_tex`'s [`std::error::Error`]
///
/// Short reads, failed inflates and truncated block data are not errors:
/// they are absorbed while parsing (see [`TexContainer::read_from`] and
/// [`TexEntry::read_from`]).  Only the conditions below are reported.
#[derive(Debug, Display, Error, Clone)]
#[non_exhaustive]
pub enum TexError {
	/// Unexpected I/O error (other than end of file) from the underlying source.
	#[display(fmt = "Unexpected I/O error: {}", _0)]
	UnexpectedIoError(#[error(ignore)] std::io::ErrorKind),

	/// [`TexContainer::read_entry`] or [`TexDecoder::decode_nth`] received an
	/// entry index outside of the offset table.
	#[display(fmt = "Entry index out of range")]
	EntryIndexOutOfRange,

	/// Entry dimensions exceed [`TexFormat::MAX_DIMENSION`], or the decoded
	/// image would exceed [`TexFormat::MAX_IMAGE_BYTES`].  Members are width
	/// and height.
	#[error(ignore)]
	#[display(fmt = "Entry dimensions {}x{} are too large to decode", _0, _1)]
	ImageTooLarge(u32, u32),

	/// Attempted to read a packed pixel or block from invalid data.
	#[doc(hidden)]
	#[display(fmt = "Attempted to read a packed pixel or block from invalid data")]
	PixelReadError,
}


impl From<std::io::Error> for TexError {
	fn from(error: std::io::Error) -> Self {
		UnexpectedIoError(error.kind())
	}
}


trait ReadExt: Read {
	/// Read a little-endian `u32`; a short read yields 0.
	fn read_u32_or_zero(&mut self) -> u32 {
		self.read_u32::<LittleEndian>().unwrap_or(0)
	}


	/// Read at most `len` bytes, returning whatever was available before EOF
	/// or a read error.
	fn read_up_to(&mut self, len: u64) -> Vec<u8> where Self: Sized {
		let mut data: Vec<u8> = Vec::new();
		let _ = self.by_ref().take(len).read_to_end(&mut data);
		data
	}
}


impl<T> ReadExt for T where T: Read { }


#[test]
fn test_read_u32_or_zero() {
	let mut input = std::io::Cursor::new(vec![0x01u8, 0x02, 0x00, 0x00, 0xFF, 0xFF]);
	assert_eq!(input.read_u32_or_zero(), 0x0201);
	assert_eq!(input.read_u32_or_zero(), 0);
	assert_eq!(input.read_u32_or_zero(), 0);
}


#[test]
fn test_read_up_to() {
	let mut input = std::io::Cursor::new(vec![0x41u8, 0x42, 0x43]);
	assert_eq!(input.read_up_to(2), vec![0x41, 0x42]);
	assert_eq!(input.read_up_to(u64::from(u32::MAX)), vec![0x43]);
	assert!(input.read_up_to(4).is_empty());
}


#[cfg(test)]
pub(crate) trait ExtendExt: Extend<u8> {
	/// Extend with a little-endian `u32`.
	fn extend_with_u32(&mut self, v: u32) {
		self.extend(v.to_le_bytes());
	}
}


#[cfg(test)]
impl<T> ExtendExt for T where T: Extend<u8> {}


/// Build a container holding one entry per `(format, width, height, payload)`
/// with the offset table at its usual position.  Payloads are written as-is,
/// so `payload_size` is their length.
#[cfg(test)]
pub(crate) fn build_container(entries: &[(u32, u32, u32, Vec<u8>)], metadata: Option<&str>) -> Vec<u8> {
	let count = entries.len() as u32;
	let table_start = 16 + 4 * count as usize;
	let entries_start = table_start + 4 * count as usize;

	let mut records: Vec<u8> = vec![];
	let mut offsets: Vec<u32> = vec![];

	for (format, width, height, payload) in entries {
		offsets.push((entries_start + records.len()) as u32);
		records.extend_with_u32(*format);
		records.extend_with_u32(*width);
		records.extend_with_u32(*height);
		records.extend_with_u32(1);
		records.extend_with_u32(payload.len() as u32);
		records.extend(payload);
	};

	let metadata_offset = match metadata {
		Some(_) => (entries_start + records.len()) as u32,
		None => 0,
	};

	let mut buf: Vec<u8> = vec![];
	buf.extend_with_u32(1);
	buf.extend_with_u32(count + 1);
	buf.extend_with_u32(0);
	buf.extend_with_u32(metadata_offset);
	buf.resize(table_start, 0);

	for o in offsets {
		buf.extend_with_u32(o);
	};

	buf.extend(records);

	if let Some(text) = metadata {
		buf.extend_with_u32(text.len() as u32);
		buf.extend(text.as_bytes());
	};

	buf
}


#[test]
fn assert_traits() {
	use std::fmt::{Debug, Display};
	use std::error::Error;
	use std::panic::{UnwindSafe, RefUnwindSafe};

	assert_impl_all!(TexError: Debug, Display, Error, Send, Sync, UnwindSafe, RefUnwindSafe);
}
