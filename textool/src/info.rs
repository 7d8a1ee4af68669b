use bully_tex::*;
use anyhow::{Context, Result as AnyhowResult};


pub fn command_info(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let brief = matches.is_present("brief");

	let mut result = Ok(());

	for path in matches.values_of("input").expect("INPUT required") {
		let result_now = tex_path_info(path, brief);

		if let Err(ref e) = result_now {
			tracing::error!("{path}: {e:?}");
			result = result_now;
		};
	};

	result
}


fn tex_path_info(path: &str, brief: bool) -> AnyhowResult<()> {
	let brief_prefix = if brief {
		"".to_string()
	}
	else {
		format!("{}: ", path)
	};

	let file = std::fs::File::open(path).with_context(|| format!("Could not open file: {path}"))?;
	let filesize = file.metadata().with_context(|| format!("Could not read metadata to determine size: {path}"))?.len();
	let mut file = std::io::BufReader::new(file);
	let container = TexContainer::read_from(&mut file).with_context(|| format!("Could not read TexContainer: {path}"))?;
	let header = &container.header;

	println!("{brief_prefix}File size: {filesize} (0x{filesize:X})");
	println!("{brief_prefix}Version: {}, file ID: 0x{:08X}", header.version, header.file_id);
	println!("{brief_prefix}Entries: {}, offset table at 0x{:X}", container.entry_count(), header.offset_table_position());

	match container.metadata {
		Some(ref text) => println!("{brief_prefix}Metadata at 0x{:X}: {text:?}", header.metadata_offset),
		None => println!("{brief_prefix}Metadata: none"),
	};

	println!("{brief_prefix}Payload compression: {}", container.compression());

	let (listed, missing) = listed_entries(&container);

	for pos in 0..listed {
		let offset = container.offset(pos).unwrap_or(0);
		let entry = container.read_entry(&mut file, pos)
			.with_context(|| format!("Could not read entry #{}", pos+1))?;

		print!("{brief_prefix}Entry #{} at 0x{offset:X}, {}x{} [{}], mips={}, payload={}",
			pos+1,
			entry.width,
			entry.height,
			entry.format,
			entry.mip_count,
			entry.payload_size);

		if let Some(declared) = entry.declared_size {
			print!(", declared={declared}");
		};

		println!(", data={} ({})", entry.data.len(), entry.status);
	};

	if missing > 0 {
		println!("{brief_prefix}Entries #{}..#{}: offset table ends before the end of file", listed+1, listed+missing);
	};

	Ok(())
}


/// Number of entries whose offsets are present in the file, and number of
/// entries the header counts beyond those.
fn listed_entries(container: &TexContainer) -> (usize, usize) {
	let listed = container.offsets.len();
	(listed, (container.entry_count() as usize).saturating_sub(listed))
}


#[test]
fn listed_entries_stop_at_end_of_table() {
	let mut data = vec![];
	for v in [1u32, u32::MAX, 0, 0] {
		data.extend(v.to_le_bytes());
	};

	let container = TexContainer::from_bytes(&data).unwrap();
	assert_eq!(listed_entries(&container), (0, u32::MAX as usize - 1));

	// Two entries counted, one offset present
	let mut data = vec![];
	for v in [1u32, 3, 0, 0, 0, 0, 0x40] {
		data.extend(v.to_le_bytes());
	};

	let container = TexContainer::from_bytes(&data).unwrap();
	assert_eq!(listed_entries(&container), (1, 1));
}
