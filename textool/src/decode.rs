use std::path::PathBuf;

use bully_tex::*;
use anyhow::{Context, Result as AnyhowResult};


pub fn command_decode(matches: &clap::ArgMatches) -> AnyhowResult<()> {
	let tex_path = matches.value_of("tex").expect("TEX required");
	let png_path = matches.value_of("png")
		.map_or_else(|| PathBuf::from(tex_path).with_extension("png"), PathBuf::from);

	let entry_idx = match matches.value_of("entry") {
		Some(s) => Some(s.parse::<usize>()
			.with_context(|| format!("Could not parse entry index from \"{s}\""))
			.and_then(|i| if i > 0 { Ok(i) } else { Err(anyhow::anyhow!("Entry index cannot be 0")) })?),
		None => None,
	};

	let tex_file = std::fs::File::open(tex_path).with_context(|| format!("Could not open file: {tex_path}"))?;
	let mut decoder = TexDecoder::with_reader(std::io::BufReader::new(tex_file))
		.with_context(|| format!("Could not read TexContainer: {tex_path}"))?;
	let entry_count = decoder.container().entry_count();

	let outcome = match entry_idx {
		Some(i) => decoder.decode_nth(i-1)
			.with_context(|| format!("Failed to decode entry #{i} (should be in [1..{entry_count}])"))?,
		None => decoder.decode_detail()
			.with_context(|| format!("Failed to decode the last entry of {tex_path}"))?,
	};

	let decoded = match outcome {
		DecodeOutcome::Decoded(decoded) => decoded,

		DecodeOutcome::NoEntries => {
			tracing::warn!("{tex_path}: no entries, nothing to decode");
			return Ok(());
		},

		DecodeOutcome::UnsupportedFormat(code) => {
			tracing::warn!("{tex_path}: unsupported texture format {code}");
			return Ok(());
		},
	};

	if decoded.status == PayloadStatus::InflateFailed {
		tracing::warn!("{tex_path}: payload did not inflate, decoded from raw bytes");
	};

	tracing::info!("{tex_path}: {} {}x{} ({})", decoded.format, decoded.width(), decoded.height(), decoded.status);

	decoded.image.save_with_format(&png_path, image::ImageFormat::Png)
		.with_context(|| format!("save_with_format to path failed: {}", png_path.display()))?;

	Ok(())
}
