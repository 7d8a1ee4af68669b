use anyhow::{Context, Result as AnyhowResult};

mod decode;
mod info;


fn construct_app() -> clap::Command<'static> {
	clap::Command::new("textool")
		.version(clap::crate_version!())
		.setting(clap::AppSettings::DeriveDisplayOrder)
		.arg(clap::arg!(loglevel: -L "Global log verbosity level")
			.ignore_case(true)
			.possible_values(["Error", "Warn", "Info", "Debug", "Trace"])
			.default_value("Info"))
		.subcommand(clap::Command::new("decode")
			.about("Decode a TEX file to PNG")
			.arg(clap::arg!(entry: -m <ENTRY> "1-based entry index; the last (most detailed) entry if unspecified")
				.required(false))
			.arg(clap::arg!(tex: <TEX> "TEX input file"))
			.arg(clap::arg!(png: [PNG] "PNG output path; input path with a .png extension if unspecified")))
		.subcommand(clap::Command::new("info")
			.about("Parse a TEX file and print its header, metadata and entries")
			.arg(clap::arg!(brief: -b --brief "Do not prepend file name to output").takes_value(false))
			.arg(clap::arg!(input: <INPUT> ... "TEX file to parse")))
}


fn textool() -> AnyhowResult<()> {
	let matches = construct_app().get_matches_from(wild::args());
	let loglevel_str = matches.value_of("loglevel")
		.unwrap_or("Info");
	let loglevel = loglevel_str
		.parse::<tracing::Level>()
		.with_context(|| format!("Failed to parse loglevel from -L{}", loglevel_str))?;

	tracing_subscriber::fmt()
		.with_max_level(loglevel)
		.init();

	tracing::trace!("Global loglevel set to {:?}", loglevel);

	match matches.subcommand() {
		Some(("decode", matches)) => {
			decode::command_decode(matches)
		},

		Some(("info", matches)) => {
			info::command_info(matches)
		},

		Some((&_, _)) => unreachable!(),

		None => {
			let _ = construct_app().print_help();
			Ok(())
		},
	}
}


fn main() -> AnyhowResult<()> {
	match textool() {
		Ok(()) => Ok(()),
		Err(e) => { tracing::error!("{:?}", e); Ok(()) },
	}
}


#[test]
fn verify_app() {
	construct_app().debug_assert();
}
