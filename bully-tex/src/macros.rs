/// Forward to the `log` crate under the `bully_tex` target when the `log`
/// feature is enabled; expand to nothing otherwise.
macro_rules! log {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "log")]
		log::$level!(target: "bully_tex", $($arg)+);
	}
}

pub(crate) use log;
