//! Command-line argument parsing and processing.
//!
//! Supports the standard help, version, and debug flags, a custom config path,
//! and `--times` for printing a day's solar schedule without touching any
//! lights. Unknown options fall back to showing help.

use chrono::NaiveDate;

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon with these settings
    Run {
        debug_enabled: bool,
        config_path: Option<String>,
    },
    /// Print the solar schedule for a day (today when `date` is None) and exit
    ShowTimes {
        debug_enabled: bool,
        config_path: Option<String>,
        date: Option<NaiveDate>,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown or malformed arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// The first item is the program name and is skipped. Help wins over
    /// version, which wins over everything else.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut show_times = false;
        let mut times_date: Option<NaiveDate> = None;
        let mut config_path: Option<String> = None;
        let mut unknown_arg_found = false;

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut idx = 0;
        while idx < args_vec.len() {
            match args_vec[idx].as_str() {
                "-h" | "--help" => display_help = true,
                "-V" | "-v" | "--version" => display_version = true,
                "-d" | "--debug" => debug_enabled = true,
                "-c" | "--config" => match args_vec.get(idx + 1) {
                    Some(path) if !path.starts_with('-') => {
                        config_path = Some(path.clone());
                        idx += 1;
                    }
                    _ => {
                        log_warning!("--config requires a path");
                        unknown_arg_found = true;
                    }
                },
                "-t" | "--times" => {
                    show_times = true;
                    if let Some(next) = args_vec.get(idx + 1)
                        && !next.starts_with('-')
                    {
                        match NaiveDate::parse_from_str(next, "%Y-%m-%d") {
                            Ok(date) => times_date = Some(date),
                            Err(_) => {
                                log_warning!("Invalid date '{next}', expected YYYY-MM-DD");
                                unknown_arg_found = true;
                            }
                        }
                        idx += 1;
                    }
                }
                other => {
                    if !display_help {
                        log_warning!("Unknown argument: {other}");
                    }
                    unknown_arg_found = true;
                }
            }
            idx += 1;
        }

        let action = if display_help {
            CliAction::ShowHelp
        } else if display_version {
            CliAction::ShowVersion
        } else if unknown_arg_found {
            CliAction::ShowHelpDueToError
        } else if show_times {
            CliAction::ShowTimes {
                debug_enabled,
                config_path,
                date: times_date,
            }
        } else {
            CliAction::Run {
                debug_enabled,
                config_path,
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    crate::logger::write_output(&format!("┗ {}\n", env!("CARGO_PKG_DESCRIPTION")));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("huebert [OPTIONS]");
    log_block_start!("Options:");
    log_indented!("-c, --config <file>    Use a custom configuration file");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-t, --times [date]     Print the solar schedule (YYYY-MM-DD, default today)");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_end!();
}
