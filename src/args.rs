use std::num::NonZeroU64;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{DEFAULT_MAX_PATH_LEN, OutputConfig, RecoverConfig};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rescopy",
    version,
    about = "Copy files out of damaged or failing storage without overwriting anything",
    long_about = "`rescopy` copies a file, a folder tree or every file with given extensions to a \
destination, keeping timestamps and permissions. Existing destination files are never \
overwritten; colliding names get a timestamp suffix. Every copy is recorded in a \
per-operation audit log.

EXAMPLES:
    # Recover a whole folder into /mnt/rescue/photos
    rescopy folder /media/card/photos /mnt/rescue

    # Recover every JPG and PNG file, sorted by extension
    rescopy ext /media/card /mnt/rescue -e .jpg -e .png

    # List a directory's contents into folder_map_card_log.txt
    rescopy map /media/card"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Directory receiving the audit log files
    #[arg(long, value_name = "DIR", default_value = ".", global = true, help_heading = "Logging")]
    pub log_dir: PathBuf,

    /// Maximum destination path length before directory names are shortened
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_PATH_LEN,
        global = true,
        help_heading = "Recovery options"
    )]
    pub max_path_len: usize,

    /// Required free space on the destination in MB, replacing the operation's default
    #[arg(long, value_name = "MB", global = true, help_heading = "Recovery options")]
    pub min_free_mb: Option<NonZeroU64>,

    /// Verbose level: -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true, help_heading = "Output")]
    pub verbose: u8,

    /// Quiet mode, don't print diagnostics or the final message
    #[arg(short = 'q', long = "quiet", global = true, help_heading = "Output")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Recover a single file into a destination directory
    File {
        /// File to recover
        source: PathBuf,
        /// Directory receiving the copy
        destination: PathBuf,
    },
    /// Recover a folder tree into <DESTINATION>/<folder name>
    Folder {
        /// Folder to recover
        source: PathBuf,
        /// Directory receiving the recovered folder
        destination: PathBuf,
    },
    /// Recover every file ending with one of the given extensions
    Ext {
        /// Directory to search
        source: PathBuf,
        /// Directory receiving one `Recovered <EXT> Files` folder per extension
        destination: PathBuf,
        /// File name suffix to recover, e.g. `.jpg` (can be specified multiple times)
        #[arg(short = 'e', long = "ext", value_name = "EXT", required = true, action = clap::ArgAction::Append)]
        extensions: Vec<String>,
    },
    /// Log every directory and file below <DIR>
    Map {
        /// Directory to list
        dir: PathBuf,
    },
}

impl Args {
    pub fn recover_config(&self) -> RecoverConfig {
        let config = RecoverConfig {
            max_path_len: self.max_path_len,
            log_dir: self.log_dir.clone(),
            ..RecoverConfig::default()
        };
        match self.min_free_mb {
            Some(floor) => config.with_floor(floor),
            None => config,
        }
    }

    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            quiet: self.quiet,
            verbose: self.verbose,
        }
    }
}
