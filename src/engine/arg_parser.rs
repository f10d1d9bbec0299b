use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Concurrent file-checksum engine.
#[derive(Clone, Debug, Parser)]
#[command(name = "filesig")]
#[command(about = "Hash every regular file under a directory on a bounded worker pool.")]
pub struct Cli {
    /// Root directory to walk. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Hash algorithm: crc32, md5, sha1, sha256, sha512, blake3. Default: md5.
    #[arg(long, short = 'a', env = "FILESIG_ALGORITHM")]
    pub algorithm: Option<String>,

    /// Concurrency limit (number of files hashed at once). Default: available threads.
    #[arg(long, short = 'j', env = "FILESIG_JOBS", value_parser = clap::value_parser!(usize))]
    pub jobs: Option<usize>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Also hash special files (fifos, devices, sockets).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub include_special: Option<bool>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Per-file timeout in seconds; slower files are reported as timed out.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub timeout: Option<u64>,

    /// Whole-run deadline in seconds; no new files start after it passes.
    #[arg(long, value_parser = clap::value_parser!(u64))]
    pub deadline: Option<u64>,

    /// Print results sorted by path once every file is done.
    #[arg(long, short = 's', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub sorted: Option<bool>,

    /// Emit one JSON object per outcome instead of text lines.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub json: Option<bool>,

    /// Exit non-zero when any file fails. Default: true.
    #[arg(long, value_parser = clap::value_parser!(bool))]
    pub fail_on_error: Option<bool>,

    /// Walk directories in parallel (jwalk) instead of serially.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub parallel_walk: Option<bool>,

    /// Verbose output.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Show a progress counter on stderr.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub progress: Option<bool>,

    /// Config file. Default: `.filesig.toml` in the working directory, if present.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// List supported algorithms and exit.
    #[arg(long)]
    pub list_algorithms: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "filesig", "/data", "-a", "sha256", "-j", "4", "-e", "*.log", "tmp", "--sorted",
        ])
        .unwrap();
        assert_eq!(cli.dir, PathBuf::from("/data"));
        assert_eq!(cli.algorithm.as_deref(), Some("sha256"));
        assert_eq!(cli.jobs, Some(4));
        assert_eq!(cli.exclude, vec!["*.log".to_string(), "tmp".to_string()]);
        assert_eq!(cli.sorted, Some(true));
        assert_eq!(cli.verbose, None);
    }

    #[test]
    fn fail_on_error_takes_a_value() {
        let cli = Cli::try_parse_from(["filesig", "--fail-on-error", "false"]).unwrap();
        assert_eq!(cli.fail_on_error, Some(false));
        assert_eq!(cli.dir, PathBuf::from("."));
    }
}
