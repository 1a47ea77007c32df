use crate::filter::FilterSpec;
use crate::runner::RunConfig;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "run-test-suites")]
#[command(about = "Run test suite executables on a filtered subset of their .datax test cases")]
#[command(version)]
pub struct Cli {
    /// Test suite executables to run
    #[arg(required = true, value_name = "EXECUTABLE")]
    pub executables: Vec<PathBuf>,

    /// Command token to run each executable through, e.g. a debugger (repeatable)
    #[arg(short = 'c', long = "command", value_name = "TOKEN", allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Skip test cases whose description matches this regex (repeatable)
    #[arg(short, long, value_name = "REGEX")]
    pub exclude: Vec<String>,

    /// Keep the filtered temporary .datax files
    #[arg(short, long)]
    pub keep: bool,

    /// List the selected test cases instead of running them
    #[arg(short, long)]
    pub list: bool,

    /// Run test cases whose description starts with this prefix (repeatable)
    #[arg(short, long, value_name = "PREFIX")]
    pub prefix: Vec<String>,

    /// Run test cases whose description contains a match for this regex (repeatable)
    #[arg(short, long, value_name = "REGEX")]
    pub regex: Vec<String>,

    /// Run test cases whose description contains this substring (repeatable)
    #[arg(short, long, value_name = "SUBSTRING")]
    pub substring: Vec<String>,

    /// Pass -v to each executable
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            substrings: self.substring.clone(),
            prefixes: self.prefix.clone(),
            regexes: self.regex.clone(),
            excludes: self.exclude.clone(),
        }
    }

    pub fn run_config(&self) -> RunConfig {
        let extra_args = if self.verbose {
            vec!["-v".to_string()]
        } else {
            Vec::new()
        };
        RunConfig {
            wrapper: self.command.clone(),
            extra_args,
            keep: self.keep,
        }
    }
}
